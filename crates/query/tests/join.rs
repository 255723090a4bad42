// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_catalog::{MaterializedCatalog, SchemaDef};
use strata_query::{
	JoinCompiler, JoinQualifier, JoinSource, Query, TableSource,
	ast::{BinaryOperator, Expr, build::*},
	expression::{QueryExpr, TypeTag},
	query::join::ValuesSource,
};
use strata_type::{Type, Value};

fn catalog() -> MaterializedCatalog {
	MaterializedCatalog::new()
		.with_schema(
			SchemaDef::new("Post", "posts")
				.with_field("id", Type::Integer)
				.with_field("title", Type::String)
				.has_many("comments", "Comment", "post_id"),
		)
		.with_schema(
			SchemaDef::new("Comment", "comments")
				.with_field("post_id", Type::Integer)
				.with_field("public", Type::Boolean),
		)
}

fn join_comments(compiler: &JoinCompiler<'_>, qualifier: Expr, options: Option<Expr>) -> strata_query::Result<Query> {
	compiler.join(Query::from_table("posts"), qualifier, list([var("p")]), in_(var("c"), string("comments")), options)
}

#[test]
fn test_every_qualifier_is_recorded() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	for qualifier in JoinQualifier::ALL {
		let query = join_comments(&compiler, atom(qualifier.as_str()), None).unwrap();
		assert_eq!(query.joins().len(), 1);
		assert_eq!(query.joins()[0].qualifier(), qualifier);
	}
}

#[test]
fn test_invalid_qualifiers() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let err = join_comments(&compiler, atom("outer"), None).unwrap_err();
	assert_eq!(err.code, "JOIN_002");
	assert_eq!(
		err.message,
		"invalid join qualifier `:outer`, accepted qualifiers are: :inner, :left, :right, :full, :cross, \
		 :inner_lateral, :left_lateral, :cross_lateral, :array, :left_array"
	);

	for qualifier in [string("inner"), int(1), pin(0), var("qualifier")] {
		let err = join_comments(&compiler, qualifier, None).unwrap_err();
		assert_eq!(err.code, "JOIN_002");
	}

	let err = join_comments(&compiler, pin(0), None).unwrap_err();
	assert_eq!(err.message, "invalid join qualifier, `join` qualifier must be a compile time atom, got: `^0`");
}

#[test]
fn test_values_list_records_types_and_rows() {
	let catalog = catalog();
	let rows = list([
		kw([("id", int(1)), ("name", string("a"))]),
		kw([("id", int(2)), ("name", string("b"))]),
		kw([("name", string("c")), ("id", int(3))]),
	]);
	let query = JoinCompiler::new(&catalog)
		.join(
			Query::from_table("posts"),
			atom("inner"),
			list([var("p")]),
			in_(var("v"), values(rows, kw([("id", atom("integer")), ("name", atom("string"))]))),
			Some(kw([("on", eq(field("v", "id"), field("p", "id")))])),
		)
		.unwrap();

	let JoinSource::Values(ValuesSource::List(list)) = query.joins()[0].source() else {
		panic!("expected a values list");
	};
	assert_eq!(list.types, vec![("id".to_string(), Type::Integer), ("name".to_string(), Type::String)]);
	assert_eq!(list.num_rows, 3);
	assert_eq!(list.params.len(), 6);
	assert!(list.params.iter().all(|param| !param.value.is_deferred()));
}

#[test]
fn test_values_list_field_errors() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);
	let compile = |rows: Expr, types: Expr| {
		compiler.join(Query::from_table("posts"), atom("inner"), list([]), in_(var("v"), values(rows, types)), None)
	};

	let err = compile(list([kw([("id", int(1)), ("score", float(1.5))])]), kw([("id", atom("integer"))])).unwrap_err();
	assert_eq!(err.code, "JOIN_008");
	assert!(err.message.contains("`score`"));

	let err = compile(
		list([kw([("id", int(1)), ("name", string("a"))]), kw([("name", string("b"))])]),
		kw([("id", atom("integer")), ("name", atom("string"))]),
	)
	.unwrap_err();
	assert_eq!(err.code, "JOIN_008");
	assert!(err.message.contains("`id` is missing from row 1"));
}

#[test]
fn test_binding_arity_against_subquery() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);
	let inner = compiler
		.join(Query::from_table("comments"), atom("inner"), list([var("c")]), in_(var("u"), string("users")), None)
		.unwrap();
	assert_eq!(inner.binding_count(), 2);

	let bindings = [
		var("s"),
		list([var("a")]),
		list([var("a"), var("b"), var("c")]),
		list([var("a"), var("b"), var("c"), var("d")]),
	];
	for binding in bindings {
		let err = compiler
			.join(
				Query::from_table("posts"),
				atom("inner_lateral"),
				list([var("p")]),
				in_(binding, subquery(query(inner.clone()))),
				None,
			)
			.unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert!(err.message.ends_with("but its source has 2 bindings"));
	}

	let query = compiler
		.join(
			Query::from_table("posts"),
			atom("inner_lateral"),
			list([var("p")]),
			in_(list([var("a"), var("b")]), subquery(query(inner))),
			None,
		)
		.unwrap();
	assert_eq!(query.binding_count(), 3);
}

#[test]
fn test_as_option_values() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let query = join_comments(&compiler, atom("inner"), Some(kw([("as", atom("comment"))]))).unwrap();
	assert_eq!(query.alias_index("comment"), Some(1));
	assert!(join_comments(&compiler, atom("inner"), Some(kw([("as", pin(0))]))).is_ok());

	for value in [int(1), string("comment"), var("comment")] {
		let err = join_comments(&compiler, atom("inner"), Some(kw([("as", value.clone())]))).unwrap_err();
		assert_eq!(err.code, "JOIN_004");
		assert_eq!(
			err.message,
			format!("`as` must be a compile time atom or an interpolated value, got: `{}`", value)
		);
	}
}

#[test]
fn test_prefix_option_values() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	assert!(join_comments(&compiler, atom("inner"), Some(kw([("prefix", string("archive"))]))).is_ok());
	assert!(join_comments(&compiler, atom("inner"), Some(kw([("prefix", pin_named("prefix"))]))).is_ok());

	for value in [atom("archive"), int(1), boolean(true)] {
		let err = join_comments(&compiler, atom("inner"), Some(kw([("prefix", value.clone())]))).unwrap_err();
		assert_eq!(err.code, "JOIN_004");
		assert_eq!(
			err.message,
			format!("`prefix` must be a compile time string or an interpolated value, got: `{}`", value)
		);
	}
}

#[test]
fn test_unknown_option_named_in_error() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let options = kw([
		("on", eq(field("c", "post_id"), field("p", "id"))),
		("as", atom("comment")),
		("lock", string("FOR UPDATE")),
		("prefix", string("archive")),
	]);
	let err = join_comments(&compiler, atom("inner"), Some(options)).unwrap_err();
	assert_eq!(err.code, "JOIN_003");
	assert_eq!(err.message, "invalid option `lock` passed to join");

	let err = join_comments(&compiler, atom("inner"), Some(kw([("hint", string("x")), ("foo", int(1))]))).unwrap_err();
	assert_eq!(err.message, "invalid option `hint` passed to join");
}

#[test]
fn test_malformed_options() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let err = join_comments(&compiler, atom("inner"), Some(int(1))).unwrap_err();
	assert_eq!(err.code, "JOIN_005");
	assert!(err.message.starts_with("invalid opts passed to join"));
}

#[test]
fn test_keyword_on_conjunction_with_typed_booleans() {
	let catalog = catalog();
	let query = JoinCompiler::new(&catalog)
		.join(
			Query::from_schema("Post"),
			atom("left"),
			list([var("p")]),
			in_(var("c"), schema("Comment")),
			Some(kw([("on", kw([("post_id", field("p", "id")), ("public", boolean(false))]))])),
		)
		.unwrap();

	let on = query.joins()[0].on().compiled().unwrap();
	assert_eq!(
		on.expr,
		QueryExpr::binary(
			BinaryOperator::And,
			QueryExpr::eq(QueryExpr::field(1, "post_id"), QueryExpr::field(0, "id")),
			QueryExpr::eq(
				QueryExpr::field(1, "public"),
				QueryExpr::typed(QueryExpr::Literal(Value::Boolean(false)), TypeTag::Type(Type::Boolean))
			)
		)
	);
	assert!(on.params.is_empty());
}

#[test]
fn test_join_posts_to_comments() {
	let catalog = catalog();
	let query = JoinCompiler::new(&catalog)
		.join(
			Query::from_table("posts"),
			atom("inner"),
			list([var("p")]),
			in_(var("c"), string("comments")),
			Some(kw([("on", kw([("post_id", field("p", "id")), ("public", boolean(true))]))])),
		)
		.unwrap();

	assert_eq!(query.joins().len(), 1);
	let record = &query.joins()[0];
	assert_eq!(record.qualifier(), JoinQualifier::Inner);
	assert_eq!(
		record.source(),
		&JoinSource::Table(TableSource {
			table: Some("comments".to_string()),
			schema: None,
		})
	);

	let on = record.on().compiled().unwrap();
	assert_eq!(
		on.expr,
		QueryExpr::binary(
			BinaryOperator::And,
			QueryExpr::eq(QueryExpr::field(1, "post_id"), QueryExpr::field(0, "id")),
			QueryExpr::eq(
				QueryExpr::field(1, "public"),
				QueryExpr::typed(
					QueryExpr::Literal(Value::Boolean(true)),
					TypeTag::Field {
						binding: 1,
						field: "public".to_string(),
					}
				)
			)
		)
	);
	assert!(on.params.is_empty());
}

#[test]
fn test_on_rejects_subqueries() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let on = and(eq(field("c", "post_id"), field("p", "id")), exists(query(Query::from_table("likes"))));
	let err = join_comments(&compiler, atom("inner"), Some(kw([("on", on)]))).unwrap_err();
	assert_eq!(err.code, "JOIN_007");
	assert!(err.message.starts_with("invalid expression for join `:on`"));

	let on = in_(field("c", "id"), subquery(query(Query::from_table("likes"))));
	let err = join_comments(&compiler, atom("inner"), Some(kw([("on", on)]))).unwrap_err();
	assert_eq!(err.code, "JOIN_007");
}

#[test]
fn test_on_reports_unbound_variable() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);

	let err = join_comments(&compiler, atom("inner"), Some(kw([("on", eq(field("x", "id"), field("p", "id")))])))
		.unwrap_err();
	assert_eq!(err.code, "EXPR_001");
	assert_eq!(err.message, "unbound variable `x` in expression");
}

#[test]
fn test_empty_compound_binding_is_rejected() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);
	let err = compiler
		.join(Query::from_table("posts"), atom("inner"), list([var("p")]), in_(list([]), subquery(pin(0))), None)
		.unwrap_err();
	assert_eq!(err.code, "JOIN_001");

	let query = compiler
		.join(Query::from_table("posts"), atom("inner"), list([var("p")]), in_(list([var("s")]), subquery(pin(0))), None)
		.unwrap();
	let query = compiler
		.join(query, atom("inner"), list([var("p")]), in_(var("l"), string("likes")), None)
		.unwrap();
	assert_eq!(query.joins()[0].binding_index(), 1);
	assert_eq!(query.joins()[1].binding_index(), 2);
	assert_eq!(query.binding_count(), 3);
}

#[test]
fn test_failed_join_leaves_query_untouched() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);
	let query = join_comments(&compiler, atom("inner"), Some(kw([("as", atom("c"))]))).unwrap();

	let err = compiler
		.join(query.clone(), atom("inner"), list([var("p")]), in_(var("l"), string("likes")), Some(kw([("as", atom("c"))])))
		.unwrap_err();
	assert_eq!(err.code, "JOIN_010");
	assert_eq!(query.joins().len(), 1);
	assert_eq!(query.binding_count(), 2);
}

#[test]
fn test_named_and_ellipsis_bindings() {
	let catalog = catalog();
	let compiler = JoinCompiler::new(&catalog);
	let query = join_comments(&compiler, atom("inner"), Some(kw([("as", atom("comment"))]))).unwrap();
	let query = compiler
		.join(query, atom("left"), list([var("p"), Expr::Ellipsis, var("c")]), in_(var("l"), string("likes")), None)
		.unwrap();

	let query = compiler
		.join(
			query,
			atom("left"),
			list([named("comment", var("cm"))]),
			in_(var("r"), string("reactions")),
			Some(kw([("on", eq(field("r", "comment_id"), field("cm", "id")))])),
		)
		.unwrap();

	assert_eq!(
		query.joins()[2].on().compiled().unwrap().expr,
		QueryExpr::eq(QueryExpr::field(3, "comment_id"), QueryExpr::field(1, "id"))
	);

	let err = compiler
		.join(query, atom("left"), list([named("missing", var("m"))]), string("x"), None)
		.unwrap_err();
	assert_eq!(err.code, "JOIN_001");
	assert_eq!(err.message, "unknown named binding `missing`");
}
