// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use strata_catalog::SchemaCatalog;
use strata_type::{Fragment, Result, Type, Value, error, return_error};
use tracing::trace;

use crate::{
	ast::{Expr, Literal},
	binding::{BindingEnv, JoinBinding},
	error::{AssociationFieldErrorKind, JoinError, ValuesListErrorKind},
	expression::{Param, TypeTag},
	option::{self, subquery_options},
	query::join::{
		AssociationSource, JoinSource, SubquerySource, TableSource, ValuesList, ValuesRow, ValuesSource,
	},
	staged::Staged,
};

/// What the normalizer needs to know about the query being joined onto.
pub struct SourceContext<'a> {
	/// Bindings in scope before the join.
	pub env: &'a BindingEnv,
	/// Variables the join itself introduces.
	pub binding: &'a JoinBinding,
	pub schemas: &'a [Option<String>],
	pub catalog: &'a dyn SchemaCatalog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSource {
	pub source: JoinSource,
	/// Slots the source occupies; `None` when only known at runtime.
	pub arity: Option<usize>,
}

impl NormalizedSource {
	fn single(source: JoinSource) -> Self {
		Self {
			source,
			arity: Some(1),
		}
	}
}

fn malformed(expr: &Expr) -> JoinError {
	JoinError::InvalidSource {
		got: expr.to_string(),
		fragment: Fragment::internal(expr.to_string()),
	}
}

pub(crate) fn values_error(kind: ValuesListErrorKind, fragment: impl Into<Fragment>) -> JoinError {
	JoinError::ValuesList {
		kind,
		fragment: fragment.into(),
	}
}

/// Classifies the right hand side of `binding in source`.
pub fn normalize(expr: &Expr, ctx: &SourceContext<'_>) -> Result<NormalizedSource> {
	let normalized = match expr {
		Expr::Literal(Literal::String(table)) => NormalizedSource::single(JoinSource::Table(TableSource::table(table))),

		Expr::Schema(schema) => NormalizedSource::single(JoinSource::Table(TableSource::schema(schema))),

		Expr::Tuple(items) => match items.as_slice() {
			[Expr::Literal(Literal::String(table)), Expr::Schema(schema)] => {
				NormalizedSource::single(JoinSource::Table(TableSource::table_schema(table, schema)))
			}
			_ => return_error!(malformed(expr)),
		},

		Expr::Interpolate(placeholder) => NormalizedSource::single(JoinSource::Runtime(placeholder.clone())),

		Expr::Query(query) => {
			if query.has_joins() {
				return_error!(JoinError::UnsupportedSourceValue {
					got: query.to_string(),
					reason: "queries with joins must be wrapped in `subquery/1`".to_string(),
					fragment: Fragment::internal(expr.to_string()),
				});
			}
			NormalizedSource::single(JoinSource::Table(query.base().source.clone()))
		}

		Expr::Call {
			function,
			args,
		} => match function.as_str() {
			"subquery" => normalize_subquery(expr, args)?,
			"assoc" => normalize_assoc(expr, args, ctx)?,
			"values" => normalize_values(expr, args)?,
			_ => return_error!(malformed(expr)),
		},

		_ => return_error!(malformed(expr)),
	};

	trace!(kind = normalized.source.kind(), arity = ?normalized.arity, "classified join source");
	Ok(normalized)
}

fn normalize_subquery(expr: &Expr, args: &[Expr]) -> Result<NormalizedSource> {
	let (inner, options) = match args {
		[inner] => (inner, None),
		[inner, options] => (inner, Some(options)),
		_ => return_error!(malformed(expr)),
	};

	let options = option::validate(options, &subquery_options(), "subquery")?;

	let (query, arity) = match inner {
		Expr::Query(query) => (Staged::Literal(query.clone()), Some(query.binding_count())),
		Expr::Interpolate(placeholder) => (Staged::Deferred(placeholder.clone()), None),
		_ => return_error!(malformed(expr)),
	};

	Ok(NormalizedSource {
		source: JoinSource::Subquery(SubquerySource {
			query,
			prefix: options.prefix(),
		}),
		arity,
	})
}

fn normalize_assoc(expr: &Expr, args: &[Expr], ctx: &SourceContext<'_>) -> Result<NormalizedSource> {
	let [owner, field] = args else {
		return_error!(malformed(expr));
	};

	let association_error = |kind: AssociationFieldErrorKind, fragment: &Expr| JoinError::InvalidAssociationField {
		kind,
		fragment: Fragment::internal(fragment.to_string()),
	};

	let owner_index = match owner {
		Expr::Var(name) if ctx.binding.contains(name) => return_error!(association_error(
			AssociationFieldErrorKind::SelfReference {
				name: name.clone(),
			},
			owner
		)),
		Expr::Var(name) => match ctx.env.lookup(name) {
			Some(index) => index,
			None => return_error!(association_error(
				AssociationFieldErrorKind::OwnerNotBound {
					got: name.clone(),
				},
				owner
			)),
		},
		other => return_error!(association_error(
			AssociationFieldErrorKind::OwnerNotBound {
				got: other.to_string(),
			},
			other
		)),
	};

	let field = match field {
		Expr::Atom(name) | Expr::Literal(Literal::String(name)) => Staged::Literal(name.clone()),
		Expr::Interpolate(placeholder) => Staged::Deferred(placeholder.clone()),
		Expr::Var(name) => return_error!(association_error(
			AssociationFieldErrorKind::Variable {
				name: name.clone(),
			},
			field
		)),
		other => return_error!(association_error(
			AssociationFieldErrorKind::NotAnAtom {
				got: other.to_string(),
			},
			other
		)),
	};

	let owner_schema = ctx.schemas.get(owner_index).and_then(|schema| schema.as_deref());
	let descriptor = match (owner_schema, field.literal()) {
		(Some(schema), Some(name)) => match ctx.catalog.resolve_association(schema, name) {
			Some(descriptor) => Some(descriptor),
			None => return_error!(JoinError::AssociationNotFound {
				owner: format!("schema `{}`", schema),
				field: name.clone(),
				fragment: Fragment::internal(expr.to_string()),
			}),
		},
		_ => None,
	};

	Ok(NormalizedSource::single(JoinSource::Association(AssociationSource {
		owner: owner_index,
		field,
		descriptor,
	})))
}

fn normalize_values(expr: &Expr, args: &[Expr]) -> Result<NormalizedSource> {
	let [rows, types] = args else {
		return_error!(malformed(expr));
	};

	let rows = match rows {
		Expr::Interpolate(placeholder) => Staged::Deferred(placeholder.clone()),
		rows => Staged::Literal(rows_from_expr(rows)?),
	};
	let types = match types {
		Expr::Interpolate(placeholder) => Staged::Deferred(placeholder.clone()),
		types => Staged::Literal(types_from_expr(types)?),
	};

	let source = match (rows, types) {
		(Staged::Literal(rows), Staged::Literal(types)) => {
			let list = check_values(&rows, &types).map_err(|kind| error!(values_error(kind, expr.to_string())))?;
			ValuesSource::List(list)
		}
		(rows, types) => ValuesSource::Pending {
			rows,
			types,
		},
	};

	Ok(NormalizedSource::single(JoinSource::Values(source)))
}

fn rows_from_expr(rows: &Expr) -> Result<Vec<ValuesRow>> {
	let Expr::List(items) = rows else {
		return_error!(values_error(
			ValuesListErrorKind::NotARow {
				row: 0,
				got: rows.to_string(),
			},
			rows.to_string()
		));
	};

	items.iter()
		.enumerate()
		.map(|(index, item)| {
			let pairs = match item {
				Expr::Keyword(pairs) | Expr::Map(pairs) => pairs,
				other => return_error!(values_error(
					ValuesListErrorKind::NotARow {
						row: index,
						got: other.to_string(),
					},
					other.to_string()
				)),
			};

			let mut row = ValuesRow::with_capacity(pairs.len());
			for (field, value) in pairs {
				let value = match value {
					Expr::Literal(literal) => Staged::Literal(literal.to_value()),
					Expr::Atom(name) => Staged::Literal(Value::Atom(name.clone())),
					Expr::Interpolate(placeholder) => Staged::Deferred(placeholder.clone()),
					other => return_error!(values_error(
						ValuesListErrorKind::UnsupportedValue {
							field: field.clone(),
							row: index,
							got: other.to_string(),
						},
						other.to_string()
					)),
				};
				if row.insert(field.clone(), value).is_some() {
					return_error!(values_error(
						ValuesListErrorKind::DuplicateField {
							field: field.clone(),
							row: index,
						},
						field.as_str()
					));
				}
			}
			Ok(row)
		})
		.collect()
}

fn types_from_expr(types: &Expr) -> Result<Vec<(String, Type)>> {
	let pairs = match types {
		Expr::Keyword(pairs) | Expr::Map(pairs) => pairs,
		other => return_error!(values_error(
			ValuesListErrorKind::MalformedTypes {
				got: other.to_string(),
			},
			other.to_string()
		)),
	};

	pairs.iter()
		.map(|(field, ty)| {
			let name = match ty {
				Expr::Atom(name) | Expr::Literal(Literal::String(name)) => name.as_str(),
				other => return_error!(values_error(
					ValuesListErrorKind::MalformedTypes {
						got: types.to_string(),
					},
					other.to_string()
				)),
			};
			parse_type(field, name).map(|ty| (field.clone(), ty))
		})
		.collect()
}

fn parse_type(field: &str, name: &str) -> Result<Type> {
	match name.parse::<Type>() {
		Ok(ty) => Ok(ty),
		Err(_) => return_error!(values_error(
			ValuesListErrorKind::UnknownType {
				field: field.to_string(),
				type_name: name.to_string(),
			},
			name
		)),
	}
}

/// Rows supplied at runtime: a list of maps.
pub(crate) fn rows_from_value(rows: &Value) -> Result<Vec<ValuesRow>> {
	let Value::List(items) = rows else {
		return_error!(values_error(
			ValuesListErrorKind::NotARow {
				row: 0,
				got: rows.to_string(),
			},
			rows.to_string()
		));
	};

	items.iter()
		.enumerate()
		.map(|(index, item)| match item {
			Value::Map(entries) => Ok(entries
				.iter()
				.map(|(field, value)| (field.clone(), Staged::Literal(value.clone())))
				.collect()),
			other => return_error!(values_error(
				ValuesListErrorKind::NotARow {
					row: index,
					got: other.to_string(),
				},
				other.to_string()
			)),
		})
		.collect()
}

/// Types supplied at runtime: a map of field to type name (atom or string).
pub(crate) fn types_from_value(types: &Value) -> Result<Vec<(String, Type)>> {
	let Value::Map(entries) = types else {
		return_error!(values_error(
			ValuesListErrorKind::MalformedTypes {
				got: types.to_string(),
			},
			types.to_string()
		));
	};

	entries.iter()
		.map(|(field, ty)| match ty {
			Value::Atom(name) | Value::String(name) => parse_type(field, name).map(|ty| (field.clone(), ty)),
			other => return_error!(values_error(
				ValuesListErrorKind::MalformedTypes {
					got: types.to_string(),
				},
				other.to_string()
			)),
		})
		.collect()
}

fn render_row(row: &ValuesRow) -> String {
	let fields = row.iter().map(|(field, value)| format!("{}: {}", field, value)).collect::<Vec<_>>();
	format!("%{{{}}}", fields.join(", "))
}

/// Checks that rows and types name the same fields and turns the row
/// values into params, row by row in `types` order.
pub fn check_values(
	rows: &[ValuesRow],
	types: &[(String, Type)],
) -> std::result::Result<ValuesList, ValuesListErrorKind> {
	if rows.is_empty() {
		return Err(ValuesListErrorKind::Empty);
	}

	let declared: IndexMap<&str, &Type> = types.iter().map(|(field, ty)| (field.as_str(), ty)).collect();

	for row in rows {
		if let Some(field) = row.keys().find(|field| !declared.contains_key(field.as_str())) {
			return Err(ValuesListErrorKind::UndeclaredType {
				field: field.clone(),
			});
		}
	}

	let mut params = Vec::with_capacity(rows.len() * types.len());
	for (index, row) in rows.iter().enumerate() {
		for (field, ty) in types {
			let Some(value) = row.get(field) else {
				return Err(ValuesListErrorKind::MissingField {
					field: field.clone(),
					row: index,
					rendered: render_row(row),
				});
			};
			params.push(Param::new(value.clone(), TypeTag::Type(ty.clone())));
		}
	}

	Ok(ValuesList {
		types: types.to_vec(),
		num_rows: rows.len(),
		params,
	})
}

/// Schema behind each slot of a freshly classified source.
pub fn source_schemas(source: &JoinSource, arity: usize) -> Vec<Option<String>> {
	let mut schemas = match source {
		JoinSource::Table(table) => vec![table.schema.clone()],
		JoinSource::Association(association) => {
			vec![association.descriptor.as_ref().map(|descriptor| descriptor.related.clone())]
		}
		JoinSource::Subquery(SubquerySource {
			query: Staged::Literal(query),
			..
		}) => query.slot_schemas(),
		_ => vec![],
	};
	schemas.resize(arity, None);
	schemas
}

#[cfg(test)]
pub mod tests {
	use strata_catalog::{Cardinality, MaterializedCatalog, SchemaDef};

	use super::*;
	use crate::{ast::build::*, query::Query, staged::Placeholder};

	struct Fixture {
		catalog: MaterializedCatalog,
		env: BindingEnv,
		schemas: Vec<Option<String>>,
		binding: JoinBinding,
	}

	impl Fixture {
		fn new() -> Self {
			Self {
				catalog: MaterializedCatalog::new()
					.with_schema(
						SchemaDef::new("Post", "posts")
							.with_field("id", Type::Integer)
							.has_many("comments", "Comment", "post_id"),
					)
					.with_schema(SchemaDef::new("Comment", "comments").with_field("post_id", Type::Integer)),
				env: BindingEnv::from_names([("p", 0), ("x", 1)], 2),
				schemas: vec![Some("Post".to_string()), None],
				binding: JoinBinding::Single(Some("c".to_string())),
			}
		}

		fn normalize(&self, expr: &Expr) -> Result<NormalizedSource> {
			let ctx = SourceContext {
				env: &self.env,
				binding: &self.binding,
				schemas: &self.schemas,
				catalog: &self.catalog,
			};
			normalize(expr, &ctx)
		}
	}

	#[test]
	fn test_table_sources() {
		let fixture = Fixture::new();
		assert_eq!(
			fixture.normalize(&string("comments")).unwrap().source,
			JoinSource::Table(TableSource::table("comments"))
		);
		assert_eq!(
			fixture.normalize(&schema("Comment")).unwrap().source,
			JoinSource::Table(TableSource::schema("Comment"))
		);
		assert_eq!(
			fixture.normalize(&tuple([string("archived"), schema("Comment")])).unwrap().source,
			JoinSource::Table(TableSource::table_schema("archived", "Comment"))
		);
	}

	#[test]
	fn test_runtime_source() {
		let fixture = Fixture::new();
		let normalized = fixture.normalize(&pin(0)).unwrap();
		assert_eq!(normalized.source, JoinSource::Runtime(Placeholder::Positional(0)));
		assert_eq!(normalized.arity, Some(1));
	}

	#[test]
	fn test_malformed_source() {
		let fixture = Fixture::new();
		for expr in [int(1), var("comments"), tuple([schema("Comment"), string("x")]), call("lateral", [pin(0)])] {
			let err = fixture.normalize(&expr).unwrap_err();
			assert_eq!(err.code, "JOIN_014");
			assert_eq!(err.message, format!("malformed join source `{}`", expr));
		}
	}

	#[test]
	fn test_subquery_arity() {
		let fixture = Fixture::new();
		let inner = crate::join::JoinCompiler::new(&fixture.catalog)
			.join(Query::from_table("comments"), atom("left"), list([var("c")]), in_(var("u"), string("users")), None)
			.unwrap();

		let normalized = fixture.normalize(&subquery_with(query(inner), kw([("prefix", string("archive"))]))).unwrap();
		assert_eq!(normalized.arity, Some(2));
		let JoinSource::Subquery(subquery) = normalized.source else {
			panic!("expected a subquery source");
		};
		assert_eq!(subquery.prefix, Some(Staged::Literal("archive".to_string())));
	}

	#[test]
	fn test_subquery_options() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&subquery_with(pin(0), kw([("as", atom("s"))]))).unwrap_err();
		assert_eq!(err.code, "JOIN_003");
		assert_eq!(err.message, "invalid option `as` passed to subquery");

		let normalized = fixture.normalize(&subquery(pin(0))).unwrap();
		assert_eq!(normalized.arity, None);
	}

	#[test]
	fn test_assoc_resolves_through_catalog() {
		let fixture = Fixture::new();
		let JoinSource::Association(association) = fixture.normalize(&assoc(var("p"), atom("comments"))).unwrap().source
		else {
			panic!("expected an association source");
		};
		assert_eq!(association.owner, 0);
		let descriptor = association.descriptor.unwrap();
		assert_eq!(descriptor.cardinality, Cardinality::Many);
		assert_eq!(descriptor.related_source, "comments");
	}

	#[test]
	fn test_assoc_unknown_schema_is_deferred() {
		let fixture = Fixture::new();
		let JoinSource::Association(association) = fixture.normalize(&assoc(var("x"), atom("comments"))).unwrap().source
		else {
			panic!("expected an association source");
		};
		assert_eq!(association.owner, 1);
		assert_eq!(association.descriptor, None);
	}

	#[test]
	fn test_assoc_variable_field() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&assoc(var("p"), var("comments"))).unwrap_err();
		assert_eq!(err.code, "JOIN_006");
		assert_eq!(
			err.message,
			"you passed the variable `comments` to `assoc/2`. Did you mean to pass the atom `:comments`?"
		);
	}

	#[test]
	fn test_assoc_owner_errors() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&assoc(var("q"), atom("comments"))).unwrap_err();
		assert_eq!(err.message, "`assoc/2` expects a bound variable as its owner, got: `q`");

		let err = fixture.normalize(&assoc(var("c"), atom("comments"))).unwrap_err();
		assert_eq!(err.message, "`assoc/2` owner `c` refers to the binding being joined");
	}

	#[test]
	fn test_assoc_not_found() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&assoc(var("p"), atom("likes"))).unwrap_err();
		assert_eq!(err.code, "JOIN_011");
		assert_eq!(err.message, "could not find association `likes` on schema `Post`");
	}

	fn rows() -> Expr {
		list([kw([("id", int(1)), ("name", string("a"))]), map([("name", string("b")), ("id", pin(0))])])
	}

	#[test]
	fn test_values_list() {
		let fixture = Fixture::new();
		let types = kw([("id", atom("integer")), ("name", atom("string"))]);
		let JoinSource::Values(ValuesSource::List(list)) =
			fixture.normalize(&values(rows(), types)).unwrap().source
		else {
			panic!("expected a values list");
		};

		assert_eq!(list.types, vec![("id".to_string(), Type::Integer), ("name".to_string(), Type::String)]);
		assert_eq!(list.num_rows, 2);
		assert_eq!(list.params.len(), 4);
		assert_eq!(list.params[0], Param::new(Staged::Literal(Value::Integer(1)), TypeTag::Type(Type::Integer)));
		assert_eq!(list.params[2], Param::new(Staged::Deferred(Placeholder::Positional(0)), TypeTag::Type(Type::Integer)));
		assert_eq!(list.params[3].value, Staged::Literal(Value::string("b")));
	}

	#[test]
	fn test_values_undeclared_type() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&values(rows(), kw([("id", atom("integer"))]))).unwrap_err();
		assert_eq!(err.code, "JOIN_008");
		assert_eq!(err.message, "each field in a values list must have a declared type, `name` has none");
	}

	#[test]
	fn test_values_missing_field() {
		let fixture = Fixture::new();
		let rows = list([kw([("id", int(1)), ("name", string("a"))]), kw([("id", int(2))])]);
		let err = fixture
			.normalize(&values(rows, kw([("id", atom("integer")), ("name", atom("string"))])))
			.unwrap_err();
		assert_eq!(err.code, "JOIN_008");
		assert_eq!(
			err.message,
			"each row in a values list must contain every declared field, `name` is missing from row 1: %{id: 2}"
		);
	}

	#[test]
	fn test_values_duplicate_field() {
		let fixture = Fixture::new();
		let rows = list([kw([("id", int(1))]), kw([("id", int(1)), ("id", int(2))])]);
		let err = fixture.normalize(&values(rows, kw([("id", atom("integer"))]))).unwrap_err();
		assert_eq!(err.code, "JOIN_008");
		assert_eq!(err.message, "field `id` appears more than once in row 1 of the values list");
	}

	#[test]
	fn test_values_unknown_type_and_empty() {
		let fixture = Fixture::new();
		let err = fixture.normalize(&values(rows(), kw([("id", atom("integer")), ("name", atom("text2"))]))).unwrap_err();
		assert_eq!(err.message, "unknown type `text2` declared for field `name` in values list");

		let err = fixture.normalize(&values(list([]), kw([("id", atom("integer"))]))).unwrap_err();
		assert_eq!(err.message, "must pass a non-empty list of rows to `values/2`");
	}

	#[test]
	fn test_values_pending() {
		let fixture = Fixture::new();
		let normalized = fixture.normalize(&values(pin(0), kw([("id", atom("integer"))]))).unwrap();
		assert_eq!(
			normalized.source,
			JoinSource::Values(ValuesSource::Pending {
				rows: Staged::Deferred(Placeholder::Positional(0)),
				types: Staged::Literal(vec![("id".to_string(), Type::Integer)]),
			})
		);
	}

	#[test]
	fn test_runtime_values() {
		let mut row = IndexMap::new();
		row.insert("id".to_string(), Value::Integer(3));
		let rows = rows_from_value(&Value::List(vec![Value::Map(row)])).unwrap();

		let mut types = IndexMap::new();
		types.insert("id".to_string(), Value::atom("integer"));
		let types = types_from_value(&Value::Map(types)).unwrap();

		let list = check_values(&rows, &types).unwrap();
		assert_eq!(list.num_rows, 1);

		let err = rows_from_value(&Value::Integer(1)).unwrap_err();
		assert_eq!(err.code, "JOIN_008");
	}
}
