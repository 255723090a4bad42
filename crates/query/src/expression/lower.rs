// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{Fragment, Result, Value, return_error};
use tracing::trace;

use crate::{
	ast::{BinaryOperator, Expr, Literal},
	error::JoinError,
	expression::{BooleanExpr, ExpressionCompiler, LoweringContext, QueryExpr},
	query::join::OnClause,
	staged::Staged,
};

/// Lowers the `on` option of a join whose first slot is `binding`.
pub fn lower_on(
	on: Option<&Expr>,
	binding: usize,
	ctx: LoweringContext<'_>,
	compiler: &dyn ExpressionCompiler,
) -> Result<OnClause> {
	let Some(on) = on else {
		return Ok(OnClause::Compiled(BooleanExpr::truth()));
	};

	match on {
		Expr::Interpolate(placeholder) => {
			trace!(placeholder = %placeholder, "deferring join condition");
			Ok(OnClause::Deferred {
				placeholder: placeholder.clone(),
				natural: None,
			})
		}
		Expr::Keyword(pairs) => Ok(OnClause::Compiled(lower_keyword(pairs, binding, ctx, compiler)?)),
		Expr::List(items) if items.is_empty() => Ok(OnClause::Compiled(BooleanExpr::truth())),
		Expr::List(_) => return_error!(JoinError::InvalidOnExpression {
			reason: format!("expected a boolean expression or a keyword list, got: `{}`", on),
			fragment: Fragment::internal(on.to_string()),
		}),
		_ => Ok(OnClause::Compiled(lower_expression(on, ctx, compiler)?)),
	}
}

pub fn lower_expression(
	expr: &Expr,
	mut ctx: LoweringContext<'_>,
	compiler: &dyn ExpressionCompiler,
) -> Result<BooleanExpr> {
	reject_cross_query(expr)?;
	let compiled = compiler.compile(expr, &mut ctx)?;
	Ok(ctx.finish(compiled))
}

/// `[field: value, ...]` becomes `binding.field == value and ...`. Boolean
/// literals are tagged with the field's type, interpolations become params
/// of that type.
pub fn lower_keyword(
	pairs: &[(String, Expr)],
	binding: usize,
	mut ctx: LoweringContext<'_>,
	compiler: &dyn ExpressionCompiler,
) -> Result<BooleanExpr> {
	let mut conjunction: Option<QueryExpr> = None;

	for (field, value) in pairs {
		let left = QueryExpr::field(binding, field.clone());
		let right = match value {
			Expr::Literal(Literal::Boolean(b)) => {
				QueryExpr::typed(QueryExpr::Literal(Value::Boolean(*b)), ctx.resolve_tag(binding, field))
			}
			Expr::Interpolate(placeholder) => {
				let tag = ctx.resolve_tag(binding, field);
				QueryExpr::Param(ctx.push_param(Staged::Deferred(placeholder.clone()), tag))
			}
			other => {
				reject_cross_query(other)?;
				compiler.compile(other, &mut ctx)?
			}
		};

		conjunction = Some(and_then(conjunction, QueryExpr::eq(left, right)));
	}

	Ok(match conjunction {
		Some(expr) => ctx.finish(expr),
		None => BooleanExpr::truth(),
	})
}

/// Same as [`lower_keyword`] for a keyword list supplied at runtime; every
/// non boolean value becomes a param.
pub fn lower_keyword_values(
	pairs: &[(String, Value)],
	binding: usize,
	mut ctx: LoweringContext<'_>,
) -> BooleanExpr {
	let mut conjunction: Option<QueryExpr> = None;

	for (field, value) in pairs {
		let tag = ctx.resolve_tag(binding, field);
		let right = match value {
			Value::Boolean(b) => QueryExpr::typed(QueryExpr::Literal(Value::Boolean(*b)), tag),
			other => QueryExpr::Param(ctx.push_param(Staged::Literal(other.clone()), tag)),
		};
		conjunction = Some(and_then(conjunction, QueryExpr::eq(QueryExpr::field(binding, field.clone()), right)));
	}

	match conjunction {
		Some(expr) => ctx.finish(expr),
		None => BooleanExpr::truth(),
	}
}

fn and_then(acc: Option<QueryExpr>, next: QueryExpr) -> QueryExpr {
	match acc {
		Some(acc) => QueryExpr::binary(BinaryOperator::And, acc, next),
		None => next,
	}
}

/// Conditions are compiled against a single query; anything that needs a
/// query of its own is rejected.
pub fn reject_cross_query(expr: &Expr) -> Result<()> {
	match expr {
		Expr::Query(_) => invalid_on(expr, "subqueries aren't supported"),
		Expr::Call {
			function,
			..
		} if function == "exists" => invalid_on(expr, "`exists/1` isn't supported"),
		Expr::Call {
			function,
			..
		} if function == "subquery" => invalid_on(expr, "subqueries aren't supported"),
		Expr::Call {
			args,
			..
		} => args.iter().try_for_each(reject_cross_query),
		Expr::Binary {
			left,
			right,
			..
		} => {
			reject_cross_query(left)?;
			reject_cross_query(right)
		}
		Expr::Not(inner) => reject_cross_query(inner),
		Expr::List(items) | Expr::Tuple(items) => items.iter().try_for_each(reject_cross_query),
		Expr::Keyword(pairs) | Expr::Map(pairs) => pairs.iter().try_for_each(|(_, value)| reject_cross_query(value)),
		_ => Ok(()),
	}
}

fn invalid_on(expr: &Expr, reason: &str) -> Result<()> {
	return_error!(JoinError::InvalidOnExpression {
		reason: format!("{}, got: `{}`", reason, expr),
		fragment: Fragment::internal(expr.to_string()),
	})
}

#[cfg(test)]
pub mod tests {
	use strata_catalog::{MaterializedCatalog, SchemaDef};
	use strata_type::Type;

	use super::*;
	use crate::{
		ast::build::*,
		binding::BindingEnv,
		expression::{DefaultExpressionCompiler, Param, TypeTag},
		staged::Placeholder,
	};

	struct Fixture {
		catalog: MaterializedCatalog,
		env: BindingEnv,
		schemas: Vec<Option<String>>,
	}

	impl Fixture {
		fn new() -> Self {
			Self {
				catalog: MaterializedCatalog::new().with_schema(
					SchemaDef::new("Comment", "comments")
						.with_field("post_id", Type::Integer)
						.with_field("public", Type::Boolean),
				),
				env: BindingEnv::from_names([("p", 0), ("c", 1)], 2),
				schemas: vec![None, Some("Comment".to_string())],
			}
		}

		fn ctx(&self) -> LoweringContext<'_> {
			LoweringContext::new(&self.env, &self.schemas, &self.catalog)
		}

		fn lower(&self, on: &Expr) -> Result<OnClause> {
			lower_on(Some(on), 1, self.ctx(), &DefaultExpressionCompiler)
		}
	}

	#[test]
	fn test_missing_on_is_truth() {
		let fixture = Fixture::new();
		let on = lower_on(None, 1, fixture.ctx(), &DefaultExpressionCompiler).unwrap();
		assert_eq!(on, OnClause::Compiled(BooleanExpr::truth()));
	}

	#[test]
	fn test_keyword_with_known_schema() {
		let fixture = Fixture::new();
		let on = fixture.lower(&kw([("post_id", field("p", "id")), ("public", boolean(true))])).unwrap();

		let expected = QueryExpr::binary(
			BinaryOperator::And,
			QueryExpr::eq(QueryExpr::field(1, "post_id"), QueryExpr::field(0, "id")),
			QueryExpr::eq(
				QueryExpr::field(1, "public"),
				QueryExpr::typed(QueryExpr::Literal(Value::Boolean(true)), TypeTag::Type(Type::Boolean)),
			),
		);
		assert_eq!(on, OnClause::Compiled(BooleanExpr::new(expected, vec![])));
	}

	#[test]
	fn test_keyword_pin_becomes_typed_param() {
		let fixture = Fixture::new();
		let OnClause::Compiled(cond) = fixture.lower(&kw([("post_id", pin(0))])).unwrap() else {
			panic!("expected a compiled condition");
		};
		assert_eq!(cond.expr, QueryExpr::eq(QueryExpr::field(1, "post_id"), QueryExpr::Param(0)));
		assert_eq!(cond.params, vec![Param::new(Staged::Deferred(Placeholder::Positional(0)), TypeTag::Type(Type::Integer))]);
	}

	#[test]
	fn test_interpolated_on_is_deferred() {
		let fixture = Fixture::new();
		let on = fixture.lower(&pin_named("filter")).unwrap();
		assert_eq!(
			on,
			OnClause::Deferred {
				placeholder: Placeholder::Named("filter".into()),
				natural: None
			}
		);
	}

	#[test]
	fn test_exists_rejected() {
		let fixture = Fixture::new();
		let err = fixture.lower(&and(boolean(true), exists(subquery(pin(0))))).unwrap_err();
		assert_eq!(err.code, "JOIN_007");
		assert!(err.message.starts_with("invalid expression for join `:on`"));
	}

	#[test]
	fn test_in_subquery_rejected() {
		let fixture = Fixture::new();
		let err = fixture.lower(&in_(field("c", "post_id"), subquery(pin(0)))).unwrap_err();
		assert_eq!(err.code, "JOIN_007");
		assert!(err.message.contains("subqueries aren't supported"));
	}

	#[test]
	fn test_plain_list_rejected() {
		let fixture = Fixture::new();
		let err = fixture.lower(&list([boolean(true)])).unwrap_err();
		assert_eq!(err.code, "JOIN_007");
	}

	#[test]
	fn test_runtime_keyword_values() {
		let fixture = Fixture::new();
		let cond = lower_keyword_values(
			&[("post_id".to_string(), Value::Integer(7)), ("public".to_string(), Value::Boolean(false))],
			1,
			fixture.ctx(),
		);
		assert_eq!(cond.params, vec![Param::new(Staged::Literal(Value::Integer(7)), TypeTag::Type(Type::Integer))]);
		assert_eq!(cond.to_string(), "(($1.post_id == ?0) and ($1.public == type(false, boolean)))");
	}
}
