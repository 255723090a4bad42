// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{Fragment, Result, Type, Value, return_error};
use tracing::trace;

use crate::{
	ast::{BinaryOperator, Expr},
	error::ExpressionError,
	expression::{ExpressionCompiler, LoweringContext, QueryExpr, TypeTag},
	staged::Staged,
};

/// Compiles the boolean subset of [`Expr`] accepted in `on` clauses:
/// comparisons, `and`/`or`/`not`, `in` against lists, `is_nil/1` and
/// `type/2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExpressionCompiler;

impl ExpressionCompiler for DefaultExpressionCompiler {
	fn compile(&self, expr: &Expr, ctx: &mut LoweringContext<'_>) -> Result<QueryExpr> {
		compile_expr(expr, ctx, &TypeTag::Any)
	}
}

fn unsupported(expr: &Expr, reason: &str) -> ExpressionError {
	ExpressionError::Unsupported {
		got: expr.to_string(),
		reason: reason.to_string(),
		fragment: Fragment::internal(expr.to_string()),
	}
}

/// `hint` is the tag given to an interpolated operand, taken from the
/// field it is compared against.
fn compile_expr(expr: &Expr, ctx: &mut LoweringContext<'_>, hint: &TypeTag) -> Result<QueryExpr> {
	match expr {
		Expr::Literal(literal) => Ok(QueryExpr::Literal(literal.to_value())),

		Expr::Atom(name) => Ok(QueryExpr::Literal(Value::Atom(name.clone()))),

		Expr::Field {
			var,
			field,
		} => {
			let Some(binding) = ctx.env.lookup(var) else {
				return_error!(ExpressionError::UnboundVariable {
					name: var.clone(),
					fragment: Fragment::internal(expr.to_string()),
				});
			};
			Ok(QueryExpr::field(binding, field.clone()))
		}

		Expr::Interpolate(placeholder) => {
			let index = ctx.push_param(Staged::Deferred(placeholder.clone()), hint.clone());
			Ok(QueryExpr::Param(index))
		}

		Expr::Binary {
			op,
			left,
			right,
		} => compile_binary(*op, left, right, ctx),

		Expr::Not(inner) => Ok(QueryExpr::Not(Box::new(compile_expr(inner, ctx, &TypeTag::Any)?))),

		Expr::List(items) => {
			let items = items.iter().map(|item| compile_expr(item, ctx, hint)).collect::<Result<Vec<_>>>()?;
			Ok(QueryExpr::List(items))
		}

		Expr::Call {
			function,
			args,
		} => match (function.as_str(), args.as_slice()) {
			("is_nil", [inner]) => Ok(QueryExpr::IsNil(Box::new(compile_expr(inner, ctx, &TypeTag::Any)?))),
			("type", [inner, ty]) => compile_type(expr, inner, ty, ctx),
			_ => return_error!(unsupported(expr, "only `is_nil/1` and `type/2` may be called in a condition")),
		},

		Expr::Var(name) => {
			if ctx.env.lookup(name).is_none() {
				return_error!(ExpressionError::UnboundVariable {
					name: name.clone(),
					fragment: Fragment::internal(name.clone()),
				});
			}
			return_error!(unsupported(expr, "a binding must be accessed through one of its fields"))
		}

		_ => return_error!(unsupported(expr, "it cannot be used in a condition")),
	}
}

fn compile_binary(op: BinaryOperator, left: &Expr, right: &Expr, ctx: &mut LoweringContext<'_>) -> Result<QueryExpr> {
	let left_hint = field_tag(right, ctx);
	let right_hint = match (op, field_tag(left, ctx)) {
		(BinaryOperator::In, TypeTag::Type(ty)) => TypeTag::Type(Type::array(ty)),
		(BinaryOperator::In, _) => TypeTag::Any,
		(_, tag) => tag,
	};

	trace!(op = %op, left = %left, right = %right, "compiling binary expression");

	let (left, right) = if op == BinaryOperator::In {
		// `x in [a, b]` hints each element with the field type
		let element_hint = field_tag(left, ctx);
		let left = compile_expr(left, ctx, &left_hint)?;
		let right = match right {
			Expr::List(_) => compile_expr(right, ctx, &element_hint)?,
			_ => compile_expr(right, ctx, &right_hint)?,
		};
		(left, right)
	} else {
		(compile_expr(left, ctx, &left_hint)?, compile_expr(right, ctx, &right_hint)?)
	};

	Ok(QueryExpr::binary(op, left, right))
}

fn compile_type(call: &Expr, inner: &Expr, ty: &Expr, ctx: &mut LoweringContext<'_>) -> Result<QueryExpr> {
	let name = match ty {
		Expr::Atom(name) => name.as_str(),
		Expr::Literal(crate::ast::Literal::String(name)) => name.as_str(),
		_ => return_error!(unsupported(call, "`type/2` expects a type name as its second argument")),
	};

	let Ok(ty) = name.parse::<Type>() else {
		return_error!(ExpressionError::UnknownType {
			type_name: name.to_string(),
			fragment: Fragment::internal(ty.to_string()),
		});
	};

	let tag = TypeTag::Type(ty);
	match inner {
		Expr::Interpolate(_) => compile_expr(inner, ctx, &tag),
		_ => Ok(QueryExpr::typed(compile_expr(inner, ctx, &TypeTag::Any)?, tag)),
	}
}

fn field_tag(expr: &Expr, ctx: &LoweringContext<'_>) -> TypeTag {
	match expr {
		Expr::Field {
			var,
			field,
		} => match ctx.env.lookup(var) {
			Some(binding) => ctx.resolve_tag(binding, field),
			None => TypeTag::Any,
		},
		_ => TypeTag::Any,
	}
}
