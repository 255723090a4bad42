// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use strata_catalog::SchemaCatalog;
use strata_type::{Result, Type, Value};

use crate::{
	ast::{BinaryOperator, Expr},
	binding::BindingEnv,
	staged::Staged,
};

mod compile;
pub mod lower;

pub use compile::DefaultExpressionCompiler;

/// Type a parameter or literal is checked against when the query is bound.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
	Any,
	Type(Type),
	/// The type of `field` on whatever schema ends up behind `binding`.
	Field {
		binding: usize,
		field: String,
	},
}

impl Display for TypeTag {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			TypeTag::Any => f.write_str("any"),
			TypeTag::Type(ty) => ty.fmt(f),
			TypeTag::Field {
				binding,
				field,
			} => write!(f, "typeof(${}.{})", binding, field),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
	Literal(Value),
	Field {
		binding: usize,
		field: String,
	},
	/// Index into the owning [`BooleanExpr::params`].
	Param(usize),
	Typed {
		expr: Box<QueryExpr>,
		tag: TypeTag,
	},
	Binary {
		op: BinaryOperator,
		left: Box<QueryExpr>,
		right: Box<QueryExpr>,
	},
	Not(Box<QueryExpr>),
	IsNil(Box<QueryExpr>),
	List(Vec<QueryExpr>),
}

impl QueryExpr {
	pub fn field(binding: usize, field: impl Into<String>) -> Self {
		QueryExpr::Field {
			binding,
			field: field.into(),
		}
	}

	pub fn binary(op: BinaryOperator, left: QueryExpr, right: QueryExpr) -> Self {
		QueryExpr::Binary {
			op,
			left: Box::new(left),
			right: Box::new(right),
		}
	}

	pub fn eq(left: QueryExpr, right: QueryExpr) -> Self {
		Self::binary(BinaryOperator::Eq, left, right)
	}

	pub fn typed(expr: QueryExpr, tag: TypeTag) -> Self {
		QueryExpr::Typed {
			expr: Box::new(expr),
			tag,
		}
	}

	/// Highest binding index referenced anywhere in the expression.
	pub fn max_binding(&self) -> Option<usize> {
		match self {
			QueryExpr::Literal(_) | QueryExpr::Param(_) => None,
			QueryExpr::Field {
				binding,
				..
			} => Some(*binding),
			QueryExpr::Typed {
				expr,
				tag,
			} => {
				let tagged = match tag {
					TypeTag::Field {
						binding,
						..
					} => Some(*binding),
					_ => None,
				};
				expr.max_binding().max(tagged)
			}
			QueryExpr::Binary {
				left,
				right,
				..
			} => left.max_binding().max(right.max_binding()),
			QueryExpr::Not(inner) | QueryExpr::IsNil(inner) => inner.max_binding(),
			QueryExpr::List(items) => items.iter().filter_map(QueryExpr::max_binding).max(),
		}
	}

	/// Moves every reference to a non-base binding up by `offset`.
	pub(crate) fn shift_bindings(&mut self, offset: usize) {
		match self {
			QueryExpr::Literal(_) | QueryExpr::Param(_) => {}
			QueryExpr::Field {
				binding,
				..
			} => {
				if *binding > 0 {
					*binding += offset;
				}
			}
			QueryExpr::Typed {
				expr,
				tag,
			} => {
				tag.shift_bindings(offset);
				expr.shift_bindings(offset);
			}
			QueryExpr::Binary {
				left,
				right,
				..
			} => {
				left.shift_bindings(offset);
				right.shift_bindings(offset);
			}
			QueryExpr::Not(inner) | QueryExpr::IsNil(inner) => inner.shift_bindings(offset),
			QueryExpr::List(items) => items.iter_mut().for_each(|item| item.shift_bindings(offset)),
		}
	}

	fn shift_params(&mut self, offset: usize) {
		match self {
			QueryExpr::Literal(_) | QueryExpr::Field {
				..
			} => {}
			QueryExpr::Param(index) => *index += offset,
			QueryExpr::Typed {
				expr,
				..
			}
			| QueryExpr::Not(expr)
			| QueryExpr::IsNil(expr) => expr.shift_params(offset),
			QueryExpr::Binary {
				left,
				right,
				..
			} => {
				left.shift_params(offset);
				right.shift_params(offset);
			}
			QueryExpr::List(items) => items.iter_mut().for_each(|item| item.shift_params(offset)),
		}
	}
}

impl TypeTag {
	pub(crate) fn shift_bindings(&mut self, offset: usize) {
		if let TypeTag::Field {
			binding,
			..
		} = self
		{
			if *binding > 0 {
				*binding += offset;
			}
		}
	}
}

impl Display for QueryExpr {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			QueryExpr::Literal(value) => value.fmt(f),
			QueryExpr::Field {
				binding,
				field,
			} => write!(f, "${}.{}", binding, field),
			QueryExpr::Param(index) => write!(f, "?{}", index),
			QueryExpr::Typed {
				expr,
				tag,
			} => write!(f, "type({}, {})", expr, tag),
			QueryExpr::Binary {
				op,
				left,
				right,
			} => write!(f, "({} {} {})", left, op, right),
			QueryExpr::Not(inner) => write!(f, "not {}", inner),
			QueryExpr::IsNil(inner) => write!(f, "is_nil({})", inner),
			QueryExpr::List(items) => {
				f.write_str("[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str("]")
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
	pub value: Staged<Value>,
	pub tag: TypeTag,
}

impl Param {
	pub fn new(value: Staged<Value>, tag: TypeTag) -> Self {
		Self {
			value,
			tag,
		}
	}

	pub(crate) fn shift_bindings(&mut self, offset: usize) {
		self.tag.shift_bindings(offset);
	}
}

/// A compiled condition together with the parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanExpr {
	pub expr: QueryExpr,
	pub params: Vec<Param>,
}

impl BooleanExpr {
	pub fn new(expr: QueryExpr, params: Vec<Param>) -> Self {
		Self {
			expr,
			params,
		}
	}

	pub fn truth() -> Self {
		Self::new(QueryExpr::Literal(Value::Boolean(true)), vec![])
	}

	pub fn is_truth(&self) -> bool {
		self.params.is_empty() && self.expr == QueryExpr::Literal(Value::Boolean(true))
	}

	/// Conjoins two conditions, renumbering the parameters of `other` so
	/// they follow those of `self`.
	pub fn and(self, other: BooleanExpr) -> BooleanExpr {
		if self.is_truth() {
			return other;
		}
		if other.is_truth() {
			return self;
		}

		let BooleanExpr {
			expr: mut right,
			params: right_params,
		} = other;
		right.shift_params(self.params.len());

		let mut params = self.params;
		params.extend(right_params);

		BooleanExpr {
			expr: QueryExpr::binary(BinaryOperator::And, self.expr, right),
			params,
		}
	}

	pub fn max_binding(&self) -> Option<usize> {
		let tagged = self
			.params
			.iter()
			.filter_map(|param| match &param.tag {
				TypeTag::Field {
					binding,
					..
				} => Some(*binding),
				_ => None,
			})
			.max();
		self.expr.max_binding().max(tagged)
	}

	pub(crate) fn shift_bindings(&mut self, offset: usize) {
		self.expr.shift_bindings(offset);
		self.params.iter_mut().for_each(|param| param.shift_bindings(offset));
	}
}

impl Display for BooleanExpr {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		self.expr.fmt(f)
	}
}

/// Compiles boolean expressions for `on` clauses.
pub trait ExpressionCompiler: Send + Sync {
	fn compile(&self, expr: &Expr, ctx: &mut LoweringContext<'_>) -> Result<QueryExpr>;
}

/// State shared by the expression compiler while one condition is lowered.
pub struct LoweringContext<'a> {
	pub env: &'a BindingEnv,
	pub schemas: &'a [Option<String>],
	pub catalog: &'a dyn SchemaCatalog,
	params: Vec<Param>,
}

impl<'a> LoweringContext<'a> {
	pub fn new(env: &'a BindingEnv, schemas: &'a [Option<String>], catalog: &'a dyn SchemaCatalog) -> Self {
		Self {
			env,
			schemas,
			catalog,
			params: vec![],
		}
	}

	pub fn push_param(&mut self, value: Staged<Value>, tag: TypeTag) -> usize {
		self.params.push(Param::new(value, tag));
		self.params.len() - 1
	}

	pub fn schema_of(&self, binding: usize) -> Option<&str> {
		self.schemas.get(binding).and_then(|schema| schema.as_deref())
	}

	/// Type of `field` on `binding`, falling back to a symbolic tag when the
	/// schema behind the binding is not known yet.
	pub fn resolve_tag(&self, binding: usize, field: &str) -> TypeTag {
		self.schema_of(binding)
			.and_then(|schema| self.catalog.field_type(schema, field))
			.map(TypeTag::Type)
			.unwrap_or_else(|| TypeTag::Field {
				binding,
				field: field.to_string(),
			})
	}

	pub fn finish(self, expr: QueryExpr) -> BooleanExpr {
		BooleanExpr::new(expr, self.params)
	}
}
