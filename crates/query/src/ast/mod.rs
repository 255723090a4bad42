// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Host-agnostic expression tree handed to the join compiler.
//!
//! Front ends (macros, parsers, builders) produce [`Expr`] values; the
//! compiler only ever pattern matches on their shape.

use std::fmt::{self, Display, Formatter};

use strata_type::Value;

use crate::{query::Query, staged::Placeholder};

pub mod build;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
	Undefined,
	Boolean(bool),
	Integer(i64),
	Float(f64),
	String(String),
}

impl Literal {
	pub fn to_value(&self) -> Value {
		match self {
			Literal::Undefined => Value::Undefined,
			Literal::Boolean(b) => Value::Boolean(*b),
			Literal::Integer(i) => Value::Integer(*i),
			Literal::Float(f) => Value::Float(*f),
			Literal::String(s) => Value::String(s.clone()),
		}
	}
}

impl Display for Literal {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Literal::Undefined => f.write_str("nil"),
			Literal::Boolean(b) => write!(f, "{}", b),
			Literal::Integer(i) => write!(f, "{}", i),
			Literal::Float(v) => write!(f, "{:?}", v),
			Literal::String(s) => write!(f, "{:?}", s),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
	Eq,
	NotEq,
	Lt,
	LtEq,
	Gt,
	GtEq,
	And,
	Or,
	In,
	Like,
	Add,
	Sub,
	Mul,
	Div,
}

impl BinaryOperator {
	pub fn is_comparison(&self) -> bool {
		matches!(
			self,
			BinaryOperator::Eq
				| BinaryOperator::NotEq
				| BinaryOperator::Lt | BinaryOperator::LtEq
				| BinaryOperator::Gt | BinaryOperator::GtEq
				| BinaryOperator::Like
		)
	}

	pub fn symbol(&self) -> &'static str {
		match self {
			BinaryOperator::Eq => "==",
			BinaryOperator::NotEq => "!=",
			BinaryOperator::Lt => "<",
			BinaryOperator::LtEq => "<=",
			BinaryOperator::Gt => ">",
			BinaryOperator::GtEq => ">=",
			BinaryOperator::And => "and",
			BinaryOperator::Or => "or",
			BinaryOperator::In => "in",
			BinaryOperator::Like => "like",
			BinaryOperator::Add => "+",
			BinaryOperator::Sub => "-",
			BinaryOperator::Mul => "*",
			BinaryOperator::Div => "/",
		}
	}
}

impl Display for BinaryOperator {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.symbol())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Literal(Literal),
	/// `:name`
	Atom(String),
	Var(String),
	/// `...` inside a binding list
	Ellipsis,
	/// `var.field`
	Field {
		var: String,
		field: String,
	},
	/// Reference to a schema by name, e.g. `Post`
	Schema(String),
	/// `^0` / `^name`
	Interpolate(Placeholder),
	Query(Box<Query>),
	Call {
		function: String,
		args: Vec<Expr>,
	},
	Binary {
		op: BinaryOperator,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Not(Box<Expr>),
	/// `[key: value, ...]`
	Keyword(Vec<(String, Expr)>),
	List(Vec<Expr>),
	/// `{a, b}`
	Tuple(Vec<Expr>),
	/// `%{key: value}`
	Map(Vec<(String, Expr)>),
}

impl Expr {
	pub fn as_var(&self) -> Option<&str> {
		match self {
			Expr::Var(name) => Some(name),
			_ => None,
		}
	}

	pub fn as_keyword(&self) -> Option<&[(String, Expr)]> {
		match self {
			Expr::Keyword(pairs) => Some(pairs),
			Expr::List(items) if items.is_empty() => Some(&[]),
			_ => None,
		}
	}

	pub fn is_call(&self, name: &str) -> bool {
		matches!(self, Expr::Call { function, .. } if function == name)
	}

	pub fn is_interpolated(&self) -> bool {
		matches!(self, Expr::Interpolate(_))
	}
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
	for (i, item) in items.iter().enumerate() {
		if i > 0 {
			f.write_str(", ")?;
		}
		write!(f, "{}", item)?;
	}
	Ok(())
}

fn write_pairs(f: &mut Formatter<'_>, pairs: &[(String, Expr)]) -> fmt::Result {
	for (i, (key, value)) in pairs.iter().enumerate() {
		if i > 0 {
			f.write_str(", ")?;
		}
		write!(f, "{}: {}", key, value)?;
	}
	Ok(())
}

impl Display for Expr {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Expr::Literal(literal) => literal.fmt(f),
			Expr::Atom(name) => write!(f, ":{}", name),
			Expr::Var(name) => f.write_str(name),
			Expr::Ellipsis => f.write_str("..."),
			Expr::Field {
				var,
				field,
			} => write!(f, "{}.{}", var, field),
			Expr::Schema(name) => f.write_str(name),
			Expr::Interpolate(placeholder) => placeholder.fmt(f),
			Expr::Query(query) => query.fmt(f),
			Expr::Call {
				function,
				args,
			} => {
				write!(f, "{}(", function)?;
				for (i, arg) in args.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					match arg {
						Expr::Keyword(pairs) if i == args.len() - 1 => write_pairs(f, pairs)?,
						other => write!(f, "{}", other)?,
					}
				}
				f.write_str(")")
			}
			Expr::Binary {
				op,
				left,
				right,
			} => write!(f, "{} {} {}", left, op, right),
			Expr::Not(inner) => write!(f, "not {}", inner),
			Expr::Keyword(pairs) => {
				f.write_str("[")?;
				write_pairs(f, pairs)?;
				f.write_str("]")
			}
			Expr::List(items) => {
				f.write_str("[")?;
				write_separated(f, items)?;
				f.write_str("]")
			}
			Expr::Tuple(items) => {
				f.write_str("{")?;
				write_separated(f, items)?;
				f.write_str("}")
			}
			Expr::Map(pairs) => {
				f.write_str("%{")?;
				write_pairs(f, pairs)?;
				f.write_str("}")
			}
		}
	}
}

#[cfg(test)]
pub mod tests {
	use super::build::*;

	#[test]
	fn test_display_on_expression() {
		let expr = and(eq(field("c", "post_id"), field("p", "id")), not(is_nil(field("c", "body"))));
		assert_eq!(expr.to_string(), "c.post_id == p.id and not is_nil(c.body)");
	}

	#[test]
	fn test_display_calls() {
		assert_eq!(assoc(var("p"), atom("comments")).to_string(), "assoc(p, :comments)");
		assert_eq!(
			subquery_with(pin(0), kw([("prefix", string("archive"))])).to_string(),
			"subquery(^0, prefix: \"archive\")"
		);
		assert_eq!(tuple([string("posts"), schema("Post")]).to_string(), "{\"posts\", Post}");
	}

	#[test]
	fn test_display_binding_list() {
		let bindings = list([var("p"), ellipsis(), named("author", var("a"))]);
		assert_eq!(bindings.to_string(), "[p, ..., [author: a]]");
	}

	#[test]
	fn test_as_keyword() {
		assert!(kw([("on", boolean(true))]).as_keyword().is_some());
		assert_eq!(list([]).as_keyword().map(|pairs| pairs.len()), Some(0));
		assert!(list([var("p")]).as_keyword().is_none());
	}
}
