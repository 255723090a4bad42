// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Constructors for [`Expr`] trees, mostly used by tests and front ends.

use crate::{
	ast::{BinaryOperator, Expr, Literal},
	query::Query,
	staged::Placeholder,
};

pub fn atom(name: impl Into<String>) -> Expr {
	Expr::Atom(name.into())
}

pub fn var(name: impl Into<String>) -> Expr {
	Expr::Var(name.into())
}

pub fn field(var: impl Into<String>, field: impl Into<String>) -> Expr {
	Expr::Field {
		var: var.into(),
		field: field.into(),
	}
}

pub fn string(value: impl Into<String>) -> Expr {
	Expr::Literal(Literal::String(value.into()))
}

pub fn int(value: i64) -> Expr {
	Expr::Literal(Literal::Integer(value))
}

pub fn float(value: f64) -> Expr {
	Expr::Literal(Literal::Float(value))
}

pub fn boolean(value: bool) -> Expr {
	Expr::Literal(Literal::Boolean(value))
}

pub fn nil() -> Expr {
	Expr::Literal(Literal::Undefined)
}

pub fn schema(name: impl Into<String>) -> Expr {
	Expr::Schema(name.into())
}

pub fn pin(index: usize) -> Expr {
	Expr::Interpolate(Placeholder::Positional(index))
}

pub fn pin_named(name: impl Into<String>) -> Expr {
	Expr::Interpolate(Placeholder::Named(name.into()))
}

pub fn query(query: Query) -> Expr {
	Expr::Query(Box::new(query))
}

pub fn call(function: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Expr {
	Expr::Call {
		function: function.into(),
		args: args.into_iter().collect(),
	}
}

pub fn assoc(owner: Expr, field: Expr) -> Expr {
	call("assoc", [owner, field])
}

pub fn subquery(source: Expr) -> Expr {
	call("subquery", [source])
}

pub fn subquery_with(source: Expr, options: Expr) -> Expr {
	call("subquery", [source, options])
}

pub fn values(rows: Expr, types: Expr) -> Expr {
	call("values", [rows, types])
}

pub fn exists(inner: Expr) -> Expr {
	call("exists", [inner])
}

pub fn is_nil(inner: Expr) -> Expr {
	call("is_nil", [inner])
}

/// `type(expr, :integer)`
pub fn typed(inner: Expr, type_name: impl Into<String>) -> Expr {
	call("type", [inner, atom(type_name)])
}

pub fn kw<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Expr)>) -> Expr {
	Expr::Keyword(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

pub fn map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Expr)>) -> Expr {
	Expr::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

pub fn list(items: impl IntoIterator<Item = Expr>) -> Expr {
	Expr::List(items.into_iter().collect())
}

pub fn tuple(items: impl IntoIterator<Item = Expr>) -> Expr {
	Expr::Tuple(items.into_iter().collect())
}

pub fn ellipsis() -> Expr {
	Expr::Ellipsis
}

/// Named binding entry `name: var` inside a binding list.
pub fn named(name: impl Into<String>, var: Expr) -> Expr {
	Expr::Keyword(vec![(name.into(), var)])
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
	Expr::Binary {
		op,
		left: Box::new(left),
		right: Box::new(right),
	}
}

pub fn eq(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Eq, left, right)
}

pub fn neq(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::NotEq, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Lt, left, right)
}

pub fn lte(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::LtEq, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Gt, left, right)
}

pub fn gte(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::GtEq, left, right)
}

pub fn like(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Like, left, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::And, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Or, left, right)
}

/// `left in right`, also the shape of a join target `c in source`.
pub fn in_(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::In, left, right)
}

pub fn add(left: Expr, right: Expr) -> Expr {
	binary(BinaryOperator::Add, left, right)
}

pub fn not(inner: Expr) -> Expr {
	Expr::Not(Box::new(inner))
}
