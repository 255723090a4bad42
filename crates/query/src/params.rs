// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::HashMap,
	fmt::{self, Display, Formatter},
};

use strata_type::{IntoValue, Value};

use crate::{ast::Expr, query::Query, staged::Placeholder};

/// Anything that can stand in for a join source at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Queryable {
	Table(String),
	Schema(String),
	TableSchema {
		table: String,
		schema: String,
	},
	Query(Box<Query>),
}

impl Display for Queryable {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Queryable::Table(table) => write!(f, "{:?}", table),
			Queryable::Schema(schema) => f.write_str(schema),
			Queryable::TableSchema {
				table,
				schema,
			} => write!(f, "{{{:?}, {}}}", table, schema),
			Queryable::Query(query) => query.fmt(f),
		}
	}
}

/// A boolean expression built at runtime, with its own binding list and
/// positional parameters (`^0` inside `expr` refers to `params[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamic {
	pub binding: Vec<Expr>,
	pub expr: Expr,
	pub params: Vec<Value>,
}

impl Dynamic {
	pub fn new(binding: impl IntoIterator<Item = Expr>, expr: Expr) -> Self {
		Self {
			binding: binding.into_iter().collect(),
			expr,
			params: vec![],
		}
	}

	pub fn with_params(mut self, params: impl IntoIterator<Item = Value>) -> Self {
		self.params = params.into_iter().collect();
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
	Value(Value),
	Queryable(Queryable),
	Dynamic(Dynamic),
}

impl Argument {
	pub fn kind(&self) -> &'static str {
		match self {
			Argument::Value(value) => value.kind(),
			Argument::Queryable(_) => "queryable",
			Argument::Dynamic(_) => "dynamic expression",
		}
	}
}

impl Display for Argument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Argument::Value(value) => value.fmt(f),
			Argument::Queryable(queryable) => queryable.fmt(f),
			Argument::Dynamic(dynamic) => write!(f, "dynamic({})", dynamic.expr),
		}
	}
}

pub trait IntoArgument {
	fn into_argument(self) -> Argument;
}

impl IntoArgument for Argument {
	fn into_argument(self) -> Argument {
		self
	}
}

impl IntoArgument for Queryable {
	fn into_argument(self) -> Argument {
		Argument::Queryable(self)
	}
}

impl IntoArgument for Query {
	fn into_argument(self) -> Argument {
		Argument::Queryable(Queryable::Query(Box::new(self)))
	}
}

impl IntoArgument for Dynamic {
	fn into_argument(self) -> Argument {
		Argument::Dynamic(self)
	}
}

macro_rules! impl_into_argument_for_value {
	($($t:ty),*) => {
		$(
			impl IntoArgument for $t {
				fn into_argument(self) -> Argument {
					Argument::Value(self.into_value())
				}
			}
		)*
	};
}

impl_into_argument_for_value!(Value, bool, i64, i32, u32, f64, &str, String, Vec<u8>);

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
	#[default]
	None,
	Positional(Vec<Argument>),
	Named(HashMap<String, Argument>),
}

impl Params {
	pub fn get(&self, placeholder: &Placeholder) -> Option<&Argument> {
		match placeholder {
			Placeholder::Positional(index) => self.get_positional(*index),
			Placeholder::Named(name) => self.get_named(name),
		}
	}

	pub fn get_positional(&self, index: usize) -> Option<&Argument> {
		match self {
			Params::Positional(arguments) => arguments.get(index),
			_ => None,
		}
	}

	pub fn get_named(&self, name: &str) -> Option<&Argument> {
		match self {
			Params::Named(map) => map.get(name),
			_ => None,
		}
	}

	pub fn empty() -> Params {
		Params::None
	}
}

impl From<()> for Params {
	fn from(_: ()) -> Self {
		Params::None
	}
}

impl From<Vec<Argument>> for Params {
	fn from(arguments: Vec<Argument>) -> Self {
		Params::Positional(arguments)
	}
}

impl From<HashMap<String, Argument>> for Params {
	fn from(map: HashMap<String, Argument>) -> Self {
		Params::Named(map)
	}
}

#[macro_export]
macro_rules! params {
    () => {
        $crate::params::Params::None
    };

    {} => {
        $crate::params::Params::None
    };

    // params!{ name: value, "key": value }
    { $($key:tt : $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::HashMap::new();
            $(
                map.insert($crate::params_key!($key), $crate::params::IntoArgument::into_argument($value));
            )*
            $crate::params::Params::Named(map)
        }
    };

    [] => {
        $crate::params::Params::None
    };

    // params![value1, value2, ...]
    [ $($value:expr),+ $(,)? ] => {
        {
            let arguments = vec![
                $($crate::params::IntoArgument::into_argument($value)),*
            ];
            $crate::params::Params::Positional(arguments)
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! params_key {
	($key:ident) => {
		stringify!($key).to_string()
	};
	($key:literal) => {
		$key.to_string()
	};
}
