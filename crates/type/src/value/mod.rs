// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod r#type;

/// A runtime value supplied as a query parameter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
	/// Value is not defined (think `null` in common programming languages)
	#[default]
	Undefined,
	/// A boolean: true or false.
	Boolean(bool),
	/// A 64-bit signed integer
	Integer(i64),
	/// A 64-bit float
	Float(f64),
	/// A UTF-8 encoded text.
	String(String),
	/// Raw bytes
	Binary(Vec<u8>),
	/// A symbolic name such as a schema reference or option atom
	Atom(String),
	List(Vec<Value>),
	Map(IndexMap<String, Value>),
}

impl Value {
	pub fn string(s: impl Into<String>) -> Self {
		Value::String(s.into())
	}

	pub fn atom(s: impl Into<String>) -> Self {
		Value::Atom(s.into())
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Value::Undefined)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	/// Name of the value's kind, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Boolean(_) => "boolean",
			Value::Integer(_) => "integer",
			Value::Float(_) => "float",
			Value::String(_) => "string",
			Value::Binary(_) => "binary",
			Value::Atom(_) => "atom",
			Value::List(_) => "list",
			Value::Map(_) => "map",
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Undefined => f.write_str("nil"),
			Value::Boolean(b) => write!(f, "{}", b),
			Value::Integer(i) => write!(f, "{}", i),
			Value::Float(v) => write!(f, "{:?}", v),
			Value::String(s) => write!(f, "{:?}", s),
			Value::Binary(bytes) => {
				f.write_str("<<")?;
				for (i, byte) in bytes.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}", byte)?;
				}
				f.write_str(">>")
			}
			Value::Atom(a) => write!(f, ":{}", a),
			Value::List(items) => {
				f.write_str("[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str("]")
			}
			Value::Map(entries) => {
				f.write_str("%{")?;
				for (i, (key, value)) in entries.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}: {}", key, value)?;
				}
				f.write_str("}")
			}
		}
	}
}

pub trait IntoValue {
	fn into_value(self) -> Value;
}

impl IntoValue for Value {
	fn into_value(self) -> Value {
		self
	}
}

impl IntoValue for bool {
	fn into_value(self) -> Value {
		Value::Boolean(self)
	}
}

impl IntoValue for i64 {
	fn into_value(self) -> Value {
		Value::Integer(self)
	}
}

impl IntoValue for i32 {
	fn into_value(self) -> Value {
		Value::Integer(self as i64)
	}
}

impl IntoValue for u32 {
	fn into_value(self) -> Value {
		Value::Integer(self as i64)
	}
}

impl IntoValue for f64 {
	fn into_value(self) -> Value {
		Value::Float(self)
	}
}

impl IntoValue for &str {
	fn into_value(self) -> Value {
		Value::String(self.to_string())
	}
}

impl IntoValue for String {
	fn into_value(self) -> Value {
		Value::String(self)
	}
}

impl IntoValue for Vec<u8> {
	fn into_value(self) -> Value {
		Value::Binary(self)
	}
}

impl<T: IntoValue> IntoValue for Option<T> {
	fn into_value(self) -> Value {
		match self {
			Some(v) => v.into_value(),
			None => Value::Undefined,
		}
	}
}

macro_rules! impl_from_for_value {
	($($t:ty),*) => {
		$(
			impl From<$t> for Value {
				fn from(value: $t) -> Self {
					value.into_value()
				}
			}
		)*
	};
}

impl_from_for_value!(bool, i64, i32, u32, f64, &str, String, Vec<u8>);
