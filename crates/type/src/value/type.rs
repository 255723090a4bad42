// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Column type a value can be checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
	Any,
	Boolean,
	Integer,
	Float,
	Decimal,
	String,
	Binary,
	Uuid,
	Date,
	Time,
	DateTime,
	Id,
	Map,
	Array(Box<Type>),
}

impl Type {
	pub fn array(inner: Type) -> Self {
		Type::Array(Box::new(inner))
	}

	/// Whether `value` is acceptable where this type is expected.
	/// `Undefined` is accepted everywhere.
	pub fn accepts(&self, value: &Value) -> bool {
		match (self, value) {
			(_, Value::Undefined) => true,
			(Type::Any, _) => true,
			(Type::Boolean, Value::Boolean(_)) => true,
			(Type::Integer | Type::Id, Value::Integer(_)) => true,
			(Type::Float, Value::Float(_) | Value::Integer(_)) => true,
			(Type::Decimal, Value::Integer(_) | Value::Float(_) | Value::String(_)) => true,
			(Type::String, Value::String(_)) => true,
			(Type::Binary, Value::Binary(_) | Value::String(_)) => true,
			(Type::Uuid, Value::String(_) | Value::Binary(_)) => true,
			(Type::Date | Type::Time | Type::DateTime, Value::String(_)) => true,
			(Type::Id, Value::String(_)) => true,
			(Type::Map, Value::Map(_)) => true,
			(Type::Array(inner), Value::List(items)) => items.iter().all(|item| inner.accepts(item)),
			_ => false,
		}
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Type::Any => f.write_str("any"),
			Type::Boolean => f.write_str("boolean"),
			Type::Integer => f.write_str("integer"),
			Type::Float => f.write_str("float"),
			Type::Decimal => f.write_str("decimal"),
			Type::String => f.write_str("string"),
			Type::Binary => f.write_str("binary"),
			Type::Uuid => f.write_str("uuid"),
			Type::Date => f.write_str("date"),
			Type::Time => f.write_str("time"),
			Type::DateTime => f.write_str("datetime"),
			Type::Id => f.write_str("id"),
			Type::Map => f.write_str("map"),
			Type::Array(inner) => write!(f, "array<{}>", inner),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl Display for UnknownType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "unknown type `{}`", self.0)
	}
}

impl std::error::Error for UnknownType {}

impl FromStr for Type {
	type Err = UnknownType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let name = s.trim();
		if let Some(inner) = name.strip_prefix("array<").and_then(|rest| rest.strip_suffix('>')) {
			return Ok(Type::array(inner.parse()?));
		}

		match name.to_ascii_lowercase().as_str() {
			"any" => Ok(Type::Any),
			"boolean" | "bool" => Ok(Type::Boolean),
			"integer" | "int" => Ok(Type::Integer),
			"float" => Ok(Type::Float),
			"decimal" => Ok(Type::Decimal),
			"string" | "text" | "utf8" => Ok(Type::String),
			"binary" | "blob" => Ok(Type::Binary),
			"uuid" | "binary_id" => Ok(Type::Uuid),
			"date" => Ok(Type::Date),
			"time" => Ok(Type::Time),
			"datetime" | "utc_datetime" | "naive_datetime" => Ok(Type::DateTime),
			"id" => Ok(Type::Id),
			"map" => Ok(Type::Map),
			_ => Err(UnknownType(name.to_string())),
		}
	}
}
