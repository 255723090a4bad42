// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_type::{Fragment, Result, Value, return_error};

use crate::{
	ast::{Expr, Literal},
	error::{JoinError, QualifierErrorKind},
	query::join::JoinQualifier,
	staged::Staged,
};

/// Kind of compile time literal an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
	Atom,
	String,
	Integer,
	Float,
	Boolean,
	StringList,
}

impl LiteralKind {
	pub fn of(expr: &Expr) -> Option<LiteralKind> {
		match expr {
			Expr::Atom(_) => Some(LiteralKind::Atom),
			Expr::Literal(Literal::String(_)) => Some(LiteralKind::String),
			Expr::Literal(Literal::Integer(_)) => Some(LiteralKind::Integer),
			Expr::Literal(Literal::Float(_)) => Some(LiteralKind::Float),
			Expr::Literal(Literal::Boolean(_)) => Some(LiteralKind::Boolean),
			Expr::List(items) if items.iter().all(|item| matches!(item, Expr::Literal(Literal::String(_)))) => {
				Some(LiteralKind::StringList)
			}
			_ => None,
		}
	}

	fn describe(&self) -> &'static str {
		match self {
			LiteralKind::Atom => "a compile time atom",
			LiteralKind::String => "a compile time string",
			LiteralKind::Integer => "a compile time integer",
			LiteralKind::Float => "a compile time float",
			LiteralKind::Boolean => "a compile time boolean",
			LiteralKind::StringList => "a list of compile time strings",
		}
	}
}

/// One entry of the option allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
	pub name: String,
	#[serde(default)]
	pub accepts: Vec<LiteralKind>,
	#[serde(default)]
	pub interpolated: bool,
	/// The value is a condition handed to the expression lowering adapter.
	#[serde(skip)]
	pub expression: bool,
}

impl OptionSpec {
	pub fn new(name: impl Into<String>, accepts: impl IntoIterator<Item = LiteralKind>, interpolated: bool) -> Self {
		Self {
			name: name.into(),
			accepts: accepts.into_iter().collect(),
			interpolated,
			expression: false,
		}
	}

	fn expression(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			accepts: vec![],
			interpolated: true,
			expression: true,
		}
	}

	/// What the option takes, e.g. "a compile time atom or an interpolated value".
	pub fn expected(&self) -> String {
		let mut parts: Vec<&str> = self.accepts.iter().map(LiteralKind::describe).collect();
		if self.interpolated {
			parts.push("an interpolated value");
		}
		parts.join(" or ")
	}

	fn check(&self, value: &Expr) -> Result<()> {
		if self.expression {
			return Ok(());
		}
		if value.is_interpolated() && self.interpolated {
			return Ok(());
		}
		if let Some(kind) = LiteralKind::of(value) {
			if self.accepts.contains(&kind) {
				return Ok(());
			}
		}
		return_error!(JoinError::InvalidOptionValue {
			option: self.name.clone(),
			expected: self.expected(),
			got: value.to_string(),
			fragment: Fragment::internal(value.to_string()),
		})
	}
}

impl Display for OptionSpec {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "`{}`", self.name)
	}
}

pub const CORE_OPTIONS: [&str; 4] = ["on", "as", "prefix", "hints"];

/// The built in allow-list: `on`, `as`, `prefix` and `hints`.
pub fn core_options() -> Vec<OptionSpec> {
	vec![
		OptionSpec::expression("on"),
		OptionSpec::new("as", [LiteralKind::Atom], true),
		OptionSpec::new("prefix", [LiteralKind::String], true),
		OptionSpec::new("hints", [LiteralKind::String, LiteralKind::StringList], true),
	]
}

pub fn subquery_options() -> Vec<OptionSpec> {
	vec![OptionSpec::new("prefix", [LiteralKind::String], true)]
}

/// Options that passed validation, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedOptions {
	entries: IndexMap<String, Expr>,
}

impl ValidatedOptions {
	pub fn get(&self, name: &str) -> Option<&Expr> {
		self.entries.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
		self.entries.iter().map(|(name, value)| (name.as_str(), value))
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// `as:` as a staged name.
	pub fn alias(&self) -> Option<Staged<String>> {
		self.get("as").and_then(|value| match value {
			Expr::Atom(name) => Some(Staged::Literal(name.clone())),
			Expr::Interpolate(placeholder) => Some(Staged::Deferred(placeholder.clone())),
			_ => None,
		})
	}

	pub fn prefix(&self) -> Option<Staged<String>> {
		self.get("prefix").and_then(staged_string)
	}

	pub fn hints(&self) -> Option<Staged<Vec<String>>> {
		self.get("hints").and_then(|value| match value {
			Expr::Literal(Literal::String(hint)) => Some(Staged::Literal(vec![hint.clone()])),
			Expr::List(items) => Some(Staged::Literal(
				items.iter()
					.filter_map(|item| match item {
						Expr::Literal(Literal::String(hint)) => Some(hint.clone()),
						_ => None,
					})
					.collect(),
			)),
			Expr::Interpolate(placeholder) => Some(Staged::Deferred(placeholder.clone())),
			_ => None,
		})
	}

	/// Every option outside the core allow-list, as staged values.
	pub fn extensions(&self) -> IndexMap<String, Staged<Value>> {
		self.entries
			.iter()
			.filter(|(name, _)| !CORE_OPTIONS.contains(&name.as_str()))
			.filter_map(|(name, value)| staged_value(value).map(|value| (name.clone(), value)))
			.collect()
	}
}

fn staged_string(value: &Expr) -> Option<Staged<String>> {
	match value {
		Expr::Literal(Literal::String(s)) => Some(Staged::Literal(s.clone())),
		Expr::Interpolate(placeholder) => Some(Staged::Deferred(placeholder.clone())),
		_ => None,
	}
}

fn staged_value(value: &Expr) -> Option<Staged<Value>> {
	match value {
		Expr::Literal(literal) => Some(Staged::Literal(literal.to_value())),
		Expr::Atom(name) => Some(Staged::Literal(Value::Atom(name.clone()))),
		Expr::Interpolate(placeholder) => Some(Staged::Deferred(placeholder.clone())),
		Expr::List(items) => items
			.iter()
			.map(|item| match item {
				Expr::Literal(literal) => Some(literal.to_value()),
				_ => None,
			})
			.collect::<Option<Vec<_>>>()
			.map(|values| Staged::Literal(Value::List(values))),
		_ => None,
	}
}

/// Validates `options` against `table`. Unknown keys are found as the set
/// difference between the input and the table, reported in input order;
/// values are then checked by walking the table.
pub fn validate(options: Option<&Expr>, table: &[OptionSpec], context: &'static str) -> Result<ValidatedOptions> {
	let Some(options) = options else {
		return Ok(ValidatedOptions::default());
	};

	let Some(pairs) = options.as_keyword() else {
		return_error!(JoinError::MalformedOptions {
			context,
			reason: format!("expected a keyword list, got: `{}`", options),
			fragment: Fragment::internal(options.to_string()),
		});
	};

	let mut entries: IndexMap<String, Expr> = IndexMap::with_capacity(pairs.len());
	for (key, value) in pairs {
		if entries.contains_key(key) {
			return_error!(JoinError::MalformedOptions {
				context,
				reason: format!("option `{}` given more than once", key),
				fragment: Fragment::internal(key.clone()),
			});
		}
		entries.insert(key.clone(), value.clone());
	}

	if let Some(unknown) = entries.keys().find(|key| !table.iter().any(|spec| &spec.name == *key)) {
		return_error!(JoinError::UnknownOption {
			key: unknown.clone(),
			context,
			fragment: Fragment::internal(unknown.clone()),
		});
	}

	for spec in table {
		if let Some(value) = entries.get(&spec.name) {
			spec.check(value)?;
		}
	}

	Ok(ValidatedOptions {
		entries,
	})
}

fn accepted(qualifiers: &[JoinQualifier]) -> String {
	qualifiers.iter().map(|qualifier| format!(":{}", qualifier)).collect::<Vec<_>>().join(", ")
}

/// The qualifier must be a compile time atom naming a known qualifier, and
/// one of `supported` when a subset is configured.
pub fn validate_qualifier(qualifier: &Expr, supported: Option<&[JoinQualifier]>) -> Result<JoinQualifier> {
	let fragment = Fragment::internal(qualifier.to_string());

	let parsed = match qualifier {
		Expr::Atom(name) => JoinQualifier::from_atom(name),
		Expr::Interpolate(_) | Expr::Var(_) => return_error!(JoinError::InvalidQualifier {
			kind: QualifierErrorKind::NotCompileTime {
				got: qualifier.to_string(),
			},
			fragment,
		}),
		_ => None,
	};

	let Some(parsed) = parsed else {
		return_error!(JoinError::InvalidQualifier {
			kind: QualifierErrorKind::Unknown {
				got: qualifier.to_string(),
				accepted: accepted(&JoinQualifier::ALL),
			},
			fragment,
		});
	};

	if let Some(supported) = supported {
		if !supported.contains(&parsed) {
			return_error!(JoinError::InvalidQualifier {
				kind: QualifierErrorKind::Unsupported {
					qualifier: parsed.to_string(),
					supported: accepted(supported),
				},
				fragment,
			});
		}
	}

	Ok(parsed)
}
