// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Reference to a runtime argument, written `^0` or `^name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
	Positional(usize),
	Named(String),
}

impl Display for Placeholder {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Placeholder::Positional(index) => write!(f, "^{}", index),
			Placeholder::Named(name) => write!(f, "^{}", name),
		}
	}
}

/// A part of a join that is either known while the query is built or
/// supplied later through a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Staged<T> {
	Literal(T),
	Deferred(Placeholder),
}

impl<T> Staged<T> {
	pub fn literal(&self) -> Option<&T> {
		match self {
			Staged::Literal(value) => Some(value),
			Staged::Deferred(_) => None,
		}
	}

	pub fn placeholder(&self) -> Option<&Placeholder> {
		match self {
			Staged::Literal(_) => None,
			Staged::Deferred(placeholder) => Some(placeholder),
		}
	}

	pub fn is_deferred(&self) -> bool {
		matches!(self, Staged::Deferred(_))
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Staged<U> {
		match self {
			Staged::Literal(value) => Staged::Literal(f(value)),
			Staged::Deferred(placeholder) => Staged::Deferred(placeholder),
		}
	}

	pub fn as_ref(&self) -> Staged<&T> {
		match self {
			Staged::Literal(value) => Staged::Literal(value),
			Staged::Deferred(placeholder) => Staged::Deferred(placeholder.clone()),
		}
	}
}

impl<T: Display> Display for Staged<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Staged::Literal(value) => value.fmt(f),
			Staged::Deferred(placeholder) => placeholder.fmt(f),
		}
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;

	#[test]
	fn test_placeholder_display() {
		assert_eq!(Placeholder::Positional(0).to_string(), "^0");
		assert_eq!(Placeholder::Named("source".into()).to_string(), "^source");
	}

	#[test]
	fn test_map_keeps_placeholder() {
		let staged: Staged<&str> = Staged::Deferred(Placeholder::Positional(2));
		assert_eq!(staged.map(str::len), Staged::Deferred(Placeholder::Positional(2)));
		assert_eq!(Staged::Literal("abc").map(str::len), Staged::Literal(3));
	}
}
