// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	ops::{Deref, DerefMut},
};

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;

pub mod internal;
mod r#macro;
pub mod render;

use render::DefaultRenderer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub code: String,
	pub statement: Option<String>,
	pub message: String,
	pub fragment: Fragment,
	pub label: Option<String>,
	pub help: Option<String>,
	pub notes: Vec<String>,
	pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
	/// Attaches the statement text to this diagnostic and every cause below it.
	pub fn with_statement(&mut self, statement: impl Into<String>) {
		let statement = statement.into();
		if let Some(cause) = self.cause.as_mut() {
			cause.with_statement(statement.clone());
		}
		self.statement = Some(statement);
	}

	/// Moves an internal fragment of this diagnostic to a source position.
	pub fn with_location(&mut self, line: u32, column: u32) {
		let fragment = std::mem::take(&mut self.fragment);
		self.fragment = fragment.located(line, column);
		if let Some(cause) = self.cause.as_mut() {
			cause.with_location(line, column);
		}
	}

	pub fn fragment(&self) -> Option<&Fragment> {
		match &self.fragment {
			Fragment::None => None,
			fragment => Some(fragment),
		}
	}
}

pub trait IntoDiagnostic {
	fn into_diagnostic(self) -> Diagnostic;
}

impl IntoDiagnostic for Diagnostic {
	fn into_diagnostic(self) -> Diagnostic {
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error(pub Diagnostic);

impl Deref for Error {
	type Target = Diagnostic;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Error {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let out = DefaultRenderer::render_string(&self.0);
		f.write_str(out.as_str())
	}
}

impl Error {
	pub fn diagnostic(self) -> Diagnostic {
		self.0
	}
}

impl std::error::Error for Error {}

impl From<Diagnostic> for Error {
	fn from(diagnostic: Diagnostic) -> Self {
		Error(diagnostic)
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;

	fn leaf() -> Diagnostic {
		Diagnostic {
			code: "TEST_001".to_string(),
			message: "leaf".to_string(),
			fragment: Fragment::internal("p.id"),
			..Default::default()
		}
	}

	#[test]
	fn test_with_location_reaches_cause() {
		let mut diagnostic = Diagnostic {
			code: "TEST_002".to_string(),
			message: "outer".to_string(),
			fragment: Fragment::internal("join"),
			cause: Some(Box::new(leaf())),
			..Default::default()
		};
		diagnostic.with_location(4, 2);

		assert_eq!(diagnostic.fragment, Fragment::statement("join", 4, 2));
		let cause = diagnostic.cause.as_ref().unwrap();
		assert_eq!(cause.fragment, Fragment::statement("p.id", 4, 2));
	}

	#[test]
	fn test_with_statement() {
		let mut diagnostic = leaf();
		diagnostic.with_statement("join(q, :inner, [p], c in \"comments\")");
		assert_eq!(diagnostic.statement.as_deref(), Some("join(q, :inner, [p], c in \"comments\")"));
	}

	#[test]
	fn test_error_display_renders_code() {
		let err = Error(leaf());
		let rendered = err.to_string();
		assert!(rendered.contains("TEST_001"));
		assert!(rendered.contains("leaf"));
	}
}
