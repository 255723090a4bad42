// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{Diagnostic, Error, Fragment, IntoDiagnostic};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingErrorKind {
	#[error("binding list should be a list of variables, got: `{got}`")]
	NotAList {
		got: String,
	},

	#[error("binding list should contain only variables, `...` or `name: var` entries, got: `{got}`")]
	NotAVariable {
		got: String,
	},

	#[error("variable `{name}` is bound twice")]
	BoundTwice {
		name: String,
	},

	#[error("the binding list has {given} positional bindings but the query only has {available}")]
	TooManyPositional {
		given: usize,
		available: usize,
	},

	#[error("unknown named binding `{alias}`")]
	UnknownNamedBinding {
		alias: String,
	},

	#[error("`...` can only be used once in a binding list")]
	MultipleEllipsis,

	#[error("variable `{name}` in join is already bound")]
	AlreadyBound {
		name: String,
	},

	#[error("join binding must be a variable or a list of variables, got: `{got}`")]
	NotAJoinBinding {
		got: String,
	},

	#[error("join binds {given} variables but its source has {expected} bindings")]
	ArityMismatch {
		expected: usize,
		given: usize,
	},
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualifierErrorKind {
	#[error("invalid join qualifier `{got}`, accepted qualifiers are: {accepted}")]
	Unknown {
		got: String,
		accepted: String,
	},

	#[error("invalid join qualifier, `join` qualifier must be a compile time atom, got: `{got}`")]
	NotCompileTime {
		got: String,
	},

	#[error("join qualifier `:{qualifier}` is not supported, supported qualifiers are: {supported}")]
	Unsupported {
		qualifier: String,
		supported: String,
	},
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssociationFieldErrorKind {
	#[error("you passed the variable `{name}` to `assoc/2`. Did you mean to pass the atom `:{name}`?")]
	Variable {
		name: String,
	},

	#[error("`assoc/2` expects a compile time atom or an interpolated value as its field, got: `{got}`")]
	NotAnAtom {
		got: String,
	},

	#[error("`assoc/2` expects a bound variable as its owner, got: `{got}`")]
	OwnerNotBound {
		got: String,
	},

	#[error("`assoc/2` owner `{name}` refers to the binding being joined")]
	SelfReference {
		name: String,
	},
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuesListErrorKind {
	#[error("must pass a non-empty list of rows to `values/2`")]
	Empty,

	#[error("each field in a values list must have a declared type, `{field}` has none")]
	UndeclaredType {
		field: String,
	},

	#[error("each row in a values list must contain every declared field, `{field}` is missing from row {row}: {rendered}")]
	MissingField {
		field: String,
		row: usize,
		rendered: String,
	},

	#[error("field `{field}` appears more than once in row {row} of the values list")]
	DuplicateField {
		field: String,
		row: usize,
	},

	#[error("unknown type `{type_name}` declared for field `{field}` in values list")]
	UnknownType {
		field: String,
		type_name: String,
	},

	#[error("values list rows must be maps or keyword lists, row {row} is: `{got}`")]
	NotARow {
		row: usize,
		got: String,
	},

	#[error("values list types must be a map or keyword list of field names to types, got: `{got}`")]
	MalformedTypes {
		got: String,
	},

	#[error("value `{got}` for field `{field}` in row {row} must be a literal or an interpolated value")]
	UnsupportedValue {
		field: String,
		row: usize,
		got: String,
	},
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JoinError {
	#[error("{kind}")]
	InvalidBinding {
		kind: BindingErrorKind,
		fragment: Fragment,
	},

	#[error("{kind}")]
	InvalidQualifier {
		kind: QualifierErrorKind,
		fragment: Fragment,
	},

	#[error("invalid option `{key}` passed to {context}")]
	UnknownOption {
		key: String,
		context: &'static str,
		fragment: Fragment,
	},

	#[error("`{option}` must be {expected}, got: `{got}`")]
	InvalidOptionValue {
		option: String,
		expected: String,
		got: String,
		fragment: Fragment,
	},

	#[error("invalid opts passed to {context}, {reason}")]
	MalformedOptions {
		context: &'static str,
		reason: String,
		fragment: Fragment,
	},

	#[error("{kind}")]
	InvalidAssociationField {
		kind: AssociationFieldErrorKind,
		fragment: Fragment,
	},

	#[error("invalid expression for join `:on`, {reason}")]
	InvalidOnExpression {
		reason: String,
		fragment: Fragment,
	},

	#[error("{kind}")]
	ValuesList {
		kind: ValuesListErrorKind,
		fragment: Fragment,
	},

	#[error("unsupported join source value `{got}`, {reason}")]
	UnsupportedSourceValue {
		got: String,
		reason: String,
		fragment: Fragment,
	},

	#[error("alias `:{alias}` already exists")]
	DuplicateAlias {
		alias: String,
		fragment: Fragment,
	},

	#[error("could not find association `{field}` on {owner}")]
	AssociationNotFound {
		owner: String,
		field: String,
		fragment: Fragment,
	},

	#[error("missing parameter `{placeholder}`")]
	MissingParameter {
		placeholder: String,
		fragment: Fragment,
	},

	#[error("value `{value}` does not match type `{expected}`")]
	ParameterTypeMismatch {
		value: String,
		expected: String,
		fragment: Fragment,
	},

	#[error("malformed join source `{got}`")]
	InvalidSource {
		got: String,
		fragment: Fragment,
	},
}

impl JoinError {
	pub fn code(&self) -> &'static str {
		match self {
			JoinError::InvalidBinding {
				..
			} => "JOIN_001",
			JoinError::InvalidQualifier {
				..
			} => "JOIN_002",
			JoinError::UnknownOption {
				..
			} => "JOIN_003",
			JoinError::InvalidOptionValue {
				..
			} => "JOIN_004",
			JoinError::MalformedOptions {
				..
			} => "JOIN_005",
			JoinError::InvalidAssociationField {
				..
			} => "JOIN_006",
			JoinError::InvalidOnExpression {
				..
			} => "JOIN_007",
			JoinError::ValuesList {
				..
			} => "JOIN_008",
			JoinError::UnsupportedSourceValue {
				..
			} => "JOIN_009",
			JoinError::DuplicateAlias {
				..
			} => "JOIN_010",
			JoinError::AssociationNotFound {
				..
			} => "JOIN_011",
			JoinError::MissingParameter {
				..
			} => "JOIN_012",
			JoinError::ParameterTypeMismatch {
				..
			} => "JOIN_013",
			JoinError::InvalidSource {
				..
			} => "JOIN_014",
		}
	}
}

impl IntoDiagnostic for JoinError {
	fn into_diagnostic(self) -> Diagnostic {
		let code = self.code().to_string();
		let message = self.to_string();

		let (fragment, label, help, notes) = match self {
			JoinError::InvalidBinding {
				kind,
				fragment,
			} => {
				let help = match kind {
					BindingErrorKind::ArityMismatch {
						expected,
						..
					} => format!("bind exactly {} variables, e.g. `[a, b] in subquery(q)`", expected),
					BindingErrorKind::TooManyPositional {
						..
					} => "use `...` to skip bindings you do not need".to_string(),
					BindingErrorKind::UnknownNamedBinding {
						..
					} => "named bindings refer to aliases given with `as:`".to_string(),
					_ => "bindings are plain variables such as `[p, c]`".to_string(),
				};
				(fragment, Some("invalid binding".to_string()), Some(help), vec![])
			}

			JoinError::InvalidQualifier {
				fragment,
				..
			} => (
				fragment,
				Some("unknown qualifier".to_string()),
				Some("qualifiers are written as atoms, e.g. `:inner` or `:left`".to_string()),
				vec!["the qualifier decides the kind of join and must be known when the query is built"
					.to_string()],
			),

			JoinError::UnknownOption {
				fragment,
				..
			} => (
				fragment,
				Some("unknown option".to_string()),
				Some("accepted options are `on`, `as`, `prefix`, `hints` and any configured extensions"
					.to_string()),
				vec![],
			),

			JoinError::InvalidOptionValue {
				fragment,
				..
			} => (
				fragment,
				Some("invalid option value".to_string()),
				Some("interpolate with `^` to supply the value at runtime".to_string()),
				vec![],
			),

			JoinError::MalformedOptions {
				fragment,
				..
			} => (
				fragment,
				Some("malformed options".to_string()),
				Some("pass options as a keyword list, e.g. `on: p.id == c.post_id, as: :comments`"
					.to_string()),
				vec![],
			),

			JoinError::InvalidAssociationField {
				fragment,
				..
			} => (
				fragment,
				Some("invalid association".to_string()),
				Some("write the association as `assoc(p, :comments)`".to_string()),
				vec![],
			),

			JoinError::InvalidOnExpression {
				fragment,
				..
			} => (
				fragment,
				Some("invalid `on` expression".to_string()),
				Some("move subqueries and `exists/1` into a `where` clause".to_string()),
				vec![],
			),

			JoinError::ValuesList {
				fragment,
				..
			} => (
				fragment,
				Some("invalid values list".to_string()),
				Some("rows and types must name exactly the same fields".to_string()),
				vec![],
			),

			JoinError::UnsupportedSourceValue {
				fragment,
				..
			} => (
				fragment,
				Some("not a data source".to_string()),
				Some("interpolate a table name, a schema, a `{table, schema}` tuple or a query without joins"
					.to_string()),
				vec!["runtime sources are checked when the query is bound to its parameters".to_string()],
			),

			JoinError::DuplicateAlias {
				fragment,
				..
			} => (
				fragment,
				Some("alias already in use".to_string()),
				Some("choose a different name with `as:`".to_string()),
				vec![],
			),

			JoinError::AssociationNotFound {
				fragment,
				..
			} => (fragment, Some("unknown association".to_string()), None, vec![]),

			JoinError::MissingParameter {
				fragment,
				..
			} => (
				fragment,
				Some("missing parameter".to_string()),
				Some("supply every interpolated value when binding the query".to_string()),
				vec![],
			),

			JoinError::ParameterTypeMismatch {
				fragment,
				..
			} => (fragment, Some("type mismatch".to_string()), None, vec![]),

			JoinError::InvalidSource {
				fragment,
				..
			} => (
				fragment,
				Some("malformed source".to_string()),
				Some("a join source is a table name, a schema, a `{table, schema}` tuple, an interpolated \
				      value, `subquery/1,2`, `assoc/2` or `values/2`"
					.to_string()),
				vec![],
			),
		};

		Diagnostic {
			code,
			statement: None,
			message,
			fragment,
			label,
			help,
			notes,
			cause: None,
		}
	}
}

impl From<JoinError> for Error {
	fn from(err: JoinError) -> Self {
		Error(err.into_diagnostic())
	}
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
	#[error("unbound variable `{name}` in expression")]
	UnboundVariable {
		name: String,
		fragment: Fragment,
	},

	#[error("unsupported expression `{got}`, {reason}")]
	Unsupported {
		got: String,
		reason: String,
		fragment: Fragment,
	},

	#[error("unknown type `{type_name}` given to `type/2`")]
	UnknownType {
		type_name: String,
		fragment: Fragment,
	},
}

impl IntoDiagnostic for ExpressionError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			ExpressionError::UnboundVariable {
				name,
				fragment,
			} => Diagnostic {
				code: "EXPR_001".to_string(),
				statement: None,
				message,
				fragment,
				label: Some("unbound variable".to_string()),
				help: Some(format!("add `{}` to the binding list of the query", name)),
				notes: vec![],
				cause: None,
			},
			ExpressionError::Unsupported {
				fragment,
				..
			} => Diagnostic {
				code: "EXPR_002".to_string(),
				statement: None,
				message,
				fragment,
				label: Some("unsupported expression".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			ExpressionError::UnknownType {
				fragment,
				..
			} => Diagnostic {
				code: "EXPR_003".to_string(),
				statement: None,
				message,
				fragment,
				label: Some("unknown type".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<ExpressionError> for Error {
	fn from(err: ExpressionError) -> Self {
		Error(err.into_diagnostic())
	}
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid compiler configuration: {reason}")]
	InvalidJson {
		reason: String,
	},

	#[error("option `{name}` is built in and cannot be redefined")]
	ReservedOption {
		name: String,
	},

	#[error("option `{name}` is defined more than once")]
	DuplicateOption {
		name: String,
	},
}

impl IntoDiagnostic for ConfigError {
	fn into_diagnostic(self) -> Diagnostic {
		Diagnostic {
			code: "CONFIG_001".to_string(),
			statement: None,
			message: self.to_string(),
			fragment: Fragment::None,
			label: None,
			help: Some("extension options are declared as `{\"name\": ..., \"accepts\": [...], \"interpolated\": bool}`"
				.to_string()),
			notes: vec![],
			cause: None,
		}
	}
}

impl From<ConfigError> for Error {
	fn from(err: ConfigError) -> Self {
		Error(err.into_diagnostic())
	}
}
