// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_catalog::AssociationDescriptor;
use strata_type::{Type, Value};

use crate::{
	expression::{BooleanExpr, Param},
	query::Query,
	staged::{Placeholder, Staged},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinQualifier {
	Inner,
	Left,
	Right,
	Full,
	Cross,
	InnerLateral,
	LeftLateral,
	CrossLateral,
	Array,
	LeftArray,
}

impl JoinQualifier {
	pub const ALL: [JoinQualifier; 10] = [
		JoinQualifier::Inner,
		JoinQualifier::Left,
		JoinQualifier::Right,
		JoinQualifier::Full,
		JoinQualifier::Cross,
		JoinQualifier::InnerLateral,
		JoinQualifier::LeftLateral,
		JoinQualifier::CrossLateral,
		JoinQualifier::Array,
		JoinQualifier::LeftArray,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			JoinQualifier::Inner => "inner",
			JoinQualifier::Left => "left",
			JoinQualifier::Right => "right",
			JoinQualifier::Full => "full",
			JoinQualifier::Cross => "cross",
			JoinQualifier::InnerLateral => "inner_lateral",
			JoinQualifier::LeftLateral => "left_lateral",
			JoinQualifier::CrossLateral => "cross_lateral",
			JoinQualifier::Array => "array",
			JoinQualifier::LeftArray => "left_array",
		}
	}

	pub fn from_atom(atom: &str) -> Option<JoinQualifier> {
		Self::ALL.into_iter().find(|qualifier| qualifier.as_str() == atom)
	}
}

impl Display for JoinQualifier {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSource {
	pub table: Option<String>,
	pub schema: Option<String>,
}

impl TableSource {
	pub fn table(table: impl Into<String>) -> Self {
		Self {
			table: Some(table.into()),
			schema: None,
		}
	}

	pub fn schema(schema: impl Into<String>) -> Self {
		Self {
			table: None,
			schema: Some(schema.into()),
		}
	}

	pub fn table_schema(table: impl Into<String>, schema: impl Into<String>) -> Self {
		Self {
			table: Some(table.into()),
			schema: Some(schema.into()),
		}
	}
}

impl Display for TableSource {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match (&self.table, &self.schema) {
			(Some(table), Some(schema)) => write!(f, "{{{:?}, {}}}", table, schema),
			(Some(table), None) => write!(f, "{:?}", table),
			(None, Some(schema)) => f.write_str(schema),
			(None, None) => f.write_str("nil"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubquerySource {
	pub query: Staged<Box<Query>>,
	pub prefix: Option<Staged<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssociationSource {
	/// Binding index of the owner.
	pub owner: usize,
	pub field: Staged<String>,
	/// Present once the owner's schema is known.
	pub descriptor: Option<AssociationDescriptor>,
}

/// A validated values list. Row values are kept as params in row-major
/// order, fields in `types` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesList {
	pub types: Vec<(String, Type)>,
	pub num_rows: usize,
	pub params: Vec<Param>,
}

pub type ValuesRow = IndexMap<String, Staged<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub enum ValuesSource {
	List(ValuesList),
	/// Rows or types are interpolated; validated when the query is bound.
	Pending {
		rows: Staged<Vec<ValuesRow>>,
		types: Staged<Vec<(String, Type)>>,
	},
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinSource {
	Table(TableSource),
	Runtime(Placeholder),
	Subquery(SubquerySource),
	Association(AssociationSource),
	Values(ValuesSource),
}

impl JoinSource {
	pub fn kind(&self) -> &'static str {
		match self {
			JoinSource::Table(_) => "table",
			JoinSource::Runtime(_) => "runtime",
			JoinSource::Subquery(_) => "subquery",
			JoinSource::Association(_) => "association",
			JoinSource::Values(_) => "values",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinAlias {
	None,
	Explicit(Staged<String>),
	/// Taken from the association field when no `as` was given.
	Inferred(String),
}

impl JoinAlias {
	/// The alias name, when it is known at compile time.
	pub fn name(&self) -> Option<&str> {
		match self {
			JoinAlias::None => None,
			JoinAlias::Explicit(Staged::Literal(name)) | JoinAlias::Inferred(name) => Some(name),
			JoinAlias::Explicit(Staged::Deferred(_)) => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum OnClause {
	Compiled(BooleanExpr),
	/// `on: ^placeholder`; `natural` holds the association condition to
	/// conjoin once the runtime expression is compiled.
	Deferred {
		placeholder: Placeholder,
		natural: Option<BooleanExpr>,
	},
}

impl OnClause {
	pub fn max_binding(&self) -> Option<usize> {
		match self {
			OnClause::Compiled(cond) => cond.max_binding(),
			OnClause::Deferred {
				natural,
				..
			} => natural.as_ref().and_then(BooleanExpr::max_binding),
		}
	}

	pub fn compiled(&self) -> Option<&BooleanExpr> {
		match self {
			OnClause::Compiled(cond) => Some(cond),
			OnClause::Deferred {
				..
			} => None,
		}
	}

	fn shift_bindings(&mut self, offset: usize) {
		match self {
			OnClause::Compiled(cond) => cond.shift_bindings(offset),
			OnClause::Deferred {
				natural,
				..
			} => {
				if let Some(natural) = natural {
					natural.shift_bindings(offset);
				}
			}
		}
	}
}

/// One compiled join. Records are immutable once appended to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRecord {
	qualifier: JoinQualifier,
	source: JoinSource,
	on: OnClause,
	alias: JoinAlias,
	prefix: Option<Staged<String>>,
	hints: Option<Staged<Vec<String>>>,
	extensions: IndexMap<String, Staged<Value>>,
	binding_index: usize,
	arity: usize,
	schemas: Vec<Option<String>>,
}

pub(crate) struct JoinRecordParts {
	pub qualifier: JoinQualifier,
	pub source: JoinSource,
	pub on: OnClause,
	pub alias: JoinAlias,
	pub prefix: Option<Staged<String>>,
	pub hints: Option<Staged<Vec<String>>>,
	pub extensions: IndexMap<String, Staged<Value>>,
	pub binding_index: usize,
	pub arity: usize,
	pub schemas: Vec<Option<String>>,
}

impl JoinRecord {
	pub(crate) fn new(parts: JoinRecordParts) -> Self {
		Self {
			qualifier: parts.qualifier,
			source: parts.source,
			on: parts.on,
			alias: parts.alias,
			prefix: parts.prefix,
			hints: parts.hints,
			extensions: parts.extensions,
			binding_index: parts.binding_index,
			arity: parts.arity,
			schemas: parts.schemas,
		}
	}

	pub fn qualifier(&self) -> JoinQualifier {
		self.qualifier
	}

	pub fn source(&self) -> &JoinSource {
		&self.source
	}

	pub fn on(&self) -> &OnClause {
		&self.on
	}

	pub fn alias(&self) -> &JoinAlias {
		&self.alias
	}

	pub fn prefix(&self) -> Option<&Staged<String>> {
		self.prefix.as_ref()
	}

	pub fn hints(&self) -> Option<&Staged<Vec<String>>> {
		self.hints.as_ref()
	}

	pub fn extensions(&self) -> &IndexMap<String, Staged<Value>> {
		&self.extensions
	}

	pub fn extension(&self, name: &str) -> Option<&Staged<Value>> {
		self.extensions.get(name)
	}

	pub fn binding_index(&self) -> usize {
		self.binding_index
	}

	/// Number of binding slots the join occupies.
	pub fn arity(&self) -> usize {
		self.arity
	}

	/// Schema behind each slot of the join, where known.
	pub fn schemas(&self) -> &[Option<String>] {
		&self.schemas
	}

	/// Copy of the record with every non-base binding reference moved up
	/// by `offset`.
	pub(crate) fn shifted(&self, offset: usize) -> JoinRecord {
		let mut record = self.clone();
		record.binding_index += offset;
		record.on.shift_bindings(offset);
		if let JoinSource::Association(association) = &mut record.source {
			if association.owner > 0 {
				association.owner += offset;
			}
		}
		record
	}

	pub(crate) fn without_alias(mut self) -> JoinRecord {
		self.alias = JoinAlias::None;
		self
	}
}
