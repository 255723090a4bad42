// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use strata_type::{Fragment, Result, return_error, return_internal_error};

use crate::error::JoinError;

mod compose;
pub mod join;

use join::{JoinRecord, TableSource};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromSource {
	pub source: TableSource,
	pub prefix: Option<String>,
}

/// A base source, its joins and the aliases naming their bindings.
///
/// Binding 0 is the base source; each join takes the next `arity` slots
/// in the order it was appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
	from: FromSource,
	joins: Vec<JoinRecord>,
	aliases: IndexMap<String, usize>,
}

impl Query {
	pub fn from_source(source: TableSource) -> Self {
		Self {
			from: FromSource {
				source,
				prefix: None,
			},
			joins: vec![],
			aliases: IndexMap::new(),
		}
	}

	pub fn from_table(table: impl Into<String>) -> Self {
		Self::from_source(TableSource::table(table))
	}

	pub fn from_schema(schema: impl Into<String>) -> Self {
		Self::from_source(TableSource::schema(schema))
	}

	pub fn from_table_schema(table: impl Into<String>, schema: impl Into<String>) -> Self {
		Self::from_source(TableSource::table_schema(table, schema))
	}

	/// Names the base binding.
	pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
		self.aliases.insert(alias.into(), 0);
		self
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.from.prefix = Some(prefix.into());
		self
	}

	pub fn base(&self) -> &FromSource {
		&self.from
	}

	pub fn joins(&self) -> &[JoinRecord] {
		&self.joins
	}

	pub fn aliases(&self) -> &IndexMap<String, usize> {
		&self.aliases
	}

	pub fn alias_index(&self, alias: &str) -> Option<usize> {
		self.aliases.get(alias).copied()
	}

	pub fn has_joins(&self) -> bool {
		!self.joins.is_empty()
	}

	pub fn binding_count(&self) -> usize {
		1 + self.joins.iter().map(JoinRecord::arity).sum::<usize>()
	}

	/// Schema behind every binding slot, `None` where it is not known
	/// until the query is bound.
	pub fn slot_schemas(&self) -> Vec<Option<String>> {
		let mut schemas = Vec::with_capacity(self.binding_count());
		schemas.push(self.from.source.schema.clone());
		for join in &self.joins {
			schemas.extend(join.schemas().iter().cloned());
		}
		schemas
	}

	pub fn slot_schema(&self, binding: usize) -> Option<String> {
		self.slot_schemas().into_iter().nth(binding).flatten()
	}

	pub(crate) fn push_join(&mut self, record: JoinRecord) -> Result<()> {
		let expected = self.binding_count();
		if record.binding_index() != expected {
			return_internal_error!(
				"join appended at binding {} but the query has {} bindings",
				record.binding_index(),
				expected
			);
		}

		if let Some(alias) = record.alias().name() {
			if self.aliases.contains_key(alias) {
				return_error!(JoinError::DuplicateAlias {
					alias: alias.to_string(),
					fragment: Fragment::internal(format!(":{}", alias)),
				});
			}
			self.aliases.insert(alias.to_string(), record.binding_index());
		}

		self.joins.push(record);
		Ok(())
	}
}

impl Display for Query {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#Query<from {}", self.from.source)?;
		for join in &self.joins {
			write!(f, " {}_join({})", join.qualifier(), join.source().kind())?;
		}
		f.write_str(">")
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;

	#[test]
	fn test_base_query() {
		let query = Query::from_schema("Post").with_alias("post");
		assert_eq!(query.binding_count(), 1);
		assert_eq!(query.alias_index("post"), Some(0));
		assert_eq!(query.slot_schema(0).as_deref(), Some("Post"));
		assert_eq!(query.slot_schema(1), None);
		assert!(!query.has_joins());
	}

	#[test]
	fn test_display() {
		assert_eq!(Query::from_table("posts").to_string(), "#Query<from \"posts\">");
	}
}
