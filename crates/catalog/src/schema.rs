// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_type::Type;

use crate::association::{AssociationDef, Cardinality};

/// A named schema: the table it reads from, its typed fields and the
/// associations it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
	pub name: String,
	pub source: String,
	pub prefix: Option<String>,
	pub fields: IndexMap<String, Type>,
	pub associations: IndexMap<String, AssociationDef>,
}

impl SchemaDef {
	pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			source: source.into(),
			prefix: None,
			fields: IndexMap::new(),
			associations: IndexMap::new(),
		}
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	pub fn with_field(mut self, name: impl Into<String>, r#type: Type) -> Self {
		self.fields.insert(name.into(), r#type);
		self
	}

	/// `related_key` on the related schema points back at this schema's `id`.
	pub fn has_many(
		mut self,
		field: impl Into<String>,
		related: impl Into<String>,
		related_key: impl Into<String>,
	) -> Self {
		self.associations.insert(
			field.into(),
			AssociationDef {
				cardinality: Cardinality::Many,
				related: related.into(),
				owner_key: "id".to_string(),
				related_key: related_key.into(),
			},
		);
		self
	}

	pub fn has_one(
		mut self,
		field: impl Into<String>,
		related: impl Into<String>,
		related_key: impl Into<String>,
	) -> Self {
		self.associations.insert(
			field.into(),
			AssociationDef {
				cardinality: Cardinality::One,
				related: related.into(),
				owner_key: "id".to_string(),
				related_key: related_key.into(),
			},
		);
		self
	}

	/// `owner_key` on this schema points at the related schema's `id`.
	pub fn belongs_to(
		mut self,
		field: impl Into<String>,
		related: impl Into<String>,
		owner_key: impl Into<String>,
	) -> Self {
		self.associations.insert(
			field.into(),
			AssociationDef {
				cardinality: Cardinality::One,
				related: related.into(),
				owner_key: owner_key.into(),
				related_key: "id".to_string(),
			},
		);
		self
	}

	pub fn field_type(&self, field: &str) -> Option<&Type> {
		self.fields.get(field)
	}

	pub fn association(&self, field: &str) -> Option<&AssociationDef> {
		self.associations.get(field)
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;

	#[test]
	fn test_builder() {
		let schema = SchemaDef::new("Post", "posts")
			.with_field("id", Type::Integer)
			.with_field("title", Type::String)
			.has_many("comments", "Comment", "post_id")
			.belongs_to("author", "User", "author_id");

		assert_eq!(schema.source, "posts");
		assert_eq!(schema.field_type("title"), Some(&Type::String));
		assert_eq!(schema.field_type("missing"), None);

		let comments = schema.association("comments").unwrap();
		assert_eq!(comments.cardinality, Cardinality::Many);
		assert_eq!(comments.owner_key, "id");
		assert_eq!(comments.related_key, "post_id");

		let author = schema.association("author").unwrap();
		assert_eq!(author.cardinality, Cardinality::One);
		assert_eq!(author.owner_key, "author_id");
		assert_eq!(author.related_key, "id");
	}

	#[test]
	fn test_fields_keep_declaration_order() {
		let schema = SchemaDef::new("Comment", "comments")
			.with_field("id", Type::Integer)
			.with_field("post_id", Type::Integer)
			.with_field("body", Type::String);

		let names: Vec<&str> = schema.fields.keys().map(String::as_str).collect();
		assert_eq!(names, ["id", "post_id", "body"]);
	}
}
