// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use tracing::{instrument, warn};

use crate::{catalog::SchemaCatalog, schema::SchemaDef};

/// In-memory catalog holding schema definitions by name.
#[derive(Debug, Clone, Default)]
pub struct MaterializedCatalog {
	schemas: HashMap<String, SchemaDef>,
}

impl MaterializedCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	#[instrument(name = "catalog::schema::insert", level = "trace", skip(self, schema), fields(name = %schema.name))]
	pub fn insert(&mut self, schema: SchemaDef) -> Option<SchemaDef> {
		let previous = self.schemas.insert(schema.name.clone(), schema);
		if let Some(previous) = &previous {
			warn!(name = %previous.name, "replaced existing schema definition");
		}
		previous
	}

	pub fn with_schema(mut self, schema: SchemaDef) -> Self {
		self.insert(schema);
		self
	}

	pub fn remove(&mut self, name: &str) -> Option<SchemaDef> {
		self.schemas.remove(name)
	}

	pub fn len(&self) -> usize {
		self.schemas.len()
	}

	pub fn is_empty(&self) -> bool {
		self.schemas.is_empty()
	}
}

impl SchemaCatalog for MaterializedCatalog {
	fn find_schema(&self, name: &str) -> Option<&SchemaDef> {
		self.schemas.get(name)
	}
}

#[cfg(test)]
pub mod tests {
	use strata_type::Type;

	use super::*;
	use crate::Cardinality;

	fn catalog() -> MaterializedCatalog {
		MaterializedCatalog::new()
			.with_schema(
				SchemaDef::new("Post", "posts")
					.with_field("id", Type::Integer)
					.has_many("comments", "Comment", "post_id")
					.has_one("cover", "Image", "post_id")
					.has_many("tags", "Tag", "post_id"),
			)
			.with_schema(
				SchemaDef::new("Comment", "comments")
					.with_field("id", Type::Integer)
					.with_field("post_id", Type::Integer)
					.with_field("public", Type::Boolean)
					.belongs_to("post", "Post", "post_id"),
			)
	}

	#[test]
	fn test_find_schema() {
		let catalog = catalog();
		assert_eq!(catalog.len(), 2);
		assert_eq!(catalog.find_schema("Post").unwrap().source, "posts");
		assert!(catalog.find_schema("User").is_none());
	}

	#[test]
	fn test_resolve_has_many() {
		let descriptor = catalog().resolve_association("Post", "comments").unwrap();
		assert_eq!(descriptor.owner, "Post");
		assert_eq!(descriptor.field, "comments");
		assert_eq!(descriptor.cardinality, Cardinality::Many);
		assert_eq!(descriptor.related, "Comment");
		assert_eq!(descriptor.related_source, "comments");
		assert_eq!(descriptor.owner_key, "id");
		assert_eq!(descriptor.related_key, "post_id");
	}

	#[test]
	fn test_resolve_belongs_to() {
		let descriptor = catalog().resolve_association("Comment", "post").unwrap();
		assert_eq!(descriptor.related_source, "posts");
		assert_eq!(descriptor.owner_key, "post_id");
		assert_eq!(descriptor.related_key, "id");
	}

	#[test]
	fn test_resolve_missing_related_schema() {
		let catalog = catalog();
		assert!(catalog.resolve_association("Post", "cover").is_none());
		assert!(catalog.resolve_association("Post", "missing").is_none());
		assert!(catalog.resolve_association("Nope", "comments").is_none());
	}

	#[test]
	fn test_field_type() {
		let catalog = catalog();
		assert_eq!(catalog.field_type("Comment", "public"), Some(Type::Boolean));
		assert_eq!(catalog.field_type("Comment", "missing"), None);
	}

	#[test]
	fn test_insert_replaces() {
		let mut catalog = catalog();
		let previous = catalog.insert(SchemaDef::new("Post", "articles"));
		assert_eq!(previous.unwrap().source, "posts");
		assert_eq!(catalog.find_schema("Post").unwrap().source, "articles");
	}

	#[test]
	fn test_schema_serializes() {
		let schema = catalog().find_schema("Comment").cloned().unwrap();
		let json = serde_json::to_string(&schema).unwrap();
		let back: SchemaDef = serde_json::from_str(&json).unwrap();
		assert_eq!(back, schema);
	}
}
