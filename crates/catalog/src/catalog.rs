// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::Type;

use crate::{association::AssociationDescriptor, schema::SchemaDef};

/// Read-only view over schema metadata.
///
/// Only `find_schema` is required; association and field lookups are
/// derived from it. Implementations must be safe to share between threads
/// compiling queries in parallel.
pub trait SchemaCatalog: Send + Sync {
	fn find_schema(&self, name: &str) -> Option<&SchemaDef>;

	fn resolve_association(&self, owner: &str, field: &str) -> Option<AssociationDescriptor> {
		let schema = self.find_schema(owner)?;
		let association = schema.association(field)?;
		let related = self.find_schema(&association.related)?;

		Some(AssociationDescriptor {
			owner: schema.name.clone(),
			field: field.to_string(),
			cardinality: association.cardinality,
			related: related.name.clone(),
			related_source: related.source.clone(),
			owner_key: association.owner_key.clone(),
			related_key: association.related_key.clone(),
		})
	}

	fn field_type(&self, schema: &str, field: &str) -> Option<Type> {
		self.find_schema(schema)?.field_type(field).cloned()
	}
}
