// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
	One,
	Many,
}

impl Cardinality {
	pub fn is_many(&self) -> bool {
		matches!(self, Cardinality::Many)
	}
}

/// Association as declared on its owning schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDef {
	pub cardinality: Cardinality,
	/// Name of the related schema.
	pub related: String,
	/// Key on the owner compared against `related_key`.
	pub owner_key: String,
	/// Key on the related schema compared against `owner_key`.
	pub related_key: String,
}

/// Fully resolved association: both ends and the keys joining them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
	pub owner: String,
	pub field: String,
	pub cardinality: Cardinality,
	pub related: String,
	pub related_source: String,
	pub owner_key: String,
	pub related_key: String,
}
