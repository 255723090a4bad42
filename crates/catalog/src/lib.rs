// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

mod association;
mod catalog;
mod materialized;
mod schema;

pub use association::{AssociationDef, AssociationDescriptor, Cardinality};
pub use catalog::SchemaCatalog;
pub use materialized::MaterializedCatalog;
pub use schema::SchemaDef;
