// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use strata_type::{Fragment, Result, return_error};
use tracing::{instrument, warn};

use crate::{
	error::JoinError,
	query::{Query, join::JoinAlias},
};

impl Query {
	/// Appends the joins of `other` to this query. Both queries share the
	/// base binding; every other binding of `other` is renumbered to follow
	/// the bindings this query already has. `other` is left untouched.
	///
	/// Dynamic `on` expressions bound later still address bindings by
	/// position in the combined query.
	#[instrument(name = "query::compose::absorb_joins", level = "trace", skip_all, fields(joins = other.joins().len()))]
	pub fn absorb_joins(mut self, other: &Query) -> Result<Query> {
		let offset = self.binding_count() - 1;

		for (alias, &index) in other.aliases() {
			if index != 0 {
				continue;
			}
			match self.alias_index(alias) {
				Some(0) => {}
				Some(_) => return_error!(JoinError::DuplicateAlias {
					alias: alias.clone(),
					fragment: Fragment::internal(format!(":{}", alias)),
				}),
				None => {
					self.aliases.insert(alias.clone(), 0);
				}
			}
		}

		for record in other.joins() {
			let mut shifted = record.shifted(offset);
			let taken = match shifted.alias() {
				JoinAlias::Inferred(name) if self.aliases.contains_key(name) => Some(name.clone()),
				_ => None,
			};
			if let Some(name) = taken {
				warn!(alias = %name, "dropping inferred association alias, name already taken");
				shifted = shifted.without_alias();
			}
			self.push_join(shifted)?;
		}

		Ok(self)
	}
}
