// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strata_type::{Result, return_error};

use crate::{
	error::ConfigError,
	option::{CORE_OPTIONS, OptionSpec, core_options},
	query::join::JoinQualifier,
};

/// Compiler settings. The core options are always available; `options`
/// adds backend specific ones and `qualifiers` narrows the join kinds the
/// backend supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
	pub options: Vec<OptionSpec>,
	pub qualifiers: Option<Vec<JoinQualifier>>,
}

impl CompilerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json(json: &str) -> Result<Self> {
		let config: CompilerConfig = match serde_json::from_str(json) {
			Ok(config) => config,
			Err(err) => return_error!(ConfigError::InvalidJson {
				reason: err.to_string(),
			}),
		};
		config.validate()?;
		Ok(config)
	}

	pub fn with_option(mut self, option: OptionSpec) -> Self {
		self.options.push(option);
		self
	}

	pub fn with_qualifiers(mut self, qualifiers: impl IntoIterator<Item = JoinQualifier>) -> Self {
		self.qualifiers = Some(qualifiers.into_iter().collect());
		self
	}

	pub fn validate(&self) -> Result<()> {
		let mut seen = HashSet::new();
		for option in &self.options {
			if CORE_OPTIONS.contains(&option.name.as_str()) {
				return_error!(ConfigError::ReservedOption {
					name: option.name.clone(),
				});
			}
			if !seen.insert(option.name.as_str()) {
				return_error!(ConfigError::DuplicateOption {
					name: option.name.clone(),
				});
			}
		}
		Ok(())
	}

	/// Core options followed by the configured extensions.
	pub fn option_table(&self) -> Vec<OptionSpec> {
		let mut table = core_options();
		table.extend(self.options.iter().cloned());
		table
	}
}
