// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod ast;
pub mod bind;
pub mod binding;
pub mod config;
pub mod error;
pub mod expression;
pub mod join;
pub mod option;
pub mod params;
pub mod query;
pub mod source;
pub mod staged;

pub use bind::{BoundCondition, BoundJoin, BoundQuery, BoundSource};
pub use config::CompilerConfig;
pub use error::{ConfigError, ExpressionError, JoinError};
pub use join::{JoinCompiler, JoinExpr};
pub use params::{Argument, Dynamic, IntoArgument, Params, Queryable};
pub use query::{
	FromSource, Query,
	join::{JoinAlias, JoinQualifier, JoinRecord, JoinSource, OnClause, TableSource},
};
pub use staged::{Placeholder, Staged};
pub use strata_type::{Error, Result};
