// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod error;
pub mod fragment;
pub mod value;

pub use error::{Diagnostic, Error, IntoDiagnostic, render::DefaultRenderer};
pub use fragment::{Fragment, StatementColumn, StatementLine};
pub use value::{IntoValue, Value, r#type::Type};

pub type Result<T> = std::result::Result<T, Error>;
