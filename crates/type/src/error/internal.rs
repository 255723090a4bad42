// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use crate::{error::Diagnostic, fragment::Fragment};

/// Creates an internal error diagnostic carrying the source location of the
/// broken invariant.
pub fn internal_with_context(
	reason: impl Into<String>,
	file: &str,
	line: u32,
	column: u32,
	function: &str,
	module_path: &str,
) -> Diagnostic {
	let reason = reason.into();
	let file_name = file.rsplit('/').next().unwrap_or(file).replace(".rs", "");

	let error_id = format!("ERR-{}:{}", file_name, line);

	Diagnostic {
		code: "INTERNAL_ERROR".to_string(),
		statement: None,
		message: format!("Internal error [{}]: {}", error_id, reason),
		fragment: Fragment::None,
		label: Some(format!("Internal invariant violated at {}:{}:{}", file, line, column)),
		help: Some(format!(
			"This is an internal error that should never occur in normal operation.\n\n\
			 Please file a bug report and include the following information:\n\
			 Error ID: {}\n\
			 Location: {}:{}:{}\n\
			 Module: {}\n\
			 Version: {}",
			error_id,
			file,
			line,
			column,
			module_path,
			env!("CARGO_PKG_VERSION"),
		)),
		notes: vec![
			format!("Error occurred in function: {}", function),
			"This error indicates an internal inconsistency in the query compiler.".to_string(),
		],
		cause: None,
	}
}

pub fn internal(reason: impl Into<String>) -> Diagnostic {
	internal_with_context(reason, "unknown", 0, 0, "unknown", "unknown")
}

/// Builds an internal error diagnostic, capturing the call site.
#[macro_export]
macro_rules! internal_error {
    ($reason:expr) => {
        $crate::error::internal::internal_with_context(
            $reason,
            file!(),
            line!(),
            column!(),
            {
                fn f() {}
                fn type_name_of<T>(_: T) -> &'static str {
                    std::any::type_name::<T>()
                }
                let name = type_name_of(f);
                &name[..name.len() - 3]
            },
            module_path!()
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::internal::internal_with_context(
            format!($fmt, $($arg)*),
            file!(),
            line!(),
            column!(),
            {
                fn f() {}
                fn type_name_of<T>(_: T) -> &'static str {
                    std::any::type_name::<T>()
                }
                let name = type_name_of(f);
                &name[..name.len() - 3]
            },
            module_path!()
        )
    };
}

#[macro_export]
macro_rules! internal_err {
    ($reason:expr) => {
        Err($crate::Error($crate::internal_error!($reason)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::Error($crate::internal_error!($fmt, $($arg)*)))
    };
}

#[macro_export]
macro_rules! return_internal_error {
    ($reason:expr) => {
        return Err($crate::Error($crate::internal_error!($reason)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error($crate::internal_error!($fmt, $($arg)*)))
    };
}
