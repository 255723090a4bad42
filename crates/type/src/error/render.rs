// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::Write;

use crate::{error::Diagnostic, fragment::Fragment};

pub trait DiagnosticRenderer {
	fn render(&self, diagnostic: &Diagnostic) -> String;
}

pub struct DefaultRenderer;

pub fn get_line(source: &str, line: u32) -> &str {
	source.lines().nth(line.saturating_sub(1) as usize).unwrap_or("")
}

impl DiagnosticRenderer for DefaultRenderer {
	fn render(&self, diagnostic: &Diagnostic) -> String {
		let mut output = String::new();
		render_flat(&mut output, diagnostic, 0);
		output
	}
}

impl DefaultRenderer {
	pub fn render_string(diagnostic: &Diagnostic) -> String {
		DefaultRenderer.render(diagnostic)
	}
}

fn render_flat(output: &mut String, d: &Diagnostic, depth: usize) {
	let indent = "  ".repeat(depth);
	let _ = writeln!(output, "{indent}error[{}]: {}", d.code, d.message);

	if let Fragment::Statement {
		text,
		line,
		column,
	} = &d.fragment
	{
		let _ = writeln!(output, "{indent}  --> line {}, column {}", line.0, column.0);

		let source = d.statement.as_deref().map(|s| get_line(s, line.0)).unwrap_or(text.as_str());
		let width = line.0.to_string().len().max(2);
		let _ = writeln!(output, "{indent} {:>width$} │ {}", line.0, source);

		let offset = d.statement.as_deref().map(|_| column.0 as usize).unwrap_or(0);
		let marker = "^".repeat(text.chars().count().max(1));
		let _ = writeln!(output, "{indent} {:>width$} │ {}{}", "", " ".repeat(offset), marker);
		if let Some(label) = &d.label {
			let _ = writeln!(output, "{indent} {:>width$} = {}", "", label);
		}
	} else if let Fragment::Internal {
		text,
	} = &d.fragment
	{
		let _ = writeln!(output, "{indent}  in `{}`", text);
	}

	if let Some(help) = &d.help {
		let _ = writeln!(output, "{indent}help: {}", help);
	}

	for note in &d.notes {
		let _ = writeln!(output, "{indent}note: {}", note);
	}

	if let Some(cause) = &d.cause {
		let _ = writeln!(output, "{indent}caused by:");
		render_flat(output, cause, depth + 1);
	}
}
