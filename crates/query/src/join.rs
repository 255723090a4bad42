// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use strata_catalog::{AssociationDescriptor, SchemaCatalog};
use strata_type::{Result, return_internal_error};
use tracing::{debug, instrument, warn};

use crate::{
	ast::Expr,
	binding::{BindingResolver, split_target},
	config::CompilerConfig,
	expression::{BooleanExpr, DefaultExpressionCompiler, ExpressionCompiler, LoweringContext, QueryExpr, lower::lower_on},
	option::{self, OptionSpec, validate_qualifier},
	query::{
		Query,
		join::{JoinAlias, JoinRecord, JoinRecordParts, JoinSource, OnClause},
	},
	source::{self, SourceContext, source_schemas},
	staged::Staged,
};

static DEFAULT_EXPRESSIONS: DefaultExpressionCompiler = DefaultExpressionCompiler;

/// One join invocation: `join(query, qualifier, binding, target, options)`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinExpr {
	pub qualifier: Expr,
	pub binding: Expr,
	/// `var in source`, or a bare source.
	pub target: Expr,
	pub options: Option<Expr>,
	/// Line and column of the invocation in the caller's source.
	pub location: Option<(u32, u32)>,
}

impl JoinExpr {
	pub fn new(qualifier: Expr, binding: Expr, target: Expr) -> Self {
		Self {
			qualifier,
			binding,
			target,
			options: None,
			location: None,
		}
	}

	pub fn with_options(mut self, options: Expr) -> Self {
		self.options = Some(options);
		self
	}

	pub fn at(mut self, line: u32, column: u32) -> Self {
		self.location = Some((line, column));
		self
	}
}

impl Display for JoinExpr {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "join(query, {}, {}, {}", self.qualifier, self.binding, self.target)?;
		match self.options.as_ref().map(|options| (options, options.as_keyword())) {
			Some((_, Some(pairs))) => {
				for (key, value) in pairs {
					write!(f, ", {}: {}", key, value)?;
				}
			}
			Some((options, None)) => write!(f, ", {}", options)?,
			None => {}
		}
		f.write_str(")")
	}
}

/// Compiles join invocations into [`JoinRecord`]s appended to a query.
pub struct JoinCompiler<'a> {
	catalog: &'a dyn SchemaCatalog,
	config: CompilerConfig,
	options: Vec<OptionSpec>,
	expressions: &'a dyn ExpressionCompiler,
}

impl<'a> JoinCompiler<'a> {
	pub fn new(catalog: &'a dyn SchemaCatalog) -> Self {
		let config = CompilerConfig::default();
		Self {
			catalog,
			options: config.option_table(),
			config,
			expressions: &DEFAULT_EXPRESSIONS,
		}
	}

	pub fn with_config(mut self, config: CompilerConfig) -> Self {
		self.options = config.option_table();
		self.config = config;
		self
	}

	pub fn with_expression_compiler(mut self, expressions: &'a dyn ExpressionCompiler) -> Self {
		self.expressions = expressions;
		self
	}

	pub fn catalog(&self) -> &'a dyn SchemaCatalog {
		self.catalog
	}

	pub fn config(&self) -> &CompilerConfig {
		&self.config
	}

	pub fn expressions(&self) -> &'a dyn ExpressionCompiler {
		self.expressions
	}

	pub fn join(
		&self,
		query: Query,
		qualifier: Expr,
		binding: Expr,
		target: Expr,
		options: Option<Expr>,
	) -> Result<Query> {
		self.compile(
			query,
			&JoinExpr {
				qualifier,
				binding,
				target,
				options,
				location: None,
			},
		)
	}

	/// Compiles `join` against `query` and returns the query with the new
	/// record appended. Nothing is appended on failure.
	#[instrument(name = "query::join::compile", level = "trace", skip(self, query), fields(bindings = query.binding_count()))]
	pub fn compile(&self, query: Query, join: &JoinExpr) -> Result<Query> {
		self.compile_join(query, join).map_err(|mut err| {
			if let Some((line, column)) = join.location {
				err.with_location(line, column);
			}
			err.with_statement(join.to_string());
			err
		})
	}

	fn compile_join(&self, mut query: Query, join: &JoinExpr) -> Result<Query> {
		let qualifier = validate_qualifier(&join.qualifier, self.config.qualifiers.as_deref())?;
		let options = option::validate(join.options.as_ref(), &self.options, "join")?;

		let env = BindingResolver::for_query(&query).resolve(&join.binding)?;
		let (binding, source_expr) = split_target(&join.target)?;
		env.check_fresh(&binding)?;

		let mut schemas = query.slot_schemas();
		let normalized = source::normalize(
			source_expr,
			&SourceContext {
				env: &env,
				binding: &binding,
				schemas: &schemas,
				catalog: self.catalog,
			},
		)?;

		let arity = normalized.arity.or(binding.arity()).unwrap_or(1);
		binding.check_arity(arity, &join.target)?;

		let binding_index = query.binding_count();
		let env = env.extend(&binding, arity)?;
		let own_schemas = source_schemas(&normalized.source, arity);
		schemas.extend(own_schemas.iter().cloned());

		let alias = match options.alias() {
			Some(alias) => JoinAlias::Explicit(alias),
			None => infer_alias(&query, &normalized.source),
		};

		let ctx = LoweringContext::new(&env, &schemas, self.catalog);
		let mut on = lower_on(options.get("on"), binding_index, ctx, self.expressions)?;
		if let Some(natural) = natural_condition(&normalized.source, binding_index) {
			on = with_natural(on, natural);
		}

		let last = binding_index + arity - 1;
		if let Some(max) = on.max_binding() {
			if max > last {
				return_internal_error!("join condition references binding {} past the last slot {}", max, last);
			}
		}

		let record = JoinRecord::new(JoinRecordParts {
			qualifier,
			source: normalized.source,
			on,
			alias,
			prefix: options.prefix(),
			hints: options.hints(),
			extensions: options.extensions(),
			binding_index,
			arity,
			schemas: own_schemas,
		});

		debug!(
			qualifier = %record.qualifier(),
			binding_index,
			arity,
			source = record.source().kind(),
			"appending join"
		);
		query.push_join(record)?;
		Ok(query)
	}
}

/// An association join without `as` is named after its field, unless the
/// name is already taken.
fn infer_alias(query: &Query, source: &JoinSource) -> JoinAlias {
	let JoinSource::Association(association) = source else {
		return JoinAlias::None;
	};
	let Staged::Literal(field) = &association.field else {
		return JoinAlias::None;
	};

	if query.alias_index(field).is_some() {
		warn!(alias = %field, "not inferring association alias, name already taken");
		return JoinAlias::None;
	}
	JoinAlias::Inferred(field.clone())
}

fn natural_condition(source: &JoinSource, binding_index: usize) -> Option<BooleanExpr> {
	let JoinSource::Association(association) = source else {
		return None;
	};
	let descriptor = association.descriptor.as_ref()?;
	Some(association_condition(binding_index, association.owner, descriptor))
}

/// `related.related_key == owner.owner_key`
pub(crate) fn association_condition(
	binding_index: usize,
	owner: usize,
	descriptor: &AssociationDescriptor,
) -> BooleanExpr {
	BooleanExpr::new(
		QueryExpr::eq(
			QueryExpr::field(binding_index, descriptor.related_key.clone()),
			QueryExpr::field(owner, descriptor.owner_key.clone()),
		),
		vec![],
	)
}

fn with_natural(on: OnClause, natural: BooleanExpr) -> OnClause {
	match on {
		OnClause::Compiled(cond) => OnClause::Compiled(natural.and(cond)),
		OnClause::Deferred {
			placeholder,
			..
		} => OnClause::Deferred {
			placeholder,
			natural: Some(natural),
		},
	}
}
