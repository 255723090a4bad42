// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use strata_catalog::AssociationDescriptor;
use strata_type::{Fragment, Result, Type, Value, error, return_error, return_internal_error};
use tracing::{debug, instrument, trace};

use crate::{
	ast::Expr,
	binding::{BindingEnv, BindingResolver},
	error::{AssociationFieldErrorKind, BindingErrorKind, JoinError, ValuesListErrorKind},
	expression::{
		BooleanExpr, LoweringContext, Param, QueryExpr, TypeTag,
		lower::{lower_keyword_values, reject_cross_query},
	},
	join::{JoinCompiler, association_condition},
	params::{Argument, Dynamic, Params, Queryable},
	query::{
		FromSource, Query,
		join::{
			AssociationSource, JoinAlias, JoinQualifier, JoinRecord, JoinSource, OnClause, SubquerySource,
			TableSource, ValuesList, ValuesRow, ValuesSource,
		},
	},
	source::{check_values, rows_from_value, types_from_value, values_error},
	staged::{Placeholder, Staged},
};

/// A join condition with every parameter resolved to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCondition {
	pub expr: QueryExpr,
	pub params: Vec<(Value, TypeTag)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundSource {
	Table(TableSource),
	Subquery {
		query: Box<BoundQuery>,
		prefix: Option<String>,
	},
	Association {
		owner: usize,
		descriptor: AssociationDescriptor,
	},
	Values {
		types: Vec<(String, Type)>,
		num_rows: usize,
		params: Vec<(Value, Type)>,
	},
}

impl BoundSource {
	fn schemas(&self, arity: usize) -> Vec<Option<String>> {
		let mut schemas = match self {
			BoundSource::Table(table) => vec![table.schema.clone()],
			BoundSource::Subquery {
				query,
				..
			} => query.slot_schemas(),
			BoundSource::Association {
				descriptor,
				..
			} => vec![Some(descriptor.related.clone())],
			BoundSource::Values {
				..
			} => vec![],
		};
		schemas.resize(arity, None);
		schemas
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundJoin {
	pub qualifier: JoinQualifier,
	pub source: BoundSource,
	pub on: BoundCondition,
	pub alias: Option<String>,
	pub prefix: Option<String>,
	pub hints: Vec<String>,
	pub extensions: IndexMap<String, Value>,
	pub binding_index: usize,
	pub arity: usize,
}

/// A query with no deferred parts left.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
	pub from: FromSource,
	pub joins: Vec<BoundJoin>,
	pub aliases: IndexMap<String, usize>,
}

impl BoundQuery {
	pub fn binding_count(&self) -> usize {
		1 + self.joins.iter().map(|join| join.arity).sum::<usize>()
	}

	pub fn slot_schemas(&self) -> Vec<Option<String>> {
		let mut schemas = vec![self.from.source.schema.clone()];
		for join in &self.joins {
			schemas.extend(join.source.schemas(join.arity));
		}
		schemas
	}
}

impl Query {
	/// Resolves every deferred part of every join against `params`.
	#[instrument(name = "query::bind", level = "trace", skip_all, fields(joins = self.joins().len()))]
	pub fn bind(&self, params: &Params, compiler: &JoinCompiler<'_>) -> Result<BoundQuery> {
		let mut binder = Binder {
			params,
			compiler,
			aliases: self.aliases().clone(),
			schemas: vec![self.base().source.schema.clone()],
		};

		let joins = self.joins().iter().map(|record| binder.bind_join(record)).collect::<Result<Vec<_>>>()?;

		Ok(BoundQuery {
			from: self.base().clone(),
			joins,
			aliases: binder.aliases,
		})
	}
}

struct Binder<'a, 'c> {
	params: &'a Params,
	compiler: &'a JoinCompiler<'c>,
	aliases: IndexMap<String, usize>,
	/// Schema behind every slot bound so far.
	schemas: Vec<Option<String>>,
}

fn missing(placeholder: &Placeholder) -> JoinError {
	JoinError::MissingParameter {
		placeholder: placeholder.to_string(),
		fragment: Fragment::internal(placeholder.to_string()),
	}
}

fn argument<'p>(params: &'p Params, placeholder: &Placeholder) -> Result<&'p Argument> {
	match params.get(placeholder) {
		Some(argument) => Ok(argument),
		None => return_error!(missing(placeholder)),
	}
}

fn invalid_value(option: &str, expected: &str, got: &Argument) -> JoinError {
	JoinError::InvalidOptionValue {
		option: option.to_string(),
		expected: expected.to_string(),
		got: got.to_string(),
		fragment: Fragment::internal(got.to_string()),
	}
}

fn not_a_source(got: &Argument, reason: &str) -> JoinError {
	JoinError::UnsupportedSourceValue {
		got: got.to_string(),
		reason: reason.to_string(),
		fragment: Fragment::internal(got.to_string()),
	}
}

impl<'a, 'c> Binder<'a, 'c> {
	fn argument(&self, placeholder: &Placeholder) -> Result<&'a Argument> {
		argument(self.params, placeholder)
	}

	fn bind_join(&mut self, record: &JoinRecord) -> Result<BoundJoin> {
		let binding_index = record.binding_index();
		if binding_index != self.schemas.len() {
			return_internal_error!("join bound at slot {} but {} slots are bound", binding_index, self.schemas.len());
		}

		let (source, late_descriptor) = self.bind_source(record)?;
		self.schemas.extend(source.schemas(record.arity()));

		let natural = match (&source, late_descriptor) {
			(
				BoundSource::Association {
					owner,
					descriptor,
				},
				true,
			) => Some(association_condition(binding_index, *owner, descriptor)),
			_ => None,
		};
		let on = self.bind_on(record, natural)?;

		let alias = self.bind_alias(record)?;
		let prefix = match record.prefix() {
			Some(prefix) => self.bind_prefix(prefix)?,
			None => None,
		};
		let hints = match record.hints() {
			Some(hints) => self.bind_hints(hints)?,
			None => vec![],
		};
		let extensions = record
			.extensions()
			.iter()
			.map(|(name, value)| self.bind_extension(name, value).map(|value| (name.clone(), value)))
			.collect::<Result<IndexMap<_, _>>>()?;

		debug!(
			qualifier = %record.qualifier(),
			binding_index,
			source = record.source().kind(),
			params = on.params.len(),
			"bound join"
		);

		Ok(BoundJoin {
			qualifier: record.qualifier(),
			source,
			on,
			alias,
			prefix,
			hints,
			extensions,
			binding_index,
			arity: record.arity(),
		})
	}

	/// The bound source, and whether an association descriptor was only
	/// resolved now, in which case its natural condition is still missing
	/// from the record.
	fn bind_source(&self, record: &JoinRecord) -> Result<(BoundSource, bool)> {
		match record.source() {
			JoinSource::Table(table) => Ok((BoundSource::Table(table.clone()), false)),

			JoinSource::Runtime(placeholder) => {
				let argument = self.argument(placeholder)?;
				trace!(placeholder = %placeholder, kind = argument.kind(), "binding runtime source");
				Ok((BoundSource::Table(runtime_source(argument)?), false))
			}

			JoinSource::Subquery(SubquerySource {
				query,
				prefix,
			}) => {
				let inner = match query {
					Staged::Literal(query) => query.as_ref(),
					Staged::Deferred(placeholder) => match self.argument(placeholder)? {
						Argument::Queryable(Queryable::Query(query)) => {
							if query.binding_count() != record.arity() {
								return_error!(JoinError::InvalidBinding {
									kind: BindingErrorKind::ArityMismatch {
										expected: query.binding_count(),
										given: record.arity(),
									},
									fragment: Fragment::internal(placeholder.to_string()),
								});
							}
							query.as_ref()
						}
						other => return_error!(not_a_source(other, "`subquery/1` expects a query")),
					},
				};

				let prefix = match prefix {
					Some(prefix) => self.bind_prefix(prefix)?,
					None => None,
				};

				Ok((
					BoundSource::Subquery {
						query: Box::new(inner.bind(self.params, self.compiler)?),
						prefix,
					},
					false,
				))
			}

			JoinSource::Association(association) => self.bind_association(association),

			JoinSource::Values(values) => {
				let list = match values {
					ValuesSource::List(list) => list.clone(),
					ValuesSource::Pending {
						rows,
						types,
					} => self.pending_values(rows, types)?,
				};
				let params = list
					.params
					.iter()
					.map(|param| {
						let value = self.param_value(self.params, &param.value, &param.tag)?;
						let TypeTag::Type(ty) = &param.tag else {
							return_internal_error!("values list param without a concrete type");
						};
						Ok((value, ty.clone()))
					})
					.collect::<Result<Vec<_>>>()?;

				Ok((
					BoundSource::Values {
						types: list.types,
						num_rows: list.num_rows,
						params,
					},
					false,
				))
			}
		}
	}

	fn bind_association(&self, association: &AssociationSource) -> Result<(BoundSource, bool)> {
		if let Some(descriptor) = &association.descriptor {
			return Ok((
				BoundSource::Association {
					owner: association.owner,
					descriptor: descriptor.clone(),
				},
				false,
			));
		}

		let field = match &association.field {
			Staged::Literal(field) => field.clone(),
			Staged::Deferred(placeholder) => match self.argument(placeholder)? {
				Argument::Value(Value::Atom(field)) | Argument::Value(Value::String(field)) => field.clone(),
				other => return_error!(JoinError::InvalidAssociationField {
					kind: AssociationFieldErrorKind::NotAnAtom {
						got: other.to_string(),
					},
					fragment: Fragment::internal(placeholder.to_string()),
				}),
			},
		};

		let owner = association.owner;
		let schema = self.schemas.get(owner).and_then(|schema| schema.as_deref());
		let descriptor = match schema {
			Some(schema) => self.compiler.catalog().resolve_association(schema, &field).ok_or_else(|| {
				error!(JoinError::AssociationNotFound {
					owner: format!("schema `{}`", schema),
					field: field.clone(),
					fragment: Fragment::internal(field.clone()),
				})
			})?,
			None => return_error!(JoinError::AssociationNotFound {
				owner: format!("binding {}, its schema is unknown", owner),
				field: field.clone(),
				fragment: Fragment::internal(field),
			}),
		};

		Ok((
			BoundSource::Association {
				owner,
				descriptor,
			},
			true,
		))
	}

	fn pending_values(
		&self,
		rows: &Staged<Vec<ValuesRow>>,
		types: &Staged<Vec<(String, Type)>>,
	) -> Result<ValuesList> {
		let rows = match rows {
			Staged::Literal(rows) => rows.clone(),
			Staged::Deferred(placeholder) => {
				let rows = self.plain_value(placeholder, |got| ValuesListErrorKind::NotARow {
					row: 0,
					got,
				})?;
				rows_from_value(rows)?
			},
		};
		let types = match types {
			Staged::Literal(types) => types.clone(),
			Staged::Deferred(placeholder) => {
				let types = self.plain_value(placeholder, |got| ValuesListErrorKind::MalformedTypes {
					got,
				})?;
				types_from_value(types)?
			},
		};
		check_values(&rows, &types).map_err(|kind| error!(values_error(kind, "values(rows, types)")))
	}

	fn plain_value(
		&self,
		placeholder: &Placeholder,
		invalid: impl FnOnce(String) -> ValuesListErrorKind,
	) -> Result<&'a Value> {
		match self.argument(placeholder)? {
			Argument::Value(value) => Ok(value),
			other => return_error!(values_error(invalid(other.to_string()), placeholder.to_string())),
		}
	}

	fn bind_on(&self, record: &JoinRecord, late_natural: Option<BooleanExpr>) -> Result<BoundCondition> {
		let binding_index = record.binding_index();
		let (cond, dynamic) = match record.on() {
			OnClause::Compiled(cond) => (cond.clone(), None),
			OnClause::Deferred {
				placeholder,
				natural,
			} => {
				let (runtime, dynamic) = match self.argument(placeholder)? {
					Argument::Dynamic(dynamic) => (self.compile_dynamic(dynamic, record)?, Some(dynamic)),
					Argument::Value(Value::Map(entries)) => {
						let pairs = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>();
						let env = BindingEnv::default();
						let ctx = LoweringContext::new(&env, &self.schemas, self.compiler.catalog());
						(lower_keyword_values(&pairs, binding_index, ctx), None)
					}
					Argument::Value(Value::List(items)) if items.is_empty() => (BooleanExpr::truth(), None),
					Argument::Value(Value::Boolean(b)) => {
						(BooleanExpr::new(QueryExpr::Literal(Value::Boolean(*b)), vec![]), None)
					}
					other => return_error!(JoinError::InvalidOnExpression {
						reason: format!(
							"expected a dynamic expression, a keyword list or a boolean, got: `{}`",
							other
						),
						fragment: Fragment::internal(placeholder.to_string()),
					}),
				};

				let cond = match natural {
					Some(natural) => natural.clone().and(runtime),
					None => runtime,
				};
				(cond, dynamic)
			}
		};

		let cond = match late_natural {
			Some(natural) => natural.and(cond),
			None => cond,
		};

		let last = binding_index + record.arity() - 1;
		if let Some(max) = cond.max_binding() {
			if max > last {
				return_internal_error!("join condition references binding {} past the last slot {}", max, last);
			}
		}

		// `^i` inside a dynamic condition refers to its own values
		let own;
		let params = match dynamic {
			Some(dynamic) => {
				own = dynamic_params(dynamic);
				&own
			}
			None => self.params,
		};

		let BooleanExpr {
			expr,
			params: cond_params,
		} = cond;
		let params = cond_params.iter().map(|param| self.resolve_param(params, param)).collect::<Result<Vec<_>>>()?;

		Ok(BoundCondition {
			expr: self.resolve_tags(expr),
			params,
		})
	}

	/// A dynamic condition is resolved against its own binding list, which
	/// addresses the slots of the query up to and including this join.
	fn compile_dynamic(&self, dynamic: &Dynamic, record: &JoinRecord) -> Result<BooleanExpr> {
		let slots = record.binding_index() + record.arity();
		let env = BindingResolver::new(slots, &self.aliases).resolve(&Expr::List(dynamic.binding.clone()))?;
		reject_cross_query(&dynamic.expr)?;

		let mut ctx = LoweringContext::new(&env, &self.schemas, self.compiler.catalog());
		let compiled = self.compiler.expressions().compile(&dynamic.expr, &mut ctx)?;
		Ok(ctx.finish(compiled))
	}

	fn resolve_param(&self, params: &Params, param: &Param) -> Result<(Value, TypeTag)> {
		let value = self.param_value(params, &param.value, &param.tag)?;
		Ok((value, self.resolve_tag(&param.tag)))
	}

	fn param_value(&self, params: &Params, value: &Staged<Value>, tag: &TypeTag) -> Result<Value> {
		let value = match value {
			Staged::Literal(value) => value.clone(),
			Staged::Deferred(placeholder) => match argument(params, placeholder)? {
				Argument::Value(value) => value.clone(),
				other => return_error!(JoinError::ParameterTypeMismatch {
					value: other.to_string(),
					expected: tag.to_string(),
					fragment: Fragment::internal(placeholder.to_string()),
				}),
			},
		};
		self.check_type(&value, tag)?;
		Ok(value)
	}

	fn check_type(&self, value: &Value, tag: &TypeTag) -> Result<()> {
		if let TypeTag::Type(ty) = self.resolve_tag(tag) {
			if !ty.accepts(value) {
				return_error!(JoinError::ParameterTypeMismatch {
					value: value.to_string(),
					expected: ty.to_string(),
					fragment: Fragment::internal(value.to_string()),
				});
			}
		}
		Ok(())
	}

	/// Field tags whose schema is known by now become concrete types.
	fn resolve_tag(&self, tag: &TypeTag) -> TypeTag {
		match tag {
			TypeTag::Field {
				binding,
				field,
			} => self
				.schemas
				.get(*binding)
				.and_then(|schema| schema.as_deref())
				.and_then(|schema| self.compiler.catalog().field_type(schema, field))
				.map(TypeTag::Type)
				.unwrap_or_else(|| tag.clone()),
			other => other.clone(),
		}
	}

	fn resolve_tags(&self, expr: QueryExpr) -> QueryExpr {
		match expr {
			QueryExpr::Typed {
				expr,
				tag,
			} => QueryExpr::Typed {
				expr: Box::new(self.resolve_tags(*expr)),
				tag: self.resolve_tag(&tag),
			},
			QueryExpr::Binary {
				op,
				left,
				right,
			} => QueryExpr::Binary {
				op,
				left: Box::new(self.resolve_tags(*left)),
				right: Box::new(self.resolve_tags(*right)),
			},
			QueryExpr::Not(inner) => QueryExpr::Not(Box::new(self.resolve_tags(*inner))),
			QueryExpr::IsNil(inner) => QueryExpr::IsNil(Box::new(self.resolve_tags(*inner))),
			QueryExpr::List(items) => QueryExpr::List(items.into_iter().map(|item| self.resolve_tags(item)).collect()),
			other => other,
		}
	}

	fn bind_alias(&mut self, record: &JoinRecord) -> Result<Option<String>> {
		match record.alias() {
			JoinAlias::None => Ok(None),
			JoinAlias::Explicit(Staged::Literal(name)) | JoinAlias::Inferred(name) => Ok(Some(name.clone())),
			JoinAlias::Explicit(Staged::Deferred(placeholder)) => {
				let name = match self.argument(placeholder)? {
					Argument::Value(Value::Atom(name)) | Argument::Value(Value::String(name)) => name.clone(),
					other => return_error!(invalid_value("as", "an atom or a string", other)),
				};
				if self.aliases.contains_key(&name) {
					return_error!(JoinError::DuplicateAlias {
						alias: name.clone(),
						fragment: Fragment::internal(placeholder.to_string()),
					});
				}
				self.aliases.insert(name.clone(), record.binding_index());
				Ok(Some(name))
			}
		}
	}

	fn bind_prefix(&self, prefix: &Staged<String>) -> Result<Option<String>> {
		match prefix {
			Staged::Literal(prefix) => Ok(Some(prefix.clone())),
			Staged::Deferred(placeholder) => match self.argument(placeholder)? {
				Argument::Value(Value::String(prefix)) => Ok(Some(prefix.clone())),
				Argument::Value(Value::Undefined) => Ok(None),
				other => return_error!(invalid_value("prefix", "a string or nil", other)),
			},
		}
	}

	fn bind_hints(&self, hints: &Staged<Vec<String>>) -> Result<Vec<String>> {
		match hints {
			Staged::Literal(hints) => Ok(hints.clone()),
			Staged::Deferred(placeholder) => {
				let argument = self.argument(placeholder)?;
				match argument {
					Argument::Value(Value::String(hint)) => Ok(vec![hint.clone()]),
					Argument::Value(Value::List(items)) => items
						.iter()
						.map(|item| match item {
							Value::String(hint) => Ok(hint.clone()),
							_ => return_error!(invalid_value("hints", "a string or a list of strings", argument)),
						})
						.collect(),
					other => return_error!(invalid_value("hints", "a string or a list of strings", other)),
				}
			}
		}
	}

	fn bind_extension(&self, name: &str, value: &Staged<Value>) -> Result<Value> {
		match value {
			Staged::Literal(value) => Ok(value.clone()),
			Staged::Deferred(placeholder) => match self.argument(placeholder)? {
				Argument::Value(value) => Ok(value.clone()),
				other => return_error!(invalid_value(name, "a plain value", other)),
			},
		}
	}
}

/// Params of a dynamic condition: `^i` refers to its i-th value.
fn dynamic_params(dynamic: &Dynamic) -> Params {
	Params::Positional(dynamic.params.iter().cloned().map(Argument::Value).collect())
}

fn runtime_source(argument: &Argument) -> Result<TableSource> {
	const EXPECTED: &str = "expected a table name, a schema, a `{table, schema}` tuple or a query without joins";

	match argument {
		Argument::Value(Value::String(table)) | Argument::Queryable(Queryable::Table(table)) => {
			Ok(TableSource::table(table))
		}
		Argument::Value(Value::Atom(schema)) | Argument::Queryable(Queryable::Schema(schema)) => {
			Ok(TableSource::schema(schema))
		}
		Argument::Queryable(Queryable::TableSchema {
			table,
			schema,
		}) => Ok(TableSource::table_schema(table, schema)),
		Argument::Queryable(Queryable::Query(query)) if !query.has_joins() => Ok(query.base().source.clone()),
		Argument::Queryable(Queryable::Query(_)) => {
			return_error!(not_a_source(argument, "queries with joins must be wrapped in `subquery/1`"))
		}
		other => return_error!(not_a_source(other, EXPECTED)),
	}
}
