// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use indexmap::IndexMap;
use strata_type::{Fragment, Result, return_error};
use tracing::trace;

use crate::{
	ast::{BinaryOperator, Expr},
	error::{BindingErrorKind, JoinError},
	query::Query,
};

const WILDCARD: &str = "_";

fn invalid(kind: BindingErrorKind, fragment: impl Into<Fragment>) -> JoinError {
	JoinError::InvalidBinding {
		kind,
		fragment: fragment.into(),
	}
}

/// Variables visible to a join, mapped to the slot each one names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingEnv {
	names: IndexMap<String, usize>,
	slots: usize,
}

impl BindingEnv {
	pub fn from_names<'a>(names: impl IntoIterator<Item = (&'a str, usize)>, slots: usize) -> Self {
		Self {
			names: names.into_iter().map(|(name, slot)| (name.to_string(), slot)).collect(),
			slots,
		}
	}

	pub fn lookup(&self, name: &str) -> Option<usize> {
		self.names.get(name).copied()
	}

	pub fn slots(&self) -> usize {
		self.slots
	}

	pub fn names(&self) -> impl Iterator<Item = (&str, usize)> {
		self.names.iter().map(|(name, slot)| (name.as_str(), *slot))
	}

	/// Fails when a variable of the join binding is already in scope.
	pub fn check_fresh(&self, binding: &JoinBinding) -> Result<()> {
		for name in binding.names() {
			if self.names.contains_key(name) {
				return_error!(invalid(
					BindingErrorKind::AlreadyBound {
						name: name.to_string(),
					},
					name
				));
			}
		}
		Ok(())
	}

	/// Adds `arity` slots for the join, naming them after its binding.
	pub fn extend(&self, binding: &JoinBinding, arity: usize) -> Result<BindingEnv> {
		self.check_fresh(binding)?;
		let mut env = self.clone();
		let first = self.slots;

		match binding {
			JoinBinding::None => {}
			JoinBinding::Single(name) => {
				if let Some(name) = name {
					env.names.insert(name.clone(), first);
				}
			}
			JoinBinding::Compound(names) => {
				for (offset, name) in names.iter().enumerate() {
					if let Some(name) = name {
						env.names.insert(name.clone(), first + offset);
					}
				}
			}
		}

		env.slots = first + arity;
		Ok(env)
	}
}

/// Variables introduced by the join itself, left of `in`.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinBinding {
	None,
	/// `c in source`; `None` for `_ in source`
	Single(Option<String>),
	/// `[a, b] in subquery(q)`
	Compound(Vec<Option<String>>),
}

impl JoinBinding {
	pub fn arity(&self) -> Option<usize> {
		match self {
			JoinBinding::None => None,
			JoinBinding::Single(_) => Some(1),
			JoinBinding::Compound(names) => Some(names.len()),
		}
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		let names: Vec<&str> = match self {
			JoinBinding::None => vec![],
			JoinBinding::Single(name) => name.iter().map(String::as_str).collect(),
			JoinBinding::Compound(names) => names.iter().flatten().map(String::as_str).collect(),
		};
		names.into_iter()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names().any(|n| n == name)
	}

	/// The join binding must name one variable per slot of its source.
	pub fn check_arity(&self, source_arity: usize, fragment: &Expr) -> Result<()> {
		match self.arity() {
			Some(given) if given != source_arity => return_error!(invalid(
				BindingErrorKind::ArityMismatch {
					expected: source_arity,
					given,
				},
				fragment.to_string()
			)),
			_ => Ok(()),
		}
	}
}

fn join_var(expr: &Expr) -> Result<Option<String>> {
	match expr {
		Expr::Var(name) if name == WILDCARD => Ok(None),
		Expr::Var(name) => Ok(Some(name.clone())),
		other => return_error!(invalid(
			BindingErrorKind::NotAJoinBinding {
				got: other.to_string(),
			},
			other.to_string()
		)),
	}
}

/// Splits a join target `binding in source` into its binding and source.
/// A target without `in` binds nothing.
pub fn split_target(target: &Expr) -> Result<(JoinBinding, &Expr)> {
	match target {
		Expr::Binary {
			op: BinaryOperator::In,
			left,
			right,
		} => {
			let binding = match left.as_ref() {
				Expr::List(items) if items.is_empty() => return_error!(invalid(
					BindingErrorKind::NotAJoinBinding {
						got: left.to_string(),
					},
					left.to_string()
				)),
				Expr::List(items) => {
					let mut names = Vec::with_capacity(items.len());
					for item in items {
						let name = join_var(item)?;
						if let Some(name) = &name {
							if names.iter().flatten().any(|n: &String| n == name) {
								return_error!(invalid(
									BindingErrorKind::BoundTwice {
										name: name.clone(),
									},
									name.clone()
								));
							}
						}
						names.push(name);
					}
					JoinBinding::Compound(names)
				}
				other => JoinBinding::Single(join_var(other)?),
			};
			Ok((binding, right.as_ref()))
		}
		other => Ok((JoinBinding::None, other)),
	}
}

/// Resolves the binding list of a join invocation against the bindings a
/// query already has.
pub struct BindingResolver<'a> {
	slots: usize,
	aliases: &'a IndexMap<String, usize>,
}

impl<'a> BindingResolver<'a> {
	pub fn new(slots: usize, aliases: &'a IndexMap<String, usize>) -> Self {
		Self {
			slots,
			aliases,
		}
	}

	pub fn for_query(query: &'a Query) -> Self {
		Self::new(query.binding_count(), query.aliases())
	}

	pub fn resolve(&self, bindings: &Expr) -> Result<BindingEnv> {
		let Expr::List(items) = bindings else {
			return_error!(invalid(
				BindingErrorKind::NotAList {
					got: bindings.to_string(),
				},
				bindings.to_string()
			));
		};

		let mut leading: Vec<Option<&str>> = vec![];
		let mut trailing: Vec<Option<&str>> = vec![];
		let mut named: Vec<(&str, &str)> = vec![];
		let mut seen_ellipsis = false;

		for item in items {
			match item {
				Expr::Var(name) => {
					let name = (name != WILDCARD).then_some(name.as_str());
					if seen_ellipsis {
						trailing.push(name);
					} else {
						leading.push(name);
					}
				}
				Expr::Ellipsis => {
					if seen_ellipsis {
						return_error!(invalid(BindingErrorKind::MultipleEllipsis, "..."));
					}
					seen_ellipsis = true;
				}
				Expr::Keyword(pairs) => {
					for (alias, value) in pairs {
						let Expr::Var(name) = value else {
							return_error!(invalid(
								BindingErrorKind::NotAVariable {
									got: value.to_string(),
								},
								value.to_string()
							));
						};
						named.push((alias.as_str(), name.as_str()));
					}
				}
				other => return_error!(invalid(
					BindingErrorKind::NotAVariable {
						got: other.to_string(),
					},
					other.to_string()
				)),
			}
		}

		let positional = leading.len() + trailing.len();
		if positional > self.slots {
			return_error!(invalid(
				BindingErrorKind::TooManyPositional {
					given: positional,
					available: self.slots,
				},
				bindings.to_string()
			));
		}

		let mut env = BindingEnv {
			names: IndexMap::new(),
			slots: self.slots,
		};

		let trailing_start = self.slots - trailing.len();
		let positions = leading
			.into_iter()
			.enumerate()
			.chain(trailing.into_iter().enumerate().map(|(i, name)| (trailing_start + i, name)));

		for (slot, name) in positions {
			if let Some(name) = name {
				bind_name(&mut env, name, slot)?;
			}
		}

		for (alias, name) in named {
			let Some(slot) = self.aliases.get(alias).copied().filter(|slot| *slot < self.slots) else {
				return_error!(invalid(
					BindingErrorKind::UnknownNamedBinding {
						alias: alias.to_string(),
					},
					alias
				));
			};
			bind_name(&mut env, name, slot)?;
		}

		trace!(names = ?env.names, slots = env.slots, "resolved binding list");
		Ok(env)
	}
}

fn bind_name(env: &mut BindingEnv, name: &str, slot: usize) -> Result<()> {
	if env.names.contains_key(name) {
		return_error!(invalid(
			BindingErrorKind::BoundTwice {
				name: name.to_string(),
			},
			name
		));
	}
	env.names.insert(name.to_string(), slot);
	Ok(())
}

#[cfg(test)]
pub mod tests {
	use super::*;
	use crate::ast::build::*;

	fn aliases(pairs: &[(&str, usize)]) -> IndexMap<String, usize> {
		pairs.iter().map(|(name, slot)| (name.to_string(), *slot)).collect()
	}

	#[test]
	fn test_positional() {
		let aliases = aliases(&[]);
		let env = BindingResolver::new(2, &aliases).resolve(&list([var("p"), var("c")])).unwrap();
		assert_eq!(env.lookup("p"), Some(0));
		assert_eq!(env.lookup("c"), Some(1));
		assert_eq!(env.slots(), 2);
	}

	#[test]
	fn test_ellipsis_binds_trailing() {
		let aliases = aliases(&[]);
		let env = BindingResolver::new(4, &aliases).resolve(&list([var("p"), ellipsis(), var("last")])).unwrap();
		assert_eq!(env.lookup("p"), Some(0));
		assert_eq!(env.lookup("last"), Some(3));
	}

	#[test]
	fn test_wildcard_skips_slot() {
		let aliases = aliases(&[]);
		let env = BindingResolver::new(2, &aliases).resolve(&list([var("_"), var("c")])).unwrap();
		assert_eq!(env.lookup("_"), None);
		assert_eq!(env.lookup("c"), Some(1));
	}

	#[test]
	fn test_named_binding() {
		let aliases = aliases(&[("author", 2)]);
		let env = BindingResolver::new(3, &aliases).resolve(&list([var("p"), named("author", var("a"))])).unwrap();
		assert_eq!(env.lookup("a"), Some(2));
	}

	#[test]
	fn test_unknown_named_binding() {
		let aliases = aliases(&[]);
		let err = BindingResolver::new(1, &aliases).resolve(&list([named("author", var("a"))])).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert_eq!(err.message, "unknown named binding `author`");
	}

	#[test]
	fn test_named_binding_past_visible_slots() {
		let aliases = aliases(&[("like", 2)]);
		let err = BindingResolver::new(2, &aliases).resolve(&list([var("p"), named("like", var("l"))])).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert_eq!(err.message, "unknown named binding `like`");
	}

	#[test]
	fn test_bound_twice() {
		let aliases = aliases(&[]);
		let err = BindingResolver::new(2, &aliases).resolve(&list([var("p"), var("p")])).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert_eq!(err.message, "variable `p` is bound twice");
	}

	#[test]
	fn test_too_many_positional() {
		let aliases = aliases(&[]);
		let err = BindingResolver::new(1, &aliases).resolve(&list([var("p"), var("c")])).unwrap_err();
		assert_eq!(err.message, "the binding list has 2 positional bindings but the query only has 1");
	}

	#[test]
	fn test_multiple_ellipsis() {
		let aliases = aliases(&[]);
		let err = BindingResolver::new(3, &aliases).resolve(&list([ellipsis(), var("p"), ellipsis()])).unwrap_err();
		assert_eq!(err.message, "`...` can only be used once in a binding list");
	}

	#[test]
	fn test_not_a_variable() {
		let aliases = aliases(&[]);
		let err = BindingResolver::new(1, &aliases).resolve(&list([int(1)])).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert!(err.message.ends_with("got: `1`"));

		let err = BindingResolver::new(1, &aliases).resolve(&var("p")).unwrap_err();
		assert_eq!(err.message, "binding list should be a list of variables, got: `p`");
	}

	#[test]
	fn test_split_target() {
		let target = in_(var("c"), string("comments"));
		let (binding, source) = split_target(&target).unwrap();
		assert_eq!(binding, JoinBinding::Single(Some("c".into())));
		assert_eq!(source, &string("comments"));

		let target = in_(list([var("a"), var("_")]), subquery(pin(0)));
		let (binding, _) = split_target(&target).unwrap();
		assert_eq!(binding, JoinBinding::Compound(vec![Some("a".into()), None]));

		let target = assoc(var("p"), atom("comments"));
		assert_eq!(split_target(&target).unwrap().0, JoinBinding::None);
	}

	#[test]
	fn test_split_target_rejects_non_variables() {
		let err = split_target(&in_(field("c", "id"), string("comments"))).unwrap_err();
		assert_eq!(err.message, "join binding must be a variable or a list of variables, got: `c.id`");

		let err = split_target(&in_(list([var("a"), var("a")]), subquery(pin(0)))).unwrap_err();
		assert_eq!(err.message, "variable `a` is bound twice");

		let err = split_target(&in_(list([]), subquery(pin(0)))).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert_eq!(err.message, "join binding must be a variable or a list of variables, got: `[]`");
	}

	#[test]
	fn test_extend_compound() {
		let env = BindingEnv::from_names([("p", 0)], 1);
		let binding = JoinBinding::Compound(vec![Some("a".into()), Some("b".into())]);
		let extended = env.extend(&binding, 2).unwrap();
		assert_eq!(extended.lookup("a"), Some(1));
		assert_eq!(extended.lookup("b"), Some(2));
		assert_eq!(extended.slots(), 3);
		assert_eq!(env.slots(), 1);
	}

	#[test]
	fn test_extend_already_bound() {
		let env = BindingEnv::from_names([("p", 0)], 1);
		let err = env.extend(&JoinBinding::Single(Some("p".into())), 1).unwrap_err();
		assert_eq!(err.message, "variable `p` in join is already bound");
	}

	#[test]
	fn test_check_arity() {
		let binding = JoinBinding::Single(Some("c".into()));
		let err = binding.check_arity(2, &var("c")).unwrap_err();
		assert_eq!(err.code, "JOIN_001");
		assert_eq!(err.message, "join binds 1 variables but its source has 2 bindings");
		assert!(JoinBinding::None.check_arity(3, &var("c")).is_ok());
	}
}
