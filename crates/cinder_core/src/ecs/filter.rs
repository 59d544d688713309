//! # Filters
//!
//! Immutable boolean expressions over component membership.
//!
//! A filter is built once and cached. Evaluation is a handful of store
//! lookups per entity:
//! - every `with` type must be present
//! - no `without` type may be present
//! - each `with_any` group must have at least one member present
//!
//! Separate `with_any` calls form separate groups that are ANDed together.

use std::sync::Arc;

use super::component::{Component, ComponentKey, ComponentSet};
use super::entity::Entity;
use super::storage::ComponentStores;

#[derive(Debug, Default, PartialEq, Eq)]
struct FilterTerms {
    with: Vec<ComponentKey>,
    without: Vec<ComponentKey>,
    any_of: Vec<Vec<ComponentKey>>,
}

/// A compiled component filter.
///
/// Cloning is cheap; the terms are shared.
///
/// # Example
///
/// ```rust,ignore
/// let burning_not_wet = Filter::builder()
///     .with::<Burning>()
///     .without::<Wet>()
///     .with_any::<(Wood, Cloth)>()
///     .build();
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    terms: Arc<FilterTerms>,
}

impl Filter {
    /// Starts building a filter.
    #[must_use]
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// Types an entity must have.
    #[must_use]
    pub fn required(&self) -> &[ComponentKey] {
        &self.terms.with
    }

    /// Types an entity must not have.
    #[must_use]
    pub fn excluded(&self) -> &[ComponentKey] {
        &self.terms.without
    }

    /// The at-least-one-of groups.
    #[must_use]
    pub fn any_groups(&self) -> &[Vec<ComponentKey>] {
        &self.terms.any_of
    }

    /// Returns `true` if the filter places no constraint at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.with.is_empty() && self.terms.without.is_empty() && self.terms.any_of.is_empty()
    }

    /// Evaluates the filter against a membership test.
    pub fn matches_with(&self, has: impl Fn(ComponentKey) -> bool) -> bool {
        self.terms.with.iter().all(|&key| has(key))
            && !self.terms.without.iter().any(|&key| has(key))
            && self
                .terms
                .any_of
                .iter()
                .all(|group| group.iter().any(|&key| has(key)))
    }

    pub(crate) fn matches(&self, stores: &ComponentStores, entity: Entity) -> bool {
        self.matches_with(|key| stores.contains(entity, key.type_id()))
    }
}

/// Fluent builder for [`Filter`].
#[derive(Debug, Default)]
pub struct FilterBuilder {
    terms: FilterTerms,
}

impl FilterBuilder {
    /// Requires component `C`.
    #[must_use]
    pub fn with<C: Component>(self) -> Self {
        self.with_key(ComponentKey::of::<C>())
    }

    /// Excludes component `C`.
    #[must_use]
    pub fn without<C: Component>(self) -> Self {
        self.without_key(ComponentKey::of::<C>())
    }

    /// Requires at least one of the tuple's component types.
    #[must_use]
    pub fn with_any<S: ComponentSet>(self) -> Self {
        self.with_any_keys(S::keys())
    }

    /// Requires a component by runtime key.
    #[must_use]
    pub fn with_key(mut self, key: ComponentKey) -> Self {
        if !self.terms.with.contains(&key) {
            self.terms.with.push(key);
        }
        self
    }

    /// Excludes a component by runtime key.
    #[must_use]
    pub fn without_key(mut self, key: ComponentKey) -> Self {
        if !self.terms.without.contains(&key) {
            self.terms.without.push(key);
        }
        self
    }

    /// Adds an at-least-one-of group by runtime keys. Empty groups are ignored.
    #[must_use]
    pub fn with_any_keys(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        let mut group: Vec<ComponentKey> = Vec::new();
        for key in keys {
            if !group.contains(&key) {
                group.push(key);
            }
        }
        if !group.is_empty() {
            self.terms.any_of.push(group);
        }
        self
    }

    /// Freezes the filter.
    #[must_use]
    pub fn build(self) -> Filter {
        Filter {
            terms: Arc::new(self.terms),
        }
    }
}
