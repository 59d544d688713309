//! # Typed Queries
//!
//! Lazy iteration over entities that carry a tuple of components.
//!
//! ```text
//!   world.query::<(Position, Velocity)>(Some(&filter))
//!        │
//!        ├─ look up each store once
//!        ├─ drive from the smallest store
//!        └─ per entity: filter check, then fetch every component
//! ```
//!
//! The iterator borrows the world immutably, so no flush can run while it is
//! alive. Each call starts a fresh pass over current storage.

use std::slice;

use super::component::{Component, ComponentKey};
use super::entity::Entity;
use super::filter::Filter;
use super::storage::{ComponentStorage, ComponentStores};
use super::world::World;

/// A tuple of component types that can be fetched together.
///
/// Implemented for tuples of one to six components. Use `(C,)` for a single
/// component, or [`World::iter`].
pub trait QueryData {
    /// Looked-up stores, one per component.
    type Fetch<'w>: Copy;
    /// What each matching entity yields.
    type Item<'w>;

    /// Keys of every component in the tuple.
    fn keys() -> Vec<ComponentKey>;

    /// Looks up the stores. `None` if any component type has no store yet.
    fn init(world: &World) -> Option<Self::Fetch<'_>>;

    /// Owners of the smallest store; iteration is driven from these.
    fn driver<'w>(fetch: &Self::Fetch<'w>) -> &'w [Entity];

    /// Fetches every component of one entity.
    fn fetch<'w>(fetch: &Self::Fetch<'w>, entity: Entity) -> Option<Self::Item<'w>>;
}

macro_rules! impl_query_data {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: Component),+> QueryData for ($($name,)+) {
            type Fetch<'w> = ($(&'w ComponentStorage<$name>,)+);
            type Item<'w> = ($(&'w $name,)+);

            fn keys() -> Vec<ComponentKey> {
                vec![$(ComponentKey::of::<$name>()),+]
            }

            fn init(world: &World) -> Option<Self::Fetch<'_>> {
                Some(($(world.storage::<$name>()?,)+))
            }

            fn driver<'w>(fetch: &Self::Fetch<'w>) -> &'w [Entity] {
                let ($($name,)+) = *fetch;
                [$($name.entities()),+]
                    .into_iter()
                    .min_by_key(|owners| owners.len())
                    .unwrap_or(&[])
            }

            #[inline]
            fn fetch<'w>(fetch: &Self::Fetch<'w>, entity: Entity) -> Option<Self::Item<'w>> {
                let ($($name,)+) = *fetch;
                Some(($($name.get(entity)?,)+))
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);
impl_query_data!(A, B, C, D, E);
impl_query_data!(A, B, C, D, E, F);

/// Iterator returned by [`World::query`].
pub struct QueryIter<'w, Q: QueryData> {
    stores: &'w ComponentStores,
    fetch: Option<Q::Fetch<'w>>,
    driver: slice::Iter<'w, Entity>,
    filter: Option<&'w Filter>,
}

impl<'w, Q: QueryData> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        let fetch = self.fetch.as_ref()?;
        for &entity in self.driver.by_ref() {
            if self.filter.is_some_and(|filter| !filter.matches(self.stores, entity)) {
                continue;
            }
            if let Some(item) = Q::fetch(fetch, entity) {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.driver.len()))
    }
}

impl World {
    /// Iterates entities carrying every component of `Q` and matching `filter`.
    ///
    /// ```rust,ignore
    /// for (entity, (position, velocity)) in world.query::<(Position, Velocity)>(None) {
    ///     // ...
    /// }
    /// ```
    pub fn query<'w, Q: QueryData>(&'w self, filter: Option<&'w Filter>) -> QueryIter<'w, Q> {
        let fetch = Q::init(self);
        let driver = fetch.as_ref().map_or(&[][..], |fetch| Q::driver(fetch));
        QueryIter {
            stores: self.stores(),
            fetch,
            driver: driver.iter(),
            filter,
        }
    }

    /// Iterates one component type, optionally filtered.
    pub fn iter<'w, C: Component>(
        &'w self,
        filter: Option<&'w Filter>,
    ) -> impl Iterator<Item = (Entity, &'w C)> + 'w {
        self.query::<(C,)>(filter).map(|(entity, (value,))| (entity, value))
    }
}
