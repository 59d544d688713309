//! # Component System
//!
//! Components are pure data containers with no behavior.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: value writes operate on a copy that is committed only if accepted
/// - `Send + Sync`: a world may be driven from any single thread
/// - `'static`: stores are keyed by `TypeId`
///
/// # Example
///
/// ```rust
/// use cinder_core::Component;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Clone + Send + Sync + 'static {
    /// Human-readable type name used in errors and logs.
    fn name() -> &'static str {
        type_name::<Self>()
    }
}

/// Runtime key of a component type.
///
/// Equality and hashing use only the `TypeId`; the name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ComponentKey {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    /// Returns the key of component type `C`.
    #[inline]
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: C::name(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[inline]
    #[must_use]
    pub const fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Returns the type name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKey {}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A set of component types named by a tuple, e.g. `(Burning, Frozen)`.
///
/// Used wherever an API takes several types at once, such as
/// [`FilterBuilder::with_any`](crate::ecs::FilterBuilder::with_any).
pub trait ComponentSet {
    /// Keys of every member type, in tuple order.
    fn keys() -> Vec<ComponentKey>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn keys() -> Vec<ComponentKey> {
                vec![$(ComponentKey::of::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
