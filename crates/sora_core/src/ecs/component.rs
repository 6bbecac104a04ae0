// component.rs - Component trait and kind tags
//
// Components are identified by a static kind tag, not by Rust TypeIds.
// The registry buckets instances by kind and aspects declare which kinds
// they drive, so matching never needs runtime type introspection.

use crate::ecs::TickContext;
use crate::entity::Entity;
use crate::error::EngineError;
use std::any::Any;
use std::fmt;

/// Tag naming a component interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKind(&'static str);

impl ComponentKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Object-safe access to `Any`, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Unit of behaviour or data attached to exactly one entity.
pub trait Component: AsAny + Send {
    /// Interface tag used to bucket this component.
    fn kind(&self) -> ComponentKind;

    /// Runs once the component is linked to its entity, before it is stored.
    ///
    /// The entity's component map already includes this component, so
    /// sibling lookups (`entity.component_of(..)`) see the full set.
    fn on_attach(&mut self, _entity: &Entity) {}

    /// Per-frame hook.
    fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<'a> dyn Component + 'a {
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Components with a statically known kind.
pub trait ComponentType: Component + Sized {
    const KIND: ComponentKind;
}

/// Helper macro to implement [`ComponentType`].
///
/// # Example
/// ```ignore
/// struct Sprite { path: String }
///
/// define_component!(Sprite, "Sprite");
///
/// impl Component for Sprite {
///     fn kind(&self) -> ComponentKind { Self::KIND }
/// }
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::ComponentType for $ty {
            const KIND: $crate::ecs::ComponentKind = $crate::ecs::ComponentKind::new($name);
        }
    };
}
