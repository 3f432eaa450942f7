//! Replicated behaviours and their per-type registration tables.
//!
//! A behaviour is a component attached to a replicated entity. Its remotely
//! callable methods and synced fields are registered once per type into a
//! [`BehaviourTable`]; remote calls are resolved by name against that table.

mod context;
mod table;

use std::any::Any;

pub use context::CallContext;
pub(crate) use context::Action;
pub use table::{Args, BehaviourRegistry, BehaviourTable, MethodKind, Params, Registrar};

use crate::entity::{ComponentRef, EntityId};

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

/// What a component learns about itself when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    pub entity: EntityId,
    pub index: i32,
    pub has_authority: bool,
}

impl ComponentInfo {
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.entity, self.index)
    }
}

pub trait Behaviour: AsAny + Send {
    /// Stable name used to order components at spawn time.
    fn name(&self) -> &str;

    /// Runs once, after the owning entity is fully registered.
    fn on_start(&mut self, _info: &ComponentInfo) {}

    fn on_sync_var_changed(&mut self, _field: &str) {}

    fn register(_registrar: &mut Registrar<'_, Self>)
    where
        Self: Sized,
    {
    }
}

/// Component given to entities whose prefab yields no behaviours, so every
/// entity has a component 0.
#[derive(Debug, Default)]
pub struct NetworkIdentity;

impl Behaviour for NetworkIdentity {
    fn name(&self) -> &str {
        "NetworkIdentity"
    }
}
