use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::behaviour::{Behaviour, ComponentInfo, NetworkIdentity};
use crate::session::ConnectionId;

use super::id::{ComponentRef, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// One behaviour attached to an entity, addressed by its index.
pub struct ComponentSlot {
    index: i32,
    has_authority: bool,
    entity: EntityId,
    behaviour: Box<dyn Behaviour>,
}

impl ComponentSlot {
    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn has_authority(&self) -> bool {
        self.has_authority
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn component_ref(&self) -> ComponentRef {
        ComponentRef::new(self.entity, self.index)
    }

    pub fn info(&self) -> ComponentInfo {
        ComponentInfo {
            entity: self.entity,
            index: self.index,
            has_authority: self.has_authority,
        }
    }

    pub fn behaviour(&self) -> &dyn Behaviour {
        self.behaviour.as_ref()
    }

    pub fn behaviour_mut(&mut self) -> &mut dyn Behaviour {
        self.behaviour.as_mut()
    }

    pub fn downcast_ref<B: Behaviour>(&self) -> Option<&B> {
        self.behaviour().as_any().downcast_ref::<B>()
    }

    pub fn downcast_mut<B: Behaviour>(&mut self) -> Option<&mut B> {
        self.behaviour_mut().as_any_mut().downcast_mut::<B>()
    }
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("index", &self.index)
            .field("has_authority", &self.has_authority)
            .field("behaviour", &self.behaviour.name())
            .finish()
    }
}

#[derive(Debug)]
pub struct ReplicatedEntity {
    id: EntityId,
    prefab: usize,
    owner: Option<ConnectionId>,
    has_authority: bool,
    pub transform: Transform,
    components: Vec<ComponentSlot>,
    started: bool,
}

impl ReplicatedEntity {
    /// Builds an entity from a prefab's behaviours. Components are ordered by
    /// behaviour name, so every peer assigns the same indices regardless of
    /// the order the prefab produced them in.
    pub fn new(
        id: EntityId,
        prefab: usize,
        owner: Option<ConnectionId>,
        has_authority: bool,
        transform: Transform,
        mut behaviours: Vec<Box<dyn Behaviour>>,
    ) -> Self {
        if behaviours.is_empty() {
            behaviours.push(Box::new(NetworkIdentity));
        }
        behaviours.sort_by(|a, b| a.name().cmp(b.name()));

        let components = behaviours
            .into_iter()
            .enumerate()
            .map(|(index, behaviour)| ComponentSlot {
                index: index as i32,
                has_authority,
                entity: id,
                behaviour,
            })
            .collect();

        Self {
            id,
            prefab,
            owner,
            has_authority,
            transform,
            components,
            started: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn prefab(&self) -> usize {
        self.prefab
    }

    /// Owning connection, `None` when the server owns the entity.
    pub fn owner(&self) -> Option<ConnectionId> {
        self.owner
    }

    pub fn has_authority(&self) -> bool {
        self.has_authority
    }

    pub(crate) fn set_authority(&mut self, has_authority: bool) {
        self.has_authority = has_authority;
        for slot in &mut self.components {
            slot.has_authority = has_authority;
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Runs every component's start hook. Only the first call has an effect.
    pub(crate) fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        for slot in &mut self.components {
            let info = slot.info();
            slot.behaviour.on_start(&info);
        }
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentSlot> {
        self.components.iter()
    }

    pub fn component(&self, index: i32) -> Option<&ComponentSlot> {
        usize::try_from(index).ok().and_then(|i| self.components.get(i))
    }

    pub fn component_mut(&mut self, index: i32) -> Option<&mut ComponentSlot> {
        usize::try_from(index).ok().and_then(|i| self.components.get_mut(i))
    }

    /// First component of type `B`, with its index.
    pub fn find<B: Behaviour>(&self) -> Option<(i32, &B)> {
        self.components
            .iter()
            .find_map(|slot| slot.downcast_ref::<B>().map(|b| (slot.index, b)))
    }
}
