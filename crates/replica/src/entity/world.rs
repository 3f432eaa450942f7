use std::collections::HashMap;

use crate::error::{ReplicationError, Result};
use crate::session::ConnectionId;

use super::id::{ComponentRef, EntityId};
use super::replicated::{ComponentSlot, ReplicatedEntity};

/// Registry of every replicated entity this process knows about. In host mode
/// the server and client halves share one world.
#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<EntityId, ReplicatedEntity>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity. A duplicate id is rejected and the existing
    /// registration stays untouched.
    pub fn insert(&mut self, entity: ReplicatedEntity) -> Result<()> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(ReplicationError::DuplicateEntity(id));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    pub fn remove(&mut self, id: EntityId) -> Option<ReplicatedEntity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&ReplicatedEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut ReplicatedEntity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &ReplicatedEntity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Ids of entities owned by `connection`, sorted for a stable order.
    pub fn owned_by(&self, connection: ConnectionId) -> Vec<EntityId> {
        let mut owned: Vec<_> = self
            .entities
            .values()
            .filter(|e| e.owner() == Some(connection))
            .map(ReplicatedEntity::id)
            .collect();
        owned.sort();
        owned
    }

    pub fn component(&self, target: ComponentRef) -> Result<&ComponentSlot> {
        self.entities
            .get(&target.entity)
            .and_then(|e| e.component(target.index))
            .ok_or(ReplicationError::UnresolvedTarget {
                entity: target.entity,
                component_index: target.index,
            })
    }

    pub fn component_mut(&mut self, target: ComponentRef) -> Result<&mut ComponentSlot> {
        self.entities
            .get_mut(&target.entity)
            .and_then(|e| e.component_mut(target.index))
            .ok_or(ReplicationError::UnresolvedTarget {
                entity: target.entity,
                component_index: target.index,
            })
    }
}
