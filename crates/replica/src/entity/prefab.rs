use crate::behaviour::Behaviour;
use crate::error::{ReplicationError, Result};

pub type BehaviourFactory = Box<dyn Fn() -> Vec<Box<dyn Behaviour>> + Send + Sync>;

pub struct Prefab {
    name: String,
    build: BehaviourFactory,
}

impl Prefab {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Prefab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefab").field("name", &self.name).finish()
    }
}

/// Spawnable templates, addressed on the wire by their index. Every peer must
/// register the same prefabs in the same order.
#[derive(Debug, Default)]
pub struct PrefabTable {
    prefabs: Vec<Prefab>,
}

impl PrefabTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, build: F) -> usize
    where
        F: Fn() -> Vec<Box<dyn Behaviour>> + Send + Sync + 'static,
    {
        self.prefabs.push(Prefab {
            name: name.to_string(),
            build: Box::new(build),
        });
        self.prefabs.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Prefab> {
        self.prefabs.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.prefabs.iter().position(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    pub fn instantiate(&self, index: usize) -> Result<Vec<Box<dyn Behaviour>>> {
        let prefab = self.get(index).ok_or(ReplicationError::UnknownPrefab(index))?;
        Ok((prefab.build)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviour::NetworkIdentity;

    #[test]
    fn indices_follow_registration_order() {
        let mut prefabs = PrefabTable::new();
        assert_eq!(prefabs.register("Empty", Vec::new), 0);
        assert_eq!(
            prefabs.register("Marker", || vec![Box::new(NetworkIdentity) as Box<dyn Behaviour>]),
            1
        );

        assert_eq!(prefabs.index_of("Marker"), Some(1));
        assert_eq!(prefabs.instantiate(1).unwrap().len(), 1);
        assert!(prefabs.instantiate(0).unwrap().is_empty());
    }

    #[test]
    fn unknown_index_is_rejected() {
        let prefabs = PrefabTable::new();
        assert!(matches!(
            prefabs.instantiate(2),
            Err(ReplicationError::UnknownPrefab(2))
        ));
    }
}
