mod id;
mod prefab;
mod replicated;
mod world;

pub use id::{ComponentRef, EntityId};
pub use prefab::{BehaviourFactory, Prefab, PrefabTable};
pub use replicated::{ComponentSlot, ReplicatedEntity, Transform};
pub use world::World;
