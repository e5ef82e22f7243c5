mod arena;
mod event;
mod group;
mod node;
mod tree;

pub use arena::NodeArena;
pub use event::TreeEvent;
pub use group::GroupIndex;
pub use node::{NodeBehavior, SceneNode};
pub use tree::SceneTree;
