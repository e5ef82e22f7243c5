use arbor_ids::NodeID;
use arbor_input::InputEvent;
use std::borrow::Cow;
use std::fmt;

/// Lifecycle callbacks the scheduler invokes on every node. All bodies
/// default to no-ops so a node only implements the hooks it cares about.
///
/// Callbacks are plain synchronous calls on the scheduling thread; a node
/// needing async work must kick it off and poll it from `on_process`.
pub trait NodeBehavior {
    /// Called when the node (or an ancestor) is attached to the tree,
    /// parent before children.
    fn on_enter_tree(&mut self) {}

    /// Called when the node (or an ancestor) is detached, children before
    /// parent.
    fn on_exit_tree(&mut self) {}

    /// Logic pass. `delta` is scaled wall-clock seconds since last tick.
    fn on_process(&mut self, _delta: f32) {}

    /// Physics pass. Runs before `on_process` within the same tick.
    fn on_physics_process(&mut self, _delta: f32) {}

    /// One host input event, dispatched during the input pass.
    fn on_input(&mut self, _event: &InputEvent) {}
}

/// Behavior-less node, for pure grouping/structure.
impl NodeBehavior for () {}

/// One unit of the hierarchy: a name, tree links, and a boxed behavior.
/// Link fields are maintained exclusively by `SceneTree` so parent/children
/// stay mutually consistent.
pub struct SceneNode {
    pub(crate) name: Cow<'static, str>,
    pub(crate) parent: NodeID,
    pub(crate) children: Vec<NodeID>,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl SceneNode {
    pub fn new(name: impl Into<Cow<'static, str>>, behavior: Box<dyn NodeBehavior>) -> Self {
        Self {
            name: name.into(),
            parent: NodeID::nil(),
            children: Vec::new(),
            behavior,
        }
    }

    /// Node with no behavior of its own.
    pub fn empty(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, Box::new(()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = name.into();
    }

    /// Parent link; nil while detached.
    pub fn parent(&self) -> NodeID {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeID] {
        &self.children
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_node_defaults() {
        let node = SceneNode::empty("Root");
        assert_eq!(node.name(), "Root");
        assert!(node.parent().is_nil());
        assert!(node.children().is_empty());
    }

    #[test]
    fn owned_names_work() {
        let node = SceneNode::empty(format!("Enemy{}", 3));
        assert_eq!(node.name(), "Enemy3");
    }
}
