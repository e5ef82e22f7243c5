use arbor_ids::NodeID;

/// Everything the tree announces to its host. The tree queues these as it
/// works; the host drains the queue once per frame (or whenever it likes)
/// with [`SceneTree::drain_events`](crate::SceneTree::drain_events).
///
/// `RootChanged`/`SceneChanged` carry nil when the pointer was cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Started,
    Stopped,
    PausedChanged { paused: bool },
    RootChanged { root: NodeID },
    SceneChanged { scene: NodeID },
    QuitRequested { code: i32 },
    NodeAddedToGroup { node: NodeID, group: String },
    NodeRemovedFromGroup { node: NodeID, group: String },
    InputProcessed,
    PhysicsFrame { delta: f32 },
    ProcessFrame { delta: f32 },
    RenderFrame,
    FrameUpdated { delta: f32 },
}
