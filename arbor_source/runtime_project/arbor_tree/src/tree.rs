use crate::arena::NodeArena;
use crate::event::TreeEvent;
use crate::group::GroupIndex;
use crate::node::SceneNode;
use arbor_ids::{CameraID, NodeID};
use arbor_input::{InputEvent, InputQueue};
use arbor_render_bridge::RenderBridge;
use log::{debug, info};
use std::time::Instant;

/// Loop/timing state. `delta` is the scaled wall-clock delta of the most
/// recent tick, recomputed exactly once per tick before any callback runs.
struct Timing {
    running: bool,
    paused: bool,
    time_scale: f32,
    frame_count: u64,
    delta: f32,
    elapsed: f32,
    last_tick: Option<Instant>,
}

impl Timing {
    fn new() -> Self {
        Self {
            running: false,
            paused: false,
            time_scale: 1.0,
            frame_count: 0,
            delta: 0.0,
            elapsed: 0.0,
            last_tick: None,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Scratch buffers reused across ticks so the per-pass traversal snapshot
/// and input drain do not allocate in steady state.
struct PassScratch {
    traversal: Vec<NodeID>,
    input_events: Vec<InputEvent>,
}

impl PassScratch {
    fn new() -> Self {
        Self {
            traversal: Vec::new(),
            input_events: Vec::new(),
        }
    }
}

fn preorder(nodes: &NodeArena, id: NodeID, out: &mut Vec<NodeID>) {
    let Some(node) = nodes.get(id) else { return };
    out.push(id);
    for &child in node.children() {
        preorder(nodes, child, out);
    }
}

/// The aggregate root: owns the node hierarchy, the group index, the input
/// queue, the renderer attachment, and the frame loop.
///
/// Everything runs on one thread. The host calls [`tick`](Self::tick) (or
/// [`tick_with_delta`](Self::tick_with_delta)) repeatedly while the tree is
/// running; each tick executes input → physics → logic → render in that
/// order. Node callbacks are invoked directly and nothing is caught — a
/// panicking callback aborts the tick loudly rather than being skipped.
pub struct SceneTree {
    nodes: NodeArena,
    groups: GroupIndex,
    root: NodeID,
    current_scene: NodeID,
    input: InputQueue,
    renderer: Option<Box<dyn RenderBridge>>,
    camera: CameraID,
    timing: Timing,
    events: Vec<TreeEvent>,
    quit_code: Option<i32>,
    scratch: PassScratch,
}

impl SceneTree {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            groups: GroupIndex::new(),
            root: NodeID::nil(),
            current_scene: NodeID::nil(),
            input: InputQueue::new(),
            renderer: None,
            camera: CameraID::nil(),
            timing: Timing::new(),
            events: Vec::new(),
            quit_code: None,
            scratch: PassScratch::new(),
        }
    }

    // ---- nodes & structure ----

    /// Register a node with the tree. The node starts detached; attach it
    /// with [`set_root`](Self::set_root), [`change_scene`](Self::change_scene)
    /// or [`add_child`](Self::add_child).
    pub fn insert_node(&mut self, node: SceneNode) -> NodeID {
        self.nodes.insert(node)
    }

    pub fn node(&self, id: NodeID) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Link `child` under `parent`, keeping insertion order. No-op when
    /// either ID is dead, the child is already parented or is one of the
    /// attachment roots, or the link would create a cycle. Entering the
    /// tree this way fires `on_enter_tree` over the child's subtree.
    pub fn add_child(&mut self, parent: NodeID, child: NodeID) {
        if parent == child || !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return;
        }
        if child == self.root || child == self.current_scene {
            return;
        }
        if !self.nodes.get(child).is_some_and(|n| n.parent.is_nil()) {
            return;
        }
        if self.is_ancestor_of(child, parent) {
            return;
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = parent;
        }
        if self.is_attached(parent) {
            self.propagate_enter(child);
        }
    }

    /// Detach `child` from `parent` without destroying it. Fires
    /// `on_exit_tree` over the subtree when the parent was attached.
    pub fn remove_child(&mut self, parent: NodeID, child: NodeID) {
        let linked = self.nodes.get(child).is_some_and(|n| n.parent == parent);
        if !linked {
            return;
        }
        if self.is_attached(parent) {
            self.propagate_exit(child);
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = NodeID::nil();
        }
    }

    /// Destroy a node and its whole subtree: detach (with exit callbacks
    /// when attached), strip every freed node from all groups, and free the
    /// arena slots. Stale IDs held by callers simply stop resolving.
    pub fn free_node(&mut self, id: NodeID) {
        if !self.nodes.contains(id) {
            return;
        }
        if id == self.root {
            self.set_root(NodeID::nil());
        } else if id == self.current_scene {
            self.change_scene(NodeID::nil());
        } else {
            let parent = self.nodes.get(id).map(|n| n.parent).unwrap_or_default();
            if !parent.is_nil() {
                self.remove_child(parent, id);
            }
        }
        let freed = self.free_subtree(id);
        debug!("freed {freed} node(s)");
    }

    fn free_subtree(&mut self, id: NodeID) -> usize {
        let Some(node) = self.nodes.remove(id) else {
            return 0;
        };
        self.groups.strip_node(id);
        let mut freed = 1;
        for child in node.children {
            freed += self.free_subtree(child);
        }
        freed
    }

    /// Install `node` as the tree root (nil clears it). The previous root
    /// exits and is detached from the renderer first; the new root enters
    /// and is attached after. Re-setting the same node still performs the
    /// full exit/enter cycle.
    pub fn set_root(&mut self, node: NodeID) {
        if !self.attachable(node) {
            return;
        }
        let previous = self.root;
        if !previous.is_nil() {
            self.propagate_exit(previous);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.detach_root(previous);
            }
        }
        self.root = node;
        if !node.is_nil() {
            self.propagate_enter(node);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.attach_root(node);
            }
        }
        debug!("root changed to {node}");
        self.events.push(TreeEvent::RootChanged { root: node });
    }

    /// Swap the active gameplay scene, independently of the root — a host
    /// can keep a persistent overlay as root and switch scenes beneath it.
    /// Same exit/detach/enter/attach shape as [`set_root`](Self::set_root).
    pub fn change_scene(&mut self, node: NodeID) {
        if !self.attachable(node) {
            return;
        }
        let previous = self.current_scene;
        if !previous.is_nil() {
            self.propagate_exit(previous);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.detach_root(previous);
            }
        }
        self.current_scene = node;
        if !node.is_nil() {
            self.propagate_enter(node);
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.attach_root(node);
            }
        }
        debug!("scene changed to {node}");
        self.events.push(TreeEvent::SceneChanged { scene: node });
    }

    /// A node can become root/current scene only if it exists and is not
    /// parented somewhere in a tree already. Nil is always attachable.
    fn attachable(&self, node: NodeID) -> bool {
        if node.is_nil() {
            return true;
        }
        self.nodes.get(node).is_some_and(|n| n.parent.is_nil())
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    pub fn current_scene(&self) -> NodeID {
        self.current_scene
    }

    fn is_attached(&self, id: NodeID) -> bool {
        let mut current = id;
        while !current.is_nil() {
            if current == self.root || current == self.current_scene {
                return true;
            }
            current = match self.nodes.get(current) {
                Some(node) => node.parent,
                None => return false,
            };
        }
        false
    }

    fn is_ancestor_of(&self, ancestor: NodeID, descendant: NodeID) -> bool {
        let mut current = descendant;
        while let Some(node) = self.nodes.get(current) {
            current = node.parent;
            if current == ancestor {
                return true;
            }
        }
        false
    }

    fn propagate_enter(&mut self, id: NodeID) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.behavior.on_enter_tree();
        let children = node.children.clone();
        for child in children {
            self.propagate_enter(child);
        }
    }

    fn propagate_exit(&mut self, id: NodeID) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let children = node.children.clone();
        for child in children {
            self.propagate_exit(child);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.behavior.on_exit_tree();
        }
    }

    // ---- queries ----

    /// Resolve a slash-delimited child-name path from the root. Empty
    /// paths, an unset root, or any unmatched segment yield None.
    pub fn find_node(&self, path: &str) -> Option<NodeID> {
        if self.root.is_nil() {
            return None;
        }
        let mut current = self.root;
        let mut matched_any = false;
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            matched_any = true;
            let node = self.nodes.get(current)?;
            current = node
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == segment))?;
        }
        matched_any.then_some(current)
    }

    /// All nodes matching `predicate`, pre-order from the root. O(tree
    /// size) every call — queried far less often than ticked, so no cache.
    pub fn find_nodes_by(&self, predicate: impl Fn(&SceneNode) -> bool) -> Vec<NodeID> {
        let mut out = Vec::new();
        preorder(&self.nodes, self.root, &mut out);
        out.retain(|&id| self.nodes.get(id).is_some_and(&predicate));
        out
    }

    pub fn find_nodes_by_name(&self, name: &str) -> Vec<NodeID> {
        self.find_nodes_by(|node| node.name == name)
    }

    // ---- groups ----

    /// Tag a node. Lazily creates the group; re-adding a member is a no-op
    /// and emits nothing. Unknown node IDs are ignored, so a group can
    /// never hold an ID the arena does not.
    pub fn add_to_group(&mut self, node: NodeID, tag: &str) {
        if !self.nodes.contains(node) {
            return;
        }
        if self.groups.insert(tag, node) {
            self.events.push(TreeEvent::NodeAddedToGroup {
                node,
                group: tag.to_string(),
            });
        }
    }

    /// Un-tag a node. Removing a non-member (or from an unknown tag) is a
    /// silent no-op; emptying a group deletes the tag.
    pub fn remove_from_group(&mut self, node: NodeID, tag: &str) {
        if self.groups.remove(tag, node) {
            self.events.push(TreeEvent::NodeRemovedFromGroup {
                node,
                group: tag.to_string(),
            });
        }
    }

    /// Snapshot of the group's members, arbitrary order, empty for an
    /// unknown tag. Callers needing a stable order sort it themselves.
    pub fn get_nodes_in_group(&self, tag: &str) -> Vec<NodeID> {
        self.groups.nodes(tag)
    }

    pub fn get_first_node_in_group(&self, tag: &str) -> Option<NodeID> {
        self.groups.first(tag)
    }

    pub fn has_group(&self, tag: &str) -> bool {
        self.groups.has(tag)
    }

    pub fn group_list(&self) -> Vec<String> {
        self.groups.tags()
    }

    // ---- renderer ----

    /// Attach the external renderer. An already-installed root/current
    /// scene is attached immediately so a late-bound renderer sees the
    /// live tree.
    pub fn attach_renderer(&mut self, mut renderer: Box<dyn RenderBridge>) {
        if !self.root.is_nil() {
            renderer.attach_root(self.root);
        }
        if !self.current_scene.is_nil() {
            renderer.attach_root(self.current_scene);
        }
        self.renderer = Some(renderer);
    }

    pub fn attach_camera(&mut self, camera: CameraID) {
        self.camera = camera;
    }

    // ---- input ----

    /// Queue a host input event for the next tick's input pass.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn input(&self) -> &InputQueue {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputQueue {
        &mut self.input
    }

    // ---- loop control ----

    /// Begin running. No-op while already running; otherwise arms the
    /// wall-clock timestamp and emits `Started`. The host drives the
    /// actual ticks.
    pub fn start(&mut self) {
        if self.timing.running {
            return;
        }
        self.timing.running = true;
        self.timing.last_tick = Some(Instant::now());
        info!("scene tree started");
        self.events.push(TreeEvent::Started);
    }

    /// Stop running. Cooperative: a tick already in progress finishes.
    /// Does not tear down the tree — that is [`destroy`](Self::destroy).
    pub fn stop(&mut self) {
        if !self.timing.running {
            return;
        }
        self.timing.running = false;
        info!("scene tree stopped");
        self.events.push(TreeEvent::Stopped);
    }

    /// Record a quit request for the host to observe; the tree itself
    /// keeps running until the host stops driving it.
    pub fn quit(&mut self, code: i32) {
        self.quit_code = Some(code);
        self.events.push(TreeEvent::QuitRequested { code });
    }

    pub fn quit_requested(&self) -> Option<i32> {
        self.quit_code
    }

    pub fn is_running(&self) -> bool {
        self.timing.running
    }

    pub fn paused(&self) -> bool {
        self.timing.paused
    }

    /// Pausing skips the physics and logic passes from the next tick on;
    /// input, render, and frame events keep flowing.
    pub fn set_paused(&mut self, paused: bool) {
        if self.timing.paused == paused {
            return;
        }
        self.timing.paused = paused;
        self.events.push(TreeEvent::PausedChanged { paused });
    }

    pub fn time_scale(&self) -> f32 {
        self.timing.time_scale
    }

    /// Clamped to ≥ 0. Zero freezes reported delta without stopping ticks.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.timing.time_scale = scale.max(0.0);
    }

    pub fn frame_count(&self) -> u64 {
        self.timing.frame_count
    }

    pub fn delta_time(&self) -> f32 {
        self.timing.delta
    }

    /// Accumulated scaled seconds since `start()`.
    pub fn elapsed(&self) -> f32 {
        self.timing.elapsed
    }

    // ---- the tick ----

    /// One frame, measuring the wall-clock delta since the previous tick.
    /// No-op unless running.
    pub fn tick(&mut self) {
        if !self.timing.running {
            return;
        }
        let now = Instant::now();
        let raw = self
            .timing
            .last_tick
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.timing.last_tick = Some(now);
        self.advance(raw);
    }

    /// One frame with an explicit raw (unscaled) delta in seconds — the
    /// host-loop/test entry point that skips the wall clock entirely.
    pub fn tick_with_delta(&mut self, raw_delta: f32) {
        if !self.timing.running {
            return;
        }
        self.advance(raw_delta.max(0.0));
    }

    fn advance(&mut self, raw_delta: f32) {
        let delta = raw_delta * self.timing.time_scale;
        self.timing.delta = delta;
        self.timing.elapsed += delta;
        self.timing.frame_count += 1;

        self.run_input_pass();
        if !self.timing.paused {
            self.run_physics_pass(delta);
            self.run_process_pass(delta);
        }
        self.render_pass();
        self.events.push(TreeEvent::FrameUpdated { delta });
    }

    /// Rebuild the pre-order snapshot both passes iterate. The root tree
    /// comes first, then the current scene (always a separate subtree —
    /// attachment roots can never be parented). Nodes added mid-pass are
    /// therefore not visited until the next pass; nodes freed mid-pass
    /// drop out because their IDs stop resolving.
    fn snapshot_traversal(&mut self) {
        self.scratch.traversal.clear();
        preorder(&self.nodes, self.root, &mut self.scratch.traversal);
        if !self.current_scene.is_nil() && self.current_scene != self.root {
            preorder(&self.nodes, self.current_scene, &mut self.scratch.traversal);
        }
    }

    fn run_input_pass(&mut self) {
        let mut events = std::mem::take(&mut self.scratch.input_events);
        events.clear();
        self.input.drain_into(&mut events);

        if !events.is_empty() {
            self.snapshot_traversal();
            for event in &events {
                let mut i = 0;
                while i < self.scratch.traversal.len() {
                    let id = self.scratch.traversal[i];
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.behavior.on_input(event);
                    }
                    i += 1;
                }
            }
        }

        self.scratch.input_events = events;
        self.events.push(TreeEvent::InputProcessed);
    }

    fn run_physics_pass(&mut self, delta: f32) {
        self.snapshot_traversal();
        let mut i = 0;
        while i < self.scratch.traversal.len() {
            let id = self.scratch.traversal[i];
            if let Some(node) = self.nodes.get_mut(id) {
                node.behavior.on_physics_process(delta);
            }
            i += 1;
        }
        self.events.push(TreeEvent::PhysicsFrame { delta });
    }

    fn run_process_pass(&mut self, delta: f32) {
        self.snapshot_traversal();
        let mut i = 0;
        while i < self.scratch.traversal.len() {
            let id = self.scratch.traversal[i];
            if let Some(node) = self.nodes.get_mut(id) {
                node.behavior.on_process(delta);
            }
            i += 1;
        }
        self.events.push(TreeEvent::ProcessFrame { delta });
    }

    /// Draw through the bridge when both a renderer and a camera are
    /// attached; headless trees skip straight to the notification.
    fn render_pass(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            if !self.camera.is_nil() {
                renderer.draw_frame(self.camera);
            }
        }
        self.events.push(TreeEvent::RenderFrame);
    }

    // ---- events & teardown ----

    /// Move all pending events into `out` without reallocating.
    pub fn drain_events(&mut self, out: &mut Vec<TreeEvent>) {
        out.append(&mut self.events);
    }

    /// Full teardown: stop, exit and free every node, clear all groups,
    /// drop the renderer attachment, reset timing. The tree is reusable
    /// afterwards.
    pub fn destroy(&mut self) {
        self.stop();
        if !self.root.is_nil() {
            self.set_root(NodeID::nil());
        }
        if !self.current_scene.is_nil() {
            self.change_scene(NodeID::nil());
        }
        self.nodes.clear();
        self.groups.clear();
        self.renderer = None;
        self.camera = CameraID::nil();
        self.quit_code = None;
        self.timing.reset();
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBehavior;
    use arbor_input::{InputEvent, Key};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared call log; entries like "A:enter", "B:process".
    type CallLog = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        tag: &'static str,
        log: CallLog,
        deltas: Rc<RefCell<Vec<f32>>>,
    }

    impl Recorder {
        fn new(tag: &'static str, log: &CallLog) -> Self {
            Self {
                tag,
                log: Rc::clone(log),
                deltas: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl NodeBehavior for Recorder {
        fn on_enter_tree(&mut self) {
            self.log.borrow_mut().push(format!("{}:enter", self.tag));
        }
        fn on_exit_tree(&mut self) {
            self.log.borrow_mut().push(format!("{}:exit", self.tag));
        }
        fn on_process(&mut self, delta: f32) {
            self.log.borrow_mut().push(format!("{}:process", self.tag));
            self.deltas.borrow_mut().push(delta);
        }
        fn on_physics_process(&mut self, _delta: f32) {
            self.log.borrow_mut().push(format!("{}:physics", self.tag));
        }
        fn on_input(&mut self, _event: &InputEvent) {
            self.log.borrow_mut().push(format!("{}:input", self.tag));
        }
    }

    fn recorder_node(tag: &'static str, log: &CallLog) -> SceneNode {
        SceneNode::new(tag, Box::new(Recorder::new(tag, log)))
    }

    fn drain(tree: &mut SceneTree) -> Vec<TreeEvent> {
        let mut out = Vec::new();
        tree.drain_events(&mut out);
        out
    }

    /// Root R with children A and B, attached, event queue drained.
    fn small_tree(log: &CallLog) -> (SceneTree, NodeID, NodeID, NodeID) {
        let mut tree = SceneTree::new();
        let r = tree.insert_node(recorder_node("R", log));
        let a = tree.insert_node(recorder_node("A", log));
        let b = tree.insert_node(recorder_node("B", log));
        tree.set_root(r);
        tree.add_child(r, a);
        tree.add_child(r, b);
        drain(&mut tree);
        log.borrow_mut().clear();
        (tree, r, a, b)
    }

    #[test]
    fn set_root_swap_orders_exit_before_enter() {
        let log: CallLog = Rc::default();
        let mut tree = SceneTree::new();
        let x = tree.insert_node(recorder_node("X", &log));
        let y = tree.insert_node(recorder_node("Y", &log));

        tree.set_root(x);
        drain(&mut tree);
        log.borrow_mut().clear();

        tree.set_root(y);

        assert_eq!(*log.borrow(), vec!["X:exit", "Y:enter"]);
        let root_events: Vec<_> = drain(&mut tree)
            .into_iter()
            .filter(|e| matches!(e, TreeEvent::RootChanged { .. }))
            .collect();
        assert_eq!(root_events, vec![TreeEvent::RootChanged { root: y }]);
        assert_eq!(tree.root(), y);
    }

    #[test]
    fn set_root_same_node_recycles() {
        let log: CallLog = Rc::default();
        let mut tree = SceneTree::new();
        let x = tree.insert_node(recorder_node("X", &log));

        tree.set_root(x);
        tree.set_root(x);

        assert_eq!(*log.borrow(), vec!["X:enter", "X:exit", "X:enter"]);
    }

    #[test]
    fn enter_is_preorder_exit_is_postorder() {
        let log: CallLog = Rc::default();
        let mut tree = SceneTree::new();
        let r = tree.insert_node(recorder_node("R", &log));
        let a = tree.insert_node(recorder_node("A", &log));
        let c = tree.insert_node(recorder_node("C", &log));
        tree.add_child(r, a);
        tree.add_child(a, c);

        tree.set_root(r);
        assert_eq!(*log.borrow(), vec!["R:enter", "A:enter", "C:enter"]);

        log.borrow_mut().clear();
        tree.set_root(NodeID::nil());
        assert_eq!(*log.borrow(), vec!["C:exit", "A:exit", "R:exit"]);
        assert!(tree.root().is_nil());
    }

    #[test]
    fn add_child_to_attached_parent_enters() {
        let log: CallLog = Rc::default();
        let (mut tree, r, _a, _b) = small_tree(&log);

        let late = tree.insert_node(recorder_node("L", &log));
        tree.add_child(r, late);
        assert_eq!(*log.borrow(), vec!["L:enter"]);

        log.borrow_mut().clear();
        tree.remove_child(r, late);
        assert_eq!(*log.borrow(), vec!["L:exit"]);
        assert!(tree.node(late).is_some(), "detach must not destroy");
        assert!(tree.node(late).unwrap().parent().is_nil());
    }

    #[test]
    fn add_child_rejects_cycles_and_double_parenting() {
        let log: CallLog = Rc::default();
        let (mut tree, r, a, b) = small_tree(&log);

        // a is already parented under r
        tree.add_child(b, a);
        assert_eq!(tree.node(a).unwrap().parent(), r);

        // would create a cycle: r is an ancestor of a
        tree.remove_child(r, b);
        tree.add_child(a, b);
        tree.add_child(b, r);
        assert!(tree.node(r).unwrap().parent().is_nil());
        assert_eq!(tree.node(b).unwrap().parent(), a);

        // self-parenting
        tree.add_child(a, a);
        assert!(!tree.node(a).unwrap().children().contains(&a));
    }

    #[test]
    fn group_scenario_add_remove_until_empty() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, b) = small_tree(&log);

        tree.add_to_group(a, "enemy");
        tree.add_to_group(b, "enemy");

        let mut members = tree.get_nodes_in_group("enemy");
        members.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);
        assert!(tree.has_group("enemy"));

        tree.remove_from_group(a, "enemy");
        assert_eq!(tree.get_nodes_in_group("enemy"), vec![b]);

        tree.remove_from_group(b, "enemy");
        assert!(!tree.has_group("enemy"));
        assert!(tree.get_nodes_in_group("enemy").is_empty());
        assert!(tree.get_first_node_in_group("enemy").is_none());
    }

    #[test]
    fn group_events_fire_only_on_change() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, _b) = small_tree(&log);

        tree.add_to_group(a, "enemy");
        tree.add_to_group(a, "enemy");
        tree.remove_from_group(a, "missing");

        let events = drain(&mut tree);
        assert_eq!(
            events,
            vec![TreeEvent::NodeAddedToGroup {
                node: a,
                group: "enemy".to_string()
            }]
        );

        tree.remove_from_group(a, "enemy");
        tree.remove_from_group(a, "enemy");
        let events = drain(&mut tree);
        assert_eq!(
            events,
            vec![TreeEvent::NodeRemovedFromGroup {
                node: a,
                group: "enemy".to_string()
            }]
        );
    }

    #[test]
    fn grouping_unknown_node_is_noop() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, _b) = small_tree(&log);

        tree.free_node(a);
        tree.add_to_group(a, "enemy");

        assert!(!tree.has_group("enemy"));
        assert!(
            !drain(&mut tree)
                .iter()
                .any(|e| matches!(e, TreeEvent::NodeAddedToGroup { .. }))
        );
    }

    #[test]
    fn free_node_strips_groups_without_removal_events() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, b) = small_tree(&log);
        tree.add_to_group(a, "enemy");
        tree.add_to_group(b, "enemy");
        drain(&mut tree);

        tree.free_node(a);

        assert_eq!(tree.get_nodes_in_group("enemy"), vec![b]);
        assert!(tree.node(a).is_none());
        assert!(
            !drain(&mut tree)
                .iter()
                .any(|e| matches!(e, TreeEvent::NodeRemovedFromGroup { .. })),
            "destruction is not an un-tagging"
        );
    }

    #[test]
    fn free_subtree_recursively() {
        let log: CallLog = Rc::default();
        let (mut tree, r, a, _b) = small_tree(&log);
        let leaf = tree.insert_node(recorder_node("Leaf", &log));
        tree.add_child(a, leaf);
        tree.add_to_group(leaf, "pickup");
        log.borrow_mut().clear();

        tree.free_node(a);

        // exit runs children-first, then both slots are gone
        assert_eq!(*log.borrow(), vec!["Leaf:exit", "A:exit"]);
        assert!(tree.node(a).is_none());
        assert!(tree.node(leaf).is_none());
        assert!(!tree.has_group("pickup"));
        assert_eq!(tree.node(r).unwrap().children().len(), 1);
    }

    #[test]
    fn find_node_resolves_paths() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, b) = small_tree(&log);
        let leaf = tree.insert_node(recorder_node("Leaf", &log));
        tree.add_child(a, leaf);

        assert_eq!(tree.find_node("A"), Some(a));
        assert_eq!(tree.find_node("A/Leaf"), Some(leaf));
        assert_eq!(tree.find_node("B"), Some(b));
        assert_eq!(tree.find_node("A//Leaf"), Some(leaf));
        assert_eq!(tree.find_node("A/Missing"), None);
        assert_eq!(tree.find_node(""), None);
    }

    #[test]
    fn find_node_without_root_is_none() {
        let tree = SceneTree::new();
        assert_eq!(tree.find_node("anything"), None);
    }

    #[test]
    fn queries_are_preorder() {
        let mut tree = SceneTree::new();
        let r = tree.insert_node(SceneNode::empty("R"));
        let a = tree.insert_node(SceneNode::empty("Dup"));
        let c = tree.insert_node(SceneNode::empty("Dup"));
        let b = tree.insert_node(SceneNode::empty("Dup"));
        tree.set_root(r);
        tree.add_child(r, a);
        tree.add_child(a, c);
        tree.add_child(r, b);

        assert_eq!(tree.find_nodes_by_name("Dup"), vec![a, c, b]);
        let all = tree.find_nodes_by(|_| true);
        assert_eq!(all, vec![r, a, c, b]);
    }

    #[test]
    fn tick_advances_timing_and_passes() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);
        tree.start();
        drain(&mut tree);

        for _ in 0..3 {
            tree.tick_with_delta(0.016);
        }

        assert_eq!(tree.frame_count(), 3);
        assert!((tree.delta_time() - 0.016).abs() < 1e-6);
        assert!((tree.elapsed() - 0.048).abs() < 1e-5);

        // physics before process, parent before children, every tick
        let first_six: Vec<_> = log.borrow().iter().take(6).cloned().collect();
        assert_eq!(
            first_six,
            vec!["R:physics", "A:physics", "B:physics", "R:process", "A:process", "B:process"]
        );
    }

    #[test]
    fn tick_event_order_within_frame() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);
        tree.start();
        drain(&mut tree);

        tree.tick_with_delta(0.016);

        let events = drain(&mut tree);
        let positions: Vec<_> = events
            .iter()
            .map(|e| match e {
                TreeEvent::InputProcessed => "input",
                TreeEvent::PhysicsFrame { .. } => "physics",
                TreeEvent::ProcessFrame { .. } => "process",
                TreeEvent::RenderFrame => "render",
                TreeEvent::FrameUpdated { .. } => "frame",
                _ => "other",
            })
            .collect();
        assert_eq!(positions, vec!["input", "physics", "process", "render", "frame"]);
    }

    #[test]
    fn time_scale_scales_delta_linearly() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);
        tree.start();

        tree.set_time_scale(2.0);
        tree.tick_with_delta(0.016);
        assert!((tree.delta_time() - 0.032).abs() < 1e-6);

        tree.set_time_scale(0.0);
        tree.tick_with_delta(0.016);
        assert_eq!(tree.delta_time(), 0.0);

        // negative requests clamp to zero
        tree.set_time_scale(-5.0);
        assert_eq!(tree.time_scale(), 0.0);
    }

    #[test]
    fn zero_time_scale_still_runs_callbacks_with_zero_delta() {
        let log: CallLog = Rc::default();
        let mut tree = SceneTree::new();
        let recorder = Recorder::new("R", &log);
        let deltas = Rc::clone(&recorder.deltas);
        let r = tree.insert_node(SceneNode::new("R", Box::new(recorder)));
        tree.set_root(r);
        tree.start();

        tree.set_time_scale(0.0);
        tree.tick_with_delta(0.016);

        assert_eq!(*deltas.borrow(), vec![0.0]);
    }

    #[test]
    fn pause_skips_simulation_but_not_render_events() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);
        tree.start();
        tree.set_paused(true);
        drain(&mut tree);

        tree.tick_with_delta(0.016);

        assert!(
            log.borrow().iter().all(|entry| !entry.contains("process") && !entry.contains("physics")),
            "paused tick must not reach node simulation callbacks"
        );
        let events = drain(&mut tree);
        assert!(events.contains(&TreeEvent::RenderFrame));
        assert!(matches!(
            events.last(),
            Some(TreeEvent::FrameUpdated { .. })
        ));
        assert!(!events.iter().any(|e| matches!(e, TreeEvent::PhysicsFrame { .. })));
        assert_eq!(tree.frame_count(), 1, "paused ticks still count frames");
    }

    #[test]
    fn pause_events_fire_on_change_only() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);

        tree.set_paused(true);
        tree.set_paused(true);
        tree.set_paused(false);

        let pauses: Vec<_> = drain(&mut tree)
            .into_iter()
            .filter(|e| matches!(e, TreeEvent::PausedChanged { .. }))
            .collect();
        assert_eq!(
            pauses,
            vec![
                TreeEvent::PausedChanged { paused: true },
                TreeEvent::PausedChanged { paused: false },
            ]
        );
    }

    #[test]
    fn tick_without_start_is_noop() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);

        tree.tick_with_delta(0.016);
        tree.tick();

        assert_eq!(tree.frame_count(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut tree = SceneTree::new();
        tree.start();
        tree.start();
        tree.stop();
        tree.stop();

        let events = drain(&mut tree);
        assert_eq!(events, vec![TreeEvent::Started, TreeEvent::Stopped]);
        assert!(!tree.is_running());
    }

    #[test]
    fn quit_records_code_for_host() {
        let mut tree = SceneTree::new();
        tree.start();
        tree.quit(3);

        assert_eq!(tree.quit_requested(), Some(3));
        assert!(tree.is_running(), "quit is observed by the host, not enforced");
        assert!(drain(&mut tree).contains(&TreeEvent::QuitRequested { code: 3 }));
    }

    #[test]
    fn input_dispatches_to_tree_even_while_paused() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, _a, _b) = small_tree(&log);
        tree.start();
        tree.set_paused(true);
        drain(&mut tree);

        tree.push_input(InputEvent::KeyPressed { key: Key::Space });
        tree.tick_with_delta(0.016);

        assert_eq!(*log.borrow(), vec!["R:input", "A:input", "B:input"]);
        assert!(tree.input().is_key_pressed(Key::Space));
        assert!(drain(&mut tree).contains(&TreeEvent::InputProcessed));
    }

    /// Bridge double sharing its call record with the test.
    #[derive(Clone, Default)]
    struct RecordingBridge {
        calls: Rc<RefCell<Vec<String>>>,
        frames: Rc<RefCell<u64>>,
    }

    impl RenderBridge for RecordingBridge {
        fn attach_root(&mut self, root: NodeID) {
            self.calls.borrow_mut().push(format!("attach:{root}"));
        }
        fn detach_root(&mut self, root: NodeID) {
            self.calls.borrow_mut().push(format!("detach:{root}"));
        }
        fn draw_frame(&mut self, _camera: CameraID) {
            *self.frames.borrow_mut() += 1;
        }
    }

    #[test]
    fn renderer_sees_root_swaps_and_camera_gating() {
        let log: CallLog = Rc::default();
        let (mut tree, r, _a, _b) = small_tree(&log);
        let bridge = RecordingBridge::default();
        let calls = Rc::clone(&bridge.calls);
        let frames = Rc::clone(&bridge.frames);

        // late-bound renderer picks up the existing root
        tree.attach_renderer(Box::new(bridge));
        assert_eq!(*calls.borrow(), vec![format!("attach:{r}")]);
        tree.start();

        // no camera yet: render pass is a no-op but the event still fires
        tree.tick_with_delta(0.016);
        assert_eq!(*frames.borrow(), 0);
        assert!(drain(&mut tree).contains(&TreeEvent::RenderFrame));

        tree.attach_camera(CameraID::from_parts(1, 0));
        tree.tick_with_delta(0.016);
        tree.tick_with_delta(0.016);
        assert_eq!(*frames.borrow(), 2);

        // swapping the root swaps the bridge attachment in the same call
        calls.borrow_mut().clear();
        let r2 = tree.insert_node(recorder_node("R2", &log));
        tree.set_root(r2);
        assert_eq!(
            *calls.borrow(),
            vec![format!("detach:{r}"), format!("attach:{r2}")]
        );
    }

    #[test]
    fn change_scene_is_independent_of_root() {
        let log: CallLog = Rc::default();
        let (mut tree, r, _a, _b) = small_tree(&log);
        let scene = tree.insert_node(recorder_node("S", &log));
        log.borrow_mut().clear();

        tree.change_scene(scene);
        assert_eq!(tree.root(), r, "root survives a scene change");
        assert_eq!(tree.current_scene(), scene);
        assert_eq!(*log.borrow(), vec!["S:enter"]);
        assert!(
            drain(&mut tree).contains(&TreeEvent::SceneChanged { scene })
        );

        // scene nodes participate in passes alongside the root tree
        log.borrow_mut().clear();
        tree.start();
        tree.tick_with_delta(0.016);
        assert!(log.borrow().contains(&"S:process".to_string()));
        assert!(log.borrow().contains(&"R:process".to_string()));
    }

    #[test]
    fn attached_scene_cannot_be_childed() {
        let log: CallLog = Rc::default();
        let (mut tree, r, _a, _b) = small_tree(&log);
        let scene = tree.insert_node(recorder_node("S", &log));
        tree.change_scene(scene);

        tree.add_child(r, scene);
        assert!(tree.node(scene).unwrap().parent().is_nil());
    }

    #[test]
    fn destroy_clears_everything() {
        let log: CallLog = Rc::default();
        let (mut tree, _r, a, _b) = small_tree(&log);
        tree.add_to_group(a, "enemy");
        tree.attach_camera(CameraID::from_parts(1, 0));
        tree.start();
        tree.quit(1);
        log.borrow_mut().clear();

        tree.destroy();

        assert!(!tree.is_running());
        assert!(tree.root().is_nil());
        assert!(tree.current_scene().is_nil());
        assert_eq!(tree.node_count(), 0);
        assert!(tree.group_list().is_empty());
        assert_eq!(tree.quit_requested(), None);
        assert_eq!(tree.frame_count(), 0);
        // the subtree exited before being dropped
        assert_eq!(*log.borrow(), vec!["A:exit", "B:exit", "R:exit"]);
    }
}
