//! The narrow contract the scene tree draws through. The tree never links
//! against a concrete renderer; it hands over an opaque scene-root handle
//! on attach and asks for one frame per tick.

use arbor_ids::{CameraID, NodeID};

/// Implemented by the external renderer. `attach_root`/`detach_root` track
/// which subtree is live; `draw_frame` renders it through the given camera.
///
/// The scene tree only calls `draw_frame` while both a bridge and a
/// non-nil camera are attached, so implementations may assume a valid
/// camera handle.
pub trait RenderBridge {
    fn attach_root(&mut self, root: NodeID);

    fn detach_root(&mut self, root: NodeID);

    fn draw_frame(&mut self, camera: CameraID);
}

/// Bridge that renders nowhere. Useful for headless hosts that still want
/// attach/detach bookkeeping exercised.
#[derive(Debug, Default)]
pub struct NullBridge {
    attached: Vec<NodeID>,
    frames: u64,
}

impl NullBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached_roots(&self) -> &[NodeID] {
        &self.attached
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }
}

impl RenderBridge for NullBridge {
    fn attach_root(&mut self, root: NodeID) {
        if !self.attached.contains(&root) {
            self.attached.push(root);
        }
    }

    fn detach_root(&mut self, root: NodeID) {
        self.attached.retain(|&r| r != root);
    }

    fn draw_frame(&mut self, _camera: CameraID) {
        self.frames += 1;
    }
}
