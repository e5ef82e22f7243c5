use anyhow::Result;
use arbor_app::Runner;
use arbor_input::{InputEvent, Key};
use arbor_render_bridge::NullBridge;
use arbor_tree::{NodeBehavior, SceneNode, SceneTree, TreeEvent};
use log::info;

/// Accumulates rotation each logic frame.
struct Spinner {
    angle: f32,
    speed: f32,
}

impl NodeBehavior for Spinner {
    fn on_enter_tree(&mut self) {
        self.angle = 0.0;
    }

    fn on_process(&mut self, delta: f32) {
        self.angle += self.speed * delta;
    }

    fn on_input(&mut self, event: &InputEvent) {
        if let InputEvent::KeyPressed { key: Key::Space } = event {
            self.speed = -self.speed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut tree = SceneTree::new();
    let root = tree.insert_node(SceneNode::empty("Main"));
    let spinner = tree.insert_node(SceneNode::new(
        "Spinner",
        Box::new(Spinner {
            angle: 0.0,
            speed: 1.0,
        }),
    ));
    tree.set_root(root);
    tree.add_child(root, spinner);
    tree.attach_renderer(Box::new(NullBridge::new()));

    tree.push_input(InputEvent::KeyPressed { key: Key::Space });
    tree.start();

    let code = Runner::with_fps_cap(120.0).run_frames(&mut tree, 180);

    let mut events = Vec::new();
    tree.drain_events(&mut events);
    let frames = events
        .iter()
        .filter(|e| matches!(e, TreeEvent::FrameUpdated { .. }))
        .count();
    info!(
        "ran {} frames ({} frame events), elapsed {:.2}s, exit code {code}",
        tree.frame_count(),
        frames,
        tree.elapsed()
    );

    tree.destroy();
    Ok(())
}
