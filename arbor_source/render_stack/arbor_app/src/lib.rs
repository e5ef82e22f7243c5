//! Host-side driver. The scene tree exposes an explicit `tick`; this crate
//! supplies the blocking loop that calls it at a capped rate, with the
//! sleep + spin-tail pacing a display-driven host would otherwise provide.

use arbor_tree::SceneTree;
use std::time::{Duration, Instant};

const DEFAULT_FPS_CAP: f32 = 60.0;
const LOG_INTERVAL_SECONDS: f32 = 2.5;
const FPS_CAP_COMPENSATION: f32 = 1.03;
const SPIN_TAIL_THRESHOLD: Duration = Duration::from_micros(500);

/// Frame-paced driver for a [`SceneTree`]. Runs until the tree stops or
/// requests quit, returning the exit code.
pub struct Runner {
    fps_cap: f32,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            fps_cap: DEFAULT_FPS_CAP,
        }
    }

    pub fn with_fps_cap(fps_cap: f32) -> Self {
        Self {
            fps_cap: fps_cap.max(1.0),
        }
    }

    /// Drive the tree until it stops or requests quit.
    pub fn run(&self, tree: &mut SceneTree) -> i32 {
        self.run_frames(tree, u64::MAX)
    }

    /// Drive at most `max_frames` ticks — the bounded variant demos and
    /// tests use. Returns the quit code, or 0 when none was requested.
    pub fn run_frames(&self, tree: &mut SceneTree, max_frames: u64) -> i32 {
        let target = Duration::from_secs_f32(1.0 / (self.fps_cap * FPS_CAP_COMPENSATION));
        let mut frames = 0u64;
        let mut batch_frames: u32 = 0;
        let mut batch_start = Instant::now();
        let mut batch_work = Duration::ZERO;

        while frames < max_frames && tree.is_running() && tree.quit_requested().is_none() {
            let frame_start = Instant::now();
            tree.tick();
            let work_duration = frame_start.elapsed();

            if work_duration < target {
                let remaining = target - work_duration;
                if remaining > SPIN_TAIL_THRESHOLD {
                    std::thread::sleep(remaining - SPIN_TAIL_THRESHOLD);
                }
                let deadline = frame_start + target;
                while Instant::now() < deadline {
                    std::hint::spin_loop();
                }
            }

            frames += 1;
            batch_frames = batch_frames.saturating_add(1);
            batch_work += work_duration;

            let batch_elapsed = batch_start.elapsed();
            if batch_elapsed.as_secs_f32() >= LOG_INTERVAL_SECONDS && batch_frames > 0 {
                let paced_fps = batch_frames as f32 / batch_elapsed.as_secs_f32();
                let avg_work_us =
                    batch_work.as_secs_f64() * 1_000_000.0 / f64::from(batch_frames);
                log::debug!(
                    "frame {}: {paced_fps:.2} fps | avg work {avg_work_us:.2}us over {batch_frames} frames",
                    tree.frame_count()
                );
                batch_frames = 0;
                batch_work = Duration::ZERO;
                batch_start = Instant::now();
            }
        }

        let code = tree.quit_requested().unwrap_or(0);
        if tree.is_running() {
            tree.stop();
        }
        code
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
