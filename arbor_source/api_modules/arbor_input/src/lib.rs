mod event;
mod manager;

pub use event::{InputEvent, Key, MouseButton};
pub use manager::{InputMap, InputQueue, InputSource, InputState};
