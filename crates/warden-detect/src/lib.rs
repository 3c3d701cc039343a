pub mod chat;
pub mod kills;

pub use chat::{ChatConfig, ChatTracker};
pub use kills::{KillTracker, TrackerConfig};
