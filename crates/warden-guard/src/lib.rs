pub mod judge;
pub mod rcon;
pub mod roster;

pub use judge::{Judge, JudgePolicy};
pub use rcon::RconClient;
pub use roster::{Player, Roster};
