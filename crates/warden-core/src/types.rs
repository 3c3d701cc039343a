use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One kill parsed out of the server log. Times are seconds since the
/// log epoch (the server writes `mm:ss` prefixes, so a round restart
/// can move time backwards; consumers must tolerate that).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    pub time: u64,
    pub killer_id: u32,
    pub victim_id: u32,
}

impl KillEvent {
    pub fn new(time: u64, killer_id: u32, victim_id: u32) -> Self {
        Self {
            time,
            killer_id,
            victim_id,
        }
    }
}

/// Classification of a killer's recent behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspicionStatus {
    /// Nothing noteworthy on record.
    #[default]
    None,
    /// One double kill on record; watch but don't act.
    Suspected,
    /// Enough double kills or a kill spree; eligible for a kick.
    Kickable,
    /// Evidence points at the victim provoking the kills, not the killer.
    Baited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: String,
    pub severity: AlertSeverity,
    pub kind: AlertKind,
    pub title: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertKind {
    LamerSuspected { player_id: u32 },
    LamerKicked { player_id: u32 },
    PlayerForgiven { player_id: u32 },
    PossibleBaiter { player_id: u32 },
    SpammerMuted { player_id: u32, minutes: u32 },
    ImpersonatorKicked { player_id: u32 },
    WatchedWord { player_id: u32, word: String },
}
