use std::collections::hash_map::Entry;
use std::collections::HashMap;
use warden_capture::strip_colors;
use warden_detect::{ChatConfig, ChatTracker, KillTracker, TrackerConfig};

/// An in-game player and the per-player tracking state hanging off them.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub ip: String,
    pub name: String,
    /// Color-stripped, lowercased, trimmed.
    pub clean_name: String,
    pub name_change_time: u64,
    pub kills: KillTracker,
    pub chat: ChatTracker,
    pub last_killer: Option<u32>,
}

impl Player {
    fn new(id: u32, ip: String, tracker: &TrackerConfig, chat: &ChatConfig) -> Self {
        Self {
            id,
            ip,
            name: String::new(),
            clean_name: String::new(),
            name_change_time: 0,
            kills: KillTracker::new(tracker.clone()),
            chat: ChatTracker::new(chat.clone()),
            last_killer: None,
        }
    }

    pub fn change_name(&mut self, new_name: &str, time: u64) {
        let previous_clean_name = std::mem::take(&mut self.clean_name);
        self.name = new_name.to_string();
        self.clean_name = strip_colors(new_name).trim().to_lowercase();
        if self.clean_name != previous_clean_name {
            self.name_change_time = time;
        }
    }

    /// `name (id|ip)`, the form used in chat messages and alerts.
    pub fn label(&self) -> String {
        let name = if self.clean_name.is_empty() {
            "<unnamed>"
        } else {
            &self.clean_name
        };
        format!("{} ({}|{})", name, self.id, self.ip)
    }
}

/// The set of currently connected players, keyed by slot id. Owns every
/// player's trackers outright; nothing else holds references into it.
pub struct Roster {
    players: HashMap<u32, Player>,
    tracker_config: TrackerConfig,
    chat_config: ChatConfig,
}

impl Roster {
    pub fn new(tracker_config: TrackerConfig, chat_config: ChatConfig) -> Self {
        Self {
            players: HashMap::new(),
            tracker_config,
            chat_config,
        }
    }

    /// Registers a connecting player. A reused slot gets a brand-new
    /// player: whoever sat there before is gone, history and all.
    pub fn connect(&mut self, id: u32, ip: &str) -> &mut Player {
        let player = Player::new(id, ip.to_string(), &self.tracker_config, &self.chat_config);
        match self.players.entry(id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(player);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(player),
        }
    }

    pub fn disconnect(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// `name (id|ip)` for a slot, or a bare `#id` if the player already left.
    pub fn label_of(&self, id: u32) -> String {
        self.players
            .get(&id)
            .map(Player::label)
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Round or map boundary: suspicion windows reset but half-formed
    /// double kills and victim histories survive.
    pub fn reset_round(&mut self) {
        for player in self.players.values_mut() {
            player.kills.reset(true);
            player.chat.reset();
        }
    }
}
