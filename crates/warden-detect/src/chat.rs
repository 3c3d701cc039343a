use std::collections::HashMap;

/// Short acknowledgements everyone repeats between rounds. They get a
/// higher repeat limit before counting as spam.
const TOLERANT_WORDS: &[&str] = &["lol", "gf", "gf!", "gg", "gz", "good fight"];

const TOLERANT_LIMIT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Identical messages within the decay window before it counts as spam.
    pub repeat_limit: usize,
    /// Seconds an identical message stays on record.
    pub repeat_decay: u64,
    /// Messages of any kind within the decay window before it counts as spam.
    pub rate_limit: usize,
    pub rate_decay: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            repeat_limit: 6,
            repeat_decay: 60,
            rate_limit: 15,
            rate_decay: 60,
        }
    }
}

/// Per-player chat history used for spam detection. Messages are expected
/// pre-normalized (color codes stripped, lowercased) by the capture layer.
#[derive(Debug, Clone, Default)]
pub struct ChatTracker {
    config: ChatConfig,
    is_spamming: bool,
    last_message: String,
    repeats: HashMap<String, Vec<u64>>,
    recent: Vec<u64>,
}

impl ChatTracker {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            is_spamming: false,
            last_message: String::new(),
            repeats: HashMap::new(),
            recent: Vec::new(),
        }
    }

    pub fn is_spamming(&self) -> bool {
        self.is_spamming
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Logs a message and returns whether the player is now spamming.
    pub fn add_message(&mut self, message: &str, time: u64) -> bool {
        self.last_message = message.to_string();
        let repeating = self.update_repeats(message, time);
        let flooding = self.update_recent(time);
        self.is_spamming = repeating || flooding;
        self.is_spamming
    }

    /// Called after a mute so old history doesn't re-trigger one.
    pub fn reset(&mut self) {
        self.is_spamming = false;
        self.repeats.clear();
        self.recent.clear();
    }

    fn update_repeats(&mut self, message: &str, time: u64) -> bool {
        let decay = self.config.repeat_decay;
        // Drop messages whose newest occurrence has decayed or sits in the
        // future (round restarts move the clock backwards).
        self.repeats.retain(|_, stamps| {
            stamps
                .last()
                .is_some_and(|&last| time >= last && time - last <= decay)
        });
        let stamps = self.repeats.entry(message.to_string()).or_default();
        stamps.retain(|&stamp| time >= stamp && time - stamp <= decay);
        stamps.push(time);
        let mut limit = self.config.repeat_limit;
        if TOLERANT_WORDS.contains(&message) {
            limit = (limit as f64 * TOLERANT_LIMIT_MULTIPLIER) as usize;
        }
        stamps.len() >= limit
    }

    fn update_recent(&mut self, time: u64) -> bool {
        let decay = self.config.rate_decay;
        self.recent
            .retain(|&stamp| time >= stamp && time - stamp <= decay);
        self.recent.push(time);
        self.recent.len() >= self.config.rate_limit
    }
}
