use serde::Deserialize;
use warden_detect::{ChatConfig, TrackerConfig};
use warden_guard::JudgePolicy;

#[derive(Deserialize)]
pub struct WardenConfig {
    pub server: ServerConfig,
    pub tracker: Option<TrackerSection>,
    pub chat: Option<ChatSection>,
    pub judge: Option<JudgeSection>,
    pub notify: Option<NotifyConfig>,
}

#[derive(Deserialize)]
pub struct ServerConfig {
    /// `host:port` of the game server's UDP console.
    pub address: String,
    pub rcon_password: String,
    pub log_path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Deserialize)]
pub struct TrackerSection {
    #[serde(default = "default_double_kill_delay")]
    pub double_kill_delay: u64,
    #[serde(default = "default_double_kill_decay_delay")]
    pub double_kill_decay_delay: u64,
    #[serde(default = "default_latest_kills_time_frame")]
    pub latest_kills_time_frame: u64,
    #[serde(default = "default_latest_kills_count_tolerance")]
    pub latest_kills_count_tolerance: usize,
    #[serde(default = "default_max_victim_slot")]
    pub max_victim_slot: u32,
}

#[derive(Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_repeat_limit")]
    pub repeat_limit: usize,
    #[serde(default = "default_repeat_decay")]
    pub repeat_decay: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    #[serde(default = "default_rate_decay")]
    pub rate_decay: u64,
}

#[derive(Deserialize)]
pub struct JudgeSection {
    #[serde(default = "default_enforce")]
    pub enforce: bool,
    #[serde(default = "default_spam_mute_minutes")]
    pub spam_mute_minutes: u32,
    #[serde(default = "default_watched_words")]
    pub watched_words: Vec<String>,
    #[serde(default = "default_watch_kills")]
    pub watch_kills: bool,
    #[serde(default = "default_watch_chat")]
    pub watch_chat: bool,
}

#[derive(Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_urls: Vec<String>,
    pub ntfy_topic: Option<String>,
    pub ntfy_server: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    250
}
fn default_double_kill_delay() -> u64 {
    3
}
fn default_double_kill_decay_delay() -> u64 {
    300
}
fn default_latest_kills_time_frame() -> u64 {
    20
}
fn default_latest_kills_count_tolerance() -> usize {
    4
}
fn default_max_victim_slot() -> u32 {
    40
}
fn default_repeat_limit() -> usize {
    6
}
fn default_repeat_decay() -> u64 {
    60
}
fn default_rate_limit() -> usize {
    15
}
fn default_rate_decay() -> u64 {
    60
}
fn default_enforce() -> bool {
    true
}
fn default_spam_mute_minutes() -> u32 {
    10
}
fn default_watched_words() -> Vec<String> {
    ["lame", "lamin", "ban", "admin", "glitch"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_watch_kills() -> bool {
    true
}
fn default_watch_chat() -> bool {
    true
}

impl WardenConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        let defaults = TrackerConfig::default();
        match &self.tracker {
            Some(t) => TrackerConfig {
                double_kill_delay: t.double_kill_delay,
                double_kill_decay_delay: t.double_kill_decay_delay,
                // Pinned: baiting detection keys off exactly two pairs.
                double_kill_count_tolerance: defaults.double_kill_count_tolerance,
                latest_kills_time_frame: t.latest_kills_time_frame,
                latest_kills_count_tolerance: t.latest_kills_count_tolerance,
                max_victim_slot: t.max_victim_slot,
            },
            None => defaults,
        }
    }

    pub fn chat_config(&self) -> ChatConfig {
        match &self.chat {
            Some(c) => ChatConfig {
                repeat_limit: c.repeat_limit,
                repeat_decay: c.repeat_decay,
                rate_limit: c.rate_limit,
                rate_decay: c.rate_decay,
            },
            None => ChatConfig::default(),
        }
    }

    pub fn judge_policy(&self) -> JudgePolicy {
        match &self.judge {
            Some(j) => JudgePolicy {
                enforce: j.enforce,
                spam_mute_minutes: j.spam_mute_minutes,
                watched_words: j.watched_words.clone(),
            },
            None => JudgePolicy::default(),
        }
    }

    pub fn watch_kills(&self) -> bool {
        self.judge.as_ref().map(|j| j.watch_kills).unwrap_or(true)
    }

    pub fn watch_chat(&self) -> bool {
        self.judge.as_ref().map(|j| j.watch_chat).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: WardenConfig = toml::from_str(
            r#"
            [server]
            address = "127.0.0.1:29070"
            rcon_password = "hunter2"
            log_path = "/srv/game/log.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.poll_interval_ms, 250);
        assert_eq!(config.tracker_config().double_kill_delay, 3);
        assert_eq!(config.chat_config().repeat_limit, 6);
        assert!(config.judge_policy().enforce);
        assert!(config.watch_kills());
    }

    #[test]
    fn overrides_are_honored() {
        let config: WardenConfig = toml::from_str(
            r#"
            [server]
            address = "127.0.0.1:29070"
            rcon_password = "hunter2"
            log_path = "/srv/game/log.txt"

            [tracker]
            double_kill_delay = 5

            [judge]
            enforce = false
            watched_words = ["cheat"]
            "#,
        )
        .unwrap();
        assert_eq!(config.tracker_config().double_kill_delay, 5);
        assert_eq!(config.tracker_config().double_kill_count_tolerance, 2);
        assert!(!config.judge_policy().enforce);
        assert_eq!(config.judge_policy().watched_words, vec!["cheat"]);
    }
}
