use crate::rcon::RconClient;
use crate::roster::Roster;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use warden_core::{AlertEvent, AlertKind, AlertSeverity, SuspicionStatus};
use warden_notify::Notifier;

/// What the judge is allowed to do, and with which knobs.
#[derive(Debug, Clone)]
pub struct JudgePolicy {
    /// When false, verdicts are logged and alerted but no rcon command
    /// that punishes a player is sent. Simulations run with this off.
    pub enforce: bool,
    pub spam_mute_minutes: u32,
    /// Chat substrings that page an admin when they appear in a message.
    pub watched_words: Vec<String>,
}

impl Default for JudgePolicy {
    fn default() -> Self {
        Self {
            enforce: true,
            spam_mute_minutes: 10,
            watched_words: ["lame", "lamin", "ban", "admin", "glitch"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Turns tracker state transitions into side effects: chat messages to
/// the server, push alerts to admins, kicks and mutes through rcon.
///
/// The trackers themselves never do I/O; this is the only place where a
/// classification leaves the process. All outbound messages are built
/// from snapshots taken before the first await, so nothing here races
/// the next log line.
pub struct Judge {
    rcon: Option<RconClient>,
    notifier: Arc<Notifier>,
    policy: JudgePolicy,
}

impl Judge {
    pub fn new(rcon: Option<RconClient>, notifier: Arc<Notifier>, policy: JudgePolicy) -> Self {
        Self {
            rcon,
            notifier,
            policy,
        }
    }

    /// Reacts to a kill tracker transition for `killer_id`. Call after
    /// every `add_kill`, passing the status from before the call.
    pub async fn review_kills(
        &self,
        roster: &mut Roster,
        killer_id: u32,
        previous: SuspicionStatus,
    ) {
        let Some(killer) = roster.get(killer_id) else {
            return;
        };
        let status = killer.kills.status();
        if status != SuspicionStatus::Baited && status == previous {
            return;
        }
        let killer_name = killer.name.clone();
        let killer_label = killer.label();

        match status {
            SuspicionStatus::None => {}
            SuspicionStatus::Suspected => {
                info!(player = %killer_label, "suspected of laming");
                let latest = killer
                    .kills
                    .latest_kills()
                    .iter()
                    .rev()
                    .map(|k| roster.label_of(k.victim_id))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.chat_say(&format!(
                    "^7{killer_name} ^3is now suspected of laming. To prevent baiting, victims are also being watched. An admin has been notified."
                ))
                .await;
                self.alert(
                    AlertSeverity::Medium,
                    AlertKind::LamerSuspected { player_id: killer_id },
                    format!("Laming suspect: {killer_label}"),
                    format!("{killer_label} has been warned.\nLatest kills: {latest}"),
                )
                .await;
            }
            SuspicionStatus::Kickable => {
                info!(player = %killer_label, "kickable for possible laming");
                self.chat_say(&format!(
                    "^7{killer_name} ^3has been kicked for possible laming. An admin has been notified."
                ))
                .await;
                self.kick(killer_id).await;
                self.alert(
                    AlertSeverity::High,
                    AlertKind::LamerKicked { player_id: killer_id },
                    format!("Possible lamer kicked: {killer_label}"),
                    format!("{killer_label} has been kicked for possible laming."),
                )
                .await;
            }
            SuspicionStatus::Baited => {
                info!(player = %killer_label, "forgiven due to possible baiting");
                let baiters: Vec<(u32, String)> = killer
                    .kills
                    .baiter_ids()
                    .iter()
                    .map(|&id| (id, roster.label_of(id)))
                    .collect();
                self.chat_say(&format!(
                    "^7{killer_name} ^3has been forgiven due to possible baiting. An admin has been notified."
                ))
                .await;
                self.alert(
                    AlertSeverity::High,
                    AlertKind::PlayerForgiven { player_id: killer_id },
                    format!("Forgiven: {killer_label}"),
                    format!("{killer_label} has been forgiven due to possible baiting."),
                )
                .await;
                for (baiter_id, baiter_label) in baiters {
                    info!(player = %baiter_label, "possible baiter");
                    self.alert(
                        AlertSeverity::Medium,
                        AlertKind::PossibleBaiter { player_id: baiter_id },
                        format!("Possible baiter: {baiter_label}"),
                        format!("{baiter_label} is possibly baiting {killer_label}."),
                    )
                    .await;
                }
                if let Some(killer) = roster.get_mut(killer_id) {
                    killer.kills.reset(true);
                }
            }
        }
    }

    /// Mutes a player whose chat tracker has tipped into spam.
    pub async fn review_chat(&self, roster: &mut Roster, player_id: u32) {
        let Some(player) = roster.get(player_id) else {
            return;
        };
        if !player.chat.is_spamming() {
            return;
        }
        let name = player.name.clone();
        let label = player.label();
        let last_message = player.chat.last_message().to_string();
        let minutes = self.policy.spam_mute_minutes;

        info!(player = %label, "muting spammer");
        self.chat_say(&format!(
            "^7{name} ^3has been muted for {minutes} minutes for spamming."
        ))
        .await;
        if self.policy.enforce {
            if let Some(rcon) = &self.rcon {
                if let Err(e) = rcon.mute(player_id, minutes).await {
                    warn!(player = %label, error = %e, "mute command failed");
                }
            }
        }
        self.alert(
            AlertSeverity::Medium,
            AlertKind::SpammerMuted { player_id, minutes },
            format!("Spammer muted: {label}"),
            format!("{label} has been muted for spamming.\nLast message: {last_message}"),
        )
        .await;
        if let Some(player) = roster.get_mut(player_id) {
            player.chat.reset();
        }
    }

    /// Checks a freshly changed name for admin impersonation and for
    /// lookalike copies of another player's name.
    pub async fn review_name(&self, roster: &mut Roster, player_id: u32) {
        let Some(player) = roster.get(player_id) else {
            return;
        };
        if matches!(player.clean_name.as_str(), "admin" | "server") {
            let label = player.label();
            info!(player = %label, "admin impersonation attempt");
            self.kick(player_id).await;
            self.alert(
                AlertSeverity::High,
                AlertKind::ImpersonatorKicked { player_id },
                format!("Admin impersonation: {label}"),
                format!("{label} has been kicked for impersonating an admin."),
            )
            .await;
            return;
        }
        if let Some(impostor_id) = find_impostor(roster, player_id) {
            let name = roster.label_of(impostor_id);
            let display = roster
                .get(impostor_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            info!(player = %name, "player impersonation attempt");
            self.chat_say(&format!(
                "^7{display} ^3has been kicked for trying to impersonate a player. An admin has been notified."
            ))
            .await;
            self.kick(impostor_id).await;
            self.alert(
                AlertSeverity::High,
                AlertKind::ImpersonatorKicked {
                    player_id: impostor_id,
                },
                format!("Impersonator kicked: {name}"),
                format!("{name} has been kicked for trying to impersonate a player."),
            )
            .await;
        }
    }

    /// Pages an admin when a watched word shows up in chat.
    pub async fn review_message(&self, roster: &Roster, player_id: u32, message: &str) {
        let Some(word) = self
            .policy
            .watched_words
            .iter()
            .find(|w| message.contains(w.as_str()))
        else {
            return;
        };
        let Some(player) = roster.get(player_id) else {
            return;
        };
        let label = player.label();
        let mut detail = format!("{label}: {message}");
        if let Some(killer_id) = player.last_killer {
            detail.push_str(&format!("\nLast killer: {}", roster.label_of(killer_id)));
        }
        self.alert(
            AlertSeverity::Low,
            AlertKind::WatchedWord {
                player_id,
                word: word.clone(),
            },
            format!("Watched word from {label}"),
            detail,
        )
        .await;
    }

    async fn chat_say(&self, message: &str) {
        if let Some(rcon) = &self.rcon {
            if let Err(e) = rcon.svsay(message).await {
                warn!(error = %e, "server chat message failed");
            }
        }
    }

    async fn kick(&self, player_id: u32) {
        if !self.policy.enforce {
            info!(player = player_id, "enforcement disabled, skipping kick");
            return;
        }
        if let Some(rcon) = &self.rcon {
            if let Err(e) = rcon.clientkick(player_id).await {
                warn!(player = player_id, error = %e, "kick command failed");
            }
        }
    }

    async fn alert(&self, severity: AlertSeverity, kind: AlertKind, title: String, detail: String) {
        let event = AlertEvent {
            id: Uuid::new_v4().to_string(),
            severity,
            kind,
            title,
            detail,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        };
        if let Err(e) = self.notifier.send(&event).await {
            warn!(alert_id = %event.id, error = %e, "alert delivery failed");
        }
    }
}

/// Lookalike folding: characters that render nearly identically in the
/// in-game font collapse to one representative.
fn fold_lookalikes(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'i' | '|' | 'l' => '1',
            'o' => '0',
            other => other,
        })
        .collect()
}

/// If `player_id`'s clean name folds to the same string as another
/// player's, returns the one who changed their name later.
fn find_impostor(roster: &Roster, player_id: u32) -> Option<u32> {
    let player = roster.get(player_id)?;
    if player.clean_name.is_empty() {
        return None;
    }
    let folded = fold_lookalikes(&player.clean_name);
    for other in roster.iter() {
        if other.id == player.id || other.clean_name.len() != player.clean_name.len() {
            continue;
        }
        if fold_lookalikes(&other.clean_name) == folded {
            let impostor = if player.name_change_time < other.name_change_time {
                other
            } else {
                player
            };
            return Some(impostor.id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::KillEvent;
    use warden_detect::{ChatConfig, TrackerConfig};

    fn roster() -> Roster {
        Roster::new(TrackerConfig::default(), ChatConfig::default())
    }

    fn judge() -> Judge {
        let policy = JudgePolicy {
            enforce: false,
            ..JudgePolicy::default()
        };
        Judge::new(None, Arc::new(Notifier::noop()), policy)
    }

    #[test]
    fn folds_lookalike_characters() {
        assert_eq!(fold_lookalikes("v|olin"), "v1011n");
        assert_eq!(fold_lookalikes("obi"), "0b1");
        assert_eq!(fold_lookalikes("darth"), "darth");
    }

    #[test]
    fn later_rename_is_the_impostor() {
        let mut roster = roster();
        roster.connect(0, "10.0.0.1").change_name("Obi", 5);
        roster.connect(1, "10.0.0.2").change_name("Ob|", 90);
        assert_eq!(find_impostor(&roster, 0), Some(1));
        assert_eq!(find_impostor(&roster, 1), Some(1));
    }

    #[test]
    fn different_names_are_not_impostors() {
        let mut roster = roster();
        roster.connect(0, "10.0.0.1").change_name("Obi", 5);
        roster.connect(1, "10.0.0.2").change_name("Ann", 9);
        assert_eq!(find_impostor(&roster, 1), None);
    }

    #[tokio::test]
    async fn baited_killer_is_forgiven_and_reset() {
        let mut roster = roster();
        roster.connect(3, "10.0.0.3").change_name("Hunter", 1);
        roster.connect(7, "10.0.0.7").change_name("Bait", 1);
        for _ in 0..8 {
            roster.connect(10 + roster.len() as u32, "10.0.0.9");
        }
        let player_count = roster.len() as u32;

        let kills = [
            (10, 7),
            (12, 9),
            (50, 7),
            (52, 9),
            (150, 7),
            (152, 2),
        ];
        let judge = judge();
        for (t, victim) in kills {
            let previous = roster.get(3).map(|p| p.kills.status()).unwrap();
            roster
                .get_mut(3)
                .unwrap()
                .kills
                .add_kill(KillEvent::new(t, 3, victim), player_count);
            judge.review_kills(&mut roster, 3, previous).await;
        }

        // The baited verdict was dispatched and the tracker forgiven.
        assert_eq!(
            roster.get(3).unwrap().kills.status(),
            SuspicionStatus::None
        );
        assert!(roster.get(3).unwrap().kills.baiter_ids().is_empty());
    }

    #[tokio::test]
    async fn spammer_chat_history_is_reset_after_mute() {
        let mut roster = roster();
        roster.connect(4, "10.0.0.4").change_name("Chatty", 1);
        for t in 0..6 {
            roster.get_mut(4).unwrap().chat.add_message("buy my stuff", t);
        }
        let judge = judge();
        judge.review_chat(&mut roster, 4).await;
        assert!(!roster.get(4).unwrap().chat.is_spamming());
    }
}
