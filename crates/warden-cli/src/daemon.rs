use crate::config::WardenConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{error, info, warn};
use warden_capture::{parse_line, LogEvent, LogTail};
use warden_guard::{Judge, RconClient, Roster};
use warden_notify::Notifier;

/// Per-event policy switches the dispatch loop consults.
pub struct WatchFlags {
    pub kills: bool,
    pub chat: bool,
}

pub async fn run_daemon(config: WardenConfig) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = Arc::new(match &config.notify {
        Some(nc) => Notifier::new(
            nc.webhook_urls.clone(),
            nc.ntfy_topic.clone(),
            nc.ntfy_server.clone(),
        ),
        None => Notifier::noop(),
    });
    if notifier.is_configured() {
        info!("notifications configured");
    }

    let rcon = RconClient::new(
        config.server.address.clone(),
        config.server.rcon_password.clone(),
    );
    match rcon.status().await {
        Ok(_) => info!(address = %config.server.address, "rcon connection verified"),
        Err(e) => warn!(address = %config.server.address, error = %e, "rcon check failed, continuing"),
    }

    let judge = Judge::new(Some(rcon), notifier, config.judge_policy());
    let mut roster = Roster::new(config.tracker_config(), config.chat_config());
    let flags = WatchFlags {
        kills: config.watch_kills(),
        chat: config.watch_chat(),
    };

    let (tx, mut rx) = mpsc::channel::<String>(256);
    let tail = LogTail::new(
        config.server.log_path.clone(),
        Duration::from_millis(config.server.poll_interval_ms),
    );
    let tail_handle = tokio::spawn(async move {
        if let Err(e) = tail.run(tx).await {
            error!(error = %e, "log tail stopped");
        }
    });

    info!("warden daemon started");
    while let Some(line) = rx.recv().await {
        let Some(event) = parse_line(&line) else {
            continue;
        };
        process_event(&judge, &mut roster, &flags, event).await;
    }

    tail_handle.abort();
    Ok(())
}

/// Applies one parsed log event to the roster and lets the judge react.
/// Strictly sequential: the next line is not touched until every side
/// effect of this one has been dispatched.
pub async fn process_event(judge: &Judge, roster: &mut Roster, flags: &WatchFlags, event: LogEvent) {
    match event {
        LogEvent::InitGame { .. } => {
            info!(players = roster.len(), "round start, resetting trackers");
            roster.reset_round();
        }
        LogEvent::ClientConnect { id, ip, .. } => {
            info!(player = id, ip = %ip, "player connected");
            roster.connect(id, &ip);
        }
        LogEvent::ClientUserinfoChanged { time, id, name } => {
            if let Some(player) = roster.get_mut(id) {
                player.change_name(&name, time);
                judge.review_name(roster, id).await;
            }
        }
        LogEvent::ClientDisconnect { id, .. } => {
            if roster.disconnect(id).is_some() {
                info!(player = id, "player disconnected");
            }
        }
        LogEvent::Kill { kill } => {
            if !flags.kills {
                return;
            }
            let player_count = roster.len() as u32;
            let Some(killer) = roster.get_mut(kill.killer_id) else {
                return;
            };
            let previous = killer.kills.status();
            killer.kills.add_kill(kill, player_count);
            if let Some(victim) = roster.get_mut(kill.victim_id) {
                victim.last_killer = Some(kill.killer_id);
            }
            judge.review_kills(roster, kill.killer_id, previous).await;
        }
        LogEvent::Say {
            time, id, message, ..
        } => {
            judge.review_message(roster, id, &message).await;
            if !flags.chat {
                return;
            }
            if let Some(player) = roster.get_mut(id) {
                if player.chat.add_message(&message, time) {
                    judge.review_chat(roster, id).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::SuspicionStatus;
    use warden_guard::JudgePolicy;

    fn offline_judge() -> Judge {
        let policy = JudgePolicy {
            enforce: false,
            ..JudgePolicy::default()
        };
        Judge::new(None, Arc::new(Notifier::noop()), policy)
    }

    fn flags() -> WatchFlags {
        WatchFlags {
            kills: true,
            chat: true,
        }
    }

    #[tokio::test]
    async fn kill_lines_drive_the_tracker() {
        let judge = offline_judge();
        let mut roster = Roster::new(Default::default(), Default::default());
        let flags = flags();

        let lines = [
            "  0:01 ClientConnect: 2 - 10.0.0.2:29070",
            "  0:02 ClientConnect: 3 - 10.0.0.3:29070",
            "  0:10 Kill: 2 3 11: a killed b by MOD_SABER",
            "  0:12 Kill: 2 3 11: a killed b by MOD_SABER",
        ];
        for line in lines {
            let event = parse_line(line).unwrap();
            process_event(&judge, &mut roster, &flags, event).await;
        }

        assert_eq!(
            roster.get(2).unwrap().kills.status(),
            SuspicionStatus::Suspected
        );
        assert_eq!(roster.get(3).unwrap().last_killer, Some(2));
    }

    #[tokio::test]
    async fn round_start_resets_suspicion() {
        let judge = offline_judge();
        let mut roster = Roster::new(Default::default(), Default::default());
        let flags = flags();

        for line in [
            "  0:01 ClientConnect: 2 - 10.0.0.2:29070",
            "  0:10 Kill: 2 3 11: a killed b",
            "  0:12 Kill: 2 4 11: a killed c",
            "  0:20 InitGame:",
        ] {
            if let Some(event) = parse_line(line) {
                process_event(&judge, &mut roster, &flags, event).await;
            }
        }
        assert_eq!(roster.get(2).unwrap().kills.status(), SuspicionStatus::None);
    }

    #[tokio::test]
    async fn disconnect_drops_the_player() {
        let judge = offline_judge();
        let mut roster = Roster::new(Default::default(), Default::default());
        let flags = flags();

        for line in [
            "  0:01 ClientConnect: 2 - 10.0.0.2:29070",
            "  0:05 ClientDisconnect: 2",
        ] {
            let event = parse_line(line).unwrap();
            process_event(&judge, &mut roster, &flags, event).await;
        }
        assert!(roster.is_empty());
    }
}
