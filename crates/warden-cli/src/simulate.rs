use crate::config::WardenConfig;
use crate::daemon::{process_event, WatchFlags};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use warden_capture::parse_line;
use warden_core::SuspicionStatus;
use warden_detect::{ChatConfig, TrackerConfig};
use warden_guard::{Judge, JudgePolicy, Roster};
use warden_notify::Notifier;

/// Replays server logs through the full pipeline with enforcement off.
/// Used to vet heuristic changes against archived incidents before they
/// go anywhere near a live server.
pub async fn run_simulation(
    files: Vec<String>,
    config: Option<WardenConfig>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tracker_config, chat_config, mut policy) = match &config {
        Some(c) => (c.tracker_config(), c.chat_config(), c.judge_policy()),
        None => (
            TrackerConfig::default(),
            ChatConfig::default(),
            JudgePolicy::default(),
        ),
    };
    policy.enforce = false;

    for file in files {
        println!("---------------------------------");
        println!("simulating: {file}");
        println!("---------------------------------");
        if let Err(e) = simulate_file(
            Path::new(&file),
            tracker_config.clone(),
            chat_config.clone(),
            policy.clone(),
        )
        .await
        {
            warn!(file = %file, error = %e, "simulation failed");
        }
    }
    Ok(())
}

async fn simulate_file(
    path: &Path,
    tracker_config: TrackerConfig,
    chat_config: ChatConfig,
    policy: JudgePolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = tokio::fs::read_to_string(path).await?;
    let judge = Judge::new(None, Arc::new(Notifier::noop()), policy);
    let mut roster = Roster::new(tracker_config, chat_config);
    let flags = WatchFlags {
        kills: true,
        chat: true,
    };

    let mut lines = 0u64;
    let mut events = 0u64;
    for line in content.lines() {
        lines += 1;
        if let Some(event) = parse_line(line) {
            events += 1;
            process_event(&judge, &mut roster, &flags, event).await;
        }
    }

    println!("lines: {lines}, tracked events: {events}");
    println!("players still connected: {}", roster.len());
    for player in roster.iter() {
        if player.kills.status() != SuspicionStatus::None {
            println!(
                "  {} -> {:?} (baiters: {:?})",
                player.label(),
                player.kills.status(),
                player.kills.baiter_ids()
            );
        }
    }
    Ok(())
}
