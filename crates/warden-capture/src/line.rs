use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use warden_core::KillEvent;

/// One parsed server log line. Only the line types the watchdog reacts to
/// get a variant; everything else is skipped upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A new round or map started; trackers should be reset.
    InitGame { time: u64 },
    ClientConnect { time: u64, id: u32, ip: String },
    ClientUserinfoChanged { time: u64, id: u32, name: String },
    ClientDisconnect { time: u64, id: u32 },
    Kill { kill: KillEvent },
    Say {
        time: u64,
        id: u32,
        team: bool,
        /// Color-stripped, lowercased, trimmed.
        message: String,
    },
}

fn ip_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+){3}").expect("valid ip pattern"))
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"n\\([^\\]*)").expect("valid name pattern"))
}

/// Removes Quake3 color codes (`^0` through `^9`).
pub fn strip_colors(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '^' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Parses one raw log line. Returns `None` for line types the watchdog
/// doesn't track; logs a warning and returns `None` for lines that match
/// a tracked type but are malformed. Never panics on any input.
pub fn parse_line(raw: &str) -> Option<LogEvent> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    if raw.len() < 7 {
        return None;
    }
    // The server prefixes every line with a seven-column `mmm:ss ` stamp.
    let (stamp, data) = raw.split_at(7);
    let (minutes, seconds) = stamp.trim().split_once(':')?;
    let time = minutes.trim().parse::<u64>().ok()? * 60 + seconds.trim().parse::<u64>().ok()?;

    let event = if let Some(rest) = data.strip_prefix("Kill:") {
        parse_kill(time, rest)
    } else if data.starts_with("InitGame:") {
        Some(LogEvent::InitGame { time })
    } else if let Some(rest) = data.strip_prefix("ClientConnect:") {
        parse_connect(time, rest)
    } else if let Some(rest) = data.strip_prefix("ClientUserinfoChanged:") {
        parse_userinfo(time, rest)
    } else if let Some(rest) = data.strip_prefix("ClientDisconnect:") {
        rest.trim().parse().ok().map(|id| LogEvent::ClientDisconnect { time, id })
    } else if looks_like_say(data) {
        parse_say(time, data)
    } else {
        return None;
    };
    if event.is_none() {
        warn!(line = raw, "malformed log line, skipping");
    }
    event
}

fn parse_kill(time: u64, rest: &str) -> Option<LogEvent> {
    let mut fields = rest.split_whitespace();
    let killer_id = fields.next()?.parse().ok()?;
    let victim_id = fields.next()?.parse().ok()?;
    Some(LogEvent::Kill {
        kill: KillEvent::new(time, killer_id, victim_id),
    })
}

fn parse_connect(time: u64, rest: &str) -> Option<LogEvent> {
    let id = rest.split_whitespace().next()?.parse().ok()?;
    let ip = ip_pattern().find(rest)?.as_str().to_string();
    Some(LogEvent::ClientConnect { time, id, ip })
}

fn parse_userinfo(time: u64, rest: &str) -> Option<LogEvent> {
    let id = rest.split_whitespace().next()?.parse().ok()?;
    // The name rides in the `n\<name>\` userinfo field; a missing field
    // means an empty name, not a malformed line.
    let name = name_pattern()
        .captures(rest)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Some(LogEvent::ClientUserinfoChanged { time, id, name })
}

fn looks_like_say(data: &str) -> bool {
    data.splitn(2, ':')
        .nth(1)
        .map(|rest| {
            let rest = rest.trim_start();
            rest.starts_with("say:") || rest.starts_with("teamsay:")
        })
        .unwrap_or(false)
}

fn parse_say(time: u64, data: &str) -> Option<LogEvent> {
    let mut parts = data.splitn(3, ':');
    let id = parts.next()?.trim().parse().ok()?;
    let team = parts.next()?.trim() == "teamsay";
    let rest = parts.next()?;
    let start = rest.find('"')?;
    let end = rest.rfind('"')?;
    if end <= start {
        return None;
    }
    let message = strip_colors(&rest[start + 1..end]).trim().to_lowercase();
    Some(LogEvent::Say {
        time,
        id,
        team,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kill_lines() {
        let event = parse_line("  0:28 Kill: 2 3 11: Padawan killed Obi by MOD_SABER");
        assert_eq!(
            event,
            Some(LogEvent::Kill {
                kill: KillEvent::new(28, 2, 3)
            })
        );
    }

    #[test]
    fn parses_multi_minute_stamps() {
        let event = parse_line("103:22 ClientDisconnect: 4");
        assert_eq!(event, Some(LogEvent::ClientDisconnect { time: 6202, id: 4 }));
    }

    #[test]
    fn parses_connect_with_ip() {
        let event = parse_line("  0:03 ClientConnect: 0 - 192.168.1.17:29070");
        assert_eq!(
            event,
            Some(LogEvent::ClientConnect {
                time: 3,
                id: 0,
                ip: "192.168.1.17".to_string()
            })
        );
    }

    #[test]
    fn parses_userinfo_name() {
        let event =
            parse_line("  0:05 ClientUserinfoChanged: 0 n\\^1Darth Bob\\t\\0\\model\\kyle");
        assert_eq!(
            event,
            Some(LogEvent::ClientUserinfoChanged {
                time: 5,
                id: 0,
                name: "^1Darth Bob".to_string()
            })
        );
    }

    #[test]
    fn parses_say_lines_normalized() {
        let event = parse_line("  0:42  3: say: ^1Bob: \"^2Hello THERE \"");
        assert_eq!(
            event,
            Some(LogEvent::Say {
                time: 42,
                id: 3,
                team: false,
                message: "hello there".to_string()
            })
        );
    }

    #[test]
    fn parses_teamsay_lines() {
        let event = parse_line("  1:02  7: teamsay: Ann: \"on my way\"");
        assert_eq!(
            event,
            Some(LogEvent::Say {
                time: 62,
                id: 7,
                team: true,
                message: "on my way".to_string()
            })
        );
    }

    #[test]
    fn skips_untracked_and_garbage_lines() {
        assert_eq!(parse_line("  0:00 ShutdownGame:"), None);
        assert_eq!(parse_line("garbage"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("  0:28 Kill: x y 11: broken"), None);
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_colors("^1Darth ^7Bob^"), "Darth Bob^");
    }
}
