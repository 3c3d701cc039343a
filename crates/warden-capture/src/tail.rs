use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::info;
use warden_core::WardenResult;

/// Follows the server log file and forwards complete lines over a channel.
///
/// The server appends continuously and rotates the file by truncation;
/// the tailer detects a shrinking file and rewinds to the start. Partial
/// lines (a write caught mid-flush) are left in place until the newline
/// arrives so consumers only ever see whole lines.
pub struct LogTail {
    path: PathBuf,
    poll: Duration,
    from_start: bool,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            path: path.into(),
            poll,
            from_start: false,
        }
    }

    /// Replay the whole existing file before following new writes.
    pub fn from_start(mut self) -> Self {
        self.from_start = true;
        self
    }

    pub async fn run(self, tx: mpsc::Sender<String>) -> WardenResult<()> {
        let file = File::open(&self.path).await?;
        let mut reader = BufReader::new(file);
        if !self.from_start {
            reader.seek(SeekFrom::End(0)).await?;
        }
        info!(path = %self.path.display(), "tailing log");

        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line).await?;
            if read == 0 {
                let position = reader.stream_position().await?;
                let length = tokio::fs::metadata(&self.path).await?.len();
                if length < position {
                    info!(path = %self.path.display(), "log truncated, rewinding");
                    let file = File::open(&self.path).await?;
                    reader = BufReader::new(file);
                }
                sleep(self.poll).await;
                continue;
            }
            if !line.ends_with('\n') {
                // Mid-flush write; rewind and wait for the rest of the line.
                reader.seek(SeekFrom::Current(-(read as i64))).await?;
                sleep(self.poll).await;
                continue;
            }
            if tx.send(line.clone()).await.is_err() {
                // Receiver is gone; the daemon is shutting down.
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn replays_existing_lines_from_start() {
        let dir = std::env::temp_dir().join(format!("warden-tail-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("log.txt");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "  0:01 InitGame:").unwrap();
            writeln!(f, "  0:28 Kill: 2 3 11: a killed b").unwrap();
        }

        let (tx, mut rx) = mpsc::channel(16);
        let tail = LogTail::new(&path, Duration::from_millis(10)).from_start();
        let handle = tokio::spawn(tail.run(tx));

        let first = rx.recv().await.unwrap();
        assert!(first.contains("InitGame"));
        let second = rx.recv().await.unwrap();
        assert!(second.contains("Kill:"));

        drop(rx);
        handle.abort();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
