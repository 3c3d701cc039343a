use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration};
use warden_core::{WardenError, WardenResult};

/// Every out-of-band packet starts with four 0xFF bytes.
const PACKET_PREFIX: &[u8] = &[0xff, 0xff, 0xff, 0xff];

const REPLY_TIMEOUT: Duration = Duration::from_secs(1);
const SEND_ATTEMPTS: u32 = 3;

/// `svsay` truncates beyond this; longer messages fall back to `say`.
const SVSAY_MAX_LEN: usize = 141;

/// Remote-console client for a Quake3-family server. One datagram per
/// command, fire-and-confirm with a short retry loop; the server answers
/// with a `print` packet.
pub struct RconClient {
    address: String,
    password: String,
}

impl RconClient {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
        }
    }

    pub async fn command(&self, command: &str) -> WardenResult<String> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&self.address).await?;

        let payload = format!("rcon {} {}", self.password, command);
        let mut packet = Vec::with_capacity(PACKET_PREFIX.len() + payload.len());
        packet.extend_from_slice(PACKET_PREFIX);
        packet.extend_from_slice(payload.as_bytes());

        let mut reply = vec![0u8; 2048];
        for _ in 0..SEND_ATTEMPTS {
            socket.send(&packet).await?;
            match timeout(REPLY_TIMEOUT, socket.recv(&mut reply)).await {
                Ok(Ok(received)) => return Ok(decode_reply(&reply[..received])),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => continue,
            }
        }
        Err(WardenError::Rcon(format!(
            "no reply from {} after {} attempts",
            self.address, SEND_ATTEMPTS
        )))
    }

    pub async fn status(&self) -> WardenResult<String> {
        self.command("status").await
    }

    pub async fn say(&self, message: &str) -> WardenResult<String> {
        self.command(&format!("say {message}")).await
    }

    pub async fn svsay(&self, message: &str) -> WardenResult<String> {
        if message.len() > SVSAY_MAX_LEN {
            self.say(message).await
        } else {
            self.command(&format!("svsay {message}")).await
        }
    }

    pub async fn clientkick(&self, player_id: u32) -> WardenResult<String> {
        self.command(&format!("clientkick {player_id}")).await
    }

    pub async fn mute(&self, player_id: u32, minutes: u32) -> WardenResult<String> {
        self.command(&format!("mute {player_id} {minutes}")).await
    }
}

fn decode_reply(raw: &[u8]) -> String {
    let body = raw.strip_prefix(PACKET_PREFIX).unwrap_or(raw);
    let text = String::from_utf8_lossy(body);
    text.strip_prefix("print\n").unwrap_or(&text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_print_replies() {
        let mut raw = vec![0xff, 0xff, 0xff, 0xff];
        raw.extend_from_slice(b"print\nmap: mb2_dotf\n");
        assert_eq!(decode_reply(&raw), "map: mb2_dotf\n");
    }

    #[test]
    fn decodes_replies_without_print_header() {
        let mut raw = vec![0xff, 0xff, 0xff, 0xff];
        raw.extend_from_slice(b"disconnect");
        assert_eq!(decode_reply(&raw), "disconnect");
    }
}
