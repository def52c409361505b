//! Async transport driving the SMTP machine over TCP

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::MailError;
use crate::fsm::{Credentials, MailMessage, SmtpFsm, Step};

/// Idle limit for each leg of the exchange.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// One-shot SMTP sender; a fresh connection per message.
#[derive(Debug, Clone)]
pub struct SmtpClient {
    host: String,
    port: u16,
    hello: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl SmtpClient {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            hello: "caseflow.local".to_string(),
            credentials: None,
            timeout: IDLE_TIMEOUT,
        }
    }

    /// Hostname announced in EHLO.
    #[must_use]
    pub fn with_hello(mut self, hello: impl Into<String>) -> Self {
        self.hello = hello.into();
        self
    }

    /// Enable AUTH LOGIN.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the full exchange for one message.
    ///
    /// # Errors
    /// Rejection at any step, idle timeout, or socket failure. There is no
    /// retry; callers decide whether a failure is worth resending.
    pub async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        let stream = self
            .deadline(TcpStream::connect((self.host.as_str(), self.port)))
            .await??;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let to = message.to.clone();
        let mut fsm = SmtpFsm::new(self.hello.clone(), self.credentials.clone(), message);

        loop {
            let (code, line) = self.read_reply(&mut reader).await?;
            debug!(code, state = fsm.state().name(), "smtp reply");
            match fsm.on_reply(code, &line)? {
                Step::Send(command) => {
                    self.deadline(write_half.write_all(command.as_bytes()))
                        .await??;
                    self.deadline(write_half.write_all(b"\r\n")).await??;
                }
                Step::SendPayload(payload) => {
                    self.deadline(write_half.write_all(payload.as_bytes()))
                        .await??;
                }
                Step::Close => {
                    let _ = write_half.shutdown().await;
                    info!(to = %to, "mail sent");
                    return Ok(());
                }
            }
        }
    }

    /// Read one (possibly multi-line) reply, returning the final line's
    /// code and text.
    async fn read_reply<R>(&self, reader: &mut R) -> Result<(u16, String), MailError>
    where
        R: AsyncBufReadExt + Unpin,
    {
        loop {
            let mut line = String::new();
            let n = self.deadline(reader.read_line(&mut line)).await??;
            if n == 0 {
                return Err(MailError::UnexpectedEof);
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            let (code, is_final) = parse_reply_line(&line)?;
            if is_final {
                return Ok((code, line));
            }
        }
    }

    async fn deadline<F, T>(&self, fut: F) -> Result<T, MailError>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| MailError::Timeout {
                seconds: self.timeout.as_secs(),
            })
    }
}

/// Split `"250-..."` / `"250 ..."` into code and continuation flag.
fn parse_reply_line(line: &str) -> Result<(u16, bool), MailError> {
    let code: u16 = line
        .get(..3)
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| MailError::BadReply(line.to_string()))?;
    let is_final = !matches!(line.as_bytes().get(3), Some(b'-'));
    Ok((code, is_final))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_line_parsing() {
        assert_eq!(parse_reply_line("220 mail.acme.com ready").unwrap(), (220, true));
        assert_eq!(parse_reply_line("250-PIPELINING").unwrap(), (250, false));
        assert_eq!(parse_reply_line("250 OK").unwrap(), (250, true));
        assert_eq!(parse_reply_line("354").unwrap(), (354, true));
        assert!(parse_reply_line("hello").is_err());
        assert!(parse_reply_line("").is_err());
    }

    #[tokio::test]
    async fn multi_line_ehlo_reply_collapsed() {
        let client = SmtpClient::new("localhost", 25);
        let input = b"250-mail.acme.com\r\n250-SIZE 35882577\r\n250 AUTH LOGIN\r\n";
        let mut reader = BufReader::new(&input[..]);
        let (code, line) = client.read_reply(&mut reader).await.unwrap();
        assert_eq!(code, 250);
        assert_eq!(line, "250 AUTH LOGIN");
    }

    #[tokio::test]
    async fn eof_mid_reply_is_explicit() {
        let client = SmtpClient::new("localhost", 25);
        let input = b"250-half\r\n";
        let mut reader = BufReader::new(&input[..]);
        let err = client.read_reply(&mut reader).await.unwrap_err();
        assert!(matches!(err, MailError::UnexpectedEof));
    }
}
