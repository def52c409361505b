//! SMTP protocol state machine
//!
//! Pure: feed a final reply line via [`SmtpFsm::on_reply`], get the next
//! [`Step`] to perform. The transport owns all I/O, which keeps every
//! transition (and every failure) testable without a socket.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::MailError;

/// AUTH LOGIN credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One outbound message.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Protocol position, in fixed forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Waiting for the server banner.
    Greeting,
    /// EHLO sent.
    Ehlo,
    /// AUTH LOGIN sent.
    AuthInit,
    /// Base64 username sent.
    AuthUser,
    /// Base64 password sent.
    AuthPass,
    /// MAIL FROM sent.
    MailFrom,
    /// RCPT TO sent.
    RcptTo,
    /// DATA sent.
    Data,
    /// Message payload sent.
    Body,
    /// QUIT sent.
    Quit,
    /// 221 received; the connection may close.
    Done,
}

impl SmtpState {
    /// Reply codes accepted in this state, the whole protocol in one table.
    #[must_use]
    pub fn expected_codes(self) -> &'static [u16] {
        match self {
            Self::Greeting => &[220],
            Self::Ehlo => &[250],
            Self::AuthInit | Self::AuthUser => &[334],
            Self::AuthPass => &[235],
            Self::MailFrom => &[250],
            Self::RcptTo => &[250, 251],
            Self::Data => &[354],
            Self::Body => &[250],
            Self::Quit => &[221],
            Self::Done => &[],
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Ehlo => "ehlo",
            Self::AuthInit => "auth",
            Self::AuthUser => "auth-user",
            Self::AuthPass => "auth-pass",
            Self::MailFrom => "mail-from",
            Self::RcptTo => "rcpt-to",
            Self::Data => "data",
            Self::Body => "body",
            Self::Quit => "quit",
            Self::Done => "done",
        }
    }
}

/// What the transport must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Write this command line (CRLF appended by the transport).
    Send(String),
    /// Write the already-terminated message payload verbatim.
    SendPayload(String),
    /// 221 received; close the connection.
    Close,
}

/// The fixed linear SMTP exchange as a state machine.
#[derive(Debug)]
pub struct SmtpFsm {
    state: SmtpState,
    hello: String,
    credentials: Option<Credentials>,
    message: MailMessage,
}

impl SmtpFsm {
    #[must_use]
    pub fn new(hello: impl Into<String>, credentials: Option<Credentials>, message: MailMessage) -> Self {
        Self {
            state: SmtpState::Greeting,
            hello: hello.into(),
            credentials,
            message,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// Feed the final line of a server reply and get the next step.
    ///
    /// # Errors
    /// [`MailError::Rejected`] on any code the current state does not
    /// accept; the machine stays where it was and must not be fed again.
    pub fn on_reply(&mut self, code: u16, line: &str) -> Result<Step, MailError> {
        if !self.state.expected_codes().contains(&code) {
            return Err(MailError::Rejected {
                state: self.state.name(),
                code,
                line: line.to_string(),
            });
        }

        let step = match self.state {
            SmtpState::Greeting => {
                self.state = SmtpState::Ehlo;
                Step::Send(format!("EHLO {}", self.hello))
            }
            SmtpState::Ehlo => match &self.credentials {
                Some(_) => {
                    self.state = SmtpState::AuthInit;
                    Step::Send("AUTH LOGIN".to_string())
                }
                None => {
                    self.state = SmtpState::MailFrom;
                    Step::Send(format!("MAIL FROM:<{}>", self.message.from))
                }
            },
            // Auth states are only entered from Ehlo when credentials exist.
            SmtpState::AuthInit => {
                let Some(creds) = &self.credentials else {
                    return Err(MailError::BadReply("AUTH without credentials".to_string()));
                };
                let encoded = BASE64.encode(&creds.username);
                self.state = SmtpState::AuthUser;
                Step::Send(encoded)
            }
            SmtpState::AuthUser => {
                let Some(creds) = &self.credentials else {
                    return Err(MailError::BadReply("AUTH without credentials".to_string()));
                };
                let encoded = BASE64.encode(&creds.password);
                self.state = SmtpState::AuthPass;
                Step::Send(encoded)
            }
            SmtpState::AuthPass => {
                self.state = SmtpState::MailFrom;
                Step::Send(format!("MAIL FROM:<{}>", self.message.from))
            }
            SmtpState::MailFrom => {
                self.state = SmtpState::RcptTo;
                Step::Send(format!("RCPT TO:<{}>", self.message.to))
            }
            SmtpState::RcptTo => {
                self.state = SmtpState::Data;
                Step::Send("DATA".to_string())
            }
            SmtpState::Data => {
                self.state = SmtpState::Body;
                Step::SendPayload(format_payload(&self.message))
            }
            SmtpState::Body => {
                self.state = SmtpState::Quit;
                Step::Send("QUIT".to_string())
            }
            SmtpState::Quit => {
                self.state = SmtpState::Done;
                Step::Close
            }
            SmtpState::Done => Step::Close,
        };
        Ok(step)
    }
}

/// Headers plus dot-stuffed body, CRLF line endings, terminated with
/// `CRLF . CRLF`.
#[must_use]
pub fn format_payload(message: &MailMessage) -> String {
    let mut payload = String::new();
    payload.push_str(&format!("From: {}\r\n", message.from));
    payload.push_str(&format!("To: {}\r\n", message.to));
    payload.push_str(&format!("Subject: {}\r\n", message.subject));
    payload.push_str("\r\n");
    for line in message.body.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            payload.push('.');
        }
        payload.push_str(line);
        payload.push_str("\r\n");
    }
    payload.push_str(".\r\n");
    payload
}
