//! Minimal SMTP client
//!
//! The protocol exchange is an explicit finite-state machine
//! ([`SmtpFsm`]): each state names its expected reply code(s) in one
//! dispatch table, and feeding a server reply yields the next command to
//! write. Any 4xx/5xx (or otherwise unexpected) reply aborts with the
//! failing state attached; no command is ever emitted after a failure.
//! The async transport ([`SmtpClient`]) drives the machine over a TCP
//! stream with a 30 second idle timeout.
//!
//! Happy path only: no retry, no pooling, no STARTTLS. AUTH LOGIN is used
//! when credentials are configured, skipped otherwise.

pub mod client;
pub mod error;
pub mod fsm;
pub mod template;

pub use client::SmtpClient;
pub use error::MailError;
pub use fsm::{Credentials, MailMessage, SmtpFsm, SmtpState, Step};
pub use template::render_mail_template;
