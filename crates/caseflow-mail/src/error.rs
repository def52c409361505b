//! Mail errors

/// Errors from the SMTP exchange
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The server answered a step with an unexpected reply code.
    #[error("server rejected {state} step with {code}: {line}")]
    Rejected {
        state: &'static str,
        code: u16,
        line: String,
    },

    /// A reply line did not start with a 3-digit code.
    #[error("unparseable server reply: {0}")]
    BadReply(String),

    /// Connection closed mid-exchange.
    #[error("connection closed before the exchange finished")]
    UnexpectedEof,

    /// No reply within the idle timeout.
    #[error("smtp exchange timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Socket failure.
    #[error("smtp i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
