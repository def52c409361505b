//! Runtime configuration for the HTTP adapter

use std::net::SocketAddr;
use std::path::PathBuf;

use caseflow_mail::Credentials;

/// Command-line / environment configuration.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "caseflow-server", about = "Order & lead back-office API")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "CASEFLOW_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Directory for the file-backed store; in-memory when omitted.
    #[arg(long, env = "CASEFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the HTML document templates.
    #[arg(long, env = "CASEFLOW_TEMPLATE_DIR", default_value = "templates")]
    pub template_dir: PathBuf,

    /// Directory the CSV import endpoint reads from.
    #[arg(long, env = "CASEFLOW_IMPORT_DIR", default_value = "import")]
    pub import_dir: PathBuf,

    /// Directory holding `{{var}}` plain-text mail templates.
    #[arg(
        long,
        env = "CASEFLOW_MAIL_TEMPLATE_DIR",
        default_value = "templates/mail"
    )]
    pub mail_template_dir: PathBuf,

    /// SMTP relay host; mail endpoints refuse to send when omitted.
    #[arg(long, env = "CASEFLOW_SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "CASEFLOW_SMTP_PORT", default_value_t = 25)]
    pub smtp_port: u16,

    /// Sender address stamped on outgoing mail.
    #[arg(long, env = "CASEFLOW_SMTP_FROM", default_value = "noreply@caseflow.local")]
    pub smtp_from: String,

    /// Hostname announced in EHLO.
    #[arg(long, env = "CASEFLOW_SMTP_HELLO", default_value = "caseflow.local")]
    pub smtp_hello: String,

    #[arg(long, env = "CASEFLOW_SMTP_USER")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "CASEFLOW_SMTP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,
}

impl Config {
    /// AUTH LOGIN credentials when both halves are present.
    #[must_use]
    pub fn smtp_credentials(&self) -> Option<Credentials> {
        match (&self.smtp_user, &self.smtp_pass) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}
