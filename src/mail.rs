use crate::data::RunConfig;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;

/// One outgoing notification email, fully assembled by the dispatcher.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub from_email: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug)]
pub enum MailError {
    BadAddress(String),
    VerifyFailed(String),
    Transport(String),
}

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::BadAddress(detail) => write!(f, "invalid mail address: {detail}"),
            MailError::VerifyFailed(detail) => {
                write!(f, "mail transport verification failed: {detail}")
            }
            MailError::Transport(detail) => write!(f, "mail transport error: {detail}"),
        }
    }
}

impl std::error::Error for MailError {}

/// Mail-sending capability, swapped out in tests.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Verifies connectivity first, then sends; a verify failure never
    /// reaches the send step. Returns a structured result describing what
    /// was sent plus the transport's status line.
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, MailError>;
}

/// SMTP relay hosts for the named external services.
pub fn service_host(service: &str) -> Option<&'static str> {
    match service.to_ascii_lowercase().as_str() {
        "mailgun" => Some("smtp.mailgun.org"),
        "mailjet" => Some("in-v3.mailjet.com"),
        "postmark" => Some("smtp.postmarkapp.com"),
        "sendgrid" => Some("smtp.sendgrid.net"),
        "ses" | "ses-us-east-1" => Some("email-smtp.us-east-1.amazonaws.com"),
        "ses-us-west-2" => Some("email-smtp.us-west-2.amazonaws.com"),
        "ses-eu-west-1" => Some("email-smtp.eu-west-1.amazonaws.com"),
        "sparkpost" => Some("smtp.sparkpostmail.com"),
        _ => None,
    }
}

/// Production sender over lettre's async SMTP transport. The transport is
/// built per send, mirroring the one-shot lifecycle of the tool.
pub struct SmtpMailer {
    service: String,
    host: Option<String>,
    port: Option<u16>,
    secure: bool,
    user: Option<String>,
    pass: Option<String>,
}

impl SmtpMailer {
    pub fn from_config(config: &RunConfig) -> SmtpMailer {
        SmtpMailer {
            service: config.service.clone(),
            host: config.host.clone(),
            port: config.port,
            secure: config.secure,
            user: config.user.clone(),
            pass: config.pass.clone(),
        }
    }

    fn endpoint(&self) -> Result<(String, Option<u16>), MailError> {
        if !self.service.eq_ignore_ascii_case("host") {
            tracing::debug!("Using service: {}", self.service);
            let host = service_host(&self.service).ok_or_else(|| {
                MailError::Transport(format!("unknown mail service {:?}", self.service))
            })?;
            return Ok((host.to_string(), None));
        }
        match (&self.host, self.port) {
            (Some(host), Some(port)) => {
                tracing::debug!("Using host:port {}:{}", host, port);
                Ok((host.clone(), Some(port)))
            }
            _ => Err(MailError::Transport(String::from(
                "no mail server configured",
            ))),
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let (host, port) = self.endpoint()?;
        let mut builder = if self.secure {
            tracing::debug!("Secure email enabled");
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;
        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&self.user, &self.pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, MailError> {
        let transport = self.transport()?;
        match transport.test_connection().await {
            Ok(true) => (),
            Ok(false) => {
                return Err(MailError::VerifyFailed(String::from(
                    "transport refused the connection",
                )))
            }
            Err(e) => return Err(MailError::VerifyFailed(e.to_string())),
        }

        tracing::debug!(
            "Mail options: subject={:?} to={:?}",
            email.subject,
            email.recipients
        );
        let from = Mailbox::new(
            Some(email.from_name.clone()),
            email
                .from_email
                .parse()
                .map_err(|e| MailError::BadAddress(format!("{}: {e}", email.from_email)))?,
        );
        let mut builder = Message::builder().from(from).subject(email.subject.clone());
        for recipient in &email.recipients {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| MailError::BadAddress(format!("{recipient}: {e}")))?;
            builder = builder.to(mailbox);
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let status = format!(
            "{} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );
        let result = json!({
            "subject": email.subject,
            "text": email.text,
            "envelope": { "from": email.from_email, "to": email.recipients },
            "status": status,
        });
        tracing::info!("{status} {result}");
        Ok(result)
    }
}
