use crate::data::{Channel, DispatchOutcome, RenderedMessage, RunConfig};
use crate::mail::{MailSender, OutgoingEmail};
use crate::sms::TextSender;
use futures_util::future::join_all;
use serde_json::json;

/// Per-channel readiness, decided from configuration alone before any send
/// attempt. An unready channel is skipped with a warning, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub email: bool,
    pub sms: bool,
}

fn missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

pub fn check_readiness(config: &RunConfig) -> Readiness {
    let mut email = true;
    if config.recipients.is_empty() {
        tracing::debug!("Missing param: -R, --recipients <email@receiver>");
        email = false;
    }
    if config.service.eq_ignore_ascii_case("host")
        && (missing(&config.host) || config.port.is_none())
    {
        tracing::debug!("Missing param: -H, --host <server> and -P, --port <number>");
        email = false;
    }
    if missing(&config.user) || missing(&config.pass) {
        tracing::debug!("Missing param: -u, --user <account> and -p, --pass <word>");
        email = false;
    }
    if !email {
        tracing::warn!("No params given for sending email.");
    }

    let mut sms = true;
    if config.phones.is_empty() {
        tracing::debug!("Missing param: -O, --phones <+12345551234>");
        sms = false;
    }
    if missing(&config.account_sid)
        || missing(&config.auth_token)
        || missing(&config.sender_phone)
    {
        tracing::debug!(
            "Missing param: -A, --account-sid <id> and -T, --auth-token <token> and -o, --sender-phone <international-number>"
        );
        sms = false;
    }
    if !sms {
        tracing::warn!("No params given for sending SMS text message.");
    }

    Readiness { email, sms }
}

/// Runs the email and SMS branches concurrently and joins both before
/// returning. The branches share nothing mutable; each fills only its own
/// outcome slot, and one branch failing never masks the other.
pub async fn dispatch(
    config: &RunConfig,
    subject: &str,
    message: &RenderedMessage,
    readiness: Readiness,
    mailer: &dyn MailSender,
    texter: &dyn TextSender,
) -> Vec<DispatchOutcome> {
    let email_branch = async {
        if !readiness.email {
            return DispatchOutcome::skipped(Channel::Email);
        }
        let email = OutgoingEmail {
            from_name: config.sender_name.clone(),
            from_email: config.sender_email.clone(),
            recipients: config.recipients.clone(),
            subject: subject.to_string(),
            text: message.text.clone(),
            html: message.html.clone(),
        };
        match mailer.send(&email).await {
            Ok(detail) => DispatchOutcome {
                channel: Channel::Email,
                attempted: true,
                errors: Vec::new(),
                detail: Some(detail),
            },
            Err(e) => {
                tracing::error!("{e}");
                DispatchOutcome {
                    channel: Channel::Email,
                    attempted: true,
                    errors: vec![e.to_string()],
                    detail: None,
                }
            }
        }
    };

    let sms_branch = async {
        if !readiness.sms {
            return DispatchOutcome::skipped(Channel::Sms);
        }
        let from = config.sender_phone.as_deref().unwrap_or_default();
        tracing::debug!("Param phones: {}", config.phones.join(","));
        tracing::debug!("Param sender-phone: {from}");

        // One task per destination number, all submitted at once. The
        // channel succeeds only if every number succeeded.
        let sends = config.phones.iter().map(|phone| async move {
            (phone.clone(), texter.send(phone, from, &message.text).await)
        });
        let mut sids = serde_json::Map::new();
        let mut errors = Vec::new();
        for (phone, result) in join_all(sends).await {
            match result {
                Ok(sid) => {
                    tracing::info!("{sid}");
                    sids.insert(phone, json!(sid));
                }
                Err(e) => {
                    tracing::error!("{e}");
                    errors.push(format!("{phone}: {e}"));
                }
            }
        }
        DispatchOutcome {
            channel: Channel::Sms,
            attempted: true,
            errors,
            detail: Some(serde_json::Value::Object(sids)),
        }
    };

    let (email_outcome, sms_outcome) = tokio::join!(email_branch, sms_branch);
    vec![email_outcome, sms_outcome]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_readies_no_channel() {
        let readiness = check_readiness(&RunConfig::default());
        assert!(!readiness.email);
        assert!(!readiness.sms);
    }

    #[test]
    fn email_ready_with_service_and_credentials() {
        let mut config = RunConfig::default();
        config.recipients = vec![String::from("ops@example.com")];
        config.user = Some(String::from("user"));
        config.pass = Some(String::from("secret"));
        config.service = String::from("sendgrid");
        assert!(check_readiness(&config).email);

        // the "host" sentinel instead needs host and port
        config.service = String::from("host");
        assert!(!check_readiness(&config).email);
        config.host = Some(String::from("smtp.example.com"));
        config.port = Some(587);
        assert!(check_readiness(&config).email);
    }

    #[test]
    fn sms_needs_the_full_provider_quadruple() {
        let mut config = RunConfig::default();
        config.phones = vec![String::from("+13105551234")];
        config.account_sid = Some(String::from("ACxxxx"));
        config.auth_token = Some(String::from("token"));
        assert!(!check_readiness(&config).sms);
        config.sender_phone = Some(String::from("+12065551234"));
        assert!(check_readiness(&config).sms);
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let mut config = RunConfig::default();
        config.recipients = vec![String::from("ops@example.com")];
        config.user = Some(String::new());
        config.pass = Some(String::from("secret"));
        config.service = String::from("sendgrid");
        assert!(!check_readiness(&config).email);
    }
}
