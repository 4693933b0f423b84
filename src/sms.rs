use async_trait::async_trait;
use std::time::Duration;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug)]
pub enum SmsError {
    Http(String),
    Api { status: u16, body: String },
    MissingSid,
}

impl std::fmt::Display for SmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmsError::Http(detail) => write!(f, "SMS request failed: {detail}"),
            SmsError::Api { status, body } => {
                write!(f, "SMS provider rejected the message ({status}): {body}")
            }
            SmsError::MissingSid => write!(f, "SMS provider response had no message sid"),
        }
    }
}

impl std::error::Error for SmsError {}

/// Text-sending capability, swapped out in tests. Returns the provider's
/// message identifier on success.
#[async_trait]
pub trait TextSender: Send + Sync {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, SmsError>;
}

/// Production sender submitting to the Twilio Messages endpoint.
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<TwilioClient, SmsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("notify-used-or-free/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SmsError::Http(e.to_string()))?;
        Ok(TwilioClient {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            http,
        })
    }
}

#[async_trait]
impl TextSender for TwilioClient {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, SmsError> {
        let url = format!("{TWILIO_API}/Accounts/{}/Messages.json", self.account_sid);
        let params = [("To", to), ("From", from), ("Body", body)];
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        payload
            .get("sid")
            .and_then(|sid| sid.as_str())
            .map(str::to_string)
            .ok_or(SmsError::MissingSid)
    }
}
