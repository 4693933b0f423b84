use crate::units::SizeValue;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Whether the evaluator looks at free or used space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectMode {
    Used,
    Free,
}

/// "less" notifies when the observed amount is at or below the threshold,
/// "more" when it is at or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    Less,
    More,
}

impl std::fmt::Display for DetectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectMode::Used => write!(f, "used"),
            DetectMode::Free => write!(f, "free"),
        }
    }
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMode::Less => write!(f, "less"),
            CompareMode::More => write!(f, "more"),
        }
    }
}

/// One fresh measurement of a mount point, discarded after the run.
#[derive(Debug, Clone, Serialize)]
pub struct DiskSample {
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub free_size: SizeValue,
    pub used_size: SizeValue,
}

/// Outcome of comparing a sample against the configured threshold.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub sample: DiskSample,
    pub observed_bytes: u64,
    pub notify: bool,
}

/// Plain-text and HTML variants of the notification body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

/// Per-channel dispatch result. An unready channel is skipped, not failed:
/// `attempted` stays false and `errors` stays empty. A channel with any
/// entry in `errors` failed for this run, even if parts of it succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub channel: Channel,
    pub attempted: bool,
    pub errors: Vec<String>,
    pub detail: Option<serde_json::Value>,
}

impl DispatchOutcome {
    pub fn skipped(channel: Channel) -> DispatchOutcome {
        DispatchOutcome {
            channel,
            attempted: false,
            errors: Vec::new(),
            detail: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.attempted && self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidDisk,
    InvalidAmount,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    pub kind: ErrorKind,
    pub message: String,
}

/// The single aggregate value describing one invocation, created once per
/// run and handed back both directly and through the callback interface.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub disk: String,
    pub hostname: String,
    pub detect: DetectMode,
    pub modifier: CompareMode,
    pub free_byte: Option<u64>,
    pub used_byte: Option<u64>,
    pub free_size: Option<String>,
    pub used_size: Option<String>,
    pub out: Option<String>,
    #[serde(rename = "in")]
    pub in_amount: Option<String>,
    pub in_byte: Option<f64>,
    pub notify: bool,
    pub sending_email: bool,
    pub sending_sms: bool,
    pub template: Option<RenderedMessage>,
    pub outcomes: Vec<DispatchOutcome>,
    pub error: Option<ReportError>,
}

/// How the tool refers to itself in the rendered message.
#[derive(Debug, Clone, Serialize)]
pub enum ToolIdentity {
    ConfiguredName(String),
    DefaultName,
}

impl ToolIdentity {
    pub fn name(&self) -> &str {
        match self {
            ToolIdentity::ConfiguredName(name) => name,
            ToolIdentity::DefaultName => "notify-used-or-free",
        }
    }
}

/// Full run configuration, merged over the documented defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub disk: String,
    pub detect: DetectMode,
    pub modifier: CompareMode,
    pub amount: String,
    pub round: bool,
    pub template: Option<String>,
    pub subject: Option<String>,
    pub recipients: Vec<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub service: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub sender_phone: Option<String>,
    pub phones: Vec<String>,
    pub identity: ToolIdentity,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            disk: std::path::MAIN_SEPARATOR_STR.to_string(),
            detect: DetectMode::Free,
            modifier: CompareMode::Less,
            amount: String::from("10GB"),
            round: false,
            template: None,
            subject: None,
            recipients: Vec::new(),
            sender_email: String::from("noreply@notify.used.or.free"),
            sender_name: String::from("NotifyUsedOrFree"),
            service: String::from("host"),
            host: None,
            port: None,
            secure: false,
            user: None,
            pass: None,
            account_sid: None,
            auth_token: None,
            sender_phone: None,
            phones: Vec::new(),
            identity: ToolIdentity::DefaultName,
        }
    }
}
