use clap::Parser;
use notify_used_or_free::data::{CompareMode, DetectMode, RunConfig, RunReport, ToolIdentity};
use notify_used_or_free::disk::SystemDisks;
use notify_used_or_free::mail::SmtpMailer;
use notify_used_or_free::run::{self, RunContext};
use notify_used_or_free::sms::TwilioClient;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = ".notify-used-or-free";

#[derive(Parser)]
#[command(
    name = "notify-used-or-free",
    version,
    about = "Checks a disk's free or used space against a threshold and notifies by email and/or SMS",
    after_help = "Example: notify-used-or-free / -a 5GB -R user@email.example -u username -p password -S sendgrid"
)]
struct Cli {
    /// Mount point to check, e.g. / or /mnt/backup
    disk: String,

    /// Print the full data info instead of just the message
    #[arg(short, long)]
    info: bool,

    /// Report an integer instead of a floating point number, eg. 1GB not 1.23GB
    #[arg(short, long)]
    round: bool,

    /// Which side of the disk to check, free by default
    #[arg(short, long, value_enum, default_value_t = DetectMode::Free)]
    detect: DetectMode,

    /// Notify when less or more than the detected amount, less by default
    #[arg(short, long, value_enum, default_value_t = CompareMode::Less)]
    modifier: CompareMode,

    /// Amount of space used or free on disk, eg. 1024MB, 1TB
    #[arg(short, long, default_value = "10GB")]
    amount: String,

    /// Message template with {{name}} {{disk}} {{out}} {{detect}} {{hostname}} {{modifier}} {{in}} placeholders
    #[arg(short, long)]
    template: Option<String>,

    /// Email subject, derived from detect/modifier when omitted
    #[arg(short, long)]
    subject: Option<String>,

    /// Email addresses to send the message to
    #[arg(short = 'R', long, value_delimiter = ',')]
    recipients: Vec<String>,

    /// Sender email address
    #[arg(short = 'e', long, default_value = "noreply@notify.used.or.free")]
    sender_email: String,

    /// Sender display name
    #[arg(short = 'n', long, default_value = "NotifyUsedOrFree")]
    sender_name: String,

    /// Mail service to use (Mailgun, Mailjet, Postmark, SendGrid, SES, SES-US-EAST-1,
    /// SES-US-WEST-2, SES-EU-WEST-1, Sparkpost) instead of host:port
    #[arg(short = 'S', long, default_value = "host")]
    service: String,

    /// Host of the mail server, or provide a service instead
    #[arg(short = 'H', long, env = "SMTP_HOST")]
    host: Option<String>,

    /// Port of the mail server, or provide a service instead
    #[arg(short = 'P', long, env = "SMTP_PORT")]
    port: Option<u16>,

    /// Use a secure connection to the mail server
    #[arg(short = 'c', long)]
    secure: bool,

    /// Username on the mail server
    #[arg(short = 'u', long, env = "SMTP_USER")]
    user: Option<String>,

    /// Password on the mail server for the username
    #[arg(short = 'p', long, env = "SMTP_PASS")]
    pass: Option<String>,

    /// Save a rotated log file in this directory
    #[arg(short = 'L', long)]
    log: Option<PathBuf>,

    /// Show debug messages
    #[arg(short = 'X', long)]
    debug: bool,

    /// JSON log and report output
    #[arg(short = 'j', long)]
    json: bool,

    /// Suppress console log output
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Twilio account sid
    #[arg(short = 'A', long, env = "TWILIO_ACCOUNT_SID")]
    account_sid: Option<String>,

    /// Twilio auth token
    #[arg(short = 'T', long, env = "TWILIO_AUTH_TOKEN")]
    auth_token: Option<String>,

    /// Phone numbers to send the message to
    #[arg(short = 'O', long, value_delimiter = ',')]
    phones: Vec<String>,

    /// Sending Twilio phone number
    #[arg(short = 'o', long, env = "TWILIO_SENDER_PHONE")]
    sender_phone: Option<String>,
}

impl Cli {
    fn to_config(&self) -> RunConfig {
        let identity = std::env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .map(ToolIdentity::ConfiguredName)
            .unwrap_or(ToolIdentity::DefaultName);
        RunConfig {
            disk: self.disk.clone(),
            detect: self.detect,
            modifier: self.modifier,
            amount: self.amount.clone(),
            round: self.round,
            template: self.template.clone(),
            subject: self.subject.clone(),
            recipients: self.recipients.clone(),
            sender_email: self.sender_email.clone(),
            sender_name: self.sender_name.clone(),
            service: self.service.clone(),
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            user: self.user.clone(),
            pass: self.pass.clone(),
            account_sid: self.account_sid.clone(),
            auth_token: self.auth_token.clone(),
            sender_phone: self.sender_phone.clone(),
            phones: self.phones.clone(),
            identity,
        }
    }
}

fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>, String> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if !cli.quiet || cli.debug {
        let layer = if cli.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .boxed()
        };
        layers.push(layer);
    }

    let mut guard = None;
    if let Some(dir) = &cli.log {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(5)
            .build(dir)
            .map_err(|e| e.to_string())?;
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        let layer = if cli.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false)
                .with_writer(writer)
                .boxed()
        };
        layers.push(layer);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| e.to_string())?;
    Ok(guard)
}

/// Prints the report the way the flags ask for it: the full dump when info
/// or JSON output is requested, otherwise just the rendered message text.
fn print_report(cli: &Cli, report: &RunReport) {
    if let Some(error) = &report.error {
        eprintln!("{}", error.message);
    }
    if cli.info || cli.json {
        if cli.json {
            match serde_json::to_string_pretty(report) {
                Ok(dump) => println!("{dump}"),
                Err(e) => tracing::error!("Failed to serialize report: {e}"),
            }
        } else {
            println!("{}", scalar_dump(report));
        }
    } else if let Some(template) = &report.template {
        println!("{}", template.text);
    }
}

/// Line-per-field `key: value` text covering the report's scalar fields.
fn scalar_dump(report: &RunReport) -> String {
    let value = match serde_json::to_value(report) {
        Ok(value) => value,
        Err(_) => return String::new(),
    };
    let mut lines = Vec::new();
    if let serde_json::Value::Object(fields) = value {
        for (key, field) in fields {
            match field {
                serde_json::Value::String(s) => lines.push(format!("{key}: {s}")),
                serde_json::Value::Bool(b) => lines.push(format!("{key}: {b}")),
                serde_json::Value::Number(n) => lines.push(format!("{key}: {n}")),
                _ => (),
            }
        }
    }
    lines.join("\n")
}

#[tokio::main]
async fn main() {
    let env_file = dotenvy::dotenv();
    let cli = Cli::parse();

    let _log_guard = match init_tracing(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Could not initialize the tracing system: {e}");
            return;
        }
    };
    if let Ok(path) = &env_file {
        tracing::debug!("Loaded env file from {path:?}");
    }

    let config = cli.to_config();
    let mailer = SmtpMailer::from_config(&config);
    let texter = match TwilioClient::new(
        config.account_sid.clone().unwrap_or_default(),
        config.auth_token.clone().unwrap_or_default(),
    ) {
        Ok(texter) => texter,
        Err(e) => {
            tracing::error!("Failed to build the SMS client: {e}");
            return;
        }
    };
    let ctx = RunContext {
        disks: Box::new(SystemDisks),
        mailer: Box::new(mailer),
        texter: Box::new(texter),
    };

    match run::run_with_callback(&config, &ctx, |report| print_report(&cli, report)).await {
        Ok(_) => (),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
