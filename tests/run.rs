use async_trait::async_trait;
use notify_used_or_free::data::{Channel, CompareMode, DetectMode, ErrorKind, RunConfig};
use notify_used_or_free::disk::{DiskInfoProvider, Partition, UsageCounts};
use notify_used_or_free::mail::{MailError, MailSender, OutgoingEmail};
use notify_used_or_free::run::{run, run_with_callback, NotifyError, RunContext};
use notify_used_or_free::sms::{SmsError, TextSender};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Mutex;

const GB: u64 = 1024 * 1024 * 1024;

struct FakeDisks {
    partitions: Vec<Partition>,
    usage: Option<UsageCounts>,
}

impl FakeDisks {
    fn with_usage(free: u64, used: u64) -> FakeDisks {
        FakeDisks {
            partitions: vec![
                Partition {
                    device: String::from("/dev/sda1"),
                    mount_point: String::from("/"),
                },
                Partition {
                    device: String::from("/dev/sdb1"),
                    mount_point: String::from("/mnt/backup"),
                },
            ],
            usage: Some(UsageCounts { free, used }),
        }
    }
}

impl DiskInfoProvider for FakeDisks {
    fn partitions(&self) -> Vec<Partition> {
        self.partitions.clone()
    }

    fn usage(&self, _mount_point: &str) -> Option<UsageCounts> {
        self.usage
    }
}

#[derive(Default)]
struct StubMailer {
    fail: bool,
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl MailSender for StubMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<serde_json::Value, MailError> {
        if self.fail {
            return Err(MailError::VerifyFailed(String::from("smtp unreachable")));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(json!({ "subject": email.subject, "status": "250 Ok" }))
    }
}

#[derive(Default)]
struct StubTexter {
    fail_numbers: HashSet<String>,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl TextSender for StubTexter {
    async fn send(&self, to: &str, _from: &str, _body: &str) -> Result<String, SmsError> {
        if self.fail_numbers.contains(to) {
            return Err(SmsError::Api {
                status: 400,
                body: String::from("invalid number"),
            });
        }
        self.sent.lock().unwrap().push(to.to_string());
        Ok(format!("SM{to}"))
    }
}

fn context(disks: FakeDisks, mailer: StubMailer, texter: StubTexter) -> RunContext {
    RunContext {
        disks: Box::new(disks),
        mailer: Box::new(mailer),
        texter: Box::new(texter),
    }
}

fn sms_ready(config: &mut RunConfig) {
    config.account_sid = Some(String::from("ACxxxx"));
    config.auth_token = Some(String::from("token"));
    config.sender_phone = Some(String::from("+12065551234"));
    config.phones = vec![String::from("+13105551234")];
}

fn email_ready(config: &mut RunConfig) {
    config.recipients = vec![String::from("ops@example.com")];
    config.user = Some(String::from("user"));
    config.pass = Some(String::from("secret"));
    config.service = String::from("sendgrid");
}

#[tokio::test]
async fn invalid_disk_short_circuits_with_error_report() {
    let ctx = context(
        FakeDisks::with_usage(GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let config = RunConfig {
        disk: String::from("/invalid"),
        ..RunConfig::default()
    };

    let report = run(&config, &ctx).await.unwrap();
    let error = report.error.expect("expected an error");
    assert_eq!(error.kind, ErrorKind::InvalidDisk);
    assert_eq!(error.message, "/invalid disk does not exist");
    assert!(!report.notify);
    assert!(!report.sending_email);
    assert!(!report.sending_sms);
    assert!(report.free_byte.is_none());
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn trailing_separator_is_normalized_before_validation() {
    let ctx = context(
        FakeDisks::with_usage(100 * GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let config = RunConfig {
        disk: String::from("/mnt/backup/"),
        ..RunConfig::default()
    };

    let report = run(&config, &ctx).await.unwrap();
    assert!(report.error.is_none());
    assert_eq!(report.disk, "/mnt/backup");
}

#[tokio::test]
async fn default_config_without_credentials_sends_nothing() {
    // Threshold crossed: 1GB free is less than the default 10GB.
    let ctx = context(
        FakeDisks::with_usage(GB, 50 * GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let report = run(&RunConfig::default(), &ctx).await.unwrap();
    assert!(report.notify);
    assert!(!report.sending_email);
    assert!(!report.sending_sms);
    assert!(report.outcomes.iter().all(|o| !o.attempted));

    // Threshold not crossed: unconfigured channels stay unready either way.
    let ctx = context(
        FakeDisks::with_usage(100 * GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let report = run(&RunConfig::default(), &ctx).await.unwrap();
    assert!(!report.notify);
    assert!(!report.sending_email);
    assert!(!report.sending_sms);
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn raised_threshold_notifies_and_names_it_in_the_message() {
    let ctx = context(
        FakeDisks::with_usage(50 * GB, 10 * GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let config = RunConfig {
        amount: String::from("100TB"),
        ..RunConfig::default()
    };

    let report = run(&config, &ctx).await.unwrap();
    assert!(report.notify);
    let rendered = report.template.expect("expected a rendered message");
    assert!(rendered.text.contains("100TB"), "{}", rendered.text);
    assert_eq!(report.in_amount.as_deref(), Some("100TB"));
}

#[tokio::test]
async fn sms_only_dispatch_reports_per_number_results() {
    let texter = StubTexter {
        fail_numbers: HashSet::from([String::from("+19995550000")]),
        ..StubTexter::default()
    };
    let ctx = context(FakeDisks::with_usage(GB, GB), StubMailer::default(), texter);
    let mut config = RunConfig {
        amount: String::from("100TB"),
        ..RunConfig::default()
    };
    sms_ready(&mut config);
    config.phones.push(String::from("+19995550000"));

    let report = run(&config, &ctx).await.unwrap();
    assert!(report.notify);
    assert!(!report.sending_email);
    assert!(report.sending_sms);

    let email = &report.outcomes[0];
    assert_eq!(email.channel, Channel::Email);
    assert!(!email.attempted);
    assert!(email.errors.is_empty());

    // One number failed, so the channel as a whole failed even though the
    // other number went through.
    let sms = &report.outcomes[1];
    assert_eq!(sms.channel, Channel::Sms);
    assert!(sms.attempted);
    assert_eq!(sms.errors.len(), 1);
    assert!(sms.errors[0].starts_with("+19995550000"));
    assert!(!sms.succeeded());
    let detail = sms.detail.as_ref().expect("expected per-number detail");
    assert_eq!(detail["+13105551234"], json!("SM+13105551234"));
    assert!(detail.get("+19995550000").is_none());
}

#[tokio::test]
async fn email_failure_never_masks_the_sms_outcome() {
    let mailer = StubMailer {
        fail: true,
        ..StubMailer::default()
    };
    let ctx = context(FakeDisks::with_usage(GB, GB), mailer, StubTexter::default());
    let mut config = RunConfig {
        amount: String::from("100TB"),
        ..RunConfig::default()
    };
    email_ready(&mut config);
    sms_ready(&mut config);

    let report = run(&config, &ctx).await.unwrap();
    let email = &report.outcomes[0];
    assert!(email.attempted);
    assert_eq!(email.errors.len(), 1);
    assert!(email.errors[0].contains("smtp unreachable"));

    let sms = &report.outcomes[1];
    assert!(sms.succeeded());
}

#[tokio::test]
async fn derived_subject_reaches_the_mailer() {
    let ctx = context(
        FakeDisks::with_usage(GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let mut config = RunConfig {
        amount: String::from("100TB"),
        ..RunConfig::default()
    };
    email_ready(&mut config);

    let report = run(&config, &ctx).await.unwrap();
    let email = &report.outcomes[0];
    assert!(email.succeeded());
    let detail = email.detail.as_ref().unwrap();
    assert_eq!(detail["subject"], json!("LOW DISK SPACE"));
}

#[tokio::test]
async fn missing_usage_data_is_fatal() {
    let disks = FakeDisks {
        partitions: Vec::new(),
        usage: None,
    };
    let ctx = context(disks, StubMailer::default(), StubTexter::default());

    let result = run(&RunConfig::default(), &ctx).await;
    assert!(matches!(result, Err(NotifyError::DiskUnavailable(_))));
}

#[tokio::test]
async fn unparsable_amount_lands_in_the_report() {
    let ctx = context(
        FakeDisks::with_usage(GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let config = RunConfig {
        amount: String::from("abc"),
        ..RunConfig::default()
    };

    let report = run(&config, &ctx).await.unwrap();
    let error = report.error.expect("expected an error");
    assert_eq!(error.kind, ErrorKind::InvalidAmount);
    assert!(!report.notify);
    // sampling already happened, so the measured side is still reported
    assert_eq!(report.free_byte, Some(GB));
    assert!(report.outcomes.is_empty());
}

#[tokio::test]
async fn used_more_detects_high_usage() {
    let ctx = context(
        FakeDisks::with_usage(GB, 90 * GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let config = RunConfig {
        detect: DetectMode::Used,
        modifier: CompareMode::More,
        amount: String::from("80GB"),
        ..RunConfig::default()
    };

    let report = run(&config, &ctx).await.unwrap();
    assert!(report.notify);
    assert_eq!(report.out.as_deref(), Some("90GB"));
}

#[tokio::test]
async fn callback_delivers_the_same_report_as_the_return_value() {
    let ctx = context(
        FakeDisks::with_usage(GB, GB),
        StubMailer::default(),
        StubTexter::default(),
    );
    let captured = Mutex::new(None);

    let returned = run_with_callback(&RunConfig::default(), &ctx, |report| {
        *captured.lock().unwrap() = Some(serde_json::to_value(report).unwrap());
    })
    .await
    .unwrap();

    let callback_value = captured.lock().unwrap().take().expect("callback ran");
    assert_eq!(callback_value, serde_json::to_value(&returned).unwrap());
}
