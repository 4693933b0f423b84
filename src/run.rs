use crate::data::{
    CompareMode, DetectMode, ErrorKind, ReportError, RunConfig, RunReport,
};
use crate::disk::{self, DiskInfoProvider};
use crate::evaluate::{evaluate, ThresholdConfig};
use crate::mail::MailSender;
use crate::notify;
use crate::render::{render, MessageFields};
use crate::sms::TextSender;
use crate::units::SizeValue;
use std::path::MAIN_SEPARATOR_STR;
use sysinfo::System;

/// Fatal run errors. Invalid-disk and invalid-amount conditions are not
/// here: they are recoverable and land in the report's error field instead.
#[derive(Debug)]
pub enum NotifyError {
    DiskUnavailable(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DiskUnavailable(path) => {
                write!(f, "No disk usage data available for {path}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Capabilities the run depends on, passed explicitly instead of living in
/// process-wide singletons.
pub struct RunContext {
    pub disks: Box<dyn DiskInfoProvider>,
    pub mailer: Box<dyn MailSender>,
    pub texter: Box<dyn TextSender>,
}

/// Subject derived from the detect/compare pair when none is configured.
pub fn derive_subject(detect: DetectMode, modifier: CompareMode) -> String {
    match (modifier, detect) {
        (CompareMode::Less, DetectMode::Free) => String::from("LOW DISK SPACE"),
        (CompareMode::More, DetectMode::Used) => String::from("HIGH DISK SPACE"),
        _ => format!(
            "DISK SPACE - {} {}",
            modifier.to_string().to_uppercase(),
            detect.to_string().to_uppercase()
        ),
    }
}

/// One end-to-end check: validate -> sample -> evaluate -> render ->
/// dispatch, always producing a single `RunReport`.
pub async fn run(config: &RunConfig, ctx: &RunContext) -> Result<RunReport, NotifyError> {
    let subject = config
        .subject
        .clone()
        .unwrap_or_else(|| derive_subject(config.detect, config.modifier));
    tracing::debug!(
        "Checking if {} has {} than {} {}",
        config.disk,
        config.modifier,
        config.amount,
        config.detect
    );
    tracing::debug!("Param subject: {subject}");

    let hostname = System::host_name().unwrap_or_else(|| String::from("unknown"));
    let name = config.identity.name().to_string();
    let mut disk = if config.disk.is_empty() {
        MAIN_SEPARATOR_STR.to_string()
    } else {
        config.disk.clone()
    };

    let mut report = RunReport {
        name: name.clone(),
        disk: disk.clone(),
        hostname: hostname.clone(),
        detect: config.detect,
        modifier: config.modifier,
        free_byte: None,
        used_byte: None,
        free_size: None,
        used_size: None,
        out: None,
        in_amount: None,
        in_byte: None,
        notify: false,
        sending_email: false,
        sending_sms: false,
        template: None,
        outcomes: Vec::new(),
        error: None,
    };

    // Anything other than the bare root separator must be a known mount
    // point; a miss short-circuits before any sampling.
    if disk != MAIN_SEPARATOR_STR {
        disk = disk::normalize_mount_point(&disk);
        report.disk = disk.clone();
        if !disk::mount_point_exists(ctx.disks.as_ref(), &disk) {
            let message = format!("{disk} disk does not exist");
            tracing::error!("{message}");
            report.error = Some(ReportError {
                kind: ErrorKind::InvalidDisk,
                message,
            });
            return Ok(report);
        }
    }

    let sample = disk::sample_disk(ctx.disks.as_ref(), &disk)
        .ok_or_else(|| NotifyError::DiskUnavailable(disk.clone()))?;
    report.free_byte = Some(sample.free_bytes);
    report.used_byte = Some(sample.used_bytes);
    report.free_size = Some(sample.free_size.to_string());
    report.used_size = Some(sample.used_size.to_string());

    let observed_size = match config.detect {
        DetectMode::Free => &sample.free_size,
        DetectMode::Used => &sample.used_size,
    };
    let out = if config.round {
        format!(
            "{}{}",
            observed_size.amount().round(),
            observed_size.unit().abbrev()
        )
    } else {
        observed_size.display_compact()
    };
    report.out = Some(out.clone());

    let threshold = match ThresholdConfig::new(config.detect, config.modifier, &config.amount) {
        Ok(threshold) => threshold,
        Err(_) => {
            let message = String::from("Invalid value: -a, --amount <value>");
            tracing::error!("{message}");
            report.error = Some(ReportError {
                kind: ErrorKind::InvalidAmount,
                message,
            });
            let readiness = notify::check_readiness(config);
            report.sending_email = readiness.email;
            report.sending_sms = readiness.sms;
            return Ok(report);
        }
    };
    let threshold_display = SizeValue::from_bytes(threshold.threshold_bytes).display_compact();
    report.in_byte = Some(threshold.threshold_bytes);
    report.in_amount = Some(threshold_display.clone());

    let evaluation = evaluate(&threshold, &sample);
    report.notify = evaluation.notify;

    let readiness = notify::check_readiness(config);
    report.sending_email = readiness.email;
    report.sending_sms = readiness.sms;

    if evaluation.notify {
        let fields = MessageFields {
            name,
            disk: disk.clone(),
            out,
            detect: config.detect.to_string(),
            hostname,
            modifier: config.modifier.to_string(),
            threshold: threshold_display,
        };
        let rendered = render(&fields, config.template.as_deref());
        tracing::info!("{}", rendered.text);
        report.outcomes = notify::dispatch(
            config,
            &subject,
            &rendered,
            readiness,
            ctx.mailer.as_ref(),
            ctx.texter.as_ref(),
        )
        .await;
        report.template = Some(rendered);
    } else {
        tracing::debug!("Looks Good: {} {}", out, config.detect);
    }

    Ok(report)
}

/// Legacy dual interface: same report delivered through the callback and by
/// return value.
pub async fn run_with_callback<F>(
    config: &RunConfig,
    ctx: &RunContext,
    callback: F,
) -> Result<RunReport, NotifyError>
where
    F: FnOnce(&RunReport),
{
    let report = run(config, ctx).await?;
    callback(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_follows_detect_and_modifier() {
        assert_eq!(
            derive_subject(DetectMode::Free, CompareMode::Less),
            "LOW DISK SPACE"
        );
        assert_eq!(
            derive_subject(DetectMode::Used, CompareMode::More),
            "HIGH DISK SPACE"
        );
        assert_eq!(
            derive_subject(DetectMode::Used, CompareMode::Less),
            "DISK SPACE - LESS USED"
        );
        assert_eq!(
            derive_subject(DetectMode::Free, CompareMode::More),
            "DISK SPACE - MORE FREE"
        );
    }
}
