use crate::data::{CompareMode, DetectMode, DiskSample, EvaluationResult};
use crate::units::{size_to_bytes, ParseSizeError};

/// Detect/compare modes plus the parsed threshold, immutable for the run.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdConfig {
    pub detect: DetectMode,
    pub compare: CompareMode,
    pub threshold_bytes: f64,
}

impl ThresholdConfig {
    pub fn new(
        detect: DetectMode,
        compare: CompareMode,
        amount: &str,
    ) -> Result<ThresholdConfig, ParseSizeError> {
        Ok(ThresholdConfig {
            detect,
            compare,
            threshold_bytes: size_to_bytes(amount)?,
        })
    }
}

/// Pure decision: picks the observed byte count per detect mode and applies
/// the compare rule (less => observed <= threshold, more => observed >=
/// threshold).
pub fn evaluate(config: &ThresholdConfig, sample: &DiskSample) -> EvaluationResult {
    let observed_bytes = match config.detect {
        DetectMode::Free => sample.free_bytes,
        DetectMode::Used => sample.used_bytes,
    };
    let notify = match config.compare {
        CompareMode::Less => (observed_bytes as f64) <= config.threshold_bytes,
        CompareMode::More => (observed_bytes as f64) >= config.threshold_bytes,
    };
    EvaluationResult {
        sample: sample.clone(),
        observed_bytes,
        notify,
    }
}
