use regex::Regex;
use serde::Serializer;
use std::sync::LazyLock;

/// The ordered size scale, base 1024 per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Unit {
    Bytes,
    KB,
    MB,
    GB,
    TB,
    PB,
    EB,
    ZB,
    YB,
}

impl Unit {
    pub const ALL: [Unit; 9] = [
        Unit::Bytes,
        Unit::KB,
        Unit::MB,
        Unit::GB,
        Unit::TB,
        Unit::PB,
        Unit::EB,
        Unit::ZB,
        Unit::YB,
    ];

    pub fn abbrev(&self) -> &'static str {
        match self {
            Unit::Bytes => "Bytes",
            Unit::KB => "KB",
            Unit::MB => "MB",
            Unit::GB => "GB",
            Unit::TB => "TB",
            Unit::PB => "PB",
            Unit::EB => "EB",
            Unit::ZB => "ZB",
            Unit::YB => "YB",
        }
    }

    /// Power of 1024 for a unit letter (K=1 .. Y=8).
    fn power_of(letter: char) -> Option<u32> {
        match letter.to_ascii_uppercase() {
            'K' => Some(1),
            'M' => Some(2),
            'G' => Some(3),
            'T' => Some(4),
            'P' => Some(5),
            'E' => Some(6),
            'Z' => Some(7),
            'Y' => Some(8),
            _ => None,
        }
    }
}

/// A non-negative magnitude paired with a unit from the scale. The magnitude
/// stays below 1024 except for the terminal unit (YB), which is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeValue {
    amount: f64,
    unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSizeError {
    input: String,
}

impl std::fmt::Display for ParseSizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no leading number in size string {:?}", self.input)
    }
}

impl std::error::Error for ParseSizeError {}

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s?(K|M|G|T|P|E|Z|Y)?B?").expect("size pattern is valid")
});

impl SizeValue {
    /// Builds a value from a raw byte count, dividing by 1024 while the
    /// remainder is >= 1024 and clamping at YB. Non-finite input counts as 0.
    pub fn from_bytes(bytes: f64) -> SizeValue {
        let mut n = if bytes.is_finite() { bytes.max(0.0) } else { 0.0 };
        let mut level = 0;
        while n >= 1024.0 && level < Unit::ALL.len() - 1 {
            n /= 1024.0;
            level += 1;
        }
        SizeValue {
            amount: n,
            unit: Unit::ALL[level],
        }
    }

    /// Parses a "<number><unit>" string such as "10GB", "1.5tb" or "1024".
    /// The unit letter is optional, case-insensitive, with an optional
    /// trailing "B". Fails when the leading number is absent.
    pub fn parse(text: &str) -> Result<SizeValue, ParseSizeError> {
        Ok(SizeValue::from_bytes(size_to_bytes(text)?))
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn bytes(&self) -> f64 {
        let power = Unit::ALL.iter().position(|u| *u == self.unit).unwrap_or(0);
        self.amount * 1024f64.powi(power as i32)
    }

    /// Amount with up to two decimals, trailing zeros trimmed, no separator
    /// before the unit: 9.77 -> "9.77MB", 9.7 -> "9.7MB", 10.0 -> "10MB".
    pub fn display_compact(&self) -> String {
        let mut amount = format!("{:.2}", self.amount);
        if amount.contains('.') {
            amount = amount.trim_end_matches('0').trim_end_matches('.').to_string();
        }
        format!("{}{}", amount, self.unit.abbrev())
    }
}

impl std::fmt::Display for SizeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}{}", self.amount, self.unit.abbrev())
    }
}

impl serde::Serialize for SizeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Formats a byte count as a human-readable size string, e.g. "9.77MB".
pub fn bytes_to_size(bytes: f64) -> String {
    SizeValue::from_bytes(bytes).to_string()
}

/// Parses a size string back to a byte count. The result of round-tripping
/// through `bytes_to_size` is only accurate up to the two-decimal rounding;
/// callers that need the exact integer must keep it themselves.
pub fn size_to_bytes(text: &str) -> Result<f64, ParseSizeError> {
    let caps = SIZE_RE.captures(text).ok_or_else(|| ParseSizeError {
        input: text.to_string(),
    })?;
    let number: f64 = caps[1].parse().map_err(|_| ParseSizeError {
        input: text.to_string(),
    })?;
    let power = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Unit::power_of)
        .unwrap_or(0);
    Ok(number * 1024f64.powi(power as i32))
}
