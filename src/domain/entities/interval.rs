use std::fmt;

/// A posting period written as `<n><unit>`, e.g. `30m`, `6h`, `1d`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInterval {
    pub value: u64,
    pub unit: IntervalUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    fn millis(self) -> u64 {
        match self {
            IntervalUnit::Minutes => 60 * 1000,
            IntervalUnit::Hours => 60 * 60 * 1000,
            IntervalUnit::Days => 24 * 60 * 60 * 1000,
        }
    }

    fn suffix(self) -> char {
        match self {
            IntervalUnit::Minutes => 'm',
            IntervalUnit::Hours => 'h',
            IntervalUnit::Days => 'd',
        }
    }
}

impl PostInterval {
    /// Parse `<digits><m|h|d>`, unit case-insensitive. `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let unit = match text.chars().last()?.to_ascii_lowercase() {
            'm' => IntervalUnit::Minutes,
            'h' => IntervalUnit::Hours,
            'd' => IntervalUnit::Days,
            _ => return None,
        };
        let digits = &text[..text.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = digits.parse().ok()?;
        Some(Self { value, unit })
    }

    /// Length in milliseconds, `None` on overflow
    pub fn as_millis(&self) -> Option<u64> {
        self.value.checked_mul(self.unit.millis())
    }

    /// Compact form as typed, e.g. `1h`
    pub fn spec(&self) -> String {
        format!("{}{}", self.value, self.unit.suffix())
    }
}

impl fmt::Display for PostInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            IntervalUnit::Minutes => "minute(s)",
            IntervalUnit::Hours => "hour(s)",
            IntervalUnit::Days => "day(s)",
        };
        write!(f, "{} {}", self.value, unit)
    }
}

/// A scheduled image post for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalPost {
    pub guild_id: String,
    pub channel_id: String,
    /// Period as the admin typed it, e.g. `6h`
    pub interval: String,
    pub interval_ms: u64,
}
