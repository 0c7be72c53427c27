use anyhow::Result;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Clock used to resolve "today" for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clock {
    Local,
    Zone(Tz),
}

impl Clock {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Some(Self::Local);
        }
        trimmed.parse::<Tz>().ok().map(Self::Zone)
    }

    pub fn today(self) -> NaiveDate {
        match self {
            Self::Local => chrono::Local::now().date_naive(),
            Self::Zone(tz) => Utc::now().with_timezone(&tz).date_naive(),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Local => "local".to_string(),
            Self::Zone(tz) => tz.name().to_string(),
        }
    }
}
