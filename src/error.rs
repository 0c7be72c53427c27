use thiserror::Error;

#[derive(Debug, Error)]
pub enum BluemoonError {
    #[error("invalid or incomplete date: {0}")]
    InvalidDate(String),
    #[error("dataset is not ready; call set_ready(true) before projecting rows")]
    NotReady,
    #[error("unknown or unsupported data source: {0}")]
    UnknownSource(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("store is locked by another writer: {0}")]
    StoreLocked(String),
    #[error("malformed source record: {0}")]
    MalformedRecord(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BluemoonErrorCode {
    E001StoreLocked,
    E002StoreCorrupt,
    E003ConfigInvalid,
    E004SourceInvalid,
}

impl BluemoonErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001StoreLocked => "E001_STORE_LOCKED",
            Self::E002StoreCorrupt => "E002_STORE_CORRUPT",
            Self::E003ConfigInvalid => "E003_CONFIG_INVALID",
            Self::E004SourceInvalid => "E004_SOURCE_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable_strings() {
        assert_eq!(BluemoonErrorCode::E001StoreLocked.as_str(), "E001_STORE_LOCKED");
        assert_eq!(BluemoonErrorCode::E002StoreCorrupt.as_str(), "E002_STORE_CORRUPT");
    }

    #[test]
    fn not_ready_message_names_the_fix() {
        assert!(BluemoonError::NotReady.to_string().contains("set_ready(true)"));
    }
}
