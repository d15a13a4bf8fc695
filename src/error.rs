use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MakefigError {
    #[error("No document at {path}")]
    DocumentMissing { path: PathBuf },

    #[error("Key not found in document: {0}")]
    KeyNotFound(String),

    #[error("Invalid {expected} for '{key}': '{raw}'")]
    TypeMismatch {
        key: String,
        raw: String,
        expected: &'static str,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unrecognized key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("{path} already exists (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    #[error("Unknown setting '{key}' in {path} (line {line})")]
    UnknownSetting {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown settings in defaults file")]
    UnknownSettings(Vec<MakefigError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Defaults error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("Failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_key_and_raw_text() {
        let err = MakefigError::TypeMismatch {
            key: "F_CPU".into(),
            raw: "abc".into(),
            expected: "integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("F_CPU"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn unknown_setting_formats_correctly() {
        let err = MakefigError::UnknownSetting {
            key: "devize".into(),
            path: "/home/user/.config/makefig/makefig.toml".into(),
            line: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("devize"));
        assert!(msg.contains("makefig.toml"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn document_missing_formats() {
        let err = MakefigError::DocumentMissing {
            path: "proj/Makefile".into(),
        };
        assert!(err.to_string().contains("proj/Makefile"));
    }

    #[test]
    fn already_exists_mentions_force() {
        let err = MakefigError::AlreadyExists {
            path: "Makefile".into(),
        };
        assert!(err.to_string().contains("--force"));
    }
}
