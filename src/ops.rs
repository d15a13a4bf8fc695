//! Document operations behind `config list`, `config get` and friends, and the
//! [`ConfigResult`] enum callers use to display results.

use std::fmt;
use std::path::PathBuf;

use crate::devices::Device;
use crate::error::MakefigError;
use crate::sync::{FieldReport, FieldStatus, Synchronizer};

/// Result of an operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// Every recognized key with its status in the document.
    Listing { entries: Vec<FieldReport> },
    /// Same, as JSON.
    Json(serde_json::Value),
    /// One key's value and the line it was found on.
    KeyValue {
        key: String,
        value: String,
        line: usize,
    },
    /// Keys whose assignment lines were rewritten, and keys that had none.
    Updated {
        applied: Vec<String>,
        skipped: Vec<String>,
    },
    /// A seed document was written.
    DocumentCreated { path: PathBuf },
    /// A generated document or template.
    Template(String),
    /// Confirmation that a template was written to a file.
    TemplateWritten { path: PathBuf },
    /// The device catalogue.
    Devices(Vec<Device>),
    /// A `make` run finished.
    MakeFinished {
        target: String,
        code: Option<i32>,
        success: bool,
    },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Listing { entries } => {
                for (i, report) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    match &report.status {
                        FieldStatus::Found { value, .. } => write!(f, "{} = {value}", report.key)?,
                        FieldStatus::NotFound => write!(f, "{} = <not set>", report.key)?,
                        FieldStatus::Mismatch { raw, expected, .. } => {
                            write!(f, "{} = {raw}  <not a valid {expected}>", report.key)?
                        }
                    }
                }
                Ok(())
            }
            ConfigResult::Json(value) => {
                let text = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                write!(f, "{text}")
            }
            ConfigResult::KeyValue { key, value, line } => {
                write!(f, "{key} = {value}  (line {line})")
            }
            ConfigResult::Updated { applied, skipped } => {
                if applied.is_empty() {
                    write!(f, "Nothing updated")?;
                } else {
                    write!(f, "Updated {}", applied.join(", "))?;
                }
                if !skipped.is_empty() {
                    write!(f, "\nNot in document, skipped: {}", skipped.join(", "))?;
                }
                Ok(())
            }
            ConfigResult::DocumentCreated { path } => {
                write!(f, "Created {} with default values", path.display())
            }
            ConfigResult::Template(t) => write!(f, "{t}"),
            ConfigResult::TemplateWritten { path } => {
                write!(f, "Template written to {}", path.display())
            }
            ConfigResult::Devices(devices) => {
                write!(f, "{:<10} {:>6} {:>6}", "DEVICE", "ROM", "RAM")?;
                for d in devices {
                    write!(f, "\n{:<10} {:>6} {:>6}", d.name, d.rom, d.ram)?;
                }
                Ok(())
            }
            ConfigResult::MakeFinished {
                target,
                code,
                success,
            } => match (success, code) {
                (true, _) => write!(f, "make {target}: ok"),
                (false, Some(c)) => write!(f, "make {target}: failed with exit code {c}"),
                (false, None) => write!(f, "make {target}: terminated by signal"),
            },
        }
    }
}

/// Status of every recognized key.
pub fn list_fields(sync: &Synchronizer, text: &str, json: bool) -> Result<ConfigResult, MakefigError> {
    let entries = sync.inspect(text);
    if json {
        let value = serde_json::to_value(&entries).map_err(|e| MakefigError::InvalidValue {
            key: "<list>".into(),
            reason: e.to_string(),
        })?;
        return Ok(ConfigResult::Json(value));
    }
    Ok(ConfigResult::Listing { entries })
}

/// One key's parsed value. Fails on unknown keys, keys absent from the
/// document, and values that don't fit their class.
pub fn get_field(sync: &Synchronizer, text: &str, key: &str) -> Result<ConfigResult, MakefigError> {
    if sync.schema().field(key).is_none() {
        return Err(MakefigError::UnknownKey(key.into()));
    }
    let report = sync
        .inspect(text)
        .into_iter()
        .find(|r| r.key == key)
        .ok_or_else(|| MakefigError::KeyNotFound(key.into()))?;

    match report.status {
        FieldStatus::Found { value, line } => Ok(ConfigResult::KeyValue {
            key: key.into(),
            value: value.to_string(),
            line,
        }),
        FieldStatus::NotFound => Err(MakefigError::KeyNotFound(key.into())),
        FieldStatus::Mismatch { raw, expected, .. } => Err(MakefigError::TypeMismatch {
            key: key.into(),
            raw,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::SAMPLE_MAKEFILE;
    use crate::schema::Schema;

    fn sync() -> Synchronizer {
        Synchronizer::new(Schema::makefile())
    }

    #[test]
    fn get_found_key() {
        let result = get_field(&sync(), SAMPLE_MAKEFILE, "F_CPU").unwrap();
        assert_eq!(
            result,
            ConfigResult::KeyValue {
                key: "F_CPU".into(),
                value: "8000000".into(),
                line: 8,
            }
        );
    }

    #[test]
    fn get_free_text_key() {
        match get_field(&sync(), SAMPLE_MAKEFILE, "OPT_FLAGS").unwrap() {
            ConfigResult::KeyValue { value, .. } => {
                assert_eq!(value, "--opt-code-size --fverbose-asm")
            }
            other => panic!("Expected KeyValue, got {other:?}"),
        }
    }

    #[test]
    fn get_absent_key() {
        let err = get_field(&sync(), "DEVICE = PFS154\n", "F_CPU").unwrap_err();
        assert!(matches!(err, MakefigError::KeyNotFound(k) if k == "F_CPU"));
    }

    #[test]
    fn get_unrecognized_key() {
        let err = get_field(&sync(), SAMPLE_MAKEFILE, "BUILD_DIR").unwrap_err();
        assert!(matches!(err, MakefigError::UnknownKey(_)));
    }

    #[test]
    fn get_mismatched_key() {
        let err = get_field(&sync(), "F_CPU = 8MHz\n", "F_CPU").unwrap_err();
        assert!(matches!(err, MakefigError::TypeMismatch { .. }));
    }

    #[test]
    fn listing_display_format() {
        let result = list_fields(&sync(), "F_CPU = 1000000\nDEVICE = PFS173\nARCH = ?? x\nTARGET_VDD = high\n", false)
            .unwrap();
        let display = result.to_string();
        let lines: Vec<&str> = display.lines().collect();
        assert_eq!(lines[0], "DEVICE = PFS173");
        assert_eq!(lines[1], "ARCH = ??");
        assert_eq!(lines[2], "PROJECT_NAME = <not set>");
        assert_eq!(lines[3], "F_CPU = 1000000");
        assert_eq!(lines[5], "TARGET_VDD = high  <not a valid decimal>");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn listing_json() {
        let result = list_fields(&sync(), SAMPLE_MAKEFILE, true).unwrap();
        let ConfigResult::Json(value) = result else {
            panic!("Expected Json");
        };
        let first = &value[0];
        assert_eq!(first["key"], "DEVICE");
        assert_eq!(first["status"], "found");
        assert_eq!(first["value"], "PFS154");
        assert_eq!(first["line"], 5);
        let f_cpu = value
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["key"] == "F_CPU")
            .unwrap();
        assert_eq!(f_cpu["value"], 8_000_000);
    }

    #[test]
    fn updated_display_lists_skipped() {
        let result = ConfigResult::Updated {
            applied: vec!["DEVICE".into()],
            skipped: vec!["F_CPU".into()],
        };
        assert_eq!(
            result.to_string(),
            "Updated DEVICE\nNot in document, skipped: F_CPU"
        );
    }

    #[test]
    fn make_finished_display() {
        let ok = ConfigResult::MakeFinished {
            target: "build".into(),
            code: Some(0),
            success: true,
        };
        assert_eq!(ok.to_string(), "make build: ok");
        let failed = ConfigResult::MakeFinished {
            target: "program".into(),
            code: Some(2),
            success: false,
        };
        assert!(failed.to_string().contains("exit code 2"));
    }
}
