//! Document persistence: read a Makefile, patch it through the synchronizer,
//! write it back.
//!
//! The synchronizer never touches the filesystem; these wrappers do, and turn
//! I/O failures into [`MakefigError::DocumentMissing`],
//! [`MakefigError::ReadFailure`] or [`MakefigError::WriteFailure`].

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::MakefigError;
use crate::ops::ConfigResult;
use crate::sync::{Synchronizer, Updates};

/// How a document is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and rewrite in place. A failure midway can leave the file
    /// partially written.
    #[default]
    Direct,
    /// Write a temporary file next to the target, then rename it over the
    /// target.
    Atomic,
}

/// Read a whole document. A missing file is [`MakefigError::DocumentMissing`]
/// so the caller can decide whether to seed a default one.
pub fn read_document(path: &Path) -> Result<String, MakefigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MakefigError::DocumentMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(MakefigError::ReadFailure {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn write_document(path: &Path, text: &str, mode: WriteMode) -> Result<(), MakefigError> {
    let failure = |source: std::io::Error| MakefigError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    match mode {
        WriteMode::Direct => std::fs::write(path, text).map_err(failure)?,
        WriteMode::Atomic => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut tmp = NamedTempFile::new_in(dir).map_err(failure)?;
            tmp.write_all(text.as_bytes()).map_err(failure)?;
            tmp.as_file().sync_all().map_err(failure)?;
            tmp.persist(path).map_err(|e| failure(e.error))?;
        }
    }
    tracing::info!(path = %path.display(), ?mode, bytes = text.len(), "wrote document");
    Ok(())
}

/// Read `path`, apply `updates`, write the result back.
///
/// The file is only rewritten when the text actually changed.
pub fn update_file(
    path: &Path,
    sync: &Synchronizer,
    updates: &Updates,
    mode: WriteMode,
) -> Result<ConfigResult, MakefigError> {
    let original = read_document(path)?;
    let updated = sync.apply(&original, updates)?;

    let present: Vec<String> = sync
        .assignments(&original)
        .into_iter()
        .map(|a| a.key.to_string())
        .collect();
    let (applied, skipped): (Vec<String>, Vec<String>) = updates
        .iter()
        .map(|(k, _)| k.to_string())
        .partition(|k| present.contains(k));

    if updated != original {
        write_document(path, &updated, mode)?;
    }

    Ok(ConfigResult::Updated { applied, skipped })
}

/// Write the seed document to `path`. Refuses to replace an existing file
/// unless `overwrite` is set. Creates parent directories as needed.
pub fn init_file(
    path: &Path,
    sync: &Synchronizer,
    defaults: &Updates,
    overwrite: bool,
    mode: WriteMode,
) -> Result<ConfigResult, MakefigError> {
    if path.exists() && !overwrite {
        return Err(MakefigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let text = sync.render_default(defaults)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| MakefigError::WriteFailure {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    write_document(path, &text, mode)?;
    Ok(ConfigResult::DocumentCreated {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{SAMPLE_MAKEFILE, makefile_defaults};
    use crate::schema::{Schema, Value};
    use std::fs;
    use tempfile::TempDir;

    fn sync() -> Synchronizer {
        Synchronizer::new(Schema::makefile())
    }

    #[test]
    fn read_missing_is_document_missing() {
        let dir = TempDir::new().unwrap();
        let err = read_document(&dir.path().join("Makefile")).unwrap_err();
        assert!(matches!(err, MakefigError::DocumentMissing { .. }));
    }

    #[test]
    fn read_directory_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let err = read_document(dir.path()).unwrap_err();
        assert!(matches!(err, MakefigError::ReadFailure { .. }));
    }

    #[test]
    fn write_into_missing_dir_is_write_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no").join("such").join("Makefile");
        for mode in [WriteMode::Direct, WriteMode::Atomic] {
            let err = write_document(&path, "x", mode).unwrap_err();
            assert!(matches!(err, MakefigError::WriteFailure { .. }));
        }
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, "old\n").unwrap();

        write_document(&path, "new\n", WriteMode::Atomic).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        // Only the target remains; the temp file was renamed onto it.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn update_modifies_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, SAMPLE_MAKEFILE).unwrap();

        let updates = Updates::new().set("F_CPU", 16_000_000u64);
        let result = update_file(&path, &sync(), &updates, WriteMode::Direct).unwrap();
        assert_eq!(
            result,
            ConfigResult::Updated {
                applied: vec!["F_CPU".into()],
                skipped: vec![],
            }
        );

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("F_CPU = 16000000\n"));
        assert!(!content.contains("8000000\n"));
        assert!(content.contains("-DF_CPU=$(F_CPU)"));
    }

    #[test]
    fn update_reports_skipped_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, "DEVICE = PFS154\n").unwrap();

        let updates = Updates::new()
            .set("DEVICE", "PFS173")
            .set("F_CPU", 1_000_000u64);
        let result = update_file(&path, &sync(), &updates, WriteMode::Atomic).unwrap();
        match result {
            ConfigResult::Updated { applied, skipped } => {
                assert_eq!(applied, vec!["DEVICE".to_string()]);
                assert_eq!(skipped, vec!["F_CPU".to_string()]);
            }
            other => panic!("Expected Updated, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "DEVICE = PFS173\n");
    }

    #[test]
    fn update_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        let err = update_file(&path, &sync(), &Updates::new(), WriteMode::Direct).unwrap_err();
        assert!(matches!(err, MakefigError::DocumentMissing { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn rejected_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, SAMPLE_MAKEFILE).unwrap();

        let updates = Updates::new().set("OPT_FLAGS", Value::Text("-DX=1".into()));
        assert!(update_file(&path, &sync(), &updates, WriteMode::Direct).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_MAKEFILE);
    }

    #[test]
    fn init_creates_file_and_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proj").join("Makefile");

        let result =
            init_file(&path, &sync(), &makefile_defaults(), false, WriteMode::Direct).unwrap();
        assert!(matches!(result, ConfigResult::DocumentCreated { .. }));

        let fields = sync().load(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(fields.missing().count(), 0);
    }

    #[test]
    fn init_refuses_to_clobber() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, "keep me\n").unwrap();

        let err = init_file(&path, &sync(), &makefile_defaults(), false, WriteMode::Direct)
            .unwrap_err();
        assert!(matches!(err, MakefigError::AlreadyExists { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");

        init_file(&path, &sync(), &makefile_defaults(), true, WriteMode::Atomic).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("PROJECT_NAME = MyProject"));
    }
}
