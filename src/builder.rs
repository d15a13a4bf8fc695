use std::path::PathBuf;

use crate::error::MakefigError;
use crate::file;
use crate::ops::{self, ConfigResult};
use crate::persist::{self, WriteMode};
use crate::runner::{self, CommandRunner, OutputChunk, ProcessRunner};
use crate::schema::{DecimalFormat, Schema, Value};
use crate::settings::ProjectDefaults;
use crate::sync::{Synchronizer, Updates};
use crate::types::{Boundary, ConfigAction, SearchPath};

const APP_NAME: &str = "makefig";
const DEFAULTS_FILE: &str = "makefig.toml";

/// Entry point.
pub struct Makefig;

impl Makefig {
    pub fn builder() -> MakefigBuilder {
        MakefigBuilder::new()
    }
}

/// Builder for running [`ConfigAction`]s against one Makefile.
///
/// - **Document**: [`makefile()`](Self::makefile) names it explicitly;
///   otherwise the nearest `Makefile` at or above
///   [`start_dir()`](Self::start_dir) (default: the working directory) is
///   used, bounded by [`boundary()`](Self::boundary).
/// - **Defaults**: `makefig.toml` in each of
///   [`defaults_paths()`](Self::defaults_paths), then `MAKEFIG_*` environment
///   variables unless [`no_env()`](Self::no_env).
/// - **Writes**: [`write_mode()`](Self::write_mode) chooses in-place or
///   atomic replacement.
pub struct MakefigBuilder {
    makefile: Option<PathBuf>,
    file_name: String,
    start_dir: Option<PathBuf>,
    boundary: Boundary,
    defaults_paths: Vec<SearchPath>,
    env_enabled: bool,
    write_mode: WriteMode,
    decimal_format: DecimalFormat,
    make_program: String,
}

impl MakefigBuilder {
    fn new() -> Self {
        Self {
            makefile: None,
            file_name: "Makefile".into(),
            start_dir: None,
            boundary: Boundary::Marker(".git"),
            defaults_paths: vec![
                SearchPath::Platform,
                SearchPath::Home(".makefig"),
                SearchPath::Cwd,
            ],
            env_enabled: true,
            write_mode: WriteMode::default(),
            decimal_format: DecimalFormat::default(),
            make_program: "make".into(),
        }
    }

    /// Use this Makefile instead of searching for one.
    pub fn makefile(mut self, path: impl Into<PathBuf>) -> Self {
        self.makefile = Some(path.into());
        self
    }

    /// Override the searched-for file name (default: `"Makefile"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    pub fn start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    /// Where the upward Makefile search stops (default: `Marker(".git")`).
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Replace the directories searched for `makefig.toml`, listed in
    /// priority-ascending order.
    pub fn defaults_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.defaults_paths = paths;
        self
    }

    /// Ignore `MAKEFIG_*` environment variables.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn decimal_format(mut self, format: DecimalFormat) -> Self {
        self.decimal_format = format;
        self
    }

    /// Program invoked for make targets (default: `"make"`).
    pub fn make_program(mut self, program: &str) -> Self {
        self.make_program = program.to_string();
        self
    }

    fn synchronizer(&self) -> Synchronizer {
        Synchronizer::new(Schema::makefile()).decimal_format(self.decimal_format)
    }

    /// The Makefile actions operate on. When nothing is found, points at
    /// `{start_dir}/{file_name}` so `init` knows where to create it.
    pub fn document_path(&self) -> PathBuf {
        if let Some(path) = &self.makefile {
            return path.clone();
        }
        let start = self
            .start_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        file::find_document(&start, &self.file_name, &self.boundary)
            .unwrap_or_else(|| start.join(&self.file_name))
    }

    /// Resolve project defaults through compiled values, defaults files and
    /// environment.
    pub fn load_defaults(&self) -> Result<ProjectDefaults, MakefigError> {
        let files = file::existing_files(&self.defaults_paths, DEFAULTS_FILE, APP_NAME);
        ProjectDefaults::load_from(&files, self.env_enabled)
    }

    /// Handle an action, discarding any command output.
    pub fn handle(&self, action: &ConfigAction) -> Result<ConfigResult, MakefigError> {
        self.handle_with(action, |_| {})
    }

    /// Handle an action, passing each line of command output to `on_output`
    /// as it arrives.
    pub fn handle_with(
        &self,
        action: &ConfigAction,
        mut on_output: impl FnMut(&OutputChunk),
    ) -> Result<ConfigResult, MakefigError> {
        let sync = self.synchronizer();
        match action {
            ConfigAction::List { json } => {
                let text = persist::read_document(&self.document_path())?;
                ops::list_fields(&sync, &text, *json)
            }
            ConfigAction::Get { key } => {
                let text = persist::read_document(&self.document_path())?;
                ops::get_field(&sync, &text, key)
            }
            ConfigAction::Set { pairs } => {
                let updates = parse_updates(sync.schema(), pairs)?;
                persist::update_file(&self.document_path(), &sync, &updates, self.write_mode)
            }
            ConfigAction::Gen { output } => {
                let defaults = self.load_defaults()?.to_updates();
                let text = sync.render_default(&defaults)?;
                match output {
                    Some(path) => {
                        persist::write_document(path, &text, self.write_mode)?;
                        Ok(ConfigResult::TemplateWritten { path: path.clone() })
                    }
                    None => Ok(ConfigResult::Template(text)),
                }
            }
            ConfigAction::Init { force } => {
                let defaults = self.load_defaults()?.to_updates();
                persist::init_file(
                    &self.document_path(),
                    &sync,
                    &defaults,
                    *force,
                    self.write_mode,
                )
            }
            ConfigAction::Defaults => Ok(ConfigResult::Template(ProjectDefaults::template())),
            ConfigAction::Devices => Ok(ConfigResult::Devices(crate::devices::DEVICES.to_vec())),
            ConfigAction::Make { target } => {
                let path = self.document_path();
                if !path.is_file() {
                    return Err(MakefigError::DocumentMissing { path });
                }
                let file_name = path.file_name().map(PathBuf::from);
                let (_, args) = runner::make_invocation(*target, file_name.as_deref());

                let mut runner = ProcessRunner::new();
                if let Some(dir) = path.parent()
                    && !dir.as_os_str().is_empty()
                {
                    runner = runner.working_dir(dir);
                }
                let mut stream = runner.spawn(&self.make_program, &args)?;
                for chunk in stream.by_ref() {
                    on_output(&chunk);
                }
                let status = stream.finish()?;
                Ok(ConfigResult::MakeFinished {
                    target: target.to_string(),
                    code: status.code(),
                    success: status.success(),
                })
            }
        }
    }
}

/// Parse raw `KEY VALUE` text pairs by each key's class.
pub fn parse_updates(schema: &Schema, pairs: &[(String, String)]) -> Result<Updates, MakefigError> {
    let mut updates = Updates::new();
    for (key, raw) in pairs {
        let field = schema
            .field(key)
            .ok_or_else(|| MakefigError::UnknownKey(key.clone()))?;
        let value: Value = field
            .kind
            .parse(raw)
            .map_err(|expected| MakefigError::TypeMismatch {
                key: key.clone(),
                raw: raw.clone(),
                expected,
            })?;
        updates.insert(key, value);
    }
    Ok(updates)
}
