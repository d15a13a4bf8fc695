//! Typed settings on either side of the synchronizer.
//!
//! [`ProjectDefaults`] holds a complete value for every Makefile key. Its
//! compiled defaults match the stock Padauk project; a `makefig.toml` file or
//! `MAKEFIG_*` environment variables can override any of them. It seeds new
//! Makefiles and fills gaps in incomplete ones.
//!
//! [`MakefileSettings`] is the typed view of what a particular Makefile
//! actually contains: every field is optional because any key may be absent.

use std::path::PathBuf;

use confique::Config;
use serde::Serialize;

use crate::error::MakefigError;
use crate::schema::Value;
use crate::sync::{LoadedFields, Updates};
use crate::validate;

#[derive(Config, Serialize, Debug, Clone, PartialEq)]
pub struct ProjectDefaults {
    /// Target microcontroller, e.g. PFS154 or PMS150C.
    #[config(env = "MAKEFIG_DEVICE", default = "PFS154")]
    pub device: String,

    /// Instruction-set architecture: pdk13, pdk14 or pdk15.
    #[config(env = "MAKEFIG_ARCH", default = "pdk14")]
    pub arch: String,

    /// Project name, used for output file names.
    #[config(env = "MAKEFIG_PROJECT_NAME", default = "MyProject")]
    pub project_name: String,

    /// CPU clock in Hz.
    #[config(env = "MAKEFIG_F_CPU", default = 8000000)]
    pub f_cpu: u64,

    /// Supply voltage in millivolts, used for oscillator calibration.
    #[config(env = "MAKEFIG_TARGET_VDD_MV", default = 5000)]
    pub target_vdd_mv: u64,

    /// Supply voltage in volts, passed to the programmer on `make run`.
    #[config(env = "MAKEFIG_TARGET_VDD", default = 5.0)]
    pub target_vdd: f64,

    /// Extra compiler flags.
    #[config(env = "MAKEFIG_OPT_FLAGS", default = "--opt-code-size")]
    pub opt_flags: String,
}

impl ProjectDefaults {
    /// Compiled defaults only.
    pub fn builtin() -> Result<Self, MakefigError> {
        Ok(Self::builder().load()?)
    }

    /// Load from the given files (priority-ascending, last wins) and,
    /// optionally, the environment, which beats every file. Files are
    /// checked strictly for unknown keys first.
    pub fn load_from(files: &[PathBuf], env: bool) -> Result<Self, MakefigError> {
        let mut builder = Self::builder();
        if env {
            builder = builder.env();
        }
        for path in files.iter().rev() {
            let content = std::fs::read_to_string(path).map_err(|e| MakefigError::ReadFailure {
                path: path.clone(),
                source: e,
            })?;
            validate::validate_unknown_settings::<Self>(&content, path)?;
            tracing::debug!(path = %path.display(), "using defaults file");
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    pub fn to_updates(&self) -> Updates {
        Updates::new()
            .set("DEVICE", self.device.as_str())
            .set("ARCH", self.arch.as_str())
            .set("PROJECT_NAME", self.project_name.as_str())
            .set("F_CPU", self.f_cpu)
            .set("TARGET_VDD_MV", self.target_vdd_mv)
            .set("TARGET_VDD", self.target_vdd)
            .set("OPT_FLAGS", Value::Text(self.opt_flags.clone()))
    }

    /// Commented TOML template for `makefig.toml`.
    pub fn template() -> String {
        confique::toml::template::<Self>(confique::toml::FormatOptions::default())
    }
}

/// Values found in one Makefile.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MakefileSettings {
    pub device: Option<String>,
    pub arch: Option<String>,
    pub project_name: Option<String>,
    pub f_cpu: Option<u64>,
    pub target_vdd_mv: Option<u64>,
    pub target_vdd: Option<f64>,
    pub opt_flags: Option<String>,
}

impl MakefileSettings {
    pub fn from_fields(fields: &LoadedFields) -> Self {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        let integer = |key: &str| fields.get(key).and_then(Value::as_integer);
        Self {
            device: text("DEVICE"),
            arch: text("ARCH"),
            project_name: text("PROJECT_NAME"),
            f_cpu: integer("F_CPU"),
            target_vdd_mv: integer("TARGET_VDD_MV"),
            target_vdd: fields.get("TARGET_VDD").and_then(Value::as_decimal),
            opt_flags: text("OPT_FLAGS"),
        }
    }

    /// Updates for the fields that are set.
    pub fn to_updates(&self) -> Updates {
        let mut updates = Updates::new();
        if let Some(v) = &self.device {
            updates.insert("DEVICE", v.as_str());
        }
        if let Some(v) = &self.arch {
            updates.insert("ARCH", v.as_str());
        }
        if let Some(v) = &self.project_name {
            updates.insert("PROJECT_NAME", v.as_str());
        }
        if let Some(v) = self.f_cpu {
            updates.insert("F_CPU", v);
        }
        if let Some(v) = self.target_vdd_mv {
            updates.insert("TARGET_VDD_MV", v);
        }
        if let Some(v) = self.target_vdd {
            updates.insert("TARGET_VDD", v);
        }
        if let Some(v) = &self.opt_flags {
            updates.insert("OPT_FLAGS", Value::Text(v.clone()));
        }
        updates
    }

    /// Fill every missing field from `defaults`.
    pub fn or_defaults(self, defaults: &ProjectDefaults) -> ProjectDefaults {
        ProjectDefaults {
            device: self.device.unwrap_or_else(|| defaults.device.clone()),
            arch: self.arch.unwrap_or_else(|| defaults.arch.clone()),
            project_name: self
                .project_name
                .unwrap_or_else(|| defaults.project_name.clone()),
            f_cpu: self.f_cpu.unwrap_or(defaults.f_cpu),
            target_vdd_mv: self.target_vdd_mv.unwrap_or(defaults.target_vdd_mv),
            target_vdd: self.target_vdd.unwrap_or(defaults.target_vdd),
            opt_flags: self.opt_flags.unwrap_or_else(|| defaults.opt_flags.clone()),
        }
    }
}
