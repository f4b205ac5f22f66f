//! Mode registry: named documentation styles loaded once at process start.
//!
//! A mode definition is a YAML file with a template, guidelines, and a
//! department tag. Definitions are parsed into validated, immutable `Mode`
//! records at load time; a definition failing validation is skipped with a
//! logged warning rather than causing a lookup-time crash.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Department, OutputFormat};

/// A named documentation style. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    /// Identifier used in `start_task` requests, e.g. "bug_report".
    pub id: String,
    pub display_name: String,
    pub department: Department,
    /// Free-form system instruction text handed to the generator verbatim.
    pub system_instruction: String,
    /// Ordered guideline strings appended after the instruction.
    #[serde(default)]
    pub guidelines: Vec<String>,
    pub output_format: OutputFormat,
}

/// Raw on-disk form of a mode definition. Loosely typed on purpose so one
/// malformed field surfaces as a skipped definition, not a load crash.
#[derive(Debug, Deserialize)]
struct ModeDefinition {
    id: String,
    display_name: String,
    department: Department,
    system_instruction: String,
    #[serde(default)]
    guidelines: Vec<String>,
    #[serde(default = "default_output_format")]
    output_format: String,
}

fn default_output_format() -> String {
    "markdown".to_string()
}

impl ModeDefinition {
    fn validate(self) -> Result<Mode> {
        if self.id.trim().is_empty() {
            return Err(Error::Config("mode id is empty".to_string()));
        }
        if self.system_instruction.trim().is_empty() {
            return Err(Error::Config(format!(
                "mode '{}' has an empty system instruction",
                self.id
            )));
        }
        let output_format = match self.output_format.as_str() {
            "markdown" => OutputFormat::Markdown,
            other => {
                return Err(Error::Config(format!(
                    "mode '{}' has unrecognized output format '{}'",
                    self.id, other
                )))
            }
        };
        Ok(Mode {
            id: self.id,
            display_name: self.display_name,
            department: self.department,
            system_instruction: self.system_instruction,
            guidelines: self.guidelines,
            output_format,
        })
    }
}

/// Registry of validated modes, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ModeRegistry {
    /// Modes in load order. Lookup walks this; registries are small.
    modes: Vec<Mode>,
}

impl ModeRegistry {
    /// Build a registry from already-validated modes (tests, embedding).
    pub fn from_modes(modes: Vec<Mode>) -> Self {
        Self { modes }
    }

    /// Load all `*.yaml`/`*.yml` definitions from a directory.
    ///
    /// Files are read in lexicographic name order so catalog ordering is
    /// stable across restarts. Invalid definitions are skipped with a
    /// warning; an unreadable directory is a configuration error.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| Error::Config(format!("cannot read modes dir {}: {}", dir.display(), e)))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        entries.sort();

        let mut modes = Vec::new();
        for path in entries {
            match Self::load_file(&path) {
                Ok(mode) => {
                    debug!(mode_id = %mode.id, department = %mode.department, "Loaded mode");
                    modes.push(mode);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping invalid mode definition");
                }
            }
        }
        Ok(Self { modes })
    }

    fn load_file(path: &Path) -> Result<Mode> {
        let text = std::fs::read_to_string(path)?;
        let def: ModeDefinition = serde_yaml::from_str(&text)?;
        def.validate()
    }

    /// Look up a mode by identifier. An unregistered identifier is a caller
    /// error, never a partially-populated mode.
    pub fn get(&self, id: &str) -> Result<&Mode> {
        self.modes
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::ModeNotFound(id.to_string()))
    }

    /// Whether a mode id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.modes.iter().any(|m| m.id == id)
    }

    /// Catalog grouping: department tag to ordered list of modes. Order
    /// within a department is load order; downstream presentation depends
    /// on this contract.
    pub fn by_department(&self) -> BTreeMap<Department, Vec<&Mode>> {
        let mut grouped: BTreeMap<Department, Vec<&Mode>> = BTreeMap::new();
        for mode in &self.modes {
            grouped.entry(mode.department).or_default().push(mode);
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}
