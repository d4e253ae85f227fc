//! Encounter files
//!
//! An encounter file is a snapshot of the host document: the encounter
//! identity and round plus every participant's raw flag bag. YAML and
//! JSON are both accepted; the format follows the file extension.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PhaseKeeperError, ValidationIssue};
use crate::model::{Encounter, Participant, ParticipantId};
use crate::store::MemoryStore;
use crate::store::memory::FlagBag;

/// On-disk serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.yaml` / `.yml` and anything unrecognised
    Yaml,
    /// `.json`
    Json,
}

impl FileFormat {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// One participant entry with its raw flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantEntry {
    /// Participant id
    pub id: ParticipantId,
    /// Display name; defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Flag bag as persisted by the host
    #[serde(default, skip_serializing_if = "FlagBag::is_empty")]
    pub flags: FlagBag,
}

/// Serialized encounter snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncounterFile {
    /// Encounter id
    pub id: String,
    /// Current round
    #[serde(default)]
    pub round: u64,
    /// Participants in encounter order
    #[serde(default)]
    pub participants: Vec<ParticipantEntry>,
}

impl EncounterFile {
    /// Reads and validates an encounter file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read; `Config` if it does not parse or
    /// contains empty or duplicate participant ids.
    pub fn load(path: &Path) -> Result<Self, PhaseKeeperError> {
        let raw = std::fs::read_to_string(path)?;
        let file = Self::parse(&raw, FileFormat::from_path(path), path)?;
        debug!(path = %path.display(), participants = file.participants.len(), "encounter loaded");
        Ok(file)
    }

    /// Parses encounter text in the given format.
    ///
    /// # Errors
    ///
    /// `ConfigError::ParseError` for malformed input,
    /// `ConfigError::ValidationFailed` for bad participant ids.
    pub fn parse(raw: &str, format: FileFormat, origin: &Path) -> Result<Self, ConfigError> {
        let parsed = match format {
            FileFormat::Yaml => serde_yaml::from_str::<Self>(raw).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str::<Self>(raw).map_err(|e| e.to_string()),
        };
        let file = parsed.map_err(|message| ConfigError::ParseError {
            path: origin.to_path_buf(),
            message,
        })?;

        let issues = file.validate();
        if issues.is_empty() {
            Ok(file)
        } else {
            Err(ConfigError::ValidationFailed {
                path: origin.display().to_string(),
                issues,
            })
        }
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for (i, entry) in self.participants.iter().enumerate() {
            if entry.id.as_str().is_empty() {
                issues.push(ValidationIssue {
                    path: format!("participants[{i}].id"),
                    message: "participant id must not be empty".to_string(),
                });
            } else if !seen.insert(&entry.id) {
                issues.push(ValidationIssue {
                    path: format!("participants[{i}].id"),
                    message: format!("duplicate participant id '{}'", entry.id),
                });
            }
        }
        issues
    }

    /// Writes the file in the format matching `path`.
    ///
    /// # Errors
    ///
    /// Serialization or I/O failures.
    pub fn save(&self, path: &Path) -> Result<(), PhaseKeeperError> {
        std::fs::write(path, self.render(FileFormat::from_path(path))?)?;
        debug!(path = %path.display(), "encounter saved");
        Ok(())
    }

    /// Serializes the file.
    ///
    /// # Errors
    ///
    /// Serialization failures.
    pub fn render(&self, format: FileFormat) -> Result<String, PhaseKeeperError> {
        Ok(match format {
            FileFormat::Yaml => serde_yaml::to_string(self)?,
            FileFormat::Json => {
                let mut out = serde_json::to_string_pretty(self)?;
                out.push('\n');
                out
            }
        })
    }

    /// Splits the snapshot into an encounter and a populated store.
    #[must_use]
    pub fn into_session(self) -> (Encounter, MemoryStore) {
        let mut participants = Vec::with_capacity(self.participants.len());
        let mut bags = Vec::with_capacity(self.participants.len());
        for entry in self.participants {
            let name = entry.name.unwrap_or_else(|| entry.id.to_string());
            participants.push(Participant {
                id: entry.id.clone(),
                name,
            });
            bags.push((entry.id, entry.flags));
        }
        (
            Encounter::new(self.id, self.round, participants),
            MemoryStore::from_bags(bags),
        )
    }

    /// Rebuilds a snapshot from an encounter and the store's current bags.
    #[must_use]
    pub fn from_session(encounter: &Encounter, store: &MemoryStore) -> Self {
        Self {
            id: encounter.id.clone(),
            round: encounter.round,
            participants: encounter
                .participants
                .iter()
                .map(|p| ParticipantEntry {
                    id: p.id.clone(),
                    name: (p.name != p.id.as_str()).then(|| p.name.clone()),
                    flags: store.bag(&p.id),
                })
                .collect(),
        }
    }
}
