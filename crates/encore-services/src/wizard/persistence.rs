//! Durable storage for the in-progress wizard.
//!
//! The state is kept as a versioned JSON envelope:
//!
//! ```json
//! { "version": 1, "state": { "concertRef": { "id": "...", "isPending": false },
//!                            "content": "...", "currentStep": 3 } }
//! ```
//!
//! Version 0 is the flat layout written by earlier clients
//! (`concertId`, `isPendingConcert`, `reviewContent`, `currentStep`) and is migrated on load.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use encore_core::constants::WIZARD_STATE_VERSION;
use encore_core::{AppError, ConcertRef, EntityRef};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use super::WizardStep;

/// Key-value storage holding the serialised wizard. Last writer wins.
pub trait WizardStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;

    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;

    fn clear(&self, key: &str) -> Result<(), AppError>;
}

/// Stores each key as `{dir}/{key}.json`, replacing the file atomically.
#[derive(Debug, Clone)]
pub struct FileWizardStorage {
    dir: PathBuf,
}

impl FileWizardStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl WizardStorage for FileWizardStorage {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.ensure_dir()?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| AppError::from(e.error))?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AppError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryWizardStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryWizardStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, e.g. state written by an older client.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.put(key, value);
        storage
    }

    fn put(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl WizardStorage for MemoryWizardStorage {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.put(key, value);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AppError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// The persisted subset of the wizard. Staged images are session-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedWizard {
    pub concert_ref: Option<ConcertRef>,
    #[serde(default)]
    pub content: String,
    pub current_step: WizardStep,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    version: u32,
    state: &'a PersistedWizard,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    state: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyWizard {
    #[serde(default)]
    current_step: Option<u8>,
    #[serde(default)]
    concert_id: Option<String>,
    #[serde(default)]
    review_content: Option<String>,
    #[serde(default)]
    is_pending_concert: bool,
}

impl TryFrom<LegacyWizard> for PersistedWizard {
    type Error = String;

    fn try_from(legacy: LegacyWizard) -> Result<Self, Self::Error> {
        let current_step = match legacy.current_step {
            Some(step) => WizardStep::try_from(step)?,
            None => WizardStep::default(),
        };
        let concert_ref = match legacy.concert_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => {
                let id = Uuid::parse_str(id).map_err(|e| e.to_string())?;
                Some(EntityRef::new(id, legacy.is_pending_concert))
            }
        };

        Ok(PersistedWizard {
            concert_ref,
            content: legacy.review_content.unwrap_or_default(),
            current_step,
        })
    }
}

pub fn encode(state: &PersistedWizard) -> Result<String, AppError> {
    Ok(serde_json::to_string(&EnvelopeOut {
        version: WIZARD_STATE_VERSION,
        state,
    })?)
}

/// Decode a stored envelope. Any problem (bad JSON, unknown version, invalid field)
/// is reported as an error string for the caller to log; it is never fatal.
pub fn decode(raw: &str) -> Result<PersistedWizard, String> {
    let envelope: EnvelopeIn = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    match envelope.version {
        0 => {
            let legacy: LegacyWizard =
                serde_json::from_value(envelope.state).map_err(|e| e.to_string())?;
            PersistedWizard::try_from(legacy)
        }
        WIZARD_STATE_VERSION => {
            serde_json::from_value(envelope.state).map_err(|e| e.to_string())
        }
        other => Err(format!("unsupported wizard state version {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_versioned_envelope() {
        let id = Uuid::new_v4();
        let state = PersistedWizard {
            concert_ref: Some(EntityRef::Pending(id)),
            content: "great".to_string(),
            current_step: WizardStep::WriteReview,
        };
        let raw = encode(&state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["state"]["concertRef"]["id"], id.to_string());
        assert_eq!(value["state"]["concertRef"]["isPending"], true);
        assert_eq!(value["state"]["currentStep"], 3);
        assert_eq!(decode(&raw).unwrap(), state);
    }

    #[test]
    fn migrates_flat_legacy_layout() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"state":{{"currentStep":3,"concertId":"{}","reviewContent":"memo","isPendingConcert":true}},"version":0}}"#,
            id
        );
        let state = decode(&raw).unwrap();
        assert_eq!(state.concert_ref, Some(EntityRef::Pending(id)));
        assert_eq!(state.content, "memo");
        assert_eq!(state.current_step, WizardStep::WriteReview);
    }

    #[test]
    fn legacy_layout_without_concert_is_search_step() {
        let raw = r#"{"state":{"currentStep":1,"isPendingConcert":false},"version":0}"#;
        assert_eq!(decode(raw).unwrap(), PersistedWizard::default());
    }

    #[test]
    fn rejects_corrupt_and_unknown_versions() {
        assert!(decode("{not json").is_err());
        assert!(decode(r#"{"version":7,"state":{}}"#).is_err());
        assert!(decode(r#"{"version":1,"state":{"currentStep":9}}"#).is_err());
    }

    #[test]
    fn file_storage_round_trips_and_clears() {
        let dir = TempDir::new().unwrap();
        let storage = FileWizardStorage::new(dir.path().join("state"));

        assert_eq!(storage.load("k").unwrap(), None);
        storage.save("k", "one").unwrap();
        storage.save("k", "two").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("two"));
        assert_eq!(storage.path_for("k"), dir.path().join("state").join("k.json"));

        storage.clear("k").unwrap();
        storage.clear("k").unwrap();
        assert_eq!(storage.load("k").unwrap(), None);
    }
}
