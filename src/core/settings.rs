use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::engine::project;
use super::types::{LoanParameters, ProjectionResult};

pub const SETTINGS_KEY: &str = "studentloan_tracker_settings";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings could not be encoded: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings store is unavailable")]
    Unavailable,
}

/// Snapshot of the loan form as written to the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    pub principal: f64,
    pub annual_rate: f64,
    pub monthly_payment: f64,
    pub months_to_payoff: Option<u32>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        LoanParameters::default().into()
    }
}

impl From<LoanParameters> for PersistedSettings {
    fn from(params: LoanParameters) -> Self {
        Self {
            principal: params.principal,
            annual_rate: params.annual_rate_percent,
            monthly_payment: params.monthly_payment,
            months_to_payoff: params.target_months,
        }
    }
}

impl From<PersistedSettings> for LoanParameters {
    fn from(settings: PersistedSettings) -> Self {
        Self {
            principal: settings.principal,
            annual_rate_percent: settings.annual_rate,
            monthly_payment: settings.monthly_payment,
            target_months: settings.months_to_payoff,
        }
    }
}

impl PersistedSettings {
    /// Enough detail to draw a payoff chart.
    pub fn is_configured(&self) -> bool {
        self.principal > 0.0
            && (self.monthly_payment > 0.0 || self.months_to_payoff.is_some_and(|m| m > 0))
    }

    /// Whether a stored snapshot is usable on its own, judged only from the
    /// fields it actually carries. Defaults never fill the gaps here.
    pub fn stored_is_configured(raw: &str) -> bool {
        let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw) else {
            return false;
        };
        let positive = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_f64)
                .is_some_and(|v| v > 0.0)
        };
        positive("principal") && (positive("monthlyPayment") || positive("monthsToPayoff"))
    }

    /// Overlays fields from a stored JSON snapshot.
    ///
    /// Fields with the wrong JSON type are skipped and keep their current
    /// value. Text that is not a JSON object leaves everything unchanged.
    pub fn merged_with_json(mut self, raw: &str) -> Self {
        let object = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                warn!("stored loan settings are not a JSON object; ignoring");
                return self;
            }
            Err(e) => {
                warn!(error = %e, "stored loan settings are not valid JSON; ignoring");
                return self;
            }
        };

        if let Some(v) = object.get("principal").and_then(Value::as_f64) {
            self.principal = v;
        }
        if let Some(v) = object.get("annualRate").and_then(Value::as_f64) {
            self.annual_rate = v;
        }
        if let Some(v) = object.get("monthlyPayment").and_then(Value::as_f64) {
            self.monthly_payment = v;
        }
        match object.get("monthsToPayoff") {
            Some(Value::Null) => self.months_to_payoff = None,
            Some(v) => {
                if let Some(months) = v.as_u64().and_then(|m| u32::try_from(m).ok()) {
                    self.months_to_payoff = Some(months);
                }
            }
            None => {}
        }
        self
    }
}

/// Single-key persistence for the loan settings snapshot.
pub trait SettingsStore {
    fn load(&self) -> Result<Option<String>, SettingsError>;
    fn save(&self, raw: &str) -> Result<(), SettingsError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_key(dir, SETTINGS_KEY)
    }

    pub fn with_key(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<String>, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, raw: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, SettingsError> {
        let guard = self.raw.lock().map_err(|_| SettingsError::Unavailable)?;
        Ok(guard.clone())
    }

    fn save(&self, raw: &str) -> Result<(), SettingsError> {
        let mut guard = self.raw.lock().map_err(|_| SettingsError::Unavailable)?;
        *guard = Some(raw.to_string());
        Ok(())
    }
}

/// Committed settings plus an optional uncommitted draft.
///
/// The committed copy is read from the store once on open and only replaced
/// by `save` or by reloading on `cancel`.
#[derive(Debug)]
pub struct SettingsEditor<S> {
    store: S,
    committed: PersistedSettings,
    draft: Option<PersistedSettings>,
    configured: bool,
}

impl<S: SettingsStore> SettingsEditor<S> {
    pub fn open(store: S) -> Result<Self, SettingsError> {
        let raw = store.load()?;
        let (committed, configured) = match raw {
            Some(raw) => (
                PersistedSettings::default().merged_with_json(&raw),
                PersistedSettings::stored_is_configured(&raw),
            ),
            None => (PersistedSettings::default(), false),
        };
        Ok(Self {
            store,
            committed,
            draft: None,
            configured,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn committed(&self) -> PersistedSettings {
        self.committed
    }

    pub fn current(&self) -> PersistedSettings {
        self.draft.unwrap_or(self.committed)
    }

    /// Whether a usable snapshot has been saved.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn begin_edit(&mut self) -> &mut PersistedSettings {
        let committed = self.committed;
        self.draft.get_or_insert(committed)
    }

    pub fn draft_mut(&mut self) -> Option<&mut PersistedSettings> {
        self.draft.as_mut()
    }

    /// Writes the current settings wholesale and leaves edit mode.
    pub fn save(&mut self) -> Result<PersistedSettings, SettingsError> {
        let settings = self.current();
        let raw = serde_json::to_string(&settings)?;
        self.store.save(&raw)?;

        self.committed = settings;
        self.draft = None;
        self.configured = settings.is_configured();
        info!(
            principal = settings.principal,
            annual_rate = settings.annual_rate,
            configured = self.configured,
            "saved loan settings"
        );
        Ok(settings)
    }

    /// Drops the draft and re-reads the stored snapshot.
    pub fn cancel(&mut self) -> Result<(), SettingsError> {
        self.draft = None;
        if let Some(raw) = self.store.load()? {
            self.committed = self.committed.merged_with_json(&raw);
        }
        Ok(())
    }

    pub fn projection(&self) -> ProjectionResult {
        project(&self.current().into())
    }
}
