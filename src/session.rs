use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::Side;

/// Every key the console ever persists. Logout enumerates this registry, so
/// adding a key here is the only step needed to keep it from leaking across
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    /// Shared bearer token for every authenticated call.
    AccessToken,
    /// One-shot toast message consumed on the first workspace render.
    LoginToast,
    /// Per-side connection form, including transfer sub-credentials and
    /// dropdown selections.
    ConnectionForm,
    /// Per-side selected queue-manager names.
    SelectedQueues,
    /// Per-side connected flag.
    Connected,
    /// Per-side connection-tested flag.
    TestDone,
    /// Per-side operation-completed flag.
    OperationDone,
}

impl SessionKey {
    pub const SHARED: [SessionKey; 2] = [SessionKey::AccessToken, SessionKey::LoginToast];
    pub const PER_SIDE: [SessionKey; 5] = [
        SessionKey::ConnectionForm,
        SessionKey::SelectedQueues,
        SessionKey::Connected,
        SessionKey::TestDone,
        SessionKey::OperationDone,
    ];

    fn base_name(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "accessToken",
            SessionKey::LoginToast => "loginToast",
            SessionKey::ConnectionForm => "form",
            SessionKey::SelectedQueues => "selectedQueues",
            SessionKey::Connected => "connected",
            SessionKey::TestDone => "testDone",
            SessionKey::OperationDone => "operationDone",
        }
    }

    fn entry_name(&self, side: Option<Side>) -> String {
        match side {
            Some(side) => format!("{}.{}", side.as_str(), self.base_name()),
            None => self.base_name().to_string(),
        }
    }
}

/// Durable key-value mirror of the workflow state. Loaded once at startup;
/// in-memory state is authoritative afterwards and every change that should
/// survive a restart is written through.
pub struct SessionRepository {
    path: Option<PathBuf>,
    values: BTreeMap<String, Value>,
}

impl SessionRepository {
    /// Load the store from `<state_dir>/session.json`. A missing or
    /// malformed file starts an empty session.
    pub fn open(state_dir: &Path) -> Self {
        let path = state_dir.join("session.json");
        let values = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(err) => {
                    warn!(%err, path = %path.display(), "discarding malformed session file");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            values,
        }
    }

    /// Volatile store for tests.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: BTreeMap::new(),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: SessionKey, side: Option<Side>) -> Option<T> {
        let value = self.values.get(&key.entry_name(side))?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn get_bool(&self, key: SessionKey, side: Option<Side>) -> bool {
        self.get::<bool>(key, side).unwrap_or(false)
    }

    pub fn set<T: Serialize>(&mut self, key: SessionKey, side: Option<Side>, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.values.insert(key.entry_name(side), value);
                self.flush();
            }
            Err(err) => warn!(%err, "failed to serialize session value"),
        }
    }

    pub fn remove(&mut self, key: SessionKey, side: Option<Side>) {
        if self.values.remove(&key.entry_name(side)).is_some() {
            self.flush();
        }
    }

    /// Take a value out of the store, removing it. Used for one-shot keys.
    pub fn take<T: DeserializeOwned>(&mut self, key: SessionKey, side: Option<Side>) -> Option<T> {
        let value = self.get(key, side);
        if value.is_some() {
            self.remove(key, side);
        }
        value
    }

    /// Logout: remove every registered key, shared and per-side.
    pub fn clear_all(&mut self) {
        for key in SessionKey::SHARED {
            self.values.remove(&key.entry_name(None));
        }
        for key in SessionKey::PER_SIDE {
            for side in [Side::Source, Side::Destination] {
                self.values.remove(&key.entry_name(Some(side)));
            }
        }
        self.flush();
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_string_pretty(&self.values)
            .map_err(|err| err.to_string())
            .and_then(|text| fs::write(path, text).map_err(|err| err.to_string()));
        if let Err(err) = result {
            warn!(%err, path = %path.display(), "failed to persist session");
        }
    }
}
