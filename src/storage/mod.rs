// Storage module - the client-local key/value store
//
// Survives restarts the way browser local storage survives a page reload.
// Entries live in a single JSON object on disk:
//
//   ~/.local/share/cdr-dash/session.json
//   {"cdr-refresh": "...", "cdr-token": "..."}
//
// Writes go through `save()`, which rewrites the whole file.

use crate::auth::TokenPair;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Access token persisted by login and signup
pub const TOKEN_KEY: &str = "cdr-token";

/// Refresh token persisted by signup
pub const REFRESH_KEY: &str = "cdr-refresh";

/// Persistent key/value store for session credentials
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SessionStore {
    /// Default store location under the platform data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("cdr-dash").join("session.json"))
    }

    /// Open the store at the default location
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().context("Could not determine data directory")?;
        Self::open(path)
    }

    /// Open a store file; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse session store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session store {}", path.display()))
            }
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Write all entries to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create session store directory")?;
        }
        let json =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize session")?;
        fs::write(&self.path, json).context("Failed to write session store")?;
        Ok(())
    }

    /// Persist a token pair (`cdr-token`, and `cdr-refresh` when present)
    pub fn persist_tokens(&mut self, tokens: &TokenPair) -> Result<()> {
        self.set(TOKEN_KEY, tokens.access_token.clone());
        match &tokens.refresh_token {
            Some(refresh) => self.set(REFRESH_KEY, refresh.clone()),
            None => {
                self.remove(REFRESH_KEY);
            }
        }
        self.save()
    }

    /// Logout: drop both credential keys and save
    pub fn clear_tokens(&mut self) -> Result<()> {
        self.remove(TOKEN_KEY);
        self.remove(REFRESH_KEY);
        self.save()
    }
}
