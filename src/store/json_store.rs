use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;

use crate::config;
use crate::store::schema::{SAVE_VERSION, SaveFile};
use crate::tutor::session::Session;

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(config::data_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.base_dir.join("saves")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Default save path for a lesson variant, e.g. `saves/kids.json`.
    pub fn default_save_path(&self, name: &str) -> PathBuf {
        self.saves_dir().join(format!("{name}.json"))
    }

    /// Write the session atomically: a `.tmp` sibling is synced, then renamed.
    pub fn save_session(&self, path: &Path, session: &Session) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = SaveFile::from_session(session);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(&data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, path)?;
        log::info!("saved {} turns to {}", session.transcript.len(), path.display());
        Ok(())
    }

    pub fn load_session(&self, path: &Path) -> Result<Session> {
        let content = fs::read_to_string(path)?;
        let data: SaveFile = serde_json::from_str(&content)?;
        if data.kaiwa_save_version > SAVE_VERSION {
            bail!(
                "Unsupported save version: {} (expected {})",
                data.kaiwa_save_version,
                SAVE_VERSION
            );
        }
        Ok(data.into_session())
    }

    /// Write the readable log under `exports/` and return its path.
    pub fn export_log(&self, session: &Session) -> Result<PathBuf> {
        let dir = self.exports_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.txt", Utc::now().format("%Y%m%d-%H%M%S")));
        fs::write(&path, session.transcript.exportable_log(session.variant()))?;
        Ok(path)
    }
}
