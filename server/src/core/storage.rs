//! Data root resolution.
//!
//! TrendRadar lays out state per-day rather than per-backend-type: every
//! calendar date owns one folder under the data root, holding `news.db` plus
//! optional `txt/` and `html/` subfolders (§4.4, §6). `AppStorage` resolves
//! and creates that root; day folders themselves are created lazily by the
//! local storage backend on first write.

use std::path::{Path, PathBuf};

use crate::core::constants::{APP_DOT_FOLDER, APP_NAME, ENV_DATA_DIR};

/// Per-day subdirectories that may exist alongside `news.db`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySubdir {
    Txt,
    Html,
}

impl DaySubdir {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaySubdir::Txt => "txt",
            DaySubdir::Html => "html",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Resolve the data root and ensure it exists.
    pub fn init(project_root: Option<&Path>) -> std::io::Result<Self> {
        let data_dir = Self::resolve_data_dir(project_root);
        std::fs::create_dir_all(&data_dir)?;
        tracing::debug!(path = %data_dir.display(), "data root resolved");
        Ok(Self { data_dir })
    }

    /// Resolution order: `TRENDRADAR_DATA_DIR` env override, else
    /// `<project_root>/.trendradar`, else the platform data directory via
    /// `directories::ProjectDirs`, else `./.trendradar` in the current
    /// working directory.
    pub(crate) fn resolve_data_dir(project_root: Option<&Path>) -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }

        if let Some(root) = project_root {
            return root.join(APP_DOT_FOLDER);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", APP_NAME) {
            return dirs.data_dir().to_path_buf();
        }

        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(APP_DOT_FOLDER)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root folder for a given calendar date (`YYYY-MM-DD`), created on demand.
    pub fn day_dir(&self, date: &str) -> PathBuf {
        self.data_dir.join(date)
    }

    pub fn day_db_path(&self, date: &str) -> PathBuf {
        self.day_dir(date)
            .join(crate::core::constants::SQLITE_DB_FILENAME)
    }

    pub fn day_subdir(&self, date: &str, subdir: DaySubdir) -> PathBuf {
        self.day_dir(date).join(subdir.as_str())
    }

    pub fn ensure_day_dir(&self, date: &str) -> std::io::Result<PathBuf> {
        let dir = self.day_dir(date);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// List every day folder present, as raw folder-name strings (both the
    /// canonical `YYYY-MM-DD` form and any legacy `YYYY年MM月DD日` form the
    /// caller is expected to normalize via [`crate::domain::time`]).
    pub fn list_day_folders(&self) -> std::io::Result<Vec<String>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    out.push(name.to_string());
                }
            }
        }
        Ok(out)
    }

    #[cfg(test)]
    pub fn init_for_test() -> (Self, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let storage = Self {
            data_dir: tmp.path().to_path_buf(),
        };
        (storage, tmp)
    }

    /// Point an `AppStorage` at an arbitrary directory. Used by the remote
    /// backend (§4.5) to stand up a private day-store layout inside a
    /// `tempfile::TempDir` shadow, reusing [`crate::data::local::LocalStorageBackend`]
    /// instead of duplicating its schema and query logic.
    pub(crate) fn from_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_paths_are_scoped_under_the_date_folder() {
        let (storage, _tmp) = AppStorage::init_for_test();
        let db = storage.day_db_path("2025-11-26");
        assert!(db.ends_with("2025-11-26/news.db"));
        let txt = storage.day_subdir("2025-11-26", DaySubdir::Txt);
        assert!(txt.ends_with("2025-11-26/txt"));
    }

    #[test]
    fn ensure_day_dir_creates_the_folder() {
        let (storage, _tmp) = AppStorage::init_for_test();
        let dir = storage.ensure_day_dir("2025-01-01").unwrap();
        assert!(dir.is_dir());
    }
}
