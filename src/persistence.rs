use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::columns::ColumnSettings;
use crate::paginator::PaginationCursor;

/// Name of the tab layout file inside the state directory
pub const STATE_FILE: &str = "tabs.json";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted configuration of one tab. Rows and tokens are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub cursor: PaginationCursor,
    #[serde(default)]
    pub column_settings: ColumnSettings,
}

/// Persisted tab layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    /// Id of the active tab
    pub active_tab: u64,
    pub tabs: Vec<TabSnapshot>,
}

/// Storage for the tab layout between sessions
pub trait StatePort {
    /// Load the last saved snapshot, `None` if nothing was saved yet
    fn load(&self) -> Result<Option<SessionSnapshot>>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// Stores the snapshot as JSON in the user cache directory
#[derive(Clone)]
pub struct FileStatePort {
    pub(crate) state_dir: PathBuf,
}

impl FileStatePort {
    /// Create a FileStatePort for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let state_dir = dirs::cache_dir()
            .ok_or_else(|| eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { state_dir })
    }

    /// Use `dir` instead of the user cache directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { state_dir: dir }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    /// Remove the saved snapshot, if any
    pub fn clear(&self) -> Result<()> {
        let path = self.state_file();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

impl StatePort for FileStatePort {
    fn load(&self) -> Result<Option<SessionSnapshot>> {
        let path = self.state_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let snapshot: SessionSnapshot = serde_json::from_str(&content)
            .map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(eyre!(
                "Saved tabs use format version {} but this build supports up to {}",
                snapshot.version,
                SNAPSHOT_VERSION
            ));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        let json = serde_json::to_string_pretty(snapshot)?;

        use fs2::FileExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.state_file())?;

        file.lock_exclusive()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.unlock()?;

        Ok(())
    }
}
