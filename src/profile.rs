use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The two locally persisted scalars: personal best average and the last
/// submitted player name. Corrupt or missing data degrades to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub best_average_ms: Option<u32>,
    pub player_name: Option<String>,
}

impl Profile {
    /// Record a session average; returns true when it is a new best.
    pub fn record_average(&mut self, average_ms: u32) -> bool {
        match self.best_average_ms {
            Some(best) if best <= average_ms => false,
            _ => {
                self.best_average_ms = Some(average_ms);
                true
            }
        }
    }
}

pub trait ProfileStore {
    fn load(&self) -> Profile;
    fn save(&self, profile: &Profile) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "reflex") {
            pd.config_dir().join("profile.json")
        } else {
            PathBuf::from("reflex_profile.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> Profile {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(profile) = serde_json::from_slice::<Profile>(&bytes) {
                return profile;
            }
        }
        Profile::default()
    }

    fn save(&self, profile: &Profile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(profile).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
