use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use inquire::Text;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;

pub const API_URL_ENV: &str = "DOCDESK_API_BASE_URL";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_DATA_ROOT: &str = "~/Documents/docdesk";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_data_root() -> String {
    DEFAULT_DATA_ROOT.to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            api_base_url: default_api_base_url(),
            data_root: default_data_root(),
        }
    }
}

impl AppSettings {
    /// Scheme and host of the backend, used for relative asset paths such as logos.
    pub fn api_origin(&self) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        base.strip_suffix("/api").unwrap_or(base).to_string()
    }

    pub fn data_root(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    /// A non-empty environment value wins over the file.
    pub fn with_env_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            debug!(%url, "api base url taken from {}", API_URL_ENV);
            self.api_base_url = url.trim().to_string();
        }
        self
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "docdesk", "app") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}

pub fn load_from(path: &Path) -> AppResult<Option<AppSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

pub fn save_to(path: &Path, settings: &AppSettings) -> AppResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}

/// Settings for this run. A missing or unreadable file falls back to the defaults.
pub fn load() -> AppSettings {
    let path = config_path();
    let settings = match load_from(&path) {
        Ok(Some(settings)) => settings,
        Ok(None) => AppSettings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read settings, using defaults");
            AppSettings::default()
        }
    };
    settings.with_env_override(std::env::var(API_URL_ENV).ok())
}

pub fn setup_config_wizard() -> AppResult<AppSettings> {
    println!("\n⚙️  --- ตั้งค่าโปรแกรม ---");
    let path = config_path();
    let current = load_from(&path).ok().flatten().unwrap_or_default();

    let api_base_url = Text::new("API base URL:")
        .with_default(&current.api_base_url)
        .prompt()?;
    let data_root = Text::new("โฟลเดอร์เก็บไฟล์เอกสาร:")
        .with_default(&current.data_root)
        .prompt()?;

    let settings = AppSettings {
        api_base_url: api_base_url.trim().to_string(),
        data_root: data_root.trim().to_string(),
    };
    save_to(&path, &settings)?;
    println!("✅ บันทึกการตั้งค่าแล้ว: {}", path.display());
    Ok(settings)
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
