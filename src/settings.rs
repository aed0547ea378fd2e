use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::context::{
    DEFAULT_MTIME_TOLERANCE, DEFAULT_PROGRESS_INTERVAL, DEFAULT_SKIP_NAMES, ScanOptions,
};

const SETTINGS_ENV_PATH: &str = "TREECMP_SETTINGS_PATH";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppSettings {
    pub skip_names: BTreeSet<String>,
    pub follow_symlinks: bool,
    pub progress_interval_ms: u64,
    pub mtime_tolerance_ms: u64,
    pub default_recursive: bool,
    pub partial_snapshots: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            skip_names: DEFAULT_SKIP_NAMES.iter().map(|name| name.to_string()).collect(),
            follow_symlinks: false,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL.as_millis() as u64,
            mtime_tolerance_ms: DEFAULT_MTIME_TOLERANCE.as_millis() as u64,
            default_recursive: true,
            partial_snapshots: false,
        }
    }
}

impl AppSettings {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_names: self.skip_names.clone(),
            follow_symlinks: self.follow_symlinks,
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            mtime_tolerance: Duration::from_millis(self.mtime_tolerance_ms),
            partial_snapshots: self.partial_snapshots,
        }
    }
}

pub fn load_settings() -> AppSettings {
    try_load_settings().unwrap_or_else(|err| {
        debug!(error = %err, "settings unreadable, using defaults");
        AppSettings::default()
    })
}

pub fn try_load_settings() -> io::Result<AppSettings> {
    let path = settings_file_path();
    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let content = fs::read_to_string(&path)?;
    debug!(path = %path.display(), "loaded settings");
    Ok(parse_settings(&content))
}

pub fn save_settings(settings: &AppSettings) -> io::Result<()> {
    let path = settings_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serialize_settings(settings))
}

pub fn settings_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SETTINGS_ENV_PATH) {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    let config_home = env_path("XDG_CONFIG_HOME")
        .or_else(|| env_path("APPDATA"))
        .or_else(|| env_path("HOME").map(|home| home.join(".config")));

    match config_home {
        Some(mut path) => {
            path.push("treecmp");
            path.push("settings.conf");
            path
        }
        None => std::env::temp_dir().join("treecmp.settings.conf"),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_settings(content: &str) -> AppSettings {
    let mut settings = AppSettings::default();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        let value = value.trim();

        match key {
            "skip_names" => {
                settings.skip_names = value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect();
            }
            "follow_symlinks" => {
                if let Some(v) = parse_bool(value) {
                    settings.follow_symlinks = v;
                }
            }
            "progress_interval_ms" => {
                if let Ok(v) = value.parse::<u64>() {
                    settings.progress_interval_ms = v;
                }
            }
            "mtime_tolerance_ms" => {
                if let Ok(v) = value.parse::<u64>() {
                    settings.mtime_tolerance_ms = v;
                }
            }
            "default_recursive" => {
                if let Some(v) = parse_bool(value) {
                    settings.default_recursive = v;
                }
            }
            "partial_snapshots" => {
                if let Some(v) = parse_bool(value) {
                    settings.partial_snapshots = v;
                }
            }
            _ => {}
        }
    }

    settings
}

fn serialize_settings(settings: &AppSettings) -> String {
    let skip_names = settings
        .skip_names
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");

    format!(
        concat!(
            "# treecmp settings file\n",
            "# skip_names is a comma-separated list of directory names never walked.\n",
            "skip_names={skip_names}\n",
            "follow_symlinks={follow}\n",
            "progress_interval_ms={interval}\n",
            "mtime_tolerance_ms={tolerance}\n",
            "default_recursive={recursive}\n",
            "partial_snapshots={snapshots}\n"
        ),
        skip_names = skip_names,
        follow = settings.follow_symlinks,
        interval = settings.progress_interval_ms,
        tolerance = settings.mtime_tolerance_ms,
        recursive = settings.default_recursive,
        snapshots = settings.partial_snapshots,
    )
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value == "1"
        || value.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value == "0"
        || value.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}
