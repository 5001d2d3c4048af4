use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

pub const LIVE_LOG_DEFAULT: &str = "Rivals2.log";

const BACKEND_HOST_DEFAULT: &str = "127.0.0.1";
const BACKEND_PORT_DEFAULT: u16 = 8005;

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn backend_base_url() -> String {
    if let Some(url) = opt_env("TRACKER_BACKEND_URL") {
        return url.trim_end_matches('/').to_string();
    }
    let host = opt_env("TRACKER_BACKEND_HOST").unwrap_or_else(|| BACKEND_HOST_DEFAULT.to_string());
    let port = opt_env("TRACKER_BACKEND_PORT")
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(BACKEND_PORT_DEFAULT);
    format!("http://{host}:{port}")
}

pub fn live_log_name() -> String {
    opt_env("RIVALS_LIVE_LOG").unwrap_or_else(|| LIVE_LOG_DEFAULT.to_string())
}

/// Resolves the game's log folder: explicit env override first, then the
/// platform install location under the local app-data root.
pub fn log_dir() -> Result<PathBuf> {
    if let Some(dir) = opt_env("RIVALS_LOG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(base) = opt_env("LOCALAPPDATA") {
        return Ok(PathBuf::from(base).join("Rivals2").join("Saved").join("Logs"));
    }
    let home = opt_env("HOME").ok_or_else(|| anyhow!("neither RIVALS_LOG_DIR nor HOME is set"))?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("Rivals2")
        .join("Saved")
        .join("Logs"))
}

/// Every scannable log in discovery order: the live log first, then rotated
/// backups sorted by name. The live log is always listed even if the client
/// still holds it open; a missing folder is a hard error.
pub fn discover_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let live = live_log_name();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("list game log folder {}", dir.display()))?;

    let mut rotated = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == live || !name.ends_with(".log") {
            continue;
        }
        rotated.push(path);
    }
    rotated.sort();

    let mut files = vec![dir.join(&live)];
    files.extend(rotated);
    Ok(files)
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_folder_is_a_hard_error() {
        assert!(discover_log_files(Path::new("/definitely/not/a/folder")).is_err());
    }
}
