use super::types::ScoreHistory;
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Get the default history file path (~/.config/cred-score/history.json)
pub fn get_history_path() -> PathBuf {
    crate::config::get_config_dir().join("history.json")
}

/// Load score history from a JSON file
///
/// A missing file yields an empty history. An unsupported version is an error.
pub fn load_history(path: &Path) -> Result<ScoreHistory> {
    if !path.exists() {
        return Ok(ScoreHistory::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open history file at {}", path.display()))?;

    let history: ScoreHistory =
        serde_json::from_reader(file).context("Failed to load score history")?;

    if history.version != 1 {
        anyhow::bail!("Unsupported score history version: {}", history.version);
    }

    Ok(history)
}

/// Save score history atomically, creating the parent directory if needed
pub fn save_history(path: &Path, history: &ScoreHistory) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, history)
        .context("Failed to serialize score history")?;

    file.commit().context("Failed to save score history")?;

    Ok(())
}
