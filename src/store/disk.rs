use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads a JSON document, treating a missing file as `T::default()`.
pub fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("{} does not exist yet, using default", path.display());
        return Ok(T::default());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes pretty JSON to `<path>.tmp` and renames it over `path`.
pub fn write_json<T>(path: &Path, data: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let json = serde_json::to_string_pretty(data)?;
    fs::write(tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
