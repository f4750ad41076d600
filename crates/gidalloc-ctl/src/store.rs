use std::fs;
use std::path::Path;

use anyhow::Context;
use gidalloc::Snapshot;

pub fn load(path: &Path) -> anyhow::Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))
}

/// Writes `snapshot` next to `path` and renames it into place, so readers
/// never observe a half-written file.
pub fn save(path: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    let body = serde_json::to_string_pretty(snapshot).context("failed to encode snapshot")?;
    fs::write(&tmp, body).with_context(|| format!("failed to write {}", Path::new(&tmp).display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
