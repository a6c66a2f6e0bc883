use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::path::{Path, PathBuf};
use tradeflow::{FlowRecord, Geography};

/// Reads a JSON array of flow records.
pub async fn read_records(path: &Path) -> Result<Vec<FlowRecord>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let records = serde_json::from_str(&json)
        .wrap_err_with(|| format!("Invalid flow records in {}", path.display()))?;
    Ok(records)
}

pub async fn read_geography(path: &Path) -> Result<Geography> {
    let json = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    Ok(Geography::from_json(&json)?)
}

/// Writes `svg` to a timestamped file in `dir` and returns its path.
pub async fn write_snapshot(dir: &Path, svg: &str) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("tradeflow-{stamp}.svg"));
    tokio::fs::write(&path, svg)
        .await
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
