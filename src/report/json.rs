//! JSON report export

use crate::error::Result;
use crate::models::ScanResult;
use std::path::Path;
use tracing::info;

/// Writes the scan result as pretty-printed JSON
pub fn export(result: &ScanResult, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(output_path, json)?;
    info!(
        "JSON report with {} finding(s) saved to {}",
        result.findings.len(),
        output_path.display()
    );
    Ok(())
}

/// Reads back a result written by [`export`]
pub fn load(input_path: &Path) -> Result<ScanResult> {
    let content = std::fs::read_to_string(input_path)?;
    let result: ScanResult = serde_json::from_str(&content)?;
    Ok(result)
}
