//! Unique per-run markers for XSS templates

use crate::scanner::payloads::CANARY_PLACEHOLDER;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::TryRngCore;
use tracing::warn;

pub const CANARY_PREFIX: &str = "xssCANARY-";

/// Returns `xssCANARY-` followed by 12 hex chars from the OS RNG.
/// Falls back to a nanosecond timestamp when the RNG is unavailable.
pub fn generate_canary() -> String {
    let mut bytes = [0u8; 6];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("{CANARY_PREFIX}{hex}")
        }
        Err(e) => {
            warn!("OS random source unavailable ({e}), using timestamp canary");
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            format!("{CANARY_PREFIX}{nanos}")
        }
    }
}

/// Substitutes every `%CANARY%` in `template`
pub fn inject_canary(template: &str, canary: &str) -> String {
    template.replace(CANARY_PLACEHOLDER, canary)
}
