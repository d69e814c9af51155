//! base64url codec, canonical timestamps, constant-time comparison (§4.1).

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};

pub fn b64e(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE.encode(bytes)
}

pub fn b64d(s: &str) -> anyhow::Result<Vec<u8>> {
    general_purpose::URL_SAFE
        .decode(s)
        .map_err(|e| anyhow::anyhow!("base64url decode: {e}"))
}

/// ISO-8601 UTC with microseconds dropped and an explicit `+00:00` offset.
pub fn now_iso() -> String {
    canonical_iso(Utc::now())
}

pub fn canonical_iso(ts: DateTime<Utc>) -> String {
    let truncated = ts - chrono::Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64);
    truncated.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Constant-time equality for secret-vs-secret comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
