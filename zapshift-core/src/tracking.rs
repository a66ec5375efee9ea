use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parcel::DeliveryStatus;

/// Domain prefix carried by every tracking code.
pub const TRACKING_PREFIX: &str = "ZS";

const SUFFIX_BYTES: usize = 4;

#[derive(Debug, thiserror::Error)]
#[error("random source unavailable: {0}")]
pub struct GenerationError(String);

/// Mint a public tracking code of the form `ZS-YYYYMMDD-XXXXXXXX`.
///
/// Four bytes of OS entropy keep collisions practically impossible within a
/// day's volume. Fails only when the OS random source is unavailable.
pub fn generate_tracking_id() -> Result<String, GenerationError> {
    let mut raw = [0u8; SUFFIX_BYTES];
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|e| GenerationError(e.to_string()))?;

    let date = Utc::now().format("%Y%m%d");
    let suffix: String = raw.iter().map(|b| format!("{:02X}", b)).collect();

    Ok(format!("{}-{}-{}", TRACKING_PREFIX, date, suffix))
}

/// One immutable audit record of a status change for a tracking code.
/// Appended on every lifecycle move, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLogEntry {
    pub id: Uuid,
    pub tracking_id: String,
    pub status: String,
    /// Human-readable rendering of the status token.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl TrackingLogEntry {
    pub fn new(tracking_id: &str, status: &DeliveryStatus) -> Self {
        let token = status.as_token();
        Self {
            id: Uuid::new_v4(),
            tracking_id: tracking_id.to_string(),
            status: token.to_string(),
            details: humanize(token),
            created_at: Utc::now(),
        }
    }
}

fn humanize(token: &str) -> String {
    token.replace(['_', '-'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tracking_id_matches_expected_shape() {
        let id = generate_tracking_id().unwrap();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ZS");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn tracking_ids_are_unique_at_volume() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            seen.insert(generate_tracking_id().unwrap());
        }
        // 32 bits of suffix entropy leaves a ~1% birthday chance of a single
        // pair colliding at this volume; anything beyond that is a bug.
        assert!(seen.len() >= 9_998, "got {} unique ids", seen.len());
    }

    #[test]
    fn entry_details_are_humanized() {
        let entry = TrackingLogEntry::new("ZS-20260825-DEADBEEF", &DeliveryStatus::PendingPickup);
        assert_eq!(entry.status, "pending_pickup");
        assert_eq!(entry.details, "pending pickup");
    }
}
