use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::{Error, Result};

pub fn ts_to_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn ts_from_str(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Query(format!("malformed timestamp {raw:?}: {e}")))
}

pub fn opt_ts_from_str(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| ts_from_str(&s)).transpose()
}

pub fn uuid_from_str(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Query(format!("malformed id {raw:?}: {e}")))
}

pub fn opt_uuid_from_str(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.map(|s| uuid_from_str(&s)).transpose()
}

/// Little-endian `f32` encoding for embedding vectors stored as BLOBs.
pub fn embedding_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

pub fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::Query("embedding blob length not a multiple of 4".into()));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

pub fn observation_ids_to_json(ids: &BTreeSet<Uuid>) -> String {
    serde_json::to_string(ids).expect("uuid set serializes")
}

pub fn json_to_observation_ids(raw: &str) -> Result<BTreeSet<Uuid>> {
    serde_json::from_str(raw).map_err(|e| Error::Query(format!("malformed observation id set: {e}")))
}

pub fn metadata_to_json(metadata: &serde_json::Map<String, serde_json::Value>) -> String {
    serde_json::to_string(metadata).expect("json map serializes")
}

pub fn json_to_metadata(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_str(raw).map_err(|e| Error::Query(format!("malformed metadata: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_round_trips_through_blob() {
        let vector = vec![0.1_f32, -2.5, 3.0, 0.0];
        let blob = embedding_to_blob(&vector);
        let restored = blob_to_embedding(&blob).unwrap();
        assert_eq!(vector, restored);
    }

    #[test]
    fn malformed_blob_length_is_rejected() {
        assert!(blob_to_embedding(&[0, 1, 2]).is_err());
    }

    #[test]
    fn timestamp_round_trips() {
        let now = Utc::now();
        let s = ts_to_string(now);
        let restored = ts_from_str(&s).unwrap();
        assert_eq!(now.timestamp_millis(), restored.timestamp_millis());
    }
}
