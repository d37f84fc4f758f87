//! Catalog file line format
//!
//! `digest<TAB>created_at<TAB>author<TAB>tags`, where `created_at` is integer
//! epoch seconds and `tags` is comma-joined or the `-` marker when empty.

use crate::catalog::record::{validate_tag, SnapshotRecord};
use crate::fingerprint::SnapshotDigest;
use chrono::DateTime;
use std::collections::BTreeSet;
use stowage_core::CatalogError;

pub const FIELD_DELIMITER: char = '\t';
pub const TAG_DELIMITER: char = ',';

/// Reserved tags value for a record without tags
pub const NO_TAGS_MARKER: &str = "-";

const FIELD_COUNT: usize = 4;

pub fn encode_record(record: &SnapshotRecord) -> String {
    let tags = if record.tags.is_empty() {
        NO_TAGS_MARKER.to_string()
    } else {
        record
            .tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&TAG_DELIMITER.to_string())
    };

    [
        record.digest.to_hex(),
        record.created_epoch().to_string(),
        record.author.clone(),
        tags,
    ]
    .join(&FIELD_DELIMITER.to_string())
}

/// Decodes one non-blank line; `index` is its 1-based record number.
pub fn decode_record(line: &str, index: usize) -> Result<SnapshotRecord, CatalogError> {
    let malformed = |reason: String| CatalogError::Malformed { index, reason };

    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let digest = SnapshotDigest::from_hex(fields[0])
        .ok_or_else(|| malformed(format!("invalid digest {:?}", fields[0])))?;

    let seconds: i64 = fields[1]
        .parse()
        .map_err(|_| malformed(format!("invalid timestamp {:?}", fields[1])))?;
    let created_at = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| malformed(format!("timestamp {} out of range", seconds)))?;

    let author = fields[2].to_string();

    let tags = if fields[3] == NO_TAGS_MARKER {
        BTreeSet::new()
    } else {
        let mut tags = BTreeSet::new();
        for tag in fields[3].split(TAG_DELIMITER) {
            validate_tag(tag).map_err(|e| malformed(e.to_string()))?;
            tags.insert(tag.to_string());
        }
        tags
    };

    Ok(SnapshotRecord {
        digest,
        created_at,
        author,
        tags,
    })
}
