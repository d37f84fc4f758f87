//! Snapshot records

use crate::catalog::codec::{FIELD_DELIMITER, NO_TAGS_MARKER, TAG_DELIMITER};
use crate::fingerprint::SnapshotDigest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use stowage_core::{Error, Result};

/// One catalog entry: a snapshot digest with its provenance and tags.
///
/// `created_at` has whole-second precision, matching the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    pub digest: SnapshotDigest,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub tags: BTreeSet<String>,
}

impl SnapshotRecord {
    /// Builds a record, rejecting tags and authors the catalog file cannot hold.
    pub fn new<I, T>(
        digest: SnapshotDigest,
        created_at: DateTime<Utc>,
        author: impl Into<String>,
        tags: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let author = author.into();
        if author.contains([FIELD_DELIMITER, '\n', '\r']) {
            return Err(Error::invalid_config(format!(
                "Author {:?} must not contain tabs or newlines",
                author
            )));
        }

        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.into();
            validate_tag(&tag)?;
            set.insert(tag);
        }

        Ok(Self {
            digest,
            created_at: truncate_to_seconds(created_at),
            author,
            tags: set,
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Creation time as integer epoch seconds
    pub fn created_epoch(&self) -> i64 {
        self.created_at.timestamp()
    }
}

/// Checks that a tag survives a catalog round trip.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::invalid_tag(tag, "tags must not be empty"));
    }
    if tag == NO_TAGS_MARKER {
        return Err(Error::invalid_tag(
            tag,
            "reserved as the catalog's no-tags marker",
        ));
    }
    if tag.contains([TAG_DELIMITER, FIELD_DELIMITER, '\n', '\r']) {
        return Err(Error::invalid_tag(
            tag,
            "tags must not contain commas, tabs or newlines",
        ));
    }
    Ok(())
}

fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}
