//! Catalog query predicates

use crate::catalog::record::SnapshotRecord;
use chrono::{DateTime, Utc};
use std::fmt;

/// A boolean test over a snapshot record. Query predicates combine with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every record
    All,
    /// The record carries the tag
    HasTag(String),
    /// The record was created by the author
    AuthoredBy(String),
    /// Created strictly after the instant
    CreatedAfter(DateTime<Utc>),
    /// Created strictly before the instant
    CreatedBefore(DateTime<Utc>),
}

impl Predicate {
    pub fn has_tag(tag: impl Into<String>) -> Self {
        Self::HasTag(tag.into())
    }

    /// One `HasTag` predicate per tag
    pub fn for_tags<I, T>(tags: I) -> Vec<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        tags.into_iter().map(|tag| Self::HasTag(tag.into())).collect()
    }

    pub fn matches(&self, record: &SnapshotRecord) -> bool {
        match self {
            Self::All => true,
            Self::HasTag(tag) => record.has_tag(tag),
            Self::AuthoredBy(author) => record.author == *author,
            Self::CreatedAfter(t) => record.created_at > *t,
            Self::CreatedBefore(t) => record.created_at < *t,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::HasTag(tag) => write!(f, "tag={}", tag),
            Self::AuthoredBy(author) => write!(f, "author={}", author),
            Self::CreatedAfter(t) => write!(f, "after={}", t.to_rfc3339()),
            Self::CreatedBefore(t) => write!(f, "before={}", t.to_rfc3339()),
        }
    }
}

/// True when the record satisfies every predicate; an empty list matches all.
pub fn matches_all(predicates: &[Predicate], record: &SnapshotRecord) -> bool {
    predicates.iter().all(|p| p.matches(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SnapshotDigest;

    fn record(tags: &[&str], at: i64) -> SnapshotRecord {
        SnapshotRecord::new(
            SnapshotDigest::from_hex("aa").unwrap(),
            DateTime::from_timestamp(at, 0).unwrap(),
            "ci",
            tags.iter().copied(),
        )
        .unwrap()
    }

    #[test]
    fn test_tag_predicates_combine_with_and() {
        let r = record(&["a", "b"], 100);

        assert!(matches_all(&Predicate::for_tags(["a"]), &r));
        assert!(matches_all(&Predicate::for_tags(["a", "b"]), &r));
        assert!(!matches_all(&Predicate::for_tags(["c"]), &r));
        assert!(!matches_all(&Predicate::for_tags(["a", "c"]), &r));
        assert!(matches_all(&[], &r));
    }

    #[test]
    fn test_author_and_time_predicates() {
        let r = record(&[], 200);
        let t = |s| DateTime::from_timestamp(s, 0).unwrap();

        assert!(Predicate::All.matches(&r));
        assert!(Predicate::AuthoredBy("ci".into()).matches(&r));
        assert!(!Predicate::AuthoredBy("someone".into()).matches(&r));
        assert!(Predicate::CreatedAfter(t(199)).matches(&r));
        assert!(!Predicate::CreatedAfter(t(200)).matches(&r));
        assert!(Predicate::CreatedBefore(t(201)).matches(&r));
        assert!(!Predicate::CreatedBefore(t(200)).matches(&r));
    }
}
