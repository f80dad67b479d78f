//! Represents an object (file) stored in a bucket.

use super::{
    entry::FileInfo,
    ids::{BucketId, ObjectId},
    metadata::{ATTR_FILE_NAME, ATTR_FILE_PATH, ObjectMeta},
};
use chrono::{DateTime, Utc};

/// A single stored blob seen as a regular file.
///
/// `size` is exactly the payload size the backend reported at head time.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectEntry {
    /// Owning bucket.
    pub bucket: BucketId,

    pub id: ObjectId,

    /// `FileName` attribute, or the identifier text when absent.
    pub name: String,

    /// `FilePath` attribute. The namespace is flat; this never nests.
    pub file_path: Option<String>,

    pub size: u64,

    pub created: DateTime<Utc>,
}

impl ObjectEntry {
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            bucket: meta.bucket,
            id: meta.id,
            name: meta
                .attributes
                .get(ATTR_FILE_NAME)
                .map(str::to_string)
                .unwrap_or_else(|| meta.id.to_string()),
            file_path: meta.attributes.get(ATTR_FILE_PATH).map(str::to_string),
            size: meta.payload_size,
            created: meta.attributes.created_at(),
        }
    }
}

impl FileInfo for ObjectEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn modified(&self) -> DateTime<Utc> {
        self.created
    }

    fn is_dir(&self) -> bool {
        false
    }
}

/// An object that has not been uploaded yet: just where it goes and what it
/// will be called. The backend assigns the identifier on commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingObject {
    pub bucket: BucketId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ids::OwnerId,
        metadata::{ATTR_TIMESTAMP, Attributes},
    };

    #[test]
    fn entry_reflects_head_metadata() {
        let meta = ObjectMeta {
            id: ObjectId::new(),
            bucket: BucketId::new(),
            owner: OwnerId::new(),
            payload_size: 23,
            attributes: Attributes::new()
                .with(ATTR_FILE_NAME, "report.txt")
                .with(ATTR_FILE_PATH, "docs/report.txt")
                .with(ATTR_TIMESTAMP, "1650000000"),
        };
        let entry = ObjectEntry::from_meta(&meta);
        assert_eq!(entry.name(), "report.txt");
        assert_eq!(entry.file_path.as_deref(), Some("docs/report.txt"));
        assert_eq!(entry.size(), 23);
        assert!(!entry.is_dir());
        assert_eq!(entry.modified().timestamp(), 1_650_000_000);
    }

    #[test]
    fn unnamed_object_uses_id_text() {
        let meta = ObjectMeta {
            id: ObjectId::new(),
            bucket: BucketId::new(),
            owner: OwnerId::new(),
            payload_size: 0,
            attributes: Attributes::new(),
        };
        assert_eq!(ObjectEntry::from_meta(&meta).name, meta.id.to_string());
    }
}
