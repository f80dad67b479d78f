//! A bucket (container) presented as a directory.

use super::{
    entry::FileInfo,
    ids::BucketId,
    metadata::{ATTR_NAME, ContainerMeta},
};
use chrono::{DateTime, Utc};

/// Name reported for the synthetic filesystem root.
pub const ROOT_NAME: &str = "/";

/// A storage bucket seen as a directory.
///
/// Built on demand from a container fetch and never cached. The display name
/// is the identifier text unless the container carries a `Name` attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketEntry {
    /// Absent only for the synthetic root.
    pub id: Option<BucketId>,

    pub name: String,

    pub created: DateTime<Utc>,
}

impl BucketEntry {
    pub fn from_meta(meta: &ContainerMeta) -> Self {
        Self {
            id: Some(meta.id),
            name: meta
                .attributes
                .get(ATTR_NAME)
                .map(str::to_string)
                .unwrap_or_else(|| meta.id.to_string()),
            created: meta.attributes.created_at(),
        }
    }

    /// The filesystem root. Exists only to answer a stat on `/`.
    pub fn root() -> Self {
        Self {
            id: None,
            name: ROOT_NAME.to_string(),
            created: Utc::now(),
        }
    }
}

impl FileInfo for BucketEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        0
    }

    fn modified(&self) -> DateTime<Utc> {
        self.created
    }

    fn is_dir(&self) -> bool {
        true
    }
}
