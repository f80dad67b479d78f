//! Directory entries produced for the protocol layer.

use super::{bucket::BucketEntry, object::ObjectEntry};
use chrono::{DateTime, Utc};
use std::any::Any;

/// Permission bits reported for every entry (`rwxrwxrwx`).
pub const MODE_PERM: u32 = 0o777;
/// Directory type bit, as in `S_IFDIR`.
pub const MODE_DIR: u32 = 0o040000;
/// Regular file type bit, as in `S_IFREG`.
pub const MODE_FILE: u32 = 0o100000;

/// The file metadata capability every listed or stat'ed entry offers.
pub trait FileInfo {
    fn name(&self) -> &str;

    /// Payload size in bytes. Always zero for directories.
    fn size(&self) -> u64;

    fn modified(&self) -> DateTime<Utc>;

    fn is_dir(&self) -> bool;

    fn mode(&self) -> u32 {
        if self.is_dir() {
            MODE_DIR | MODE_PERM
        } else {
            MODE_FILE | MODE_PERM
        }
    }

    /// System-specific payload. Nothing is exposed here.
    fn sys(&self) -> Option<&dyn Any> {
        None
    }
}

/// Either kind of entry, as returned by List and Stat.
#[derive(Clone, Debug)]
pub enum Entry {
    Bucket(BucketEntry),
    Object(ObjectEntry),
}

impl Entry {
    pub fn as_object(&self) -> Option<&ObjectEntry> {
        match self {
            Entry::Object(obj) => Some(obj),
            Entry::Bucket(_) => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectEntry> {
        match self {
            Entry::Object(obj) => Some(obj),
            Entry::Bucket(_) => None,
        }
    }
}

impl FileInfo for Entry {
    fn name(&self) -> &str {
        match self {
            Entry::Bucket(b) => b.name(),
            Entry::Object(o) => o.name(),
        }
    }

    fn size(&self) -> u64 {
        match self {
            Entry::Bucket(b) => b.size(),
            Entry::Object(o) => o.size(),
        }
    }

    fn modified(&self) -> DateTime<Utc> {
        match self {
            Entry::Bucket(b) => b.modified(),
            Entry::Object(o) => o.modified(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Entry::Bucket(_))
    }
}

impl From<BucketEntry> for Entry {
    fn from(value: BucketEntry) -> Self {
        Entry::Bucket(value)
    }
}

impl From<ObjectEntry> for Entry {
    fn from(value: ObjectEntry) -> Self {
        Entry::Object(value)
    }
}
