//! Backend-level metadata: attributes, headers and the records returned by
//! head/get calls.

use super::ids::{BucketId, ObjectId, OwnerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name of an object.
pub const ATTR_FILE_NAME: &str = "FileName";
/// Creation time, decimal Unix seconds.
pub const ATTR_TIMESTAMP: &str = "Timestamp";
/// Logical file path. Carried but never used for nesting.
pub const ATTR_FILE_PATH: &str = "FilePath";
/// Display name of a bucket.
pub const ATTR_NAME: &str = "Name";

/// Ordered key/value string attributes attached to objects and containers.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Value of the last attribute with `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Creation time from the `Timestamp` attribute.
    ///
    /// Falls back to now when the attribute is missing, unparseable or zero.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.get(ATTR_TIMESTAMP)
            .and_then(parse_unix_seconds)
            .unwrap_or_else(Utc::now)
    }
}

/// Current time as the decimal text stored in `Timestamp` attributes.
pub fn timestamp_now() -> String {
    Utc::now().timestamp().to_string()
}

fn parse_unix_seconds(raw: &str) -> Option<DateTime<Utc>> {
    match raw.trim().parse::<i64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => DateTime::from_timestamp(secs, 0),
    }
}

/// Container placement policy, passed through to the backend verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementPolicy(pub String);

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self("REP 1".into())
    }
}

/// Basic access control applied to a new container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BasicAcl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
}

impl BasicAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasicAcl::Private => "private",
            BasicAcl::PublicRead => "public-read",
            BasicAcl::PublicReadWrite => "public-read-write",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "private" => Some(BasicAcl::Private),
            "public-read" => Some(BasicAcl::PublicRead),
            "public-read-write" => Some(BasicAcl::PublicReadWrite),
            _ => None,
        }
    }
}

/// Header of an object about to be uploaded.
#[derive(Clone, Debug)]
pub struct ObjectHeader {
    pub bucket: BucketId,
    pub owner: OwnerId,
    pub attributes: Attributes,
    /// Parent object for auxiliary objects. Root objects have none.
    pub parent: Option<ObjectId>,
}

/// Object metadata as returned by a head call.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    pub id: ObjectId,
    pub bucket: BucketId,
    pub owner: OwnerId,
    pub payload_size: u64,
    pub attributes: Attributes,
}

/// Header of a container about to be created.
#[derive(Clone, Debug)]
pub struct ContainerHeader {
    pub owner: OwnerId,
    pub policy: PlacementPolicy,
    pub acl: BasicAcl,
    pub attributes: Attributes,
}

/// Container metadata as returned by a get call.
#[derive(Clone, Debug)]
pub struct ContainerMeta {
    pub id: BucketId,
    pub owner: OwnerId,
    pub policy: PlacementPolicy,
    pub acl: BasicAcl,
    pub attributes: Attributes,
}
