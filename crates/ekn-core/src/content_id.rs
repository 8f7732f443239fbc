//! Stable hash-addressed identifiers: `scheme://domain/hash[/resource]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lengths accepted for the content hash (short and sha1 forms).
const HASH_LENGTHS: [usize; 2] = [16, 40];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    scheme: String,
    domain: String,
    hash: String,
    resource: Option<String>,
}

pub fn is_valid_hash(candidate: &str) -> bool {
    HASH_LENGTHS.contains(&candidate.len())
        && candidate.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    matches!(bytes.next(), Some(b'a'..=b'z'))
        && bytes.all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'+' | b'.' | b'-'))
}

impl ContentId {
    /// Id in the `ekn` scheme with an empty domain.
    pub fn new(hash: &str) -> Result<Self> {
        Self::with_parts("ekn", "", hash, None)
    }

    pub fn with_parts(scheme: &str, domain: &str, hash: &str, resource: Option<&str>) -> Result<Self> {
        let display = format!("{scheme}://{domain}/{hash}");
        if !is_valid_scheme(scheme) || domain.contains('/') || !is_valid_hash(hash) {
            return Err(Error::InvalidId(display));
        }
        if let Some(resource) = resource {
            if resource.is_empty() || resource.contains('/') {
                return Err(Error::InvalidId(format!("{display}/{resource}")));
            }
        }
        Ok(Self {
            scheme: scheme.to_string(),
            domain: domain.to_string(),
            hash: hash.to_string(),
            resource: resource.map(str::to_string),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The id of the record this id belongs to, without the resource part.
    pub fn record_id(&self) -> ContentId {
        Self { resource: None, ..self.clone() }
    }

    pub fn with_resource(&self, resource: &str) -> Result<ContentId> {
        Self::with_parts(&self.scheme, &self.domain, &self.hash, Some(resource))
    }
}

impl FromStr for ContentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidId(s.to_string());
        let (scheme, rest) = s.split_once("://").ok_or_else(invalid)?;
        let mut segments: Vec<&str> = rest.split('/').collect();
        let mut domain = segments.remove(0);

        // Legacy `ekn:///<domain>/<hash>`: empty authority, domain in the path.
        if domain.is_empty()
            && segments.len() >= 2
            && !is_valid_hash(segments[0])
            && is_valid_hash(segments[1])
        {
            domain = segments.remove(0);
        }

        let parsed = match segments.as_slice() {
            [hash] => Self::with_parts(scheme, domain, hash, None),
            [hash, resource] => Self::with_parts(scheme, domain, hash, Some(resource)),
            _ => return Err(invalid()),
        };
        parsed.map_err(|_| invalid())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.domain, self.hash)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
