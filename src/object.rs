use std::fmt;

use crate::paths::RelPath;

/// The id reflogs use for "no previous value". Never fetched.
pub const NULL_ID: &str = "0000000000000000000000000000000000000000";

/// A loose object id: 40 lowercase hex characters, never the all-zero id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Parse an exact 40-character lowercase hex id.
    ///
    /// Returns `None` for anything else, including uppercase hex,
    /// surrounding text and the all-zero id.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 40 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return None;
        }
        let mut raw = [0u8; 20];
        hex::decode_to_slice(s, &mut raw).ok()?;
        if raw == [0u8; 20] {
            return None;
        }
        Some(Self(raw))
    }

    /// `objects/<first 2 hex>/<remaining 38 hex>`
    pub fn relative_path(&self) -> RelPath {
        let h = hex::encode(self.0);
        RelPath::from_trusted(format!("objects/{}/{}", &h[..2], &h[2..]))
    }

    /// Inverse of [`ObjectId::relative_path`].
    pub fn from_relative_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("objects/")?;
        let (dir, file) = rest.split_once('/')?;
        if dir.len() != 2 || file.len() != 38 {
            return None;
        }
        Self::parse(&format!("{dir}{file}"))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
