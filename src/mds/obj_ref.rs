//! Workspace object references (`ws/obj/version`).

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

fn ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^/\s]+)/([^/\s]+)/([0-9]+)$").expect("object reference pattern is valid")
    })
}

/// Reference to a specific version of a workspace object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjRef {
    workspace: String,
    object: String,
    version: u64,
}

impl ObjRef {
    /// Workspace id or name.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Object id or name.
    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

impl FromStr for ObjRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = ref_pattern()
            .captures(s)
            .ok_or_else(|| Error::InvalidObjRef(s.to_string()))?;

        let version: u64 = caps[3]
            .parse()
            .map_err(|_| Error::InvalidObjRef(s.to_string()))?;
        if version == 0 {
            return Err(Error::InvalidObjRef(s.to_string()));
        }

        Ok(Self {
            workspace: caps[1].to_string(),
            object: caps[2].to_string(),
            version,
        })
    }
}

impl TryFrom<String> for ObjRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjRef> for String {
    fn from(value: ObjRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.workspace, self.object, self.version)
    }
}
