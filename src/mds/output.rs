//! `run_mds` and `status` results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Typed view of a `run_mds` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdsOutput {
    /// Reference to the saved MDS matrix object.
    pub mds_ref: String,
    pub report_name: String,
    pub report_ref: String,
}

impl MdsOutput {
    /// Read the typed fields out of a delegate mapping.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, Error> {
        Ok(serde_json::from_value(Value::Object(map.clone()))?)
    }
}

/// Descriptor returned by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: String,
    pub message: String,
    pub version: String,
    pub git_url: String,
    pub git_commit_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_map() {
        let map = json!({"mds_ref": "4/5/6", "report_name": "r", "report_ref": "7/8/9"});
        let out = MdsOutput::from_map(map.as_object().unwrap()).unwrap();
        assert_eq!(out.mds_ref, "4/5/6");
        assert_eq!(out.report_name, "r");
        assert_eq!(out.report_ref, "7/8/9");
    }

    #[test]
    fn test_from_map_missing_field() {
        let map = json!({"mds_ref": "4/5/6"});
        assert!(matches!(
            MdsOutput::from_map(map.as_object().unwrap()),
            Err(Error::Json(_))
        ));
    }
}
