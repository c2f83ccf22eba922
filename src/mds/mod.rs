//! Request and response types crossing the `run_mds` boundary.

mod obj_ref;
mod output;
mod params;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use obj_ref::ObjRef;
pub use output::{MdsOutput, StatusRecord};
pub use params::{Flag, MdsParams};

/// Per-call context supplied by the host runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    #[serde(default)]
    pub provenance: Vec<Value>,
}

impl CallContext {
    pub fn with_call_id(call_id: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
            ..Self::default()
        }
    }

    /// Call id for log lines.
    pub fn call_id(&self) -> &str {
        self.call_id.as_deref().unwrap_or("-")
    }
}
