//! kb_Vegan service façade.
//!
//! Entry point the host runtime calls. Each call is an independent
//! request/response; the only state is the config and delegate set at
//! construction.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ModuleConfig;
use crate::delegate::{self, MdsDelegate};
use crate::error::Error;
use crate::mds::{CallContext, MdsParams, StatusRecord};

pub const VERSION: &str = "0.0.1";
pub const GIT_URL: &str = "https://github.com/qzzhang/kb_Vegan.git";
pub const GIT_COMMIT_HASH: &str = "5e9593a29470729e93314c6e8e5a314ec08806c9";

/// The kb_Vegan module.
pub struct VeganService {
    config: ModuleConfig,
    delegate: Arc<dyn MdsDelegate>,
}

impl VeganService {
    pub fn new(config: ModuleConfig, delegate: Arc<dyn MdsDelegate>) -> Self {
        Self { config, delegate }
    }

    /// Build with the production delegate.
    pub fn from_config(config: ModuleConfig) -> Self {
        let delegate = delegate::from_config(&config);
        Self::new(config, delegate)
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Run MDS on the matrix named by `params.input_obj_ref`.
    ///
    /// The delegate's mapping is returned unchanged as the single element of the
    /// result list. Any other JSON shape is a contract violation.
    pub fn run_mds(
        &self,
        ctx: &CallContext,
        params: MdsParams,
    ) -> Result<Vec<Map<String, Value>>, Error> {
        info!(
            call_id = ctx.call_id(),
            input = %params.input_obj_ref,
            workspace = %params.workspace_name,
            "run_mds"
        );

        let return_val = self.delegate.compute(&params)?;

        match return_val {
            Value::Object(map) => {
                debug!(call_id = ctx.call_id(), keys = map.len(), "run_mds done");
                Ok(vec![map])
            }
            other => Err(Error::ContractViolation {
                method: "run_mds",
                found: json_kind(&other),
            }),
        }
    }

    pub fn status(&self, _ctx: &CallContext) -> Vec<StatusRecord> {
        vec![StatusRecord {
            state: "OK".to_string(),
            message: String::new(),
            version: VERSION.to_string(),
            git_url: GIT_URL.to_string(),
            git_commit_hash: GIT_COMMIT_HASH.to_string(),
        }]
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
