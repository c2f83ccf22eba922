//! Computation delegate.
//!
//! Matrix retrieval, the MDS computation itself, object saving and report
//! generation all live behind [`MdsDelegate`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::ModuleConfig;
use crate::error::Error;
use crate::ipc::client::SOCKET_PATH;
use crate::ipc::{ComputeRequest, IpcClient};
use crate::mds::MdsParams;

/// Host config key naming the MDS service socket.
pub const SOCKET_KEY: &str = "mds-service-socket";

/// Performs one MDS run.
///
/// Returns raw JSON; the façade checks that it is a mapping.
pub trait MdsDelegate: Send + Sync {
    fn compute(&self, params: &MdsParams) -> Result<Value, Error>;
}

impl<F> MdsDelegate for F
where
    F: Fn(&MdsParams) -> Result<Value, Error> + Send + Sync,
{
    fn compute(&self, params: &MdsParams) -> Result<Value, Error> {
        self(params)
    }
}

/// Delegate that forwards runs to the external MDS service.
pub struct IpcDelegate {
    client: IpcClient,
    callback_url: String,
    auth_token: String,
    scratch: String,
}

impl IpcDelegate {
    pub fn new(config: &ModuleConfig) -> Self {
        let socket = config.get(SOCKET_KEY).unwrap_or(SOCKET_PATH);
        Self {
            client: IpcClient::new(socket),
            callback_url: config.callback_url().to_string(),
            auth_token: config.auth_token().to_string(),
            scratch: config.scratch().to_string_lossy().into_owned(),
        }
    }
}

impl MdsDelegate for IpcDelegate {
    fn compute(&self, params: &MdsParams) -> Result<Value, Error> {
        info!(
            input = %params.input_obj_ref,
            workspace = %params.workspace_name,
            n_components = params.n_components(),
            metric = params.metric(),
            distance = %params.distance_metric(),
            "Forwarding MDS run"
        );

        let request = ComputeRequest {
            params: params.clone(),
            callback_url: self.callback_url.clone(),
            auth_token: self.auth_token.clone(),
            scratch: self.scratch.clone(),
        };
        self.client.run_mds(&request)
    }
}

/// Build the production delegate.
pub fn from_config(config: &ModuleConfig) -> Arc<dyn MdsDelegate> {
    let delegate = IpcDelegate::new(config);
    if !delegate.client.is_service_running() {
        warn!(
            socket = %delegate.client.socket_path().display(),
            "MDS service is not reachable yet"
        );
    }
    Arc::new(delegate)
}
