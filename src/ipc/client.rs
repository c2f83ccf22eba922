//! Blocking JSON-RPC 2.0 client over a Unix socket.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, error};

use super::types::{ComputeRequest, JsonRpcRequest, JsonRpcResponse};
use crate::Error;

/// Default socket of the MDS service.
pub const SOCKET_PATH: &str = "/tmp/kb_vegan_mds.sock";

/// Client for the external MDS service.
pub struct IpcClient {
    socket_path: PathBuf,
    request_id: AtomicU64,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new(SOCKET_PATH)
    }
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            request_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Check if the MDS service accepts connections.
    pub fn is_service_running(&self) -> bool {
        UnixStream::connect(&self.socket_path).is_ok()
    }

    /// Send a `run_mds` request.
    ///
    /// The result is returned as raw JSON; shape checks are the caller's job.
    /// Remote errors come back as [`Error::Delegate`].
    pub fn run_mds(&self, request: &ComputeRequest) -> Result<Value, Error> {
        let rpc_request = JsonRpcRequest::new("run_mds", request, self.next_id());
        self.send_request(rpc_request)
    }

    fn send_request<T>(&self, request: JsonRpcRequest<T>) -> Result<Value, Error>
    where
        T: serde::Serialize,
    {
        debug!(method = %request.method, id = request.id, "Sending IPC request");

        let stream = UnixStream::connect(&self.socket_path).map_err(|e| {
            Error::Ipc(format!(
                "Failed to connect to {}: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        let mut writer = stream
            .try_clone()
            .map_err(|e| Error::Ipc(format!("Failed to clone stream: {}", e)))?;
        let mut reader = BufReader::new(stream);

        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .map_err(|e| Error::Ipc(format!("Failed to write request: {}", e)))?;
        writer
            .flush()
            .map_err(|e| Error::Ipc(format!("Failed to flush: {}", e)))?;

        let mut response_line = String::new();
        let read = reader
            .read_line(&mut response_line)
            .map_err(|e| Error::Ipc(format!("Failed to read response: {}", e)))?;
        if read == 0 {
            return Err(Error::Ipc("Connection closed before response".to_string()));
        }

        let response: JsonRpcResponse<Value> = serde_json::from_str(&response_line)
            .map_err(|e| Error::Ipc(format!("Failed to parse response: {}", e)))?;

        if let Some(err) = response.error {
            error!(code = err.code, message = %err.message, "MDS service error");
            return Err(Error::delegate(err.message));
        }

        if response.id != Some(request.id) {
            return Err(Error::Ipc(format!(
                "Response id {:?} does not match request id {}",
                response.id, request.id
            )));
        }

        // A present-but-null result is still a result; the façade decides.
        Ok(response.result.unwrap_or(Value::Null))
    }
}
