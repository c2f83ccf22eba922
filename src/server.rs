//! JSON-RPC dispatch onto [`VeganService`].
//!
//! Requests follow the host convention: method `kb_Vegan.<name>`, positional
//! `params` list, and a result list holding the single return value. [`run`]
//! drives the dispatcher over a newline-delimited stream (stdio in `main`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SERVICE_NAME;
use crate::error::{Error, RpcErrorCode};
use crate::mds::{CallContext, MdsParams};
use crate::service::VeganService;

/// Responses waiting for the writer.
const RESPONSE_QUEUE: usize = 64;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    context: Option<CallContext>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct RpcResponse {
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Value,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct RpcError {
    code: i32,
    name: &'static str,
    message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            version: "1.1",
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Value, code: RpcErrorCode, message: String) -> Self {
        Self {
            version: "1.1",
            result: None,
            error: Some(RpcError {
                code: code.code(),
                name: code.name(),
                message,
            }),
            id,
        }
    }
}

/// Strip the `kb_Vegan.` prefix, if any.
fn method_name(method: &str) -> &str {
    method
        .strip_prefix(SERVICE_NAME)
        .and_then(|m| m.strip_prefix('.'))
        .unwrap_or(method)
}

/// First positional argument, or the params object itself.
fn first_param(params: &Value) -> Option<Value> {
    match params {
        Value::Array(items) => items.first().cloned(),
        Value::Object(_) => Some(params.clone()),
        _ => None,
    }
}

fn handle_run_mds(service: &VeganService, ctx: &CallContext, params: &Value) -> RpcOutcome {
    let raw = first_param(params).ok_or_else(|| {
        (
            RpcErrorCode::InvalidParams,
            "run_mds expects one MDSParams argument".to_string(),
        )
    })?;
    let params: MdsParams = serde_json::from_value(raw)
        .map_err(|e| (RpcErrorCode::InvalidParams, e.to_string()))?;

    let result = service
        .run_mds(ctx, params)
        .map_err(|e| (RpcErrorCode::ServerError, e.to_string()))?;
    to_value(&result)
}

fn to_value<T: Serialize>(value: &T) -> RpcOutcome {
    serde_json::to_value(value).map_err(|e| (RpcErrorCode::ServerError, e.to_string()))
}

type RpcOutcome = Result<Value, (RpcErrorCode, String)>;

fn handle_request(service: &VeganService, request: RpcRequest) -> RpcResponse {
    let id = request.id.unwrap_or(Value::Null);
    let mut ctx = request.context.unwrap_or_default();
    if ctx.call_id.is_none() {
        ctx.call_id = Some(uuid::Uuid::new_v4().to_string());
    }

    let outcome = match method_name(&request.method) {
        "run_mds" => handle_run_mds(service, &ctx, &request.params),
        "status" => to_value(&service.status(&ctx)),
        other => {
            debug!(method = other, "Unknown method");
            Err((
                RpcErrorCode::MethodNotFound,
                format!("Method not found: {}", request.method),
            ))
        }
    };

    match outcome {
        Ok(result) => RpcResponse::success(id, result),
        Err((code, message)) => {
            warn!(call_id = ctx.call_id(), code = code.code(), error = %message, "Request failed");
            RpcResponse::error(id, code, message)
        }
    }
}

fn parse_error(message: String) -> RpcResponse {
    RpcResponse::error(Value::Null, RpcErrorCode::ParseError, message)
}

/// Handle one raw request line and return the serialized response.
pub fn handle_line(service: &VeganService, line: &str) -> Result<String, Error> {
    let response = match serde_json::from_str::<Value>(line) {
        Err(e) => parse_error(format!("Parse error: {}", e)),
        Ok(raw) => {
            let id = raw.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<RpcRequest>(raw) {
                Ok(request) => handle_request(service, request),
                Err(e) => RpcResponse::error(
                    id,
                    RpcErrorCode::InvalidRequest,
                    format!("Invalid request: {}", e),
                ),
            }
        }
    };
    Ok(serde_json::to_string(&response)?)
}

/// Response for a line that failed before dispatch.
fn fallback_response(message: String) -> String {
    serde_json::to_string(&parse_error(message.clone())).unwrap_or_else(|_| {
        json!({
            "version": "1.1",
            "error": {"code": RpcErrorCode::ParseError.code(), "message": message},
            "id": Value::Null
        })
        .to_string()
    })
}

/// Serve newline-delimited requests from `reader` until it closes, writing one
/// response line per request to `writer`.
///
/// Each request runs on the blocking pool, so a slow delegate call does not hold
/// up other requests. Responses are written as they complete. A read error stops
/// intake, but responses for requests already accepted are still written.
pub async fn run<R, W>(
    service: Arc<VeganService>,
    mut reader: R,
    mut writer: W,
) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("Starting kb_Vegan server");

    let (tx, mut rx) = mpsc::channel::<String>(RESPONSE_QUEUE);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut buf = Vec::new();
    let read_result = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Failed to read request");
                break Err(e);
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Request line is not valid UTF-8");
                let response = fallback_response(format!("Parse error: {}", e));
                if tx.send(response).await.is_err() {
                    error!("Response writer stopped");
                }
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let service = service.clone();
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            let response = match handle_line(&service, &line) {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "Failed to encode response");
                    fallback_response(e.to_string())
                }
            };
            if tx.blocking_send(response).is_err() {
                error!("Response writer stopped");
            }
        });
    };

    // Writer exits once every in-flight request has dropped its sender.
    drop(tx);
    writer_task.await??;
    read_result?;

    info!("kb_Vegan server stopped");
    Ok(())
}
