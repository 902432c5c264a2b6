//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the hosted ledger. All handlers share
//! an [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                        |
//! |--------|-------------------------------|------------------------------------|
//! | GET    | `/health`                     | Liveness probe                     |
//! | GET    | `/status`                     | Node status summary                |
//! | GET    | `/token`                      | Name, symbol, decimals, supply     |
//! | GET    | `/balances/:address`          | Balance of one account             |
//! | GET    | `/allowances/:owner/:spender` | Remaining allowance                |
//! | POST   | `/transfer`                   | Move the caller's tokens           |
//! | POST   | `/approve`                    | Set an allowance                   |
//! | POST   | `/transfer-from`              | Spend an allowance                 |
//! | POST   | `/rpc`                        | JSON-RPC 2.0 gateway               |
//! | GET    | `/ws`                         | Live event stream                  |
//!
//! Mutations answer `200` with the events they committed, `422` when the
//! ledger refuses them, and `400` when the request itself is malformed.
//! The `caller` field of a mutation is taken at face value.

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cash_ledger::{
    Address, Amount, EventRecord, EventSink, LedgerError, LedgerResult, SharedLedger,
};

use crate::metrics::SharedMetrics;

/// Buffered events per WebSocket subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub ledger: SharedLedger,
    /// Fan-out of committed ledger events to WebSocket clients.
    pub event_tx: broadcast::Sender<EventRecord>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Wires a [`BroadcastSink`] into `ledger` so every committed event
    /// reaches `event_tx`.
    pub fn new(version: impl Into<String>, ledger: SharedLedger, metrics: SharedMetrics) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ledger.subscribe(Arc::new(BroadcastSink::new(event_tx.clone())));
        metrics.holders.set(ledger.holder_count() as i64);
        Self {
            version: version.into(),
            ledger,
            event_tx,
            metrics,
        }
    }

    fn execute(&self, op: LedgerOp) -> LedgerResult<Vec<EventRecord>> {
        let timer = self.metrics.operation_latency_seconds.start_timer();
        let result = match &op {
            LedgerOp::Transfer(req) => self.ledger.transfer(req.caller, req.to, req.amount),
            LedgerOp::Approve(req) => self.ledger.approve(req.caller, req.spender, req.amount),
            LedgerOp::TransferFrom(req) => {
                self.ledger
                    .transfer_from(req.caller, req.from, req.to, req.amount)
            }
        };
        timer.observe_duration();

        match &result {
            Ok(_) => {
                match op {
                    LedgerOp::Approve(_) => self.metrics.approvals_total.inc(),
                    _ => self.metrics.transfers_total.inc(),
                }
                self.metrics
                    .holders
                    .set(self.ledger.holder_count() as i64);
            }
            Err(e) => self.metrics.record_rejection(e.kind()),
        }
        result
    }
}

/// Forwards ledger events into a broadcast channel.
pub struct BroadcastSink {
    tx: broadcast::Sender<EventRecord>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<EventRecord>) -> Self {
        Self { tx }
    }
}

impl EventSink for BroadcastSink {
    fn on_event(&self, record: &EventRecord) {
        // No subscribers is not an error.
        let _ = self.tx.send(record.clone());
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/token", get(token_handler))
        .route("/balances/:address", get(balance_handler))
        .route("/allowances/:owner/:spender", get(allowance_handler))
        .route("/transfer", post(transfer_handler))
        .route("/approve", post(approve_handler))
        .route("/transfer-from", post(transfer_from_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub caller: Address,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub caller: Address,
    pub spender: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferFromRequest {
    pub caller: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

enum LedgerOp {
    Transfer(TransferRequest),
    Approve(ApproveRequest),
    TransferFrom(TransferFromRequest),
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub symbol: String,
    /// Accounts with a non-zero balance.
    pub holders: usize,
    /// Sequence number the next committed event will carry.
    pub next_seq: u64,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "totalSupply")]
    pub total_supply: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub allowance: Amount,
}

/// Successful mutation: the events it committed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub events: Vec<EventRecord>,
}

/// Error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// [`LedgerError::kind`] for refusals, `InvalidInput` for bad requests.
    pub kind: String,
}

/// Why a REST call failed.
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    Rejected(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Rejected(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidInput(error) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error,
                    kind: "InvalidInput".into(),
                },
            ),
            ApiError::Rejected(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind().into(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::InvalidInput(format!("invalid address {:?}: {}", raw, e)))
}

// ---------------------------------------------------------------------------
// REST Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let (symbol, holders, next_seq) = state.ledger.read(|ledger| {
        (
            ledger.symbol().to_string(),
            ledger.holder_count(),
            ledger.next_seq(),
        )
    });
    Json(StatusResponse {
        version: state.version.clone(),
        symbol,
        holders,
        next_seq,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /token`
async fn token_handler(State(state): State<AppState>) -> Json<TokenResponse> {
    Json(state.ledger.read(|ledger| TokenResponse {
        name: ledger.name().to_string(),
        symbol: ledger.symbol().to_string(),
        decimals: ledger.decimals(),
        total_supply: ledger.total_supply(),
    }))
}

/// `GET /balances/:address`
async fn balance_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(BalanceResponse {
        address,
        balance: state.ledger.balance_of(&address),
    }))
}

/// `GET /allowances/:owner/:spender`
async fn allowance_handler(
    Path((owner, spender)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let owner = parse_address(&owner)?;
    let spender = parse_address(&spender)?;
    Ok(Json(AllowanceResponse {
        owner,
        spender,
        allowance: state.ledger.allowance(&owner, &spender),
    }))
}

/// `POST /transfer`
async fn transfer_handler(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(req) = payload?;
    let events = state.execute(LedgerOp::Transfer(req))?;
    Ok(Json(ReceiptResponse { events }))
}

/// `POST /approve`
async fn approve_handler(
    State(state): State<AppState>,
    payload: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(req) = payload?;
    let events = state.execute(LedgerOp::Approve(req))?;
    Ok(Json(ReceiptResponse { events }))
}

/// `POST /transfer-from`
async fn transfer_from_handler(
    State(state): State<AppState>,
    payload: Result<Json<TransferFromRequest>, JsonRejection>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let Json(req) = payload?;
    let events = state.execute(LedgerOp::TransferFrom(req))?;
    Ok(Json(ReceiptResponse { events }))
}

// ---------------------------------------------------------------------------
// JSON-RPC
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope. Parameters are positional.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

const RPC_PARSE_ERROR: i32 = -32700;
const RPC_INVALID_REQUEST: i32 = -32600;
const RPC_METHOD_NOT_FOUND: i32 = -32601;
const RPC_INVALID_PARAMS: i32 = -32602;
/// Application error range; `data.kind` names the ledger error.
const RPC_LEDGER_ERROR: i32 = -32000;

impl JsonRpcResponse {
    fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

impl From<LedgerError> for JsonRpcError {
    fn from(err: LedgerError) -> Self {
        JsonRpcError {
            code: RPC_LEDGER_ERROR,
            message: err.to_string(),
            data: Some(serde_json::json!({ "kind": err.kind() })),
        }
    }
}

fn rpc_params<T: DeserializeOwned>(
    params: Option<serde_json::Value>,
    expected: &str,
) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    serde_json::from_value(params).map_err(|e| JsonRpcError {
        code: RPC_INVALID_PARAMS,
        message: format!("Invalid params: expected {}", expected),
        data: Some(serde_json::Value::String(e.to_string())),
    })
}

fn to_rpc_value<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {}", e),
        data: None,
    })
}

fn receipt(events: Vec<EventRecord>) -> Result<serde_json::Value, JsonRpcError> {
    to_rpc_value(ReceiptResponse { events })
}

/// `POST /rpc`
async fn rpc_handler(
    State(state): State<AppState>,
    payload: Result<Json<JsonRpcRequest>, JsonRejection>,
) -> Json<JsonRpcResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return Json(JsonRpcResponse::failure(
                serde_json::Value::Null,
                JsonRpcError {
                    code: RPC_PARSE_ERROR,
                    message: format!("Parse error: {}", rejection.body_text()),
                    data: None,
                },
            ));
        }
    };

    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            req.id,
            JsonRpcError {
                code: RPC_INVALID_REQUEST,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            },
        ));
    }

    let id = req.id;
    match dispatch_rpc(&state, &req.method, req.params) {
        Ok(result) => Json(JsonRpcResponse::success(id, result)),
        Err(error) => Json(JsonRpcResponse::failure(id, error)),
    }
}

fn dispatch_rpc(
    state: &AppState,
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "token_name" => to_rpc_value(state.ledger.read(|l| l.name().to_string())),
        "token_symbol" => to_rpc_value(state.ledger.read(|l| l.symbol().to_string())),
        "token_decimals" => to_rpc_value(state.ledger.read(|l| l.decimals())),
        "token_totalSupply" => to_rpc_value(state.ledger.total_supply()),
        "token_balanceOf" => {
            let (account,): (Address,) = rpc_params(params, "[account]")?;
            to_rpc_value(state.ledger.balance_of(&account))
        }
        "token_allowance" => {
            let (owner, spender): (Address, Address) = rpc_params(params, "[owner, spender]")?;
            to_rpc_value(state.ledger.allowance(&owner, &spender))
        }
        "token_transfer" => {
            let (caller, to, amount): (Address, Address, Amount) =
                rpc_params(params, "[caller, to, amount]")?;
            let events = state.execute(LedgerOp::Transfer(TransferRequest { caller, to, amount }))?;
            receipt(events)
        }
        "token_approve" => {
            let (caller, spender, amount): (Address, Address, Amount) =
                rpc_params(params, "[caller, spender, amount]")?;
            let events = state.execute(LedgerOp::Approve(ApproveRequest {
                caller,
                spender,
                amount,
            }))?;
            receipt(events)
        }
        "token_transferFrom" => {
            let (caller, from, to, amount): (Address, Address, Address, Amount) =
                rpc_params(params, "[caller, from, to, amount]")?;
            let events = state.execute(LedgerOp::TransferFrom(TransferFromRequest {
                caller,
                from,
                to,
                amount,
            }))?;
            receipt(events)
        }
        other => Err(JsonRpcError {
            code: RPC_METHOD_NOT_FOUND,
            message: format!("Method not found: {}", other),
            data: None,
        }),
    }
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// `GET /ws`: pushes every committed [`EventRecord`] as a JSON text frame.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(record) => {
                        let payload = match serde_json::to_string(&record) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to serialize ws event");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    // Push-only channel; client frames are ignored.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
