use crate::client::HttpPeerClient;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    chain::MineOutcome, consensus::ChainSnapshot, node::Node, Block, LedgerError,
    NewTransaction, Transaction,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub client: HttpPeerClient,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct NodeAddress {
    #[serde(default)]
    node_address: String,
}

#[derive(Serialize, Deserialize)]
pub struct MineResult {
    pub mined: bool,
    pub index: Option<u64>,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Maps core errors onto HTTP statuses.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::InvalidTransaction { .. } | LedgerError::InvalidProof { .. } => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::ChainLinkage { .. } | LedgerError::IndexOutOfSequence { .. } => {
                StatusCode::CONFLICT
            }
            LedgerError::CorruptChain { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            LedgerError::MiningTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/healthz", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain", get(chain))
        .route("/pending_tx", get(pending_tx))
        .route("/new_transaction", post(new_transaction))
        .route("/mine", get(mine).post(mine))
        .route("/register_node", post(register_node))
        .route("/register_with", post(register_with))
        .route("/add_block", post(add_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.node.chain_snapshot().await)
}

async fn pending_tx(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.node.pending_transactions().await)
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let tx = state.node.submit_transaction(tx).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn mine(State(state): State<AppState>) -> Result<Json<MineResult>, ApiError> {
    let result = match state.node.mine_and_announce(&state.client).await? {
        MineOutcome::Mined(index) => MineResult {
            mined: true,
            index: Some(index),
            message: format!("Block #{index} is mined."),
        },
        MineOutcome::NothingPending => MineResult {
            mined: false,
            index: None,
            message: "No transactions to mine".to_string(),
        },
    };
    Ok(Json(result))
}

async fn register_node(
    State(state): State<AppState>,
    Json(body): Json<NodeAddress>,
) -> Response {
    if body.node_address.trim().is_empty() {
        return bad_request("Invalid data");
    }
    Json(state.node.register_peer(&body.node_address).await).into_response()
}

async fn register_with(
    State(state): State<AppState>,
    Json(body): Json<NodeAddress>,
) -> Result<Response, ApiError> {
    if body.node_address.trim().is_empty() {
        return Ok(bad_request("Invalid data"));
    }
    state
        .node
        .register_with(&state.client, &body.node_address)
        .await
        .inspect_err(|e| warn!("registration with {} failed: {e}", body.node_address))?;
    Ok(Message::new("Registration successful").into_response())
}

async fn add_block(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let proof = block.hash.clone();
    state.node.receive_announced_block(block, &proof).await?;
    Ok((StatusCode::CREATED, Message::new("Block added to the chain")))
}
