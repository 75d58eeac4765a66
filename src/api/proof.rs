/// Proof API endpoints
/// Implements single and batch proof generation over HTTP
use crate::{
    batch::BatchItemResult,
    context::AppContext,
    error::{ProofError, ProofResult},
    identity::{Address, InputSource},
    proof::{generate_proof, ProofRecord, POLICY_VERSION},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response metadata shared by both endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofMeta {
    pub deterministic: bool,
    pub version: String,
}

impl ProofMeta {
    fn current() -> Self {
        Self {
            deterministic: true,
            version: POLICY_VERSION.to_string(),
        }
    }
}

/// POST /api/proof
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    /// ENS name or 0x address
    #[serde(default)]
    pub ens_or_address: Option<String>,
    pub chain_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofInput {
    pub ens_or_address: String,
    pub resolved_address: Address,
    pub source: InputSource,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    pub input: ProofInput,
    pub proof: ProofRecord,
    pub meta: ProofMeta,
}

pub async fn create_proof(
    State(ctx): State<AppContext>,
    payload: Result<Json<ProofRequest>, JsonRejection>,
) -> ProofResult<Json<ProofResponse>> {
    let Json(req) = payload.map_err(|e| ProofError::InvalidInput(e.body_text()))?;

    let ens_or_address = req.ens_or_address.unwrap_or_default();
    let chain_id = ctx.chain_id_or_default(req.chain_id.as_deref());

    let resolved = ctx.identity_resolver.resolve(&ens_or_address).await?;
    let proof = generate_proof(&resolved.address, &chain_id);

    tracing::info!(
        source = ?resolved.source,
        address = %resolved.address,
        %chain_id,
        score = proof.score,
        "Generated proof"
    );

    Ok(Json(ProofResponse {
        input: ProofInput {
            ens_or_address,
            resolved_address: resolved.address,
            source: resolved.source,
        },
        proof,
        meta: ProofMeta::current(),
    }))
}

/// POST /api/proof/batch
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProofRequest {
    /// Items are not required to be strings; non-strings fail per slot
    #[serde(default)]
    pub inputs: Option<Vec<Value>>,
    pub chain_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchProofResponse {
    pub results: Vec<BatchItemResult>,
    pub meta: ProofMeta,
}

pub async fn create_batch_proof(
    State(ctx): State<AppContext>,
    payload: Result<Json<BatchProofRequest>, JsonRejection>,
) -> ProofResult<Json<BatchProofResponse>> {
    let Json(req) = payload.map_err(|e| ProofError::InvalidInput(e.body_text()))?;

    let inputs = req.inputs.unwrap_or_default();
    if inputs.is_empty() {
        return Err(ProofError::InvalidInput(
            "inputs must be a non-empty array.".to_string(),
        ));
    }

    let max = ctx.config.batch.max_batch_size;
    if inputs.len() > max {
        return Err(ProofError::InvalidInput(format!(
            "inputs must contain at most {} items.",
            max
        )));
    }

    let chain_id = ctx.chain_id_or_default(req.chain_id.as_deref());
    let results = ctx.batch_processor.process_batch(&inputs, &chain_id).await;

    Ok(Json(BatchProofResponse {
        results,
        meta: ProofMeta::current(),
    }))
}

/// Build proof routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/proof", post(create_proof))
        .route("/api/proof/batch", post(create_batch_proof))
}
