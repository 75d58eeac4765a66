/// Batch Orchestrator - Proofs for many identifiers in one call
///
/// Every input runs its own pipeline (classify, resolve if it is a name,
/// generate the proof). Name lookups and address pass-throughs are admitted
/// through separate lanes so the rate-sensitive upstream sees at most
/// `name_lane` concurrent lookups. A failing item becomes a failure
/// record in its slot; it never affects other items.
use crate::{
    error::{ErrorBody, ProofError, ProofResult},
    identity::{Address, Identifier, IdentityResolver},
    metrics,
    proof::generate_proof,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Lane sizes
#[derive(Debug, Clone, Copy)]
pub struct LaneConfig {
    /// Concurrent name lookups
    pub name_lane: usize,
    /// Concurrent address pass-throughs
    pub address_lane: usize,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            name_lane: 1,
            address_lane: 2,
        }
    }
}

/// Successful batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProofSuccess {
    pub input: String,
    pub resolved_address: Address,
    pub proof_hash: String,
    pub score: u8,
    pub tags: [String; 2],
    pub deterministic: bool,
}

/// Failed batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProofFailure {
    pub input: String,
    pub error: ErrorBody,
}

/// Outcome for one input slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Success(BatchProofSuccess),
    Failure(BatchProofFailure),
}

impl BatchItemResult {
    pub fn input(&self) -> &str {
        match self {
            BatchItemResult::Success(s) => &s.input,
            BatchItemResult::Failure(f) => &f.input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success(_))
    }

    /// Error code for failures
    pub fn error_code(&self) -> Option<&str> {
        match self {
            BatchItemResult::Success(_) => None,
            BatchItemResult::Failure(f) => Some(&f.error.code),
        }
    }
}

/// Batch processor owning the two admission lanes
///
/// Lanes are shared by every batch handled through this processor, so the
/// ceilings hold process-wide when it lives in `AppContext`.
#[derive(Clone)]
pub struct BatchProcessor {
    resolver: Arc<IdentityResolver>,
    name_lane: Arc<Semaphore>,
    address_lane: Arc<Semaphore>,
}

impl BatchProcessor {
    pub fn new(resolver: Arc<IdentityResolver>, lanes: LaneConfig) -> Self {
        Self {
            resolver,
            name_lane: Arc::new(Semaphore::new(lanes.name_lane)),
            address_lane: Arc::new(Semaphore::new(lanes.address_lane)),
        }
    }

    /// Process all inputs, returning one result per input in input order
    pub async fn process_batch(&self, inputs: &[Value], chain_id: &str) -> Vec<BatchItemResult> {
        let results = join_all(
            inputs
                .iter()
                .map(|input| self.process_item(input, chain_id)),
        )
        .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        tracing::info!(
            total = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            chain_id,
            "Processed proof batch"
        );

        results
    }

    async fn process_item(&self, input: &Value, chain_id: &str) -> BatchItemResult {
        let outcome = match input {
            Value::String(raw) => self
                .prove(raw, chain_id)
                .await
                .map_err(|err| (raw.clone(), err)),
            other => Err((
                other.to_string(),
                ProofError::InvalidInput("Each input must be a string.".to_string()),
            )),
        };

        match outcome {
            Ok(success) => {
                metrics::record_batch_item("OK");
                BatchItemResult::Success(success)
            }
            Err((input, err)) => {
                metrics::record_batch_item(err.code());
                tracing::debug!(%input, code = err.code(), "Batch item failed: {}", err);
                BatchItemResult::Failure(BatchProofFailure {
                    input,
                    error: err.body(),
                })
            }
        }
    }

    /// Single item pipeline: classify, wait for a lane slot, resolve, prove
    async fn prove(&self, raw: &str, chain_id: &str) -> ProofResult<BatchProofSuccess> {
        let identifier = Identifier::classify(raw)?;

        let lane = match identifier {
            Identifier::Name(_) => &self.name_lane,
            Identifier::Address(_) => &self.address_lane,
        };
        let _permit = lane
            .acquire()
            .await
            .map_err(|_| ProofError::Internal("Batch lane closed".to_string()))?;

        let address = self.resolver.resolve_identifier(&identifier).await?;
        let proof = generate_proof(&address, chain_id);

        Ok(BatchProofSuccess {
            input: raw.to_string(),
            resolved_address: address,
            proof_hash: proof.proof_hash,
            score: proof.score,
            tags: proof.tags,
            deterministic: true,
        })
    }
}
