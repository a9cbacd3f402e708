use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use super::domain::{Lead, LeadId, PhoneNumber, Simulation};

pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(100);

/// Error enumeration for storage failures. Propagated to callers unmodified.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a lead already exists for phone number {0}")]
    Conflict(PhoneNumber),
    #[error("lead {0} not found")]
    NotFound(LeadId),
    #[error("transaction did not finish within {0:?}")]
    TransactionTimeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for leads and their simulations.
///
/// `append_simulation` only stages work on a caller-owned transaction; nothing
/// is visible to `find_by_phone` until `commit` succeeds.
#[async_trait]
pub trait LeadStore: Send + Sync {
    type Transaction: Send;

    /// Exact match on the phone number, with the most recent simulation attached.
    async fn find_by_phone(&self, phone_nr: &PhoneNumber) -> Result<Option<Lead>, StoreError>;

    /// Create a lead row. A second insert for the same phone number is a `Conflict`.
    async fn insert_lead(&self, phone_nr: &PhoneNumber) -> Result<Lead, StoreError>;

    async fn begin(&self) -> Result<Self::Transaction, StoreError>;

    async fn append_simulation(
        &self,
        transaction: &mut Self::Transaction,
        lead_id: LeadId,
        simulation: Simulation,
    ) -> Result<Simulation, StoreError>;

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), StoreError>;

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), StoreError>;
}

/// Append `simulation` to `lead_id` as one unit of work.
///
/// Commits on success; rolls back when the append fails or exceeds `timeout`.
pub async fn execute_in_transaction<S>(
    store: &S,
    timeout: Duration,
    lead_id: LeadId,
    simulation: Simulation,
) -> Result<Simulation, StoreError>
where
    S: LeadStore + ?Sized,
{
    debug!(%lead_id, "opening simulation transaction");
    let mut transaction = store.begin().await?;

    let outcome = tokio::time::timeout(
        timeout,
        store.append_simulation(&mut transaction, lead_id, simulation),
    )
    .await
    .unwrap_or(Err(StoreError::TransactionTimeout(timeout)));

    match outcome {
        Ok(stored) => {
            store.commit(transaction).await?;
            Ok(stored)
        }
        Err(err) => {
            error!(%lead_id, error = %err, "simulation transaction failed");
            if let Err(rollback_err) = store.rollback(transaction).await {
                error!(%lead_id, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
