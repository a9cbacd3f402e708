use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::clock::Clock;
use super::crm::{CrmSync, CrmTransport, ExternalServiceError};
use super::domain::{Lead, PhoneNumber, Simulation};
use super::identity::SimulationIdentity;
use super::store::{execute_in_transaction, LeadStore, StoreError, DEFAULT_TRANSACTION_TIMEOUT};

pub const DEFAULT_COOLDOWN_MINUTES: i64 = 10;

/// Dials for the admission rule and its storage transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Identical simulations are rejected until strictly more than this many
    /// whole minutes have passed.
    pub cooldown_minutes: i64,
    pub transaction_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

/// Raised when a submission repeats the previous simulation inside the cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Too many request exception")]
pub struct RateLimitError;

impl RateLimitError {
    pub const CODE: &'static str = "429";
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AdmissionError {
    /// Code a caller can map to a status; storage failures carry none.
    pub fn code(&self) -> Option<&str> {
        match self {
            AdmissionError::RateLimited(_) => Some(RateLimitError::CODE),
            AdmissionError::ExternalService(err) => Some(&err.code),
            AdmissionError::Storage(_) => None,
        }
    }
}

/// Verdict on a candidate simulation against the lead's previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    FirstSimulation,
    ChangedRequest,
    CooldownElapsed { minutes: i64 },
    Duplicate { minutes: i64 },
}

impl AdmissionDecision {
    pub const fn is_admitted(self) -> bool {
        !matches!(self, AdmissionDecision::Duplicate { .. })
    }

    pub const fn label(self) -> &'static str {
        match self {
            AdmissionDecision::FirstSimulation => "first_simulation",
            AdmissionDecision::ChangedRequest => "changed_request",
            AdmissionDecision::CooldownElapsed { .. } => "cooldown_elapsed",
            AdmissionDecision::Duplicate { .. } => "duplicate",
        }
    }
}

/// Looks up or creates leads, syncs new ones to the CRM, and admits simulations.
pub struct LeadAdmissionService<S, T> {
    store: Arc<S>,
    crm: CrmSync<T>,
    clock: Arc<dyn Clock>,
    config: AdmissionConfig,
}

impl<S, T> LeadAdmissionService<S, T>
where
    S: LeadStore + 'static,
    T: CrmTransport + 'static,
{
    pub fn new(
        store: Arc<S>,
        crm: CrmSync<T>,
        clock: Arc<dyn Clock>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            store,
            crm,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Admit `simulation` for the lead identified by `phone_nr`.
    ///
    /// A lead seen for the first time is inserted and synced to the CRM
    /// before admission. When that sync fails the lead stays persisted and
    /// the error is returned without attaching the simulation.
    pub async fn submit(
        &self,
        phone_nr: PhoneNumber,
        simulation: Simulation,
    ) -> Result<Lead, AdmissionError> {
        let mut lead = match self.store.find_by_phone(&phone_nr).await? {
            Some(lead) => lead,
            None => {
                let lead = self.store.insert_lead(&phone_nr).await?;
                // TODO: record unsynced leads in an outbox so a later job can retry the CRM push.
                if let Err(err) = self.crm.sync_lead(&lead).await {
                    warn!(lead_id = %lead.id, code = %err.code, "lead persisted without crm sync");
                    return Err(err.into());
                }
                lead
            }
        };

        let candidate_hash = SimulationIdentity::hash(&simulation);
        let decision = self.evaluate(lead.last_simulation.as_ref(), &candidate_hash);
        if !decision.is_admitted() {
            info!(lead_id = %lead.id, decision = decision.label(), "simulation rejected");
            return Err(RateLimitError.into());
        }

        let stored = execute_in_transaction(
            self.store.as_ref(),
            self.config.transaction_timeout,
            lead.id,
            simulation,
        )
        .await?;

        info!(lead_id = %lead.id, decision = decision.label(), hash = stored.hash(), "simulation admitted");
        lead.last_simulation = Some(stored);
        Ok(lead)
    }

    /// Apply the admission rule against the previous simulation, if any.
    pub fn evaluate(&self, previous: Option<&Simulation>, candidate_hash: &str) -> AdmissionDecision {
        let Some(previous) = previous else {
            return AdmissionDecision::FirstSimulation;
        };

        if previous.hash() != candidate_hash {
            return AdmissionDecision::ChangedRequest;
        }

        let minutes = previous.whole_minutes_until(self.clock.now());
        if minutes > self.config.cooldown_minutes {
            AdmissionDecision::CooldownElapsed { minutes }
        } else {
            AdmissionDecision::Duplicate { minutes }
        }
    }
}
