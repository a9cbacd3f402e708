use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::domain::{Lead, LeadId, PhoneNumber, Simulation};
use super::identity::SimulationIdentity;
use super::store::{LeadStore, StoreError};

#[derive(Debug, Default)]
struct StoreState {
    last_lead_id: u64,
    leads: HashMap<PhoneNumber, LeadId>,
    simulations: HashMap<LeadId, Vec<Simulation>>,
}

/// Process-local lead store with a unique phone-number key.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLeadStore {
    state: Arc<Mutex<StoreState>>,
}

/// Appends staged until commit.
#[derive(Debug, Default)]
pub struct InMemoryTransaction {
    staged: Vec<(LeadId, Simulation)>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lead_count(&self) -> usize {
        self.state.lock().expect("lead store mutex poisoned").leads.len()
    }

    /// Every committed simulation for a lead, oldest first.
    pub fn simulations_for(&self, lead_id: LeadId) -> Vec<Simulation> {
        self.state
            .lock()
            .expect("lead store mutex poisoned")
            .simulations
            .get(&lead_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    type Transaction = InMemoryTransaction;

    async fn find_by_phone(&self, phone_nr: &PhoneNumber) -> Result<Option<Lead>, StoreError> {
        let guard = self.state.lock().expect("lead store mutex poisoned");
        let Some(&lead_id) = guard.leads.get(phone_nr) else {
            return Ok(None);
        };

        let mut lead = Lead::new(lead_id, phone_nr.clone());
        // Commit order, not `created_at`: the stamp comes from the caller's clock.
        if let Some(latest) = guard.simulations.get(&lead_id).and_then(|history| history.last()) {
            lead = lead.with_last_simulation(latest.clone());
        }

        Ok(Some(lead))
    }

    async fn insert_lead(&self, phone_nr: &PhoneNumber) -> Result<Lead, StoreError> {
        let mut guard = self.state.lock().expect("lead store mutex poisoned");
        if guard.leads.contains_key(phone_nr) {
            return Err(StoreError::Conflict(phone_nr.clone()));
        }

        guard.last_lead_id += 1;
        let lead_id = LeadId(guard.last_lead_id);
        guard.leads.insert(phone_nr.clone(), lead_id);
        guard.simulations.insert(lead_id, Vec::new());

        info!(%lead_id, "lead created");
        Ok(Lead::new(lead_id, phone_nr.clone()))
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        Ok(InMemoryTransaction::default())
    }

    async fn append_simulation(
        &self,
        transaction: &mut Self::Transaction,
        lead_id: LeadId,
        simulation: Simulation,
    ) -> Result<Simulation, StoreError> {
        let known = self
            .state
            .lock()
            .expect("lead store mutex poisoned")
            .simulations
            .contains_key(&lead_id);
        if !known {
            return Err(StoreError::NotFound(lead_id));
        }

        let simulation = if SimulationIdentity::verify(&simulation) {
            simulation
        } else {
            warn!(%lead_id, "carried simulation hash does not match its content, storing recomputed hash");
            simulation.rehashed()
        };

        transaction.staged.push((lead_id, simulation.clone()));
        Ok(simulation)
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), StoreError> {
        let mut guard = self.state.lock().expect("lead store mutex poisoned");
        if let Some((missing, _)) = transaction
            .staged
            .iter()
            .find(|(lead_id, _)| !guard.simulations.contains_key(lead_id))
        {
            return Err(StoreError::NotFound(*missing));
        }

        for (lead_id, simulation) in transaction.staged {
            debug!(%lead_id, hash = simulation.hash(), "simulation committed");
            guard
                .simulations
                .entry(lead_id)
                .or_default()
                .push(simulation);
        }
        Ok(())
    }

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), StoreError> {
        debug!(discarded = transaction.staged.len(), "transaction rolled back");
        Ok(())
    }
}
