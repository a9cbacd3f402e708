use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::leads::clock::ManualClock;
use crate::leads::crm::{CrmSettings, CrmSync, CrmTransport, CrmTransportError};
use crate::leads::domain::{
    Lead, LeadId, MonthlyPayments, Owner, OwnerRole, PhoneNumber, Simulation,
};
use crate::leads::intake::{NewLeadRequest, OwnerRequest};
use crate::leads::memory::{InMemoryLeadStore, InMemoryTransaction};
use crate::leads::service::{AdmissionConfig, LeadAdmissionService};
use crate::leads::store::{LeadStore, StoreError};

pub(crate) fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("valid instant")
}

pub(crate) fn phone() -> PhoneNumber {
    PhoneNumber::new("+391234567")
}

pub(crate) fn mario() -> Owner {
    Owner::new(
        OwnerRole::First,
        "Mario",
        "Bianchi",
        NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
        5000.0,
    )
    .with_monthly_payments(MonthlyPayments::Twelve)
}

pub(crate) fn giulia() -> Owner {
    Owner::new(
        OwnerRole::Second,
        "Giulia",
        "Rossi",
        NaiveDate::from_ymd_opt(1992, 6, 15).expect("valid date"),
        3200.0,
    )
    .with_email("giulia.rossi@example.com")
}

pub(crate) fn simulation_in(city: &str, created_at: DateTime<Utc>) -> Simulation {
    Simulation::builder(50_000.0, 200_000.0, city)
        .owner(mario())
        .created_at(created_at)
        .build()
        .expect("simulation builds")
}

pub(crate) fn rome_simulation(created_at: DateTime<Utc>) -> Simulation {
    simulation_in("Roma", created_at)
}

pub(crate) fn request_payload() -> NewLeadRequest {
    NewLeadRequest {
        amount: 50_000.0,
        house_worth: 200_000.0,
        city: "Roma".to_string(),
        phone_nr: "+391234567".to_string(),
        owners: vec![OwnerRequest {
            role: OwnerRole::First,
            first_name: "Mario".to_string(),
            last_name: "Bianchi".to_string(),
            email: Some("mbianchi@example.com".to_string()),
            birth_date: "1990-01-01".to_string(),
            monthly_income: 5000.0,
            monthly_payments: Some(12),
        }],
    }
}

pub(crate) fn quick_crm_settings() -> CrmSettings {
    CrmSettings {
        timeout: Duration::from_secs(1),
        max_retries: 3,
        retry_delay: Duration::from_millis(5),
    }
}

/// CRM transport replaying queued outcomes; succeeds once the queue is empty.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<(), CrmTransportError>>>,
    delivered: Mutex<Vec<Lead>>,
    attempts: Mutex<u32>,
}

impl ScriptedTransport {
    pub(crate) fn failing_with(error: CrmTransportError, times: usize) -> Self {
        let transport = Self::default();
        {
            let mut outcomes = transport.outcomes.lock().expect("transport mutex poisoned");
            for _ in 0..times {
                outcomes.push_back(Err(error.clone()));
            }
        }
        transport
    }

    pub(crate) fn attempts(&self) -> u32 {
        *self.attempts.lock().expect("transport mutex poisoned")
    }

    pub(crate) fn delivered(&self) -> Vec<Lead> {
        self.delivered
            .lock()
            .expect("transport mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl CrmTransport for ScriptedTransport {
    async fn post_lead(&self, lead: &Lead) -> Result<(), CrmTransportError> {
        *self.attempts.lock().expect("transport mutex poisoned") += 1;
        let outcome = self
            .outcomes
            .lock()
            .expect("transport mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            self.delivered
                .lock()
                .expect("transport mutex poisoned")
                .push(lead.clone());
        }
        outcome
    }
}

/// Transport whose requests never complete.
pub(crate) struct HangingTransport;

#[async_trait]
impl CrmTransport for HangingTransport {
    async fn post_lead(&self, _lead: &Lead) -> Result<(), CrmTransportError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// In-memory store that can be told to fail appends.
#[derive(Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: InMemoryLeadStore,
    fail_appends: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LeadStore for FlakyStore {
    type Transaction = InMemoryTransaction;

    async fn find_by_phone(&self, phone_nr: &PhoneNumber) -> Result<Option<Lead>, StoreError> {
        self.inner.find_by_phone(phone_nr).await
    }

    async fn insert_lead(&self, phone_nr: &PhoneNumber) -> Result<Lead, StoreError> {
        self.inner.insert_lead(phone_nr).await
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        self.inner.begin().await
    }

    async fn append_simulation(
        &self,
        transaction: &mut Self::Transaction,
        lead_id: LeadId,
        simulation: Simulation,
    ) -> Result<Simulation, StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner
            .append_simulation(transaction, lead_id, simulation)
            .await
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), StoreError> {
        self.inner.commit(transaction).await
    }

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), StoreError> {
        self.inner.rollback(transaction).await
    }
}

/// Store that never finds a lead and always loses the insert race.
pub(crate) struct ConflictStore;

#[async_trait]
impl LeadStore for ConflictStore {
    type Transaction = ();

    async fn find_by_phone(&self, _phone_nr: &PhoneNumber) -> Result<Option<Lead>, StoreError> {
        Ok(None)
    }

    async fn insert_lead(&self, phone_nr: &PhoneNumber) -> Result<Lead, StoreError> {
        Err(StoreError::Conflict(phone_nr.clone()))
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        Ok(())
    }

    async fn append_simulation(
        &self,
        _transaction: &mut Self::Transaction,
        lead_id: LeadId,
        _simulation: Simulation,
    ) -> Result<Simulation, StoreError> {
        Err(StoreError::NotFound(lead_id))
    }

    async fn commit(&self, _transaction: Self::Transaction) -> Result<(), StoreError> {
        Ok(())
    }

    async fn rollback(&self, _transaction: Self::Transaction) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store whose backend is offline.
pub(crate) struct UnavailableStore;

#[async_trait]
impl LeadStore for UnavailableStore {
    type Transaction = ();

    async fn find_by_phone(&self, _phone_nr: &PhoneNumber) -> Result<Option<Lead>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn insert_lead(&self, _phone_nr: &PhoneNumber) -> Result<Lead, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn append_simulation(
        &self,
        _transaction: &mut Self::Transaction,
        _lead_id: LeadId,
        _simulation: Simulation,
    ) -> Result<Simulation, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn commit(&self, _transaction: Self::Transaction) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn rollback(&self, _transaction: Self::Transaction) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(crate) fn service_with<S, T>(
    store: Arc<S>,
    transport: Arc<T>,
    clock: &ManualClock,
) -> LeadAdmissionService<S, T>
where
    S: LeadStore + 'static,
    T: CrmTransport + 'static,
{
    LeadAdmissionService::new(
        store,
        CrmSync::new(transport, quick_crm_settings()),
        Arc::new(clock.clone()),
        AdmissionConfig::default(),
    )
}

pub(crate) fn build_service() -> (
    LeadAdmissionService<InMemoryLeadStore, ScriptedTransport>,
    Arc<InMemoryLeadStore>,
    Arc<ScriptedTransport>,
    ManualClock,
) {
    let store = Arc::new(InMemoryLeadStore::new());
    let transport = Arc::new(ScriptedTransport::default());
    let clock = ManualClock::new(sample_time());
    let service = service_with(store.clone(), transport.clone(), &clock);
    (service, store, transport, clock)
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
