use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lead_intake::error::AppError;
use lead_intake::leads::{
    CrmTransport, CrmTransportError, IntakeGuard, Lead, NewLeadRequest, SimulationIdentity,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// CRM stand-in used by the demo; accepts every lead and remembers it.
#[derive(Default, Clone)]
pub(crate) struct RecordingCrmTransport {
    leads: Arc<Mutex<Vec<Lead>>>,
}

#[async_trait]
impl CrmTransport for RecordingCrmTransport {
    async fn post_lead(&self, lead: &Lead) -> Result<(), CrmTransportError> {
        let mut guard = self.leads.lock().expect("crm mutex poisoned");
        guard.push(lead.clone());
        Ok(())
    }
}

impl RecordingCrmTransport {
    pub(crate) fn leads(&self) -> Vec<Lead> {
        self.leads.lock().expect("crm mutex poisoned").clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct HashPreview {
    pub(crate) canonical: String,
    pub(crate) hash: String,
}

/// Validate `request` and report the identity its simulation would carry.
pub(crate) fn preview_hash(
    request: NewLeadRequest,
    received_at: DateTime<Utc>,
) -> Result<HashPreview, AppError> {
    let submission = IntakeGuard::default().submission_from_request(request, received_at)?;
    Ok(HashPreview {
        canonical: SimulationIdentity::canonicalize(&submission.simulation),
        hash: SimulationIdentity::hash(&submission.simulation),
    })
}

pub(crate) fn load_request(path: &Path) -> Result<NewLeadRequest, AppError> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}
