//! Lead intake: simulation identity, CRM synchronization, storage ports, and
//! the admission service deciding whether a simulation is new or a repeat.

pub mod clock;
pub mod crm;
pub mod domain;
pub mod identity;
pub mod intake;
pub mod memory;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crm::{
    CrmSettings, CrmSync, CrmTransport, CrmTransportError, ExternalServiceError, HttpCrmTransport,
};
pub use domain::{
    InvalidMonthlyPayments, Lead, LeadId, MonthlyPayments, Owner, OwnerRole, PhoneNumber,
    Simulation, SimulationBuilder, SimulationError,
};
pub use identity::SimulationIdentity;
pub use intake::{IntakeGuard, IntakeViolation, LeadSubmission, NewLeadRequest, OwnerRequest};
pub use memory::{InMemoryLeadStore, InMemoryTransaction};
pub use router::lead_router;
pub use service::{
    AdmissionConfig, AdmissionDecision, AdmissionError, LeadAdmissionService, RateLimitError,
};
pub use store::{execute_in_transaction, LeadStore, StoreError};
