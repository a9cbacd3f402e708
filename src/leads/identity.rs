//! Content-addressed identity for simulations.
//!
//! Two submissions carrying the same amount, house worth, city, and owner
//! list (in the same order) are the same request and share a hash.

use sha2::{Digest, Sha256};

use super::domain::{Owner, Simulation};

const FIELD_DELIMITER: &str = "|";

pub struct SimulationIdentity;

impl SimulationIdentity {
    /// Render the delimiter-joined form the hash is computed over.
    pub fn canonicalize(simulation: &Simulation) -> String {
        let mut fields = vec![
            render_number(simulation.amount()),
            render_number(simulation.house_worth()),
            simulation.city().trim().to_string(),
        ];
        fields.extend(simulation.owners().iter().map(Self::canonical_owner));
        fields.join(FIELD_DELIMITER)
    }

    pub fn canonical_owner(owner: &Owner) -> String {
        [
            owner.role.label().to_string(),
            owner.first_name.trim().to_string(),
            owner.last_name.trim().to_string(),
            owner
                .email
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            owner.birth_date.format("%Y-%m-%d").to_string(),
            render_number(owner.monthly_income),
            owner
                .monthly_payments
                .map(|payments| payments.count().to_string())
                .unwrap_or_default(),
        ]
        .join(FIELD_DELIMITER)
    }

    /// Lowercase hex SHA-256 of the canonical form. Ignores the carried hash.
    pub fn hash(simulation: &Simulation) -> String {
        let digest = Sha256::digest(Self::canonicalize(simulation).as_bytes());
        hex::encode(digest)
    }

    pub fn verify(simulation: &Simulation) -> bool {
        simulation.hash() == Self::hash(simulation)
    }
}

/// Shortest decimal form: `50000` for whole values, `2500.5` otherwise.
fn render_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}
