use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::identity::SimulationIdentity;

/// Store-assigned identifier of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub u64);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phone number identifying an applicant; the natural key of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(pub String);

impl PhoneNumber {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a co-owner on the loan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OwnerRole {
    First,
    Second,
}

impl OwnerRole {
    pub const fn label(self) -> &'static str {
        match self {
            OwnerRole::First => "FIRST",
            OwnerRole::Second => "SECOND",
        }
    }
}

/// Number of salary installments received per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MonthlyPayments {
    Twelve,
    Thirteen,
    Fourteen,
}

impl MonthlyPayments {
    pub const fn count(self) -> u8 {
        match self {
            MonthlyPayments::Twelve => 12,
            MonthlyPayments::Thirteen => 13,
            MonthlyPayments::Fourteen => 14,
        }
    }
}

impl TryFrom<u8> for MonthlyPayments {
    type Error = InvalidMonthlyPayments;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            12 => Ok(Self::Twelve),
            13 => Ok(Self::Thirteen),
            14 => Ok(Self::Fourteen),
            other => Err(InvalidMonthlyPayments(other)),
        }
    }
}

impl From<MonthlyPayments> for u8 {
    fn from(value: MonthlyPayments) -> Self {
        value.count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("monthly payments must be 12, 13 or 14 (found {0})")]
pub struct InvalidMonthlyPayments(pub u8);

/// One co-owner of the property described by a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "type")]
    pub role: OwnerRole,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub birth_date: NaiveDate,
    pub monthly_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payments: Option<MonthlyPayments>,
}

impl Owner {
    pub fn new(
        role: OwnerRole,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
        monthly_income: f64,
    ) -> Self {
        Self {
            role,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            birth_date,
            monthly_income,
            monthly_payments: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_monthly_payments(mut self, payments: MonthlyPayments) -> Self {
        self.monthly_payments = Some(payments);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("a simulation requires at least one owner")]
    NoOwners,
}

/// A single loan simulation request.
///
/// Fields are private so the content hash can never drift from the values it
/// was computed over. Build new values through [`Simulation::builder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    amount: f64,
    house_worth: f64,
    city: String,
    owners: Vec<Owner>,
    hash: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl Simulation {
    pub fn builder(amount: f64, house_worth: f64, city: impl Into<String>) -> SimulationBuilder {
        SimulationBuilder {
            amount,
            house_worth,
            city: city.into(),
            owners: Vec::new(),
            hash: None,
            created_at: None,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn house_worth(&self) -> f64 {
        self.house_worth
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whole minutes elapsed between creation and `now`, rounded down.
    ///
    /// A creation instant later than `now` counts as zero elapsed minutes.
    pub fn whole_minutes_until(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes().max(0)
    }

    /// Replace the carried hash with the one derived from the current fields.
    pub fn rehashed(mut self) -> Self {
        self.hash = SimulationIdentity::hash(&self);
        self
    }
}

/// Builder computing the content hash unless a stored one is supplied.
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    amount: f64,
    house_worth: f64,
    city: String,
    owners: Vec<Owner>,
    hash: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl SimulationBuilder {
    pub fn owner(mut self, owner: Owner) -> Self {
        self.owners.push(owner);
        self
    }

    pub fn owners(mut self, owners: impl IntoIterator<Item = Owner>) -> Self {
        self.owners.extend(owners);
        self
    }

    /// Carry a previously persisted hash instead of recomputing it.
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn build(self) -> Result<Simulation, SimulationError> {
        if self.owners.is_empty() {
            return Err(SimulationError::NoOwners);
        }

        let mut simulation = Simulation {
            amount: self.amount,
            house_worth: self.house_worth,
            city: self.city,
            owners: self.owners,
            hash: String::new(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        simulation.hash = match self.hash {
            Some(hash) => hash,
            None => SimulationIdentity::hash(&simulation),
        };

        Ok(simulation)
    }
}

/// Applicant record keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    pub phone_nr: PhoneNumber,
    pub last_simulation: Option<Simulation>,
}

impl Lead {
    pub fn new(id: LeadId, phone_nr: PhoneNumber) -> Self {
        Self {
            id,
            phone_nr,
            last_simulation: None,
        }
    }

    pub fn with_last_simulation(mut self, simulation: Simulation) -> Self {
        self.last_simulation = Some(simulation);
        self
    }
}
