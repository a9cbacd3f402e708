use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    InvalidMonthlyPayments, MonthlyPayments, Owner, OwnerRole, PhoneNumber, Simulation,
    SimulationError,
};

const DEFAULT_MINIMUM_AMOUNT: f64 = 1000.0;
const DEFAULT_MINIMUM_AGE: i32 = 18;
const DEFAULT_MAXIMUM_AGE: i32 = 100;

/// Inbound payload for `POST /api/lead-service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeadRequest {
    pub amount: f64,
    pub house_worth: f64,
    pub city: String,
    pub phone_nr: String,
    pub owners: Vec<OwnerRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRequest {
    #[serde(rename = "type")]
    pub role: OwnerRole,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub birth_date: String,
    pub monthly_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payments: Option<u8>,
}

/// A validated submission ready for admission.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadSubmission {
    pub phone_nr: PhoneNumber,
    pub simulation: Simulation,
}

/// Validation errors raised while turning a request into a submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("{field} must be at least {minimum} (found {found})")]
    BelowMinimum {
        field: &'static str,
        minimum: f64,
        found: f64,
    },
    #[error("{0} must not be empty")]
    Blank(&'static str),
    #[error("at least one owner must be provided")]
    NoOwners,
    #[error("owner {index}: '{value}' is not a valid email address")]
    InvalidEmail { index: usize, value: String },
    #[error("owner {index}: birth_date '{value}' is not a YYYY-MM-DD date")]
    InvalidBirthDate { index: usize, value: String },
    #[error("owner {index}: owner must be between {minimum} and {maximum} years old (found {age})")]
    AgeOutOfRange {
        index: usize,
        age: i32,
        minimum: i32,
        maximum: i32,
    },
    #[error("owner {index}: monthly_income must be positive")]
    NonPositiveIncome { index: usize },
    #[error("owner {index}: {source}")]
    MonthlyPayments {
        index: usize,
        source: InvalidMonthlyPayments,
    },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Guard responsible for producing `LeadSubmission` values from raw requests.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    minimum_amount: f64,
    minimum_age: i32,
    maximum_age: i32,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self {
            minimum_amount: DEFAULT_MINIMUM_AMOUNT,
            minimum_age: DEFAULT_MINIMUM_AGE,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

impl IntakeGuard {
    /// Validate `request` and stamp the resulting simulation with `received_at`.
    pub fn submission_from_request(
        &self,
        request: NewLeadRequest,
        received_at: DateTime<Utc>,
    ) -> Result<LeadSubmission, IntakeViolation> {
        self.check_minimum("amount", request.amount)?;
        self.check_minimum("house_worth", request.house_worth)?;
        if request.city.trim().is_empty() {
            return Err(IntakeViolation::Blank("city"));
        }
        if request.phone_nr.trim().is_empty() {
            return Err(IntakeViolation::Blank("phone_nr"));
        }
        if request.owners.is_empty() {
            return Err(IntakeViolation::NoOwners);
        }

        let today = received_at.date_naive();
        let owners = request
            .owners
            .into_iter()
            .enumerate()
            .map(|(index, owner)| self.owner_from_request(index, owner, today))
            .collect::<Result<Vec<_>, _>>()?;

        let simulation = Simulation::builder(request.amount, request.house_worth, request.city)
            .owners(owners)
            .created_at(received_at)
            .build()?;

        Ok(LeadSubmission {
            phone_nr: PhoneNumber::new(request.phone_nr),
            simulation,
        })
    }

    fn check_minimum(&self, field: &'static str, found: f64) -> Result<(), IntakeViolation> {
        if !(found >= self.minimum_amount) {
            return Err(IntakeViolation::BelowMinimum {
                field,
                minimum: self.minimum_amount,
                found,
            });
        }
        Ok(())
    }

    fn owner_from_request(
        &self,
        index: usize,
        request: OwnerRequest,
        today: NaiveDate,
    ) -> Result<Owner, IntakeViolation> {
        if request.first_name.trim().is_empty() {
            return Err(IntakeViolation::Blank("first_name"));
        }
        if request.last_name.trim().is_empty() {
            return Err(IntakeViolation::Blank("last_name"));
        }

        let birth_date = NaiveDate::parse_from_str(request.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| IntakeViolation::InvalidBirthDate {
                index,
                value: request.birth_date.clone(),
            })?;
        let age = age_on(birth_date, today);
        if age < self.minimum_age || age > self.maximum_age {
            return Err(IntakeViolation::AgeOutOfRange {
                index,
                age,
                minimum: self.minimum_age,
                maximum: self.maximum_age,
            });
        }

        if !(request.monthly_income > 0.0) {
            return Err(IntakeViolation::NonPositiveIncome { index });
        }

        let mut owner = Owner::new(
            request.role,
            request.first_name,
            request.last_name,
            birth_date,
            request.monthly_income,
        );

        if let Some(email) = request.email {
            if !looks_like_email(&email) {
                return Err(IntakeViolation::InvalidEmail {
                    index,
                    value: email,
                });
            }
            owner = owner.with_email(email);
        }

        if let Some(raw) = request.monthly_payments {
            let payments = MonthlyPayments::try_from(raw)
                .map_err(|source| IntakeViolation::MonthlyPayments { index, source })?;
            owner = owner.with_monthly_payments(payments);
        }

        Ok(owner)
    }
}

/// Completed years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

fn looks_like_email(raw: &str) -> bool {
    let candidate = raw.trim();
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !candidate.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
