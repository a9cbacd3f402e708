use crate::infra::{load_request, preview_hash, RecordingCrmTransport};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use lead_intake::error::AppError;
use lead_intake::leads::{
    AdmissionConfig, AdmissionError, Clock, CrmSettings, CrmSync, InMemoryLeadStore,
    IntakeViolation, LeadAdmissionService, ManualClock, MonthlyPayments, Owner, OwnerRole,
    PhoneNumber, Simulation, SimulationError,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct HashArgs {
    /// JSON file holding a lead request body
    #[arg(long)]
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Phone number used for the demo lead.
    #[arg(long)]
    pub(crate) phone: Option<String>,
    /// Override the cooldown window in minutes (defaults to 10).
    #[arg(long)]
    pub(crate) cooldown_minutes: Option<i64>,
}

pub(crate) fn run_hash(args: HashArgs) -> Result<(), AppError> {
    let request = load_request(&args.file)?;
    let preview = preview_hash(request, Utc::now())?;
    println!("canonical: {}", preview.canonical);
    println!("hash:      {}", preview.hash);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let phone_nr = PhoneNumber::new(args.phone.unwrap_or_else(|| "+391234567".to_string()));
    let config = AdmissionConfig {
        cooldown_minutes: args
            .cooldown_minutes
            .unwrap_or(AdmissionConfig::default().cooldown_minutes),
        ..AdmissionConfig::default()
    };
    let cooldown = config.cooldown_minutes;

    let started = Utc::now();
    let clock = ManualClock::new(started);
    let store = Arc::new(InMemoryLeadStore::new());
    let crm = Arc::new(RecordingCrmTransport::default());
    let service = LeadAdmissionService::new(
        store.clone(),
        CrmSync::new(crm.clone(), CrmSettings::default()),
        Arc::new(clock.clone()),
        config,
    );

    println!("Lead intake demo (phone {phone_nr}, cooldown {cooldown} min)");

    let steps: [(&str, Duration, &str); 4] = [
        ("First simulation", Duration::zero(), "Roma"),
        ("Same request a minute later", Duration::minutes(1), "Roma"),
        ("Changed city", Duration::zero(), "Milano"),
        (
            "Same request after the cooldown",
            Duration::minutes(cooldown + 1),
            "Milano",
        ),
    ];

    for (label, wait, city) in steps {
        clock.advance(wait);
        let simulation = demo_simulation(city, clock.now()).map_err(IntakeViolation::from)?;
        let hash = simulation.hash().to_string();
        match service.submit(phone_nr.clone(), simulation).await {
            Ok(lead) => {
                println!("- {label}: admitted for lead {} (hash {})", lead.id, short(&hash))
            }
            Err(AdmissionError::RateLimited(err)) => {
                println!("- {label}: rejected, {err} (hash {})", short(&hash))
            }
            Err(err) => {
                println!("- {label}: failed, {err}");
                return Ok(());
            }
        }
    }

    println!(
        "\nLeads stored: {} | CRM deliveries: {}",
        store.lead_count(),
        crm.leads().len()
    );
    if let Some(lead) = crm.leads().first() {
        println!("Simulations on lead {}:", lead.id);
        for simulation in store.simulations_for(lead.id) {
            println!(
                "  - {} at {} (hash {})",
                simulation.city(),
                simulation.created_at().format("%H:%M:%S"),
                short(simulation.hash())
            );
        }
    }

    Ok(())
}

fn demo_simulation(city: &str, created_at: DateTime<Utc>) -> Result<Simulation, SimulationError> {
    let owner = Owner::new(
        OwnerRole::First,
        "Mario",
        "Bianchi",
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN),
        5000.0,
    )
    .with_monthly_payments(MonthlyPayments::Twelve);

    Simulation::builder(50_000.0, 200_000.0, city)
        .owner(owner)
        .created_at(created_at)
        .build()
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
