use super::common::*;
use crate::leads::domain::{MonthlyPayments, Simulation, SimulationError};
use crate::leads::identity::SimulationIdentity;

#[test]
fn canonical_form_joins_fields_in_order() {
    let simulation = rome_simulation(sample_time());

    assert_eq!(
        SimulationIdentity::canonicalize(&simulation),
        "50000|200000|Roma|FIRST|Mario|Bianchi||1990-01-01|5000|12"
    );
}

#[test]
fn hash_is_lowercase_sha256_hex_of_canonical_form() {
    let simulation = rome_simulation(sample_time());

    assert_eq!(
        SimulationIdentity::hash(&simulation),
        "9ed034ce7c0a64a085629940915964f805314401dda6e1636c3c32c13048db50"
    );
    assert_eq!(simulation.hash(), SimulationIdentity::hash(&simulation));
}

#[test]
fn identical_content_hashes_identically_regardless_of_timestamp() {
    let first = rome_simulation(sample_time());
    let later = rome_simulation(sample_time() + chrono::Duration::hours(3));

    assert_eq!(first.hash(), later.hash());
}

#[test]
fn whitespace_around_text_fields_is_ignored() {
    let mut padded_owner = mario();
    padded_owner.first_name = "  Mario ".to_string();
    padded_owner.email = Some(" ".to_string());
    let padded = Simulation::builder(50_000.0, 200_000.0, " Roma  ")
        .owner(padded_owner)
        .build()
        .expect("simulation builds");

    assert_eq!(padded.hash(), rome_simulation(sample_time()).hash());
}

#[test]
fn changing_any_field_changes_the_hash() {
    let baseline = rome_simulation(sample_time());

    let amount = Simulation::builder(50_001.0, 200_000.0, "Roma")
        .owner(mario())
        .build()
        .expect("simulation builds");
    let worth = Simulation::builder(50_000.0, 210_000.0, "Roma")
        .owner(mario())
        .build()
        .expect("simulation builds");
    let city = simulation_in("Milano", sample_time());

    let mut income_owner = mario();
    income_owner.monthly_income = 5100.0;
    let income = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owner(income_owner)
        .build()
        .expect("simulation builds");

    let payments = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owner(mario().with_monthly_payments(MonthlyPayments::Fourteen))
        .build()
        .expect("simulation builds");

    let email = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owner(mario().with_email("mbianchi@example.com"))
        .build()
        .expect("simulation builds");

    for changed in [amount, worth, city, income, payments, email] {
        assert_ne!(changed.hash(), baseline.hash());
    }
}

#[test]
fn owner_order_is_significant() {
    let forward = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owners([mario(), giulia()])
        .build()
        .expect("simulation builds");
    let reversed = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owners([giulia(), mario()])
        .build()
        .expect("simulation builds");

    assert_ne!(forward.hash(), reversed.hash());
}

#[test]
fn second_owner_renders_email_and_empty_payments() {
    assert_eq!(
        SimulationIdentity::canonical_owner(&giulia()),
        "SECOND|Giulia|Rossi|giulia.rossi@example.com|1992-06-15|3200|"
    );
}

#[test]
fn supplied_hash_is_kept_and_ignored_by_recomputation() {
    let rehydrated = Simulation::builder(50_000.0, 200_000.0, "Roma")
        .owner(mario())
        .hash("stored-hash")
        .created_at(sample_time())
        .build()
        .expect("simulation builds");

    assert_eq!(rehydrated.hash(), "stored-hash");
    assert!(!SimulationIdentity::verify(&rehydrated));
    assert_eq!(
        SimulationIdentity::hash(&rehydrated),
        rome_simulation(sample_time()).hash()
    );
    assert!(SimulationIdentity::verify(&rehydrated.rehashed()));
}

#[test]
fn builder_requires_an_owner() {
    assert_eq!(
        Simulation::builder(50_000.0, 200_000.0, "Roma").build(),
        Err(SimulationError::NoOwners)
    );
}

#[test]
fn whole_minutes_round_down_and_clamp_future_instants() {
    let simulation = rome_simulation(sample_time());

    let almost_eleven = sample_time() + chrono::Duration::seconds(10 * 60 + 59);
    assert_eq!(simulation.whole_minutes_until(almost_eleven), 10);

    let before_creation = sample_time() - chrono::Duration::minutes(5);
    assert_eq!(simulation.whole_minutes_until(before_creation), 0);
}

#[test]
fn fractional_values_render_in_shortest_decimal_form() {
    let mut owner = mario();
    owner.monthly_income = 2500.5;
    let simulation = Simulation::builder(50_000.0, 200_000.25, "Roma")
        .owner(owner)
        .created_at(sample_time())
        .build()
        .expect("simulation builds");

    assert_eq!(
        SimulationIdentity::canonicalize(&simulation),
        "50000|200000.25|Roma|FIRST|Mario|Bianchi||1990-01-01|2500.5|12"
    );
    assert_ne!(simulation.hash(), rome_simulation(sample_time()).hash());
}
