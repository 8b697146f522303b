use log::debug;
use referral_shared::config::ClientConfig;
use referral_shared::test_utils::mock_referral_api::Operation;
use referral_shared::test_utils::{init_test_logging, MockReferralApi};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::{FieldKey, FIELDS_REQUIRED, INVITOR_NOT_FOUND, USER_ID_TAKEN};
use crate::form::{RegisterForm, SUCCESS_MESSAGE};
use crate::models::SubmitOutcome;

fn seeded_api() -> MockReferralApi {
    MockReferralApi::new()
        .with_user("ROOT001", "Pavan", None)
        .with_user("U1", "Uma", Some("ROOT001"))
}

fn test_config(debounce: Duration) -> ClientConfig {
    ClientConfig::default().with_debounce(debounce)
}

// Helper to set up a mounted form over the given mock API
async fn create_test_form(api: MockReferralApi) -> (RegisterForm<MockReferralApi>, Arc<MockReferralApi>) {
    init_test_logging();
    let api = Arc::new(api);
    let form = RegisterForm::new(Arc::clone(&api), &test_config(Duration::ZERO));
    form.mount();
    form.settle().await;
    (form, api)
}

#[tokio::test(start_paused = true)]
async fn test_mount_resolves_default_invitor() {
    let (form, api) = create_test_form(seeded_api()).await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_id, "ROOT001");
    assert_eq!(snapshot.invitor_name, "Pavan");
    assert!(snapshot.errors.is_empty());
    assert!(!snapshot.loading);

    // empty yourId is cleared locally, no existence check
    assert_eq!(api.calls(Operation::Lookup), 1);
    assert_eq!(api.calls(Operation::Exists), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_invitor_shows_error() {
    let (form, _api) = create_test_form(seeded_api()).await;

    form.set_invitor_id("NOBODY");
    form.settle().await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_name, "");
    assert_eq!(snapshot.errors.get(FieldKey::InvitorId), Some(INVITOR_NOT_FOUND));
}

#[tokio::test(start_paused = true)]
async fn test_failed_invitor_lookup_shows_not_found() {
    let (form, api) = create_test_form(seeded_api()).await;

    api.set_failing(Operation::Lookup, true);
    form.set_invitor_id("U1");
    form.settle().await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_name, "");
    assert_eq!(snapshot.errors.get(FieldKey::InvitorId), Some(INVITOR_NOT_FOUND));

    api.set_failing(Operation::Lookup, false);
    form.set_invitor_id("ROOT001");
    form.settle().await;
    assert_eq!(form.snapshot().invitor_name, "Pavan");
    assert!(form.snapshot().errors.get(FieldKey::InvitorId).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_invitor_clears_without_lookup() {
    let (form, api) = create_test_form(seeded_api()).await;
    form.set_invitor_id("NOBODY");
    form.settle().await;
    let lookups = api.calls(Operation::Lookup);

    form.set_invitor_id("   ");

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_id, "");
    assert_eq!(snapshot.invitor_name, "");
    assert!(snapshot.errors.get(FieldKey::InvitorId).is_none());
    form.settle().await;
    assert_eq!(api.calls(Operation::Lookup), lookups);
}

#[tokio::test(start_paused = true)]
async fn test_ids_are_trimmed_and_names_kept_verbatim() {
    let (form, _api) = create_test_form(seeded_api()).await;

    form.set_invitor_id("  U1 ");
    form.set_your_id(" new-id ");
    form.set_your_name(" Ravi Kumar ");
    form.settle().await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_id, "U1");
    assert_eq!(snapshot.invitor_name, "Uma");
    assert_eq!(snapshot.your_id, "new-id");
    assert_eq!(snapshot.your_name, " Ravi Kumar ");
}

#[tokio::test(start_paused = true)]
async fn test_taken_user_id_shows_error_until_changed() {
    let (form, _api) = create_test_form(seeded_api()).await;

    form.set_your_id("U1");
    form.settle().await;
    assert_eq!(form.snapshot().errors.get(FieldKey::YourId), Some(USER_ID_TAKEN));

    form.set_your_id("U2");
    form.settle().await;
    assert!(form.snapshot().errors.get(FieldKey::YourId).is_none());

    form.set_your_id("U1");
    form.settle().await;
    form.set_your_id("");
    assert!(form.snapshot().errors.get(FieldKey::YourId).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_existence_check_clears_error() {
    let (form, api) = create_test_form(seeded_api()).await;

    form.set_your_id("U1");
    form.settle().await;
    assert_eq!(form.snapshot().errors.get(FieldKey::YourId), Some(USER_ID_TAKEN));

    api.set_failing(Operation::Exists, true);
    form.set_your_id("U9");
    form.settle().await;
    assert!(form.snapshot().errors.get(FieldKey::YourId).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_lookup_does_not_overwrite_newer_result() {
    let api = seeded_api()
        .with_user("SLOW", "Sam", Some("ROOT001"))
        .with_id_delay("SLOW", Duration::from_secs(2));
    let (form, api) = create_test_form(api).await;

    form.set_invitor_id("SLOW");
    // let the slow lookup reach the API before it is superseded
    tokio::time::sleep(Duration::from_millis(10)).await;
    form.set_invitor_id("U1");
    form.settle().await;

    // and give the aborted one every chance to land late
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_id, "U1");
    assert_eq!(snapshot.invitor_name, "Uma");
    assert!(snapshot.errors.get(FieldKey::InvitorId).is_none());
    assert_eq!(api.calls(Operation::Lookup), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_existence_check_does_not_overwrite_newer_result() {
    let api = seeded_api().with_id_delay("U1", Duration::from_secs(2));
    let (form, api) = create_test_form(api).await;

    // U1 is taken, but its check is slow and gets superseded by a free id
    form.set_your_id("U1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    form.set_your_id("FREE1");
    form.settle().await;

    // give the aborted check every chance to land late
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = form.snapshot();
    assert_eq!(snapshot.your_id, "FREE1");
    assert!(snapshot.errors.get(FieldKey::YourId).is_none());
    assert_eq!(api.calls(Operation::Exists), 2);

    // and the other way round: a free id superseded by a taken one
    let api = seeded_api().with_id_delay("FREE2", Duration::from_secs(2));
    let (form, _api) = create_test_form(api).await;

    form.set_your_id("FREE2");
    tokio::time::sleep(Duration::from_millis(10)).await;
    form.set_your_id("U1");
    form.settle().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(form.snapshot().errors.get(FieldKey::YourId), Some(USER_ID_TAKEN));
}

#[tokio::test(start_paused = true)]
async fn test_debounce_collapses_rapid_typing() {
    init_test_logging();
    let api = Arc::new(seeded_api());
    let form = RegisterForm::new(Arc::clone(&api), &test_config(Duration::from_millis(300)));

    for partial in ["R", "RO", "ROO", "ROOT", "ROOT0", "ROOT00", "ROOT001"] {
        form.set_invitor_id(partial);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(form.is_validating());
    form.settle().await;

    assert_eq!(api.calls(Operation::Lookup), 1);
    assert_eq!(form.snapshot().invitor_name, "Pavan");
    assert!(!form.is_validating());
}

#[tokio::test(start_paused = true)]
async fn test_submit_requires_id_and_name() {
    let (form, api) = create_test_form(seeded_api()).await;

    form.set_your_name("Asha");
    assert_eq!(
        form.submit().await,
        SubmitOutcome::Invalid(FIELDS_REQUIRED.to_string())
    );
    assert_eq!(form.snapshot().errors.get(FieldKey::Form), Some(FIELDS_REQUIRED));

    form.set_your_name("");
    form.set_your_id("A100");
    form.settle().await;
    assert_eq!(
        form.submit().await,
        SubmitOutcome::Invalid(FIELDS_REQUIRED.to_string())
    );

    assert_eq!(api.calls(Operation::Register), 0);
    assert!(!form.snapshot().loading);
}

#[tokio::test(start_paused = true)]
async fn test_successful_submit_clears_own_fields_only() {
    let hook_user = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&hook_user);

    init_test_logging();
    let api = Arc::new(seeded_api());
    let form = RegisterForm::new(Arc::clone(&api), &test_config(Duration::ZERO)).on_success(
        move |user| {
            *captured.lock().unwrap() = user.map(|u| u.name.clone());
        },
    );
    form.mount();
    form.set_your_id("A100");
    form.set_your_name("Asha");
    form.settle().await;

    let outcome = form.submit().await;
    debug!("submit outcome: {:?}", outcome);
    assert!(outcome.is_registered());

    let snapshot = form.snapshot();
    assert_eq!(snapshot.invitor_id, "ROOT001");
    assert_eq!(snapshot.invitor_name, "Pavan");
    assert_eq!(snapshot.your_id, "");
    assert_eq!(snapshot.your_name, "");
    assert_eq!(snapshot.message.as_deref(), Some(SUCCESS_MESSAGE));
    assert!(snapshot.errors.is_empty());
    assert!(!snapshot.loading);

    assert!(api.contains("A100"));
    assert_eq!(hook_user.lock().unwrap().as_deref(), Some("Asha"));

    let forest = api.forest();
    assert_eq!(forest[0].children().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_taken_id_does_not_block_submit() {
    let (form, api) = create_test_form(seeded_api()).await;

    form.set_your_id("U1");
    form.set_your_name("Another Uma");
    form.settle().await;
    assert_eq!(form.snapshot().errors.get(FieldKey::YourId), Some(USER_ID_TAKEN));

    let outcome = form.submit().await;
    assert_eq!(outcome, SubmitOutcome::Failed("HTTP 409".to_string()));
    assert_eq!(api.calls(Operation::Register), 1);

    let snapshot = form.snapshot();
    // submit resets field errors; only the service's message remains
    assert_eq!(snapshot.errors.get(FieldKey::Form), Some("HTTP 409"));
    assert!(snapshot.errors.get(FieldKey::YourId).is_none());
    assert_eq!(snapshot.your_id, "U1");
    assert_eq!(snapshot.your_name, "Another Uma");
    assert!(snapshot.message.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_in_flight_is_refused() {
    let api = seeded_api().with_delay(Operation::Register, Duration::from_secs(1));
    let (form, api) = create_test_form(api).await;

    form.set_your_id("A200");
    form.set_your_name("Arjun");
    form.settle().await;

    let (first, second) = tokio::join!(form.submit(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(form.snapshot().loading);
        form.submit().await
    });

    assert!(first.is_registered());
    assert_eq!(second, SubmitOutcome::InFlight);
    assert_eq!(api.calls(Operation::Register), 1);
    assert!(!form.snapshot().loading);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_submit_releases_loading() {
    let api = seeded_api().with_delay(Operation::Register, Duration::from_secs(60));
    let (form, _api) = create_test_form(api).await;

    form.set_your_id("A300");
    form.set_your_name("Anil");
    form.settle().await;

    let timed_out = tokio::time::timeout(Duration::from_secs(1), form.submit()).await;
    assert!(timed_out.is_err());
    assert!(!form.snapshot().loading);
}

#[tokio::test(start_paused = true)]
async fn test_hook_counts_only_successes() {
    init_test_logging();
    let successes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&successes);

    let api = Arc::new(seeded_api());
    let form = RegisterForm::new(Arc::clone(&api), &test_config(Duration::ZERO))
        .on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    form.mount();

    form.set_your_id("U1");
    form.set_your_name("Dup");
    form.settle().await;
    assert!(!form.submit().await.is_registered());

    form.set_your_id("B1");
    form.settle().await;
    assert!(form.submit().await.is_registered());

    assert_eq!(successes.load(Ordering::SeqCst), 1);
}
