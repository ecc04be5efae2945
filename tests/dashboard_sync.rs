mod common;

use autoapply_dashboard::model::{format_duration, FieldValue, RunStatus, Settings, SettingsField, Stats};
use autoapply_dashboard::sync::{Dashboard, Endpoint, Handled, SyncEvent};
use autoapply_dashboard::transport::TransportError;
use common::{app, dashboard, init_logging, running, Call, FakeTransport, Reply};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Let spawned request tasks run until `call` has been made `n` times.
async fn wait_for_calls(fake: &FakeTransport, call: Call, n: usize) {
    for _ in 0..1_000 {
        if fake.count(call) >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{call:?} was called {} times, expected {n}", fake.count(call));
}

async fn step_until(dash: &mut Dashboard, wanted: Handled) -> Vec<Handled> {
    let mut seen = Vec::new();
    loop {
        let handled = dash.step().await;
        let done = handled == wanted;
        seen.push(handled);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn mount_loads_all_four_regions() {
    init_logging();
    let fake = FakeTransport::new();
    fake.set_default(Call::Status, Reply::Status(Ok(running(7))));
    fake.set_default(
        Call::Stats,
        Reply::Stats(Ok(Stats {
            total: 3,
            successful: 2,
            failed: 1,
            ..Stats::default()
        })),
    );
    fake.set_default(Call::Applications, Reply::Applications(Ok(vec![app(1)])));
    let server_settings = Settings {
        keywords: "rust".into(),
        ..Settings::default()
    };
    fake.set_default(Call::Settings, Reply::Settings(Ok(server_settings.clone())));

    let (mut dash, _) = dashboard(&fake);
    dash.mount();
    assert!(dash.settle().await.is_empty());

    let store = dash.store();
    assert_eq!(store.status(), &running(7));
    assert_eq!(store.stats().total, 3);
    assert_eq!(store.applications(), &[app(1)]);
    assert_eq!(store.settings(), &server_settings);
    assert_eq!(store.draft(), &server_settings);
    for call in [Call::Status, Call::Stats, Call::Applications, Call::Settings] {
        assert_eq!(fake.count(call), 1, "{call:?}");
    }
}

#[tokio::test]
async fn older_status_completing_last_is_discarded() {
    init_logging();
    let fake = FakeTransport::new();
    let first = fake.gate(Call::Status);
    let second = fake.gate(Call::Status);
    let (mut dash, _) = dashboard(&fake);

    dash.refresh();
    wait_for_calls(&fake, Call::Status, 1).await;
    dash.refresh();
    wait_for_calls(&fake, Call::Status, 2).await;

    second.release(Reply::Status(Ok(running(10))));
    step_until(&mut dash, Handled::Applied(Endpoint::Status)).await;

    first.release(Reply::Status(Ok(RunStatus::stopped())));
    let seen = {
        let mut seen = Vec::new();
        while dash.pending_fetches() > 0 {
            seen.push(dash.step().await);
        }
        seen
    };
    assert!(!seen.contains(&Handled::Applied(Endpoint::Status)));
    assert_eq!(dash.store().status(), &running(10));
}

#[tokio::test]
async fn in_order_completions_are_all_applied() {
    let fake = FakeTransport::new();
    let first = fake.gate(Call::Stats);
    let second = fake.gate(Call::Stats);
    let (mut dash, _) = dashboard(&fake);

    dash.refresh();
    wait_for_calls(&fake, Call::Stats, 1).await;
    dash.refresh();
    wait_for_calls(&fake, Call::Stats, 2).await;

    let stats = |total| Stats {
        total,
        ..Stats::default()
    };
    first.release(Reply::Stats(Ok(stats(1))));
    step_until(&mut dash, Handled::Applied(Endpoint::Stats)).await;
    assert_eq!(dash.store().stats().total, 1);

    second.release(Reply::Stats(Ok(stats(2))));
    step_until(&mut dash, Handled::Applied(Endpoint::Stats)).await;
    assert_eq!(dash.store().stats().total, 2);
}

#[tokio::test(start_paused = true)]
async fn polling_follows_running_state_and_goes_quiet_after_stop() {
    init_logging();
    let fake = FakeTransport::new();
    fake.set_default(Call::Status, Reply::Status(Ok(running(125))));
    let (mut dash, _) = dashboard(&fake);

    dash.mount();
    dash.settle().await;
    assert!(dash.is_polling());
    let shown = dash.store().status().duration_seconds.map(format_duration);
    assert_eq!(shown.as_deref(), Some("2m 5s"));

    let started = tokio::time::Instant::now();
    assert_eq!(dash.step().await, Handled::Updated);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    dash.settle().await;
    assert_eq!(fake.count(Call::Status), 2);
    assert_eq!(fake.count(Call::Stats), 2);
    assert_eq!(fake.count(Call::Applications), 2);
    assert_eq!(fake.count(Call::Settings), 1);

    fake.set_default(Call::Status, Reply::Status(Ok(RunStatus::stopped())));
    assert_eq!(dash.step().await, Handled::Updated);
    dash.settle().await;
    assert!(!dash.is_polling());
    assert_eq!(dash.store().status().duration_seconds, None);

    let polls = fake.count(Call::Status);
    let quiet = tokio::time::timeout(Duration::from_secs(30), dash.next_event()).await;
    assert!(quiet.is_err(), "no tick may arrive after the poller stopped");
    assert_eq!(fake.count(Call::Status), polls);
}

#[tokio::test]
async fn tick_from_a_cancelled_poller_does_nothing() {
    let fake = FakeTransport::new();
    let (mut dash, _) = dashboard(&fake);
    assert_eq!(dash.handle(SyncEvent::PollTick { epoch: 42 }), Handled::Ignored);
    assert_eq!(dash.pending_fetches(), 0);
    assert_eq!(fake.count(Call::Status), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_poll_keeps_previous_values_and_keeps_polling() {
    let fake = FakeTransport::new();
    fake.set_default(Call::Status, Reply::Status(Ok(running(30))));
    let (mut dash, _) = dashboard(&fake);
    dash.mount();
    dash.settle().await;

    fake.push(
        Call::Status,
        Reply::Status(Err(TransportError::Network("connection refused".into()))),
    );
    assert_eq!(dash.step().await, Handled::Updated);
    let failures = dash.settle().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Endpoint::Status);
    assert_eq!(dash.store().status(), &running(30));
    assert!(dash.is_polling());
    assert!(dash.store().notice().is_none());
}

#[tokio::test]
async fn late_settings_fetch_does_not_clobber_edits() {
    let fake = FakeTransport::new();
    let gate = fake.gate(Call::Settings);
    let (mut dash, _) = dashboard(&fake);
    dash.mount();
    wait_for_calls(&fake, Call::Settings, 1).await;

    assert!(dash.update_draft(SettingsField::Keywords, FieldValue::Text("rust".into())));
    let server = Settings {
        keywords: "python".into(),
        location: "Berlin".into(),
        ..Settings::default()
    };
    gate.release(Reply::Settings(Ok(server.clone())));
    dash.settle().await;

    assert_eq!(dash.store().settings(), &server);
    assert_eq!(dash.store().draft().keywords, "rust");
    assert_eq!(dash.store().draft().location, Settings::default().location);
    assert!(dash.store().draft_dirty());
}

#[tokio::test]
async fn results_after_teardown_are_dropped() {
    let fake = FakeTransport::new();
    let gate = fake.gate(Call::Status);
    let (mut dash, _) = dashboard(&fake);
    dash.mount();
    wait_for_calls(&fake, Call::Status, 1).await;

    dash.teardown();
    gate.release(Reply::Status(Ok(running(5))));
    let mut handled = Vec::new();
    while dash.pending_fetches() > 0 {
        handled.push(dash.step().await);
    }
    assert!(handled.iter().all(|h| *h == Handled::Ignored));
    assert!(!dash.store().status().is_running());
    assert!(!dash.is_polling());
}

#[tokio::test]
async fn recent_panel_shows_first_five_of_a_full_page() {
    let fake = FakeTransport::new();
    fake.set_default(Call::Applications, Reply::Applications(Ok((1..=50).map(app).collect())));
    let (mut dash, _) = dashboard(&fake);
    dash.mount();
    dash.settle().await;

    assert_eq!(dash.store().applications().len(), 50);
    let titles: Vec<&str> = dash.store().recent().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Engineer 1", "Engineer 2", "Engineer 3", "Engineer 4", "Engineer 5"]
    );
    assert_eq!(dash.view().recent().len(), 5);
}
