use crux_core::testing::AppTester;
use driver_shared::capabilities::TimerOperation;
use driver_shared::lifecycle::LifecycleTag;
use driver_shared::model::{Availability, Page, RideSource};
use driver_shared::offer::{OfferPool, Passenger};
use driver_shared::random::ScriptedRandom;
use driver_shared::scheduler::TimerOwner;
use driver_shared::ticker::{RotationPhase, ViewMode};
use driver_shared::{
    App, CoreConfig, Effect, ErrorKind, Event, LifecycleConfig, Model, TickerConfig,
};

fn passenger() -> Passenger {
    Passenger {
        name: "Rahul Kumar".into(),
        rating: 4.8,
        phone: "+91 98765 43210".into(),
    }
}

/// Batch of four (pool entries 0..=3), then whatever `extra` scripts.
fn model_with(extra: &[usize], config: CoreConfig) -> Model {
    let mut script = vec![4, 0, 1, 2, 3];
    script.extend_from_slice(extra);
    Model::with_config(config, Box::new(ScriptedRandom::new(script)))
}

fn timer_ops(effects: &[Effect]) -> Vec<TimerOperation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Timer(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn renders(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::Render(_)))
        .count()
}

#[test]
fn going_online_populates_the_ticker_and_starts_rotation() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());

    let update = app.update(Event::GoOnline, &mut model);

    assert_eq!(model.availability, Availability::Online);
    let pool = OfferPool::sample();
    assert_eq!(model.ticker.state().offers(), &pool.offers()[0..4]);
    assert_eq!(renders(&update.effects), 1);

    let ops = timer_ops(&update.effects);
    assert_eq!(ops.len(), 1);
    match &ops[0] {
        TimerOperation::Start { id, millis } => {
            assert_eq!(id.owner, TimerOwner::Ticker);
            assert_eq!(*millis, 5_000);
        }
        other => panic!("unexpected timer op {other:?}"),
    }

    let view = app.view(&model);
    assert_eq!(view.ticker.count_label.as_deref(), Some("1/4"));
    assert!(view.ticker.is_rotation_active);
}

#[test]
fn rotation_runs_through_exit_then_advances() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);

    let visible = model.ticker.pending_timer().unwrap();
    let update = app.update(Event::TimerElapsed { id: visible }, &mut model);
    assert_eq!(model.ticker.state().rotation_phase(), RotationPhase::Exiting);
    assert!(matches!(
        timer_ops(&update.effects).as_slice(),
        [TimerOperation::Start { millis: 500, .. }]
    ));

    let exit = model.ticker.pending_timer().unwrap();
    app.update(Event::TimerElapsed { id: exit }, &mut model);
    assert_eq!(model.ticker.state().current_index(), Some(1));
    assert_eq!(model.ticker.state().rotation_phase(), RotationPhase::Visible);
    assert_eq!(app.view(&model).ticker.count_label.as_deref(), Some("2/4"));
}

#[test]
fn timers_from_before_going_offline_are_ignored() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    let stale = model.ticker.pending_timer().unwrap();

    let update = app.update(Event::GoOffline, &mut model);
    assert!(model.ticker.state().is_empty());
    assert!(matches!(
        timer_ops(&update.effects).as_slice(),
        [TimerOperation::Cancel { id }] if *id == stale
    ));

    let update = app.update(Event::TimerElapsed { id: stale }, &mut model);
    assert!(update.effects.is_empty());
    assert!(model.ticker.state().is_empty());
    assert_eq!(model.ticker.state().rotation_phase(), RotationPhase::Idle);
}

#[test]
fn ride_requests_are_ignored_while_offline() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());

    let update = app.update(Event::SimulateRideRequest, &mut model);

    assert_eq!(model.lifecycle.tag(), LifecycleTag::Hidden);
    assert!(update.effects.is_empty());
}

#[test]
fn accepting_the_banner_starts_a_ride_after_the_close_delay() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[5], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);

    let update = app.update(Event::SimulateRideRequest, &mut model);
    let pool = OfferPool::sample();
    assert_eq!(model.lifecycle.state().offer(), pool.get(5));
    assert_eq!(model.lifecycle.remaining_seconds(), Some(15));
    assert!(timer_ops(&update.effects).iter().any(|op| matches!(
        op,
        TimerOperation::Start { id, millis: 1_000 } if id.owner == TimerOwner::Lifecycle
    )));

    app.update(
        Event::AcceptRideRequest {
            passenger: passenger(),
        },
        &mut model,
    );
    assert_eq!(model.lifecycle.tag(), LifecycleTag::Accepted);
    assert!(model.active_ride.is_none());

    let close = model.lifecycle.pending_timer().unwrap();
    app.update(Event::TimerElapsed { id: close }, &mut model);

    assert_eq!(model.lifecycle.tag(), LifecycleTag::Hidden);
    let ride = model.active_ride.as_ref().unwrap();
    assert_eq!(Some(&ride.offer), pool.get(5));
    assert_eq!(ride.passenger.name, "Rahul Kumar");
    assert_eq!(ride.source, RideSource::Banner);
}

#[test]
fn ticker_accept_waits_for_a_closing_banner_accept() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[5], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    app.update(Event::SimulateRideRequest, &mut model);
    app.update(
        Event::AcceptRideRequest {
            passenger: passenger(),
        },
        &mut model,
    );

    app.update(
        Event::AcceptTickerOffer {
            index: 0,
            passenger: passenger(),
        },
        &mut model,
    );

    assert_eq!(
        model.active_error.as_ref().map(|e| e.kind),
        Some(ErrorKind::InvalidState)
    );
    assert_eq!(model.ticker.state().len(), 4);
    assert!(model.active_ride.is_none());

    let close = model.lifecycle.pending_timer().unwrap();
    app.update(Event::TimerElapsed { id: close }, &mut model);

    let ride = model.active_ride.as_ref().unwrap();
    assert_eq!(ride.source, RideSource::Banner);
    assert_eq!(Some(&ride.offer), OfferPool::sample().get(5));
}

#[test]
fn new_request_does_not_replace_a_closing_banner_accept() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[5, 7], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    app.update(Event::SimulateRideRequest, &mut model);
    app.update(
        Event::AcceptRideRequest {
            passenger: passenger(),
        },
        &mut model,
    );
    let close = model.lifecycle.pending_timer().unwrap();

    let update = app.update(Event::SimulateRideRequest, &mut model);

    assert!(update.effects.is_empty());
    assert_eq!(model.lifecycle.tag(), LifecycleTag::Accepted);
    assert_eq!(model.lifecycle.pending_timer(), Some(close));
    assert!(model.pending_passenger.is_some());

    app.update(Event::TimerElapsed { id: close }, &mut model);

    let ride = model.active_ride.as_ref().unwrap();
    assert_eq!(ride.source, RideSource::Banner);
    assert_eq!(Some(&ride.offer), OfferPool::sample().get(5));
    assert_eq!(ride.passenger.name, "Rahul Kumar");
}

#[test]
fn an_unanswered_banner_expires_as_a_decline() {
    let app = AppTester::<App, Effect>::default();
    let config = CoreConfig {
        lifecycle: LifecycleConfig {
            close_delay_ms: 0,
            ..LifecycleConfig::default()
        },
        ..CoreConfig::default()
    };
    let mut model = model_with(&[0], config);
    app.update(Event::GoOnline, &mut model);
    app.update(Event::SimulateRideRequest, &mut model);

    for _ in 0..15 {
        let id = model.lifecycle.pending_timer().unwrap();
        app.update(Event::TimerElapsed { id }, &mut model);
    }

    assert_eq!(model.lifecycle.tag(), LifecycleTag::Hidden);
    assert!(model.lifecycle.pending_timer().is_none());
    assert!(model.active_ride.is_none());
    assert!(model.pending_passenger.is_none());
}

#[test]
fn going_offline_hides_the_banner_and_drops_its_timer() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[2], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    app.update(Event::SimulateRideRequest, &mut model);
    let stale = model.lifecycle.pending_timer().unwrap();

    app.update(Event::GoOffline, &mut model);
    assert_eq!(model.lifecycle.tag(), LifecycleTag::Hidden);

    app.update(Event::TimerElapsed { id: stale }, &mut model);
    assert_eq!(model.lifecycle.tag(), LifecycleTag::Hidden);
    assert!(model.active_ride.is_none());
}

#[test]
fn accepting_from_the_ticker_hands_over_that_offer() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    let before = model.ticker.state().offers().to_vec();

    app.update(
        Event::AcceptTickerOffer {
            index: 2,
            passenger: passenger(),
        },
        &mut model,
    );

    let ride = model.active_ride.as_ref().unwrap();
    assert_eq!(ride.offer, before[2]);
    assert_eq!(ride.source, RideSource::Ticker);
    assert_eq!(
        model.ticker.state().offers(),
        &[before[0].clone(), before[1].clone(), before[3].clone()]
    );
}

#[test]
fn a_second_accept_during_a_ride_is_rejected() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    app.update(
        Event::AcceptTickerOffer {
            index: 0,
            passenger: passenger(),
        },
        &mut model,
    );
    let remaining = model.ticker.state().len();

    app.update(
        Event::AcceptTickerOffer {
            index: 0,
            passenger: passenger(),
        },
        &mut model,
    );

    assert_eq!(model.ticker.state().len(), remaining);
    assert_eq!(
        model.active_error.as_ref().map(|e| e.kind),
        Some(ErrorKind::InvalidState)
    );
}

#[test]
fn stale_ticker_index_surfaces_an_error() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);

    app.update(
        Event::AcceptTickerOffer {
            index: 9,
            passenger: passenger(),
        },
        &mut model,
    );

    assert_eq!(model.ticker.state().len(), 4);
    assert!(model.active_ride.is_none());
    let view = app.view(&model);
    assert_eq!(view.error.map(|e| e.code), Some("INVALID_STATE".to_string()));

    app.update(Event::DismissError, &mut model);
    assert!(model.active_error.is_none());
}

#[test]
fn ending_a_ride_records_it_and_stays_online() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    app.update(
        Event::AcceptTickerOffer {
            index: 1,
            passenger: passenger(),
        },
        &mut model,
    );

    let update = app.update(Event::EndRide, &mut model);

    assert_eq!(renders(&update.effects), 1);
    assert!(model.active_ride.is_none());
    assert_eq!(model.past_rides.len(), 1);
    assert_eq!(model.availability, Availability::Online);
    assert_eq!(app.view(&model).past_rides[0].passenger_name, "Rahul Kumar");

    let update = app.update(Event::EndRide, &mut model);
    assert!(update.effects.is_empty());
}

#[test]
fn count_label_is_hidden_with_a_single_offer() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);
    assert_eq!(app.view(&model).ticker.count_label.as_deref(), Some("1/4"));

    for _ in 0..3 {
        app.update(
            Event::AcceptTickerOffer {
                index: 0,
                passenger: passenger(),
            },
            &mut model,
        );
        app.update(Event::EndRide, &mut model);
    }

    assert_eq!(model.ticker.state().len(), 1);
    let view = app.view(&model).ticker;
    assert_eq!(view.count_label, None);
    assert_eq!(view.offers.len(), 1);
}

#[test]
fn show_all_mode_stops_rotation() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);

    app.update(Event::ToggleTickerView, &mut model);

    assert_eq!(model.ticker.state().view_mode(), ViewMode::ShowAll);
    assert!(!model.ticker.state().is_rotation_active());
    assert!(model.ticker.pending_timer().is_none());
}

#[test]
fn refresh_keeps_destinations_unique() {
    let app = AppTester::<App, Effect>::default();
    // remove one (index 0), add one drawn from pool entry 6
    let mut model = model_with(&[1, 0, 1, 6], CoreConfig::default());
    app.update(Event::GoOnline, &mut model);

    app.update(Event::RefreshTicker, &mut model);

    let offers = model.ticker.state().offers();
    assert_eq!(offers.len(), 4);
    let mut destinations: Vec<&str> = offers.iter().map(|o| o.destination()).collect();
    destinations.sort_unstable();
    destinations.dedup();
    assert_eq!(destinations.len(), 4);
    assert_eq!(offers[3], OfferPool::sample().offers()[6]);
}

#[test]
fn invalid_configuration_is_rejected() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());

    let bad = CoreConfig {
        ticker: TickerConfig {
            batch_min: 7,
            batch_max: 2,
            ..TickerConfig::default()
        },
        ..CoreConfig::default()
    };
    app.update(Event::Configure(bad), &mut model);
    assert_eq!(
        model.active_error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Configuration)
    );
    assert_eq!(model.config, CoreConfig::default());

    let faster = CoreConfig {
        ticker: TickerConfig {
            visible_ms: 2_000,
            ..TickerConfig::default()
        },
        ..CoreConfig::default()
    };
    app.update(Event::Configure(faster.clone()), &mut model);
    assert_eq!(model.config, faster);
    assert_eq!(model.ticker.config().visible_ms, 2_000);
}

#[test]
fn menu_navigation_closes_the_menu() {
    let app = AppTester::<App, Effect>::default();
    let mut model = model_with(&[], CoreConfig::default());

    app.update(Event::ToggleMenu, &mut model);
    assert!(model.menu_open);

    app.update(Event::Navigate(Page::PastRides), &mut model);
    assert_eq!(model.page, Page::PastRides);
    assert!(!model.menu_open);

    app.update(Event::Back, &mut model);
    assert_eq!(model.page, Page::Home);
}
