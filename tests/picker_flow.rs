//! Flows for the location-picking mode: the transient marker, latest-wins
//! reverse geocoding and the coordinate-string fallback.

use crux_core::testing::AppTester;

use impulse_core::capabilities::{HttpError, HttpOutput, LocationFix};
use impulse_core::{
    App, Effect, EndpointConfig, Event, Locale, MapStatus, Model, ScreenPurpose, Selection,
    SurfaceSize, ViewState,
};

fn config() -> EndpointConfig {
    EndpointConfig {
        api_base: "https://db.example.com".into(),
        api_key: "anon-key".into(),
        geocoder_base: "https://geocoder.example.org".into(),
    }
}

fn mounted_picker() -> (AppTester<App, Effect>, Model) {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::Mounted {
            surface: SurfaceSize::new(1080, 1920),
            config: config(),
            purpose: ScreenPurpose::PickLocation,
            locale: Locale::Ru,
        },
        &mut model,
    );
    let generation = model.bootstrap_generation;
    app.update(
        Event::GotLocation {
            generation,
            result: Ok(LocationFix {
                lat: 55.7558,
                lng: 37.6173,
                accuracy_m: Some(5.0),
            }),
        },
        &mut model,
    );
    assert_eq!(model.status, MapStatus::Ready);
    (app, model)
}

fn is_reverse_geocode(effect: &Effect) -> bool {
    match effect {
        Effect::Http(request) => request.operation.url.contains("/reverse"),
        _ => false,
    }
}

#[test]
fn picker_boots_armed_and_never_loads_impulses() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::Mounted {
            surface: SurfaceSize::new(1080, 1920),
            config: config(),
            purpose: ScreenPurpose::PickLocation,
            locale: Locale::Ru,
        },
        &mut model,
    );

    let generation = model.bootstrap_generation;
    let update = app.update(
        Event::GotLocation {
            generation,
            result: Ok(LocationFix {
                lat: 55.7558,
                lng: 37.6173,
                accuracy_m: None,
            }),
        },
        &mut model,
    );

    assert!(model.in_select_mode());
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn click_places_the_marker_and_requests_an_address() {
    let (app, mut model) = mounted_picker();

    let update = app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );

    let selection = model.pick_selection.as_ref().unwrap();
    assert!((selection.location.lat - 55.70).abs() < 1e-9);
    assert_eq!(selection.address, None);
    assert_eq!(update.effects.iter().filter(|e| is_reverse_geocode(e)).count(), 1);
    assert!(update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Haptics(_))));

    // Until the address arrives the view shows the raw coordinate.
    let view = app.view(&model);
    match view.state {
        ViewState::Ready { pick_selection, .. } => {
            assert_eq!(pick_selection.unwrap().address, "55.70000, 37.50000");
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[test]
fn rapid_clicks_resolve_to_the_latest_point() {
    let (app, mut model) = mounted_picker();

    app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );
    let first_seq = model.pick_seq;

    app.update(
        Event::MapClicked {
            lat: 55.71,
            lng: 37.51,
        },
        &mut model,
    );
    let second_seq = model.pick_seq;
    assert!(second_seq > first_seq);

    // The first point's geocode arrives late and is dropped.
    app.update(
        Event::PickAddressResolved {
            seq: first_seq,
            result: Ok(HttpOutput {
                status: 200,
                body: br#"{"display_name":"First street"}"#.to_vec(),
            }),
        },
        &mut model,
    );
    assert_eq!(model.pick_selection.as_ref().unwrap().address, None);

    app.update(
        Event::PickAddressResolved {
            seq: second_seq,
            result: Ok(HttpOutput {
                status: 200,
                body: br#"{"display_name":"Second street"}"#.to_vec(),
            }),
        },
        &mut model,
    );
    let selection = model.pick_selection.as_ref().unwrap();
    assert!((selection.location.lat - 55.71).abs() < 1e-9);
    assert_eq!(selection.address.as_deref(), Some("Second street"));
}

#[test]
fn failed_geocode_reports_the_coordinate_string() {
    let (app, mut model) = mounted_picker();

    app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );
    app.update(
        Event::PickAddressResolved {
            seq: model.pick_seq,
            result: Err(HttpError::Network("dns failure".into())),
        },
        &mut model,
    );

    assert_eq!(
        model.pick_selection.as_ref().unwrap().address.as_deref(),
        Some("55.70000, 37.50000")
    );
}

#[test]
fn exit_clears_the_selection_and_cancels_the_geocode() {
    let (app, mut model) = mounted_picker();

    app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );
    let pending_seq = model.pick_seq;

    app.update(Event::ExitPickMode, &mut model);
    assert_eq!(model.pick_selection, None);
    assert!(!model.in_select_mode());

    // The abandoned geocode resolves into nothing.
    app.update(
        Event::PickAddressResolved {
            seq: pending_seq,
            result: Ok(HttpOutput {
                status: 200,
                body: br#"{"display_name":"Too late"}"#.to_vec(),
            }),
        },
        &mut model,
    );
    assert_eq!(model.pick_selection, None);
}

#[test]
fn browse_screen_can_enter_and_leave_pick_mode() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::Mounted {
            surface: SurfaceSize::new(1080, 1920),
            config: config(),
            purpose: ScreenPurpose::Browse,
            locale: Locale::En,
        },
        &mut model,
    );
    let generation = model.bootstrap_generation;
    app.update(
        Event::GotLocation {
            generation,
            result: Ok(LocationFix {
                lat: 55.7558,
                lng: 37.6173,
                accuracy_m: Some(5.0),
            }),
        },
        &mut model,
    );
    let load_generation = model.load_generation;
    app.update(
        Event::ImpulsesLoaded {
            generation: load_generation,
            result: Ok(HttpOutput {
                status: 200,
                body: br#"[{"id":1,"content":"x","category":"walk",
                            "creator_id":"00000000-0000-0000-0000-000000000000",
                            "created_at":"2026-08-23T10:00:00Z",
                            "location_lat":55.76,"location_lng":37.62}]"#
                    .to_vec(),
            }),
        },
        &mut model,
    );

    app.update(Event::EnterPickMode, &mut model);
    assert!(model.in_select_mode());

    // Marker taps are suspended while picking.
    app.update(Event::MarkerTapped { id: 1 }, &mut model);
    assert_eq!(model.selection, Selection::None);

    app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );
    assert!(model.pick_selection.is_some());

    app.update(Event::ExitPickMode, &mut model);
    assert!(!model.in_select_mode());
    // A plain tap outside pick mode is just a map tap again.
    app.update(
        Event::MapClicked {
            lat: 55.70,
            lng: 37.50,
        },
        &mut model,
    );
    assert_eq!(model.pick_selection, None);
}
