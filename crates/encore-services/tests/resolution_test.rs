mod helpers;

use encore_core::models::{EntityRef, NewConcert, SearchMode};
use encore_core::{AppError, WriteStep};
use encore_services::{ResolutionFlow, ResolutionState, WizardStep};
use helpers::{schedule, Harness};
use uuid::Uuid;

#[tokio::test]
async fn artist_search_selects_verified_concert() {
    let h = Harness::new();
    let concert_id = h.seed_iu_concert();
    let mut wizard = h.wizard();
    let mut flow = ResolutionFlow::new(&h.resolution);

    let state = flow.search("아이유", SearchMode::ByArtist).await.unwrap();
    let ResolutionState::Found(results) = state else {
        panic!("expected results, got {:?}", state);
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].artist_names, vec!["IU".to_string()]);
    assert_eq!(results[0].venue_name.as_deref(), Some("KSPO DOME"));
    let choice = results[0].concert;

    let selected = flow.select(choice).unwrap();
    flow.apply(&mut wizard).unwrap();

    assert_eq!(selected, EntityRef::Verified(concert_id));
    assert_eq!(wizard.concert_ref(), Some(EntityRef::Verified(concert_id)));
    assert_eq!(wizard.current_step(), WizardStep::WriteReview);

    let json = serde_json::to_value(wizard.concert_ref()).unwrap();
    assert_eq!(json["isPending"], false);
}

#[tokio::test]
async fn title_search_is_case_insensitive_and_partial() {
    let h = Harness::new();
    h.seed_iu_concert();

    let results = h
        .resolution
        .search("  world TOUR ", SearchMode::ByTitle)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "H.E.R. World Tour");
}

#[tokio::test]
async fn short_terms_never_reach_the_store() {
    let h = Harness::new();
    h.seed_iu_concert();

    for term in ["", " ", "아", " I "] {
        let results = h.resolution.search(term, SearchMode::ByArtist).await.unwrap();
        assert!(results.is_empty());
    }
    assert_eq!(h.catalog.query_count(), 0);

    h.resolution.search("IU", SearchMode::ByArtist).await.unwrap();
    assert_eq!(h.catalog.query_count(), 1);
}

#[tokio::test]
async fn search_results_are_bounded() {
    let h = Harness::new();
    let artist = h.catalog.add_artist("Seventeen", None);
    let venue = h.catalog.add_venue("Gocheok Sky Dome");
    for n in 0..15 {
        h.catalog.add_concert(
            &format!("Follow Tour {}", n),
            artist,
            venue,
            vec![schedule(2023, 7, 22, "18:00")],
        );
    }

    let results = h
        .resolution
        .search("follow", SearchMode::ByTitle)
        .await
        .unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].title, "Follow Tour 0");
}

#[tokio::test]
async fn unmatched_title_leads_to_pending_concert() {
    let h = Harness::new();
    let venue = h.catalog.add_venue("Olympic Hall");
    let mut wizard = h.wizard();
    let mut flow = ResolutionFlow::new(&h.resolution);

    let state = flow.search("Test Show", SearchMode::ByTitle).await.unwrap();
    assert_eq!(*state, ResolutionState::NotFound);
    flow.begin_create().unwrap();
    wizard.begin_create_concert();
    assert_eq!(wizard.current_step(), WizardStep::CreateConcert);

    let artist = h.resolution.create_pending_artist("새아티스트").await.unwrap();
    assert!(artist.is_pending());

    let concert = flow
        .create(&NewConcert {
            title: "Test Show".to_string(),
            schedules: vec![schedule(2025, 6, 1, "19:00")],
            artist,
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap();
    flow.apply(&mut wizard).unwrap();

    assert!(concert.is_pending());
    assert_eq!(h.catalog.pending_concert_count(), 1);
    assert_eq!(h.catalog.pending_schedule_count(), 1);
    assert_eq!(h.catalog.pending_artist_count(), 1);
    assert_eq!(h.catalog.pending_link_count(), 1);
    assert_eq!(h.catalog.pending_link_of(concert.id()), Some(artist));
    assert_eq!(wizard.concert_ref(), Some(concert));
    assert_eq!(wizard.current_step(), WizardStep::WriteReview);

    let json = serde_json::to_value(concert).unwrap();
    assert_eq!(json["isPending"], true);
    assert_eq!(json["id"], concert.id().to_string());
}

#[tokio::test]
async fn schedule_failure_is_compensated_and_returns_no_ref() {
    let h = Harness::new();
    let artist = h.catalog.add_artist("DAY6", None);
    let venue = h.catalog.add_venue("Jamsil");
    h.catalog.fail_schedule_inserts_after(1);

    let mut flow = ResolutionFlow::new(&h.resolution);
    flow.search("Unknown Show", SearchMode::ByTitle).await.unwrap();
    flow.begin_create().unwrap();

    let err = flow
        .create(&NewConcert {
            title: "Forever Young".to_string(),
            schedules: vec![
                schedule(2025, 9, 1, "18:00"),
                schedule(2025, 9, 2, "17:00"),
            ],
            artist: EntityRef::Verified(artist),
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap_err();

    match err {
        AppError::PartialWrite {
            schedules_written,
            failed_step,
            compensated,
            ..
        } => {
            assert_eq!(schedules_written, 1);
            assert_eq!(failed_step, WriteStep::Schedule);
            assert!(compensated);
        }
        other => panic!("expected partial write, got {:?}", other),
    }
    assert_eq!(flow.ready(), None);
    assert_eq!(*flow.state(), ResolutionState::Creating);
    assert_eq!(h.catalog.pending_concert_count(), 0);
    assert_eq!(h.catalog.pending_schedule_count(), 0);
}

#[tokio::test]
async fn link_failure_reports_failed_compensation() {
    let h = Harness::new();
    let artist = h.catalog.add_artist("DAY6", None);
    let venue = h.catalog.add_venue("Jamsil");
    h.catalog.fail_artist_links();
    h.catalog.fail_deletes();

    let err = h
        .resolution
        .create_concert(&NewConcert {
            title: "Forever Young".to_string(),
            schedules: vec![schedule(2025, 9, 1, "18:00")],
            artist: EntityRef::Verified(artist),
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::PartialWrite {
            failed_step: WriteStep::ArtistLink,
            compensated: false,
            schedules_written: 1,
            ..
        }
    ));
    assert_eq!(h.catalog.pending_concert_count(), 1);
}

#[tokio::test]
async fn missing_artist_is_rejected_before_any_write() {
    let h = Harness::new();
    let venue = h.catalog.add_venue("Jamsil");

    let err = h
        .resolution
        .create_concert(&NewConcert {
            title: "Ghost Show".to_string(),
            schedules: vec![schedule(2025, 1, 1, "20:00")],
            artist: EntityRef::Pending(Uuid::new_v4()),
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap_err();

    match err {
        AppError::Validation(fields) => assert!(fields.get("artist").is_some()),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.catalog.pending_concert_count(), 0);
}

#[tokio::test]
async fn invalid_form_fields_are_reported_per_field() {
    let h = Harness::new();
    let artist = h.catalog.add_artist("DAY6", None);
    let venue = h.catalog.add_venue("Jamsil");

    let err = h
        .resolution
        .create_concert(&NewConcert {
            title: "   ".to_string(),
            schedules: vec![schedule(2025, 1, 1, "25:00")],
            artist: EntityRef::Verified(artist),
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap_err();

    let AppError::Validation(fields) = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.get("title"), Some("Enter a concert title"));
    assert_eq!(
        fields.get("schedules[0].start_time"),
        Some("Enter the start time as HH:MM")
    );
    assert_eq!(h.catalog.pending_concert_count(), 0);
}

#[tokio::test]
async fn store_failure_is_a_resolution_error() {
    let h = Harness::new();
    h.catalog.fail_searches();

    let err = h
        .resolution
        .search("IU", SearchMode::ByArtist)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Resolution(_)));

    let mut flow = ResolutionFlow::new(&h.resolution);
    assert!(flow.search("IU", SearchMode::ByArtist).await.is_err());
    assert_eq!(*flow.state(), ResolutionState::NoConcert);
}

#[tokio::test]
async fn duplicate_names_create_separate_rows() {
    let h = Harness::new();
    h.catalog.add_venue("Blue Square");

    let first = h.resolution.create_pending_venue("blue square").await.unwrap();
    let second = h.resolution.create_pending_venue("Blue Square ").await.unwrap();

    assert_ne!(first, second);
    assert_eq!(h.catalog.pending_venue_count(), 2);
}

#[tokio::test]
async fn creating_requires_a_signed_in_user() {
    let h = Harness::new();
    h.identity.sign_out();

    let err = h.resolution.create_pending_artist("누군가").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(h.catalog.pending_artist_count(), 0);
}
