mod helpers;

use chrono::Utc;
use encore_core::models::Review;
use encore_core::{AppError, EntityRef};
use encore_services::WizardStep;
use helpers::{photo, Harness};
use uuid::Uuid;

fn seeded_review(h: &Harness, concert: Uuid, image_urls: Vec<String>) -> Review {
    let review = Review {
        id: Uuid::new_v4(),
        concert: EntityRef::Verified(concert),
        content: "원래 후기".to_string(),
        image_urls,
        author_id: h.user.id,
        created_at: Utc::now(),
        updated_at: None,
    };
    h.reviews.seed(review.clone());
    review
}

#[tokio::test]
async fn submit_persists_review_and_resets_wizard() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("  최고의 공연  ");
    wizard.stage_images(&h.pipeline, vec![photo("a.jpg", 10), photo("b.jpg", 20)]);

    let submitted = h.submission.submit(&mut wizard).await.unwrap();

    assert!(submitted.warnings.is_empty());
    assert_eq!(submitted.review.content, "최고의 공연");
    assert_eq!(submitted.review.author_id, h.user.id);
    assert_eq!(submitted.review.image_urls.len(), 2);
    assert_eq!(h.reviews.count(), 1);
    assert_eq!(wizard.current_step(), WizardStep::Search);
    assert_eq!(wizard.concert_ref(), None);
    assert_eq!(h.previews.live_count(), 0);
    assert_eq!(h.previews.excess_releases(), 0);
    assert_eq!(h.wizard().concert_ref(), None);
}

#[tokio::test]
async fn short_content_blocks_submission_before_any_call() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("   ");
    wizard.stage_images(&h.pipeline, vec![photo("a.jpg", 10)]);

    let err = h.submission.submit(&mut wizard).await.unwrap_err();

    let AppError::Validation(fields) = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.get("content"), Some("Write your review"));
    assert_eq!(h.storage.upload_count(), 0);
    assert_eq!(h.reviews.count(), 0);
    assert_eq!(wizard.images().len(), 1);
}

#[tokio::test]
async fn failed_upload_is_dropped_and_review_still_posts() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    h.storage.fail_uploads_of_size(20);
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("good");
    wizard.stage_images(
        &h.pipeline,
        vec![photo("a.jpg", 10), photo("b.jpg", 20), photo("c.jpg", 30)],
    );

    let submitted = h.submission.submit(&mut wizard).await.unwrap();

    assert_eq!(submitted.review.image_urls.len(), 2);
    assert_eq!(submitted.warnings.len(), 1);
    assert!(matches!(
        &submitted.warnings[0],
        AppError::Upload { filename, .. } if filename == "b.jpg"
    ));
    assert_eq!(
        submitted.warning_messages(),
        ["b.jpg could not be uploaded and was left out."]
    );
}

#[tokio::test]
async fn failed_review_write_keeps_draft_and_uploads() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("retry me");
    wizard.stage_images(&h.pipeline, vec![photo("a.jpg", 10)]);

    h.reviews.fail_writes(true);
    assert!(h.submission.submit(&mut wizard).await.is_err());
    assert_eq!(wizard.content(), "retry me");
    assert_eq!(wizard.images().len(), 1);
    assert_eq!(h.storage.upload_count(), 1);

    h.reviews.fail_writes(false);
    let submitted = h.submission.submit(&mut wizard).await.unwrap();
    assert_eq!(submitted.review.image_urls.len(), 1);
    assert_eq!(h.storage.upload_count(), 1);
}

#[tokio::test]
async fn removing_an_already_uploaded_image_deletes_it_on_submit() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("사진 없이 올릴게요");
    wizard.stage_images(&h.pipeline, vec![photo("a.jpg", 10)]);

    h.reviews.fail_writes(true);
    assert!(h.submission.submit(&mut wizard).await.is_err());
    assert_eq!(h.storage.object_count(), 1);

    let id = wizard.images().stages()[0].id().clone();
    assert!(wizard.remove_image(&id));
    assert_eq!(wizard.images().unreferenced_uploads().len(), 1);

    h.reviews.fail_writes(false);
    let submitted = h.submission.submit(&mut wizard).await.unwrap();

    assert!(submitted.review.image_urls.is_empty());
    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.storage.delete_calls().len(), 1);
    assert_eq!(h.storage.upload_count(), 1);
}

#[tokio::test]
async fn second_submission_while_in_flight_is_rejected() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let mut wizard = h.wizard();
    wizard.set_concert_ref(EntityRef::Verified(concert)).unwrap();
    wizard.set_content("once");

    let gate = h.submission.gate().clone();
    let permit = gate.try_acquire().unwrap();
    let err = h.submission.submit(&mut wizard).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.reviews.count(), 0);

    drop(permit);
    h.submission.submit(&mut wizard).await.unwrap();
    assert_eq!(h.reviews.count(), 1);
}

#[tokio::test]
async fn review_of_a_pending_concert_is_accepted() {
    let h = Harness::new();
    let venue = h.catalog.add_venue("Blue Square");
    let artist = h.resolution.create_pending_artist("새아티스트").await.unwrap();
    let concert = h
        .resolution
        .create_concert(&encore_core::models::NewConcert {
            title: "Test Show".to_string(),
            schedules: vec![helpers::schedule(2025, 6, 1, "19:00")],
            artist,
            venue: EntityRef::Verified(venue),
            poster_url: None,
        })
        .await
        .unwrap();

    let mut wizard = h.wizard();
    wizard.set_concert_ref(concert).unwrap();
    wizard.set_content("pending but real");
    let submitted = h.submission.submit(&mut wizard).await.unwrap();
    assert_eq!(submitted.review.concert, concert);
}

#[tokio::test]
async fn unknown_concert_is_rejected() {
    let h = Harness::new();
    let mut wizard = h.wizard();
    wizard
        .set_concert_ref(EntityRef::Verified(Uuid::new_v4()))
        .unwrap();
    wizard.set_content("where was this");

    let err = h.submission.submit(&mut wizard).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(h.reviews.count(), 0);
}

#[tokio::test]
async fn edit_keeps_new_existing_new_order() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let kept = h.storage.seed("reviews", "kept.jpg", vec![1]);
    let review = seeded_review(&h, concert, vec![kept.clone()]);

    let mut session = h.submission.open_edit(review.id).await.unwrap();
    session.stage_images(&h.pipeline, vec![photo("front.jpg", 10), photo("back.jpg", 12)]);
    let front = session.images().stages()[1].id().clone();
    assert!(session.move_image(&front, 0));

    let submitted = h.submission.submit_edit(&mut session).await.unwrap();
    let urls = &submitted.review.image_urls;

    assert_eq!(urls.len(), 3);
    assert_ne!(urls[0], kept);
    assert_eq!(urls[1], kept);
    assert_ne!(urls[2], kept);
    assert_eq!(h.reviews.all()[0].image_urls, *urls);
    assert_eq!(h.storage.upload_count(), 2);
}

#[tokio::test]
async fn cancelled_edit_deletes_nothing() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let kept = h.storage.seed("reviews", "kept.jpg", vec![1]);
    let review = seeded_review(&h, concert, vec![kept.clone()]);

    let mut session = h.submission.open_edit(review.id).await.unwrap();
    session.stage_images(&h.pipeline, vec![photo("new.jpg", 10)]);
    let existing = session.images().stages()[0].id().clone();
    assert!(session.remove_image(&existing));
    assert_eq!(session.images().removed_remote(), [kept.clone()]);

    session.cancel(&h.pipeline).await;

    assert!(h.storage.delete_calls().is_empty());
    assert!(h.storage.has_object("reviews/kept.jpg"));
    assert_eq!(h.reviews.all()[0].image_urls, vec![kept]);
    assert_eq!(h.previews.live_count(), 0);
}

#[tokio::test]
async fn cancelled_edit_deletes_only_uploads_of_the_failed_save() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let kept = h.storage.seed("reviews", "kept.jpg", vec![1]);
    let review = seeded_review(&h, concert, vec![kept.clone()]);

    let mut session = h.submission.open_edit(review.id).await.unwrap();
    session.stage_images(&h.pipeline, vec![photo("new.jpg", 10)]);
    let existing = session.images().stages()[0].id().clone();
    session.remove_image(&existing);

    h.reviews.fail_writes(true);
    assert!(h.submission.submit_edit(&mut session).await.is_err());
    assert_eq!(h.storage.object_count(), 2);

    session.cancel(&h.pipeline).await;

    assert_eq!(h.storage.object_count(), 1);
    assert!(h.storage.has_object("reviews/kept.jpg"));
    assert_eq!(h.storage.delete_calls().len(), 1);
    assert_eq!(h.reviews.all()[0].image_urls, vec![kept]);
    assert_eq!(h.previews.live_count(), 0);
}

#[tokio::test]
async fn submitted_edit_deletes_removed_images() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let gone = h.storage.seed("reviews", "gone.jpg", vec![1]);
    let kept = h.storage.seed("reviews", "kept.jpg", vec![2]);
    let review = seeded_review(&h, concert, vec![gone.clone(), kept.clone()]);

    let mut session = h.submission.open_edit(review.id).await.unwrap();
    let first = session.images().stages()[0].id().clone();
    session.remove_image(&first);
    session.set_content("수정한 후기");

    let submitted = h.submission.submit_edit(&mut session).await.unwrap();

    assert_eq!(submitted.review.image_urls, vec![kept]);
    assert_eq!(submitted.review.content, "수정한 후기");
    assert!(submitted.review.updated_at.is_some());
    assert_eq!(h.storage.delete_calls(), vec!["reviews/gone.jpg".to_string()]);
    assert!(!h.storage.has_object("reviews/gone.jpg"));
}

#[tokio::test]
async fn failed_cleanup_does_not_fail_the_edit() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let gone = h.storage.seed("reviews", "gone.jpg", vec![1]);
    let review = seeded_review(&h, concert, vec![gone]);
    h.storage.fail_deletes();

    let mut session = h.submission.open_edit(review.id).await.unwrap();
    let first = session.images().stages()[0].id().clone();
    session.remove_image(&first);

    let submitted = h.submission.submit_edit(&mut session).await.unwrap();
    assert!(submitted.review.image_urls.is_empty());
    assert_eq!(h.storage.delete_calls().len(), 1);
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let h = Harness::new();
    let concert = h.seed_iu_concert();
    let review = seeded_review(&h, concert, vec![]);
    h.identity
        .sign_in(encore_services::test_helpers::user(Uuid::new_v4()));

    let err = h.submission.open_edit(review.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = h.submission.open_edit(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
