//! Shared wiring for the integration suites: every service built on in-memory
//! collaborators, with one signed-in user.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use chrono::NaiveDate;
use encore_core::models::{CurrentUser, ScheduleInput};
use encore_core::{MediaConfig, ReviewConfig, SearchConfig};
use encore_services::test_helpers::{
    user, InMemoryCatalog, InMemoryReviews, InMemoryUsers, MockStorage, StaticIdentity,
};
use encore_services::{
    ConcertResolutionService, FeedService, InMemoryPreviewRegistry, LocalFile,
    MediaStagingPipeline, MemoryWizardStorage, ProfileService, ReviewSubmissionService,
    ReviewWizard,
};
use image::{ImageFormat, Rgba, RgbaImage};
use uuid::Uuid;

pub struct Harness {
    pub user: CurrentUser,
    pub identity: Arc<StaticIdentity>,
    pub catalog: Arc<InMemoryCatalog>,
    pub reviews: Arc<InMemoryReviews>,
    pub users: Arc<InMemoryUsers>,
    pub storage: Arc<MockStorage>,
    pub previews: Arc<InMemoryPreviewRegistry>,
    pub wizard_storage: Arc<MemoryWizardStorage>,
    pub pipeline: MediaStagingPipeline,
    pub resolution: ConcertResolutionService,
    pub submission: ReviewSubmissionService,
    pub feed: FeedService,
    pub profiles: ProfileService,
}

impl Harness {
    pub fn new() -> Self {
        let user = user(Uuid::new_v4());
        let identity = Arc::new(StaticIdentity::signed_in(user.clone()));
        let catalog = Arc::new(InMemoryCatalog::new());
        let reviews = Arc::new(InMemoryReviews::new());
        let users = Arc::new(InMemoryUsers::new());
        let storage = Arc::new(MockStorage::new());
        let previews = Arc::new(InMemoryPreviewRegistry::new());
        let media = MediaConfig::default();

        let pipeline = MediaStagingPipeline::new(storage.clone(), previews.clone(), &media);
        let resolution = ConcertResolutionService::new(
            catalog.clone(),
            identity.clone(),
            SearchConfig::default(),
        );
        let submission = ReviewSubmissionService::new(
            reviews.clone(),
            catalog.clone(),
            identity.clone(),
            pipeline.clone(),
            ReviewConfig::default(),
        );
        let feed = FeedService::new(
            reviews.clone(),
            catalog.clone(),
            users.clone(),
            identity.clone(),
            ReviewConfig::default(),
        );
        let profiles = ProfileService::new(users.clone(), identity.clone(), storage.clone(), &media);

        Self {
            user,
            identity,
            catalog,
            reviews,
            users,
            storage,
            previews,
            wizard_storage: Arc::new(MemoryWizardStorage::new()),
            pipeline,
            resolution,
            submission,
            feed,
            profiles,
        }
    }

    pub fn wizard(&self) -> ReviewWizard {
        ReviewWizard::load(self.wizard_storage.clone())
    }

    /// A verified concert by IU at a verified venue
    pub fn seed_iu_concert(&self) -> Uuid {
        let artist = self.catalog.add_artist("IU", Some("아이유"));
        let venue = self.catalog.add_venue("KSPO DOME");
        self.catalog.add_concert(
            "H.E.R. World Tour",
            artist,
            venue,
            vec![schedule(2024, 3, 2, "19:00")],
        )
    }
}

pub fn schedule(year: i32, month: u32, day: u32, start_time: &str) -> ScheduleInput {
    ScheduleInput::new(
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date"),
        start_time,
    )
}

/// Small JPEG-labelled file of `size` bytes
pub fn photo(name: &str, size: usize) -> LocalFile {
    LocalFile::new(name, "image/jpeg", vec![7u8; size])
}

pub fn png(name: &str, width: u32, height: u32) -> LocalFile {
    let img = RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode png");
    LocalFile::new(name, "image/png", buffer)
}
