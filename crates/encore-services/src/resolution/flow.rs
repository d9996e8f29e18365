use std::fmt;

use encore_core::models::{ConcertRef, ConcertSummary, NewConcert, SearchMode};
use encore_core::AppError;

use super::ConcertResolutionService;
use crate::wizard::ReviewWizard;

/// Where one wizard run stands in resolving its concert.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    NoConcert,
    Searching,
    Found(Vec<ConcertSummary>),
    NotFound,
    Creating,
    Ready(ConcertRef),
}

impl ResolutionState {
    fn name(&self) -> &'static str {
        match self {
            ResolutionState::NoConcert => "no-concert",
            ResolutionState::Searching => "searching",
            ResolutionState::Found(_) => "found",
            ResolutionState::NotFound => "not-found",
            ResolutionState::Creating => "creating",
            ResolutionState::Ready(_) => "ready",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `NoConcert -> Searching -> Found -> Ready`, or `... -> NotFound -> Creating -> Ready`.
///
/// A failed call returns the flow to the state it was in before the call.
pub struct ResolutionFlow<'a> {
    service: &'a ConcertResolutionService,
    state: ResolutionState,
}

impl<'a> ResolutionFlow<'a> {
    pub fn new(service: &'a ConcertResolutionService) -> Self {
        Self {
            service,
            state: ResolutionState::NoConcert,
        }
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn ready(&self) -> Option<ConcertRef> {
        match self.state {
            ResolutionState::Ready(concert) => Some(concert),
            _ => None,
        }
    }

    /// A term below the minimum length leaves the state untouched.
    pub async fn search(
        &mut self,
        term: &str,
        mode: SearchMode,
    ) -> Result<&ResolutionState, AppError> {
        if matches!(
            self.state,
            ResolutionState::Creating | ResolutionState::Ready(_)
        ) {
            return Err(self.invalid("search"));
        }
        if !self.service.accepts_term(term) {
            return Ok(&self.state);
        }

        let previous = std::mem::replace(&mut self.state, ResolutionState::Searching);
        match self.service.search(term, mode).await {
            Ok(results) if results.is_empty() => self.state = ResolutionState::NotFound,
            Ok(results) => self.state = ResolutionState::Found(results),
            Err(e) => {
                self.state = previous;
                return Err(e);
            }
        }
        Ok(&self.state)
    }

    /// Pick one of the search results.
    pub fn select(&mut self, concert: ConcertRef) -> Result<ConcertRef, AppError> {
        let ResolutionState::Found(results) = &self.state else {
            return Err(self.invalid("select"));
        };
        if !results.iter().any(|summary| summary.concert == concert) {
            return Err(AppError::validation(
                "concert",
                "Select a concert from the search results",
            ));
        }
        self.state = ResolutionState::Ready(concert);
        Ok(concert)
    }

    /// Nothing suitable was found; register a new concert instead.
    pub fn begin_create(&mut self) -> Result<(), AppError> {
        match self.state {
            ResolutionState::NotFound | ResolutionState::Found(_) => {
                self.state = ResolutionState::Creating;
                Ok(())
            }
            _ => Err(self.invalid("create")),
        }
    }

    pub async fn create(&mut self, concert: &NewConcert) -> Result<ConcertRef, AppError> {
        if self.state != ResolutionState::Creating {
            return Err(self.invalid("create"));
        }
        let created = self.service.create_concert(concert).await?;
        self.state = ResolutionState::Ready(created);
        Ok(created)
    }

    /// Hand the resolved concert to the wizard, which advances to writing the review.
    pub fn apply(&self, wizard: &mut ReviewWizard) -> Result<(), AppError> {
        match self.ready() {
            Some(concert) => wizard.set_concert_ref(concert),
            None => Err(AppError::validation("concert", "Select a concert")),
        }
    }

    fn invalid(&self, action: &str) -> AppError {
        AppError::Internal(format!("cannot {} while {}", action, self.state))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_helpers::{user, InMemoryCatalog, StaticIdentity};
    use encore_core::{EntityRef, SearchConfig};
    use uuid::Uuid;

    fn service(catalog: Arc<InMemoryCatalog>) -> ConcertResolutionService {
        let identity = Arc::new(StaticIdentity::signed_in(user(Uuid::new_v4())));
        ConcertResolutionService::new(catalog, identity, SearchConfig::default())
    }

    #[tokio::test]
    async fn out_of_order_steps_are_rejected() {
        let service = service(Arc::new(InMemoryCatalog::new()));
        let mut flow = ResolutionFlow::new(&service);

        assert!(matches!(flow.begin_create(), Err(AppError::Internal(_))));
        assert!(flow.select(EntityRef::Verified(Uuid::new_v4())).is_err());
        assert_eq!(flow.state(), &ResolutionState::NoConcert);

        flow.search("Nothing Here", SearchMode::ByTitle).await.unwrap();
        assert_eq!(flow.state(), &ResolutionState::NotFound);
        flow.begin_create().unwrap();
        assert!(flow.search("again", SearchMode::ByTitle).await.is_err());
        assert_eq!(flow.state(), &ResolutionState::Creating);
    }

    #[tokio::test]
    async fn failed_search_keeps_previous_state() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(catalog.clone());
        let mut flow = ResolutionFlow::new(&service);

        catalog.fail_searches();
        let err = flow.search("아이유", SearchMode::ByArtist).await.unwrap_err();
        assert!(matches!(err, AppError::Resolution(_)));
        assert_eq!(flow.state(), &ResolutionState::NoConcert);
        assert!(flow.ready().is_none());
    }

    #[tokio::test]
    async fn short_term_keeps_previous_state() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let artist = catalog.add_artist("IU", Some("아이유"));
        let venue = catalog.add_venue("KSPO DOME");
        catalog.add_concert("H.E.R. World Tour", artist, venue, Vec::new());
        let service = service(catalog.clone());
        let mut flow = ResolutionFlow::new(&service);

        flow.search(" 아 ", SearchMode::ByArtist).await.unwrap();
        assert_eq!(flow.state(), &ResolutionState::NoConcert);
        assert_eq!(catalog.query_count(), 0);

        flow.search("아이유", SearchMode::ByArtist).await.unwrap();
        assert!(matches!(flow.state(), ResolutionState::Found(results) if results.len() == 1));
        flow.search("I", SearchMode::ByArtist).await.unwrap();
        assert!(matches!(flow.state(), ResolutionState::Found(_)));
        assert_eq!(catalog.query_count(), 1);
    }

    #[tokio::test]
    async fn only_listed_results_can_be_selected() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let artist = catalog.add_artist("IU", Some("아이유"));
        let venue = catalog.add_venue("KSPO DOME");
        let concert = catalog.add_concert("H.E.R. World Tour", artist, venue, Vec::new());
        let service = service(catalog);
        let mut flow = ResolutionFlow::new(&service);

        flow.search("아이유", SearchMode::ByArtist).await.unwrap();
        let err = flow.select(EntityRef::Verified(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let chosen = flow.select(EntityRef::Verified(concert)).unwrap();
        assert_eq!(flow.ready(), Some(chosen));
        assert_eq!(flow.state().to_string(), "ready");
    }
}
