#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;
use shortcode_service::application::services::{AuthService, LinkService, LinkSettings};
use shortcode_service::domain::repositories::LinkRepository;
use shortcode_service::infrastructure::cache::{MemoryLinkCache, MemoryPopularityIndex};
use shortcode_service::infrastructure::persistence::MemoryLinkRepository;
use shortcode_service::routes::build_router;
use shortcode_service::state::{AppState, SharedLinkService};

pub const TEST_TOKEN: &str = "test-token";
pub const BEARER: &str = "Bearer test-token";
pub const BASE_URL: &str = "https://sho.rt";

/// In-process service stack with handles on its backends.
pub struct TestApp {
    pub state: AppState,
    pub service: SharedLinkService,
    pub repository: Arc<MemoryLinkRepository>,
}

pub fn create_test_service() -> (SharedLinkService, Arc<MemoryLinkRepository>) {
    let repository = Arc::new(MemoryLinkRepository::new());
    let store: Arc<dyn LinkRepository> = repository.clone();

    let service = Arc::new(LinkService::new(
        store,
        Arc::new(MemoryLinkCache::new(1_000)),
        Arc::new(MemoryPopularityIndex::new()),
        LinkSettings::default(),
    ));

    (service, repository)
}

pub fn create_test_app() -> TestApp {
    let (service, repository) = create_test_service();
    let auth_service = Arc::new(
        AuthService::new([TEST_TOKEN], "test-signing-secret".to_string()).unwrap(),
    );

    TestApp {
        state: AppState::new(service.clone(), auth_service, BASE_URL),
        service,
        repository,
    }
}

pub fn create_test_server(app: &TestApp) -> TestServer {
    TestServer::new(build_router(app.state.clone())).unwrap()
}
