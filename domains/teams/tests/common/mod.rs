//! Shared test setup: services wired to the in-memory store and the
//! recording notifier

use std::sync::Arc;

use crewup_notify::{MockNotifier, Notifier};
use crewup_teams::{
    Capacities, CascadeScope, CreateTeamCommand, MemoryStore, OfferService, Position, Store,
    TeamProfile, TeamService, User,
};

pub struct TestApp {
    pub teams: TeamService,
    pub offers: OfferService,
    pub notifier: MockNotifier,
}

pub fn setup() -> TestApp {
    setup_with(CascadeScope::AllPositions)
}

pub fn setup_with(cascade: CascadeScope) -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let notifier = MockNotifier::new();
    let shared: Arc<dyn Notifier> = Arc::new(notifier.clone());
    TestApp {
        teams: TeamService::new(store.clone(), shared.clone()),
        offers: OfferService::new(store, shared, cascade),
        notifier,
    }
}

pub fn profile(name: &str) -> TeamProfile {
    TeamProfile {
        project_name: name.to_string(),
        project_description: format!("{name} description"),
        expectation: "ship it".to_string(),
        open_chat_url: format!("https://chat.example.com/{name}"),
    }
}

pub fn team_command(name: &str, leader_position: Position, max: Capacities) -> CreateTeamCommand {
    CreateTeamCommand {
        profile: profile(name),
        leader_position,
        max,
    }
}

pub async fn register(app: &TestApp, username: &str) -> User {
    app.teams
        .register_user(username.to_string())
        .await
        .expect("register user")
}
