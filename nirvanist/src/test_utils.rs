//! Test utilities shared by the unit and handler tests.

use std::sync::Arc;

use axum_test::TestServer;

use crate::{
    AppState,
    auth::session::SessionIssuer,
    captcha::CaptchaVerifier,
    chat::ChatService,
    config::{Config, DatabaseConfig, EmailTransportConfig, PasswordConfig},
    db::{
        Stores,
        in_memory::{InMemoryAccountStore, InMemoryContactMessageStore, InMemorySubscriberStore},
    },
    email::{EmailService, RecordingMailer},
};

/// A state plus handles on its in-memory stores and mailer, for asserting on side effects.
pub struct TestContext {
    pub state: AppState,
    pub mailer: RecordingMailer,
    pub accounts: InMemoryAccountStore,
    pub contact_messages: InMemoryContactMessageStore,
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        database: DatabaseConfig::Memory,
        ..Default::default()
    };
    config.email.transport = EmailTransportConfig::Disabled;
    // Cheap hashing so tests don't spend seconds in argon2
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config
}

pub fn create_test_state() -> (AppState, RecordingMailer) {
    create_test_state_with_stores(create_test_config(), Stores::in_memory())
}

pub fn create_test_state_with_stores(config: Config, stores: Stores) -> (AppState, RecordingMailer) {
    let mailer = RecordingMailer::new();
    let state = AppState::builder()
        .email(EmailService::new(Arc::new(mailer.clone()), &config))
        .captcha(CaptchaVerifier::new(&config.captcha).expect("Failed to create captcha verifier"))
        .chat(ChatService::from_config(&config.chat).expect("Failed to create chat service"))
        .sessions(SessionIssuer::from_config(&config).expect("Failed to create session issuer"))
        .stores(stores)
        .config(config)
        .build();
    (state, mailer)
}

pub fn create_test_context(config: Config) -> TestContext {
    let accounts = InMemoryAccountStore::new();
    let contact_messages = InMemoryContactMessageStore::new();
    let stores = Stores {
        accounts: Arc::new(accounts.clone()),
        subscribers: Arc::new(InMemorySubscriberStore::new()),
        contact_messages: Arc::new(contact_messages.clone()),
    };
    let (state, mailer) = create_test_state_with_stores(config, stores);
    TestContext {
        state,
        mailer,
        accounts,
        contact_messages,
    }
}

pub fn server_for(state: &AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub fn create_test_server() -> (TestServer, RecordingMailer) {
    create_test_server_with_config(create_test_config())
}

pub fn create_test_server_with_config(config: Config) -> (TestServer, RecordingMailer) {
    let (state, mailer) = create_test_state_with_stores(config, Stores::in_memory());
    (server_for(&state), mailer)
}

/// Pull the token out of a `{path}?token=...` link in an email body.
pub fn extract_token(html: &str, path: &str) -> Option<String> {
    let marker = format!("{path}?token=");
    let start = html.find(&marker)? + marker.len();
    let token: String = html[start..].chars().take_while(|c| *c != '"' && *c != '<').collect();
    (!token.is_empty()).then_some(token)
}

/// reqwest is built without a default crypto provider; tests that build clients need one.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
