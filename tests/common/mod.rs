#![allow(dead_code)]

use async_trait::async_trait;
use httpmock::MockServer;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zuora_import::{Action, ImportConfig, ImportEngine, ImportError, Token, TokenProvider};

/// Hands out tokens from a fixed script, then fails once the script runs out
/// (or keeps repeating the last one when `repeat_last` is set).
pub struct ScriptedTokenProvider {
    tokens: Vec<String>,
    repeat_last: bool,
    calls: AtomicUsize,
}

impl ScriptedTokenProvider {
    pub fn new(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            repeat_last: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn exhausting(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            repeat_last: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for ScriptedTokenProvider {
    async fn acquire(&self) -> zuora_import::Result<Token> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let token = match self.tokens.get(call) {
            Some(token) => Some(token),
            None if self.repeat_last => self.tokens.last(),
            None => None,
        };
        token
            .map(|t| Token::new(t.clone()))
            .ok_or_else(|| ImportError::AuthError {
                message: "scripted provider exhausted".to_string(),
            })
    }
}

pub fn config(server: &MockServer, action: Action) -> ImportConfig {
    let mut config = ImportConfig::new(
        server.url("/oauth/token"),
        server.base_url(),
        "Account",
        action,
        "client-123",
        "s3cret",
    );
    config.token_retry_delay_ms = 0;
    config.request_timeout_secs = 5;
    config
}

pub fn engine(config: ImportConfig, provider: Arc<ScriptedTokenProvider>) -> ImportEngine {
    ImportEngine::with_token_provider(config, provider).unwrap()
}

/// `Id,Name` CSV with `count` rows, ids A1..A{count}.
pub fn id_name_csv(count: usize) -> String {
    let mut csv = String::from("Id,Name\n");
    for i in 1..=count {
        csv.push_str(&format!("A{},Account {}\n", i, i));
    }
    csv
}

/// Base URL of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
