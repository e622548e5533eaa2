#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use trekline_core::api::testing::ScriptedTransport;
use trekline_core::auth::unsigned_token;
use trekline_core::models::Trek;
use trekline_core::storage::{KeyValueStore, MemoryStore};
use trekline_core::Trekline;

/// The full stack over a scripted network and in-memory storage.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub credentials: Arc<MemoryStore>,
    pub snapshots: Arc<MemoryStore>,
    pub app: Trekline,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let credentials = Arc::new(MemoryStore::new());
        let snapshots = Arc::new(MemoryStore::new());
        let app = Trekline::new(transport.clone(), credentials.clone(), snapshots.clone());
        Self {
            transport,
            credentials,
            snapshots,
            app,
        }
    }

    /// A harness whose store already holds `token`, as after an earlier run
    pub async fn with_stored(token: &str) -> Self {
        let harness = Self::new();
        harness.credentials.set("auth_token", token).await.unwrap();
        harness
    }

    pub async fn stored_token(&self) -> Option<String> {
        self.credentials.get("auth_token").await.unwrap()
    }

    pub fn resets(&self) -> u64 {
        self.app.reset.count()
    }
}

pub fn token_expiring_in(seconds: i64) -> String {
    let exp = Utc::now().timestamp() + seconds;
    unsigned_token(&json!({ "sub": "user-1", "email": "hiker@example.com", "exp": exp }))
}

pub fn token_without_expiry() -> String {
    token_for("user-1")
}

/// A non-expiring credential for the user `sub`
pub fn token_for(sub: &str) -> String {
    unsigned_token(&json!({ "sub": sub, "email": format!("{}@example.com", sub) }))
}

/// `count` treks with metrics that tie and vary across the list
pub fn treks(prefix: &str, count: u32) -> Vec<Trek> {
    (0..count)
        .map(|i| {
            serde_json::from_value(json!({
                "id": format!("{}{}", prefix, i),
                "name": format!("Trek {}{}", prefix, i),
                "rating": f64::from(i % 5) + 0.5,
                "reviewCount": i * 3,
                "bookingCount": (i * 7) % 11,
            }))
            .unwrap()
        })
        .collect()
}

pub fn body(treks: &[Trek]) -> String {
    serde_json::to_string(treks).unwrap()
}

/// Same list wrapped in a `data` envelope
pub fn wrapped(treks: &[Trek]) -> String {
    json!({ "data": treks }).to_string()
}

pub fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| id(item).to_string()).collect()
}

pub fn bookings_body() -> String {
    let bookings: Value = json!([
        { "id": "b1", "trekId": "t1", "trekName": "Hampta Pass", "status": "confirmed" },
        { "id": "b2", "trekId": "t2", "status": "completed" }
    ]);
    bookings.to_string()
}
