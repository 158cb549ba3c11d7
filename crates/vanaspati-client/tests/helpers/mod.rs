//! Test helpers: an in-memory stand-in for the diagnosis API.
//!
//! [`FakeApi`] answers every route the client uses and keeps history and
//! garden rows in memory, so tests can observe the server side of a
//! mutation. [`FakeApi::revoke_tokens`] makes every authenticated route
//! answer 401.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use vanaspati_client::{ClientConfig, MemoryCredentialStore, VanaspatiClient};
use vanaspati_core::{CredentialStore, Session};

pub const USERNAME: &str = "asha";
pub const EMAIL: &str = "asha@example.com";
pub const PASSWORD: &str = "Secret123";
pub const TOKEN: &str = "valid-token";

#[derive(Debug, Default)]
struct FakeState {
    tokens_revoked: bool,
    next_id: i64,
    history: Vec<Value>,
    plants: Vec<Value>,
    signups: Vec<HashMap<String, String>>,
}

/// Stateful mock of the diagnosis API.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    /// Start a mock server backed by a fresh fake.
    pub async fn start() -> (MockServer, FakeApi) {
        let server = MockServer::start().await;
        let fake = FakeApi::default();
        Mock::given(any())
            .respond_with(fake.clone())
            .mount(&server)
            .await;
        (server, fake)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// From now on every authenticated route answers 401.
    pub fn revoke_tokens(&self) {
        self.state().tokens_revoked = true;
    }

    /// Insert a history row directly, `minutes_ago` before a fixed instant.
    pub fn seed_history(&self, disease_name: &str, minutes_ago: i64) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago);
        state.history.push(json!({
            "id": id,
            "diagnosis_type": "single",
            "image_name": format!("leaf-{}.jpg", id),
            "disease_name": disease_name,
            "confidence": 0.9,
            "alternatives": [],
            "remedy_info": {},
            "notes": null,
            // naive timestamp, as the server sends it
            "diagnosed_at": at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "status": "active"
        }));
        id.to_string()
    }

    pub fn history_len(&self) -> usize {
        self.state().history.len()
    }

    pub fn plants(&self) -> Vec<Value> {
        self.state().plants.clone()
    }

    pub fn signup_count(&self) -> usize {
        self.state().signups.len()
    }

    fn authorized(&self, request: &Request) -> bool {
        let expected = format!("Bearer {}", TOKEN);
        !self.state().tokens_revoked
            && request
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some(expected.as_str())
    }

    fn route(&self, method: &str, path: &str, request: &Request) -> ResponseTemplate {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            ("POST", ["auth", "login"]) => self.login(request),
            ("POST", ["auth", "signup"]) => self.signup(request),
            _ if !self.authorized(request) => unauthorized(),
            ("GET", ["auth", "me"]) => ok(json!({
                "username": USERNAME,
                "email": EMAIL,
                "is_admin": false
            })),
            ("GET", ["history", "diagnosis"]) => self.list_history(request),
            ("POST", ["history", "diagnosis"]) => self.save_history(request),
            ("DELETE", ["history", "diagnosis"]) => {
                self.state().history.clear();
                ok(json!({"message": "All history cleared"}))
            }
            ("DELETE", ["history", "diagnosis", id]) => {
                let mut state = self.state();
                let before = state.history.len();
                state.history.retain(|row| id_of(row) != *id);
                if state.history.len() == before {
                    not_found("Diagnosis not found")
                } else {
                    ok(json!({"message": "Diagnosis deleted"}))
                }
            }
            ("GET", ["garden", "plants"]) => ok(json!({"plants": self.state().plants.clone()})),
            ("POST", ["garden", "plants"]) => self.save_plant(request),
            ("PATCH", ["garden", "plants", id]) => self.update_plant(id, request),
            ("DELETE", ["garden", "plants", id]) => {
                let mut state = self.state();
                let before = state.plants.len();
                state.plants.retain(|row| id_of(row) != *id);
                if state.plants.len() == before {
                    not_found("Plant not found")
                } else {
                    ok(json!({"message": "Plant removed from garden"}))
                }
            }
            _ => not_found("Not Found"),
        }
    }

    fn login(&self, request: &Request) -> ResponseTemplate {
        let form = pairs(&String::from_utf8_lossy(&request.body));
        let user = form.get("username").map(String::as_str);
        let password = form.get("password").map(String::as_str);
        if (user == Some(USERNAME) || user == Some(EMAIL)) && password == Some(PASSWORD) {
            ok(json!({
                "access_token": TOKEN,
                "token_type": "bearer",
                "username": USERNAME,
                "email": EMAIL,
                "is_admin": false
            }))
        } else {
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Incorrect username or password"}))
        }
    }

    fn signup(&self, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        self.state().signups.push(query);
        ok(json!({"message": "User created successfully"}))
    }

    fn list_history(&self, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let limit = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(50usize);
        let offset = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0usize);

        let state = self.state();
        // rows in insertion order; the client sorts
        let page: Vec<Value> = state.history.iter().skip(offset).take(limit).cloned().collect();
        ok(json!({"history": page, "total": state.history.len()}))
    }

    fn save_history(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => {
                return ResponseTemplate::new(422).set_body_json(json!({"detail": "Invalid body"}))
            }
        };
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        body["id"] = json!(id);
        body["diagnosed_at"] = json!(Utc::now().naive_utc().to_string());
        body["status"] = json!("active");
        state.history.push(body);
        ok(json!({"message": "Diagnosis saved", "diagnosis_id": id}))
    }

    fn save_plant(&self, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let mut state = self.state();
        state.next_id += 1;
        let plant = json!({
            "id": state.next_id,
            "plant_name": query.get("plant_name"),
            "disease_name": query.get("disease_name"),
            "confidence": query.get("confidence").and_then(|c| c.parse::<f64>().ok()),
            "notes": query.get("notes"),
            "status": query.get("status").cloned().unwrap_or_else(|| "monitoring".to_string()),
            "diagnosed_at": Utc::now().to_rfc3339(),
            "updated_at": null,
            "image_path": null
        });
        state.plants.push(plant.clone());
        ok(plant)
    }

    fn update_plant(&self, id: &str, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let mut state = self.state();
        let Some(plant) = state.plants.iter_mut().find(|row| id_of(row) == id) else {
            return not_found("Plant not found");
        };
        // only parameters actually sent change the row
        if let Some(notes) = query.get("notes") {
            plant["notes"] = json!(notes);
        }
        if let Some(status) = query.get("status") {
            plant["status"] = json!(status);
        }
        plant["updated_at"] = json!(Utc::now().to_rfc3339());
        ok(plant.clone())
    }
}

impl Respond for FakeApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.to_string();
        self.route(&method, request.url.path(), request)
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"}))
}

fn not_found(detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"detail": detail}))
}

fn id_of(row: &Value) -> String {
    match &row["id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pairs(encoded: &str) -> HashMap<String, String> {
    reqwest::Url::parse(&format!("http://form.local/?{}", encoded))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// Client against `server` with an empty credential store.
pub fn anonymous_client(server: &MockServer) -> (VanaspatiClient, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let client = VanaspatiClient::new(ClientConfig::with_base_url(server.uri()), store.clone())
        .expect("client");
    (client, store)
}

/// Client against `server` whose store already holds a valid login.
pub fn logged_in_client(server: &MockServer) -> (VanaspatiClient, Arc<MemoryCredentialStore>) {
    let (client, store) = anonymous_client(server);
    store
        .store_login(
            TOKEN,
            &Session {
                username: USERNAME.to_string(),
                email: EMAIL.to_string(),
                is_admin: false,
            },
        )
        .expect("store login");
    (client, store)
}
