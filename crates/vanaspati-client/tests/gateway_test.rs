//! Integration tests for bearer-token attachment and the global 401 policy.

mod helpers;

use helpers::{anonymous_client, logged_in_client, FakeApi, TOKEN};
use tokio::sync::broadcast::Receiver;
use vanaspati_client::{MemoryCredentialStore, SessionState, VanaspatiClient};
use vanaspati_core::{
    CredentialStore, EventEnvelope, NewDiagnosis, NewGardenPlant, PlantStatus, PlantUpdate, RecordId,
};

fn drain(rx: &mut Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_logged_out(
    client: &VanaspatiClient,
    store: &MemoryCredentialStore,
    rx: &mut Receiver<EventEnvelope>,
) {
    assert!(store.is_empty(), "credential store should be empty after 401");
    assert_eq!(client.session.state(), SessionState::Anonymous);
    assert_eq!(client.history.total(), 0);

    let events = drain(rx);
    let login_required = events
        .iter()
        .find(|e| e.event_type == "auth.login_required")
        .expect("login_required event");
    assert_eq!(
        serde_json::to_value(&login_required.payload).unwrap()["redirect_to"],
        "/login"
    );
}

#[tokio::test]
async fn test_bearer_header_sent_when_token_stored() {
    let (server, _fake) = FakeApi::start().await;
    let (client, _store) = logged_in_client(&server);

    client.history.load().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let last = requests.last().unwrap();
    assert_eq!(
        last.headers.get("authorization").unwrap().to_str().unwrap(),
        format!("Bearer {}", TOKEN)
    );
    assert_eq!(last.url.query(), Some("limit=50&offset=0"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let (server, _fake) = FakeApi::start().await;
    let (client, _store) = anonymous_client(&server);

    // Garden has no client-side token gate; the request goes out bare.
    let result = client.garden.list().await;
    assert!(result.unwrap_err().is_unauthorized());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unauthorized_on_every_endpoint_clears_session() {
    let (server, fake) = FakeApi::start().await;
    fake.revoke_tokens();

    // Each case runs on a fresh logged-in client.
    let cases: Vec<&str> = vec![
        "history.load",
        "history.add",
        "history.delete",
        "history.clear_all",
        "garden.list",
        "garden.save",
        "garden.update",
        "garden.delete",
    ];

    for case in cases {
        let (client, store) = logged_in_client(&server);
        let mut rx = client.subscribe();
        client
            .api
            .session_store()
            .set(SessionState::Authenticated(store.cached_session().unwrap()));

        let id = RecordId::from(1);
        let err = match case {
            "history.load" => client.history.load().await.unwrap_err(),
            "history.add" => client
                .history
                .add(NewDiagnosis::single("leaf.jpg", "Tomato___Late_blight", 0.9))
                .await
                .unwrap_err(),
            "history.delete" => client.history.delete(&id).await.unwrap_err(),
            "history.clear_all" => client.history.clear_all().await.unwrap_err(),
            "garden.list" => client.garden.list().await.unwrap_err(),
            "garden.save" => client
                .garden
                .save(&NewGardenPlant::new("Tomato", "Tomato___Late_blight", 0.9))
                .await
                .unwrap_err(),
            "garden.update" => client
                .garden
                .update(&id, &PlantUpdate::status(PlantStatus::Treating))
                .await
                .unwrap_err(),
            "garden.delete" => client.garden.delete(&id).await.unwrap_err(),
            _ => unreachable!(),
        };

        assert!(err.is_unauthorized(), "{}: expected 401, got {:?}", case, err);
        assert_logged_out(&client, &store, &mut rx);
    }
}

#[tokio::test]
async fn test_unauthorized_drops_cached_history() {
    let (server, fake) = FakeApi::start().await;
    fake.seed_history("Apple___Black_rot", 30);
    fake.seed_history("Apple___healthy", 10);
    let (client, store) = logged_in_client(&server);
    let mut rx = client.subscribe();

    client.history.load().await.unwrap();
    assert_eq!(client.history.total(), 2);

    // The rejection comes from an unrelated endpoint.
    fake.revoke_tokens();
    let err = client.garden.list().await.unwrap_err();
    assert!(err.is_unauthorized());

    assert!(client.history.records().is_empty());
    assert_eq!(client.history.server_total(), 0);
    assert_logged_out(&client, &store, &mut rx);
}

#[tokio::test]
async fn test_unauthorized_on_initialize() {
    let (server, fake) = FakeApi::start().await;
    fake.revoke_tokens();
    let (client, store) = logged_in_client(&server);
    let mut rx = client.subscribe();

    assert_eq!(client.session.initialize().await, SessionState::Anonymous);
    assert_logged_out(&client, &store, &mut rx);
}

#[tokio::test]
async fn test_rejected_login_requests_login() {
    let (server, _fake) = FakeApi::start().await;
    let (client, store) = anonymous_client(&server);
    let mut rx = client.subscribe();

    let err = client.session.login("asha", "WrongPass1").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized: Incorrect username or password");
    assert_logged_out(&client, &store, &mut rx);
}

#[tokio::test]
async fn test_non_auth_errors_keep_session() {
    let (server, _fake) = FakeApi::start().await;
    let (client, store) = logged_in_client(&server);

    let err = client
        .garden
        .delete(&RecordId::from("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!store.is_empty());
}
