//! Smoke test for the HTTP surface

use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::SessionIssuer;
use chirpy::clock::SystemClock;
use chirpy::configuration::JwtSettings;
use chirpy::startup::run;
use chirpy::store::InMemoryStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryStore::new());
    let issuer = SessionIssuer::new(
        store.clone(),
        store,
        Arc::new(SystemClock),
        JwtSettings {
            secret: "health-check-secret".to_string(),
            ..JwtSettings::default()
        },
    );
    let server = run(listener, issuer).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/healthz", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/app/index.html", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
