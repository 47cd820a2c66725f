#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test, web, App, Error,
};
use serde_json::{json, Value};
use taskdesk::{auth::TokenKeys, routes, state::AppState, store::MemoryStore};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "Password123!";

pub fn state(store: Arc<MemoryStore>) -> web::Data<AppState> {
    web::Data::new(AppState::new(store, TokenKeys::new(SECRET, 1)))
}

/// The full application over a fresh in-memory store.
pub async fn test_app(
    store: Arc<MemoryStore>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    test::init_service(App::new().app_data(state(store)).configure(routes::config)).await
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Registers `username` and returns the profile from the response.
pub async fn register<S, B>(app: &S, username: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": PASSWORD
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "registration of {} failed", username);
    test::read_body_json(resp).await
}

pub async fn login<S, B>(app: &S, username: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": username, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "login of {} failed", username);
    let body: Value = test::read_body_json(resp).await;
    body["access_token"].as_str().unwrap().to_string()
}

/// Registers and logs in `username`, returning the user id and a bearer token.
pub async fn signed_in<S, B>(app: &S, username: &str) -> (i32, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let profile = register(app, username).await;
    let token = login(app, username).await;
    (profile["id"].as_i64().unwrap() as i32, token)
}

/// Sends `req` and returns the status with the decoded JSON body (`Null` when empty).
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    if body.is_empty() {
        (status, Value::Null)
    } else {
        (status, serde_json::from_slice(&body).unwrap())
    }
}

pub fn ids(values: &Value) -> Vec<i64> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}
