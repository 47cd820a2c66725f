use crate::{
    auth::{LoginRequest, RegisterRequest},
    error::AppError,
    services,
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates a new account and returns its public profile. No token is issued;
/// the client logs in afterwards.
///
/// ## Responses:
/// - `201 Created`: the new user's profile.
/// - `401 Unauthorized`: if the username or email is already taken.
/// - `422 Unprocessable Entity`: if the payload fails validation.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let user = services::auth::register(state.store.as_ref(), register_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Login user
///
/// Authenticates a user and returns a bearer token with the user's summary.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let session = services::auth::login(state.store.as_ref(), &state.tokens, &login_data).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKeys;
    use crate::store::MemoryStore;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Arc::new(MemoryStore::new()),
            TokenKeys::new("route-test-secret", 1),
        ))
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let app = test::init_service(App::new().app_data(state()).service(register)).await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({
                "username": "test",
                "email": "invalid-email",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({
                "username": "bad name!",
                "email": "test@example.com",
                "password": "password123"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_rt::test]
    async fn test_login_rejects_blank_and_unknown_credentials() {
        let app = test::init_service(App::new().app_data(state()).service(login)).await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "", "password": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "nobody", "password": "password123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
