use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::UserProfile;
use crate::state::AppState;
use crate::store::UserStore;

/// The authenticated caller, resolved from the token's subject claim.
///
/// Only usable on routes wrapped by [`AuthMiddleware`](crate::auth::AuthMiddleware),
/// which places the verified [`Claims`] in the request extensions. The subject must
/// still name an existing user; a token for a deleted user yields 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let claims = claims.ok_or_else(|| {
                AppError::Unauthorized("Missing authentication. Ensure AuthMiddleware is active.".into())
            })?;
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("Application state not configured".into())
            })?;

            match state.store.find_user(claims.sub).await? {
                Some(user) => Ok(CurrentUser(user.into())),
                None => {
                    log::warn!("Token subject {} does not match any user", claims.sub);
                    Err(AppError::Unauthorized("Invalid token".into()).into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKeys;
    use crate::models::NewUser;
    use crate::store::MemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use std::sync::Arc;

    fn claims_for(sub: i32) -> Claims {
        Claims {
            sub,
            username: "someone".to_string(),
            iat: 0,
            exp: usize::MAX,
        }
    }

    async fn state_with_user() -> (web::Data<AppState>, i32) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                username: "extractor_user".to_string(),
                password_hash: "hash".to_string(),
                email: "extractor@example.com".to_string(),
            })
            .await
            .unwrap();
        let state = web::Data::new(AppState::new(store, TokenKeys::new("secret", 1)));
        (state, user.id)
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_success() {
        let (state, user_id) = state_with_user().await;
        let req = test::TestRequest::default().app_data(state).to_http_request();
        req.extensions_mut().insert(claims_for(user_id));

        let current = CurrentUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(current.0.id, user_id);
        assert_eq!(current.0.username, "extractor_user");
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_without_claims() {
        let (state, _) = state_with_user().await;
        let req = test::TestRequest::default().app_data(state).to_http_request();

        let err = CurrentUser::from_request(&req, &mut Payload::None).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_current_user_extractor_unknown_subject() {
        let (state, user_id) = state_with_user().await;
        let req = test::TestRequest::default().app_data(state).to_http_request();
        req.extensions_mut().insert(claims_for(user_id + 100));

        let err = CurrentUser::from_request(&req, &mut Payload::None).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
