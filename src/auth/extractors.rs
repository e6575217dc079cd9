use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Claims;
use crate::error::AppError;

/// The authenticated caller's user id.
///
/// Reads the [`Claims`] that `AuthMiddleware` stored in the request extensions.
/// Used outside the middleware's scope it fails with `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUserId(pub i32);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req.extensions().get::<Claims>().map(|claims| claims.sub);
        ready(match user_id {
            Some(user_id) => Ok(AuthenticatedUserId(user_id)),
            None => Err(AppError::Unauthorized("Not authenticated".to_string()).into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(Claims {
            sub: 123,
            exp: usize::MAX,
            iat: 0,
        });

        let mut payload = Payload::None;
        let extracted = AuthenticatedUserId::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(extracted, AuthenticatedUserId(123));
    }

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = AuthenticatedUserId::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
