use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use http::{header, HeaderMap, Request, StatusCode};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::jwt::validate_token;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Pulls the caller's token from the `Authorization: Bearer` header, falling
/// back to the `access_token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_value = auth_header
            .to_str()
            .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

        return auth_value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()));
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))
}

pub fn authenticate(config: &AppConfig, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = extract_token(headers)?;
    validate_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)
}

/// 302 to the login page, carrying the requested location in `next`.
pub fn redirect_to_login(login_url: &str, next: &str) -> Response {
    let location = format!("{}?next={}", login_url, urlencoding::encode(next));
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

// Anonymous, invalid and non-staff callers are redirected, never served.
pub async fn staff_member_required(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let requested = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let requested = requested
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| requested.path().to_string());

    match authenticate(&config, request.headers()) {
        Ok(user) if user.is_staff() => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(user) => {
            debug!("User {} lacks staff privilege for {}", user.id, requested);
            redirect_to_login(&config.login_url, &requested)
        }
        Err(e) => {
            debug!("Unauthenticated request to {}: {}", requested, e);
            redirect_to_login(&config.login_url, &requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn app(config: Arc<AppConfig>) -> Router {
        Router::new()
            .route(
                "/secret",
                get(|Extension(user): Extension<AuthUser>| async move { user.id }),
            )
            .layer(middleware::from_fn_with_state(config.clone(), staff_member_required))
            .with_state(config)
    }

    fn get_request(uri: &str, header: Option<(&str, String)>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn extracts_bearer_then_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "access_token=from-cookie".parse().unwrap());
        assert_eq!(extract_token(&headers).unwrap(), "from-cookie");

        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(extract_token(&headers).unwrap(), "from-header");

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_matches!(extract_token(&headers), Err(AppError::Auth(_)));

        assert_matches!(extract_token(&HeaderMap::new()), Err(AppError::Auth(_)));
    }

    #[tokio::test]
    async fn anonymous_request_redirects_with_next() {
        let config = TestConfig::default().to_arc();
        let response = app(config).oneshot(get_request("/secret?x=1", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/admin/login/?next=%2Fsecret%3Fx%3D1"
        );
    }

    #[tokio::test]
    async fn non_staff_request_redirects() {
        let test_config = TestConfig::default();
        let patient = TestUser::regular("patient@example.com");
        let token = JwtTestUtils::create_test_token(&patient, &test_config.jwt_secret, None);

        let response = app(test_config.to_arc())
            .oneshot(get_request("/secret", Some(("Authorization", format!("Bearer {}", token)))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn staff_request_passes_through_with_identity() {
        let test_config = TestConfig::default();
        let staff = TestUser::staff("staff@example.com");
        let token = JwtTestUtils::create_test_token(&staff, &test_config.jwt_secret, None);

        let response = app(test_config.to_arc())
            .oneshot(get_request("/secret", Some(("Cookie", format!("access_token={}", token)))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, staff.id.as_bytes());
    }
}
