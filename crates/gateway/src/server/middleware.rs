//! Admission and response-shaping middleware.
//!
//! Four layers make up the admission gate:
//! - [`authenticate`] — bearer-token validation for a named strategy.
//! - [`ip_filter`] — IP allow-list check, applied before authentication.
//! - [`enforce_https`] — redirect insecure requests in production.
//! - [`postprocess`] — outgoing response hook: development-mode error
//!   enrichment and cache headers.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;

use crate::admission::{AuthenticatedPrincipal, Strategy};
use crate::config::Mode;

use super::error::ErrorDetails;
use super::state::AppState;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State for [`authenticate`]: the shared app state plus the strategy that
/// guards the wrapped routes.
#[derive(Clone)]
pub struct AuthState {
    pub app: AppState,
    pub strategy: Strategy,
}

/// Bearer-token admission check.
///
/// The token comes from the `Authorization: Bearer` header or, failing that,
/// the `access_token` query parameter. On success an
/// [`AuthenticatedPrincipal`] carrying the strategy's scopes is attached to
/// the request; on failure the request is answered with 401.
pub async fn authenticate(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return unauthorized("missing bearer token");
    };
    if !auth.app.tokens.accepts(&token) {
        return unauthorized("token is not in the configured allow-list");
    }
    req.extensions_mut().insert(AuthenticatedPrincipal {
        token,
        scopes: auth.strategy.scopes(),
    });
    next.run(req).await
}

/// Extract the bearer token. A present `Authorization` header takes
/// precedence over the query parameter; a malformed header is a failure, not
/// a fallthrough.
fn bearer_token(req: &Request) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let token = value.to_str().ok()?.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            return None;
        }
        return Some(token.to_owned());
    }
    query_token(req.uri())
}

fn query_token(uri: &Uri) -> Option<String> {
    let params: Query<HashMap<String, String>> = Query::try_from_uri(uri).ok()?;
    params.0.get("access_token").filter(|t| !t.is_empty()).cloned()
}

fn unauthorized(message: &str) -> Response {
    let mut resp = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("unauthorized", message)),
    )
        .into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    resp
}

/// IP allow-list admission check.
///
/// A disabled graylist admits every request. The client address is the first
/// `X-Forwarded-For` hop when the fronting proxy is trusted, otherwise the
/// socket peer address; requests without a permitted address are answered
/// with 403 before authentication runs.
pub async fn ip_filter(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.graylist.enabled() {
        return next.run(req).await;
    }

    let client = client_ip(
        &req,
        peer.map(|ConnectInfo(addr)| addr.ip()),
        state.config.trust_proxy,
    );
    match client {
        Some(ip) if state.graylist.permits(ip) => next.run(req).await,
        _ => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(
                "forbidden",
                "address is not in the configured allow-list",
            )),
        )
            .into_response(),
    }
}

fn client_ip(req: &Request, peer: Option<IpAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(forwarded) = req.headers().get("x-forwarded-for") {
            let first = forwarded.to_str().ok()?.split(',').next()?.trim();
            return first.parse().ok();
        }
    }
    peer
}

/// Redirect insecure requests when running in production behind a proxy.
///
/// The scheme is taken from the first `X-Forwarded-Proto` value. GET and
/// HEAD requests are redirected permanently to the `https` origin; other
/// methods are refused.
pub async fn enforce_https(req: Request, next: Next) -> Response {
    if is_secure(&req) {
        return next.run(req).await;
    }

    let redirectable = *req.method() == Method::GET || *req.method() == Method::HEAD;
    if !redirectable {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("forbidden", "plain HTTP is not allowed")),
        )
            .into_response();
    }

    let Some(host) = req.headers().get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("bad_request", "missing Host header")),
        )
            .into_response();
    };

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    match HeaderValue::from_str(&format!("https://{host}{path}")) {
        Ok(location) => {
            let mut resp = StatusCode::MOVED_PERMANENTLY.into_response();
            resp.headers_mut().insert(header::LOCATION, location);
            resp
        }
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("bad_request", "invalid Host header")),
        )
            .into_response(),
    }
}

fn is_secure(req: &Request) -> bool {
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        == Some("https")
}

/// Outgoing response hook.
///
/// Development-mode server errors are rewritten to include the source
/// error's message, optional body and stack trace; the enriched response is
/// returned as-is. Every other response except a 401 gains
/// `Cache-Control: private`; 401 responses pass through untouched.
pub async fn postprocess(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let status = resp.status();

    if status.is_server_error() && state.config.node_env == Mode::Development {
        if let Some(details) = resp.extensions().get::<ErrorDetails>().cloned() {
            let payload = ErrorResponse {
                code: details.code,
                message: details.message,
                body: details.body,
                stack: details.stack,
            };
            return (status, Json(payload)).into_response();
        }
    }

    if status != StatusCode::UNAUTHORIZED {
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("private"));
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{Graylist, StrategyRegistry};
    use crate::config::Config;
    use crate::server::error::ApiError;
    use axum::{
        body::Body,
        http::Request as HttpRequest,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn state_with(config: Config) -> AppState {
        let graylist = Graylist::from_list(config.ip_graylist.as_deref()).unwrap();
        AppState::new(config, graylist, StrategyRegistry::default())
    }

    async fn ok() -> &'static str {
        "ok"
    }

    async fn whoami(Extension(p): Extension<AuthenticatedPrincipal>) -> Json<Vec<String>> {
        Json(p.scopes)
    }

    async fn failing() -> Result<(), ApiError> {
        Err(anyhow::anyhow!("boom").into())
    }

    async fn failing_with_body() -> Result<(), ApiError> {
        Err(ApiError::with_body(
            anyhow::anyhow!("boom"),
            serde_json::json!({"hint": "upstream"}),
        ))
    }

    async fn unauthorized_handler() -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn auth_router(config: Config, strategy: Strategy) -> Router {
        let auth = AuthState {
            app: state_with(config),
            strategy,
        };
        Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn_with_state(auth, authenticate))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // --- bearer token extraction -------------------------------------------

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = auth_router(Config::default(), Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn unrestricted_list_accepts_any_presented_token() {
        let app = auth_router(Config::default(), Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listed_token_is_accepted() {
        let config = Config {
            token_list: Some("abc,def".into()),
            ..Config::default()
        };
        let app = auth_router(config, Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unlisted_token_is_rejected() {
        let config = Config {
            token_list: Some("abc,def".into()),
            ..Config::default()
        };
        let app = auth_router(config, Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer xyz")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn query_parameter_token_is_accepted() {
        let config = Config {
            token_list: Some("abc".into()),
            ..Config::default()
        };
        let app = auth_router(config, Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami?access_token=abc")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn privileged_strategy_attaches_login_scopes() {
        let app = auth_router(Config::default(), Strategy::Session);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer t")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let scopes = body_json(resp).await;
        assert_eq!(scopes, serde_json::json!(["devops", "ledger", "QA"]));
    }

    #[tokio::test]
    async fn simple_strategy_attaches_no_scopes() {
        let app = auth_router(Config::default(), Strategy::Simple);
        let req = HttpRequest::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer t")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let scopes = body_json(resp).await;
        assert_eq!(scopes, serde_json::json!([]));
    }

    #[test]
    fn malformed_header_does_not_fall_through_to_query() {
        let req = HttpRequest::builder()
            .uri("/whoami?access_token=abc")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert!(bearer_token(&req).is_none());
    }

    // --- ip filter ---------------------------------------------------------

    fn ip_router(config: Config) -> Router {
        let state = state_with(config);
        Router::new()
            .route("/", get(ok))
            .layer(from_fn_with_state(state, ip_filter))
    }

    #[tokio::test]
    async fn disabled_graylist_admits_everything() {
        let app = ip_router(Config::default());
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_address_in_list_is_admitted() {
        let config = Config {
            ip_graylist: Some("1.2.3.4,10.0.0.0/8".into()),
            ..Config::default()
        };
        let app = ip_router(config);
        let req = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", "10.1.2.3, 192.0.2.1")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_address_outside_list_is_refused() {
        let config = Config {
            ip_graylist: Some("1.2.3.4".into()),
            ..Config::default()
        };
        let app = ip_router(config);
        let req = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", "8.8.8.8")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_address_is_refused_when_enabled() {
        let config = Config {
            ip_graylist: Some("1.2.3.4".into()),
            ..Config::default()
        };
        let app = ip_router(config);
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn untrusted_proxy_ignores_forwarded_header() {
        let config = Config {
            ip_graylist: Some("1.2.3.4".into()),
            trust_proxy: false,
            ..Config::default()
        };
        let app = ip_router(config);
        let req = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        // No socket peer address in oneshot tests, so the request is refused.
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    // --- https enforcement -------------------------------------------------

    fn https_router() -> Router {
        Router::new().route("/", get(ok)).layer(from_fn(enforce_https))
    }

    #[tokio::test]
    async fn forwarded_https_passes() {
        let app = https_router();
        let req = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn insecure_get_is_redirected() {
        let app = https_router();
        let req = HttpRequest::builder()
            .uri("/v1/principal?access_token=t")
            .header(header::HOST, "gateway.example.com")
            .header("x-forwarded-proto", "http")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://gateway.example.com/v1/principal?access_token=t"
        );
    }

    #[tokio::test]
    async fn insecure_post_is_refused() {
        let app = Router::new()
            .route("/", axum::routing::post(ok))
            .layer(from_fn(enforce_https));
        let req = HttpRequest::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::HOST, "gateway.example.com")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn insecure_get_without_host_is_a_bad_request() {
        let app = https_router();
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // --- response hook -----------------------------------------------------

    fn hook_router(mode: Mode) -> Router {
        let config = Config {
            node_env: mode,
            ..Config::default()
        };
        let state = state_with(config);
        Router::new()
            .route("/", get(ok))
            .route("/fail", get(failing))
            .route("/fail-body", get(failing_with_body))
            .route("/deny", get(unauthorized_handler))
            .layer(from_fn_with_state(state, postprocess))
    }

    #[tokio::test]
    async fn plain_response_gains_private_cache_control() {
        let app = hook_router(Mode::Other);
        let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "private");
    }

    #[tokio::test]
    async fn unauthorized_response_is_not_mutated() {
        let app = hook_router(Mode::Other);
        let req = HttpRequest::builder()
            .uri("/deny")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn development_500_is_enriched() {
        let app = hook_router(Mode::Development);
        let req = HttpRequest::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Enriched responses do not gain the cache header.
        assert!(resp.headers().get(header::CACHE_CONTROL).is_none());
        let payload = body_json(resp).await;
        assert_eq!(payload["message"], "boom");
        assert!(payload["stack"].is_string());
        assert!(payload.get("body").is_none());
    }

    #[tokio::test]
    async fn development_500_forwards_error_body() {
        let app = hook_router(Mode::Development);
        let req = HttpRequest::builder()
            .uri("/fail-body")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let payload = body_json(resp).await;
        assert_eq!(payload["message"], "boom");
        assert_eq!(payload["body"]["hint"], "upstream");
    }

    #[tokio::test]
    async fn production_500_stays_generic() {
        let app = hook_router(Mode::Production);
        let req = HttpRequest::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "private");
        let payload = body_json(resp).await;
        assert_eq!(payload["message"], "internal server error");
        assert!(payload.get("stack").is_none());
        assert!(payload.get("body").is_none());
    }
}
