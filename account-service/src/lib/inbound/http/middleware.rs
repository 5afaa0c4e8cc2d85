use std::net::SocketAddr;
use std::sync::Arc;

use auth::Authenticator;
use auth::Principal;
use axum::async_trait;
use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::user::errors::UserError;
use crate::domain::user::ports::IdentityResolver;
use crate::inbound::http::handlers::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// Dependencies of the authentication pipeline.
#[derive(Clone)]
pub struct AuthenticationState {
    pub authenticator: Arc<Authenticator>,
    pub identity_resolver: Arc<dyn IdentityResolver>,
}

/// Identity attached to a request that presented a valid token.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub principal: Principal,
    /// Peer address, when the server records connection info
    pub remote_addr: Option<SocketAddr>,
}

/// Per-request identity context.
///
/// Inserted into the extensions of every request that passes the pipeline.
/// Empty means the request proceeds as anonymous.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext(Option<AuthenticatedIdentity>);

impl IdentityContext {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(identity: AuthenticatedIdentity) -> Self {
        Self(Some(identity))
    }

    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.0.as_ref()
    }
}

/// Middleware that resolves the bearer token into an identity context.
///
/// Never rejects: any failure leaves the context empty and the request
/// continues to the next stage exactly once. Handlers that need an identity
/// use the [`CurrentIdentity`] extractor.
pub async fn authenticate(
    State(state): State<AuthenticationState>,
    mut req: Request,
    next: Next,
) -> Response {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let header = req.headers().get(AUTHORIZATION).cloned();

    let principal = resolve_principal(
        &state.authenticator,
        state.identity_resolver.as_ref(),
        header.as_ref(),
    )
    .await;

    let context = match principal {
        Some(principal) => {
            tracing::debug!(
                user_id = principal.id,
                remote_addr = ?remote_addr,
                "Request authenticated"
            );
            IdentityContext::authenticated(AuthenticatedIdentity {
                principal,
                remote_addr,
            })
        }
        None => IdentityContext::anonymous(),
    };

    req.extensions_mut().insert(context);

    next.run(req).await
}

/// Resolve an `Authorization` header value into the current principal.
///
/// Returns `None` when the header is absent or not `Bearer <token>`, when the
/// token fails verification, or when the subject cannot be loaded. The
/// principal comes from the identity resolver, not from token claims.
pub async fn resolve_principal<R>(
    authenticator: &Authenticator,
    identity_resolver: &R,
    header: Option<&HeaderValue>,
) -> Option<Principal>
where
    R: IdentityResolver + ?Sized,
{
    let token = bearer_token(header)?;

    if !authenticator.verify_token(token) {
        tracing::debug!("Bearer token failed verification");
        return None;
    }

    let subject = match authenticator.extract_subject(token) {
        Ok(subject) => subject,
        Err(e) => {
            tracing::warn!(error = %e, "Verified token has no readable subject");
            return None;
        }
    };

    match identity_resolver.load_principal(&subject).await {
        Ok(principal) if principal.enabled => Some(principal),
        Ok(principal) => {
            tracing::debug!(user_id = principal.id, "Token presented for disabled user");
            None
        }
        Err(UserError::IdentityNotFound(_)) => {
            tracing::debug!("Token subject has no stored identity");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Identity resolution failed");
            None
        }
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&HeaderValue>) -> Option<&str> {
    let value = header?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Extractor for handlers that require an authenticated identity.
///
/// Rejects with 401 when the pipeline left the context empty.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub AuthenticatedIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .and_then(IdentityContext::identity)
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use auth::TokenCodec;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware;
    use axum::routing::get;
    use axum::Extension;
    use axum::Json;
    use axum::Router;
    use chrono::Duration;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use mockall::mock;
    use serde_json::json;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    mock! {
        pub Resolver {}

        #[async_trait]
        impl IdentityResolver for Resolver {
            async fn load_principal(&self, subject: &str) -> Result<Principal, UserError>;
        }
    }

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn authenticator() -> Arc<Authenticator> {
        let codec = TokenCodec::new(SECRET, Duration::hours(1)).expect("Failed to build codec");
        Arc::new(Authenticator::new(codec))
    }

    fn alice() -> Principal {
        Principal::new(7, "alice@example.com", "$argon2id$hash").with_roles(["USER"])
    }

    /// Router whose only handler reports the context it saw and counts calls.
    fn probe_router(
        authenticator: Arc<Authenticator>,
        resolver: MockResolver,
        hits: Arc<AtomicUsize>,
    ) -> Router {
        let state = AuthenticationState {
            authenticator,
            identity_resolver: Arc::new(resolver),
        };

        Router::new()
            .route(
                "/probe",
                get(move |Extension(context): Extension<IdentityContext>| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Json(match context.identity() {
                            Some(identity) => json!({
                                "subject": identity.principal.subject,
                                "roles": identity.principal.roles,
                                "remote_addr": identity.remote_addr.map(|a| a.to_string()),
                            }),
                            None => Value::Null,
                        })
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(state, authenticate))
    }

    async fn probe(router: Router, authorization: Option<HeaderValue>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri("/probe");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let request = request
            .extension(ConnectInfo(SocketAddr::from(([192, 168, 1, 1], 4000))))
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn untouched_resolver() -> MockResolver {
        let mut resolver = MockResolver::new();
        resolver.expect_load_principal().times(0);
        resolver
    }

    #[test]
    fn test_bearer_token_shapes() {
        let value = |s: &'static str| HeaderValue::from_static(s);

        assert_eq!(bearer_token(None), None);
        assert_eq!(bearer_token(Some(&value(""))), None);
        assert_eq!(bearer_token(Some(&value("Bearer"))), None);
        assert_eq!(bearer_token(Some(&value("Bearer "))), None);
        assert_eq!(bearer_token(Some(&value("Bearer    "))), None);
        assert_eq!(bearer_token(Some(&value("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(Some(&value("bearer abc"))), None);
        assert_eq!(bearer_token(Some(&value("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some(&value("Bearer  abc "))), Some("abc"));

        let opaque = HeaderValue::from_bytes(b"Bearer \xfa\xfb").unwrap();
        assert_eq!(bearer_token(Some(&opaque)), None);
    }

    #[tokio::test]
    async fn test_missing_header_proceeds_anonymously() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator(), untouched_resolver(), Arc::clone(&hits));

        let (status, body) = probe(router, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_headers_proceed_anonymously() {
        for header in ["", "Basic base64encodedcredentials", "Bearer ", "Bearer"] {
            let hits = Arc::new(AtomicUsize::new(0));
            let router = probe_router(authenticator(), untouched_resolver(), Arc::clone(&hits));

            let (status, body) = probe(router, Some(HeaderValue::from_static(header))).await;

            assert_eq!(status, StatusCode::OK, "header {:?}", header);
            assert_eq!(body, Value::Null, "header {:?}", header);
            assert_eq!(hits.load(Ordering::SeqCst), 1, "header {:?}", header);
        }
    }

    #[tokio::test]
    async fn test_invalid_token_proceeds_anonymously() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator(), untouched_resolver(), Arc::clone(&hits));

        let header = HeaderValue::from_static("Bearer invalid.jwt.token");
        let (status, body) = probe(router, Some(header)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_proceeds_anonymously() {
        let authenticator = authenticator();
        let token = authenticator
            .token_codec()
            .issue_at(&alice(), Utc::now() - Duration::hours(2))
            .unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator, untouched_resolver(), Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        let (_, body) = probe(router, Some(header)).await;

        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_proceeds_anonymously() {
        let foreign = TokenCodec::new(b"another_secret_key_at_least_32_bytes", Duration::hours(1))
            .unwrap()
            .issue(&alice())
            .unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator(), untouched_resolver(), Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", foreign)).unwrap();
        let (_, body) = probe(router, Some(header)).await;

        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_subject_proceeds_anonymously() {
        let authenticator = authenticator();
        let token = authenticator.issue_token(&alice()).unwrap();

        let mut resolver = MockResolver::new();
        resolver
            .expect_load_principal()
            .withf(|subject| subject == "alice@example.com")
            .times(1)
            .returning(|subject| Err(UserError::IdentityNotFound(subject.to_string())));

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator, resolver, Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        let (_, body) = probe(router, Some(header)).await;

        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolver_failure_proceeds_anonymously() {
        let authenticator = authenticator();
        let token = authenticator.issue_token(&alice()).unwrap();

        let mut resolver = MockResolver::new();
        resolver
            .expect_load_principal()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("connection refused".to_string())));

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator, resolver, Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        let (status, body) = probe(router, Some(header)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_identity_proceeds_anonymously() {
        let authenticator = authenticator();
        let token = authenticator.issue_token(&alice()).unwrap();

        let mut resolver = MockResolver::new();
        resolver
            .expect_load_principal()
            .times(1)
            .returning(|_| Ok(alice().with_enabled(false)));

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator, resolver, Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        let (_, body) = probe(router, Some(header)).await;

        assert_eq!(body, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_valid_token_populates_context_from_store() {
        let authenticator = authenticator();
        // Token was issued while alice only had USER
        let token = authenticator.issue_token(&alice()).unwrap();

        let mut resolver = MockResolver::new();
        resolver
            .expect_load_principal()
            .withf(|subject| subject == "alice@example.com")
            .times(1)
            .returning(|_| Ok(alice().with_roles(["ADMIN"])));

        let hits = Arc::new(AtomicUsize::new(0));
        let router = probe_router(authenticator, resolver, Arc::clone(&hits));

        let header = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        let (status, body) = probe(router, Some(header)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "alice@example.com");
        assert_eq!(body["roles"], json!(["ADMIN"]));
        assert_eq!(body["remote_addr"], "192.168.1.1:4000");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_current_identity_rejects_anonymous() {
        let mut parts = Request::builder()
            .uri("/")
            .extension(IdentityContext::anonymous())
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = CurrentIdentity::from_request_parts(&mut parts, &()).await;
        assert_eq!(
            result.unwrap_err(),
            ApiError::Unauthorized("Authentication required".to_string())
        );
    }

    #[tokio::test]
    async fn test_current_identity_reads_context() {
        let mut parts = Request::builder()
            .uri("/")
            .extension(IdentityContext::authenticated(AuthenticatedIdentity {
                principal: alice(),
                remote_addr: None,
            }))
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let CurrentIdentity(identity) = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.principal, alice());
    }
}
