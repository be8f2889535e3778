//! Session middleware and extractors
//!
//! Every request under the middleware gets a session: the signed cookie
//! is verified and resolved against the store, or a fresh anonymous
//! session is created. Handlers reach it through the extractors.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::identity::Identity;
use super::session::{
    SESSION_COOKIE, Session, SessionId, SessionStore as _, sign_session_id, verify_session_token,
};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;

/// The request's session, as loaded by the middleware
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub session: Session,
}

/// Middleware that attaches a session to every request
///
/// A cookie with a bad signature, or one pointing at an expired record,
/// is treated as absent. When a session is created, the signed cookie is
/// set on the response.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/profile", ...)
///     .layer(middleware::from_fn_with_state(state, session_context));
/// ```
pub async fn session_context(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = &state.config.auth.session_secret;
    let verified = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| verify_session_token(cookie.value(), secret).ok());

    let (id, session, fresh) = match verified {
        Some(id) => match state.sessions.get(&id).await? {
            Some(session) => (id, session, false),
            None => {
                // Cookie points at an expired or vanished record.
                state.sessions.delete(&id).await?;
                create_session(&state).await?
            }
        },
        None => create_session(&state).await?,
    };

    request.extensions_mut().insert(SessionContext {
        id: id.clone(),
        session,
    });

    let mut response = next.run(request).await;

    if fresh {
        let token = sign_session_id(&id, secret)?;
        let cookie = session_cookie(token, &state.config);
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("session cookie not header-safe: {e}")))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

async fn create_session(state: &AppState) -> Result<(SessionId, Session, bool), AppError> {
    let id = SessionId::generate();
    let session = Session::anonymous(state.config.session_ttl());
    state.sessions.set(&id, session.clone()).await?;
    tracing::debug!(session_id = %id, "Created anonymous session");
    Ok((id, session, true))
}

fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(config.should_use_secure_cookies());
    cookie
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("session middleware not installed"))
            })
    }
}

/// Extractor for the current authenticated user
///
/// Rejects with `NotAuthenticated` (a redirect to `/`) unless the
/// session is authenticated with an identity attached.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", identity.display_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::NotAuthenticated)?;

        let state = AppState::from_ref(state);
        let identity = state.gate.require_auth(&ctx.id).await?;
        Ok(CurrentUser(identity))
    }
}
