//! HTML pages
//!
//! Two pages: the public home page with the login link, and the
//! protected profile page.

use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::CurrentUser;

/// Create pages router
///
/// Routes:
/// - GET / - Home page with login link
/// - GET /profile - Profile page (requires authentication)
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home_page))
        .route("/profile", get(profile_page))
}

/// GET /
///
/// Renders the home page with a Google sign-in link.
async fn home_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>AuthGate</title></head>
        <body>
            <h1>Welcome to AuthGate</h1>
            <p><a href="/auth/google">Login with Google</a></p>
        </body>
        </html>
    "#,
    )
}

/// GET /profile
///
/// Greets the logged-in user by display name. Anonymous requests are
/// redirected to `/` by the `CurrentUser` rejection.
async fn profile_page(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    let name = html_escape::encode_text(&identity.display_name);
    let avatar = identity
        .picture
        .as_deref()
        .map(|url| {
            format!(
                r#"<p><img src="{}" alt="avatar" width="48" height="48"></p>"#,
                html_escape::encode_double_quoted_attribute(url)
            )
        })
        .unwrap_or_default();

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Profile - AuthGate</title></head>
        <body>
            <h1>Hello {name}!</h1>
            {avatar}
            <p><a href="/logout">Logout</a></p>
        </body>
        </html>
    "#
    ))
}
