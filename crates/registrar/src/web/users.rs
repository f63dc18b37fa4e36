//! `/users`: password-gated registrant listing.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use super::{pages, AppState};
use crate::config::ListingCredentials;
use crate::error::Result;

/// Credentials posted by the login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Submitted username.
    pub username: String,
    /// Submitted password.
    pub password: String,
}

/// Why a login attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    /// The username did not match.
    InvalidUser,
    /// The username matched but the password did not.
    InvalidPassword,
}

impl LoginRejection {
    /// Message shown to the client.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidUser => "Invalid user!",
            Self::InvalidPassword => "Invalid password!",
        }
    }
}

impl IntoResponse for LoginRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.message()).into_response()
    }
}

/// Check submitted credentials. The username is checked first.
///
/// # Errors
///
/// Returns which of the two fields was wrong.
pub fn authenticate(
    expected: &ListingCredentials,
    username: &str,
    password: &str,
) -> std::result::Result<(), LoginRejection> {
    if username != expected.username {
        return Err(LoginRejection::InvalidUser);
    }
    if password != expected.password {
        return Err(LoginRejection::InvalidPassword);
    }
    Ok(())
}

/// `GET /users`
pub async fn login_form() -> Html<&'static str> {
    Html(pages::LOGIN_FORM)
}

/// `POST /users`
///
/// # Errors
///
/// Returns an error if the registrants cannot be read.
pub async fn list(State(state): State<AppState>, Form(login): Form<LoginForm>) -> Result<Response> {
    if let Err(rejection) = authenticate(&state.listing, &login.username, &login.password) {
        warn!(username = %login.username, "Listing login rejected: {}", rejection.message());
        return Ok(rejection.into_response());
    }

    let registrants = state.storage.run(|s| s.list_all()).await?;
    info!(count = registrants.len(), "Listing registrants");
    Ok(Html(pages::registrants_table(&registrants)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{
        body_text, form_request, get_request, test_app, TEST_PASSWORD, TEST_USERNAME,
    };
    use tower::ServiceExt;

    const ANN: &str = "name=Ann&email=ann%40x.com&phone_number=1234567890&department=cse";
    const BOB: &str = "name=Bob&email=bob%40x.com&phone_number=42&department=civil";

    fn credentials() -> ListingCredentials {
        ListingCredentials {
            username: "admin".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_authenticate() {
        let expected = credentials();
        assert_eq!(authenticate(&expected, "admin", "pw"), Ok(()));
        assert_eq!(
            authenticate(&expected, "root", "pw"),
            Err(LoginRejection::InvalidUser)
        );
        assert_eq!(
            authenticate(&expected, "admin", "nope"),
            Err(LoginRejection::InvalidPassword)
        );
        // Username wins when both are wrong.
        assert_eq!(
            authenticate(&expected, "root", "nope"),
            Err(LoginRejection::InvalidUser)
        );
    }

    #[test]
    fn test_authenticate_is_case_sensitive() {
        assert_eq!(
            authenticate(&credentials(), "Admin", "pw"),
            Err(LoginRejection::InvalidUser)
        );
    }

    #[tokio::test]
    async fn test_get_users_shows_login_form() {
        let (app, _, _) = test_app();
        let response = app.oneshot(get_request("/users")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("name=username"));
        assert!(body.contains("type=password"));
    }

    #[tokio::test]
    async fn test_list_requires_valid_user() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(form_request("/users", "username=mallory&password=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Invalid user!");
    }

    #[tokio::test]
    async fn test_list_requires_valid_password() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(form_request(
                "/users",
                &format!("username={TEST_USERNAME}&password=wrong"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Invalid password!");
    }

    #[tokio::test]
    async fn test_list_shows_registrants_in_order() {
        let (app, _, _) = test_app();
        app.clone().oneshot(form_request("/submit", ANN)).await.unwrap();
        app.clone().oneshot(form_request("/submit", BOB)).await.unwrap();

        let response = app
            .oneshot(form_request(
                "/users",
                &format!("username={TEST_USERNAME}&password={TEST_PASSWORD}"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Registrants (2)"));
        let ann = body.find("ann@x.com").unwrap();
        let bob = body.find("bob@x.com").unwrap();
        assert!(ann < bob);
        assert!(body.contains("Civil Engineering"));
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(form_request(
                "/users",
                &format!("username={TEST_USERNAME}&password={TEST_PASSWORD}"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Registrants (0)"));
    }
}
