//! HTTP front end.
//!
//! | Route         | Method     | Handler                        |
//! |---------------|------------|--------------------------------|
//! | `/`           | GET        | registration form              |
//! | `/submit`     | POST       | [`submit::submit`]             |
//! | `/users`      | GET / POST | login form / registrant table  |
//! | `/health`     | GET        | liveness probe                 |

pub mod pages;
pub mod submit;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{EventConfig, ListingCredentials};
use crate::error::{Error, Result, UniqueField};
use crate::mail::Notifier;
use crate::storage::SharedStorage;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: SharedStorage,
    notifier: Arc<dyn Notifier>,
    event: Arc<EventConfig>,
    listing: Arc<ListingCredentials>,
}

impl AppState {
    /// Assemble the application state.
    #[must_use]
    pub fn new(
        storage: SharedStorage,
        notifier: Arc<dyn Notifier>,
        event: EventConfig,
        listing: ListingCredentials,
    ) -> Self {
        Self {
            storage,
            notifier,
            event: Arc::new(event),
            listing: Arc::new(listing),
        }
    }

    /// The registrant store.
    #[must_use]
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/submit", post(submit::submit))
        .route("/users", get(users::login_form).post(users::list))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(pages::FORM_PAGE)
}

async fn health() -> &'static str {
    "OK"
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Duplicate {
                field: UniqueField::Email,
                value,
            } => (
                StatusCode::CONFLICT,
                format!(
                    "Email address {value} already found in database! Please re-enter the form correctly!"
                ),
            )
                .into_response(),
            Self::Duplicate {
                field: UniqueField::Phone,
                value,
            } => (
                StatusCode::CONFLICT,
                format!(
                    "Phone number {value} already found in database! Please re-enter the form correctly!"
                ),
            )
                .into_response(),
            Self::StorageConflict { message } => {
                error!("Registration rejected by the database: {message}");
                (
                    StatusCode::CONFLICT,
                    "Error occurred trying to enter values into the database!",
                )
                    .into_response()
            }
            Self::UnknownDepartment(code) => (
                StatusCode::BAD_REQUEST,
                format!("Unknown department: {code}"),
            )
                .into_response(),
            Self::InvalidPhone(raw) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid phone number: {raw}"),
            )
                .into_response(),
            other => {
                error!("Request failed: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
