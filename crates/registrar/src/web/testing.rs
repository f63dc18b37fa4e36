//! Fixtures for handler tests.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};

use super::{router, AppState};
use crate::config::{EventConfig, ListingCredentials};
use crate::error::{Error, Result};
use crate::mail::{Delivery, Notifier, OutgoingMail};
use crate::storage::{SharedStorage, Storage};

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "hunter2";

/// Records every mail instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery> {
        if self.fail {
            return Err(Error::MailRejected {
                status: 401,
                body: "invalid api key".to_string(),
            });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(Delivery {
            status: 202,
            message_id: Some("test-message".to_string()),
        })
    }
}

pub fn test_app() -> (Router, SharedStorage, Arc<RecordingNotifier>) {
    test_app_with(RecordingNotifier::default())
}

pub fn test_app_with(notifier: RecordingNotifier) -> (Router, SharedStorage, Arc<RecordingNotifier>) {
    let storage = SharedStorage::new(Storage::open_in_memory().unwrap());
    let notifier = Arc::new(notifier);
    let state = AppState::new(
        storage.clone(),
        notifier.clone(),
        EventConfig::default(),
        ListingCredentials {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
    );
    (router(state), storage, notifier)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
