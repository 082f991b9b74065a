//! Beacon requests and the transport abstraction.

use crate::base::consenterror::ConsentError;
use crate::consent::consentmap::ConsentMap;
use crate::consent::store::VisitorId;
use bytes::Bytes;
use http::{Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

/// Path of the consent logging endpoint, relative to the page origin.
pub const DEFAULT_TRACKING_PATH: &str = "/cookieconsent";

/// Content type of form-encoded beacon bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An outbound fire-and-forget request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconRequest {
    method: Method,
    url: Url,
    body: Bytes,
    content_type: Option<&'static str>,
}

impl BeaconRequest {
    /// `GET` without a body.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: Bytes::new(),
            content_type: None,
        }
    }

    /// `POST` with a form-encoded body.
    pub fn post_form(url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            url,
            body: body.into(),
            content_type: Some(FORM_CONTENT_TYPE),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    /// Origin-form request target (`path?query`).
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// What came back. Only the status is kept; payloads are never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconResponse {
    pub status: StatusCode,
}

impl BeaconResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }
}

/// Alias for the `Future` returned by a beacon transport.
pub type Sending = Pin<Box<dyn Future<Output = Result<BeaconResponse, ConsentError>> + Send>>;

/// Sends beacon requests.
///
/// Completion means a response was received, whatever its status.
/// Implementations must be thread-safe.
pub trait BeaconTransport: Send + Sync {
    fn send(&self, request: BeaconRequest) -> Sending;
}

impl<T> BeaconTransport for Arc<T>
where
    T: BeaconTransport + ?Sized,
{
    fn send(&self, request: BeaconRequest) -> Sending {
        (**self).send(request)
    }
}

/// Build the consent logging URL: `endpoint?uuid=<visitor>&consent=<json>`.
///
/// Existing query pairs on `endpoint` are kept.
pub fn consent_beacon_url(endpoint: &Url, visitor: &VisitorId, consents: &ConsentMap) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("uuid", visitor.as_str())
        .append_pair("consent", &consents.to_json());
    url
}
