//! Anonymized analytics pageview, sent when analytics cookies are declined.

use super::registry::AlternativeHandler;
use crate::base::consenterror::ConsentError;
use crate::base::random::generate_client_id;
use crate::page::PageContext;
use crate::tracking::{BeaconRequest, BeaconTransport};
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded;
use url::Url;

/// Handler name used in alternative bindings.
pub const ANALYTICS_HANDLER: &str = "ga";

/// Measurement protocol collection endpoint.
pub const ANALYTICS_ENDPOINT: &str = "https://www.google-analytics.com/debug/collect";

/// Sends one anonymous pageview per invocation.
///
/// Arguments: `[tracking_id]`. The client id is generated per hit and
/// never derived from the visitor id.
pub struct AnalyticsPageview {
    transport: Arc<dyn BeaconTransport>,
    page: PageContext,
    endpoint: Url,
}

impl AnalyticsPageview {
    pub fn new(transport: Arc<dyn BeaconTransport>, page: PageContext) -> Result<Self, ConsentError> {
        Ok(Self {
            transport,
            page,
            endpoint: Url::parse(ANALYTICS_ENDPOINT)?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Form body of a pageview hit with IP anonymization on.
    pub fn pageview_body(&self, tracking_id: &str, client_id: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("v", "1")
            .append_pair("t", "pageview")
            .append_pair("uid", client_id)
            .append_pair("tid", tracking_id)
            .append_pair("dp", &self.page.path_and_query())
            .append_pair("dh", self.page.host())
            .append_pair("ua", self.page.user_agent())
            .append_pair("aip", "1")
            .finish()
    }

    fn tracking_id(arguments: &[Value]) -> Result<&str, ConsentError> {
        arguments
            .first()
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConsentError::invalid_arguments(ANALYTICS_HANDLER, "expected a tracking id"))
    }
}

impl AlternativeHandler for AnalyticsPageview {
    fn invoke(&self, arguments: &[Value]) -> Result<(), ConsentError> {
        let tracking_id = Self::tracking_id(arguments)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConsentError::NoRuntime)?;

        let body = self.pageview_body(tracking_id, &generate_client_id());
        let sending = self
            .transport
            .send(BeaconRequest::post_form(self.endpoint.clone(), body));

        runtime.spawn(async move {
            match sending.await {
                Ok(response) => tracing::debug!(status = %response.status, "anonymous pageview sent"),
                Err(e) => tracing::warn!(error = %e, "anonymous pageview failed"),
            }
        });

        Ok(())
    }
}

impl std::fmt::Debug for AnalyticsPageview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsPageview")
            .field("page", &self.page)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{BeaconResponse, Sending};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        requests: Mutex<Vec<BeaconRequest>>,
    }

    impl BeaconTransport for Capture {
        fn send(&self, request: BeaconRequest) -> Sending {
            self.requests.lock().unwrap().push(request);
            Box::pin(async { Ok(BeaconResponse::new(http::StatusCode::OK)) })
        }
    }

    fn page() -> PageContext {
        PageContext::parse("https://shop.example/products?page=2")
            .unwrap()
            .with_user_agent("Mozilla/5.0 (X11)")
    }

    #[test]
    fn test_pageview_body() {
        let handler = AnalyticsPageview::new(Arc::new(Capture::default()), page()).unwrap();
        let body = handler.pageview_body("UA-1-1", "abcd0123456789ab");

        let pairs: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes()).into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert_eq!(get("t"), Some("pageview"));
        assert_eq!(get("tid"), Some("UA-1-1"));
        assert_eq!(get("uid"), Some("abcd0123456789ab"));
        assert_eq!(get("dp"), Some("/products?page=2"));
        assert_eq!(get("dh"), Some("shop.example"));
        assert_eq!(get("ua"), Some("Mozilla/5.0 (X11)"));
        assert_eq!(get("aip"), Some("1"));
    }

    #[tokio::test]
    async fn test_invoke_posts_form() {
        let capture = Arc::new(Capture::default());
        let handler = AnalyticsPageview::new(capture.clone(), page()).unwrap();

        handler.invoke(&[json!("UA-1-1")]).unwrap();

        let requests = capture.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method(), http::Method::POST);
        assert_eq!(requests[0].url().as_str(), ANALYTICS_ENDPOINT);
    }

    #[test]
    fn test_invalid_arguments() {
        let handler = AnalyticsPageview::new(Arc::new(Capture::default()), page()).unwrap();
        let err = handler.invoke(&[json!(42)]).unwrap_err();
        assert!(matches!(err, ConsentError::InvalidHandlerArguments { .. }));
    }

    #[test]
    fn test_requires_runtime() {
        let handler = AnalyticsPageview::new(Arc::new(Capture::default()), page()).unwrap();
        assert_eq!(handler.invoke(&[json!("UA-1-1")]).unwrap_err(), ConsentError::NoRuntime);
    }
}
