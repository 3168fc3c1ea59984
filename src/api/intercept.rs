//! Network interception: replay watched requests and feed the correlation store.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::client::RefetchClient;
use crate::api::endpoints::{is_refetch, mark_refetch, EndpointFamily, EndpointMatcher};
use crate::api::types::{ApiDataEvent, InterceptedRequest};
use crate::error::{Error, Result};
use crate::store::SharedStore;

/// Observes outbound requests and refetches watched ones.
pub struct Interceptor {
    matcher: EndpointMatcher,
    client: RefetchClient,
    store: SharedStore,
    events: mpsc::UnboundedSender<ApiDataEvent>,
}

impl Interceptor {
    pub fn new(
        matcher: EndpointMatcher,
        client: RefetchClient,
        store: SharedStore,
        events: mpsc::UnboundedSender<ApiDataEvent>,
    ) -> Self {
        Self {
            matcher,
            client,
            store,
            events,
        }
    }

    /// Whether a request should be refetched, and under which family.
    pub fn should_refetch(&self, request: &InterceptedRequest) -> Option<EndpointFamily> {
        if is_refetch(&request.url) {
            return None;
        }
        match request.tab_id {
            Some(tab) if tab >= 0 => {}
            _ => return None,
        }
        self.matcher.classify(&request.url)
    }

    /// Handle a request in the background so the page's own request is never held up.
    pub fn observe(self: &Arc<Self>, request: InterceptedRequest) {
        if self.should_refetch(&request).is_none() {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.handle(request).await;
        });
    }

    /// Refetch, record and forward. Failures are logged and swallowed.
    pub async fn handle(&self, request: InterceptedRequest) -> Option<ApiDataEvent> {
        match self.refetch(&request).await {
            Ok(event) => {
                if self.events.send(event.clone()).is_err() {
                    tracing::debug!("Document side is gone, dropping apiData event");
                }
                Some(event)
            }
            Err(Error::UnwatchedEndpoint(_)) => None,
            Err(e) => {
                tracing::warn!("Interception refetch failed for {}: {}", request.url, e);
                None
            }
        }
    }

    async fn refetch(&self, request: &InterceptedRequest) -> Result<ApiDataEvent> {
        let family = self
            .should_refetch(request)
            .ok_or_else(|| Error::UnwatchedEndpoint(request.url.clone()))?;

        let url = mark_refetch(&request.url);
        let data = self.client.fetch_json(&url, &request.headers).await?;

        let summary = self.store.write().record_response(&request.url, &data);
        tracing::debug!(
            "Refetched {:?} endpoint: {} posts, {} fingerprints",
            family,
            summary.posts,
            summary.fingerprints
        );

        Ok(ApiDataEvent::new(
            data,
            family.is_for_dm(),
            self.client.replay_headers(&request.headers),
        ))
    }
}
