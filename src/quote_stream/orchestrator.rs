use async_trait::async_trait;
use quote_types::{QuoteRequest, QuoteResult};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{log_error, QuoteError, Result};
use crate::quote_stream::regions::{endpoint_host, resolve_candidates};
use crate::quote_stream::session::{SessionOptions, SessionTransport};

/// One attempt against one candidate endpoint.
#[async_trait]
pub trait QuoteAttempt: Send + Sync {
    async fn attempt(&self, endpoint: &str, request: &QuoteRequest) -> Result<QuoteResult>;
}

/// Attempts over a real WebSocket session.
#[derive(Debug, Clone)]
pub struct WebSocketAttempt {
    options: SessionOptions,
}

impl WebSocketAttempt {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl QuoteAttempt for WebSocketAttempt {
    async fn attempt(&self, endpoint: &str, request: &QuoteRequest) -> Result<QuoteResult> {
        SessionTransport::new(endpoint, request, &self.options)
            .run()
            .await
    }
}

/// Entry point for quote fetching. Tries candidates strictly one after the
/// other and returns the first success.
pub struct QuoteClient<A = WebSocketAttempt> {
    settings: Settings,
    attempt: A,
}

impl QuoteClient<WebSocketAttempt> {
    pub fn new(settings: Settings) -> Self {
        let attempt = WebSocketAttempt::new(SessionOptions::from_settings(&settings));
        Self { settings, attempt }
    }
}

impl<A: QuoteAttempt> QuoteClient<A> {
    pub fn with_attempt(settings: Settings, attempt: A) -> Self {
        Self { settings, attempt }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Candidate endpoints for the configured template and regions.
    pub fn candidates(&self) -> Result<Vec<String>> {
        resolve_candidates(
            &self.settings.ws_url,
            &self.settings.preferred_regions,
            self.settings.token.as_deref(),
        )
    }

    /// Resolves candidates from settings and fetches the best quote.
    pub async fn fetch_best_quote(&self, request: &QuoteRequest) -> Result<QuoteResult> {
        let candidates = self.candidates()?;
        debug!(candidates = candidates.len(), "Resolved candidate endpoints");
        self.fetch_from_candidates(&candidates, request).await
    }

    /// Tries each endpoint in order. Fails with the last attempt's error when
    /// every candidate fails, or with [`QuoteError::Unavailable`] when there
    /// is nothing to try.
    pub async fn fetch_from_candidates(
        &self,
        candidates: &[String],
        request: &QuoteRequest,
    ) -> Result<QuoteResult> {
        let mut last_error: Option<QuoteError> = None;

        for (index, endpoint) in candidates.iter().enumerate() {
            let host = endpoint_host(endpoint);
            debug!(attempt = index + 1, host = %host, "Starting quote attempt");

            match self.attempt.attempt(endpoint, request).await {
                Ok(result) => {
                    info!(attempt = index + 1, host = %host, "Quote attempt succeeded");
                    return Ok(result);
                }
                Err(e) => {
                    log_error(&e, &format!("Quote attempt {} against {}", index + 1, host));
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(QuoteError::Exhausted {
                attempts: candidates.len(),
                last: Box::new(last),
            }),
            None => Err(QuoteError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quote_types::QuoteStatus;
    use std::sync::Mutex;

    /// Scripted attempts keyed by endpoint; records call order.
    struct ScriptedAttempt {
        succeed_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAttempt {
        fn new(succeed_on: Option<&'static str>) -> Self {
            Self {
                succeed_on,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn result_for(endpoint: &str) -> QuoteResult {
        QuoteResult {
            status: QuoteStatus::QuoteOnly,
            executable: false,
            simulated: true,
            updated_at: Utc::now(),
            in_mint: "in".to_string(),
            out_mint: "out".to_string(),
            amount_in: "1".to_string(),
            in_amount: "1".to_string(),
            amount_out: "2".to_string(),
            price_impact_bps: 0,
            routers: vec![endpoint.to_string()],
            provider: endpoint.to_string(),
            route_id: "r".to_string(),
            transaction_base64: None,
            instructions: Vec::new(),
            address_lookup_tables: Vec::new(),
            compute_units: None,
            compute_units_safe: None,
        }
    }

    #[async_trait]
    impl QuoteAttempt for ScriptedAttempt {
        async fn attempt(&self, endpoint: &str, _request: &QuoteRequest) -> Result<QuoteResult> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            if Some(endpoint) == self.succeed_on {
                Ok(result_for(endpoint))
            } else {
                Err(QuoteError::transport(format!("{} refused", endpoint)))
            }
        }
    }

    fn request() -> QuoteRequest {
        QuoteRequest::new("in", "out", "1", 50, "user")
    }

    fn endpoints(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| e.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failover_returns_second_success() {
        let client = QuoteClient::with_attempt(Settings::default(), ScriptedAttempt::new(Some("b")));

        let result = client
            .fetch_from_candidates(&endpoints(&["a", "b", "c"]), &request())
            .await
            .unwrap();

        assert_eq!(result.provider, "b");
        assert_eq!(client.attempt.calls(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let client = QuoteClient::with_attempt(Settings::default(), ScriptedAttempt::new(None));

        let err = client
            .fetch_from_candidates(&endpoints(&["a", "b"]), &request())
            .await
            .unwrap_err();

        assert!(matches!(err, QuoteError::Exhausted { attempts: 2, .. }));
        assert!(err.to_string().contains("b refused"));
        assert_eq!(client.attempt.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_no_candidates_is_unavailable() {
        let client = QuoteClient::with_attempt(Settings::default(), ScriptedAttempt::new(None));

        let err = client.fetch_from_candidates(&[], &request()).await.unwrap_err();
        assert!(matches!(err, QuoteError::Unavailable));
    }

    #[tokio::test]
    async fn test_fetch_best_quote_uses_resolved_candidates() {
        let settings = Settings::default()
            .with_ws_url("wss://{region}.api.titan.ag/api/v1/ws")
            .with_regions(["us1", "jp1"]);
        let client = QuoteClient::with_attempt(
            settings,
            ScriptedAttempt::new(Some("wss://jp1.api.titan.ag/api/v1/ws")),
        );

        let result = client.fetch_best_quote(&request()).await.unwrap();
        assert_eq!(result.provider, "wss://jp1.api.titan.ag/api/v1/ws");
        assert_eq!(
            client.attempt.calls(),
            vec![
                "wss://us1.api.titan.ag/api/v1/ws".to_string(),
                "wss://jp1.api.titan.ag/api/v1/ws".to_string(),
            ]
        );
    }
}
