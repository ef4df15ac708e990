use crate::error::DataError;
use std::sync::Arc;
use std::time::Duration;
use vantora_integration::clock::EngineClock;
use vantora_integration::protocol::http::{
    BuildStrategy, BybitHttpParser, HttpParser, Method, PublicBuilder, RestRequest, SignedBuilder,
};
use vantora_integration::rate_limit::{Priority, QuotaStatus, RateLimiter};
use vantora_integration::signer::Signer;
use vantora_integration::snapshot::Snapshot;

const MAX_RETRIES: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// `getQuota()` projection: the latest rate-limit headers observed, plus the derived
/// utilisation percentage used to decide whether to emit `QuotaWarning`.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub remaining: u32,
    pub limit: u32,
    pub utilization_pct: f64,
}

impl From<QuotaStatus> for Quota {
    fn from(status: QuotaStatus) -> Self {
        let utilization_pct = if status.limit == 0 {
            0.0
        } else {
            100.0 * (1.0 - status.remaining as f64 / status.limit as f64)
        };
        Quota { remaining: status.remaining, limit: status.limit, utilization_pct }
    }
}

/// Signed/public REST client used for order operations and account queries, built once per
/// configured environment and shared across every caller so they all draw on the same
/// [`RateLimiter`] budget.
pub struct RestClient<S, C> {
    http: reqwest::Client,
    base_url: String,
    signer: S,
    clock: Arc<C>,
    limiter: Arc<RateLimiter<C>>,
    recv_window_ms: u64,
    quota: Snapshot<Quota>,
}

impl<S: Signer, C: EngineClock> RestClient<S, C> {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        signer: S,
        clock: Arc<C>,
        limiter: Arc<RateLimiter<C>>,
        recv_window_ms: u64,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            signer,
            clock,
            limiter,
            recv_window_ms,
            quota: Snapshot::new(Quota { remaining: u32::MAX, limit: u32::MAX, utilization_pct: 0.0 }),
        }
    }

    pub fn quota(&self) -> Quota {
        *self.quota.get()
    }

    pub async fn execute<R: RestRequest>(&self, request: R, priority: Priority) -> Result<R::Response, DataError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.limiter.enqueue(priority);
            let result = self.execute_once(&request).await;
            self.limiter.dequeue();

            match result {
                Ok(response) => return Ok(response),
                Err(error) if error.retryable() && attempt <= MAX_RETRIES => {
                    self.limiter.record_failure();
                    let delay = backoff_delay(attempt, rand::random::<f64>());
                    tracing::warn!(attempt, ?delay, %error, "retrying rate-limited/transient REST request");
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn execute_once<R: RestRequest>(&self, request: &R) -> Result<R::Response, DataError> {
        let timestamp_ms = self.clock.now().timestamp_millis();
        let url = format!("{}{}", self.base_url, request.path());

        let query = request
            .query_params()
            .map(serde_urlencoded::to_string)
            .transpose()
            .map_err(vantora_integration::SocketError::from)?
            .unwrap_or_default();

        let body_json = request
            .body()
            .map(serde_json::to_string)
            .transpose()
            .map_err(vantora_integration::SocketError::from)?;

        let payload = match request.method() {
            Method::Get | Method::Delete => query.clone(),
            Method::Post => body_json.clone().unwrap_or_default(),
        };

        let headers = if request.requires_auth() {
            SignedBuilder { signer: &self.signer }.build_headers(timestamp_ms, self.recv_window_ms, &payload)
        } else {
            PublicBuilder.build_headers(timestamp_ms, self.recv_window_ms, &payload)
        };

        let full_url = if !query.is_empty() && matches!(request.method(), Method::Get | Method::Delete) {
            format!("{url}?{query}")
        } else {
            url
        };

        let mut builder = self
            .http
            .request(request.method().as_reqwest(), &full_url)
            .timeout(Duration::from_secs(10));

        if let Some(body) = &body_json {
            builder = builder.body(body.clone()).header("Content-Type", "application/json");
        }
        builder = builder.header("X-BAPI-SIGN-TYPE", "2");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(vantora_integration::SocketError::from)?;
        self.record_quota_headers(response.headers());

        let bytes = response.bytes().await.map_err(vantora_integration::SocketError::from)?;
        BybitHttpParser::parse(&bytes).map_err(DataError::from)
    }

    fn record_quota_headers(&self, headers: &reqwest::header::HeaderMap) {
        let remaining = headers
            .get("X-Bapi-Limit-Status")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());
        let limit = headers
            .get("X-Bapi-Limit")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        if let (Some(remaining), Some(limit)) = (remaining, limit) {
            let status = QuotaStatus { remaining, limit };
            self.limiter.observe(status);
            self.quota.set(status.into());
        }
    }
}

/// Exponential backoff with up to 20% jitter, mirroring
/// [`vantora_integration::protocol::websocket::ReconnectPolicy::delay_for`] so a shared
/// network blip doesn't retry every in-flight request in lockstep.
fn backoff_delay(attempt: u32, jitter_fraction: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let scaled = BACKOFF_BASE.as_millis().saturating_mul(1u128 << exponent);
    let capped = scaled.min(BACKOFF_CAP.as_millis());

    let jitter_fraction = jitter_fraction.clamp(0.0, 1.0);
    let jittered = (capped as f64 * (1.0 + (jitter_fraction - 0.5) * 0.4)) as u64;

    Duration::from_millis(jittered.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_utilization_is_derived_from_remaining_over_limit() {
        let quota: Quota = QuotaStatus { remaining: 30, limit: 100 }.into();
        assert!((quota.utilization_pct - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn backoff_delay_doubles_up_to_cap_at_zero_jitter() {
        assert_eq!(backoff_delay(1, 0.5), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, 0.5), Duration::from_millis(1000));
        assert_eq!(backoff_delay(10, 0.5), BACKOFF_CAP);
    }

    #[test]
    fn backoff_delay_jitter_stays_within_twenty_percent_band() {
        let low = backoff_delay(1, 0.0);
        let high = backoff_delay(1, 1.0);
        assert!(low.as_millis() >= 400 && low.as_millis() <= 500);
        assert!(high.as_millis() >= 500 && high.as_millis() <= 600);
    }
}
