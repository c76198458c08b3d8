use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{ClimateError, ClimateResult};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_WAIT: Duration = Duration::from_secs(5);

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
///
/// Clones share the same window.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                None => Duration::ZERO,
            } + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for upstream slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Send a request, honouring the limiter and retrying on HTTP 429.
pub(crate) async fn send_request(
    client: &reqwest::Client,
    rate_limiter: Option<&RateLimiter>,
    builder: reqwest::RequestBuilder,
    service: &'static str,
) -> ClimateResult<reqwest::Response> {
    let request = builder.build()?;

    for attempt in 0..MAX_ATTEMPTS {
        if let Some(limiter) = rate_limiter {
            limiter.acquire().await;
        }
        let req_clone = request
            .try_clone()
            .ok_or_else(|| ClimateError::InvalidResponse("Cannot clone request".to_string()))?;
        let response = client.execute(req_clone).await?;

        if response.status().as_u16() != 429 {
            return Ok(response);
        }

        tracing::warn!(
            "{} 429 rate limited, waiting {}s before retry {}/{}",
            service,
            RETRY_WAIT.as_secs(),
            attempt + 1,
            MAX_ATTEMPTS
        );
        tokio::time::sleep(RETRY_WAIT).await;
    }

    Err(ClimateError::RateLimited(format!(
        "{} still rate limiting after {} attempts",
        service, MAX_ATTEMPTS
    )))
}

/// Turn a non-2xx response into `ClimateError::Http`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    service: &'static str,
) -> ClimateResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ClimateError::Http {
        service,
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    })
}
