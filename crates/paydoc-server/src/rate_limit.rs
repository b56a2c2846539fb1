//! Rate Limiting
//!
//! A per-route admission check keyed by caller address, backed by
//! `governor`'s GCRA limiters. Limits are written the way they are usually
//! quoted, e.g. `10/minute` or `100 per hour`: up to that many requests at
//! once, with one more allowed every `window / requests` after that.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::handlers::ErrorResponse;

/// `requests` per `window`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimit {
    /// Burst of `requests`, one cell replenished every `window / requests`
    pub fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.requests)?;
        Quota::with_period(self.window / self.requests).map(|q| q.allow_burst(burst))
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

impl FromStr for RateLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (count, unit) = s
            .split_once('/')
            .or_else(|| s.split_once(" per "))
            .ok_or_else(|| format!("expected '<count>/<unit>', got '{s}'"))?;

        let requests: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid request count '{}'", count.trim()))?;
        if requests == 0 {
            return Err("request count must be at least 1".into());
        }

        let seconds = match unit.trim().trim_end_matches('s') {
            "second" | "sec" => 1,
            "minute" | "min" => 60,
            "hour" => 3_600,
            "day" => 86_400,
            other => return Err(format!("unknown time unit '{other}'")),
        };

        Ok(Self {
            requests,
            window: Duration::from_secs(seconds),
        })
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.window.as_secs() {
            1 => "second",
            60 => "minute",
            3_600 => "hour",
            86_400 => "day",
            secs => return write!(f, "{}/{secs}s", self.requests),
        };
        write!(f, "{}/{unit}", self.requests)
    }
}

/// Outcome of an admission check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected { retry_after: Duration },
}

/// Admission check strategy
pub trait AdmissionCheck: Send + Sync {
    fn check(&self, route: &str, caller: IpAddr) -> Admission;
}

/// One keyed limiter per route, keyed by caller address
///
/// Routes without a configured limit are always admitted.
#[derive(Default)]
pub struct KeyedLimiter {
    routes: HashMap<String, DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
}

impl KeyedLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(mut self, route: impl Into<String>, limit: RateLimit) -> Self {
        let route = route.into();
        match limit.quota() {
            Some(quota) => {
                self.routes.insert(route, RateLimiter::keyed(quota));
            }
            None => tracing::warn!(route = %route, limit = %limit, "Ignoring empty rate limit"),
        }
        self
    }

    /// Drop state for callers whose quota has fully replenished
    pub fn sweep(&self) {
        for limiter in self.routes.values() {
            limiter.retain_recent();
        }
    }
}

impl AdmissionCheck for KeyedLimiter {
    fn check(&self, route: &str, caller: IpAddr) -> Admission {
        let Some(limiter) = self.routes.get(route) else {
            return Admission::Allowed;
        };

        match limiter.check_key(&caller) {
            Ok(()) => Admission::Allowed,
            Err(not_until) => Admission::Rejected {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }
}

/// Middleware state: which route this layer guards
#[derive(Clone)]
pub struct RouteGuard {
    pub route: &'static str,
    pub check: Arc<dyn AdmissionCheck>,
}

impl RouteGuard {
    pub fn new(route: &'static str, check: Arc<dyn AdmissionCheck>) -> Self {
        Self { route, check }
    }
}

/// Reject the request with 429 when the caller is over quota for this route
pub async fn enforce(State(guard): State<RouteGuard>, request: Request, next: Next) -> Response {
    let caller = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip());

    match guard.check.check(guard.route, caller) {
        Admission::Allowed => next.run(request).await,
        Admission::Rejected { retry_after } => {
            let seconds = retry_after.as_secs_f64().ceil().max(1.0);
            tracing::warn!(route = guard.route, caller = %caller, retry_after = seconds, "Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, format!("{seconds:.0}"))],
                Json(ErrorResponse::new("Rate limit exceeded", "RATE_LIMITED")),
            )
                .into_response()
        }
    }
}
