//! Per-upstream circuit breaker (spec §4.2).
//!
//! Generalizes the teacher's per-source `DataSourceKillSwitch` in
//! `main.rs` (a bespoke failure/latency tripwire built once per upstream)
//! into the spec's reusable three-state machine, with one named instance
//! per upstream held in a `BreakerRegistry`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub name: &'static str,
    pub state: State,
    pub failure_count: u32,
    pub success_count: u32,
}

pub struct CircuitBreaker {
    name: &'static str,
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(
        name: &'static str,
        failure_threshold: u32,
        success_threshold: u32,
        reset_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            failure_threshold,
            success_threshold,
            reset_timeout,
            clock,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock();
        BreakerStats {
            name: self.name,
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = State::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_at = None;
    }

    /// Returns true if a call may proceed right now, transitioning
    /// OPEN -> HALF_OPEN when the reset timeout has elapsed.
    fn admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                let elapsed_ok = inner
                    .last_failure_at
                    .is_some_and(|at| self.clock.now().duration_since(at) >= self.reset_timeout);
                if elapsed_ok {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub(crate) fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => inner.failure_count = 0,
            State::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.success_threshold {
                    inner.state = State::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                }
            }
            State::Open => {}
        }
    }

    pub(crate) fn record_failure(&self) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        match inner.state {
            State::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.last_failure_at = Some(now);
                }
            }
            State::HalfOpen => {
                inner.state = State::Open;
                inner.last_failure_at = Some(now);
                inner.success_count = 0;
            }
            State::Open => {
                inner.last_failure_at = Some(now);
            }
        }
    }

    /// The only way to call an upstream: admits, runs `thunk`, records the
    /// outcome. `thunk`'s `Err` is always treated as a breaker failure;
    /// validation errors must be raised before `execute` is called.
    pub async fn execute<T, F, Fut>(&self, thunk: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        if !self.admit() {
            return Err(GatewayError::CircuitOpen { upstream: self.name });
        }
        match thunk().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Convenience: catches both `CircuitOpen` and upstream errors and runs
    /// `fallback` instead of propagating.
    pub async fn execute_with_fallback<T, F, Fut, Fb, FbFut>(
        &self,
        thunk: F,
        fallback: Fb,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
        Fb: FnOnce() -> FbFut,
        FbFut: std::future::Future<Output = T>,
    {
        match self.execute(thunk).await {
            Ok(value) => value,
            Err(_) => fallback().await,
        }
    }
}

/// One independent breaker per named upstream.
pub struct BreakerRegistry {
    breakers: HashMap<&'static str, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let names: &[(&'static str, u32, u32, Duration)] = &[
            ("crypto-prices", 4, 2, Duration::from_secs(60)),
            ("stock-primary", 3, 2, Duration::from_secs(90)),
            ("stock-fallback", 3, 2, Duration::from_secs(90)),
            ("fundamentals", 4, 2, Duration::from_secs(60)),
            ("blockchain-ethereum", 4, 2, Duration::from_secs(60)),
            ("blockchain-bitcoin", 4, 2, Duration::from_secs(60)),
            ("llm", 3, 2, Duration::from_secs(120)),
        ];
        let breakers = names
            .iter()
            .map(|(name, ft, st, rt)| {
                (
                    *name,
                    Arc::new(CircuitBreaker::new(name, *ft, *st, *rt, clock.clone())),
                )
            })
            .collect();
        Self { breakers }
    }

    pub fn get(&self, name: &'static str) -> Arc<CircuitBreaker> {
        self.breakers
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown breaker '{name}'"))
    }

    pub fn all_stats(&self) -> Vec<BreakerStats> {
        self.breakers.values().map(|b| b.stats()).collect()
    }
}
