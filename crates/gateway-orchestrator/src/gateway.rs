//! The request orchestrator.
//!
//! One `submit` call walks the candidate providers in configuration order.
//! Attempts against a provider run strictly in sequence; the retry policy decides
//! after every failure whether to wait and try the same provider again or give up
//! on it and fall back to the next one. Every attempt is recorded in the metrics
//! recorder as soon as the transport returns.

use gateway_core::{
    validate_conversation, AIResponse, CancelReason, ChatMessage, ErrorKind, GatewayError,
    GatewayResult, ProviderError, ProviderFailure, ProviderIdentity, ProviderTransport,
    RequestContext, RequestOptions,
};
use gateway_resilience::{Bulkhead, BulkheadStats, RetryDecision, RetryPolicy};
use gateway_telemetry::{CallOutcome, MetricsRecorder, ProviderMetrics};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, error, info, info_span, warn, Instrument};

/// One provider in the candidate list
pub(crate) struct Candidate {
    pub(crate) transport: Arc<dyn ProviderTransport>,
    pub(crate) bulkhead: Bulkhead,
}

struct GatewayInner {
    candidates: Vec<Candidate>,
    retry_policy: RetryPolicy,
    metrics: Arc<MetricsRecorder>,
    attempt_timeout: Duration,
}

/// Shared handle to the gateway
///
/// Cheap to clone; every clone shares providers, policies and metrics.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

/// Per-call limits resolved from [`RequestOptions`]
#[derive(Debug, Clone, Copy)]
struct CallLimits {
    attempt_timeout: Duration,
    deadline: Option<Instant>,
}

impl Gateway {
    pub(crate) fn new(
        candidates: Vec<Candidate>,
        retry_policy: RetryPolicy,
        metrics: Arc<MetricsRecorder>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                candidates,
                retry_policy,
                metrics,
                attempt_timeout,
            }),
        }
    }

    /// Send a conversation to the first provider able to answer it
    ///
    /// # Errors
    /// - `InvalidRequest` if the conversation is malformed; no provider is called
    /// - `AllProvidersFailed` once every candidate has been exhausted
    /// - `Cancelled` if the request deadline elapses
    pub async fn submit(
        &self,
        messages: Vec<ChatMessage>,
        options: RequestOptions,
    ) -> GatewayResult<AIResponse> {
        self.submit_with_cancellation(messages, options, CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), abandoning the call when `cancel` fires
    ///
    /// An attempt in flight at cancellation is recorded as a `Timeout` failure
    /// and no further attempts are made.
    ///
    /// # Errors
    /// See [`submit`](Self::submit); cancellation yields `GatewayError::Cancelled`
    pub async fn submit_with_cancellation(
        &self,
        messages: Vec<ChatMessage>,
        options: RequestOptions,
        cancel: CancellationToken,
    ) -> GatewayResult<AIResponse> {
        validate_conversation(&messages)?;

        let limits = CallLimits {
            attempt_timeout: options.attempt_timeout.unwrap_or(self.inner.attempt_timeout),
            deadline: options.deadline.map(|budget| Instant::now() + budget),
        };
        let mut context = RequestContext::new(messages, &options);
        let span = info_span!(
            "gateway_submit",
            operation = %context.operation_name,
            request_id = %context.request_id,
        );

        self.run(&mut context, limits, &cancel).instrument(span).await
    }

    async fn run(
        &self,
        context: &mut RequestContext,
        limits: CallLimits,
        cancel: &CancellationToken,
    ) -> GatewayResult<AIResponse> {
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for candidate in &self.inner.candidates {
            let provider = candidate.transport.identity();
            let mut provider_attempts = 0u32;
            let mut last_error: Option<ProviderError> = None;

            loop {
                let permit = match guarded(candidate.bulkhead.acquire(), cancel, limits.deadline)
                    .await
                {
                    Ok(permit) => permit?,
                    Err(reason) => {
                        if let Some(last_error) = last_error {
                            failures.push(ProviderFailure {
                                provider,
                                attempts: provider_attempts,
                                last_error,
                            });
                        }
                        return Err(cancelled(reason, context, failures));
                    }
                };

                provider_attempts += 1;
                let attempt = context.attempts_so_far + 1;
                let started = Instant::now();
                let call = time::timeout(limits.attempt_timeout, candidate.transport.call(context))
                    .instrument(debug_span!("provider_attempt", provider = %provider, attempt));
                let outcome = guarded(call, cancel, limits.deadline).await;
                let elapsed = started.elapsed();
                drop(permit);
                context.attempts_so_far = attempt;

                let error = match outcome {
                    Ok(Ok(Ok(mut response))) => {
                        self.inner
                            .metrics
                            .record(provider, CallOutcome::success(elapsed));
                        response.metadata.attempts = context.attempts_so_far;
                        info!(
                            provider = %provider,
                            attempts = context.attempts_so_far,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Request completed"
                        );
                        return Ok(response);
                    }
                    Ok(Ok(Err(error))) => error,
                    Ok(Err(_elapsed)) => ProviderError::timeout(limits.attempt_timeout),
                    Err(reason) => {
                        let error = ProviderError::new(
                            ErrorKind::Timeout,
                            format!("attempt abandoned: {reason}"),
                        );
                        self.record_failure(provider, &error, elapsed);
                        failures.push(ProviderFailure {
                            provider,
                            attempts: provider_attempts,
                            last_error: error,
                        });
                        return Err(cancelled(reason, context, failures));
                    }
                };

                self.record_failure(provider, &error, elapsed);

                match self.inner.retry_policy.decide(error.kind, provider_attempts - 1) {
                    RetryDecision::Retry { after } => {
                        warn!(
                            provider = %provider,
                            attempt,
                            error_kind = %error.kind,
                            delay_ms = after.as_millis() as u64,
                            error = %error,
                            "Provider attempt failed, retrying"
                        );
                        if let Err(reason) =
                            guarded(time::sleep(after), cancel, limits.deadline).await
                        {
                            failures.push(ProviderFailure {
                                provider,
                                attempts: provider_attempts,
                                last_error: error,
                            });
                            return Err(cancelled(reason, context, failures));
                        }
                        last_error = Some(error);
                    }
                    RetryDecision::GiveUp => {
                        warn!(
                            provider = %provider,
                            attempts = provider_attempts,
                            error_kind = %error.kind,
                            error = %error,
                            "Giving up on provider"
                        );
                        failures.push(ProviderFailure {
                            provider,
                            attempts: provider_attempts,
                            last_error: error,
                        });
                        break;
                    }
                }
            }
        }

        let error = GatewayError::AllProvidersFailed {
            attempts: context.attempts_so_far,
            failures,
        };
        error!(attempts = context.attempts_so_far, error = %error, "All providers failed");
        Err(error)
    }

    fn record_failure(&self, provider: ProviderIdentity, error: &ProviderError, elapsed: Duration) {
        if error.is_rate_limited() {
            debug!(
                provider = %provider,
                retry_after_ms = error.retry_after.map(|d| d.as_millis() as u64),
                "Provider rate limited"
            );
        }
        self.inner
            .metrics
            .record(provider, CallOutcome::failure(error.kind, elapsed));
    }

    /// Candidate providers in the order they are tried
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderIdentity> {
        self.inner
            .candidates
            .iter()
            .map(|c| c.transport.identity())
            .collect()
    }

    /// The shared metrics recorder
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.inner.metrics
    }

    /// Metrics for one provider, `None` if it has not been attempted yet
    #[must_use]
    pub fn snapshot(&self, provider: ProviderIdentity) -> Option<ProviderMetrics> {
        self.inner.metrics.snapshot(provider)
    }

    /// Metrics for every attempted provider
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<ProviderIdentity, ProviderMetrics> {
        self.inner.metrics.snapshot_all()
    }

    /// Bulkhead usage per provider, in candidate order
    #[must_use]
    pub fn concurrency(&self) -> Vec<BulkheadStats> {
        self.inner.candidates.iter().map(|c| c.bulkhead.stats()).collect()
    }

    /// The retry policy applied to every provider
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("providers", &self.providers())
            .field("retry_policy", &self.inner.retry_policy)
            .field("attempt_timeout", &self.inner.attempt_timeout)
            .finish_non_exhaustive()
    }
}

/// Drive `fut` unless the caller cancels or the deadline passes first
async fn guarded<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<F::Output, CancelReason> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CancelReason::Signal),
        () = expires(deadline) => Err(CancelReason::Deadline),
        output = fut => Ok(output),
    }
}

async fn expires(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn cancelled(
    reason: CancelReason,
    context: &RequestContext,
    failures: Vec<ProviderFailure>,
) -> GatewayError {
    warn!(reason = %reason, attempts = context.attempts_so_far, "Request abandoned");
    GatewayError::Cancelled {
        reason,
        attempts: context.attempts_so_far,
        failures,
    }
}
