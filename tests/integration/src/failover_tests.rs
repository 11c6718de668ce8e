//! End-to-end retry and failover through real HTTP transports

use crate::fixtures::*;
use crate::mock_providers::*;
use futures::future::join_all;
use gateway_config::{GatewayConfig, ProviderConfig, ProviderRegistry};
use gateway_core::{ErrorKind, GatewayErrorKind, ProviderIdentity, RequestOptions};
use gateway_orchestrator::Gateway;
use gateway_telemetry::render_prometheus;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn gateway(primary: ProviderConfig, fallbacks: Vec<ProviderConfig>, max_retries: u32) -> Gateway {
    let registry = ProviderRegistry::new(primary, fallbacks).expect("registry");
    let mut config = GatewayConfig::new(registry);
    config.retry = fast_retry(max_retries);
    config.attempt_timeout = Duration::from_secs(5);
    Gateway::from_config(&config).expect("gateway")
}

#[tokio::test]
async fn test_success_on_first_try() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_success("Project Charter: CRM migration").await;

    let gateway = gateway(azure.api_key_config(), Vec::new(), 3);
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new().with_operation("charter"))
        .await
        .expect("success");

    assert_eq!(response.content, "Project Charter: CRM migration");
    assert_eq!(response.metadata.provider, ProviderIdentity::AzureOpenAi);
    assert_eq!(response.metadata.tokens_used, Some(50));
    assert_eq!(response.metadata.attempts, 1);
    assert_eq!(azure.completion_requests().await, 1);
    assert!(azure.all_requests_used_api_key().await);

    let metrics = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(metrics.total_calls, 1);
    assert_eq!(metrics.successful_calls, 1);
    assert!(metrics.last_used.is_some());
}

#[tokio::test]
async fn test_server_errors_fail_over_to_self_hosted() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(500).await;
    let local = MockSelfHosted::start().await;
    local.mock_success("Charter drafted locally").await;

    let gateway = gateway(azure.api_key_config(), vec![local.config()], 2);
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("fallback succeeds");

    assert_eq!(response.metadata.provider, ProviderIdentity::SelfHosted);
    assert_eq!(response.metadata.attempts, 4);
    assert_eq!(azure.completion_requests().await, 3);
    assert_eq!(local.completion_requests().await, 1);

    let azure_metrics = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(azure_metrics.failed_calls, 3);
    assert_eq!(
        azure_metrics.errors_by_kind.get(&ErrorKind::ServerError5xx),
        Some(&3)
    );
    let local_metrics = gateway.snapshot(ProviderIdentity::SelfHosted).expect("metrics");
    assert_eq!(local_metrics.successful_calls, 1);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_rate_limit(1, Duration::from_millis(1)).await;
    azure.mock_success("Stakeholder register").await;

    let gateway = gateway(azure.api_key_config(), Vec::new(), 3);
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("success after throttling");

    assert_eq!(response.content, "Stakeholder register");
    assert_eq!(azure.completion_requests().await, 2);

    let metrics = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(metrics.total_calls, 2);
    assert_eq!(metrics.rate_limit_hits, 1);
    assert_eq!(metrics.successful_calls, 1);
    assert_eq!(metrics.errors_by_kind.get(&ErrorKind::RateLimited), Some(&1));
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(401).await;
    let local = MockSelfHosted::start().await;
    local.mock_success("ok").await;

    let gateway = gateway(azure.api_key_config(), vec![local.config()], 3);
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("fallback succeeds");

    assert_eq!(response.metadata.provider, ProviderIdentity::SelfHosted);
    assert_eq!(azure.completion_requests().await, 1);
    assert_eq!(local.completion_requests().await, 1);
}

#[tokio::test]
async fn test_total_exhaustion_reports_every_provider() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(503).await;
    let local = MockSelfHosted::start().await;
    local.mock_status(502).await;

    let gateway = gateway(azure.api_key_config(), vec![local.config()], 2);
    let err = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect_err("all providers down");

    assert_eq!(err.kind(), GatewayErrorKind::AllProvidersFailed);
    assert_eq!(err.attempts(), 6);
    assert_eq!(azure.completion_requests().await, 3);
    assert_eq!(local.completion_requests().await, 3);

    let failures = err.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].provider, ProviderIdentity::AzureOpenAi);
    assert_eq!(failures[0].last_error.status_code, Some(503));
    assert_eq!(failures[1].provider, ProviderIdentity::SelfHosted);
    assert_eq!(failures[1].last_error.status_code, Some(502));
    assert!(err.to_string().contains("6 attempts"));
}

#[tokio::test]
async fn test_slow_provider_times_out_and_fails_over() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_slow(Duration::from_secs(3)).await;
    let local = MockSelfHosted::start().await;
    local.mock_success("fast answer").await;

    let gateway = gateway(azure.api_key_config(), vec![local.config()], 0);
    let response = gateway
        .submit(
            charter_conversation(),
            RequestOptions::new().with_attempt_timeout(Duration::from_millis(200)),
        )
        .await
        .expect("fallback succeeds");

    assert_eq!(response.content, "fast answer");
    let metrics = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(metrics.errors_by_kind.get(&ErrorKind::Timeout), Some(&1));
}

#[tokio::test]
async fn test_managed_identity_token_is_fetched_once() {
    let tokens = MockTokenEndpoint::start("entra-access-token", 3_600).await;
    let azure = MockAzureOpenAI::start().await;
    azure
        .mock_success_with_bearer("entra-access-token", "Charter via managed identity")
        .await;

    let gateway = gateway(azure.managed_identity_config(&tokens), Vec::new(), 0);
    for _ in 0..3 {
        let response = gateway
            .submit(charter_conversation(), RequestOptions::new())
            .await
            .expect("success");
        assert_eq!(response.content, "Charter via managed identity");
    }

    assert_eq!(tokens.token_requests().await, 1);
    assert_eq!(azure.completion_requests().await, 3);
}

#[tokio::test]
async fn test_token_endpoint_failure_is_authentication_failure() {
    let tokens = MockTokenEndpoint::start("unused", 3_600).await;
    tokens.server.reset().await;
    let azure = MockAzureOpenAI::start().await;
    azure.mock_success("unreachable").await;

    let gateway = gateway(azure.managed_identity_config(&tokens), Vec::new(), 3);
    let err = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect_err("no token");

    assert_eq!(
        err.last_error().map(|e| e.kind),
        Some(ErrorKind::AuthenticationFailure)
    );
    assert_eq!(err.attempts(), 1);
    assert_eq!(azure.completion_requests().await, 0);
}

#[tokio::test]
async fn test_token_endpoint_outage_is_retried() {
    let tokens = MockTokenEndpoint::start("entra-access-token", 3_600).await;
    tokens.mock_outage(503, 2).await;
    let azure = MockAzureOpenAI::start().await;
    azure
        .mock_success_with_bearer("entra-access-token", "Charter after IMDS recovered")
        .await;

    let gateway = gateway(azure.managed_identity_config(&tokens), Vec::new(), 3);
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("token endpoint recovers");

    assert_eq!(response.content, "Charter after IMDS recovered");
    assert_eq!(response.metadata.attempts, 3);
    assert_eq!(tokens.token_requests().await, 3);

    let snapshot = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(snapshot.failed_calls, 2);
    assert_eq!(
        snapshot.errors_by_kind.get(&ErrorKind::ServerError5xx).copied(),
        Some(2)
    );
}

#[tokio::test]
async fn test_concurrent_callers_share_metrics() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_rate_limit(5, Duration::from_millis(1)).await;
    azure.mock_success("ok").await;

    let gateway = gateway(azure.api_key_config(), Vec::new(), 10);
    let calls = (0..20).map(|i| {
        let gateway = gateway.clone();
        async move {
            gateway
                .submit(
                    charter_conversation(),
                    RequestOptions::new().with_operation(format!("doc-{i}")),
                )
                .await
        }
    });
    let results = join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));

    let metrics = gateway.snapshot(ProviderIdentity::AzureOpenAi).expect("metrics");
    assert_eq!(metrics.successful_calls, 20);
    assert_eq!(metrics.rate_limit_hits, 5);
    assert_eq!(metrics.total_calls, 25);
    assert_eq!(
        metrics.total_calls,
        metrics.successful_calls + metrics.failed_calls
    );
}

#[tokio::test]
async fn test_prometheus_export_after_failover() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(500).await;
    let local = MockSelfHosted::start().await;
    local.mock_success("ok").await;

    let gateway = gateway(azure.api_key_config(), vec![local.config()], 1);
    gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("fallback succeeds");

    let text = render_prometheus(gateway.metrics()).expect("render");
    assert!(text.contains(
        r#"gateway_provider_calls_total{outcome="failure",provider="azure-openai"} 2"#
    ));
    assert!(text.contains(
        r#"gateway_provider_calls_total{outcome="success",provider="self-hosted"} 1"#
    ));
    assert!(text.contains(
        r#"gateway_provider_errors_total{kind="server_error_5xx",provider="azure-openai"} 2"#
    ));
}
