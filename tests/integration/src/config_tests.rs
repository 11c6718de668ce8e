//! Gateways assembled from environment-style configuration

use crate::fixtures::*;
use crate::mock_providers::*;
use gateway_config::{ConfigError, GatewayConfig};
use gateway_core::{ErrorKind, GatewayErrorKind, ProviderIdentity, RequestOptions};
use gateway_orchestrator::Gateway;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn vars(pairs: &[(&str, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_env_configured_primary_and_fallback() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(503).await;
    let local = MockSelfHosted::start().await;
    local.mock_success("Work breakdown structure").await;

    let config = GatewayConfig::from_vars(vars(&[
        ("GATEWAY_PRIMARY_PROVIDER", "azure-openai".into()),
        ("GATEWAY_FALLBACK_PROVIDERS", "self-hosted".into()),
        ("GATEWAY_MAX_RETRIES", "1".into()),
        ("GATEWAY_RETRY_BASE_DELAY_MS", "5".into()),
        ("GATEWAY_RETRY_MAX_DELAY_MS", "10".into()),
        ("AZURE_OPENAI_ENDPOINT", azure.endpoint().to_string()),
        ("AZURE_OPENAI_API_KEY", AZURE_KEY.into()),
        ("AZURE_OPENAI_DEPLOYMENT", AZURE_DEPLOYMENT.into()),
        ("SELF_HOSTED_ENDPOINT", local.endpoint().to_string()),
        ("SELF_HOSTED_MODEL", LOCAL_MODEL.into()),
    ]))
    .expect("config");

    let gateway = Gateway::from_config(&config).expect("gateway");
    assert_eq!(
        gateway.providers(),
        vec![ProviderIdentity::AzureOpenAi, ProviderIdentity::SelfHosted]
    );

    let response = gateway
        .submit(charter_conversation(), RequestOptions::new().with_operation("wbs"))
        .await
        .expect("fallback succeeds");

    assert_eq!(response.content, "Work breakdown structure");
    assert_eq!(response.metadata.model.as_deref(), Some(LOCAL_MODEL));
    assert_eq!(azure.completion_requests().await, 2);
    assert!(azure.all_requests_used_api_key().await);
}

#[tokio::test]
async fn test_env_configured_retryable_kinds_are_honoured() {
    let azure = MockAzureOpenAI::start().await;
    azure.mock_status(503).await;

    let config = GatewayConfig::from_vars(vars(&[
        ("GATEWAY_PRIMARY_PROVIDER", "azure-openai".into()),
        ("GATEWAY_MAX_RETRIES", "4".into()),
        ("GATEWAY_RETRYABLE_ERRORS", "rate_limited,timeout".into()),
        ("AZURE_OPENAI_ENDPOINT", azure.endpoint().to_string()),
        ("AZURE_OPENAI_API_KEY", AZURE_KEY.into()),
        ("AZURE_OPENAI_DEPLOYMENT", AZURE_DEPLOYMENT.into()),
    ]))
    .expect("config");
    assert!(!config.retry.retryable.contains(&ErrorKind::ServerError5xx));

    let gateway = Gateway::from_config(&config).expect("gateway");
    let err = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect_err("5xx not retryable here");

    assert_eq!(err.kind(), GatewayErrorKind::AllProvidersFailed);
    assert_eq!(azure.completion_requests().await, 1);
}

#[tokio::test]
async fn test_env_configured_managed_identity() {
    let tokens = MockTokenEndpoint::start("mi-token", 3_600).await;
    let azure = MockAzureOpenAI::start().await;
    azure.mock_success_with_bearer("mi-token", "Risk log").await;

    let config = GatewayConfig::from_vars(vars(&[
        ("GATEWAY_PRIMARY_PROVIDER", "azure-openai".into()),
        ("AZURE_OPENAI_ENDPOINT", azure.endpoint().to_string()),
        ("AZURE_OPENAI_AUTH_MODE", "managed-identity".into()),
        ("AZURE_OPENAI_TOKEN_ENDPOINT", tokens.token_url().to_string()),
        ("AZURE_OPENAI_DEPLOYMENT", AZURE_DEPLOYMENT.into()),
        ("GATEWAY_ATTEMPT_TIMEOUT_MS", "2000".into()),
    ]))
    .expect("config");
    assert_eq!(config.attempt_timeout, Duration::from_secs(2));

    let gateway = Gateway::from_config(&config).expect("gateway");
    let response = gateway
        .submit(charter_conversation(), RequestOptions::new())
        .await
        .expect("success");

    assert_eq!(response.content, "Risk log");
    assert_eq!(tokens.token_requests().await, 1);
}

#[test]
fn test_missing_primary_is_reported() {
    let err = GatewayConfig::from_vars(Vec::<(String, String)>::new()).expect_err("missing");
    assert!(matches!(err, ConfigError::Missing { .. }));
}

#[test]
fn test_self_hosted_managed_identity_fails_at_build_time() {
    let config = GatewayConfig::from_vars(vars(&[
        ("GATEWAY_PRIMARY_PROVIDER", "self-hosted".into()),
        ("SELF_HOSTED_MODEL", LOCAL_MODEL.into()),
        ("SELF_HOSTED_AUTH_MODE", "managed-identity".into()),
    ]))
    .expect("config loads");

    let err = Gateway::from_config(&config).expect_err("unsupported credential");
    assert_eq!(err.kind(), GatewayErrorKind::Configuration);
}
