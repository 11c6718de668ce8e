//! Sending a chat completion and classifying the outcome.

use crate::classify::{classify_status, classify_transport};
use crate::wire::ChatCompletionResponse;
use gateway_core::{AIResponse, GatewayError, ProviderError, ProviderIdentity};
use reqwest::RequestBuilder;
use std::time::Instant;
use tracing::{debug, trace};
use url::Url;

/// Send a prepared request and turn the reply into an [`AIResponse`]
pub(crate) async fn execute(
    request: RequestBuilder,
    provider: ProviderIdentity,
    default_model: &str,
) -> Result<AIResponse, ProviderError> {
    let started = Instant::now();

    let response = request.send().await.map_err(|e| classify_transport(&e))?;
    let status = response.status();

    if !status.is_success() {
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, &headers, &body);
        debug!(
            provider = %provider,
            status = status.as_u16(),
            error_kind = %error.kind,
            "Provider returned error status"
        );
        return Err(error);
    }

    let payload: ChatCompletionResponse =
        response.json().await.map_err(|e| classify_transport(&e))?;
    let elapsed = started.elapsed();

    trace!(
        provider = %provider,
        elapsed_ms = elapsed.as_millis() as u64,
        "Provider returned completion"
    );

    Ok(payload
        .into_ai_response(provider, default_model)?
        .with_response_time_ms(elapsed.as_millis() as u64))
}

/// Append path segments to a base URL and set the `api-version` query, if any
pub(crate) fn endpoint_url(
    base: &Url,
    segments: &[&str],
    api_version: Option<&str>,
) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| {
            GatewayError::configuration(format!("endpoint {base} cannot be a base URL"))
        })?
        .pop_if_empty()
        .extend(segments);
    url.set_query(None);
    if let Some(version) = api_version {
        url.query_pairs_mut().append_pair("api-version", version);
    }
    Ok(url)
}
