use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;

use crate::error::{Result, RetrieverError};
use crate::http::transport_error;
use crate::model::{FieldMap, PolicyRecord, RetrievalResult, Service};
use crate::secret::snippet;
use crate::token::BearerToken;

/// Reads the policy listing of one service
pub struct PolicyFetcher {
    client: reqwest::Client,
}

impl PolicyFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        PolicyFetcher { client }
    }

    /// Fetch and map one service's policies.
    ///
    /// Never fails: any error is folded into a failed [`RetrievalResult`] so
    /// the caller can still query the other service.
    pub async fn fetch(
        &self,
        service: Service,
        url: &str,
        token: &BearerToken,
        map: &FieldMap,
    ) -> RetrievalResult {
        match self.try_fetch(service, url, token, map).await {
            Ok((records, total)) => {
                if let Some(total) = total {
                    if total > records.len() as u64 {
                        tracing::warn!(
                            service = %service,
                            reported = total,
                            returned = records.len(),
                            "service reports more policies than returned; pagination is not followed"
                        );
                    }
                }
                tracing::info!(service = %service, count = records.len(), "policies retrieved");
                RetrievalResult::success(service, records, total)
            }
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "policy retrieval failed");
                RetrievalResult::failure(service, &e)
            }
        }
    }

    async fn try_fetch(
        &self,
        service: Service,
        url: &str,
        token: &BearerToken,
        map: &FieldMap,
    ) -> Result<(Vec<PolicyRecord>, Option<u64>)> {
        let context = format!("{} policies", service.tag());

        tracing::debug!(service = %service, url = %url, "requesting policies");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.header_value())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&context, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&context, &e))?;

        if !status.is_success() {
            let message = token.redact(&snippet(&body));
            return Err(RetrieverError::ApiError {
                status: Some(status.as_u16()),
                message: if message.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    message
                },
            });
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| RetrieverError::api(format!("Malformed {} response: {}", context, e)))?;

        map.extract(&json)
    }
}
