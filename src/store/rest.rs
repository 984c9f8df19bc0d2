// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! HTTP client for a PostgREST-style remote store

use super::{value_text, Entity, Filter, Query, RemoteStore, Row};
use crate::error::StoreError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Error body returned by the store
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`RemoteStore`] speaking the PostgREST dialect over HTTPS
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    /// Build a client for `endpoint`.
    ///
    /// `access_token` authenticates a user; without it requests carry the
    /// anonymous `api_key` as bearer.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        access_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        let bearer = format!("Bearer {}", access_token.unwrap_or(api_key));
        headers.insert(AUTHORIZATION, header_value(&bearer)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", endpoint.trim_end_matches('/')),
        })
    }

    fn request(&self, method: Method, entity: Entity) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, entity.table()))
    }

    async fn send(request: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value)
        .map_err(|_| StoreError::Permission("credential is not a valid header value".into()))
}

/// Query-string parameters for a filter list
#[must_use]
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| {
            let op = match f {
                Filter::Eq(..) => "eq",
                Filter::Gte(..) => "gte",
                Filter::Lte(..) => "lte",
                Filter::In(_, Value::Array(values)) => {
                    let list: Vec<String> = values.iter().map(value_text).collect();
                    return (f.field().to_string(), format!("in.({})", list.join(",")));
                }
                Filter::In(..) => "in",
            };
            (f.field().to_string(), format!("{op}.{}", value_text(f.value())))
        })
        .collect()
}

/// Map a failed response onto the store error taxonomy.
///
/// Database error codes win over the HTTP status since the gateway does not
/// always pick a precise status.
#[must_use]
pub fn classify(status: StatusCode, body: &str) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| format!("{status}: {}", body.trim()));

    match parsed.code.as_deref() {
        Some("42501") => return StoreError::Permission(message),
        Some("23505") => return StoreError::Conflict(message),
        Some("42P01" | "PGRST116" | "PGRST205") => return StoreError::NotFound(message),
        _ => {}
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Permission(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Decode(message),
        _ => StoreError::Network(message),
    }
}

impl RemoteStore for RestStore {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut params = filter_params(&query.filters);
        params.push(("select".into(), "*".into()));
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".into(), format!("{}.{direction}", order.field)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".into(), limit.to_string()));
        }

        debug!("GET {} {:?}", query.entity.table(), params);
        Self::send(self.request(Method::GET, query.entity).query(&params)).await
    }

    async fn insert(&self, entity: Entity, row: Row) -> Result<Row, StoreError> {
        debug!("POST {}", entity.table());
        let request = self
            .request(Method::POST, entity)
            .header("Prefer", "return=representation")
            .json(&[row]);

        Self::send(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".into()))
    }

    async fn delete(&self, entity: Entity, filters: &[Filter]) -> Result<u64, StoreError> {
        debug!("DELETE {} {:?}", entity.table(), filters);
        let request = self
            .request(Method::DELETE, entity)
            .header("Prefer", "return=representation")
            .query(&filter_params(filters));

        Ok(Self::send(request).await?.len() as u64)
    }
}
