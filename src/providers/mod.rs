pub mod mock;
pub mod provider_one;
pub mod provider_two;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    ErrorStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

// Provider one speaks a flat route shape and accepts the destination date
// and price cap as part of its own request.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOneSearchRequest {
    pub from: String,
    pub to: String,
    pub date_from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOneSearchResponse {
    pub routes: Vec<ProviderOneRoute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOneRoute {
    pub from: String,
    pub to: String,
    pub date_from: NaiveDateTime,
    pub date_to: NaiveDateTime,
    pub price: Decimal,
    pub time_limit: NaiveDateTime,
}

// Provider two wraps each endpoint in a point object and accepts the minimum
// time limit instead.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTwoSearchRequest {
    pub departure: String,
    pub arrival: String,
    pub departure_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_time_limit: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTwoSearchResponse {
    pub routes: Vec<ProviderTwoRoute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTwoRoute {
    pub departure: ProviderTwoPoint,
    pub arrival: ProviderTwoPoint,
    pub price: Decimal,
    pub time_limit: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTwoPoint {
    pub point: String,
    pub date: NaiveDateTime,
}

#[async_trait]
pub trait ProviderOneApi: Send + Sync {
    async fn search(
        &self,
        request: &ProviderOneSearchRequest,
    ) -> Result<ProviderOneSearchResponse, ProviderError>;

    /// Lightweight liveness probe; transport failures count as unavailable.
    async fn is_available(&self) -> bool;
}

#[async_trait]
pub trait ProviderTwoApi: Send + Sync {
    async fn search(
        &self,
        request: &ProviderTwoSearchRequest,
    ) -> Result<ProviderTwoSearchResponse, ProviderError>;

    async fn is_available(&self) -> bool;
}
