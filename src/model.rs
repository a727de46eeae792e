use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// A normalized itinerary offer. `id` is assigned once per distinct content
/// and stays stable across repeated insertions into the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub origin_date_time: NaiveDateTime,
    pub destination_date_time: NaiveDateTime,
    pub price: Decimal,
    pub time_limit: NaiveDateTime,
}

impl Route {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(
            &self.origin,
            &self.destination,
            self.origin_date_time.date(),
        )
    }

    pub fn content(&self) -> RouteContent {
        RouteContent {
            origin: self.origin.to_lowercase(),
            destination: self.destination.to_lowercase(),
            origin_date_time: self.origin_date_time,
            destination_date_time: self.destination_date_time,
            price: self.price,
            time_limit: self.time_limit,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.destination_date_time - self.origin_date_time
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }
}

/// Outer cache index: (origin, destination, departure date). Location codes
/// are lowercased on construction so equality is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin: String,
    destination: String,
    departure_date: NaiveDate,
}

impl RouteKey {
    pub fn new(origin: &str, destination: &str, departure_date: NaiveDate) -> Self {
        Self {
            origin: origin.to_lowercase(),
            destination: destination.to_lowercase(),
            departure_date,
        }
    }
}

/// Identity-ignoring view of a route: every field except `id`, with location
/// codes lowercased. Two routes with equal content must map to one cache
/// entry, so this is both the dedup key and the inner cache index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteContent {
    origin: String,
    destination: String,
    origin_date_time: NaiveDateTime,
    destination_date_time: NaiveDateTime,
    price: Decimal,
    time_limit: NaiveDateTime,
}

impl From<&Route> for RouteContent {
    fn from(route: &Route) -> Self {
        route.content()
    }
}

/// Comparison policy for the optional price/time-limit filter boundaries.
/// The original behavior was ambiguous between `<=`/`>=` and `<`/`>`, so the
/// choice is configuration instead of a hardcoded guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterBounds {
    #[default]
    Inclusive,
    Exclusive,
}

impl FilterBounds {
    pub fn price_within(self, price: Decimal, max_price: Decimal) -> bool {
        match self {
            FilterBounds::Inclusive => price <= max_price,
            FilterBounds::Exclusive => price < max_price,
        }
    }

    pub fn time_limit_within(self, time_limit: NaiveDateTime, min: NaiveDateTime) -> bool {
        match self {
            FilterBounds::Inclusive => time_limit >= min,
            FilterBounds::Exclusive => time_limit > min,
        }
    }
}

impl FromStr for FilterBounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inclusive" => Ok(FilterBounds::Inclusive),
            "exclusive" => Ok(FilterBounds::Exclusive),
            other => Err(format!(
                "invalid filter bounds '{other}', expected 'inclusive' or 'exclusive'"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    /// Departure date; no time-of-day semantics.
    pub origin_date_time: NaiveDate,
    pub filters: Option<SearchFilters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub destination_date_time: Option<NaiveDate>,
    pub max_price: Option<Decimal>,
    pub min_time_limit: Option<NaiveDateTime>,
    pub only_cached: Option<bool>,
}

impl SearchRequest {
    pub fn only_cached(&self) -> bool {
        self.filters
            .as_ref()
            .and_then(|f| f.only_cached)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_minutes_route: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_minutes_route: Option<i64>,
}

impl SearchResponse {
    /// Aggregates are only computed over a non-empty result set; an empty
    /// search yields an empty list with the aggregate fields unset.
    pub fn from_routes(routes: Vec<Route>) -> Self {
        if routes.is_empty() {
            return Self {
                routes,
                min_price: None,
                max_price: None,
                min_minutes_route: None,
                max_minutes_route: None,
            };
        }

        let min_price = routes.iter().map(|r| r.price).min();
        let max_price = routes.iter().map(|r| r.price).max();
        let min_minutes = routes.iter().map(Route::duration_minutes).min();
        let max_minutes = routes.iter().map(Route::duration_minutes).max();

        Self {
            routes,
            min_price,
            max_price,
            min_minutes_route: min_minutes,
            max_minutes_route: max_minutes,
        }
    }
}
