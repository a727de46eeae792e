use crate::cache::RouteCache;
use crate::model::{FilterBounds, Route, RouteContent, SearchRequest, SearchResponse};
use crate::providers::{
    ProviderError, ProviderOneApi, ProviderOneSearchRequest, ProviderTwoApi,
    ProviderTwoSearchRequest,
};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("upstream providers are unavailable")]
    Unavailable,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Single entry point for searches: decides between the cache-only path and
/// the live merge pipeline, and assembles response-level aggregates.
pub struct SearchService {
    provider_one: Arc<dyn ProviderOneApi>,
    provider_two: Arc<dyn ProviderTwoApi>,
    cache: Arc<RouteCache>,
    bounds: FilterBounds,
}

impl SearchService {
    pub fn new(
        provider_one: Arc<dyn ProviderOneApi>,
        provider_two: Arc<dyn ProviderTwoApi>,
        cache: Arc<RouteCache>,
        bounds: FilterBounds,
    ) -> Self {
        Self {
            provider_one,
            provider_two,
            cache,
            bounds,
        }
    }

    /// The system is available only while both providers answer their
    /// liveness probes.
    pub async fn is_available(&self) -> bool {
        let (one, two) = tokio::join!(
            self.provider_one.is_available(),
            self.provider_two.is_available()
        );
        one && two
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let routes = if request.only_cached() {
            self.cache.find_cached_routes(request)
        } else {
            if !self.is_available().await {
                return Err(SearchError::Unavailable);
            }
            self.routes_from_providers(request).await?
        };

        Ok(SearchResponse::from_routes(routes))
    }

    /// Live merge pipeline: fan out to both providers, normalize, dedup by
    /// content, adopt canonical identities from the cache, drop offers whose
    /// booking window has closed, and order the result.
    async fn routes_from_providers(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<Route>, SearchError> {
        // Neither provider is optional: either failure fails the search
        // instead of silently returning a partial list.
        let (one, two) = tokio::try_join!(
            self.routes_from_provider_one(request),
            self.routes_from_provider_two(request)
        )?;

        let now = chrono::Local::now().naive_local();
        let mut seen: HashSet<RouteContent> = HashSet::new();

        let mut routes: Vec<Route> = one
            .into_iter()
            .chain(two)
            .filter(|route| seen.insert(route.content()))
            .map(|route| self.cache.get_or_add(route))
            .filter(|route| self.bounds.time_limit_within(route.time_limit, now))
            .collect();

        // Cheapest first; among equal prices the longer trip wins.
        routes.sort_by_key(|route| (route.price, Reverse(route.duration())));

        Ok(routes)
    }

    async fn routes_from_provider_one(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<Route>, SearchError> {
        let filters = request.filters.as_ref();

        let provider_request = ProviderOneSearchRequest {
            from: request.origin.clone(),
            to: request.destination.clone(),
            date_from: request.origin_date_time,
            date_to: filters.and_then(|f| f.destination_date_time),
            max_price: filters.and_then(|f| f.max_price),
        };

        let response = self.provider_one.search(&provider_request).await?;

        // Provider one does not understand the time-limit filter, so the
        // requested minimum is mirrored here.
        let min_time_limit = filters.and_then(|f| f.min_time_limit);

        let routes = response
            .routes
            .into_iter()
            .filter(|route| {
                min_time_limit.map_or(true, |min| {
                    self.bounds.time_limit_within(route.time_limit, min)
                })
            })
            .map(|route| Route {
                id: Uuid::new_v4(),
                origin: route.from,
                destination: route.to,
                origin_date_time: route.date_from,
                destination_date_time: route.date_to,
                price: route.price,
                time_limit: route.time_limit,
            })
            .collect();

        Ok(routes)
    }

    async fn routes_from_provider_two(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<Route>, SearchError> {
        let filters = request.filters.as_ref();

        let provider_request = ProviderTwoSearchRequest {
            departure: request.origin.clone(),
            arrival: request.destination.clone(),
            departure_date: request.origin_date_time,
            min_time_limit: filters.and_then(|f| f.min_time_limit),
        };

        let response = self.provider_two.search(&provider_request).await?;

        // Mirrored price cap; provider two only takes the time-limit filter.
        let max_price = filters.and_then(|f| f.max_price);

        let routes = response
            .routes
            .into_iter()
            .filter(|route| max_price.map_or(true, |max| self.bounds.price_within(route.price, max)))
            .map(|route| Route {
                id: Uuid::new_v4(),
                origin: route.departure.point,
                destination: route.arrival.point,
                origin_date_time: route.departure.date,
                destination_date_time: route.arrival.date,
                price: route.price,
                time_limit: route.time_limit,
            })
            .collect();

        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ProviderOneRoute, ProviderOneSearchResponse, ProviderTwoPoint, ProviderTwoRoute,
        ProviderTwoSearchResponse,
    };
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDateTime};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Sampled once per test and threaded through every fixture: two routes
    // built from separate wall-clock reads differ at sub-second precision
    // and would never compare content-equal.
    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn p1_route(base: NaiveDateTime, duration_minutes: i64, price: i64) -> ProviderOneRoute {
        let departure = base + Duration::days(1);
        ProviderOneRoute {
            from: "MOW".to_string(),
            to: "LED".to_string(),
            date_from: departure,
            date_to: departure + Duration::minutes(duration_minutes),
            price: Decimal::from(price),
            time_limit: base + Duration::hours(12),
        }
    }

    fn p2_route(base: NaiveDateTime, duration_minutes: i64, price: i64) -> ProviderTwoRoute {
        let departure = base + Duration::days(1);
        ProviderTwoRoute {
            departure: ProviderTwoPoint {
                point: "MOW".to_string(),
                date: departure,
            },
            arrival: ProviderTwoPoint {
                point: "LED".to_string(),
                date: departure + Duration::minutes(duration_minutes),
            },
            price: Decimal::from(price),
            time_limit: base + Duration::hours(12),
        }
    }

    fn request(base: NaiveDateTime) -> SearchRequest {
        SearchRequest {
            origin: "MOW".to_string(),
            destination: "LED".to_string(),
            origin_date_time: (base + Duration::days(1)).date(),
            filters: None,
        }
    }

    #[derive(Default)]
    struct FakeProviderOne {
        routes: Vec<ProviderOneRoute>,
        unavailable: bool,
        fail_search: bool,
        search_calls: AtomicUsize,
        last_request: Mutex<Option<ProviderOneSearchRequest>>,
    }

    #[async_trait]
    impl ProviderOneApi for FakeProviderOne {
        async fn search(
            &self,
            request: &ProviderOneSearchRequest,
        ) -> Result<ProviderOneSearchResponse, ProviderError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.fail_search {
                return Err(ProviderError::ErrorStatus {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".to_string(),
                });
            }
            Ok(ProviderOneSearchResponse {
                routes: self.routes.clone(),
            })
        }

        async fn is_available(&self) -> bool {
            !self.unavailable
        }
    }

    #[derive(Default)]
    struct FakeProviderTwo {
        routes: Vec<ProviderTwoRoute>,
        unavailable: bool,
        fail_search: bool,
        search_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderTwoApi for FakeProviderTwo {
        async fn search(
            &self,
            _request: &ProviderTwoSearchRequest,
        ) -> Result<ProviderTwoSearchResponse, ProviderError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_search {
                return Err(ProviderError::ErrorStatus {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".to_string(),
                });
            }
            Ok(ProviderTwoSearchResponse {
                routes: self.routes.clone(),
            })
        }

        async fn is_available(&self) -> bool {
            !self.unavailable
        }
    }

    fn service(
        one: FakeProviderOne,
        two: FakeProviderTwo,
    ) -> (SearchService, Arc<FakeProviderOne>, Arc<FakeProviderTwo>) {
        let one = Arc::new(one);
        let two = Arc::new(two);
        let cache = Arc::new(RouteCache::new(FilterBounds::Inclusive));
        let service = SearchService::new(
            one.clone(),
            two.clone(),
            cache,
            FilterBounds::Inclusive,
        );
        (service, one, two)
    }

    #[tokio::test]
    async fn dedup_collapses_content_equal_routes_across_providers() {
        let base = now();
        let one = p1_route(base, 120, 100);
        let two = p2_route(base, 120, 100);
        assert_eq!(one.date_from, two.departure.date);
        assert_eq!(one.time_limit, two.time_limit);

        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![one],
                ..Default::default()
            },
            FakeProviderTwo {
                routes: vec![two],
                ..Default::default()
            },
        );

        let response = service.search(&request(base)).await.unwrap();
        assert_eq!(response.routes.len(), 1);
    }

    #[tokio::test]
    async fn live_search_orders_price_ascending_then_duration_descending() {
        let base = now();
        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 60, 100), p1_route(base, 90, 50)],
                ..Default::default()
            },
            FakeProviderTwo {
                routes: vec![p2_route(base, 120, 100)],
                ..Default::default()
            },
        );

        let response = service.search(&request(base)).await.unwrap();
        let ordered: Vec<(Decimal, i64)> = response
            .routes
            .iter()
            .map(|r| (r.price, r.duration_minutes()))
            .collect();

        assert_eq!(
            ordered,
            vec![
                (Decimal::from(50), 90),
                (Decimal::from(100), 120),
                (Decimal::from(100), 60),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_searches_return_stable_identities() {
        let base = now();
        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 120, 100)],
                ..Default::default()
            },
            FakeProviderTwo::default(),
        );

        let first = service.search(&request(base)).await.unwrap();
        let second = service.search(&request(base)).await.unwrap();

        assert_eq!(first.routes[0].id, second.routes[0].id);
    }

    #[tokio::test]
    async fn expired_offers_are_dropped_at_merge_time() {
        let base = now();
        let mut stale = p1_route(base, 120, 100);
        stale.time_limit = base - Duration::hours(1);

        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![stale],
                ..Default::default()
            },
            FakeProviderTwo::default(),
        );

        let response = service.search(&request(base)).await.unwrap();
        assert!(response.routes.is_empty());
        assert_eq!(response.min_price, None);
    }

    #[tokio::test]
    async fn one_dead_provider_makes_the_service_unavailable() {
        let base = now();
        let (service, one, two) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 120, 100)],
                ..Default::default()
            },
            FakeProviderTwo {
                unavailable: true,
                ..Default::default()
            },
        );

        assert!(!service.is_available().await);

        // A live search is rejected before any provider search call is made.
        let result = service.search(&request(base)).await;
        assert!(matches!(result, Err(SearchError::Unavailable)));
        assert_eq!(one.search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(two.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_fails_the_whole_search() {
        let base = now();
        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 120, 100)],
                ..Default::default()
            },
            FakeProviderTwo {
                fail_search: true,
                ..Default::default()
            },
        );

        let result = service.search(&request(base)).await;
        assert!(matches!(result, Err(SearchError::Provider(_))));
    }

    #[tokio::test]
    async fn only_cached_searches_skip_the_providers() {
        let base = now();
        let (service, one, two) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 120, 100)],
                ..Default::default()
            },
            FakeProviderTwo::default(),
        );

        // Prime the cache through a live search, then ask for cached only.
        service.search(&request(base)).await.unwrap();

        let mut cached_request = request(base);
        cached_request.filters = Some(crate::model::SearchFilters {
            only_cached: Some(true),
            ..Default::default()
        });

        let response = service.search(&cached_request).await.unwrap();
        assert_eq!(response.routes.len(), 1);
        assert_eq!(one.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(two.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filters_are_forwarded_and_mirrored_per_provider() {
        let base = now();
        let mut below_limit = p1_route(base, 120, 100);
        below_limit.time_limit = base + Duration::hours(1);
        let within_limit = p1_route(base, 90, 120);

        let (service, one, _) = service(
            FakeProviderOne {
                routes: vec![below_limit, within_limit],
                ..Default::default()
            },
            FakeProviderTwo {
                routes: vec![p2_route(base, 60, 999)],
                ..Default::default()
            },
        );

        let mut filtered_request = request(base);
        filtered_request.filters = Some(crate::model::SearchFilters {
            max_price: Some(Decimal::from(500)),
            min_time_limit: Some(base + Duration::hours(6)),
            ..Default::default()
        });

        let response = service.search(&filtered_request).await.unwrap();

        // Provider one's early-closing offer is dropped by the mirrored
        // time-limit filter; provider two's 999 offer by the price cap.
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].price, Decimal::from(120));

        let forwarded = one.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(forwarded.max_price, Some(Decimal::from(500)));
        assert_eq!(forwarded.from, "MOW");
    }

    #[tokio::test]
    async fn aggregates_cover_price_and_trip_duration() {
        let base = now();
        let (service, _, _) = service(
            FakeProviderOne {
                routes: vec![p1_route(base, 60, 100), p1_route(base, 240, 300)],
                ..Default::default()
            },
            FakeProviderTwo::default(),
        );

        let response = service.search(&request(base)).await.unwrap();
        assert_eq!(response.min_price, Some(Decimal::from(100)));
        assert_eq!(response.max_price, Some(Decimal::from(300)));
        assert_eq!(response.min_minutes_route, Some(60));
        assert_eq!(response.max_minutes_route, Some(240));
    }
}
