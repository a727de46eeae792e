use crate::model::{FilterBounds, Route, RouteContent, RouteKey, SearchRequest};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Concurrent, dual-indexed route store.
///
/// The outer map groups routes by (origin, destination, departure date); the
/// inner map is keyed by identity-ignoring content, so `get_or_add` can hand
/// back the canonical record for content it has already seen. There is no
/// global lock: each key's inner map is safe for independent concurrent
/// mutation, and the background sweep touches one key at a time.
pub struct RouteCache {
    index: DashMap<RouteKey, DashMap<RouteContent, Route>>,
    bounds: FilterBounds,
}

impl RouteCache {
    pub fn new(bounds: FilterBounds) -> Self {
        Self {
            index: DashMap::new(),
            bounds,
        }
    }

    /// Inserts the route if its content is new under its key, otherwise
    /// returns the already-stored canonical route with its original id.
    /// Callers must discard their own instance in favor of the returned one.
    pub fn get_or_add(&self, route: Route) -> Route {
        let content = route.content();
        let routes = self.index.entry(route.key()).or_default();
        // The inner guard borrows the outer one; clone out before both drop.
        let canonical = routes.entry(content).or_insert(route).value().clone();
        canonical
    }

    /// Exact-key lookup with conjunctive filter application. An unknown key
    /// yields an empty result, never an error.
    pub fn find_cached_routes(&self, request: &SearchRequest) -> Vec<Route> {
        let key = RouteKey::new(
            &request.origin,
            &request.destination,
            request.origin_date_time,
        );

        let Some(routes) = self.index.get(&key) else {
            return Vec::new();
        };

        let mut result: Vec<Route> = routes.iter().map(|entry| entry.value().clone()).collect();
        drop(routes);

        if let Some(filters) = &request.filters {
            if let Some(date) = filters.destination_date_time {
                result.retain(|r| r.destination_date_time.date() == date);
            }
            if let Some(max_price) = filters.max_price {
                result.retain(|r| self.bounds.price_within(r.price, max_price));
            }
            if let Some(min_time_limit) = filters.min_time_limit {
                result.retain(|r| self.bounds.time_limit_within(r.time_limit, min_time_limit));
            }
        }

        result.sort_by_key(|r| {
            (
                r.origin_date_time,
                r.destination_date_time,
                r.price,
                r.time_limit,
            )
        });
        result
    }

    /// Removes every route whose time limit has passed `now`. The key set is
    /// snapshotted before iteration, and expired entries are collected per
    /// key before removal, so the scan never mutates a live enumeration.
    /// Routes inserted mid-scan may be missed until the next pass.
    pub fn sweep(&self, now: NaiveDateTime) {
        let keys: Vec<RouteKey> = self.index.iter().map(|entry| entry.key().clone()).collect();

        let mut removed = 0usize;
        for key in keys {
            let Some(routes) = self.index.get(&key) else {
                continue;
            };

            let expired: Vec<RouteContent> = routes
                .iter()
                .filter(|entry| entry.value().time_limit < now)
                .map(|entry| entry.key().clone())
                .collect();

            for content in expired {
                if routes.remove(&content).is_some() {
                    removed += 1;
                }
            }
            // Emptied inner maps stay in place; they are cheap and the key
            // will likely be searched again.
        }

        if removed > 0 {
            tracing::debug!("evicted {removed} expired routes");
        }
    }

    /// Long-lived eviction task. A panic in one pass is logged and the timer
    /// keeps running; a single bad sweep must not stop future sweeps.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let now = chrono::Local::now().naive_local();
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.sweep(now))) {
                tracing::error!("cache sweep failed: {panic:?}");
            }
        }
    }
}
