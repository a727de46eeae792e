use super::{
    ProviderError, ProviderOneApi, ProviderOneRoute, ProviderOneSearchRequest,
    ProviderOneSearchResponse, ProviderTwoApi, ProviderTwoPoint, ProviderTwoRoute,
    ProviderTwoSearchRequest, ProviderTwoSearchResponse,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

// In-process stand-ins for the upstream providers so the server can run
// without real endpoints (USE_MOCK_PROVIDERS=true).

pub struct MockProviderOne;

pub struct MockProviderTwo;

fn departure_times(date: NaiveDate) -> Vec<NaiveDateTime> {
    [7, 10, 14, 19]
        .iter()
        .filter_map(|hour| date.and_hms_opt(*hour, 0, 0))
        .collect()
}

fn mock_price(base: i64) -> Decimal {
    Decimal::from(base + fastrand::i64(0..40))
}

fn booking_deadline(departure: NaiveDateTime) -> NaiveDateTime {
    departure - Duration::hours(2)
}

#[async_trait]
impl ProviderOneApi for MockProviderOne {
    async fn search(
        &self,
        request: &ProviderOneSearchRequest,
    ) -> Result<ProviderOneSearchResponse, ProviderError> {
        let routes = departure_times(request.date_from)
            .into_iter()
            .map(|departure| ProviderOneRoute {
                from: request.from.clone(),
                to: request.to.clone(),
                date_from: departure,
                date_to: departure + Duration::hours(fastrand::i64(2..8)),
                price: mock_price(100),
                time_limit: booking_deadline(departure),
            })
            .filter(|route| {
                request
                    .max_price
                    .map_or(true, |max_price| route.price <= max_price)
            })
            .collect();

        Ok(ProviderOneSearchResponse { routes })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl ProviderTwoApi for MockProviderTwo {
    async fn search(
        &self,
        request: &ProviderTwoSearchRequest,
    ) -> Result<ProviderTwoSearchResponse, ProviderError> {
        let routes = departure_times(request.departure_date)
            .into_iter()
            .map(|departure| ProviderTwoRoute {
                departure: ProviderTwoPoint {
                    point: request.departure.clone(),
                    date: departure,
                },
                arrival: ProviderTwoPoint {
                    point: request.arrival.clone(),
                    date: departure + Duration::hours(fastrand::i64(2..8)),
                },
                price: mock_price(90),
                time_limit: booking_deadline(departure),
            })
            .filter(|route| {
                request
                    .min_time_limit
                    .map_or(true, |min| route.time_limit >= min)
            })
            .collect();

        Ok(ProviderTwoSearchResponse { routes })
    }

    async fn is_available(&self) -> bool {
        true
    }
}
