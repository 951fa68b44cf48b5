//! Request counters and latency histograms for every QA Toolsmith route.
//!
//! Entries, notes and other `{id}` routes are labelled by their pattern, so
//! the series count stays bounded however many KB entries exist.

use crate::{services::AppMetrics, utils::route::extract_route_pattern};
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    time::Instant,
};

/// Wraps the app and feeds [`AppMetrics`] after each response
///
/// Does nothing when `AppMetrics` is not registered as app data.
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestMetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsService { inner: service }))
    }
}

pub struct RequestMetricsService<S> {
    inner: S,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(inner);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().as_str().to_owned();
        let pending = self.inner.call(req);

        Box::pin(async move {
            let res = pending.await?;
            let elapsed = started.elapsed();

            // Read after routing: before it, `match_pattern` is still empty.
            let request = res.request();
            if let Some(metrics) = request.app_data::<web::Data<AppMetrics>>() {
                let route = extract_route_pattern(request);
                metrics.record_request(&method, &route, res.status().as_u16(), elapsed);
                metrics.update_uptime();
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test};

    #[actix_web::test]
    async fn test_entry_routes_are_labelled_by_pattern() {
        let metrics = AppMetrics::new().unwrap();
        let app = test::init_service(
            App::new()
                .wrap(MetricsMiddleware)
                .app_data(web::Data::new(metrics.clone()))
                .route(
                    "/api/kb/entries/{id}",
                    web::get().to(|| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;

        for id in ["0b6c5e4a-1111-4c57-9d0b-8e4b0f6a2f11", "7f3e2d1c-2222-4c57-9d0b-8e4b0f6a2f11"] {
            let req = test::TestRequest::get()
                .uri(&format!("/api/kb/entries/{id}"))
                .to_request();
            test::call_service(&app, req).await;
        }

        let output = metrics.render().unwrap();
        assert!(output.contains("route=\"/api/kb/entries/{id}\""));
        assert!(!output.contains("0b6c5e4a"));
    }
}
