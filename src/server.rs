// src/server.rs
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tracing::{debug, info, warn};
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use crate::{dashboard::Dashboard, filter::DashboardQuery, render::render_html};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "painel"
    })))
}

/// The query string as a batch of filter events over the default selection.
fn selection_for(query: &DashboardQuery) -> crate::Selection {
    let events = query.events();
    debug!(events = events.len(), "applying filter events");
    crate::Selection::from_events(events)
}

async fn dashboard_html(
    query: DashboardQuery,
    dashboard: Arc<Dashboard>,
) -> Result<impl Reply, Rejection> {
    let tree = dashboard.render(&selection_for(&query));
    Ok(warp::reply::html(render_html(&tree, dashboard.geometry())))
}

async fn dashboard_json(
    query: DashboardQuery,
    dashboard: Arc<Dashboard>,
) -> Result<impl Reply, Rejection> {
    let tree = dashboard.render(&selection_for(&query));
    Ok(warp::reply::json(&tree))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, error, details) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found", None)
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "invalid query", Some(e.to_string()))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed", None)
    } else {
        warn!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error", None)
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: error.to_string(),
            details,
        }),
        status,
    ))
}

fn with_dashboard(
    dashboard: Arc<Dashboard>,
) -> impl Filter<Extract = (Arc<Dashboard>,), Error = Infallible> + Clone {
    warp::any().map(move || dashboard.clone())
}

/// `GET /health`, `GET /` (HTML) and `GET /api/dashboard` (JSON).
pub fn routes(
    dashboard: Arc<Dashboard>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let index = warp::path::end()
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(with_dashboard(dashboard.clone()))
        .and_then(dashboard_html);

    let api = warp::path!("api" / "dashboard")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(with_dashboard(dashboard))
        .and_then(dashboard_json);

    health
        .or(index)
        .or(api)
        .with(warp::trace::request())
        .recover(handle_rejection)
}

pub async fn serve(dashboard: Arc<Dashboard>, addr: SocketAddr) {
    info!("Server starting on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Dashboard: http://{}/", addr);
    warp::serve(routes(dashboard)).run(addr).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::parse_csv,
        geo::GeoCollection,
        test_support::{SAMPLE_CSV, SAMPLE_GEOJSON},
    };
    use anyhow::Result;

    fn dashboard() -> Result<Arc<Dashboard>> {
        Ok(Arc::new(Dashboard::new(
            parse_csv(SAMPLE_CSV.as_bytes())?,
            Some(GeoCollection::from_json(SAMPLE_GEOJSON)?),
        )))
    }

    #[tokio::test]
    async fn test_health_check() -> Result<()> {
        let api = routes(dashboard()?);
        let res = warp::test::request().path("/health").reply(&api).await;
        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body())?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "painel");
        Ok(())
    }

    #[tokio::test]
    async fn test_api_applies_query_filters() -> Result<()> {
        let api = routes(dashboard()?);
        let res = warp::test::request()
            .path("/api/dashboard?year=2020&region=Acre&comparison_order=bottom&show_table=true")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body())?;
        assert_eq!(body["year"], 2020);
        assert_eq!(body["selection"]["region"]["name"], "Acre");
        assert_eq!(body["selection"]["comparison_order"], "bottom");
        assert_eq!(body["sections"].as_array().map(Vec::len), Some(7));
        assert_eq!(body["sections"][5]["body"]["kind"], "table");
        Ok(())
    }

    #[tokio::test]
    async fn test_api_lists_dropped_rows() -> Result<()> {
        let loaded = parse_csv("Ano,UF,Populacao_total\n2020,Acre,100\nx,Bahia,5\n".as_bytes())?;
        let api = routes(Arc::new(Dashboard::new(loaded, None)));
        let res = warp::test::request().path("/api/dashboard").reply(&api).await;
        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body())?;
        assert_eq!(
            body["dropped"],
            serde_json::json!([
                {"line": 3, "region": "Bahia", "reason": "invalid_year", "raw": "x"}
            ])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_index_serves_html() -> Result<()> {
        let api = routes(dashboard()?);
        let res = warp::test::request()
            .path("/?map_metric=Renda%20M%C3%A9dia%20Anual")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/html"));
        let body = String::from_utf8(res.body().to_vec())?;
        assert!(body.contains("Renda Média Anual por UF em 2021"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_query_is_rejected() -> Result<()> {
        let api = routes(dashboard()?);
        let res = warp::test::request()
            .path("/api/dashboard?year=dois-mil")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 400);
        let res = warp::test::request().path("/nada").reply(&api).await;
        assert_eq!(res.status(), 404);
        Ok(())
    }
}
