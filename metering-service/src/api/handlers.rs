use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use metering_client::{
    analytics::{self, Anomaly, AnomalyDetector, HouseholdStatistics},
    domain::ConsumptionItem,
    repository::Page,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    api::{ApiError, AppState, DEFAULT_PAGE_LIMIT},
    validation::{validate_ingest_counted, IncomingHouseholdConsumption},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub household_id: String,
    pub records: usize,
    pub household_created: bool,
}

#[derive(Debug, Serialize)]
pub struct AnomalyReport {
    pub household_id: String,
    pub threshold: f64,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ConsumptionPage {
    pub items: Vec<ConsumptionItem>,
    pub limit: u32,
    pub offset: u64,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<IncomingHouseholdConsumption>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    metrics::counter!("ingest_requests_total").increment(1);

    let Json(payload) = payload.map_err(|e| {
        metrics::counter!("validation_ingest_rejected_total").increment(1);
        ApiError::from(e)
    })?;

    let batch = validate_ingest_counted(payload)?;
    let outcome = state.store.ingest(batch).await?;

    metrics::counter!("ingest_records_total").increment(outcome.inserted as u64);
    tracing::info!(
        household_id = %outcome.household.household_id,
        records = outcome.inserted,
        created = outcome.created,
        "stored household consumption"
    );

    Ok(Json(IngestResponse {
        status: "stored".to_string(),
        household_id: outcome.household.household_id,
        records: outcome.inserted,
        household_created: outcome.created,
    }))
}

pub async fn household_statistics(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> Result<Json<HouseholdStatistics>, ApiError> {
    metrics::counter!("analytics_requests_total", "kind" => "statistics").increment(1);

    let stats = analytics::compute_statistics(state.store.as_ref(), &household_id).await?;
    Ok(Json(stats))
}

pub async fn household_anomalies(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    query: Result<Query<AnomalyQuery>, QueryRejection>,
) -> Result<Json<AnomalyReport>, ApiError> {
    metrics::counter!("analytics_requests_total", "kind" => "anomalies").increment(1);

    let Query(query) = query?;

    let detector = match query.threshold {
        Some(t) => AnomalyDetector::new(t)?,
        None => state.detector,
    };

    let anomalies = analytics::detect_anomalies(state.store.as_ref(), &household_id, &detector).await?;
    metrics::counter!("anomalies_flagged_total").increment(anomalies.len() as u64);

    Ok(Json(AnomalyReport {
        household_id,
        threshold: detector.threshold(),
        anomalies,
    }))
}

pub async fn list_consumption(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ConsumptionPage>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT.min(state.max_page_size));
    let offset = query.offset.unwrap_or(0);

    if limit == 0 || limit > state.max_page_size {
        return Err(ApiError::Unprocessable(format!(
            "limit must be between 1 and {}, got {limit}",
            state.max_page_size
        )));
    }

    let items = state.store.list_consumption(Page { limit, offset }).await?;
    Ok(Json(ConsumptionPage { items, limit, offset }))
}

pub async fn delete_household(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_household(&household_id).await? {
        return Err(ApiError::NotFound(format!("household '{household_id}' not found")));
    }

    tracing::info!(household_id = %household_id, "deleted household and its consumption");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use metering_client::{db::InMemoryRepository, AnomalyDetector};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::{router, AppState};

    fn app() -> Router {
        let state = AppState::new(Arc::new(InMemoryRepository::new()), AnomalyDetector::default(), 1000);
        router(state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn ingest_payload(household_id: &str, values: &[f64]) -> Value {
        let consumption: Vec<Value> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                json!({
                    "consumption_type": "Import",
                    "consumption_value": v,
                    "consumption_date": format!("2025-01-{:02}", i + 1),
                })
            })
            .collect();
        json!({
            "household_id": household_id,
            "meter_point_id": 9_999_999_999_999_u64,
            "consumption": consumption,
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn ingest_valid_payload_is_stored() {
        let app = app();
        let (status, body) = send(&app, post_json("/ingest", &ingest_payload("ZZZZZZZZZZ", &[1.5]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "stored");
        assert_eq!(body["records"], 1);
        assert_eq!(body["household_created"], true);

        let (_, again) = send(&app, post_json("/ingest", &ingest_payload("ZZZZZZZZZZ", &[2.0]))).await;
        assert_eq!(again["household_created"], false);
    }

    #[tokio::test]
    async fn ingest_invalid_household_id_is_unprocessable() {
        let (status, body) = send(&app(), post_json("/ingest", &ingest_payload("SHORT", &[1.5]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("household_id"));
    }

    #[tokio::test]
    async fn ingest_non_positive_value_is_unprocessable() {
        let (status, _) = send(&app(), post_json("/ingest", &ingest_payload("ZZZZZZZZZZ", &[1.0, -4.0]))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn ingest_unknown_consumption_type_is_rejected() {
        let mut payload = ingest_payload("ZZZZZZZZZZ", &[1.0]);
        payload["consumption"][0]["consumption_type"] = json!("Sideways");
        let (status, body) = send(&app(), post_json("/ingest", &payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("Sideways"));
    }

    #[tokio::test]
    async fn ingest_malformed_json_is_unprocessable_with_detail() {
        let req = Request::builder()
            .method("POST")
            .uri("/ingest")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let req = Request::builder()
            .method("POST")
            .uri("/ingest")
            .body(Body::from(ingest_payload("ZZZZZZZZZZ", &[1.0]).to_string()))
            .unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn statistics_not_found() {
        let (status, body) = send(&app(), get("/statistics/household/DOESNOTEXIST")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn statistics_for_ingested_household() {
        let app = app();
        send(&app, post_json("/ingest", &ingest_payload("HOUSE00001", &[1.0, 3.0, 2.0]))).await;

        let (status, body) = send(&app, get("/statistics/household/HOUSE00001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["household_id"], "HOUSE00001");
        assert_eq!(body["total_consumption"], 6.0);
        assert_eq!(body["mean_consumption"], 2.0);
        assert_eq!(body["peak_value"], 3.0);
        assert_eq!(body["peak_day"], "2025-01-02");
    }

    #[tokio::test]
    async fn anomalies_use_default_and_query_threshold() {
        let app = app();
        send(
            &app,
            post_json("/ingest", &ingest_payload("HOUSE00001", &[10.0, 12.0, 11.0, 13.0, 9.0, 500.0])),
        )
        .await;

        let (status, body) = send(&app, get("/anomalies/household/HOUSE00001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["threshold"], 3.5);
        assert_eq!(
            body["anomalies"],
            json!([{ "date": "2025-01-06", "value": 500.0, "score": 219.66 }])
        );

        let (_, loose) = send(&app, get("/anomalies/household/HOUSE00001?threshold=1.0")).await;
        assert_eq!(loose["anomalies"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn anomalies_reject_non_positive_threshold() {
        let app = app();
        send(&app, post_json("/ingest", &ingest_payload("HOUSE00001", &[1.0, 2.0]))).await;

        let (status, _) = send(&app, get("/anomalies/household/HOUSE00001?threshold=0")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn anomalies_reject_non_numeric_threshold_with_detail() {
        let app = app();
        send(&app, post_json("/ingest", &ingest_payload("HOUSE00001", &[1.0, 2.0]))).await;

        let (status, body) = send(&app, get("/anomalies/household/HOUSE00001?threshold=abc")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn anomalies_not_found() {
        let (status, _) = send(&app(), get("/anomalies/household/DOESNOTEXI")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn consumption_pagination() {
        let app = app();
        send(&app, post_json("/ingest", &ingest_payload("HOUSE00001", &[1.0, 2.0, 3.0]))).await;

        let (status, body) = send(&app, get("/consumption?limit=1&offset=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], 1);
        assert_eq!(body["offset"], 0);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["household_id"], "HOUSE00001");
        assert_eq!(body["items"][0]["consumption_type"], "Import");

        let (_, rest) = send(&app, get("/consumption?limit=10&offset=1")).await;
        assert_eq!(rest["items"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, get("/consumption?limit=0")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&app, get("/consumption?limit=1001")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, body) = send(&app, get("/consumption?limit=-1")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn delete_household_cascades() {
        let app = app();
        send(&app, post_json("/ingest", &ingest_payload("HOUSE00001", &[1.0]))).await;

        let req = Request::builder()
            .method("DELETE")
            .uri("/households/HOUSE00001")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get("/statistics/household/HOUSE00001")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, page) = send(&app, get("/consumption")).await;
        assert!(page["items"].as_array().unwrap().is_empty());

        let req = Request::builder()
            .method("DELETE")
            .uri("/households/HOUSE00001")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
