use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::Uri,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::hierarchy::{Hierarchy, NewHierarchy};
use crate::item::{CiAttributes, CiPatch, ConfigItem};
use crate::server::{ApiError, ApiResponse, AppState};
use crate::service::{CiStore, HierarchyStore};

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

pub async fn create_ci(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CiAttributes>, JsonRejection>,
) -> ApiResult<ConfigItem> {
    let Json(attrs) = payload?;
    attrs.validate_for_create()?;

    let store = state.store.lock().await;
    let item = CiStore::new(&store).create(&attrs)?;
    Ok(ApiResponse::created(item, "CI created successfully"))
}

pub async fn get_all_cis(
    State(state): State<Arc<AppState>>,
    filters: Result<Query<CiAttributes>, QueryRejection>,
) -> ApiResult<Vec<ConfigItem>> {
    let Query(filters) = filters?;

    let store = state.store.lock().await;
    let items = CiStore::new(&store).get_all(&filters)?;
    Ok(ApiResponse::ok(items, "CIs retrieved successfully"))
}

pub async fn get_ci_by_id(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<ConfigItem> {
    let Path(id) = id?;

    let store = state.store.lock().await;
    let item = CiStore::new(&store)
        .get_by_id(id)?
        .ok_or_else(|| ApiError::NotFound("CI not found".to_string()))?;
    Ok(ApiResponse::ok(item, "CI retrieved successfully"))
}

pub async fn update_ci(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CiPatch>, JsonRejection>,
) -> ApiResult<ConfigItem> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate_for_update()?;

    let store = state.store.lock().await;
    let item = CiStore::new(&store)
        .update(id, &patch)?
        .ok_or_else(|| ApiError::NotFound("CI not found".to_string()))?;
    Ok(ApiResponse::ok(item, "CI updated successfully"))
}

pub async fn delete_ci(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;

    let store = state.store.lock().await;
    CiStore::new(&store).delete(id)?;
    Ok(ApiResponse::ok((), "CI deleted successfully"))
}

pub async fn create_hierarchy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewHierarchy>, JsonRejection>,
) -> ApiResult<Hierarchy> {
    let Json(edge) = payload?;
    edge.validate().map_err(crate::Error::from)?;

    let store = state.store.lock().await;
    let hierarchy = HierarchyStore::with_policy(&store, state.policy).create_hierarchy(&edge)?;
    Ok(ApiResponse::created(hierarchy, "Relationship created successfully"))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci_type::NewCiType;
    use crate::hierarchy::HierarchyPolicy;
    use crate::server::router;
    use crate::storage::SqliteStore;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with_policy(policy: HierarchyPolicy) -> axum::Router {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_type(&NewCiType::new(Some("server"), &["name"])).unwrap();
        router(Arc::new(AppState::new(store, policy)))
    }

    fn app() -> axum::Router {
        app_with_policy(HierarchyPolicy::default())
    }

    async fn send(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_create_returns_201_with_envelope() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "type_id": 1, "name": "TestCI", "environment": "DEV" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "CI created successfully");
        assert_eq!(body["data"]["name"], "TestCI");
        assert_eq!(body["data"]["environment"], "DEV");
        assert!(body["data"]["ci_id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_create_without_type_id_is_400() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "name": "NoTypeId" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_missing_mandatory_lists_fields() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "type_id": 1, "environment": "QA" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing_fields"], json!(["name"]));
    }

    #[tokio::test]
    async fn test_create_unknown_type_is_404() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "type_id": 77, "name": "x", "environment": "QA" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_filter_and_get_by_id() {
        let app = app();
        for (name, env) in [("a", "PROD"), ("b", "DEV"), ("c", "PROD")] {
            send(
                &app,
                Method::POST,
                "/config-items/create",
                Some(json!({ "type_id": 1, "name": name, "environment": env })),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/config-items/filter?environment=PROD", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|ci| ci["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "c"]);

        let (_, all) = send(&app, Method::GET, "/config-items/filter", None).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 3);

        let (status, bad) = send(&app, Method::GET, "/config-items/filter?color=red", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(bad["success"], false);

        let (status, one) = send(&app, Method::GET, "/config-items/get-byId/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["data"]["name"], "b");

        let (status, missing) = send(&app, Method::GET, "/config-items/get-byId/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["success"], false);
    }

    #[tokio::test]
    async fn test_filter_by_ci_id_and_timestamp_dates() {
        let app = app();
        for name in ["a", "b"] {
            send(
                &app,
                Method::POST,
                "/config-items/create",
                Some(json!({
                    "type_id": 1,
                    "name": name,
                    "environment": "QA",
                    "acquisition_date": "2024-01-15T10:00:00Z",
                })),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/config-items/filter?ci_id=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["ci_id"], 2);
        assert_eq!(data[0]["acquisition_date"], "2024-01-15");

        let (status, body) = send(
            &app,
            Method::GET,
            "/config-items/filter?acquisition_date=2024-01-15&ci_id=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "a");

        let (status, _) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "ci_id": 5, "type_id": 1, "name": "x", "environment": "QA" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "type_id": 1, "name": "x", "environment": "QA", "acquisition_date": "soon" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("expected YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/config-items/create",
            Some(json!({ "type_id": 1, "name": "A", "status": "up", "environment": "DEV" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/config-items/update/1",
            Some(json!({ "status": "down" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "A");
        assert_eq!(body["data"]["status"], "down");

        let (status, _) = send(&app, Method::PUT, "/config-items/update/1", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/config-items/update/999",
            Some(json!({ "status": "down" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for _ in 0..2 {
            let (status, body) = send(&app, Method::DELETE, "/config-items/delete/1", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_create_hierarchy() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create-hierarchy",
            Some(json!({ "parent_id": 1, "child_id": 2, "hierarchy_type": "hosts" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Relationship created successfully");
        assert_eq!(body["data"]["parent_id"], 1);
        assert_eq!(body["data"]["child_id"], 2);
        assert_eq!(body["data"]["hierarchy_type"], "hosts");
        assert!(body["data"]["hierarchy_id"].is_i64());

        let (status, _) = send(
            &app,
            Method::POST,
            "/config-items/create-hierarchy",
            Some(json!({ "parent_id": 1, "child_id": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_strict_policy_conflict() {
        let app = app_with_policy(HierarchyPolicy::strict());
        let (status, body) = send(
            &app,
            Method::POST,
            "/config-items/create-hierarchy",
            Some(json!({ "parent_id": 1, "child_id": 2, "hierarchy_type": "hosts" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route /nope not found");

        let (status, _) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
