//! REST API exposure
//!
//! Translates HTTP requests into [`ResourceRequest`]s, runs them through a
//! [`ResourceController`] and maps the outcome back onto HTTP:
//!
//! | Route                   | Operation | Success |
//! |-------------------------|-----------|---------|
//! | `GET /{plural}`         | list      | 200     |
//! | `GET /{plural}/{id}`    | get       | 200     |
//! | `POST /{plural}`        | create    | 201     |
//! | `POST /{plural}/{id}`   | update    | 200     |
//! | `DELETE /{plural}/{id}` | delete    | 200     |
//!
//! Query string parameters are passed through as request parameters; the path
//! `id` overrides a query parameter of the same name.

use crate::controller::{ResourceController, Submission};
use crate::core::entity::Entity;
use crate::core::error::ResourceResult;
use crate::core::request::ResourceRequest;
use crate::server::resource_registry::ResourceRegistry;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

type Params = HashMap<String, String>;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router: health checks, every registered resource, then
    /// the custom routes
    pub fn build_router(registry: &ResourceRegistry, custom_routes: Vec<Router>) -> Router {
        let app = Self::health_routes().merge(registry.build_routes());

        custom_routes
            .into_iter()
            .fold(app, |app, custom_router| app.merge(custom_router))
    }

    /// Routes for one controller mounted under `/{plural}`
    pub fn resource_routes<T: Entity>(
        plural: &str,
        controller: Arc<ResourceController<T>>,
    ) -> Router {
        let collection = format!("/{}", plural);
        let item = format!("/{}/{{id}}", plural);

        Router::new()
            .route(&collection, get(list::<T>).post(create::<T>))
            .route(&item, get(show::<T>).post(update::<T>).delete(delete::<T>))
            .with_state(controller)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "resource-controller"
        }))
    }
}

async fn list<T: Entity>(
    State(controller): State<Arc<ResourceController<T>>>,
) -> ResourceResult<Json<Vec<T>>> {
    Ok(Json(controller.list().await?))
}

async fn show<T: Entity>(
    State(controller): State<Arc<ResourceController<T>>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ResourceResult<Json<T>> {
    let request = build_request(method, params, Some(id), None);
    Ok(Json(controller.get(&request).await?))
}

async fn create<T: Entity>(
    State(controller): State<Arc<ResourceController<T>>>,
    method: Method,
    Query(params): Query<Params>,
    body: Bytes,
) -> ResourceResult<Response> {
    let request = build_request(method, params, None, parse_body(&body)?);
    let submission = controller.create(&request).await?;
    Ok(submission_response(submission, StatusCode::CREATED))
}

async fn update<T: Entity>(
    State(controller): State<Arc<ResourceController<T>>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<Params>,
    body: Bytes,
) -> ResourceResult<Response> {
    let request = build_request(method, params, Some(id), parse_body(&body)?);
    let submission = controller.update(&request).await?;
    Ok(submission_response(submission, StatusCode::OK))
}

async fn delete<T: Entity>(
    State(controller): State<Arc<ResourceController<T>>>,
    method: Method,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ResourceResult<Json<T>> {
    let request = build_request(method, params, Some(id), None);
    Ok(Json(controller.delete(&request).await?))
}

fn build_request(
    method: Method,
    params: Params,
    id: Option<String>,
    payload: Option<Value>,
) -> ResourceRequest {
    let mut request = params
        .into_iter()
        .fold(ResourceRequest::new(method), |request, (name, value)| {
            request.with_param(name, value)
        });

    if let Some(id) = id {
        request = request.with_id(id);
    }
    if let Some(payload) = payload {
        request = request.with_payload(payload);
    }
    request
}

/// An empty body carries no payload; anything else must be JSON
fn parse_body(body: &Bytes) -> ResourceResult<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(body)?))
}

fn submission_response<T: Entity>(submission: Submission<T>, status: StatusCode) -> Response {
    match submission {
        Ok(entity) => (status, Json(entity)).into_response(),
        Err(errors) => errors.into_response(),
    }
}
