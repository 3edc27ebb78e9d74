use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue, Method, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::{
    ConvertRequest, HealthResponse, IndexResponse, NotFoundResponse, StatusResponse,
    AVAILABLE_ENDPOINTS,
};

pub const WARNINGS_HEADER: HeaderName = HeaderName::from_static("x-mjml-warnings");

/// `GET /` - what this service offers.
pub async fn index() -> Json<IndexResponse> {
    let endpoints = BTreeMap::from([
        ("status", "GET /status"),
        ("convert", "POST /convert"),
        ("health", "GET /health"),
    ]);

    Json(IndexResponse {
        message: "MJML to HTML Converter API",
        status: "online",
        endpoints,
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn status(State(app_state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Server is running",
        port: app_state.port,
        environment: app_state.environment.to_string(),
    })
}

/// `POST /convert` - fetches the MJML behind `url` and answers with HTML.
pub async fn convert_mjml(
    State(app_state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // a body that isn't declared as JSON carries no url
        Err(JsonRejection::MissingJsonContentType(_)) => ConvertRequest::default(),
        Err(rejection) => {
            return Err(AppError::invalid_input(
                "Invalid request body",
                rejection.body_text(),
            ))
        }
    };
    let url = require_url(request.url.as_ref())?;

    info!(url, "Converting MJML from URL");

    let mjml_content = app_state.fetcher.fetch(url).await?;
    let rendered = app_state
        .renderer
        .render(&mjml_content, request.payload.as_ref())?;

    let mut response = Html(rendered.html).into_response();
    response
        .headers_mut()
        .insert(WARNINGS_HEADER, HeaderValue::from(rendered.warnings.len()));
    Ok(response)
}

/// Missing, null, empty and falsy values all count as "no URL".
fn require_url(url: Option<&Value>) -> Result<&str, AppError> {
    match url {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Err(missing_url()),
        Some(Value::String(s)) if s.is_empty() => Err(missing_url()),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(AppError::invalid_input("Invalid URL", "URL must be a string")),
    }
}

fn missing_url() -> AppError {
    AppError::invalid_input("URL is required", "Please provide a URL in the request body")
}

pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Route not found",
            path: uri.path().to_string(),
            method: method.to_string(),
            available_endpoints: AVAILABLE_ENDPOINTS,
        }),
    )
}
