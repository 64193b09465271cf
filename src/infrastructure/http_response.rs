// HTTP response utilities for dashboard errors
use crate::domain::error::DashboardError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Dashboard(DashboardError),
    NotFound(String),
}

impl From<DashboardError> for ApiError {
    fn from(error: DashboardError) -> Self {
        ApiError::Dashboard(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dashboard(error) => match error {
                DashboardError::DocumentLoad { .. } => StatusCode::NOT_FOUND,
                DashboardError::ActionUnavailable { .. } => StatusCode::CONFLICT,
                DashboardError::UnknownFilterField(_)
                | DashboardError::MissingFilter(_)
                | DashboardError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DashboardError::SettingsLoad { .. }
                | DashboardError::DataFetch { .. }
                | DashboardError::Persist { .. } => StatusCode::BAD_GATEWAY,
                DashboardError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Dashboard(error) => error.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::NotFound(what) => format!("{} not found", what),
            ApiError::Dashboard(error) => error.to_string(),
        };
        let body = Json(json!({ "error": self.kind(), "message": message }));
        (status, body).into_response()
    }
}
