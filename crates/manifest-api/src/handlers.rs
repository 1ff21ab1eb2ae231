//! The `POST /query/` handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use manifest_chart::{render_histogram, HistogramSpec};
use manifest_core::{Dataset, Intent, QueryAnswer, QueryRequest};
use tracing::{error, info, warn};

use crate::error::{ApiError, VisualizationError};
use crate::state::AppState;

/// POST /query/ - answer a question with a PNG histogram or agent text.
///
/// Questions containing a visualization keyword get the fixed passenger-age
/// histogram as `image/png`; everything else is forwarded verbatim to the
/// agent and wrapped as `{"answer": ...}`.
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "rejected query body");
        ApiError::UnprocessableEntity(rejection.body_text())
    })?;

    let started = Instant::now();
    let intent = Intent::classify(&request.question);
    info!(?intent, question_len = request.question.len(), "query received");

    match intent {
        Intent::Visualization => {
            let png = render_passenger_ages(Arc::clone(&state.dataset))
                .await
                .map_err(|e| {
                    error!(error = %e, "visualization failed");
                    ApiError::Internal(format!("Error generating visualization: {e}"))
                })?;
            info!(
                bytes = png.len(),
                latency_ms = started.elapsed().as_millis(),
                "visualization served"
            );
            Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
        }
        Intent::Analytical => {
            let answer = state.agent.answer(&request.question).await.map_err(|e| {
                error!(error = %e, "agent failed");
                ApiError::Internal(format!("Error processing query: {e}"))
            })?;
            info!(
                answer_len = answer.len(),
                latency_ms = started.elapsed().as_millis(),
                "answer served"
            );
            Ok(Json(QueryAnswer { answer }).into_response())
        }
    }
}

/// Render the fixed age histogram off the async executor.
async fn render_passenger_ages(dataset: Arc<Dataset>) -> Result<Vec<u8>, VisualizationError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, VisualizationError> {
        let spec = HistogramSpec::passenger_ages();
        let ages = dataset.numeric_column(spec.column)?;
        Ok(render_histogram(&ages, &spec)?)
    })
    .await
    .map_err(|e| VisualizationError::Task(e.to_string()))?
}
