// Query, path and JSON extractors whose rejections use the `{"detail": ...}` error body.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(query)) => Ok(Query(query)),
            Err(rejection) => Err(query_error(rejection)),
        }
    }
}

fn query_error(rejection: QueryRejection) -> ApiError {
    tracing::debug!("Query parameter parsing failed: {rejection}");
    match rejection {
        QueryRejection::FailedToDeserializeQueryString(err) => {
            ApiError::validation(format!("Invalid query parameters: {}", err.body_text()))
        }
        other => ApiError::validation(other.body_text()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(path_error(rejection)),
        }
    }
}

fn path_error(rejection: PathRejection) -> ApiError {
    tracing::debug!("Path parameter parsing failed: {rejection}");
    match rejection {
        PathRejection::FailedToDeserializePathParams(err) => {
            ApiError::validation(format!("Invalid path parameters: {}", err.body_text()))
        }
        other => ApiError::validation(other.body_text()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(json_error(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

fn json_error(rejection: JsonRejection) -> ApiError {
    tracing::debug!("JSON body parsing failed: {rejection}");
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::validation("Expected a request with Content-Type: application/json")
        }
        other => ApiError::validation(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct Params {
        id: Uuid,
    }

    #[tokio::test]
    async fn test_query_rejection_is_validation_error() {
        let req = axum::http::Request::builder()
            .uri("/x?id=not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let result = Query::<Params>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_path_rejection_is_validation_error() {
        use axum::{routing::get, Router};
        use tower::ServiceExt;

        async fn show(Path(id): Path<i64>) -> String {
            id.to_string()
        }

        let app = Router::new().route("/items/{id}", get(show));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/items/not-a-number")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_json_without_content_type() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/x")
            .body(Body::from(r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8"}"#))
            .unwrap();
        let result = Json::<Params>::from_request(req, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
