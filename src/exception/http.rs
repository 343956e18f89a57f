use crate::exception::{ApiError, ExceptionFilter};
use axum::response::{IntoResponse, Response};

/// Default exception filter.
///
/// An [`ApiError`] anywhere in the chain is answered verbatim. Everything
/// else is logged with its full cause chain and answered with a generic 500
/// that carries no internal detail.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpExceptionFilter;

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, error: anyhow::Error) -> Response {
        if let Some(api_error) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
            return api_error.clone().into_response();
        }

        tracing::error!("Unhandled exception: {error:#}");
        ApiError::internal().render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ErrorDetail;
    use axum::http::StatusCode;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn error_lines(error: anyhow::Error) -> Vec<String> {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            HttpExceptionFilter.catch(error);
        });
        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        text.lines()
            .filter(|line| line.contains("ERROR"))
            .map(str::to_string)
            .collect()
    }

    async fn body(response: Response) -> ErrorDetail {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_error_passes_through() {
        let error = anyhow::Error::new(ApiError::not_found().with_message("no such echo"));
        let response = HttpExceptionFilter.catch(error);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let detail = body(response).await;
        assert_eq!(detail.code, "not_found");
        assert_eq!(detail.message, "no such echo");
    }

    #[tokio::test]
    async fn test_wrapped_api_error_is_found() {
        let error = anyhow::Error::new(ApiError::conflict()).context("while saving");
        let response = HttpExceptionFilter.catch(error);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_untyped_error_is_hidden() {
        let error = anyhow::anyhow!("connection string postgres://secret@db failed");
        let response = HttpExceptionFilter.catch(error);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body(response).await;
        assert_eq!(detail.code, "internal_server_error");
        assert_eq!(detail.message, "An unexpected error occurred");
        assert!(detail.details.is_none());
    }

    #[test]
    fn test_untyped_error_is_logged_once() {
        let lines = error_lines(anyhow::anyhow!("pool exhausted"));
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("pool exhausted"));
    }

    #[test]
    fn test_server_api_error_is_logged_once() {
        let lines = error_lines(anyhow::Error::new(ApiError::service_unavailable()));
        assert_eq!(lines.len(), 1, "{lines:?}");
    }
}
