//! Shared request helpers and error mapping for gateway implementations.

use http::StatusCode;
use reqwest::{Client, Response};
use url::Url;

use crate::bitbucket::error::ExportError;
use crate::bitbucket::locator::Credentials;

/// Checks if a Bitbucket error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Issues an authenticated GET and surfaces non-success statuses as errors.
pub(super) async fn get_with_auth(
    client: &Client,
    url: Url,
    credentials: &Credentials,
    operation: &str,
) -> Result<Response, ExportError> {
    let response = client
        .get(url)
        .basic_auth(credentials.username(), Some(credentials.password()))
        .send()
        .await
        .map_err(|error| ExportError::Network {
            message: format!("{operation} failed: {error}"),
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_http_error(operation, status, extract_bitbucket_message(&body)))
}

pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> ExportError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_failure(status) {
        ExportError::Authentication {
            message: format!("{operation} failed: Bitbucket returned {status} {message}"),
        }
    } else {
        ExportError::Api {
            message: format!("{operation} failed with status {status}: {message}"),
        }
    }
}

/// Extracts the first error message from a Bitbucket error body.
///
/// The server wraps failures as `{"errors": [{"message": "..."}]}`.
pub(super) fn extract_bitbucket_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("errors")
        .and_then(serde_json::Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|entry| entry.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::{extract_bitbucket_message, map_http_error};
    use crate::bitbucket::error::ExportError;

    #[rstest]
    fn extracts_first_error_message() {
        let body = r#"{"errors": [{"message": "Repository does not exist"}]}"#;
        assert_eq!(
            extract_bitbucket_message(body).as_deref(),
            Some("Repository does not exist")
        );
    }

    #[rstest]
    #[case::not_json("<html>502</html>")]
    #[case::wrong_shape(r#"{"message": "flat"}"#)]
    fn returns_none_for_unrecognised_bodies(#[case] body: &str) {
        assert!(extract_bitbucket_message(body).is_none());
    }

    #[rstest]
    #[case::unauthorised(StatusCode::UNAUTHORIZED)]
    #[case::forbidden(StatusCode::FORBIDDEN)]
    fn auth_statuses_map_to_authentication_errors(#[case] status: StatusCode) {
        let error = map_http_error("list pull requests", status, None);
        assert!(matches!(error, ExportError::Authentication { .. }));
    }

    #[rstest]
    fn other_statuses_map_to_api_errors() {
        let error = map_http_error("fetch diff", StatusCode::NOT_FOUND, Some("gone".to_owned()));
        assert!(matches!(error, ExportError::Api { .. }));
    }
}
