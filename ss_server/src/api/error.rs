//! HTTP error responses.
//!
//! Every handler returns `Result<_, ApiError>`. Domain errors convert into
//! an `ApiError` carrying the status code and a client-safe message; server
//! errors are logged here and never expose their source to the client.
//! Request bodies go through [`ApiJson`] so a body that does not
//! deserialize is reported like any other validation failure.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use smartsport::{
    FieldErrors,
    auth::{AuthError, Denied},
    dashboard::DashboardError,
    directory::DirectoryError,
    faq::FaqError,
    matches::MatchError,
    payment::PaymentError,
    registration::RegistrationError,
    team::TeamError,
    tournament::TournamentError,
};

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// 400 with per-field messages
    Validation(FieldErrors),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    TooManyRequests,
    /// 500; the detail is logged, not returned
    Internal(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(fields) => ErrorResponse {
                error: "Invalid input".to_string(),
                fields: Some(fields),
            },
            ApiError::Internal(detail) => {
                tracing::error!(status = status.as_u16(), error = %detail, "Request failed");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    fields: None,
                }
            }
            ApiError::TooManyRequests => ErrorResponse {
                error: "Too many requests, try again later".to_string(),
                fields: None,
            },
            ApiError::BadRequest(error)
            | ApiError::Unauthorized(error)
            | ApiError::Forbidden(error)
            | ApiError::NotFound(error) => ErrorResponse {
                error,
                fields: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

/// JSON body extractor that rejects with [`ApiError`] instead of axum's
/// plain-text 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Key for errors that belong to the body as a whole
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let text = err.body_text();
                let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(&text);
                let (field, message) = data_error_field(detail);
                ApiError::Validation(FieldErrors::single(field, message))
            }
            JsonRejection::JsonSyntaxError(_) => ApiError::Validation(FieldErrors::single(
                NON_FIELD_ERRORS,
                "JSON parse error: the request body is not valid JSON.",
            )),
            JsonRejection::MissingJsonContentType(_) => ApiError::BadRequest(
                "Unsupported media type: expected `Content-Type: application/json`.".to_string(),
            ),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

/// Split a deserialization message of the form `path: detail` into the
/// offending field and a message for it.
fn data_error_field(detail: &str) -> (String, String) {
    let (path, message) = match detail.split_once(": ") {
        Some((path, message)) if is_field_path(path) => (Some(path), message),
        _ => (None, detail),
    };
    // serde_json appends the position, which means nothing to a form
    let message = message
        .rfind(" at line ")
        .map_or(message, |at| &message[..at]);

    if let Some(rest) = message.strip_prefix("missing field `") {
        let name = rest.split('`').next().unwrap_or_default();
        let field = match path {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        return (field, "This field is required.".to_string());
    }
    match path {
        Some(path) => (path.to_string(), message.to_string()),
        None => (NON_FIELD_ERRORS.to_string(), message.to_string()),
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '?'))
}

impl From<Denied> for ApiError {
    fn from(denied: Denied) -> Self {
        crate::logging::log_security_event("forbidden", None, None, &denied.to_string());
        ApiError::Forbidden("You do not have permission to perform this action.".to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.client_message();
        match err {
            AuthError::Validation(fields) => ApiError::Validation(fields),
            AuthError::UserNotFound => ApiError::NotFound(message),
            AuthError::InvalidPassword
            | AuthError::JwtError(_)
            | AuthError::SessionExpired
            | AuthError::InvalidRefreshToken => ApiError::Unauthorized(message),
            AuthError::AccountDisabled | AuthError::RoleNotSelfAssignable(_) => {
                ApiError::Forbidden(message)
            }
            AuthError::Database(e) => ApiError::Internal(e.to_string()),
            AuthError::HashingFailed => ApiError::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let message = err.client_message();
        match err {
            DirectoryError::Account(e) => e.into(),
            DirectoryError::Validation(fields) => ApiError::Validation(fields),
            DirectoryError::UserNotFound(_) | DirectoryError::ProfileNotFound { .. } => {
                ApiError::NotFound(message)
            }
            DirectoryError::Forbidden(_) => ApiError::Forbidden(message),
            DirectoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TeamError> for ApiError {
    fn from(err: TeamError) -> Self {
        let message = err.client_message();
        match err {
            TeamError::Validation(fields) => ApiError::Validation(fields),
            TeamError::TeamNotFound(_) | TeamError::MemberNotFound(_) => {
                ApiError::NotFound(message)
            }
            TeamError::Forbidden(_) => ApiError::Forbidden(message),
            TeamError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        let message = err.client_message();
        match err {
            TournamentError::Validation(fields) => ApiError::Validation(fields),
            TournamentError::InvalidTransition { .. } => ApiError::BadRequest(message),
            TournamentError::NotFound(_) => ApiError::NotFound(message),
            TournamentError::Forbidden(_) => ApiError::Forbidden(message),
            TournamentError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        let message = err.client_message();
        match err {
            RegistrationError::Validation(fields) => ApiError::Validation(fields),
            RegistrationError::NotFound(_) | RegistrationError::TournamentNotFound(_) => {
                ApiError::NotFound(message)
            }
            RegistrationError::Forbidden(_) => ApiError::Forbidden(message),
            RegistrationError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        let message = err.client_message();
        match err {
            MatchError::Validation(fields) => ApiError::Validation(fields),
            MatchError::NotFound(_) | MatchError::TournamentNotFound(_) => {
                ApiError::NotFound(message)
            }
            MatchError::Forbidden(_) => ApiError::Forbidden(message),
            MatchError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let message = err.client_message();
        match err {
            PaymentError::Validation(fields) => ApiError::Validation(fields),
            PaymentError::NotFound(_) => ApiError::NotFound(message),
            PaymentError::Forbidden(_) => ApiError::Forbidden(message),
            PaymentError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<FaqError> for ApiError {
    fn from(err: FaqError) -> Self {
        let message = err.client_message();
        match err {
            FaqError::Validation(fields) => ApiError::Validation(fields),
            FaqError::CategoryNotFound(_) | FaqError::EntryNotFound(_) => {
                ApiError::NotFound(message)
            }
            FaqError::Forbidden(_) => ApiError::Forbidden(message),
            FaqError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let message = err.client_message();
        match err {
            DashboardError::Forbidden(_) => ApiError::Forbidden(message),
            DashboardError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let response =
            ApiError::from(FieldErrors::single("ends_at", "must be after starts_at")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["fields"]["ends_at"][0], "must be after starts_at");
    }

    #[tokio::test]
    async fn test_internal_errors_are_sanitized() {
        let response = ApiError::Internal("relation \"users\" does not exist".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("relation"));
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(ApiError::from(AuthError::UserNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AuthError::InvalidPassword).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::RoleNotSelfAssignable(smartsport::auth::Role::Administrator))
                .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_invalid_transition_is_bad_request() {
        use smartsport::tournament::TournamentStatus;
        let err = TournamentError::InvalidTransition {
            from: TournamentStatus::Finished,
            to: TournamentStatus::Ongoing,
        };
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_data_error_names_the_field() {
        assert_eq!(
            data_error_field("starts_at: input contains invalid characters at line 1 column 42"),
            ("starts_at".to_string(), "input contains invalid characters".to_string())
        );
        let (field, _) = data_error_field(
            "format: unknown variant `swiss`, expected one of `elimination`, `round_robin`",
        );
        assert_eq!(field, "format");
    }

    #[test]
    fn test_missing_field_is_required() {
        assert_eq!(
            data_error_field("missing field `starts_at` at line 1 column 61"),
            ("starts_at".to_string(), "This field is required.".to_string())
        );
        assert_eq!(data_error_field("form: missing field `alias`").0, "form.alias");
    }

    #[test]
    fn test_pathless_type_error_is_non_field() {
        let (field, message) = data_error_field(
            "invalid type: sequence, expected struct NewTournament at line 1 column 1",
        );
        assert_eq!(field, NON_FIELD_ERRORS);
        assert_eq!(message, "invalid type: sequence, expected struct NewTournament");
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_validation_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Window {
            #[allow(dead_code)]
            starts_at: chrono::DateTime<chrono::Utc>,
        }

        let request = axum::http::Request::builder()
            .method("POST")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"starts_at":"not-a-date"}"#))
            .unwrap();
        let err = ApiJson::<Window>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::Validation(fields) => assert!(fields.contains("starts_at")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
