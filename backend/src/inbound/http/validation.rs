//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper produces an `invalid_request` error whose details name the
//! offending field and a stable machine-readable code.

use pagination::{LimitBounds, PageRequest, PaginationError};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::points::PointsValidationError;
use crate::domain::{AccountValidationError, Error, LoginValidationError, UserId};

/// Bounds applied to list endpoints.
pub fn list_bounds() -> LimitBounds {
    LimitBounds::new(25, 100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    InvalidField,
    InvalidUuid,
    InvalidLimit,
    InvalidCursor,
}

impl Code {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidField => "invalid_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidLimit => "invalid_limit",
            Self::InvalidCursor => "invalid_cursor",
        }
    }
}

fn field_error(field: &str, code: Code, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code.as_str(),
    }))
}

pub(crate) fn account_error(err: AccountValidationError) -> Error {
    field_error(err.field(), Code::InvalidField, err.to_string())
}

pub(crate) fn points_error(err: PointsValidationError) -> Error {
    field_error(err.field(), Code::InvalidField, err.to_string())
}

pub(crate) fn login_error(err: LoginValidationError) -> Error {
    let field = match err {
        LoginValidationError::InvalidEmail => "email",
        LoginValidationError::EmptyRecoveryCode => "recoveryCode",
        LoginValidationError::InvalidToken => "token",
    };
    field_error(field, Code::InvalidField, err.to_string())
}

/// Parse a user id taken from the request path.
pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    raw.parse().map_err(|_| {
        Error::invalid_request("user id must be a valid UUID").with_details(json!({
            "field": "id",
            "value": raw,
            "code": Code::InvalidUuid.as_str(),
        }))
    })
}

/// `limit` and `cursor` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size, 1 to 100 (default 25).
    pub limit: Option<usize>,
    /// Opaque cursor from a previous page's `nextCursor`.
    pub cursor: Option<String>,
}

impl PageQuery {
    /// Validate into a page request for keys of type `K`.
    pub(crate) fn into_request<K: DeserializeOwned>(
        &self,
        bounds: LimitBounds,
    ) -> Result<PageRequest<K>, Error> {
        PageRequest::parse(self.limit, self.cursor.as_deref(), bounds).map_err(|err| match err {
            PaginationError::LimitOutOfRange { .. } => {
                field_error("limit", Code::InvalidLimit, err.to_string())
            }
            PaginationError::Cursor(_) => {
                field_error("cursor", Code::InvalidCursor, "cursor is invalid or expired")
            }
        })
    }
}
