use actix_web::http::StatusCode;
use actix_web::ResponseError;
use thiserror::Error;

use crate::pricing::PricingError;

/// Everything a handler can fail with. The Display text is the response
/// body, so messages are written for the person reading the client's error
/// banner.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Couldn't find the desired {0}")]
    NotFound(&'static str),
    #[error("Invalid invite code")]
    InvalidInviteCode,
    #[error("You are not a member of this group")]
    NotAMember,
    #[error("Only the group creator can do that")]
    CreatorOnly,
    #[error("No vendor selected for this group")]
    NoVendorSelected,
    #[error("This vendor currently offers no meal options")]
    EmptyCatalog,
    #[error("Special instructions exceed the {0} character limit")]
    InstructionsTooLong(usize),
    #[error("A {0} is required")]
    MissingField(&'static str),
    #[error("Missing or invalid session token")]
    Unauthorized,
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("{0}")]
    Store(#[from] mongodb::error::Error),
    #[error("{0}")]
    Encoding(#[from] bson::ser::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::InvalidInviteCode => StatusCode::NOT_FOUND,
            ApiError::NotAMember | ApiError::CreatorOnly => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NoVendorSelected
            | ApiError::EmptyCatalog
            | ApiError::InstructionsTooLong(_)
            | ApiError::MissingField(_) => StatusCode::BAD_REQUEST,
            // Stale selections are a conflict with the current catalog, not
            // a malformed request.
            ApiError::Pricing(PricingError::StaleAddOn(_)) => StatusCode::CONFLICT,
            ApiError::Pricing(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
