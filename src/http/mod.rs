//! HTTP/1.1 protocol types and parsing.
//!
//! This module provides the request and response ports the resolver talks to:
//! [`Method`], [`StatusCode`], [`Headers`], [`Request`], and [`Response`].

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::{Body, Response};

/// An HTTP response status code.
///
/// Only the codes the file server can produce are represented. Redirect rules
/// deserialize their `type` field straight into this enum, so an unsupported
/// code is rejected when the configuration is loaded.
///
/// # Examples
///
/// ```
/// use rserve::http::StatusCode;
///
/// let status = StatusCode::Ok;
/// assert_eq!(status.as_u16(), 200);
/// assert_eq!(status.canonical_reason(), "OK");
/// assert!(status.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u16")]
#[repr(u16)]
pub enum StatusCode {
    // 2xx Success
    Ok = 200,

    // 3xx Redirection
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,

    // 4xx Client Error
    BadRequest = 400,
    NotFound = 404,
    PayloadTooLarge = 413,

    // 5xx Server Error
    InternalServerError = 500,
}

/// Returned when a numeric code has no [`StatusCode`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported status code {0}")]
pub struct InvalidStatusCode(pub u16);

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns `true` for 2xx codes.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Returns `true` for 3xx codes.
    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.as_u16())
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::MovedPermanently => "Moved Permanently",
            Self::Found => "Found",
            Self::SeeOther => "See Other",
            Self::TemporaryRedirect => "Temporary Redirect",
            Self::PermanentRedirect => "Permanent Redirect",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::InternalServerError => "Internal Server Error",
        }
    }

    /// Machine-readable error code used in JSON error bodies, e.g. `not_found`.
    pub fn error_code(self) -> String {
        self.canonical_reason().to_ascii_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = InvalidStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            200 => Self::Ok,
            301 => Self::MovedPermanently,
            302 => Self::Found,
            303 => Self::SeeOther,
            307 => Self::TemporaryRedirect,
            308 => Self::PermanentRedirect,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            413 => Self::PayloadTooLarge,
            500 => Self::InternalServerError,
            other => return Err(InvalidStatusCode(other)),
        })
    }
}

/// An HTTP request method.
///
/// The resolver treats every method like `GET`, except that `HEAD` responses
/// carry headers only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    /// Any other method, kept verbatim.
    Other(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            other => Self::Other(other.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_u16() {
        assert_eq!(StatusCode::try_from(302), Ok(StatusCode::Found));
        assert_eq!(StatusCode::try_from(418), Err(InvalidStatusCode(418)));
    }

    #[test]
    fn status_deserializes_from_number() {
        let status: StatusCode = serde_json::from_str("307").unwrap();
        assert_eq!(status, StatusCode::TemporaryRedirect);
        assert!(serde_json::from_str::<StatusCode>("299").is_err());
    }

    #[test]
    fn error_codes() {
        assert_eq!(StatusCode::NotFound.error_code(), "not_found");
        assert_eq!(StatusCode::BadRequest.error_code(), "bad_request");
    }

    #[test]
    fn status_classes() {
        assert!(StatusCode::PermanentRedirect.is_redirection());
        assert!(!StatusCode::NotFound.is_redirection());
        assert!(StatusCode::Ok.is_success());
    }

    #[test]
    fn method_parse() {
        assert_eq!("HEAD".parse::<Method>().unwrap(), Method::Head);
        assert_eq!("POST".parse::<Method>().unwrap().as_str(), "POST");
    }
}
