// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error and result implementations.

use std::error::Error as BaseError;
use std::fmt;

use reqwest::StatusCode;

/// Kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Requested service endpoint was not found in the catalog.
    EndpointNotFound,
    /// Invalid value passed to one of the parameters.
    ///
    /// May be a result of a bad response from the server.
    InvalidInput,
    /// Invalid configuration: missing or ambiguous credentials, an invalid
    /// metadata key prefix or an unrecognized archive type.
    ///
    /// Never retried and always detected before any request is made.
    InvalidConfig,
    /// The server returned a malformed response.
    InvalidResponse,
    /// Authentication failed or the token has expired (HTTP 401).
    AuthenticationFailed,
    /// Access to the resource is denied (HTTP 403).
    AccessDenied,
    /// Requested resource was not found (HTTP 404).
    ResourceNotFound,
    /// The requested container does not exist.
    NoSuchContainer,
    /// The requested storage object does not exist.
    NoSuchObject,
    /// Request timed out on the server side (HTTP 408).
    RequestTimeout,
    /// Detected a conflict in the request (HTTP 409).
    Conflict,
    /// The container cannot be deleted since it still holds objects.
    ContainerNotEmpty,
    /// The digest computed while uploading does not match the returned ETag.
    IntegrityError,
    /// An archive extraction succeeded on the HTTP level but reported
    /// per-file failures.
    ExtractArchiveFailed,
    /// A local input/output operation failed.
    Io,
    /// Internal server error (HTTP 5xx).
    InternalServerError,
    /// The feature is not implemented (HTTP 501).
    NotImplemented,
    /// The service is not available (HTTP 503).
    ServiceUnavailable,
    /// An error of an unexpected kind.
    Unknown,
}

impl ErrorKind {
    /// Short description of the error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::EndpointNotFound => "Requested endpoint was not found",
            ErrorKind::InvalidInput => "Invalid value(s) provided",
            ErrorKind::InvalidConfig => "Invalid configuration",
            ErrorKind::InvalidResponse => "Received invalid response",
            ErrorKind::AuthenticationFailed => "Authentication failed",
            ErrorKind::AccessDenied => "Access denied",
            ErrorKind::ResourceNotFound => "Requested resource was not found",
            ErrorKind::NoSuchContainer => "Container does not exist",
            ErrorKind::NoSuchObject => "Object does not exist",
            ErrorKind::RequestTimeout => "Request timed out",
            ErrorKind::Conflict => "Requested cannot be fulfilled due to a conflict",
            ErrorKind::ContainerNotEmpty => "Container is not empty",
            ErrorKind::IntegrityError => "Uploaded data did not match the returned checksum",
            ErrorKind::ExtractArchiveFailed => "Archive extraction reported failures",
            ErrorKind::Io => "Input/output error",
            ErrorKind::InternalServerError => "Internal server error or bad gateway",
            ErrorKind::NotImplemented => "Requested feature is not implemented",
            ErrorKind::ServiceUnavailable => "The service is temporary unavailable",
            ErrorKind::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<StatusCode> for ErrorKind {
    fn from(value: StatusCode) -> ErrorKind {
        match value {
            StatusCode::UNAUTHORIZED => ErrorKind::AuthenticationFailed,
            StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
            StatusCode::NOT_FOUND => ErrorKind::ResourceNotFound,
            StatusCode::REQUEST_TIMEOUT => ErrorKind::RequestTimeout,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::NOT_IMPLEMENTED => ErrorKind::NotImplemented,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
            c if c.is_client_error() => ErrorKind::InvalidInput,
            c if c.is_server_error() => ErrorKind::InternalServerError,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Error from a Rackspace call.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    source: Option<Box<dyn BaseError + Send + Sync>>,
}

impl Error {
    /// Create a new error of the provided kind.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code, if the error was caused by an HTTP response.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[inline]
    pub(crate) fn new_endpoint_not_found<D: fmt::Display>(service_type: D) -> Error {
        Error::new(
            ErrorKind::EndpointNotFound,
            format!("Endpoint for service {} was not found", service_type),
        )
    }

    #[inline]
    pub(crate) fn with_status(mut self, status: StatusCode) -> Error {
        self.status = Some(status);
        self
    }

    #[inline]
    pub(crate) fn with_source<E>(mut self, source: E) -> Error
    where
        E: BaseError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Upgrade the kind if the error carries the given HTTP status.
    ///
    /// Used at call sites that know which resource a 404 or 409 refers to.
    #[inline]
    pub(crate) fn if_status(mut self, status: StatusCode, kind: ErrorKind) -> Error {
        if self.status == Some(status) {
            self.kind = kind;
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind.description())
        } else {
            write!(f, "{}: {}", self.kind.description(), self.message)
        }
    }
}

impl BaseError for Error {
    fn source(&self) -> Option<&(dyn BaseError + 'static)> {
        self.source.as_ref().map(|source| {
            let source: &(dyn BaseError + 'static) = source.as_ref();
            source
        })
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Error {
        let kind = if value.is_timeout() {
            ErrorKind::RequestTimeout
        } else if value.is_decode() {
            ErrorKind::InvalidResponse
        } else {
            ErrorKind::Unknown
        };
        let message = value.to_string();
        Error::new(kind, message).with_source(value)
    }
}

impl From<http::Error> for Error {
    fn from(value: http::Error) -> Error {
        Error::new(ErrorKind::InvalidInput, value.to_string()).with_source(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::new(ErrorKind::InvalidResponse, value.to_string()).with_source(value)
    }
}
