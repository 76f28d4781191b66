use axum::extract::multipart::MultipartError;
use axum::response::{IntoResponse, Redirect, Response};
use snafu::{Location, Snafu};

use crate::database::{DatabaseQueryError, Record};
use crate::model::{User, Video};
use crate::storage::StorageError;

/// An operation that could not be carried out. Users only ever see a redirect, the details go to the log.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("database query failed at {location}: {source}"))]
    Query {
        source: DatabaseQueryError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("video `{id}` does not exist"))]
    VideoNotFound {
        id: Record<Video>,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("user `{id}` does not exist"))]
    UserNotFound {
        id: Record<User>,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("user `{user}` is not the creator of video `{video}`"))]
    NotCreator {
        video: Record<Video>,
        user: Record<User>,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to store the uploaded file at {location}: {source}"))]
    Store {
        source: StorageError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to read the multipart body at {location}: {source}"))]
    Multipart {
        source: MultipartError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the database returned nothing after creating a record at {location}"))]
    NotCreated {
        #[snafu(implicit)]
        location: Location,
    },
}

impl ApiError {
    /// Logs the error and sends the user to `fallback`.
    pub fn redirect(self, fallback: &str) -> Response {
        match &self {
            ApiError::VideoNotFound { .. } | ApiError::UserNotFound { .. } => {
                tracing::warn!(error = %self, fallback, "redirecting after a missing record");
            }
            ApiError::NotCreator { .. } => {
                tracing::info!(error = %self, fallback, "denied a change by someone other than the creator");
            }
            _ => tracing::error!(error = %self, fallback, "request failed"),
        }

        Redirect::to(fallback).into_response()
    }
}

pub trait OrRedirect {
    /// Turns a failed handler into a redirect to `fallback`.
    fn or_redirect(self, fallback: &str) -> Response;
}

impl<R: IntoResponse> OrRedirect for Result<R, ApiError> {
    fn or_redirect(self, fallback: &str) -> Response {
        match self {
            Ok(response) => response.into_response(),
            Err(err) => err.redirect(fallback),
        }
    }
}
