use std::{io, sync::{Mutex, MutexGuard}};

use actix_web::{HttpResponse, ResponseError, http::{StatusCode, header::LOCATION}};

use crate::{data::BlockID, flash::Flash, render::render_bare};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("The page you requested could not be found.")]
    NotFound,
    #[error("The user block with ID {0} could not be found.")]
    BlockNotFound(BlockID),
    #[error("The user {0} does not exist.")]
    UserNotFound(String),
    #[error("The database is offline for maintenance. Please try again later.")]
    DatabaseOffline,
    #[error("The database is currently in read-only mode. Changes cannot be saved right now.")]
    DatabaseReadonly,
    #[error("Redirecting to {to}")]
    Redirect { to: String, flash: Option<Flash> },
    #[error("Storage failure: {0}")]
    Store(#[from] io::Error),
    #[error("Shared state was poisoned by a panicking request")]
    Poisoned,
}

impl AppError {
    pub fn redirect(to: impl Into<String>, flash: Flash) -> Self {
        AppError::Redirect { to: to.into(), flash: Some(flash) }
    }

    fn title(&self) -> &'static str {
        match self {
            AppError::NotFound | AppError::UserNotFound(_) => "Not found",
            AppError::BlockNotFound(_) => "Block not found",
            AppError::DatabaseOffline | AppError::DatabaseReadonly => "Unavailable",
            AppError::Redirect { .. } => "Redirecting",
            AppError::Store(_) | AppError::Poisoned => "Server error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::BlockNotFound(_) | AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseOffline | AppError::DatabaseReadonly => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Redirect { .. } => StatusCode::SEE_OTHER,
            AppError::Store(_) | AppError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Redirect { to, flash } => {
                let location = flash.map_or_else(|| to.clone(), |f| f.append_to(to));
                HttpResponse::build(self.status_code())
                    .append_header((LOCATION, location))
                    .finish()
            },
            AppError::Store(_) | AppError::Poisoned => {
                tracing::error!(error = %self, "request failed");
                render_bare(self.status_code(), self.title(), "Something went wrong on our side.")
            },
            _ => render_bare(self.status_code(), self.title(), &self.to_string()),
        }
    }
}

pub fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex.lock().map_err(|_| AppError::Poisoned)
}
