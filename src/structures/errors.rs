use actix_web::{http::StatusCode, HttpResponse};
use log::error;
use thiserror::Error;

/// Any persistence fault. Callers never see which one.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlx error\n{0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Failure of a single recipient's send.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("transport error\n{0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected message with status {status}\n{body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Error, Debug)]
pub enum StatusBoardError {
    #[error("IO error\n{0}")]
    Read(#[from] std::io::Error),

    #[error("askama templating error\n{0}")]
    Askama(#[from] askama::Error),

    #[error("store error\n{0}")]
    Store(#[from] StoreError),

    #[error("serde_yaml error\n{0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("no recipients given")]
    NoRecipients,
}

impl actix_web::error::ResponseError for StatusBoardError {
    fn status_code(&self) -> StatusCode {
        match self {
            StatusBoardError::NoRecipients => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            StatusBoardError::NoRecipients => "Email address is required",
            StatusBoardError::Store(_) => {
                error!("{}", self);
                "Database operation failed"
            }
            _ => {
                error!("{}", self);
                "Internal server error"
            }
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(message)
    }
}
