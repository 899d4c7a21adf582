use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use snafu::prelude::*;

/// Sends a blocking request and turns non-2xx answers into errors carrying the body.
pub trait SendExt {
    fn send_checked(self) -> Result<Response, HttpError>;

    fn send_json<T: DeserializeOwned>(self) -> Result<T, HttpError>
    where
        Self: Sized,
    {
        self.send_checked()?.json().context(DecodeSnafu)
    }
}

impl SendExt for RequestBuilder {
    fn send_checked(self) -> Result<Response, HttpError> {
        let response = self.send().context(RequestSnafu)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().unwrap_or_default();
        StatusSnafu { url, status, body }.fail()
    }
}

#[derive(Debug, Snafu)]
pub enum HttpError {
    #[snafu(display("HTTP request failed"))]
    RequestError { source: reqwest::Error },
    #[snafu(display("{} answered {}: {}", url, status, body))]
    StatusError {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[snafu(display("Failed to decode the response body"))]
    DecodeError { source: reqwest::Error },
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::StatusError { status, .. } => Some(*status),
            HttpError::RequestError { source } | HttpError::DecodeError { source } => {
                source.status()
            }
        }
    }
}
