use axum::{http::StatusCode, Json};
use serde::Serialize;

/// JSON envelope shared by every successful response.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type Empty = Envelope<()>;

pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status: "success",
        message: None,
        data: Some(data),
    })
}

pub fn message(message: impl Into<String>) -> Json<Empty> {
    Json(Envelope {
        status: "success",
        message: Some(message.into()),
        data: None,
    })
}

pub fn success_message<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status: "success",
        message: Some(message.into()),
        data: Some(data),
    })
}

pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            status: "success",
            message: Some(message.into()),
            data: Some(data),
        }),
    )
}

pub fn created_message(message: impl Into<String>) -> (StatusCode, Json<Empty>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            status: "success",
            message: Some(message.into()),
            data: None,
        }),
    )
}
