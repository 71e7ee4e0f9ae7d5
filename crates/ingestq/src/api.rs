//! Wire contracts for the two client operations.
//!
//! Transport layers (HTTP, the stdin/stdout loop in the binary) decode a
//! request, hand it to [`dispatch`] or one of the handlers, and write the
//! returned [`ApiReply`] back out. Status codes follow HTTP conventions.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::ingestion::{IngestionRequest, IngestionService};

/// One client command, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    Ingest(IngestionRequest),
    Status { ingestion_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResponse {
    pub ingestion_id: String,
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiReply {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(body) => Self { status: 200, body },
            Err(e) => {
                log::error!("Failed to encode reply: {}", e);
                Self::err(500, "Failed to encode reply")
            }
        }
    }

    pub fn err(status: u16, detail: impl Into<String>) -> Self {
        let detail: String = detail.into();
        Self {
            status,
            body: serde_json::json!({ "detail": detail }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<IngestError> for ApiReply {
    fn from(error: IngestError) -> Self {
        Self::err(error.status_code(), error.to_string())
    }
}

pub fn handle_ingest(service: &IngestionService, request: &IngestionRequest) -> ApiReply {
    match service.ingest(request) {
        Ok(ingestion_id) => ApiReply::ok(&IngestionResponse { ingestion_id }),
        Err(e) => e.into(),
    }
}

pub fn handle_status(service: &IngestionService, ingestion_id: &str) -> ApiReply {
    match service.get_status(ingestion_id) {
        Ok(status) => ApiReply::ok(&status),
        Err(e) => e.into(),
    }
}

pub fn handle(service: &IngestionService, request: ApiRequest) -> ApiReply {
    match request {
        ApiRequest::Ingest(request) => handle_ingest(service, &request),
        ApiRequest::Status { ingestion_id } => handle_status(service, &ingestion_id),
    }
}

/// Decodes one JSON command and runs it.
pub fn dispatch(service: &IngestionService, line: &str) -> ApiReply {
    match serde_json::from_str::<ApiRequest>(line) {
        Ok(request) => handle(service, request),
        Err(e) => ApiReply::err(400, format!("Malformed request: {}", e)),
    }
}
