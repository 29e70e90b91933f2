use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::builder::DEFAULT_SIZE;
use crate::common::charset::Charset;
use crate::reader::{DecodeHints, DecodedResult};
use crate::service::ServiceError;
use crate::symbology::BarcodeFormat;

// Generate
//------------------------------------------------------------------------------

fn default_size() -> u32 {
    DEFAULT_SIZE
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(rename = "type")]
    kind: String,
    data: String,
    #[serde(default = "default_size")]
    width: u32,
    #[serde(default = "default_size")]
    height: u32,
    #[serde(default)]
    store: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<Uuid>,
    /// Base64 PNG
    pub image_bytes: String,
    pub created_at: DateTime<Utc>,
}

pub async fn generate(
    State(state): State<AppState>,
    query: Result<Query<GenerateQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let generated = state.service.generate(&q.kind, &q.data, q.width, q.height, q.store).await?;
    Ok(Json(GenerateResponse {
        id: generated.id,
        image_bytes: STANDARD.encode(&generated.bytes),
        created_at: generated.created_at,
    }))
}

// Get barcode
//------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BarcodeQuery {
    id: Option<String>,
    uuid: Option<String>,
}

pub async fn get_barcode(State(state): State<AppState>, Query(q): Query<BarcodeQuery>) -> Result<Response, ApiError> {
    let id = q.id.or(q.uuid).ok_or_else(|| ApiError::validation("id is required"))?;
    let image = state
        .service
        .find_barcode(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No barcode stored with id {id}")))?;

    let disposition = format!("inline; filename={}.png", image.id);
    Ok(([(header::CONTENT_TYPE, "image/png".to_string()), (header::CONTENT_DISPOSITION, disposition)], image.bytes)
        .into_response())
}

// Read
//------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    /// Base64 image
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResponse {
    pub timestamp: i64,
    pub text: String,
    pub format: BarcodeFormat,
}

impl From<DecodedResult> for ReadResponse {
    fn from(res: DecodedResult) -> Self {
        Self { timestamp: res.timestamp_millis, text: res.text, format: res.format }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ApiError::validation(format!("hint[{name}] must be true or false"))),
    }
}

/// Reads `hint[NAME]=value` query parameters. Unknown hints are ignored.
pub fn parse_hints(params: &HashMap<String, String>) -> Result<DecodeHints, ApiError> {
    let mut hints = DecodeHints::default();
    for (key, value) in params {
        let Some(name) = key.strip_prefix("hint[").and_then(|k| k.strip_suffix(']')) else {
            continue;
        };
        match name.to_ascii_uppercase().as_str() {
            "TRY_HARDER" => hints.try_harder = parse_flag(name, value)?,
            "PURE_BARCODE" => hints.pure_barcode = parse_flag(name, value)?,
            "CODE39_FULL_ASCII" => hints.code39_full_ascii = parse_flag(name, value)?,
            "POSSIBLE_FORMATS" => {
                hints.possible_formats = value
                    .split(',')
                    .filter(|f| !f.trim().is_empty())
                    .map(BarcodeFormat::from_str)
                    .collect::<Result<_, _>>()
                    .map_err(ServiceError::from)?;
            }
            "CHARACTER_SET" => {
                let cs = Charset::for_label(value)
                    .map_err(|_| ApiError::validation(format!("Unsupported character set: {value}")))?;
                hints.character_set = Some(cs);
            }
            _ => debug!(hint = name, "Ignoring unknown hint"),
        }
    }
    Ok(hints)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

// First file part, or the part named `data` or `file` when there is one
async fn image_from_multipart(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::validation(e.body_text()))? {
        let named = matches!(field.name(), Some("data") | Some("file"));
        let is_file = field.file_name().is_some();
        if !named && (!is_file || fallback.is_some()) {
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| ApiError::validation(e.body_text()))?;
        if named {
            return Ok(bytes.to_vec());
        }
        fallback = Some(bytes.to_vec());
    }
    fallback.ok_or_else(|| ApiError::validation("Multipart body has no image part"))
}

pub async fn read(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    req: Request,
) -> Result<Json<ReadResponse>, ApiError> {
    let hints = parse_hints(&params)?;
    let ct = content_type(req.headers());

    let res = if ct.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &state).await.map_err(|e| ApiError::validation(e.body_text()))?;
        let bytes = image_from_multipart(multipart).await?;
        state.service.read(bytes, hints).await?
    } else if ct.starts_with("application/json") {
        let Json(body) =
            Json::<ReadRequest>::from_request(req, &state).await.map_err(|e| ApiError::validation(e.body_text()))?;
        state.service.read_base64(&body.data, hints).await?
    } else {
        return Err(ApiError::validation("Content-Type must be multipart/form-data or application/json"));
    };
    Ok(Json(res.into()))
}
