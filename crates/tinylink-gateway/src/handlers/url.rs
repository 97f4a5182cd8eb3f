use crate::error::{AppError, Result, LONG_URL_REQUIRED};
use crate::model::{ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tinylink_core::ShortCode;
use tracing::debug;

/// `POST /api/shorten`: 201 when a new link was created, 200 when the URL
/// had been shortened before.
pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response> {
    let long_url = match payload {
        Ok(Json(ShortenRequest {
            long_url: Some(long_url),
        })) if !long_url.is_empty() => long_url,
        Ok(_) => return Err(AppError::Validation(LONG_URL_REQUIRED.to_string())),
        Err(rejection) => {
            debug!(%rejection, "unreadable shorten request");
            return Err(AppError::Validation(LONG_URL_REQUIRED.to_string()));
        }
    };

    let upsert = state.shortener().shorten(&long_url).await?;
    let status = if upsert.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let short_url = upsert.link().short_code.to_url(state.base_url());

    Ok((status, Json(ShortenResponse { short_url })).into_response())
}

/// `GET /{short_code}`: 302 to the stored URL, 404 otherwise.
pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    // A malformed code cannot be stored, so it is simply unknown.
    let Ok(code) = ShortCode::new(short_code) else {
        return Err(AppError::NotFound);
    };

    let link = state
        .shortener()
        .resolve(&code)
        .await?
        .ok_or(AppError::NotFound)?;

    let location = HeaderValue::try_from(encode_location(&link.long_url)).map_err(|e| {
        AppError::Internal(format!(
            "stored url for '{}' is not a valid Location header: {e}",
            code
        ))
    })?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Bytes a `Location` header cannot carry. Non-ASCII is always escaped.
const LOCATION_UNSAFE: &AsciiSet = &CONTROLS.add(b' ');

/// Percent-encodes the bytes a `Location` header cannot carry. Everything
/// else, including existing escapes, is kept.
fn encode_location(url: &str) -> String {
    utf8_percent_encode(url, LOCATION_UNSAFE).to_string()
}
