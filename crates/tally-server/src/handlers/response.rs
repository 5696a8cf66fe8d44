//! Response helpers for cached reads.

use axum::{
    Json,
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_cache::Fetched;

/// Header telling whether the body came from the cache.
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub const HIT: &str = "HIT";
pub const MISS: &str = "MISS";

/// Serializes a fetched value as JSON and tags it with `x-cache`.
pub fn cached_json<T: Serialize>(fetched: Fetched<T>) -> Response {
    let marker = if fetched.hit { HIT } else { MISS };

    let mut response = Json(fetched.value).into_response();
    response
        .headers_mut()
        .insert(X_CACHE.clone(), HeaderValue::from_static(marker));
    response
}
