//! Company document handlers.
//!
//! Reads go through the cache; writes commit to the system of record and then
//! drop the document key and the collection list key before responding.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tally_cache::{CacheKey, Invalidation};
use tracing::{info, instrument};

use super::response::cached_json;
use crate::error::AppError;
use crate::source::{Record, RecordId};
use crate::state::AppState;

/// Reserved last segment of collection list keys.
const LIST_SEGMENT: &str = "list";

/// `company:{company}:{collection}:{id}`
pub fn record_key(id: &RecordId) -> CacheKey {
    CacheKey::new("company")
        .push(&id.company)
        .push(&id.collection)
        .push(&id.id)
}

/// `company:{company}:{collection}:list`
pub fn list_key(company: &str, collection: &str) -> CacheKey {
    CacheKey::new("company")
        .push(company)
        .push(collection)
        .push(LIST_SEGMENT)
}

#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub company: String,
    pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordPath {
    pub company: String,
    pub collection: String,
    pub id: String,
}

impl RecordPath {
    fn record_id(self) -> Result<RecordId, AppError> {
        // Un id "list" colisionaria con la clave del listado
        if self.id == LIST_SEGMENT {
            return Err(AppError::BadRequest(format!(
                "'{}' is reserved and cannot be used as a document id",
                LIST_SEGMENT
            )));
        }
        Ok(RecordId::new(self.company, self.collection, self.id))
    }
}

/// GET /companies/{company}/{collection}
#[instrument(skip_all, fields(source = state.records().name(), company = %path.company, collection = %path.collection))]
pub async fn list_records(
    State(state): State<AppState>,
    Path(path): Path<CollectionPath>,
) -> Result<Response, AppError> {
    let cache = state.cache();
    let records = state.records();
    let key = list_key(&path.company, &path.collection);
    let (company, collection) = (&path.company, &path.collection);

    let fetched = cache
        .get_or_compute(key.as_str(), cache.default_ttl().as_secs(), || async move {
            records
                .list(company, collection)
                .await
                .map_err(AppError::from)
        })
        .await?;

    Ok(cached_json(fetched))
}

/// GET /companies/{company}/{collection}/{id}
#[instrument(skip_all, fields(source = state.records().name(), company = %path.company, collection = %path.collection, id = %path.id))]
pub async fn get_record(
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    let id = path.record_id()?;
    let cache = state.cache();
    let records = state.records();
    let key = record_key(&id);
    let missing = format!("document {}", key);
    let id = &id;

    let fetched = cache
        .get_or_compute(key.as_str(), cache.default_ttl().as_secs(), || async move {
            match records.fetch(id).await {
                Ok(Some(record)) => Ok(record),
                Ok(None) => Err(AppError::not_found(missing)),
                Err(e) => Err(AppError::from(e)),
            }
        })
        .await?;

    Ok(cached_json(fetched))
}

/// PUT /companies/{company}/{collection}/{id}
#[instrument(skip_all, fields(source = state.records().name(), company = %path.company, collection = %path.collection, id = %path.id))]
pub async fn put_record(
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
    Json(data): Json<Value>,
) -> Result<Response, AppError> {
    let id = path.record_id()?;
    let invalidation = Invalidation::new()
        .key(record_key(&id))
        .key(list_key(&id.company, &id.collection));

    let existed = state
        .cache()
        .commit_and_invalidate(invalidation, async {
            state
                .records()
                .upsert(&id, data.clone())
                .await
                .map_err(AppError::from)
        })
        .await?;

    info!(existed, "Document stored");

    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let record = Record { id: id.id, data };

    Ok((status, Json(record)).into_response())
}

/// DELETE /companies/{company}/{collection}/{id}
#[instrument(skip_all, fields(source = state.records().name(), company = %path.company, collection = %path.collection, id = %path.id))]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(path): Path<RecordPath>,
) -> Result<Response, AppError> {
    let id = path.record_id()?;
    let invalidation = Invalidation::new()
        .key(record_key(&id))
        .key(list_key(&id.company, &id.collection));

    let existed = state
        .cache()
        .commit_and_invalidate(invalidation, async {
            state.records().remove(&id).await.map_err(AppError::from)
        })
        .await?;

    if !existed {
        return Err(AppError::not_found(format!("document {}", record_key(&id))));
    }

    info!("Document removed");
    Ok(StatusCode::NO_CONTENT.into_response())
}
