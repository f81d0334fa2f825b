//! Request handlers, generic over the exposed entity kind.
//!
//! Response bodies are the stored document plus `id`. Mutations accept an
//! optional `If-Match: <version>` header; a stale version yields 409.

use crate::error::{ApiError, ApiResult};
use crate::{AppState, Resource};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use inventory_core::{core_version, DocumentRepository, Entity, RepoResult};
use log::warn;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Equipment and product API ready.",
        "version": core_version(),
    }))
}

pub async fn list_records<E: Resource>(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Value>>> {
    let records = with_repository::<E, _>(&state, |repo| repo.list_all()).await?;
    records
        .iter()
        .map(record_body)
        .collect::<ApiResult<Vec<_>>>()
        .map(Json)
}

pub async fn get_record<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let lookup_id = id.clone();
    let found = with_repository::<E, _>(&state, move |repo| repo.get_by_id(&lookup_id)).await?;
    match found {
        Some(entity) => Ok(Json(record_body(&entity)?)),
        None => Err(ApiError::NotFound { kind: E::KIND, id }),
    }
}

pub async fn create_record<E: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<E::Attributes>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(attributes) = payload.map_err(invalid_body)?;
    let created = with_repository::<E, _>(&state, move |repo| {
        let id = repo.create(attributes)?;
        repo.get_by_id(&id)
    })
    .await?;

    let entity = created.ok_or_else(|| ApiError::Internal {
        operation: format!("reload created {}", E::KIND),
    })?;
    Ok((StatusCode::CREATED, Json(record_body(&entity)?)))
}

pub async fn update_record<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<E::Patch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(patch) = payload.map_err(invalid_body)?;
    let expected_version = expected_version(&headers)?;
    let updated = with_repository::<E, _>(&state, move |repo| {
        match expected_version {
            Some(version) => repo.update_if_version(&id, version, patch)?,
            None => repo.update(&id, patch)?,
        };
        repo.get_by_id(&id)
    })
    .await?;

    reloaded::<E>(updated)
}

pub async fn delete_record<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let expected_version = expected_version(&headers)?;
    let deleted = with_repository::<E, _>(&state, move |repo| {
        match expected_version {
            Some(version) => repo.delete_if_version(&id, version)?,
            None => repo.delete(&id)?,
        };
        repo.get_by_id(&id)
    })
    .await?;

    reloaded::<E>(deleted)
}

/// Runs `operation` against the kind's repository on the blocking pool.
async fn with_repository<E, T>(
    state: &AppState,
    operation: impl FnOnce(&mut DocumentRepository<E>) -> RepoResult<T> + Send + 'static,
) -> ApiResult<T>
where
    E: Resource,
    T: Send + 'static,
{
    let repository = E::repository(state);
    tokio::task::spawn_blocking(move || {
        // A panicked call dropped its transaction, which rolls back.
        let mut guard = repository.lock().unwrap_or_else(|poisoned| {
            warn!(
                "event=repo_lock module=http status=recovered kind={}",
                E::KIND
            );
            poisoned.into_inner()
        });
        operation(&mut guard).map_err(ApiError::from)
    })
    .await
    .map_err(|err| ApiError::Internal {
        operation: format!("run {} operation: {err}", E::KIND),
    })?
}

fn reloaded<E: Entity>(entity: Option<E>) -> ApiResult<Json<Value>> {
    let entity = entity.ok_or_else(|| ApiError::Internal {
        operation: format!("reload mutated {}", E::KIND),
    })?;
    Ok(Json(record_body(&entity)?))
}

fn record_body<E: Entity>(entity: &E) -> ApiResult<Value> {
    let mut document = entity.to_document().map_err(|err| ApiError::Internal {
        operation: format!("serialize {} {}: {err}", E::KIND, entity.id()),
    })?;
    document.insert("id".to_string(), Value::String(entity.id().to_string()));
    Ok(Value::Object(document))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation {
        message: rejection.body_text(),
    }
}

fn expected_version(headers: &HeaderMap) -> ApiResult<Option<u64>> {
    let Some(raw) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    let text = raw.to_str().unwrap_or_default().trim().trim_matches('"');
    text.parse::<u64>().map(Some).map_err(|_| ApiError::Validation {
        message: format!("If-Match must be a record version, got `{text}`"),
    })
}
