//! ACL HTTP Handlers
//!
//! Thin adapters from the REST surface to [`AclEngine`]. Resource types in
//! query strings are parsed here so an unknown type answers 404 like a
//! missing resource.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::engine::AclEngine;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::shared::acl::{AccessControlEntry, GrantRequest, Resource, ShareRequest, SharedResource};
use crate::shared::permission::{GranteeType, ResourceType};

#[derive(Debug, Deserialize)]
pub struct ResourceTypeQuery {
    pub resource_type: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeQuery {
    pub resource_type: String,
    pub grantee_type: GranteeType,
    #[serde(default)]
    pub grantee_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TypeFilterQuery {
    #[serde(default)]
    pub resource_type: Option<String>,
}

impl TypeFilterQuery {
    fn parse(&self) -> BackendResult<Option<ResourceType>> {
        match self.resource_type.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

/// Grant permissions on a resource (POST /api/acl)
pub async fn grant_access(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Json(request): Json<GrantRequest>,
) -> BackendResult<(StatusCode, Json<AccessControlEntry>)> {
    let entry = acl.grant(&user, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Share a resource with several grantees (POST /api/share)
pub async fn share_resource(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Json(request): Json<ShareRequest>,
) -> BackendResult<(StatusCode, Json<Vec<AccessControlEntry>>)> {
    let entries = acl.share(&user, request).await?;
    Ok((StatusCode::CREATED, Json(entries)))
}

/// Active grants on a resource (GET /api/acl/{resource_id})
pub async fn list_grants(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Path(resource_id): Path<String>,
    Query(query): Query<ResourceTypeQuery>,
) -> BackendResult<Json<Vec<AccessControlEntry>>> {
    let resource = Resource::new(resource_id, query.resource_type.parse()?);
    Ok(Json(acl.list_grants(&user, &resource).await?))
}

/// Revoke a grantee's access (DELETE /api/acl/{resource_id})
pub async fn revoke_access(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Path(resource_id): Path<String>,
    Query(query): Query<RevokeQuery>,
) -> BackendResult<StatusCode> {
    let resource = Resource::new(resource_id, query.resource_type.parse()?);
    acl.revoke(&user, &resource, query.grantee_type, query.grantee_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resources shared with the caller (GET /api/shared-with-me)
pub async fn shared_with_me(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Query(query): Query<TypeFilterQuery>,
) -> BackendResult<Json<Vec<SharedResource>>> {
    let filter = query.parse()?;
    Ok(Json(acl.list_shared_with_me(&user, filter).await?))
}

/// Resources the caller shared (GET /api/shared-by-me)
pub async fn shared_by_me(
    State(acl): State<AclEngine>,
    AuthUser(user): AuthUser,
    Query(query): Query<TypeFilterQuery>,
) -> BackendResult<Json<Vec<SharedResource>>> {
    let filter = query.parse()?;
    Ok(Json(acl.list_shared_by_me(&user, filter).await?))
}
