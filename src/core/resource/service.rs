//! Single-resource data service
//!
//! Create, read, vread, update and delete of one resource. Updates run as a
//! one-entry bundle so they follow the same locking protocol as bundles.

use crate::adapters::storage::DocumentStore;
use crate::core::bundle::BundleService;
use crate::core::requests::RequestBuilder;
use crate::core::{codec, versions};
use crate::domain::bundle::empty_resource;
use crate::domain::{
    BatchRequest, BundleErrorKind, DocumentStatus, ResourceId, Result, StorageError, TenantId,
    VellumError,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Result of a single-resource operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceResponse {
    pub message: String,
    pub resource: Value,
}

impl ResourceResponse {
    fn new(message: impl Into<String>, resource: Value) -> Self {
        Self {
            message: message.into(),
            resource,
        }
    }
}

pub struct ResourceService {
    store: Arc<dyn DocumentStore>,
    builder: RequestBuilder,
    bundles: BundleService,
    update_create_supported: bool,
}

impl ResourceService {
    /// Builds the service over the same store and builder as `bundles`
    pub fn new(store: Arc<dyn DocumentStore>, bundles: BundleService) -> Self {
        let builder = bundles.builder().clone();
        Self {
            store,
            builder,
            bundles,
            update_create_supported: false,
        }
    }

    /// Lets an update of an unknown id create it
    pub fn with_update_create_supported(mut self, supported: bool) -> Self {
        self.update_create_supported = supported;
        self
    }

    pub fn update_create_supported(&self) -> bool {
        self.update_create_supported
    }

    /// Writes version 1 of a new resource directly as `AVAILABLE`
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the id is taken or the resource is malformed.
    pub async fn create_resource(
        &self,
        resource_type: &str,
        resource: &Value,
        id: Option<&str>,
        tenant: Option<&TenantId>,
    ) -> Result<ResourceResponse> {
        codec::check_resource_type(resource, resource_type)?;
        let id = id.map_or_else(|| ResourceId::generate().into_inner(), str::to_string);

        let mut resource = resource.clone();
        codec::strip_server_meta(&mut resource);
        let put = self.builder.build_commit_put(&resource, &id, 1, tenant)?;

        self.store.put_item(&put).await.map_err(|e| {
            if e.is_precondition_failed() {
                VellumError::InvalidResource(
                    "Resource creation failed, id matches an existing resource".to_string(),
                )
            } else {
                e
            }
        })?;

        tracing::info!(id = %id, resource_type = %resource_type, "Resource created");
        Ok(ResourceResponse::new("Resource created", codec::decode(&put.item)))
    }

    /// Returns the readable version of a resource
    pub async fn read_resource(
        &self,
        resource_type: &str,
        id: &str,
        tenant: Option<&TenantId>,
    ) -> Result<ResourceResponse> {
        let item = versions::current_version(
            self.store.as_ref(),
            &self.builder,
            resource_type,
            id,
            tenant,
        )
        .await?
        .ok_or_else(|| not_found(resource_type, id))?;

        Ok(ResourceResponse::new("Resource found", codec::decode(&item)))
    }

    /// Returns one specific version of a resource, whatever its status
    pub async fn vread_resource(
        &self,
        resource_type: &str,
        id: &str,
        vid: u64,
        tenant: Option<&TenantId>,
    ) -> Result<ResourceResponse> {
        let item = self
            .store
            .get_item(&self.builder.build_get(id, Some(vid), tenant))
            .await?
            .filter(|item| item.resource_type == resource_type)
            .ok_or_else(|| VellumError::ResourceVersionNotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
                vid,
            })?;

        Ok(ResourceResponse::new("Resource found", codec::decode(&item)))
    }

    /// Writes a new version of a resource through a one-entry bundle
    ///
    /// # Errors
    ///
    /// * `ResourceNotFound` for an unknown id when update-as-create is off
    /// * `InvalidResource` for an unusable id when update-as-create is on
    /// * `Storage(PreconditionFailed)` when another transaction holds the resource
    pub async fn update_resource(
        &self,
        resource_type: &str,
        id: &str,
        resource: &Value,
        tenant: Option<&TenantId>,
    ) -> Result<ResourceResponse> {
        let current = versions::current_version(
            self.store.as_ref(),
            &self.builder,
            resource_type,
            id,
            tenant,
        )
        .await?;

        if current.is_none() {
            if !self.update_create_supported {
                return Err(not_found(resource_type, id));
            }
            let id = ResourceId::new(id).map_err(|_| {
                VellumError::InvalidResource(format!("Resource creation failed, id {id} is not valid"))
            })?;
            return self
                .create_resource(resource_type, resource, Some(id.as_str()), tenant)
                .await;
        }

        let request = BatchRequest::update(resource_type, id, resource.clone());
        let response = self.bundles.transaction(&[request], tenant).await?;
        if !response.success {
            return Err(match response.error_kind {
                Some(BundleErrorKind::Conflict) => {
                    StorageError::PreconditionFailed(response.message).into()
                }
                _ => VellumError::Other(response.message),
            });
        }

        let entry = response
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| VellumError::Other("Update produced no bundle entry".to_string()))?;
        let vid = entry.vid.unwrap_or_default();

        let mut updated = resource.clone();
        codec::strip_server_meta(&mut updated);
        if let Value::Object(body) = &mut updated {
            body.insert("id".to_string(), Value::String(id.to_string()));
            let meta = body.entry("meta").or_insert_with(empty_resource);
            if !meta.is_object() {
                *meta = empty_resource();
            }
            if let Value::Object(meta) = meta {
                meta.insert("versionId".to_string(), json!(vid.to_string()));
                meta.insert("lastUpdated".to_string(), json!(entry.last_modified));
            }
        }

        tracing::info!(id = %id, vid = vid, resource_type = %resource_type, "Resource updated");
        Ok(ResourceResponse::new("Resource updated", updated))
    }

    /// Marks the readable version `DELETED`
    pub async fn delete_resource(
        &self,
        resource_type: &str,
        id: &str,
        tenant: Option<&TenantId>,
    ) -> Result<ResourceResponse> {
        let item = versions::current_version(
            self.store.as_ref(),
            &self.builder,
            resource_type,
            id,
            tenant,
        )
        .await?
        .ok_or_else(|| not_found(resource_type, id))?;

        let transition = self.builder.build_status_transition(
            Some(DocumentStatus::Available),
            DocumentStatus::Deleted,
            id,
            item.vid,
            resource_type,
            tenant,
        );
        self.store.update_item(&transition).await?;

        tracing::info!(id = %id, vid = item.vid, resource_type = %resource_type, "Resource deleted");
        Ok(ResourceResponse::new(
            format!(
                "Successfully deleted ResourceType: {resource_type}, Id: {id}, VersionId: {}",
                item.vid
            ),
            empty_resource(),
        ))
    }
}

fn not_found(resource_type: &str, id: &str) -> VellumError {
    VellumError::ResourceNotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}
