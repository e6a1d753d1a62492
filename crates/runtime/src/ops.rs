//! Create/Read/Update/Delete/ImportState bodies shared by generated code

use crate::client::{KubernetesClient, ObjectRef};
use crate::codec::{self, from_state};
use crate::error::{DecodeError, ProviderError, Result};
use crate::manifest::ManifestDocument;
use crate::resource::{DataSource, Resource, UnitInfo};
use crate::schema::ResourceSchema;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Attribute holding the Terraform id
pub const ID_ATTRIBUTE: &str = "id";
/// Attribute holding the rendered manifest of a manifest data source
pub const YAML_ATTRIBUTE: &str = "yaml";

/// Create the object with server-side apply
pub fn create<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    planned: &R::Model,
) -> Result<R::Model> {
    apply(resource, client, planned)
}

/// Refresh the object; `None` when it no longer exists
pub fn read<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    current: &R::Model,
) -> Result<Option<R::Model>> {
    let info = resource.info();
    let schema = resource.schema();
    let object = object_ref(&info, &schema, current)?;
    match client.get(&object)? {
        Some(manifest) => state_from_manifest(&schema, &manifest).map(Some),
        None => {
            info!("{} {} is gone, removing from state", info.type_name, object.id());
            Ok(None)
        }
    }
}

/// Update the object in place; fails when a requires-replace attribute changed
pub fn update<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    prior: &R::Model,
    planned: &R::Model,
) -> Result<R::Model> {
    let schema = resource.schema();
    let changed = schema.requires_replace_paths(
        &serde_json::to_value(prior)?,
        &serde_json::to_value(planned)?,
    );
    if !changed.is_empty() {
        return Err(ProviderError::InvalidConfig(format!(
            "changing {} requires replacing the object",
            changed.join(", ")
        )));
    }
    apply(resource, client, planned)
}

pub fn delete<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    current: &R::Model,
) -> Result<()> {
    let info = resource.info();
    let object = object_ref(&info, &resource.schema(), current)?;
    debug!("Deleting {}", object);
    client.delete(&object)?;
    Ok(())
}

/// Import an existing object by `namespace/name` or `name`
pub fn import_state<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    id: &str,
) -> Result<R::Model> {
    let info = resource.info();
    let object = info.parse_id(id)?;
    let manifest = client.get(&object)?.ok_or_else(|| ProviderError::NotFound {
        kind: info.kind.to_string(),
        id: object.id(),
    })?;
    state_from_manifest(&resource.schema(), &manifest)
}

/// Look up an object by the `metadata` of the configuration
pub fn read_data_source<D: DataSource>(
    data_source: &D,
    client: &dyn KubernetesClient,
    config: &D::Model,
) -> Result<D::Model> {
    let info = data_source.info();
    let schema = data_source.schema();
    let object = object_ref(&info, &schema, config)?;
    let manifest = client.get(&object)?.ok_or_else(|| ProviderError::NotFound {
        kind: info.kind.to_string(),
        id: object.id(),
    })?;
    state_from_manifest(&schema, &manifest)
}

/// Render the configuration as a manifest without touching the cluster
pub fn render_manifest<D: DataSource>(data_source: &D, config: &D::Model) -> Result<D::Model> {
    let info = data_source.info();
    let schema = data_source.schema();
    let manifest = codec::encode(&schema, info.api_version, info.kind, config)?;

    let mut state = match serde_json::to_value(config)? {
        Value::Object(state) => state,
        _ => serde_json::Map::new(),
    };
    state.insert(YAML_ATTRIBUTE.to_string(), Value::String(manifest.to_yaml()?));
    if schema.attribute(ID_ATTRIBUTE).is_some() {
        if let Some(name) = manifest.name() {
            let object = info.object_ref(name, manifest.namespace());
            state.insert(ID_ATTRIBUTE.to_string(), Value::String(object.id()));
        }
    }
    Ok(from_state(Value::Object(state))?)
}

fn apply<R: Resource>(
    resource: &R,
    client: &dyn KubernetesClient,
    planned: &R::Model,
) -> Result<R::Model> {
    let info = resource.info();
    let schema = resource.schema();
    let manifest = codec::encode(&schema, info.api_version, info.kind, planned)?;
    debug!(
        "Applying {} {:?} as {}",
        info.type_name,
        manifest.name(),
        resource.field_manager()
    );
    let applied = client.apply(&manifest, resource.field_manager())?;
    state_from_manifest(&schema, &applied)
}

fn object_ref<M: Serialize>(info: &UnitInfo, schema: &ResourceSchema, model: &M) -> Result<ObjectRef> {
    let manifest = codec::encode(schema, info.api_version, info.kind, model)?;
    let name = manifest
        .name()
        .ok_or_else(|| DecodeError::missing("metadata.name"))?;
    Ok(info.object_ref(name, manifest.namespace()))
}

/// Decode a manifest returned by the cluster and fill in the id
fn state_from_manifest<M: serde::de::DeserializeOwned>(
    schema: &ResourceSchema,
    manifest: &ManifestDocument,
) -> Result<M> {
    let mut state = codec::decode_state(schema, manifest)?;
    if schema.attribute(ID_ATTRIBUTE).is_some() {
        let name = manifest
            .name()
            .ok_or_else(|| DecodeError::missing("metadata.name"))?;
        let id = match manifest.namespace() {
            Some(namespace) => format!("{}/{}", namespace, name),
            None => name.to_string(),
        };
        state.insert(ID_ATTRIBUTE.to_string(), Value::String(id));
    }
    Ok(from_state(Value::Object(state))?)
}
