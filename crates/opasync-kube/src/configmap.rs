//! ConfigMap-backed policy store
//!
//! Policies live in ConfigMaps following the kube-mgmt convention: one policy per
//! ConfigMap, labelled `openpolicyagent.org/policy=rego`, with the rego source stored
//! under the file name. Policies deployed by opasync additionally carry the
//! `opasync.io/dev-policy=true` annotation.
//!
//! Deploys use Server-Side Apply with a fixed field manager, so re-applying the same
//! file is a no-op.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};

use opasync_core::policy::keys;
use opasync_core::{PolicyObject, PolicyStore, SyncConfig, derive_policy_name};

use crate::error::{KubeError, Result};

/// Policy store over ConfigMaps in a single namespace
pub struct ConfigMapStore {
    client: Client,
    /// Workspace root that deploy paths are relative to
    root: PathBuf,
    config: SyncConfig,
}

impl ConfigMapStore {
    /// Create with an existing client
    pub fn new(client: Client, root: impl Into<PathBuf>, config: SyncConfig) -> Self {
        Self {
            client,
            root: root.into(),
            config,
        }
    }

    /// Get the ConfigMap API for the policy namespace
    fn api(&self) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), &self.config.namespace)
    }

    /// Build the ConfigMap holding one policy
    pub fn build_config_map(&self, name: &str, file_name: &str, content: String) -> ConfigMap {
        build_policy_config_map(&self.config, name, file_name, content)
    }

    async fn list_config_maps(&self) -> Result<Vec<ConfigMap>> {
        let selector = self.config.label_selector();
        let lp = ListParams::default().labels(&selector);
        let list = self
            .api()
            .list(&lp)
            .await
            .map_err(|source| KubeError::List {
                namespace: self.config.namespace.clone(),
                selector,
                source,
            })?;
        Ok(list.items)
    }

    async fn read_policy(&self, path: &Path) -> Result<String> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|source| KubeError::ReadPolicy {
                path: full.display().to_string(),
                source,
            })
    }

    async fn apply(&self, path: &Path) -> Result<()> {
        let name = derive_policy_name(path, self.config.extension());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                KubeError::InvalidConfig(format!("not a file path: {}", path.display()))
            })?;
        let content = self.read_policy(path).await?;

        let config_map = self.build_config_map(&name, &file_name, content);
        let deploy_error = |source: kube::Error| KubeError::Deploy {
            name: name.clone(),
            namespace: self.config.namespace.clone(),
            source,
        };

        let existing = self.api().get_opt(&name).await.map_err(deploy_error)?;
        let stale = existing
            .as_ref()
            .map(|cm| stale_data_keys(cm, &file_name))
            .unwrap_or_default();

        match existing {
            Some(existing) if !stale.is_empty() => {
                tracing::debug!("replacing policy {} to drop keys {:?}", name, stale);
                let replacement = replace_policy_data(existing, &config_map);
                let params = PostParams {
                    field_manager: Some(self.config.field_manager.clone()),
                    ..Default::default()
                };
                self.api()
                    .replace(&name, &params, &replacement)
                    .await
                    .map_err(deploy_error)?;
            }
            _ => {
                let params = PatchParams::apply(&self.config.field_manager).force();
                self.api()
                    .patch(&name, &params, &Patch::Apply(&config_map))
                    .await
                    .map_err(deploy_error)?;
            }
        }

        tracing::debug!("applied policy {} from {}", name, path.display());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let result = self
            .api()
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|source| KubeError::Delete {
                name: name.to_string(),
                namespace: self.config.namespace.clone(),
                source,
            });

        match result {
            Ok(_) => {
                tracing::debug!("deleted policy {}", name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("policy {} already absent", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Build the ConfigMap for a policy
pub fn build_policy_config_map(
    config: &SyncConfig,
    name: &str,
    file_name: &str,
    content: String,
) -> ConfigMap {
    let mut labels = BTreeMap::new();
    labels.insert(config.policy_label.clone(), config.policy_label_value.clone());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "opasync".to_string(),
    );

    let mut annotations = BTreeMap::new();
    annotations.insert(keys::DEV_POLICY_ANNOTATION.to_string(), "true".to_string());

    let mut data = BTreeMap::new();
    data.insert(file_name.to_string(), content);

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Data keys of an existing ConfigMap that a deploy of `file_name` would leave behind
pub fn stale_data_keys(existing: &ConfigMap, file_name: &str) -> Vec<String> {
    let data = existing.data.iter().flat_map(|d| d.keys());
    let binary = existing.binary_data.iter().flat_map(|d| d.keys());
    data.chain(binary)
        .filter(|key| key.as_str() != file_name)
        .cloned()
        .collect()
}

/// Rewrite an existing ConfigMap so its only content is the desired policy
///
/// Metadata such as `resourceVersion` is kept so the replace is rejected if the object
/// changed in the meantime. Desired labels and annotations are merged over existing ones.
pub fn replace_policy_data(mut existing: ConfigMap, desired: &ConfigMap) -> ConfigMap {
    let labels = existing.metadata.labels.get_or_insert_with(BTreeMap::new);
    labels.extend(desired.metadata.labels.clone().unwrap_or_default());

    let annotations = existing.metadata.annotations.get_or_insert_with(BTreeMap::new);
    annotations.extend(desired.metadata.annotations.clone().unwrap_or_default());

    existing.data = desired.data.clone();
    existing.binary_data = None;
    existing
}

/// Whether a ConfigMap carries the policy label
pub fn is_policy_config_map(config: &SyncConfig, config_map: &ConfigMap) -> bool {
    config_map
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(&config.policy_label))
        == Some(&config.policy_label_value)
}

/// Reduce a ConfigMap to the metadata the planner needs
///
/// Returns `None` for ConfigMaps without a name.
pub fn policy_from_config_map(config_map: &ConfigMap) -> Option<PolicyObject> {
    let name = config_map.metadata.name.clone()?;
    Some(PolicyObject {
        name,
        labels: config_map.metadata.labels.clone().unwrap_or_default(),
        annotations: config_map.metadata.annotations.clone().unwrap_or_default(),
    })
}

#[async_trait]
impl PolicyStore for ConfigMapStore {
    fn namespace(&self) -> &str {
        &self.config.namespace
    }

    async fn list_policies(&self) -> opasync_core::Result<Vec<PolicyObject>> {
        let config_maps = self.list_config_maps().await?;

        let policies = config_maps
            .iter()
            .filter_map(policy_from_config_map)
            .filter(|p| {
                let reserved = self.config.is_reserved(&p.name);
                if reserved {
                    tracing::debug!("skipping reserved policy {}", p.name);
                }
                !reserved
            })
            .collect();
        Ok(policies)
    }

    async fn deploy_policy(&self, path: &Path) -> opasync_core::Result<()> {
        Ok(self.apply(path).await?)
    }

    async fn delete_policy(&self, name: &str) -> opasync_core::Result<()> {
        Ok(self.remove(name).await?)
    }

    async fn get_policy(&self, name: &str) -> opasync_core::Result<Option<PolicyObject>> {
        if self.config.is_reserved(name) {
            return Ok(None);
        }

        let config_map = self
            .api()
            .get_opt(name)
            .await
            .map_err(KubeError::Api)?;
        Ok(config_map
            .filter(|cm| is_policy_config_map(&self.config, cm))
            .as_ref()
            .and_then(policy_from_config_map))
    }
}
