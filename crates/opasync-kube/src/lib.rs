//! opasync Kube - Kubernetes integration for opasync
//!
//! This crate provides:
//! - **ConfigMap store**: the [`opasync_core::PolicyStore`] implementation backed by
//!   kube-mgmt style policy ConfigMaps
//! - **Client setup**: connecting with the default kubeconfig or an explicit context

pub mod client;
pub mod configmap;
pub mod error;

pub use client::{available_contexts, connect};
pub use configmap::{
    ConfigMapStore, build_policy_config_map, is_policy_config_map, policy_from_config_map,
    replace_policy_data, stale_data_keys,
};
pub use error::{KubeError, Result};
