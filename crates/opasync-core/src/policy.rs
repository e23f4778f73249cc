//! Local and remote policy representations
//!
//! A local policy is a `.rego` file in the workspace, referenced by a [`FileRef`].
//! A remote policy is a ConfigMap in the cluster, reduced to a [`PolicyObject`]
//! carrying just the metadata the planner needs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Well-known metadata keys
pub mod keys {
    /// Label identifying a ConfigMap as an OPA policy (kube-mgmt convention)
    pub const POLICY_LABEL: &str = "openpolicyagent.org/policy";
    /// Value of [`POLICY_LABEL`] for rego policies
    pub const POLICY_LABEL_VALUE: &str = "rego";
    /// Annotation marking a policy as deployed by opasync for development
    pub const DEV_POLICY_ANNOTATION: &str = "opasync.io/dev-policy";
    /// Status annotation written back by kube-mgmt
    pub const POLICY_STATUS_ANNOTATION: &str = "openpolicyagent.org/policy-status";
}

/// URI scheme of on-disk files
pub const FILE_SCHEME: &str = "file";

/// Default policy file extension (without the dot)
pub const DEFAULT_EXTENSION: &str = "rego";

/// Reference to a local policy document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    /// Scheme of the document (`file` for on-disk files)
    pub scheme: String,
    /// Path relative to the workspace root
    pub path: PathBuf,
}

impl FileRef {
    /// Reference an on-disk file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: FILE_SCHEME.to_string(),
            path: path.into(),
        }
    }

    /// Reference a document with an arbitrary scheme
    pub fn with_scheme(scheme: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    /// Whether the reference points at an addressable on-disk file
    pub fn is_local(&self) -> bool {
        self.scheme == FILE_SCHEME
    }

    /// Policy name derived from the file name
    pub fn policy_name(&self, extension: &str) -> String {
        derive_policy_name(&self.path, extension)
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path.display())
    }
}

/// Derive a policy name by stripping `.{extension}` from the file's base name
///
/// Matching is exact and case-sensitive. A file without the extension keeps its full
/// base name.
pub fn derive_policy_name(path: &Path, extension: &str) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = format!(".{}", extension);
    match base.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => base,
    }
}

/// A policy object as stored in the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyObject {
    /// Unique name within the policy namespace
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl PolicyObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A policy carrying the dev-policy marker
    pub fn dev(name: impl Into<String>) -> Self {
        Self::new(name).with_annotation(keys::DEV_POLICY_ANNOTATION, "true")
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Status reported by kube-mgmt, if any
    pub fn status(&self) -> PolicyStatus {
        self.annotations
            .get(keys::POLICY_STATUS_ANNOTATION)
            .map(|raw| PolicyStatus::parse(raw))
            .unwrap_or(PolicyStatus::Unknown)
    }
}

/// Whether a remote policy was created by opasync as a dev policy
pub fn is_dev_owned(policy: &PolicyObject) -> bool {
    policy
        .annotations
        .get(keys::DEV_POLICY_ANNOTATION)
        .map(String::as_str)
        == Some("true")
}

/// Load status of a policy as reported by kube-mgmt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum PolicyStatus {
    Ok,
    Error(String),
    Unknown,
}

impl PolicyStatus {
    /// Parse the kube-mgmt status annotation
    ///
    /// The annotation holds `{"status":"ok"}` or `{"status":"error","error":...}`.
    /// Anything else is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            tracing::warn!("malformed policy status annotation: {}", raw);
            return PolicyStatus::Unknown;
        };

        match value.get("status").and_then(|s| s.as_str()) {
            Some("ok") => PolicyStatus::Ok,
            Some("error") => {
                let message = match value.get("error") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Object(obj)) => obj
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| serde_json::Value::Object(obj.clone()).to_string()),
                    Some(other) => other.to_string(),
                    None => "unknown error".to_string(),
                };
                PolicyStatus::Error(message)
            }
            _ => PolicyStatus::Unknown,
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStatus::Ok => write!(f, "ok"),
            PolicyStatus::Error(msg) => write!(f, "error: {}", msg),
            PolicyStatus::Unknown => write!(f, "unknown"),
        }
    }
}
