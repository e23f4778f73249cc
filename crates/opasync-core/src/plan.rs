//! Reconciliation planning
//!
//! The planner classifies every local policy file against the remote policy set:
//!
//! | local file | remote policy          | bucket                    |
//! |------------|------------------------|---------------------------|
//! | present    | absent                 | `deploy`                  |
//! | present    | present, dev-owned     | `overwrite_dev_rego`      |
//! | present    | present, not dev-owned | `overwrite_non_dev_rego`  |
//! | absent     | present, dev-owned     | `delete`                  |
//! | absent     | present, not dev-owned | untouched                 |
//!
//! Buckets keep the discovery order of their inputs.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::action::ActionItem;
use crate::error::PlanError;
use crate::locator::PolicyLocator;
use crate::policy::{FileRef, PolicyObject, is_dev_owned};
use crate::store::PolicyStore;

/// A local file scheduled for deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Policy name derived from the file name
    pub name: String,
    pub file: FileRef,
}

impl PlannedFile {
    fn action(&self) -> ActionItem {
        ActionItem::Deploy {
            path: self.file.path.clone(),
        }
    }
}

/// Computed reconciliation between local files and remote policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    /// New policies, no remote object of that name exists
    pub deploy: Vec<PlannedFile>,
    /// Overwrites of dev-owned remote policies
    pub overwrite_dev_rego: Vec<PlannedFile>,
    /// Overwrites of policies created outside opasync
    pub overwrite_non_dev_rego: Vec<PlannedFile>,
    /// Dev-owned remote policies with no local file
    pub delete: Vec<String>,
}

impl SyncPlan {
    /// True when there is nothing to reconcile
    pub fn is_empty(&self) -> bool {
        self.deploy.is_empty()
            && self.overwrite_dev_rego.is_empty()
            && self.overwrite_non_dev_rego.is_empty()
            && self.delete.is_empty()
    }

    /// Number of candidate actions across all buckets
    pub fn len(&self) -> usize {
        self.deploy.len()
            + self.overwrite_dev_rego.len()
            + self.overwrite_non_dev_rego.len()
            + self.delete.len()
    }

    pub fn deploy_names(&self) -> Vec<&str> {
        names(&self.deploy)
    }

    pub fn overwrite_dev_names(&self) -> Vec<&str> {
        names(&self.overwrite_dev_rego)
    }

    pub fn overwrite_non_dev_names(&self) -> Vec<&str> {
        names(&self.overwrite_non_dev_rego)
    }

    /// Flatten the plan into selectable choices
    ///
    /// Order: deploy, safe overwrite, unsafe overwrite, delete. Everything is
    /// pre-selected except overwrites of policies opasync does not own.
    pub fn choices(&self) -> Vec<PlanChoice> {
        let mut choices = Vec::with_capacity(self.len());

        for planned in &self.deploy {
            choices.push(PlanChoice::new(
                planned.action(),
                ChoiceKind::Deploy,
                format!("deploy {} ({})", planned.name, planned.file.path.display()),
            ));
        }
        for planned in &self.overwrite_dev_rego {
            choices.push(PlanChoice::new(
                planned.action(),
                ChoiceKind::OverwriteDev,
                format!("overwrite {} ({})", planned.name, planned.file.path.display()),
            ));
        }
        for planned in &self.overwrite_non_dev_rego {
            choices.push(PlanChoice::new(
                planned.action(),
                ChoiceKind::OverwriteNonDev,
                format!(
                    "overwrite {} ({}) - not deployed by opasync",
                    planned.name,
                    planned.file.path.display()
                ),
            ));
        }
        for name in &self.delete {
            choices.push(PlanChoice::new(
                ActionItem::Delete { name: name.clone() },
                ChoiceKind::Delete,
                format!("delete {}", name),
            ));
        }

        choices
    }

    /// Actions that are pre-selected by default
    pub fn default_selection(&self) -> Vec<ActionItem> {
        self.choices()
            .into_iter()
            .filter(|c| c.preselected)
            .map(|c| c.action)
            .collect()
    }
}

fn names(bucket: &[PlannedFile]) -> Vec<&str> {
    bucket.iter().map(|p| p.name.as_str()).collect()
}

/// Which bucket a choice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChoiceKind {
    Deploy,
    OverwriteDev,
    OverwriteNonDev,
    Delete,
}

impl ChoiceKind {
    /// Whether choices of this kind are checked by default
    pub fn preselected(self) -> bool {
        !matches!(self, ChoiceKind::OverwriteNonDev)
    }
}

/// One selectable entry presented to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanChoice {
    pub action: ActionItem,
    pub kind: ChoiceKind,
    pub label: String,
    pub preselected: bool,
}

impl PlanChoice {
    fn new(action: ActionItem, kind: ChoiceKind, label: String) -> Self {
        Self {
            action,
            kind,
            label,
            preselected: kind.preselected(),
        }
    }
}

/// Check that every reference is an on-disk file
///
/// Returns all offending references at once so the operator can fix them in one pass.
pub fn validate_local_files(local: &[FileRef]) -> Result<(), PlanError> {
    let refs: Vec<String> = local
        .iter()
        .filter(|f| !f.is_local())
        .map(|f| f.to_string())
        .collect();

    if refs.is_empty() {
        Ok(())
    } else {
        Err(PlanError::Validation { refs })
    }
}

/// Compute the reconciliation plan
pub fn build_plan(
    local: &[FileRef],
    remote: &[PolicyObject],
    extension: &str,
) -> Result<SyncPlan, PlanError> {
    validate_local_files(local)?;

    let named: Vec<(String, &FileRef)> = local
        .iter()
        .map(|f| (f.policy_name(extension), f))
        .collect();
    check_collisions(&named)?;

    let remote_by_name: HashMap<&str, &PolicyObject> =
        remote.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut plan = SyncPlan::default();
    for (name, file) in &named {
        let planned = PlannedFile {
            name: name.clone(),
            file: (*file).clone(),
        };
        match remote_by_name.get(name.as_str()) {
            None => plan.deploy.push(planned),
            Some(policy) if is_dev_owned(policy) => plan.overwrite_dev_rego.push(planned),
            Some(_) => plan.overwrite_non_dev_rego.push(planned),
        }
    }

    let local_names: HashSet<&str> = named.iter().map(|(n, _)| n.as_str()).collect();
    plan.delete = remote
        .iter()
        .filter(|p| is_dev_owned(p) && !local_names.contains(p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();

    tracing::debug!(
        deploy = plan.deploy.len(),
        overwrite_dev = plan.overwrite_dev_rego.len(),
        overwrite_non_dev = plan.overwrite_non_dev_rego.len(),
        delete = plan.delete.len(),
        "built sync plan"
    );

    Ok(plan)
}

fn check_collisions(named: &[(String, &FileRef)]) -> Result<(), PlanError> {
    let mut seen: HashMap<&str, Vec<String>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (name, file) in named {
        let paths = seen.entry(name.as_str()).or_default();
        if paths.is_empty() {
            order.push(name.as_str());
        }
        paths.push(file.path.display().to_string());
    }

    for name in order {
        if let Some(paths) = seen.get(name).filter(|p| p.len() > 1) {
            return Err(PlanError::NameCollision {
                name: name.to_string(),
                paths: paths.clone(),
            });
        }
    }
    Ok(())
}

/// Snapshot local and remote state and compute the plan
///
/// Local references are validated before the cluster is contacted.
pub async fn plan_sync(
    locator: &dyn PolicyLocator,
    store: &dyn PolicyStore,
    extension: &str,
) -> Result<SyncPlan, PlanError> {
    let local = locator.list_policy_files().map_err(PlanError::Locate)?;
    tracing::debug!("found {} local policy file(s)", local.len());
    validate_local_files(&local)?;

    let remote = store
        .list_policies()
        .await
        .map_err(|source| PlanError::RemoteList {
            namespace: store.namespace().to_string(),
            source,
        })?;
    tracing::debug!(
        "found {} remote policies in namespace {}",
        remote.len(),
        store.namespace()
    );

    build_plan(&local, &remote, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::StaticLocator;
    use crate::store::MockPolicyStore;

    fn files(paths: &[&str]) -> Vec<FileRef> {
        paths.iter().map(|p| FileRef::file(*p)).collect()
    }

    #[test]
    fn test_overwrite_dev_policy() {
        let plan = build_plan(
            &files(&["policy-a.rego"]),
            &[PolicyObject::dev("policy-a")],
            "rego",
        )
        .unwrap();

        assert!(plan.deploy.is_empty());
        assert_eq!(plan.overwrite_dev_names(), vec!["policy-a"]);
        assert!(plan.overwrite_non_dev_rego.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_overwrite_non_dev_policy_not_preselected() {
        let plan = build_plan(
            &files(&["policy-b.rego"]),
            &[PolicyObject::new("policy-b")],
            "rego",
        )
        .unwrap();

        assert_eq!(plan.overwrite_non_dev_names(), vec!["policy-b"]);
        assert!(plan.deploy.is_empty());
        assert!(plan.overwrite_dev_rego.is_empty());

        let choices = plan.choices();
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].kind, ChoiceKind::OverwriteNonDev);
        assert!(!choices[0].preselected);
        assert!(plan.default_selection().is_empty());
    }

    #[test]
    fn test_delete_orphaned_dev_policy() {
        let plan = build_plan(&[], &[PolicyObject::dev("policy-c")], "rego").unwrap();
        assert_eq!(plan.delete, vec!["policy-c"]);
        assert!(plan.deploy.is_empty());
        assert!(plan.overwrite_dev_rego.is_empty());
        assert!(plan.overwrite_non_dev_rego.is_empty());
    }

    #[test]
    fn test_non_dev_policies_never_deleted() {
        let plan = build_plan(
            &[],
            &[PolicyObject::new("external"), PolicyObject::dev("mine")],
            "rego",
        )
        .unwrap();
        assert_eq!(plan.delete, vec!["mine"]);
    }

    #[test]
    fn test_empty_remote_is_pure_deploy() {
        let local = files(&["a.rego", "sub/b.rego", "c.rego"]);
        let plan = build_plan(&local, &[], "rego").unwrap();

        assert_eq!(plan.deploy_names(), vec!["a", "b", "c"]);
        assert!(plan.overwrite_dev_rego.is_empty());
        assert!(plan.overwrite_non_dev_rego.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_empty_local_all_dev_is_pure_delete() {
        let remote = vec![
            PolicyObject::dev("x"),
            PolicyObject::dev("y"),
            PolicyObject::dev("z"),
        ];
        let plan = build_plan(&[], &remote, "rego").unwrap();
        assert_eq!(plan.delete, vec!["x", "y", "z"]);
        assert!(plan.deploy.is_empty());
    }

    #[test]
    fn test_buckets_partition_local_files() {
        let local = files(&["new.rego", "mine.rego", "theirs.rego", "also-new.rego"]);
        let remote = vec![
            PolicyObject::dev("gone"),
            PolicyObject::new("theirs"),
            PolicyObject::dev("mine"),
            PolicyObject::new("untouched"),
        ];
        let plan = build_plan(&local, &remote, "rego").unwrap();

        assert_eq!(plan.deploy_names(), vec!["new", "also-new"]);
        assert_eq!(plan.overwrite_dev_names(), vec!["mine"]);
        assert_eq!(plan.overwrite_non_dev_names(), vec!["theirs"]);
        assert_eq!(plan.delete, vec!["gone"]);

        let mut all: Vec<&str> = plan.deploy_names();
        all.extend(plan.overwrite_dev_names());
        all.extend(plan.overwrite_non_dev_names());
        all.sort();
        assert_eq!(all, vec!["also-new", "mine", "new", "theirs"]);

        for name in &plan.delete {
            assert!(!all.contains(&name.as_str()));
        }
    }

    #[test]
    fn test_build_plan_is_deterministic() {
        let local = files(&["b.rego", "a.rego", "c.rego"]);
        let remote = vec![
            PolicyObject::dev("c"),
            PolicyObject::dev("q"),
            PolicyObject::dev("p"),
        ];
        let first = build_plan(&local, &remote, "rego").unwrap();
        let second = build_plan(&local, &remote, "rego").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.deploy_names(), vec!["b", "a"]);
        assert_eq!(first.delete, vec!["q", "p"]);
    }

    #[test]
    fn test_name_matching_is_case_sensitive() {
        let plan = build_plan(
            &files(&["Policy.rego"]),
            &[PolicyObject::dev("policy")],
            "rego",
        )
        .unwrap();
        assert_eq!(plan.deploy_names(), vec!["Policy"]);
        assert_eq!(plan.delete, vec!["policy"]);
    }

    #[test]
    fn test_validation_lists_every_non_file_reference() {
        let local = vec![
            FileRef::file("ok.rego"),
            FileRef::with_scheme("untitled", "Untitled-1"),
            FileRef::with_scheme("git", "policies/old.rego"),
        ];
        let err = build_plan(&local, &[PolicyObject::dev("ok")], "rego").unwrap_err();

        match err {
            PlanError::Validation { refs } => {
                assert_eq!(refs, vec!["untitled:Untitled-1", "git:policies/old.rego"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_name_collision_rejected() {
        let local = files(&["team-a/authz.rego", "other.rego", "team-b/authz.rego"]);
        let err = build_plan(&local, &[], "rego").unwrap_err();

        match err {
            PlanError::NameCollision { name, paths } => {
                assert_eq!(name, "authz");
                assert_eq!(paths, vec!["team-a/authz.rego", "team-b/authz.rego"]);
            }
            other => panic!("expected name collision, got {other:?}"),
        }
    }

    #[test]
    fn test_choices_preselection() {
        let plan = build_plan(
            &files(&["new.rego", "mine.rego", "theirs.rego"]),
            &[
                PolicyObject::dev("mine"),
                PolicyObject::new("theirs"),
                PolicyObject::dev("gone"),
            ],
            "rego",
        )
        .unwrap();

        let choices = plan.choices();
        let summary: Vec<(ChoiceKind, bool)> =
            choices.iter().map(|c| (c.kind, c.preselected)).collect();
        assert_eq!(
            summary,
            vec![
                (ChoiceKind::Deploy, true),
                (ChoiceKind::OverwriteDev, true),
                (ChoiceKind::OverwriteNonDev, false),
                (ChoiceKind::Delete, true),
            ]
        );

        assert_eq!(
            plan.default_selection(),
            vec![
                ActionItem::Deploy {
                    path: "new.rego".into()
                },
                ActionItem::Deploy {
                    path: "mine.rego".into()
                },
                ActionItem::Delete {
                    name: "gone".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_plan_serializes_bucket_names() {
        let plan = build_plan(&files(&["a.rego"]), &[PolicyObject::dev("b")], "rego").unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["deploy"][0]["name"], "a");
        assert_eq!(json["deploy"][0]["file"]["scheme"], "file");
        assert_eq!(json["overwriteDevRego"], serde_json::json!([]));
        assert_eq!(json["delete"][0], "b");
    }

    #[tokio::test]
    async fn test_plan_sync_validates_before_listing() {
        let locator = StaticLocator::new(vec![FileRef::with_scheme("untitled", "x.rego")]);
        let store = MockPolicyStore::with_policies(vec![PolicyObject::dev("x")]);

        let err = plan_sync(&locator, &store, "rego").await.unwrap_err();
        assert!(matches!(err, PlanError::Validation { .. }));
        assert_eq!(store.operation_counts().lists, 0);
    }

    #[tokio::test]
    async fn test_plan_sync_wraps_listing_failure() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        let store = MockPolicyStore::new();
        store.fail_listing("connection refused");

        let err = plan_sync(&locator, &store, "rego").await.unwrap_err();
        assert!(matches!(err, PlanError::RemoteList { ref namespace, .. } if namespace == "opa"));
        let messages = err.messages();
        assert_eq!(messages[0], "failed to list policies in namespace 'opa'");
        assert!(messages[1].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_plan_sync_builds_plan() {
        let locator = StaticLocator::new(files(&["a.rego", "b.rego"]));
        let store = MockPolicyStore::with_policies(vec![
            PolicyObject::dev("b"),
            PolicyObject::dev("c"),
        ]);

        let plan = plan_sync(&locator, &store, "rego").await.unwrap();
        assert_eq!(plan.deploy_names(), vec!["a"]);
        assert_eq!(plan.overwrite_dev_names(), vec!["b"]);
        assert_eq!(plan.delete, vec!["c"]);
    }
}
