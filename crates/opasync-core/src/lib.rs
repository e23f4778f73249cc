//! opasync Core - reconciliation planning for OPA policies stored in Kubernetes
//!
//! This crate provides the cluster-independent parts of opasync:
//! - `policy`: local file references, remote policy objects and the dev-ownership check
//! - `plan`: the deploy / overwrite / delete classification
//! - `action`: concurrent execution of selected actions and batch reporting
//! - `orchestrator`: the plan → select → execute → report cycle
//! - `store`, `locator`, `select`: the seams to the cluster, the filesystem and the operator

pub mod action;
pub mod config;
pub mod error;
pub mod locator;
pub mod orchestrator;
pub mod plan;
pub mod policy;
pub mod select;
pub mod store;

pub use action::{
    ActionFailure, ActionItem, ActionOutcome, BatchReport, BatchStatus, execute, execute_all,
};
pub use config::SyncConfig;
pub use error::{CoreError, PlanError, Result};
pub use locator::{PolicyLocator, StaticLocator, WorkspaceLocator};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncState};
pub use plan::{ChoiceKind, PlanChoice, PlannedFile, SyncPlan, build_plan, plan_sync};
pub use policy::{FileRef, PolicyObject, PolicyStatus, derive_policy_name, is_dev_owned};
pub use select::{DefaultSelector, PlanSelector};
pub use store::{MockPolicyStore, PolicyStore};
