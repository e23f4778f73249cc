//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Sync plans grouped by bucket
//! - Batch reports with per-action failure chains
//! - Remote policy listings with ownership and load status

use console::style;
use std::io::{self, Write};

use opasync_core::{BatchReport, PolicyObject, PolicyStatus, SyncPlan, is_dev_owned};

/// Write a plan grouped by bucket
pub fn write_plan<W: Write>(out: &mut W, plan: &SyncPlan, namespace: &str) -> io::Result<()> {
    writeln!(
        out,
        "Plan for namespace {} ({} change(s)):",
        style(namespace).cyan(),
        plan.len()
    )?;

    if !plan.deploy.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Deploy (new policies):").bold())?;
        for planned in &plan.deploy {
            writeln!(
                out,
                "    {} {}  {}",
                style("+").green(),
                planned.name,
                style(planned.file.path.display()).dim()
            )?;
        }
    }

    if !plan.overwrite_dev_rego.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Overwrite (deployed by opasync):").bold())?;
        for planned in &plan.overwrite_dev_rego {
            writeln!(
                out,
                "    {} {}  {}",
                style("~").blue(),
                planned.name,
                style(planned.file.path.display()).dim()
            )?;
        }
    }

    if !plan.overwrite_non_dev_rego.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "  {}",
            style("Overwrite (NOT deployed by opasync, skipped unless selected):")
                .yellow()
                .bold()
        )?;
        for planned in &plan.overwrite_non_dev_rego {
            writeln!(
                out,
                "    {} {}  {}",
                style("!").yellow(),
                planned.name,
                style(planned.file.path.display()).dim()
            )?;
        }
    }

    if !plan.delete.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", style("Delete (no local file):").bold())?;
        for name in &plan.delete {
            writeln!(out, "    {} {}", style("-").red(), name)?;
        }
    }

    Ok(())
}

/// Write per-action results followed by the summary line
pub fn write_report<W: Write>(out: &mut W, report: &BatchReport) -> io::Result<()> {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => writeln!(out, "  {} {}", style("✓").green(), outcome.action)?,
            Err(failure) => {
                writeln!(out, "  {} {}", style("✗").red(), outcome.action)?;
                for message in &failure.messages {
                    writeln!(out, "      {}", style(message).dim())?;
                }
            }
        }
    }

    writeln!(out)?;
    let icon = if report.is_success() {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    writeln!(out, "{} {}", icon, report.summary())
}

/// Write a table of remote policies
pub fn write_policies<W: Write>(out: &mut W, policies: &[PolicyObject]) -> io::Result<()> {
    if policies.is_empty() {
        return writeln!(out, "No policies found");
    }

    let width = policies
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    writeln!(
        out,
        "{}",
        style(format!("{:<width$}  {:<8}  STATUS", "NAME", "OWNER")).bold()
    )?;

    for policy in policies {
        let status = match policy.status() {
            PolicyStatus::Ok => style(PolicyStatus::Ok.to_string()).green(),
            err @ PolicyStatus::Error(_) => style(err.to_string()).red(),
            PolicyStatus::Unknown => style(PolicyStatus::Unknown.to_string()).dim(),
        };
        writeln!(
            out,
            "{:<width$}  {:<8}  {}",
            policy.name,
            owner(policy),
            status
        )?;
    }

    Ok(())
}

/// Name the unsafe overwrites a non-interactive run left out
pub fn write_skipped_overwrites<W: Write>(out: &mut W, plan: &SyncPlan) -> io::Result<()> {
    if plan.overwrite_non_dev_rego.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "{} Skipped overwriting policies not deployed by opasync: {}",
        style("⚠").yellow(),
        plan.overwrite_non_dev_names().join(", ")
    )?;
    writeln!(out, "  Run `opasync sync` in a terminal to select them.")
}

/// Who created a policy, as shown to the operator
pub fn owner(policy: &PolicyObject) -> &'static str {
    if is_dev_owned(policy) { "opasync" } else { "external" }
}

pub fn print_plan(plan: &SyncPlan, namespace: &str) -> io::Result<()> {
    write_plan(&mut io::stdout().lock(), plan, namespace)
}

pub fn print_report(report: &BatchReport) -> io::Result<()> {
    write_report(&mut io::stdout().lock(), report)
}

pub fn warn_skipped_overwrites(plan: &SyncPlan) -> io::Result<()> {
    write_skipped_overwrites(&mut io::stderr().lock(), plan)
}

pub fn print_policies(policies: &[PolicyObject]) -> io::Result<()> {
    write_policies(&mut io::stdout().lock(), policies)
}
