//! Main workflow orchestration logic
//!
//! Turns the requested commands into a fixed sequence of phases: precondition
//! checks, version resolution, release task lookup, branch creation, task
//! linking, merges and status transitions. Preconditions are all checked
//! before the first external mutation; after that the first failure aborts
//! the run and nothing is rolled back.

use semver::Version;

use crate::analyzer::{RelationDiscovery, RelationResult};
use crate::branching::BranchWorkflow;
use crate::cli::{Command, Plan};
use crate::codehost::CodeHost;
use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::domain::{TaskKey, TaskPattern};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::hooks::HookRunner;
use crate::tracker::{IssueLinkage, IssueTracker, StatusTransition, TrackerVersion};
use crate::ui::{self, Prompt};
use crate::version::VersionResolver;

/// Arguments for the release workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
/// This decoupling allows the workflow to be called programmatically
/// without depending on clap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowArgs {
    pub commands: Vec<Command>,

    /// Pull requests whose merge commits make up a hotfix, in order
    pub prs: Vec<u64>,

    /// Explicit release task key, skips the search
    pub task: Option<String>,

    /// Non-interactive mode: accept proposals, skip tracker version selection
    pub no_input: bool,
}

/// External systems the workflow drives.
///
/// Clients that are not configured are `None`; the run fails before any
/// mutation when a requested phase needs one of them.
pub struct Services<'a> {
    pub repo: &'a dyn Repository,
    pub hooks: &'a dyn HookRunner,
    pub tracker: Option<&'a dyn IssueTracker>,
    pub code_host: Option<&'a dyn CodeHost>,
    pub prompt: &'a dyn Prompt,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub version: Version,
    pub branch: String,
    pub release_task: Option<TaskKey>,
    pub tracker_version: Option<TrackerVersion>,
    pub relations: Option<RelationResult>,
    pub linked: Vec<TaskKey>,
    pub transitioned: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    fn new(version: Version, branch: String) -> Self {
        RunReport {
            version,
            branch,
            release_task: None,
            tracker_version: None,
            relations: None,
            linked: Vec::new(),
            transitioned: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Whether something needs a human to look at it
    pub fn needs_follow_up(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::needs_follow_up)
    }

    /// Process exit code: 0 on full success, 1 when follow-up is needed
    pub fn exit_code(&self) -> i32 {
        if self.needs_follow_up() {
            1
        } else {
            0
        }
    }
}

/// Everything checked before the first mutation
struct Preconditions<'a> {
    tracker: Option<&'a dyn IssueTracker>,
    code_host: Option<&'a dyn CodeHost>,
    pattern: Option<TaskPattern>,
    set_version: Option<&'a str>,
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    services: Services<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, services: Services<'a>) -> Self {
        Orchestrator { config, services }
    }

    /// Run the phases enabled by `args.commands`.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - every phase ran; the report may still carry
    ///   diagnostics needing follow-up
    /// * `Err` - a precondition failed, no related tasks were found or an
    ///   external operation failed
    pub fn run(&self, args: &WorkflowArgs) -> Result<RunReport> {
        let plan = Plan::from_commands(&args.commands);
        tracing::debug!(?plan, "workflow plan");

        let checked = self.check_preconditions(&plan, args)?;

        let version = VersionResolver::new(
            self.services.hooks,
            self.config.get_version_hook()?,
            self.services.prompt,
        )
        .resolve(plan.release_bump, plan.hotfix_bump, !args.no_input)?;
        ui::display_status(&format!("Version: {}", version));

        let hotfix_commits = if plan.hotfix_branch {
            self.hotfix_commits(checked.code_host, &args.prs)?
        } else {
            Vec::new()
        };

        let linkage = checked.tracker.map(|tracker| {
            IssueLinkage::new(tracker, &self.config.jira, self.config.workflow.link_workers)
        });

        // Searched before anything changes so a duplicate task aborts cleanly.
        let release_task_lookup = match (plan.release_task, &args.task) {
            (true, None) => {
                Some(required(&linkage, "issue tracker")?.find_release_task(&version)?)
            }
            _ => None,
        };

        let mut flow = BranchWorkflow::new(
            self.services.repo,
            self.services.hooks,
            &self.config.git,
            version.clone(),
        )?;
        let mut report = RunReport::new(version.clone(), flow.branch_name().to_string());

        if plan.tracker_version {
            if let (Some(linkage), false) = (&linkage, args.no_input) {
                report.tracker_version =
                    linkage.select_or_create_version(&version, self.services.prompt)?;
            }
            ui::display_status(&format!(
                "Tracker version: {}",
                report
                    .tracker_version
                    .as_ref()
                    .map(|v| v.name.as_str())
                    .unwrap_or("-")
            ));
        }

        if let Some(release_set) = checked.set_version {
            if plan.release_branch {
                flow.create_release_branch(&self.config.git.base, release_set)?;
            }
            if plan.hotfix_branch {
                flow.create_hotfix_branch(&hotfix_commits, release_set)?;
            }
        }

        if plan.release_task {
            report.release_task = Some(match (&args.task, release_task_lookup) {
                (Some(key), _) => TaskKey::new(key),
                (None, Some(lookup)) => {
                    required(&linkage, "issue tracker")?.ensure_release_task(lookup)?
                }
                (None, None) => return Err(ReleaseError::missing("release task key")),
            });
        }

        if plan.links {
            self.link_release_tasks(&checked, &linkage, &flow, &mut report)?;
        }

        if plan.merge_to_master {
            flow.merge_release_to_stable()?;
        }

        if plan.merge_to_develop {
            flow.merge_stable_to_develop()?;
        }

        if plan.release_task_done || plan.children_done {
            let key = report
                .release_task
                .clone()
                .ok_or_else(|| ReleaseError::missing("release task key"))?;
            let tracker = required(&checked.tracker, "issue tracker")?;
            let transitions = StatusTransition::new(*tracker, &self.config.jira);

            if plan.release_task_done {
                let done = transitions.mark_release_task_done(&key)?;
                report.transitioned.extend(done.transitioned);
                report.diagnostics.extend(done.diagnostics);
            }

            if plan.children_done {
                let done = transitions.mark_children_done(&key)?;
                report.transitioned.extend(done.transitioned);
                report.diagnostics.extend(done.diagnostics);

                let released = required(&linkage, "issue tracker")?.release_version(&key)?;
                report.diagnostics.extend(released);
            }
        }

        if report.needs_follow_up() {
            ui::display_error("Release workflow finished, some items need follow-up");
        } else {
            ui::display_success(&format!("Release workflow for {} finished", report.version));
        }
        Ok(report)
    }

    /// Validate inputs and configuration before anything is changed.
    fn check_preconditions(&self, plan: &Plan, args: &WorkflowArgs) -> Result<Preconditions<'a>> {
        if args.commands.is_empty() {
            return Err(ReleaseError::missing("at least one command"));
        }
        if !args.prs.is_empty() && !plan.hotfix_branch {
            return Err(ReleaseError::missing(
                "--pr is only used by hotfix and make-hotfix-branch",
            ));
        }
        if plan.hotfix_branch && args.prs.is_empty() {
            return Err(ReleaseError::missing(
                "pull requests to cherry-pick into the hotfix branch (--pr)",
            ));
        }

        self.config.get_version_hook()?;
        let set_version = if plan.creates_branch() {
            Some(self.config.set_version_hook()?)
        } else {
            None
        };

        let tracker = if plan.needs_tracker() {
            self.config.validate_jira()?;
            Some(*required(&self.services.tracker, "issue tracker client")?)
        } else {
            None
        };

        let code_host = if plan.needs_code_host() {
            self.config.validate_github()?;
            Some(*required(&self.services.code_host, "code host client")?)
        } else {
            None
        };

        let pattern = if plan.links {
            Some(TaskPattern::new(&self.config.github.task_re)?)
        } else {
            None
        };

        if plan.clean_tree {
            let changes = self.services.repo.local_changes()?;
            if !changes.is_empty() {
                return Err(ReleaseError::DirtyWorkingTree(changes.join("\n")));
            }
        }

        Ok(Preconditions {
            tracker,
            code_host,
            pattern,
            set_version,
        })
    }

    /// Merge commits of the hotfix pull requests, in the given order
    fn hotfix_commits(&self, code_host: Option<&dyn CodeHost>, prs: &[u64]) -> Result<Vec<String>> {
        let code_host = required(&code_host, "code host client")?;
        prs.iter()
            .map(|&number| {
                let pull = code_host.pull_request(number)?;
                pull.merge_commit_sha.ok_or_else(|| {
                    ReleaseError::missing(format!(
                        "merge commit of pull request #{} (is it merged?)",
                        number
                    ))
                })
            })
            .collect()
    }

    fn link_release_tasks(
        &self,
        checked: &Preconditions<'a>,
        linkage: &Option<IssueLinkage<'_>>,
        flow: &BranchWorkflow<'_>,
        report: &mut RunReport,
    ) -> Result<()> {
        let release_task = report
            .release_task
            .clone()
            .ok_or_else(|| ReleaseError::missing("release task key"))?;
        let code_host = required(&checked.code_host, "code host client")?;
        let pattern = required(&checked.pattern, "task key pattern")?;

        let relations =
            RelationDiscovery::new(self.services.repo, *code_host, pattern, &self.config.git)
                .discover(flow.branch_name())?;

        if !relations.unresolved_pull_requests.is_empty() {
            let diagnostic = Diagnostic::UnresolvedPullRequests {
                numbers: relations.unresolved_pull_requests.clone(),
            };
            ui::display_diagnostic(&diagnostic);
            report.diagnostics.push(diagnostic);
        }

        if relations.tasks.is_empty() {
            return Err(ReleaseError::NoRelatedTasksFound(flow.branch_name().to_string()));
        }

        let linked = required(linkage, "issue tracker")?.link_children(
            &release_task,
            &relations.tasks,
            report.tracker_version.as_ref(),
        )?;
        ui::display_success(&format!(
            "Made links from {} to {}",
            release_task,
            linked
                .linked
                .iter()
                .map(TaskKey::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        report.diagnostics.extend(linked.diagnostics());
        report.linked = linked.linked;
        report.relations = Some(relations);
        Ok(())
    }
}

fn required<'v, T>(value: &'v Option<T>, what: &str) -> Result<&'v T> {
    value
        .as_ref()
        .ok_or_else(|| ReleaseError::missing(what.to_string()))
}
