use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use release_tool::cli::{Command, Orchestrator, Plan, Services, WorkflowArgs};
use release_tool::codehost::{repository_slug, CodeHost, GitHubClient};
use release_tool::config::{self, Config};
use release_tool::git::{GitRepo, Repository};
use release_tool::hooks::ShellHooks;
use release_tool::tracker::{IssueTracker, JiraClient};
use release_tool::ui::{self, NoInput, Prompt, TerminalPrompt};

#[derive(clap::Parser)]
#[command(
    name = "release-tool",
    version,
    about = "Cut, link, merge and close releases across git, Jira and GitHub"
)]
struct Args {
    /// Workflow commands to run, in any combination
    #[arg(value_enum, required = true)]
    commands: Vec<Command>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Never prompt; accept proposed values and skip tracker version selection")]
    noinput: bool,

    #[arg(
        long = "pr",
        value_name = "NUMBER",
        help = "Pull request to include in a hotfix (repeatable)"
    )]
    prs: Vec<u64>,

    #[arg(long, value_name = "KEY", help = "Use this release task instead of searching for it")]
    task: Option<String>,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let config = config::load_config(args.config.as_deref())?;
    let plan = Plan::from_commands(&args.commands);

    let repo = GitRepo::open(".", config.git.remote.clone())
        .context("Not inside a git repository")?;
    let hooks = ShellHooks::new(repo.workdir());

    let tracker = if plan.needs_tracker() {
        connect_tracker(&config)?
    } else {
        None
    };
    let code_host = if plan.needs_code_host() {
        connect_code_host(&config, &repo)?
    } else {
        None
    };

    let prompt: Box<dyn Prompt> = if args.noinput {
        Box::new(NoInput)
    } else {
        Box::new(TerminalPrompt)
    };

    let services = Services {
        repo: &repo,
        hooks: &hooks,
        tracker: tracker.as_deref(),
        code_host: code_host.as_deref(),
        prompt: prompt.as_ref(),
    };
    let workflow = WorkflowArgs {
        commands: args.commands,
        prs: args.prs,
        task: args.task,
        no_input: args.noinput,
    };

    let report = Orchestrator::new(&config, services).run(&workflow)?;
    Ok(report.exit_code())
}

/// Issue tracker client, when its connection is configured.
/// The orchestrator reports the missing settings otherwise.
fn connect_tracker(config: &Config) -> Result<Option<Box<dyn IssueTracker>>> {
    if config.validate_jira().is_err() {
        return Ok(None);
    }
    let client = JiraClient::connect(&config.jira.connection)?;
    Ok(Some(Box::new(client)))
}

fn connect_code_host(config: &Config, repo: &GitRepo) -> Result<Option<Box<dyn CodeHost>>> {
    if config.github.token.trim().is_empty() {
        return Ok(None);
    }
    let url = repo.remote_url()?;
    let slug = repository_slug(&url)
        .with_context(|| format!("Cannot find owner/repo in remote URL '{}'", url))?;
    let client = GitHubClient::connect(&config.github.api_url, slug, &config.github.token)?;
    tracing::debug!(repository = client.repository(), "code host connected");
    Ok(Some(Box::new(client)))
}
