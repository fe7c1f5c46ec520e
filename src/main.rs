//! keybump - CLI entry point.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use keybump::git::check_git_installed;
use keybump::{BumpType, Config, GitRepo, Project, TerminalPrompter};

/// Bump the project version from the changelog, then commit, tag and push.
#[derive(Parser, Debug)]
#[command(name = "keybump")]
#[command(about = "Cut a release from the changelog: bump, commit, tag and push")]
#[command(version)]
struct Cli {
    /// Version part to bump: patch, minor or major. Without it (here or in the
    /// config file) only the current version is reported
    #[arg(long)]
    bump: Option<BumpType>,

    /// Path to changelog file
    #[arg(long)]
    changelog: Option<PathBuf>,

    /// Path to config file (defaults to .keybump.toml in the repository root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never prompt; fail instead
    #[arg(long)]
    skip_interactive: bool,

    /// Do not commit the changelog
    #[arg(long)]
    skip_commit: bool,

    /// Do not create a tag
    #[arg(long)]
    skip_tag: bool,

    /// Do not push to the remote
    #[arg(long)]
    skip_push: bool,

    /// Dry run - print the next release without writing anything
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Command line flags win over the config file.
    fn apply(&self, config: &mut Config, root: &Path) {
        if let Some(bump) = self.bump {
            config.bump_type = Some(bump);
        }
        if let Some(path) = &self.changelog {
            config.changelog_file = path.clone();
        }
        config.skip_interactive |= self.skip_interactive;
        config.skip_commit |= self.skip_commit;
        config.skip_tag |= self.skip_tag;
        config.skip_push |= self.skip_push;

        if config.changelog_file.is_relative() {
            config.changelog_file = root.join(&config.changelog_file);
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Step 1: Check prerequisites
    check_git_installed().context("git is required")?;

    // Step 2: Open git repository
    let repo = GitRepo::discover(Path::new("."))
        .context("Not a git repository. Run keybump from within a git repository.")?;
    let root = repo.root().to_path_buf();

    // Step 3: Load configuration
    let mut config = Config::load(cli.config.as_deref(), &root)?;
    cli.apply(&mut config, &root);

    let bump_requested = config.bump_type.is_some();
    let mut project = Project::new(config, repo, TerminalPrompter);

    // Step 4: Report only when no bump was requested
    if !bump_requested {
        project.inspect().await?;
        println!("{}", project);
        return Ok(());
    }

    // Step 5: Preview or run the release
    if cli.dry_run {
        let release = project.preview().await?;
        println!("{}\n", project);
        println!("--- Dry Run Output ---\n");
        print!("{}", release.format(project.format()));
        return Ok(());
    }

    let release = project.run().await?;
    println!("{}\n", project);
    println!("✓ Released {}", release);

    Ok(())
}
