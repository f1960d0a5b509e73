// src/cli.rs
use crate::analysis::{PortfolioAnalysis, UserInput};
use crate::app::AppContext;
use crate::auth::AuthSnapshot;
use crate::environment::{github_client_secret, EnvironmentConfig};
use crate::view::View;
use crate::web::{start_relay_server, TokenRelay};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use url::Url;

#[derive(Parser)]
#[command(name = "portfolio-pilot")]
#[command(about = "Score a GitHub portfolio with a hosted AI model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Also write JSON logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Run the token-exchange relay
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the GitHub authorization URL to open
    Login,
    /// Complete a login with the URL GitHub redirected to
    Callback { url: String },
    /// Show session, pending error and cached analysis
    Status,
    /// Analyze a user's public repositories
    Analyze {
        /// Defaults to the signed-in user
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        role: String,
        #[arg(long, default_value = "Mid-level")]
        experience: String,
        #[arg(long = "focus")]
        focus: Vec<String>,
    },
    /// Deep-dive a single repository from the current analysis
    DeepDive { repo: String },
    /// Forget the current analysis
    Reset,
    /// Dismiss the stored auth error
    ClearError,
    /// Sign out and drop the cached analysis
    Logout,
    /// Write the cached analysis record as JSON
    Export {
        #[arg(long, default_value = "portfolio-analysis.json")]
        out: PathBuf,
    },
}

/// Run `command` in its own task. Errors and panics end in a recoverable
/// message instead of a bare exit.
pub async fn run_guarded(cli: Cli) -> Result<()> {
    let command = cli.command.clone();
    let config_path = cli.config.clone();

    match tokio::spawn(async move { handle_command(command, config_path).await }).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Command failed: {:#}", e);
            print_fallback(&e.to_string());
            Err(e)
        }
        Err(join_error) => {
            error!("Command panicked: {}", join_error);
            print_fallback("An unexpected error occurred.");
            Err(anyhow::anyhow!("command aborted: {}", join_error))
        }
    }
}

fn print_fallback(message: &str) {
    eprintln!("Something went wrong: {}", message);
    eprintln!("  Try again:    rerun the same command");
    eprintln!("  Full reload:  portfolio-pilot status");
}

pub async fn handle_command(command: Command, config_path: PathBuf) -> Result<()> {
    let config = EnvironmentConfig::load(&config_path)?;

    if let Command::Serve { port } = command {
        let relay = TokenRelay::new(
            config.github.client_id.clone(),
            config.github.access_token_url.clone(),
            github_client_secret(),
        )?;
        return start_relay_server(relay, port.unwrap_or(config.relay_port)).await;
    }

    let mut app = AppContext::from_config(config).await?;

    if let Command::Callback { url } = &command {
        let mut location = Url::parse(url).context("Callback URL is not a valid URL")?;
        let snapshot = app.page_load(&mut location).await;
        print_auth(&snapshot);
        println!("Location: {}", location);
        return Ok(());
    }

    let mut location = app.home_url()?;
    let snapshot = app.page_load(&mut location).await;

    match command {
        Command::Login => {
            let url = app.auth.login().await?;
            info!("Authorization URL issued");
            println!("Open this URL to sign in with GitHub:\n{}", url);
            println!("Then run: portfolio-pilot callback '<redirected URL>'");
        }

        Command::Status => {
            print_auth(&snapshot);
            match app.cache.load().await? {
                Some(record) => {
                    let age = app.cache.age_description().await?.unwrap_or_default();
                    println!(
                        "Cached analysis: {} (score {}, {})",
                        record.username, record.analysis.overall_score, age
                    );
                }
                None => println!("Cached analysis: none"),
            }
            println!("View: {:?}", app.view.view());
        }

        Command::Analyze {
            username,
            role,
            experience,
            focus,
        } => {
            let username = username
                .or_else(|| snapshot.user.as_ref().map(|u| u.login.clone()))
                .context("No username given and nobody is signed in")?;

            let input = UserInput {
                username,
                target_role: role,
                experience_level: experience,
                focus_areas: focus.into_iter().collect(),
            };

            let mut progress = app.view.subscribe_progress();
            let printer = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let step = progress.borrow_and_update().clone();
                    if step.percent > 0 {
                        eprintln!("[{:>3}%] {}", step.percent, step.step);
                    }
                }
            });

            let view = app.analyze(input).await;
            printer.abort();

            match (view, app.view.analysis()) {
                (View::Results, Some(analysis)) => print_analysis(analysis),
                _ => anyhow::bail!(
                    "{}",
                    app.view.error().unwrap_or("Analysis failed. Please try again.")
                ),
            }
        }

        Command::DeepDive { repo } => {
            if app.view.view() != View::Results {
                anyhow::bail!("No analysis loaded. Sign in and run `analyze` first.");
            }
            app.view.select_repo_by_name(&repo).await?;

            let Some(overlay) = app.view.deep_dive() else {
                anyhow::bail!("Deep-dive did not open");
            };
            match &overlay.result {
                Some(result) => {
                    println!("{}", result.repo_name);
                    println!("{}\n", result.overall_impression);
                    println!(
                        "Code structure: {:?}\n  {}",
                        result.code_structure.rating, result.code_structure.feedback
                    );
                    println!(
                        "README: {:?}\n  {}",
                        result.readme_quality.rating, result.readme_quality.feedback
                    );
                    for suggestion in &result.readme_quality.suggestions {
                        println!("  - {}", suggestion);
                    }
                    println!("Improvements:");
                    for item in &result.potential_improvements {
                        println!("  - {}: {}", item.area, item.suggestion);
                    }
                }
                None => println!("No analysis available for {}.", overlay.repo.name),
            }
        }

        Command::Reset => {
            if app.view.view() == View::Landing {
                app.view.get_started();
            }
            app.view.reset().await?;
            println!("Analysis cleared.");
        }

        Command::ClearError => {
            app.auth.clear_error().await;
            println!("Error dismissed.");
        }

        Command::Logout => {
            app.logout().await?;
            println!("Signed out.");
        }

        Command::Export { out } => {
            let record = app
                .cache
                .load()
                .await?
                .context("No saved analysis to export")?;
            let json = serde_json::to_string_pretty(&record)?;
            tokio::fs::write(&out, json)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Exported analysis to {}", out.display());
        }

        Command::Serve { .. } | Command::Callback { .. } => {}
    }

    Ok(())
}

fn print_auth(snapshot: &AuthSnapshot) {
    match &snapshot.user {
        Some(user) => println!("Signed in as {} ({})", user.label(), user.login),
        None => println!("Not signed in"),
    }
    if let Some(error) = &snapshot.error {
        println!("Error [{:?}]: {}", error.kind, error.message);
    }
}

fn print_analysis(analysis: &PortfolioAnalysis) {
    let breakdown = &analysis.score_breakdown;
    println!("Overall score: {}/100\n", analysis.overall_score);
    println!("{}\n", analysis.summary);
    println!(
        "Documentation {} | Code quality {} | Diversity {} | Commits {} | Tech stack {}",
        breakdown.documentation,
        breakdown.code_quality,
        breakdown.project_diversity,
        breakdown.commit_patterns,
        breakdown.tech_stack
    );

    println!("\nFeatured repositories:");
    for repo in &analysis.repositories {
        println!("  {} ({}/100): {}", repo.name, repo.score, repo.description);
    }

    println!("\nRecommendations:");
    for rec in &analysis.recommendations {
        println!("  [{:?}] {}: {}", rec.priority, rec.title, rec.description);
    }
}
