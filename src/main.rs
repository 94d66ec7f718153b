use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gitscope::analysis::{format_count, repo_query};
use gitscope::github::RateLimitInfo;
use gitscope::models::{ProfileData, ProfileInsights, Repository};
use gitscope::{
    ClientConfig, Config, Error, GitHubClient, InsightsEngine, LocalStore, RepoQuery,
    RepoSort, RequestCoordinator,
};

#[derive(Parser, Debug)]
#[command(name = "gitscope")]
#[command(version)]
#[command(about = "Browse GitHub profiles, their repositories and a few derived insights")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a profile and show it with insights and repositories
    Show(ShowArgs),

    /// Show the last viewed profile if it is still cached
    Last {
        /// Output format (json, text, markdown)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Manage favorite usernames
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Compare two profiles side by side
    Compare {
        first: String,
        second: String,
    },
}

#[derive(clap::Args, Debug)]
struct ShowArgs {
    /// GitHub username to look up
    username: String,

    /// Output format (json, text, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Repository ordering (updated, stars, forks, name)
    #[arg(long, default_value = "updated")]
    sort: RepoSort,

    /// Only list repositories in this language
    #[arg(long)]
    language: Option<String>,

    /// Only list repositories whose name or description contains this text
    #[arg(long)]
    search: Option<String>,

    /// Use the cached snapshot if it is fresh and for the same user
    #[arg(long)]
    cached: bool,
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    List,
    Add { username: String },
    Remove { username: String },
}

#[derive(Serialize)]
struct Report<'a> {
    user: &'a gitscope::models::GitHubUser,
    favorite: bool,
    insights: &'a ProfileInsights,
    repositories: Vec<&'a Repository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gitscope=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = LocalStore::new(&config.database_path)?;

    match cli.command {
        Command::Show(args) => show(&args, &config, &store).await,
        Command::Last { format } => {
            match store.cached_snapshot() {
                Some(snapshot) => {
                    tracing::info!("Using cached snapshot from {}", snapshot.captured_at);
                    let data = ProfileData::from(snapshot);
                    let output = render(&data, &RepoQuery::default(), &format, &store)?;
                    println!("{}", output);
                }
                None => println!("No recently viewed profile."),
            }
            Ok(())
        }
        Command::Favorites { action } => {
            let favorites = match action {
                FavoritesAction::List => store.favorites(),
                FavoritesAction::Add { username } => store.add_favorite(&username),
                FavoritesAction::Remove { username } => store.remove_favorite(&username),
            };
            if favorites.is_empty() {
                println!("No favorites yet.");
            }
            for username in favorites {
                println!("{}", username);
            }
            Ok(())
        }
        Command::Compare { first, second } => compare(&first, &second, &config).await,
    }
}

async fn show(args: &ShowArgs, config: &Config, store: &LocalStore) -> anyhow::Result<()> {
    let query = RepoQuery {
        sort: args.sort,
        language: args.language.clone(),
        search: args.search.clone(),
    };

    if args.cached {
        if let Some(snapshot) = store.cached_snapshot() {
            if snapshot.user.login.eq_ignore_ascii_case(args.username.trim()) {
                tracing::info!("Using cached snapshot from {}", snapshot.captured_at);
                let data = ProfileData::from(snapshot);
                return write_output(&render(&data, &query, &args.format, store)?, args);
            }
        }
        tracing::info!("No fresh cached snapshot, fetching");
    }

    let coordinator = RequestCoordinator::new(GitHubClient::new(&ClientConfig::from(config))?);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Fetching {}", args.username.trim()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = tokio::select! {
        outcome = coordinator.resolve(&args.username) => outcome,
        _ = tokio::signal::ctrl_c() => {
            coordinator.cancel_pending();
            Ok(None)
        }
    };
    spinner.finish_and_clear();

    let data = match outcome {
        Ok(Some(data)) => data,
        // Blank handle or interrupted: nothing to show.
        Ok(None) => return Ok(()),
        Err(e) => anyhow::bail!(describe_failure(args.username.trim(), &e)),
    };

    store.cache_snapshot(&data.user, &data.repos);
    write_output(&render(&data, &query, &args.format, store)?, args)
}

async fn compare(first: &str, second: &str, config: &Config) -> anyhow::Result<()> {
    let client = Arc::new(GitHubClient::new(&ClientConfig::from(config))?);
    // One coordinator per side so neither lookup supersedes the other.
    let left = RequestCoordinator::new(client.clone());
    let right = RequestCoordinator::new(client);

    let (a, b) = tokio::join!(left.resolve(first), right.resolve(second));

    let engine = InsightsEngine::new();
    let column = |name: &str, outcome: gitscope::Result<Option<ProfileData>>| -> Vec<String> {
        match outcome {
            Ok(Some(data)) => {
                let insights = engine.compute(&data.user, &data.repos);
                vec![
                    data.user.login.clone(),
                    format_count(data.user.followers),
                    data.user.public_repos.to_string(),
                    format_count(insights.total_stars),
                    insights.top_language().unwrap_or("-").to_string(),
                    format!("{}/100", insights.health_score),
                ]
            }
            Ok(None) => vec![name.to_string(), "-".into(), "-".into(), "-".into(), "-".into(), "-".into()],
            Err(e) => {
                eprintln!("{}", describe_failure(name, &e));
                vec![name.to_string(), "-".into(), "-".into(), "-".into(), "-".into(), "-".into()]
            }
        }
    };

    let a = column(first.trim(), a);
    let b = column(second.trim(), b);
    let labels = ["User", "Followers", "Public repos", "Total stars", "Top language", "Health"];

    let mut output = String::new();
    for (i, label) in labels.iter().enumerate() {
        output.push_str(&format!("{:<14} {:<20} {:<20}\n", label, a[i], b[i]));
    }
    print!("{}", output);

    Ok(())
}

fn describe_failure(username: &str, error: &Error) -> String {
    match error {
        Error::NotFound(_) => format!("No GitHub user named \"{}\".", username),
        Error::RateLimited { remaining, limit, reset } => {
            let info = RateLimitInfo {
                remaining: *remaining,
                limit: *limit,
                reset: *reset,
            };
            let when = info
                .reset_at()
                .map(|at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "later".to_string());
            format!(
                "GitHub rate limit reached ({}/{} requests left). Resets at {}.",
                remaining, limit, when
            )
        }
        e if e.is_retryable() => {
            format!("{}. Try again in a moment.", e)
        }
        e => e.to_string(),
    }
}

fn write_output(output: &str, args: &ShowArgs) -> anyhow::Result<()> {
    if let Some(ref path) = args.output {
        std::fs::write(path, output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn render(
    data: &ProfileData,
    query: &RepoQuery,
    format: &str,
    store: &LocalStore,
) -> anyhow::Result<String> {
    let insights = InsightsEngine::new().compute(&data.user, &data.repos);
    let repos = query.apply(&data.repos);
    let favorite = store.is_favorite(&data.user.login);

    Ok(match format {
        "json" => serde_json::to_string_pretty(&Report {
            user: &data.user,
            favorite,
            insights: &insights,
            repositories: repos,
        })?,
        "markdown" => format_markdown(data, &insights, &repos, favorite),
        _ => format_text(data, &insights, &repos, favorite),
    })
}

fn format_text(
    data: &ProfileData,
    insights: &ProfileInsights,
    repos: &[&Repository],
    favorite: bool,
) -> String {
    let user = &data.user;
    let mut output = String::new();

    output.push_str(&format!(
        "\n=== {} ({}){} ===\n\n",
        user.display_name(),
        user.login,
        if favorite { " *" } else { "" }
    ));

    if let Some(ref bio) = user.bio {
        output.push_str(&format!("{}\n\n", bio));
    }
    for (label, value) in [
        ("Company", &user.company),
        ("Location", &user.location),
        ("Blog", &user.blog),
        ("Email", &user.email),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            output.push_str(&format!("{}: {}\n", label, value));
        }
    }
    output.push_str(&format!(
        "Followers: {}  Following: {}  Public repos: {}\n",
        format_count(user.followers),
        format_count(user.following),
        user.public_repos
    ));
    output.push_str(&format!("Joined: {}\n", user.created_at.format("%Y-%m-%d")));
    output.push_str(&format!("Profile: {}\n", user.html_url));

    output.push_str(&format!("\nHealth Score: {}/100\n", insights.health_score));
    output.push_str(&format!(
        "Total stars: {}  Total forks: {}\n",
        format_count(insights.total_stars),
        format_count(insights.total_forks)
    ));

    if !insights.top_languages.is_empty() {
        output.push_str("\nTop Languages:\n");
        for lang in &insights.top_languages {
            output.push_str(&format!(
                "  - {}: {} repos, {} stars\n",
                lang.name,
                lang.count,
                format_count(lang.stars)
            ));
        }
    }

    if let Some(ref repo) = insights.most_starred_repo {
        output.push_str(&format!(
            "\nMost starred: {} ({} stars)\n",
            repo.name,
            format_count(repo.stargazers_count)
        ));
    }
    if let Some(ref repo) = insights.most_recent_repo {
        output.push_str(&format!(
            "Most recent: {} (pushed {})\n",
            repo.name,
            repo.last_activity().format("%Y-%m-%d")
        ));
    }

    let languages = repo_query::languages(&data.repos);
    if !languages.is_empty() {
        output.push_str(&format!("\nLanguages: {}\n", languages.join(", ")));
    }

    output.push_str(&format!(
        "\nRepositories (showing {} of {}):\n",
        repos.len(),
        data.repos.len()
    ));
    if repos.is_empty() {
        output.push_str("  No repos match your filters.\n");
    }
    for repo in repos {
        output.push_str(&format!(
            "  {}{} [{}] ★ {} ⑂ {}\n",
            repo.name,
            if repo.fork { " (fork)" } else { "" },
            repo.language.as_deref().unwrap_or("-"),
            format_count(repo.stargazers_count),
            format_count(repo.forks_count)
        ));
        if let Some(ref description) = repo.description {
            output.push_str(&format!("      {}\n", description));
        }
    }

    output
}

fn format_markdown(
    data: &ProfileData,
    insights: &ProfileInsights,
    repos: &[&Repository],
    favorite: bool,
) -> String {
    let user = &data.user;
    let mut output = String::new();

    output.push_str(&format!(
        "# {} ([{}]({})){}\n\n",
        user.display_name(),
        user.login,
        user.html_url,
        if favorite { " ⭐" } else { "" }
    ));

    if let Some(ref bio) = user.bio {
        output.push_str(&format!("> {}\n\n", bio));
    }

    output.push_str("## Summary\n\n");
    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Followers | {} |\n", format_count(user.followers)));
    output.push_str(&format!("| Following | {} |\n", format_count(user.following)));
    output.push_str(&format!("| Public Repositories | {} |\n", user.public_repos));
    output.push_str(&format!("| Total Stars | {} |\n", format_count(insights.total_stars)));
    output.push_str(&format!("| Total Forks | {} |\n", format_count(insights.total_forks)));
    output.push_str(&format!("| Health Score | {}/100 |\n", insights.health_score));

    if !insights.top_languages.is_empty() {
        output.push_str("\n## Top Languages\n\n");
        output.push_str("| Language | Repos | Stars |\n|----------|-------|-------|\n");
        for lang in &insights.top_languages {
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                lang.name,
                lang.count,
                format_count(lang.stars)
            ));
        }
    }

    output.push_str(&format!("\n## Repositories ({} of {})\n\n", repos.len(), data.repos.len()));
    output.push_str("| Name | Language | Stars | Forks | Updated |\n");
    output.push_str("|------|----------|-------|-------|---------|\n");
    for repo in repos {
        output.push_str(&format!(
            "| [{}]({}) | {} | {} | {} | {} |\n",
            repo.name,
            repo.html_url,
            repo.language.as_deref().unwrap_or("-"),
            format_count(repo.stargazers_count),
            format_count(repo.forks_count),
            repo.last_activity().format("%Y-%m-%d")
        ));
    }

    output
}
