//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::io::BufReader;
use tracing::info;

use halopub_client::HaloClient;
use halopub_core::{
    ProgressReporter, PublishRequest, PublishStage, PublishWorkflow, ToolHandlers, ToolResult,
};
use halopub_shared::{
    AppConfig, ConfigOverrides, HaloConfig, config_file_path, init_config, load_config,
};

use crate::server::{SERVER_NAME, Server};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// halopub: publish to Halo with generated tags and categories.
#[derive(Parser)]
#[command(
    name = "halopub",
    version,
    about = "Publish posts to a Halo blog, generating tags and categories from the content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Halo base URL (overrides the config file).
    #[arg(long, env = "HALO_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Bearer token for the Halo API.
    #[arg(long, env = "HALO_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Log format: text (default) or json. Logs always go to stderr.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the tool server on stdin/stdout.
    Serve,

    /// Publish one post and print the summary.
    Publish(PublishArgs),

    /// List existing tags.
    Tags,

    /// List existing categories.
    Categories,

    /// Print tool-client configuration snippets for the stdio server.
    #[command(name = "client-config")]
    ClientConfig {
        /// Target client: claude-desktop, vscode, or cursor.
        #[arg(long, default_value = "claude-desktop")]
        target: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `halopub publish`.
#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Post title.
    #[arg(long)]
    pub title: String,

    /// Post content (Markdown or HTML).
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub content: Option<String>,

    /// Read the post content from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Excerpt; generated by the backend when omitted.
    #[arg(long)]
    pub excerpt: Option<String>,

    /// URL slug; derived from the title when omitted.
    #[arg(long)]
    pub slug: Option<String>,

    /// Tag name (repeatable). Generated from the content when none are given.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Category name (repeatable). Inferred from the content when none are given.
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Disable comments on the post.
    #[arg(long)]
    pub no_comments: bool,

    /// Pin the post.
    #[arg(long)]
    pub pinned: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show the config file and the resolved connection.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Output goes to stderr so stdout
/// stays reserved for protocol messages and command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "halopub=info",
        1 => "halopub=debug",
        _ => "halopub=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        base_url: cli.base_url,
        token: cli.token,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(&overrides).await,
        Command::Publish(args) => cmd_publish(&overrides, args).await,
        Command::Tags => print_tool_result(handlers(&overrides)?.list_tags().await),
        Command::Categories => print_tool_result(handlers(&overrides)?.list_categories().await),
        Command::ClientConfig { target } => cmd_client_config(&overrides, &target),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(force),
            ConfigAction::Show => cmd_config_show(&overrides),
        },
    }
}

/// Resolve the connection from flags, config file and environment.
fn resolve_connection(overrides: &ConfigOverrides) -> Result<HaloConfig> {
    let app: AppConfig = load_config()?;
    Ok(HaloConfig::resolve(&app, overrides, |name| std::env::var(name).ok())?)
}

fn connect(overrides: &ConfigOverrides) -> Result<HaloClient> {
    let config = resolve_connection(overrides)?;
    info!(base_url = %config.base_url(), "connecting to Halo");
    Ok(HaloClient::new(config)?)
}

fn handlers(overrides: &ConfigOverrides) -> Result<ToolHandlers> {
    Ok(ToolHandlers::new(connect(overrides)?))
}

fn print_tool_result(result: ToolResult) -> Result<()> {
    if result.is_error {
        return Err(eyre!(result.text));
    }
    println!("{}", result.text);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(overrides: &ConfigOverrides) -> Result<()> {
    let server = Server::new(handlers(overrides)?);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}

async fn cmd_publish(overrides: &ConfigOverrides, args: PublishArgs) -> Result<()> {
    let content = match (args.content, args.file.as_deref()) {
        (Some(content), _) => content,
        (None, Some(path)) => read_content(path)?,
        (None, None) => return Err(eyre!("either --content or --file is required")),
    };

    let request = PublishRequest {
        excerpt: args.excerpt,
        slug: args.slug,
        tags: Some(args.tags).filter(|t| !t.is_empty()),
        categories: Some(args.categories).filter(|c| !c.is_empty()),
        allow_comment: !args.no_comments,
        pinned: args.pinned,
        ..PublishRequest::new(args.title, content)
    };

    let workflow = PublishWorkflow::new(connect(overrides)?);
    let outcome = workflow
        .publish(&request, &CliProgress)
        .await
        .map_err(|failure| eyre!("publish failed before '{}': {}", failure.stage, failure.error))?;

    for skipped in &outcome.taxonomy_failures {
        eprintln!("  warning: {skipped}");
    }
    println!("{}", outcome.summary());
    Ok(())
}

fn read_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

/// Prints each reached stage to stderr.
struct CliProgress;

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: PublishStage) {
        eprintln!("  -> {stage}");
    }
}

fn cmd_client_config(overrides: &ConfigOverrides, target: &str) -> Result<()> {
    let config = resolve_connection(overrides)?;
    let binary = std::env::current_exe()
        .wrap_err("failed to locate the halopub binary")?
        .to_string_lossy()
        .to_string();

    let server = serde_json::json!({
        "command": binary,
        "args": ["serve"],
        "env": {
            "HALO_BASE_URL": config.base_url(),
            "HALO_TOKEN": "<your-token>",
        }
    });

    let (header, snippet) = match target {
        "claude-desktop" => (
            "// claude_desktop_config.json",
            serde_json::json!({"mcpServers": {SERVER_NAME: server}}),
        ),
        "vscode" => {
            let mut server = server;
            server["type"] = "stdio".into();
            (
                "// .vscode/mcp.json",
                serde_json::json!({"servers": {SERVER_NAME: server}}),
            )
        }
        "cursor" => (
            "// Cursor MCP settings",
            serde_json::json!({"mcpServers": {SERVER_NAME: server}}),
        ),
        _ => {
            return Err(eyre!(
                "unknown config target '{target}': expected 'claude-desktop', 'vscode', or 'cursor'"
            ));
        }
    };

    println!("{header}");
    println!("{}", serde_json::to_string_pretty(&snippet)?);
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let path = init_config(force)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(overrides: &ConfigOverrides) -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");

    let resolved = HaloConfig::resolve(&config, overrides, |name| std::env::var(name).ok())?;
    println!("# resolved base_url: {}", resolved.base_url());
    println!(
        "# token: {}",
        if resolved.has_token() { "set" } else { "not set" }
    );
    Ok(())
}
