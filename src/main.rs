#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::needless_raw_string_hashes,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::sync::Arc;
use tenant_responder::config::Config;
use tenant_responder::gateway;
use tenant_responder::routing::{self, MatchedBy, RouteOutcome};
use tenant_responder::tenants::{self, StaticRegistry, TenantDirectory};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// Multi-tenant keyword auto-responder for messaging webhooks.
#[derive(Parser, Debug)]
#[command(name = "tenant-responder")]
#[command(version)]
#[command(about = "Answers messaging webhooks with per-tenant canned replies.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway server
    #[command(long_about = "\
Start the webhook gateway server.

Runs the HTTP gateway that accepts inbound message webhooks on \
POST /webhook and answers with TwiML. Bind address defaults to the \
values in your config file (gateway.host / gateway.port).

Examples:
  tenant-responder serve                  # use config defaults
  tenant-responder serve -p 8080          # listen on port 8080
  tenant-responder serve --host 0.0.0.0   # requires gateway.allow_public_bind
  tenant-responder serve -p 0             # random available port")]
    Serve {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// List configured tenants and their keywords
    Tenants,

    /// Show the reply a message would get, without starting the server
    #[command(long_about = "\
Show the reply a message would get, without starting the server.

Runs the same routing rules as the webhook against the configured \
tenants and prints the reply together with how it was chosen.

Examples:
  tenant-responder reply --to +15551112222 \"hola\"
  tenant-responder reply --to +15551112222 \"quiero ver el menu\"")]
    Reply {
        /// Destination number (E.164), as the messaging gateway sends it in `To`
        #[arg(long)]
        to: String,

        /// Inbound message text
        body: String,
    },

    /// Manage configuration
    #[command(long_about = "\
Manage configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  tenant-responder config schema              # print JSON Schema to stdout
  tenant-responder config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("TENANT_RESPONDER_CONFIG_DIR", config_dir);
    }

    // Completions and schema must remain stdout-only and should not load config or initialize logging.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            return write_shell_completion(*shell, &mut stdout);
        }
        Commands::Config {
            config_command: ConfigCommands::Schema,
        } => {
            let schema = schemars::schema_for!(Config);
            let rendered =
                serde_json::to_string_pretty(&schema).context("failed to serialize JSON Schema")?;
            println!("{rendered}");
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::load_or_init().await?;

    match cli.command {
        Commands::Completions { .. } | Commands::Config { .. } => unreachable!(),

        Commands::Serve { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting gateway on {host} (random port)");
            } else {
                info!("Starting gateway on {host}:{port}");
            }
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Tenants => {
            let registry = tenants::create_registry(&config.tenants)
                .context("Invalid [tenants] configuration")?;
            let mut stdout = std::io::stdout().lock();
            write_tenant_listing(&registry, &config.responder.greetings, &mut stdout)
        }

        Commands::Reply { to, body } => {
            let directory: Arc<dyn TenantDirectory> = Arc::new(
                tenants::create_registry(&config.tenants)
                    .context("Invalid [tenants] configuration")?,
            );
            let router = routing::create_router(directory, &config.responder);
            let outcome = router.route(&to, &body);
            let mut stdout = std::io::stdout().lock();
            write_reply_outcome(&outcome, &mut stdout)
        }
    }
}

fn write_tenant_listing<W: Write>(
    registry: &StaticRegistry,
    greetings: &[String],
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "Configured tenants ({} total):\n", registry.len())?;
    for number in registry.numbers() {
        let Some(profile) = registry.lookup(number) else {
            continue;
        };
        let keywords: Vec<&str> = profile.keywords.iter().map(|k| k.keyword.as_str()).collect();
        writeln!(writer, "  {:<16} {}", number, profile.name)?;
        writeln!(
            writer,
            "  {:<16} keywords: {}",
            "",
            if keywords.is_empty() {
                "(none)".to_string()
            } else {
                keywords.join(", ")
            }
        )?;
    }
    writeln!(writer, "\n  Greetings: {}", greetings.join(", "))?;
    writer.flush()?;
    Ok(())
}

fn describe_match(matched_by: &MatchedBy) -> String {
    match matched_by {
        MatchedBy::Keyword(keyword) => format!("keyword '{keyword}'"),
        MatchedBy::Greeting => "greeting".to_string(),
        MatchedBy::Default => "default response".to_string(),
        MatchedBy::UnknownTenant => "unknown destination number".to_string(),
    }
}

fn write_reply_outcome<W: Write>(outcome: &RouteOutcome, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "Tenant:  {}",
        outcome.tenant.as_deref().unwrap_or("(none)")
    )?;
    writeln!(writer, "Matched: {}", describe_match(&outcome.matched_by))?;
    writeln!(writer)?;
    writeln!(writer, "{}", outcome.reply)?;
    writer.flush()?;
    Ok(())
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
