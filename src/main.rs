use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use caretnav::{
    ConnectionContext, ConnectionResolver, Document, DocumentAccess, HttpTransportFactory,
    JumpResolver, Location, RemoteResolver, Settings, extract_at, parse_jump_target,
    provide_links,
};

#[derive(Parser)]
#[command(name = "caretnav")]
#[command(about = "Definition resolution for caret-addressed scripting languages")]
struct Cli {
    /// Settings file (defaults to the nearest .caretnav/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Show the reference under a cursor position (0-based line/character)
    Extract {
        file: PathBuf,
        line: u32,
        character: u32,
    },

    /// List every clickable reference in a file
    Links { file: PathBuf },

    /// Resolve one query against the configured server
    Resolve { query: String },

    /// Jump to a Label[+Offset]^Routine target
    Jump {
        target: String,

        /// Document the jump is scoped to (its connection is used)
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

/// Connection resolution from settings: every document shares the one
/// configured server.
struct SettingsConnections {
    context: ConnectionContext,
}

impl ConnectionResolver for SettingsConnections {
    fn resolve_connection(&self, _document_uri: &str) -> ConnectionContext {
        self.context.clone()
    }
}

/// Opens jump targets from the local filesystem and prints the revealed
/// position instead of moving an editor cursor.
struct LocalDocuments;

#[async_trait]
impl DocumentAccess for LocalDocuments {
    async fn open(&self, uri: &str) -> Option<Document> {
        let text = tokio::fs::read_to_string(uri).await.ok()?;
        Some(Document::new(uri, text))
    }

    async fn reveal(&self, location: &Location) {
        println!(
            "{}:{}:{}",
            location.uri,
            location.line + 1,
            location.column + 1
        );
    }
}

async fn load_document(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Document::new(path.display().to_string(), text))
}

fn remote_resolver(settings: &Settings) -> RemoteResolver {
    RemoteResolver::new(Arc::new(HttpTransportFactory))
        .with_timeout(settings.resolver.timeout())
        .with_max_attempts(settings.resolver.max_attempts)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("failed to load settings: {e}"))?;

    caretnav::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("init failed: {e}"))?;
            println!("Created configuration at {}", path.display());
        }

        Commands::Config => {
            let rendered = toml::to_string_pretty(&settings)?;
            print!("{rendered}");
        }

        Commands::Extract {
            file,
            line,
            character,
        } => {
            let document = load_document(&file).await?;
            let Some(text) = document.line(line) else {
                anyhow::bail!("{} has no line {line}", file.display());
            };
            match extract_at(text, character) {
                Some(m) => println!(
                    "{} {} -> {} [{}..{}]",
                    m.kind.as_str(),
                    m.raw_text,
                    m.normalized_query,
                    m.span.start,
                    m.span.end
                ),
                None => println!("no reference at {line}:{character}"),
            }
        }

        Commands::Links { file } => {
            let document = load_document(&file).await?;
            for link in provide_links(&document) {
                let text = document
                    .line(link.line)
                    .map(|l| &l[link.span.start as usize..link.span.end as usize])
                    .unwrap_or_default();
                println!(
                    "{}:{}..{} {} ({} {}:{}:{})",
                    link.line,
                    link.span.start,
                    link.span.end,
                    text,
                    link.command,
                    link.args.uri,
                    link.args.line,
                    link.args.character
                );
            }
        }

        Commands::Resolve { query } => {
            let resolver = remote_resolver(&settings);
            let context = settings.connection.to_context();
            let cancel = CancellationToken::new();
            match resolver.resolve(&query, &context, &cancel).await {
                Some(location) => {
                    println!("{}:{}:{}", location.uri, location.line + 1, location.column + 1)
                }
                None => println!("no result"),
            }
        }

        Commands::Jump { target, from } => {
            let request = match parse_jump_target(&target) {
                Ok(request) => request,
                Err(error) => {
                    eprintln!("{error}");
                    return Ok(());
                }
            };

            let source = match &from {
                Some(path) => Some(load_document(path).await?),
                // The CLI's connection comes from settings, so an empty
                // scope document stands in for the editor's active one.
                None => Some(Document::new("caretnav://cli", "")),
            };

            let resolver = JumpResolver::new(
                remote_resolver(&settings),
                Arc::new(SettingsConnections {
                    context: settings.connection.to_context(),
                }),
                Arc::new(LocalDocuments),
            );

            match resolver.resolve_jump(source.as_ref(), &request).await {
                Some(outcome) => println!("{outcome}"),
                None => println!("jump aborted"),
            }
        }
    }

    Ok(())
}
