//! Administrative CLI for menuboard.

mod api_client;
mod watch;

use anyhow::{Context, Result};
use api_client::ApiClient;
use clap::{Args, Parser, Subcommand};
use menuboard_core::image::{content_type_for, is_admin_name};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watch::GalleryPoller;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "menuboardctl")]
#[command(about = "Administrative CLI for menuboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ApiArgs {
    /// Server base URL
    #[arg(long, env = "MENUBOARD_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Session token from a previous `login`
    #[arg(long, env = "MENUBOARD_SESSION", hide_env_values = true)]
    session: Option<String>,
}

#[derive(Args, Clone)]
struct CredentialArgs {
    /// Admin username
    #[arg(long, env = "MENUBOARD_USERNAME")]
    username: Option<String>,

    /// Admin password (prefer the environment variable)
    #[arg(long, env = "MENUBOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current gallery, admin image first
    Images {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Follow the gallery and print it whenever it changes
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Log in and print the session token (export it as MENUBOARD_SESSION)
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Replace the admin image
    Upload {
        /// Image file to upload
        file: PathBuf,
        /// Content type (guessed from the file extension by default)
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        credentials: CredentialArgs,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Delete the admin image
    Delete {
        /// Image to delete (default: the current admin image)
        filename: Option<String>,
        #[command(flatten)]
        credentials: CredentialArgs,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// End the session
    Logout {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Check server health
    Health {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Images { api } => handle_images_command(&api).await,
        Commands::Watch { interval_secs, api } => {
            handle_watch_command(&api, Duration::from_secs(interval_secs)).await
        }
        Commands::Login { credentials, api } => handle_login_command(&api, &credentials).await,
        Commands::Upload {
            file,
            content_type,
            credentials,
            api,
        } => handle_upload_command(&api, &credentials, &file, content_type).await,
        Commands::Delete {
            filename,
            credentials,
            api,
        } => handle_delete_command(&api, &credentials, filename).await,
        Commands::Logout { api } => handle_logout_command(&api).await,
        Commands::Health { api } => handle_health_command(&api).await,
    }
}

fn normalize_base_url(url: &str) -> Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("server URL must start with http:// or https://");
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn client(api: &ApiArgs) -> Result<ApiClient> {
    let client = ApiClient::new(&normalize_base_url(&api.server)?)?;
    Ok(match &api.session {
        Some(token) if !token.is_empty() => client.with_session(token.clone()),
        _ => client,
    })
}

/// A client holding a session: the given token, or a fresh login.
async fn authenticated_client(api: &ApiArgs, credentials: &CredentialArgs) -> Result<ApiClient> {
    let mut client = client(api)?;
    if client.session().is_some() {
        return Ok(client);
    }
    match (&credentials.username, &credentials.password) {
        (Some(username), Some(password)) => {
            client.login(username, password).await?;
            Ok(client)
        }
        _ => anyhow::bail!(
            "not logged in: run `menuboardctl login` and export MENUBOARD_SESSION, \
             or set MENUBOARD_USERNAME and MENUBOARD_PASSWORD"
        ),
    }
}

fn print_images(images: &[String]) {
    if images.is_empty() {
        println!("(no images)");
        return;
    }
    for (idx, url) in images.iter().enumerate() {
        println!("{:>3}  {}", idx + 1, url);
    }
}

/// File name of the admin image among display URLs.
fn admin_file_name(images: &[String]) -> Option<String> {
    images
        .iter()
        .filter_map(|url| {
            let path = url.split(['?', '#']).next()?;
            path.rsplit('/').next()
        })
        .find(|name| is_admin_name(name))
        .map(str::to_string)
}

fn guess_content_type(path: &Path) -> &'static str {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    content_type_for(name)
}

async fn handle_images_command(api: &ApiArgs) -> Result<()> {
    let images = client(api)?.list_images().await?;
    print_images(&images);
    Ok(())
}

async fn handle_watch_command(api: &ApiArgs, interval: Duration) -> Result<()> {
    let client = client(api)?;
    let cancel = CancellationToken::new();
    let poller = GalleryPoller::spawn_with_token(client, interval, cancel.clone());
    let mut images = poller.subscribe();

    eprintln!(
        "Watching {} every {}s (Ctrl-C to stop)",
        api.server,
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = images.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(list) = images.borrow_and_update().as_ref() {
                    println!("--- {} image(s)", list.len());
                    print_images(list);
                }
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}

async fn handle_login_command(api: &ApiArgs, credentials: &CredentialArgs) -> Result<()> {
    let username = credentials
        .username
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--username or MENUBOARD_USERNAME is required"))?;
    let password = credentials
        .password
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--password or MENUBOARD_PASSWORD is required"))?;

    let mut client = client(api)?;
    let token = client.login(username, password).await?;
    println!("{token}");
    Ok(())
}

async fn handle_upload_command(
    api: &ApiArgs,
    credentials: &CredentialArgs,
    file: &Path,
    content_type: Option<String>,
) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(file).to_string());
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let client = authenticated_client(api, credentials).await?;
    let stored = client.upload(&file_name, &content_type, data).await?;

    println!("Stored {} at {}", stored.filename, stored.url);
    Ok(())
}

async fn handle_delete_command(
    api: &ApiArgs,
    credentials: &CredentialArgs,
    filename: Option<String>,
) -> Result<()> {
    let client = authenticated_client(api, credentials).await?;
    let filename = match filename {
        Some(name) => name,
        None => admin_file_name(&client.list_images().await?)
            .ok_or_else(|| anyhow::anyhow!("no admin image is currently published"))?,
    };

    let response = client.delete_image(&filename).await?;
    if response.deleted.is_empty() {
        println!("Deleted {filename}");
    } else {
        println!("Deleted {}", response.deleted.join(", "));
    }
    Ok(())
}

async fn handle_logout_command(api: &ApiArgs) -> Result<()> {
    let mut client = client(api)?;
    client.logout().await?;
    println!("Logged out. Unset MENUBOARD_SESSION to forget the token locally.");
    Ok(())
}

async fn handle_health_command(api: &ApiArgs) -> Result<()> {
    let health = client(api)?.health().await?;
    println!("Status: {}", health.status);
    println!("Backends: {}", health.backends);
    if let Some(version) = &health.version {
        println!("Server version: {version}");
    }
    println!("Client version: {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
