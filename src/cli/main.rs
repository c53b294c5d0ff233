/**
 * Docportal CLI Entry Point
 *
 * Logs in with the configured credentials and runs one command against the
 * identity and documents services. Every call goes through the session
 * gateway, so long-running commands like `watch` survive session expiry.
 */

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "docportal")]
#[command(about = "Command-line client for the document portal", long_about = None)]
struct Cli {
    /// Account email
    #[arg(long, env = "DOCPORTAL_EMAIL")]
    email: String,

    /// Account password
    #[arg(long, env = "DOCPORTAL_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Command {
    /// Show the logged-in user
    Whoami,

    /// List documents
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Filter by title or content
        #[arg(long)]
        search: Option<String>,
    },

    /// Print a document
    Show { id: String },

    /// Delete a document
    Delete { id: String },

    /// Print a temporary download URL
    Link { id: String },

    /// Keep the session alive and log session events
    Watch {
        /// Seconds between profile checks
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use docportal::client::{DocumentClient, IdentityClient, ReqwestTransport, SessionGateway, SessionStore};
    use docportal::shared::documents::DocumentListQuery;
    use docportal::shared::GatewayConfig;

    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = GatewayConfig::from_env()?;
    tracing::debug!("[Startup] Using backend {}", config.api_url());

    let transport = ReqwestTransport::new(config.clone())?;
    let gateway = SessionGateway::new(transport, config);
    let identity = IdentityClient::new(gateway.clone());
    let documents = DocumentClient::new(gateway.clone());

    let session = SessionStore::new(identity.clone());
    let listener = session.spawn_listener();
    let user = session.login(&cli.email, &cli.password).await?;

    match cli.command {
        Command::Whoami => {
            println!("{} <{}> ({})", user.name, user.email, user.id);
        }
        Command::List { page, limit, search } => {
            let query = DocumentListQuery { page, limit, search };
            let list = documents.list(&query).await?;
            for doc in &list.documents {
                println!(
                    "{}\t{:?}\t{}\t{}",
                    doc.id,
                    doc.status,
                    doc.updated_at.format("%Y-%m-%d %H:%M"),
                    doc.title
                );
            }
            println!("{} of {} documents", list.documents.len(), list.total);
        }
        Command::Show { id } => {
            let doc = documents.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Delete { id } => {
            let reply = documents.delete(&id).await?;
            if reply.message.is_empty() {
                println!("Deleted {}", id);
            } else {
                println!("{}", reply.message);
            }
        }
        Command::Link { id } => {
            let link = documents.download_link(&id).await?;
            println!("{}", link.download_url);
            if !link.expires_in.is_empty() {
                eprintln!("expires in {}", link.expires_in);
            }
        }
        Command::Watch { interval } => {
            let mut events = gateway.subscribe();
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        if session.verify().await.is_none() {
                            tracing::error!("[Watch] Session lost");
                            break;
                        }
                    }
                    event = events.recv() => match event {
                        Ok(event) => tracing::info!("[Watch] {}", serde_json::to_string(&event)?),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("[Watch] Missed {} events", n);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }
    }

    session.logout().await;
    listener.abort();
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("The command-line client requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin docportal --features cli");
    std::process::exit(1);
}
