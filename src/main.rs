//! Command line front-end: run the relay server or post a message.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use msgrelay::{Relay, RelayConfig};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "msgrelay", about = "A bounded in-memory message relay", version)]
struct Cli {
    /// Verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server.
    Serve {
        /// Host to serve on.
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,

        /// Port to serve on.
        #[arg(short = 'P', long, default_value_t = 5000)]
        port: u16,

        /// Maximum number of retained messages.
        #[arg(long)]
        max_messages: Option<usize>,

        /// Maximum message length in characters.
        #[arg(long)]
        max_content_len: Option<usize>,
    },

    /// Post a message to a running relay.
    Post {
        /// Message to post.
        #[arg(short, long)]
        message: String,

        /// Host to post to.
        #[arg(short = 'H', long, default_value = "localhost")]
        host: String,

        /// Port to post to.
        #[arg(short = 'P', long, default_value_t = 5000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    msgrelay::logging::init_logging(cli.verbose);

    match cli.command {
        Command::Serve {
            host,
            port,
            max_messages,
            max_content_len,
        } => {
            let mut config = RelayConfig::default();
            if let Some(n) = max_messages {
                config.max_messages = n;
            }
            if let Some(n) = max_content_len {
                config.max_content_len = n;
            }

            let relay = Arc::new(Relay::new(config)?);
            msgrelay::http::serve(relay, (host.as_str(), port))
                .await
                .context("server failed")?;
        }

        Command::Post {
            message,
            host,
            port,
        } => {
            let url = format!("http://{host}:{port}/");
            let response = reqwest::Client::new()
                .post(&url)
                .body(message)
                .send()
                .await
                .with_context(|| format!("failed to reach {url}"))?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            println!("{status}: {body}");
            if !status.is_success() {
                bail!("post rejected by the relay");
            }
        }
    }

    Ok(())
}
