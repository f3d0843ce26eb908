use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a post to the pending pool
    Submit {
        #[arg(long)]
        author: String,
        #[arg(long)]
        content: String,
    },
    /// Mine the pending pool into a block
    Mine,
    /// Print the node's chain and peers
    Chain,
    /// Print transactions waiting to be mined
    Pending,
    /// Make the node register with another node and adopt its chain
    RegisterWith {
        /// Base URL of the node to register with
        remote: String,
    },
}

#[derive(Serialize)]
struct Post {
    author: String,
    content: String,
}

#[derive(Serialize)]
struct NodeAddress {
    node_address: String,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    debug!("talking to {node}");

    let res = match cli.cmd {
        Command::Submit { author, content } => {
            let post = Post { author, content };
            client
                .post(format!("{node}/new_transaction"))
                .json(&post)
                .send()
                .await?
        }
        Command::Mine => client.post(format!("{node}/mine")).send().await?,
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Pending => client.get(format!("{node}/pending_tx")).send().await?,
        Command::RegisterWith { remote } => {
            client
                .post(format!("{node}/register_with"))
                .json(&NodeAddress {
                    node_address: remote,
                })
                .send()
                .await?
        }
    };
    print_response(res).await
}
