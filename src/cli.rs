use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tmnd", version, about = "Run and manage a TomoChain fullnode")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Docker engine endpoint (unix://, tcp:// or http://)"
    )]
    pub docker: Option<String>,
    #[arg(long, short, global = true, help = "Log engine calls to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure (first run) and start the fullnode
    Start {
        #[arg(long, help = "Name of the fullnode, used to prefix its resources")]
        name: Option<String>,
        #[arg(long, help = "Network to join (mainnet, testnet, devnet)")]
        net: Option<String>,
        #[arg(long, help = "Private key of the node account")]
        pkey: Option<String>,
    },
    /// Stop the fullnode containers
    Stop,
    /// Show the state of every fullnode resource
    Status,
    /// Show engine metadata of the fullnode containers
    Inspect,
    /// Recreate the node container with the latest image and environment
    Update,
    /// Remove every fullnode resource and forget its configuration
    Remove {
        #[arg(long, default_value_t = false, help = "Confirm the removal")]
        confirm: bool,
        #[arg(long, help = "Fullnode to remove when none is configured")]
        name: Option<String>,
    },
    /// Print the documentation link
    Docs,
}
