use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ordersync_core::OrderId;

/// Synchronizes locally placed orders with the print-on-demand fulfillment API.
#[derive(Parser, Debug)]
#[command(name = "ordersync-worker", version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Poll the queue on the configured interval until interrupted (default)
    Run,
    /// Process a single batch and print its report
    Once,
    /// Cancel a submitted order remotely
    Cancel {
        /// Local order id
        order_id: OrderId,
    },
    /// Queue an order snapshot read from a JSON file
    Enqueue {
        /// Path to a JSON-encoded order
        file: PathBuf,
    },
    /// Create the queue table if it does not exist
    InitSchema,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Run)
    }
}
