//! CLI interface for Taskpal
//!
//! Defines commands and global flags using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Taskpal conversational task assistant
///
/// Keeps a bounded conversation and a task list per session, answering
/// task commands directly and everything else through an LLM.
#[derive(Parser, Debug)]
#[command(name = "taskpal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message to a session and print the reply
    Chat {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// The message to send
        message: String,
    },

    /// Show a session's task list
    Tasks {
        #[arg(short, long)]
        session: String,
    },

    /// Show a session's retained conversation
    History {
        #[arg(short, long)]
        session: String,
    },

    /// List stored sessions
    Sessions,

    /// Run system diagnostics
    Doctor,
}
