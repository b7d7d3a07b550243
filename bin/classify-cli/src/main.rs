// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # imgclass
//!
//! Command-line interface for the image classification server.
//!
//! ## Usage
//! ```bash
//! # Serve the HTTP API on 0.0.0.0:5000
//! imgclass serve --graph ./model/graph.json --labels ./model/labels.txt
//!
//! # Classify one image without starting the server
//! imgclass classify ./images/cat.jpg --top 3
//!
//! # Print the graph's operations
//! imgclass inspect --graph ./model/graph.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "imgclass",
    about = "Image classification over a pre-trained graph",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Graph manifest (overrides the config file).
    #[arg(long, global = true, env = "IMGCLASS_GRAPH")]
    graph: Option<PathBuf>,

    /// Label file, one label per line (overrides the config file).
    #[arg(long, global = true, env = "IMGCLASS_LABELS")]
    labels: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model and serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "IMGCLASS_BIND")]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(short, long, env = "IMGCLASS_PORT")]
        port: Option<u16>,

        /// Maximum number of inferences running at once.
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Classify a single image and print the label map as JSON.
    Classify {
        /// Image file to classify.
        image: PathBuf,

        /// Print only the N most probable labels.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Print the graph's operations and the resolved input/output.
    Inspect,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let mut config = commands::load_config(cli.config.as_deref())?;
    if let Some(graph) = cli.graph {
        config.runtime.graph_path = graph;
    }
    if let Some(labels) = cli.labels {
        config.runtime.labels_path = labels;
    }

    match cli.command {
        Commands::Serve {
            bind,
            port,
            max_concurrent,
        } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if max_concurrent.is_some() {
                config.server.max_concurrent_inferences = max_concurrent;
            }
            commands::serve::execute(config).await
        }
        Commands::Classify { image, top } => commands::classify::execute(config, image, top),
        Commands::Inspect => commands::inspect::execute(config),
    }
}
