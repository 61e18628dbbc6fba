// SPDX-License-Identifier: MIT OR Apache-2.0
//! `surface-inspect` - command-line inspector for Visject surface files.
//!
//! Node schemas come from a RON file listing `NodeArchetype`s, so the tool
//! works for any graph family. `resave` writes the graph back out and reports
//! whether the bytes match.

use clap::{Parser, Subcommand};
use ordoplay_editor_surface::{NodeArchetype, NodeRegistry, Surface, SurfaceConfig, SurfaceError};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Visject surface inspector.
#[derive(Parser)]
#[command(name = "surface-inspect", about = "Inspect Visject surface graph files")]
struct Cli {
    /// Codec settings file (RON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node schema list (RON array of archetypes).
    #[arg(short, long)]
    registry: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print node, parameter and connection counts.
    Summary {
        /// Surface file to read.
        file: PathBuf,
    },
    /// Print the whole graph as RON.
    Dump {
        /// Surface file to read.
        file: PathBuf,
    },
    /// Load and save again, reporting whether the output is byte-identical.
    Resave {
        /// Surface file to read.
        file: PathBuf,

        /// Where to write the re-saved surface.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Errors reported by the inspector
#[derive(Debug, thiserror::Error)]
enum InspectError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid node registry: {0}")]
    Registry(String),

    #[error("Failed to render graph: {0}")]
    Render(#[from] ron::Error),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_editor_surface=info,ordoplay_surface_cli=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), InspectError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SurfaceConfig::default(),
    };
    let registry = Arc::new(load_registry(&cli.registry)?);

    match cli.command {
        Commands::Summary { file } => {
            let surface = open_surface(&file, registry, config)?;
            println!("nodes:       {}", surface.node_count());
            println!("parameters:  {}", surface.parameters().len());
            println!("connections: {}", surface.connection_count());
            println!("build:       {}", surface.engine_build());
            println!(
                "view:        ({}, {}) x{}",
                surface.view_center()[0],
                surface.view_center()[1],
                surface.view_scale()
            );
            for param in surface.parameters() {
                println!("  param {} {:?} = {:?}", param.name, param.id, param.value);
            }
        }
        Commands::Dump { file } => {
            let surface = open_surface(&file, registry, config)?;
            let text = surface.to_ron()?;
            println!("{text}");
        }
        Commands::Resave { file, output } => {
            let original = read_file(&file)?;
            let mut surface = Surface::new(registry).with_config(config);
            surface.load(&original)?;
            let saved = surface.save()?;

            if saved == original {
                println!("identical ({} bytes)", saved.len());
            } else {
                println!("differs: {} bytes in, {} bytes out", original.len(), saved.len());
            }
            if let Some(path) = output {
                std::fs::write(&path, &saved).map_err(|source| InspectError::Write { path, source })?;
            }
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, InspectError> {
    std::fs::read(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: &Path) -> Result<SurfaceConfig, InspectError> {
    let text = std::fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    SurfaceConfig::from_ron(&text).map_err(|e| InspectError::Config(e.to_string()))
}

fn load_registry(path: &Path) -> Result<NodeRegistry, InspectError> {
    let text = std::fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let archetypes: Vec<NodeArchetype> =
        ron::from_str(&text).map_err(|e| InspectError::Registry(e.to_string()))?;
    tracing::debug!(count = archetypes.len(), "Loaded node schemas");
    Ok(NodeRegistry::from_archetypes(archetypes))
}

fn open_surface(
    path: &Path,
    registry: Arc<NodeRegistry>,
    config: SurfaceConfig,
) -> Result<Surface, InspectError> {
    let bytes = read_file(path)?;
    let mut surface = Surface::new(registry).with_config(config);
    surface.load(&bytes)?;
    tracing::info!(path = %path.display(), nodes = surface.node_count(), "Loaded surface");
    Ok(surface)
}
