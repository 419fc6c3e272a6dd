//! CLI entry point for the `avault` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use asset_vault::cli::commands;
use asset_vault::types::{AssetType, CycleType, UserRole};

#[derive(Parser)]
#[command(
    name = "avault",
    about = "asset-vault CLI — lifecycle management for versioned creative assets"
)]
struct Cli {
    /// Library root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a library root (storage folders + empty catalog)
    Init,
    /// Register a new asset family (Base variant, v001)
    Add {
        /// Display name of the asset
        name: String,
        /// Asset type: mesh, material, rig, light, camera, collection,
        /// grease_pencil, curve, scene, other
        #[arg(name = "type")]
        asset_type: String,
        /// Path to the primary payload file
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Create the next version within a variant's chain
    Version {
        /// UUID of any version in the chain
        uuid: Uuid,
        /// Path to the new payload file
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Branch a new variant off a Base version
    Variant {
        /// UUID of the Base version to branch from
        source_uuid: Uuid,
        /// Name for the new variant
        name: String,
        /// Semantic grouping for sibling variants (e.g. "Armor")
        #[arg(long)]
        set: Option<String>,
        /// Path to the variant's payload file
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Submit a version for review, opening a new cycle
    Submit {
        uuid: Uuid,
        /// Cycle type: modeling, texturing, rigging, lighting, animation,
        /// fx, lookdev, general
        #[arg(long, default_value = "general")]
        cycle_type: String,
        /// Submitting user
        #[arg(long, default_value = "")]
        user: String,
    },
    /// Review note operations
    #[command(subcommand)]
    Note(NoteCommands),
    /// Close the version's review cycle (one-way)
    Finalize {
        uuid: Uuid,
        #[arg(long, default_value = "")]
        user: String,
        /// Actor role; must be elevated (lead/supervisor/admin/director)
        #[arg(long, default_value = "artist")]
        role: String,
    },
    /// Review and storage status of one version
    Status { uuid: Uuid },
    /// Retire a variant's files to cold storage
    Retire {
        uuid: Uuid,
        #[arg(long, default_value = "")]
        user: String,
    },
    /// Restore a retired variant to active storage
    Restore {
        uuid: Uuid,
        #[arg(long, default_value = "")]
        user: String,
    },
    /// Dry-run: show what a retire would touch
    Preview { uuid: Uuid },
    /// List catalog versions
    List {
        /// Include non-latest versions
        #[arg(long)]
        all: bool,
    },
    /// Show a family's variant groups
    Variants { uuid: Uuid },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note to a version in an open cycle
    Add {
        uuid: Uuid,
        text: String,
        #[arg(long, default_value = "")]
        author: String,
        /// Author role: artist, lead, supervisor, admin, director
        #[arg(long, default_value = "artist")]
        role: String,
    },
    /// Mark a note addressed (author says "fixed")
    Address { note_id: u64 },
    /// Approve a note (reviewer confirms the fix)
    Approve { note_id: u64 },
    /// Reopen a note
    Reopen {
        note_id: u64,
        #[arg(long, default_value = "artist")]
        role: String,
    },
}

fn parse_role(name: &str) -> UserRole {
    match UserRole::from_name(name) {
        Some(role) => role,
        None => {
            eprintln!("Invalid role: {}", name);
            process::exit(3);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    if cli.verbose {
        // env_logger is only available in dev/test builds
        eprintln!("Verbose mode enabled");
    }

    let root = cli.root;
    let result = match cli.command {
        Commands::Init => commands::cmd_init(&root),
        Commands::Add {
            name,
            asset_type,
            payload,
        } => {
            let at = match AssetType::from_name(&asset_type) {
                Some(at) => at,
                None => {
                    eprintln!("Invalid asset type: {}", asset_type);
                    process::exit(3);
                }
            };
            commands::cmd_add(&root, &name, at, payload, json)
        }
        Commands::Version { uuid, payload } => commands::cmd_version(&root, uuid, payload, json),
        Commands::Variant {
            source_uuid,
            name,
            set,
            payload,
        } => commands::cmd_variant(&root, source_uuid, &name, set.as_deref(), payload, json),
        Commands::Submit {
            uuid,
            cycle_type,
            user,
        } => {
            let ct = match CycleType::from_name(&cycle_type) {
                Some(ct) => ct,
                None => {
                    eprintln!("Invalid cycle type: {}", cycle_type);
                    process::exit(3);
                }
            };
            commands::cmd_submit(&root, uuid, ct, &user, json)
        }
        Commands::Note(note) => match note {
            NoteCommands::Add {
                uuid,
                text,
                author,
                role,
            } => commands::cmd_note_add(&root, uuid, &text, &author, parse_role(&role), json),
            NoteCommands::Address { note_id } => commands::cmd_note_address(&root, note_id, json),
            NoteCommands::Approve { note_id } => commands::cmd_note_approve(&root, note_id, json),
            NoteCommands::Reopen { note_id, role } => {
                commands::cmd_note_reopen(&root, note_id, parse_role(&role), json)
            }
        },
        Commands::Finalize { uuid, user, role } => {
            commands::cmd_finalize(&root, uuid, &user, parse_role(&role), json)
        }
        Commands::Status { uuid } => commands::cmd_status(&root, uuid, json),
        Commands::Retire { uuid, user } => commands::cmd_retire(&root, uuid, &user, json),
        Commands::Restore { uuid, user } => commands::cmd_restore(&root, uuid, &user, json),
        Commands::Preview { uuid } => commands::cmd_preview(&root, uuid, json),
        Commands::List { all } => commands::cmd_list(&root, all, json),
        Commands::Variants { uuid } => commands::cmd_variants(&root, uuid, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            asset_vault::LifecycleError::Io(_) => 1,
            asset_vault::LifecycleError::CorruptCatalog(_) => 2,
            asset_vault::LifecycleError::NotFound(_)
            | asset_vault::LifecycleError::CycleNotFound(_)
            | asset_vault::LifecycleError::NoteNotFound(_) => 4,
            _ => 5,
        };
        process::exit(code);
    }
}
