//! Command line front-end for the level store
//!
//! Usage:
//!   parabox-editor new <name>                 # Store a fresh level
//!   parabox-editor expand <name> 0 --top 2    # Grow room 0 upwards
//!   parabox-editor export <name> -o out.txt   # Write the game's level file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parabox_editor::config::{default_config_path, EditorConfig};
use parabox_editor::export::level_to_file;
use parabox_editor::math::inset_cycle;
use parabox_editor::storage::LevelStore;
use parabox_editor::world::{
    default_level, load_level, room_wall_cycles, validate_level, Level, RoomId,
};

#[derive(Parser)]
#[command(name = "parabox-editor", version)]
#[command(about = "Edit, validate and export recursive box puzzle levels")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Level store directory, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new level with a single empty room
    New {
        name: String,
        #[arg(long)]
        title: Option<String>,
        /// Replace an existing level of the same name
        #[arg(long)]
        force: bool,
    },
    /// List stored levels
    List,
    /// Print a summary of a level's rooms
    Show { name: String },
    /// Append an empty room with a fresh id
    AddRoom { name: String },
    /// Remove a room and every link pointing at it
    RemoveRoom {
        name: String,
        /// Room id; use `name:<id>` for a text id that looks like a number
        room: RoomId,
    },
    /// Grow or shrink a room (negative amounts shrink)
    Expand {
        name: String,
        /// Room id; use `name:<id>` for a text id that looks like a number
        room: RoomId,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        top: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        right: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        bottom: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        left: i32,
        /// Do not extrude walls into the new cells
        #[arg(long)]
        no_walls: bool,
    },
    /// Print the wall outlines of a room
    Walls {
        name: String,
        /// Room id; use `name:<id>` for a text id that looks like a number
        room: RoomId,
        /// Also print each outline inset by this distance
        #[arg(long, allow_hyphen_values = true)]
        inset: Option<f64>,
    },
    /// Check a stored level for broken links and bad values
    Validate { name: String },
    /// Encode a level into the game's file format
    Export {
        name: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Store a JSON level file under a name
    Import { file: PathBuf, name: String },
    /// Delete a stored level
    Delete { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_status) = load_config(cli.config.as_ref());
    let config = config?;
    init_logging(&config);
    if let Some(message) = config_status {
        warn!("{}", message);
    }

    let store = match &cli.store {
        Some(dir) => LevelStore::new(dir).with_compression(config.compress_levels),
        None => LevelStore::from_config(&config),
    };

    match cli.command {
        Commands::New { name, title, force } => {
            if !force && store.exists(&name)? {
                bail!("Level '{}' already exists (use --force to replace it)", name);
            }
            let level = default_level(title.unwrap_or_else(|| config.default_title.clone()));
            store.save(&name, &level)?;
            info!(%name, "created level");
            println!("Created '{}' in {}", name, store.dir().display());
            Ok(())
        }
        Commands::List => {
            for name in store.list().context("Failed to list levels")? {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Show { name } => {
            let level = load(&store, &name)?;
            print_summary(&level);
            Ok(())
        }
        Commands::AddRoom { name } => {
            let mut level = load(&store, &name)?;
            let id = level.add_room();
            store.save(&name, &level)?;
            println!("Added room {}", id);
            Ok(())
        }
        Commands::RemoveRoom { name, room } => {
            let mut level = load(&store, &name)?;
            level
                .remove_room(&room)
                .with_context(|| format!("Failed to remove room {}", room))?;
            store.save(&name, &level)?;
            println!("Removed room {}", room);
            Ok(())
        }
        Commands::Expand {
            name,
            room,
            top,
            right,
            bottom,
            left,
            no_walls,
        } => {
            let mut level = load(&store, &name)?;
            let target = level
                .room_mut(&room)
                .with_context(|| format!("No room {} in '{}'", room, name))?;
            target
                .expand(top, right, bottom, left, !no_walls)
                .with_context(|| format!("Failed to resize room {}", room))?;
            let (width, height) = (target.width, target.height);
            store.save(&name, &level)?;
            println!("Room {} is now {}x{}", room, width, height);
            Ok(())
        }
        Commands::Walls { name, room, inset } => {
            let level = load(&store, &name)?;
            let target = level
                .room(&room)
                .with_context(|| format!("No room {} in '{}'", room, name))?;
            let cycles = room_wall_cycles(target)?;
            for (i, cycle) in cycles.iter().enumerate() {
                let points: Vec<String> =
                    cycle.iter().map(|p| format!("({},{})", p.x, p.y)).collect();
                println!("outline {}: {}", i, points.join(" "));
                if let Some(delta) = inset {
                    let inset_points = inset_cycle(cycle, delta)
                        .with_context(|| format!("Failed to inset outline {}", i))?;
                    let points: Vec<String> = inset_points
                        .iter()
                        .map(|p| format!("({:.3},{:.3})", p.x, p.y))
                        .collect();
                    println!("  inset {}: {}", delta, points.join(" "));
                }
            }
            Ok(())
        }
        Commands::Validate { name } => {
            let level = load(&store, &name)?;
            validate_level(&level)?;
            println!("'{}' is valid", name);
            Ok(())
        }
        Commands::Export { name, output } => {
            let level = load(&store, &name)?;
            let text = level_to_file(&level)
                .with_context(|| format!("Failed to encode '{}'", name))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported '{}' to {}", name, path.display());
                }
                None => print!("{}", text),
            }
            Ok(())
        }
        Commands::Import { file, name } => {
            let level = load_level(&file)
                .with_context(|| format!("Failed to read level from {}", file.display()))?;
            store.save(&name, &level)?;
            println!("Imported {} as '{}'", file.display(), name);
            Ok(())
        }
        Commands::Delete { name } => {
            store
                .delete(&name)
                .with_context(|| format!("Failed to delete '{}'", name))?;
            println!("Deleted '{}'", name);
            Ok(())
        }
    }
}

/// Load the config, noting when the default file is absent so it can be
/// logged once the subscriber is up.
fn load_config(path: Option<&PathBuf>) -> (Result<EditorConfig>, Option<String>) {
    let Some(path) = path.cloned().or_else(default_config_path) else {
        let status = "no config directory, using defaults".to_string();
        return (Ok(EditorConfig::default()), Some(status));
    };

    let status = (!path.exists())
        .then(|| format!("no config at {}, using defaults", path.display()));
    let config = EditorConfig::load(&path)
        .with_context(|| format!("Failed to load config {}", path.display()));
    (config, status)
}

fn init_logging(config: &EditorConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(store: &LevelStore, name: &str) -> Result<Level> {
    store
        .load(name)
        .with_context(|| format!("Failed to load level '{}'", name))
}

fn print_summary(level: &Level) {
    println!("Title:   {}", level.title);
    println!("Style:   {}", level.style);
    println!(
        "Flags:   extrude={} inner_push={} palette={}",
        level.extrude, level.inner_push, level.custom_level_palette
    );
    println!("Rooms:   {}", level.rooms.len());
    for room in &level.rooms {
        let walls = room.contents.iter().filter(|c| c.is_wall()).count();
        let marker = if room.is_void_plane { " (void plane)" } else { "" };
        println!(
            "  room {}{}: {}x{}, {} items, {} walls",
            room.id,
            marker,
            room.width,
            room.height,
            room.contents.len(),
            walls
        );
    }
}
