use crate::core::config::ConfigField;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "azenithctl")]
#[command(version, about = "AZenith front-end control CLI")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Front-end settings file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the staged probes once and print every status value
    Status,

    /// Fetch one status value now
    Refresh {
        key: String,
    },

    /// List apps enabled in the app config
    Apps,

    /// Show the settings of one app
    Show {
        package: String,
    },

    Enable {
        package: String,
    },

    Disable {
        package: String,
    },

    /// Set one per-app setting (enables the app if needed)
    Set {
        package: String,
        #[arg(value_enum)]
        field: Field,
        value: String,
    },

    Gamelist {
        #[command(subcommand)]
        action: GamelistAction,
    },
}

#[derive(Subcommand)]
pub enum GamelistAction {
    /// Print the game list, optionally filtered
    Show {
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Merge an edited (filtered) list back and save it
    Save {
        /// Filter the edited lines were taken from
        #[arg(short, long, default_value = "")]
        filter: String,
        /// Read edited lines from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Field {
    PerfLiteMode,
    DndOnGaming,
    AppPriority,
    GamePreload,
    RefreshRate,
    Renderer,
}

impl From<Field> for ConfigField {
    fn from(field: Field) -> Self {
        match field {
            Field::PerfLiteMode => ConfigField::PerfLiteMode,
            Field::DndOnGaming => ConfigField::DndOnGaming,
            Field::AppPriority => ConfigField::AppPriority,
            Field::GamePreload => ConfigField::GamePreload,
            Field::RefreshRate => ConfigField::RefreshRate,
            Field::Renderer => ConfigField::Renderer,
        }
    }
}
