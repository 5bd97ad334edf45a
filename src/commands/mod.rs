mod collection_cmd;
mod config_cmd;
mod copy_cmd;

pub use collection_cmd::{DeleteCommand, ListCommand};
pub use config_cmd::ConfigCommand;
pub use copy_cmd::CopyCommand;

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
