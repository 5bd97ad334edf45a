use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use larder::config::BackendKind;
use larder::{copy_all, Backend, Config, Store};
use larder_core::ProviderRegistry;

#[derive(Args)]
pub struct CopyCommand {
    /// Backend to copy into
    #[arg(long)]
    pub to: BackendKind,

    /// Target directory for the files backend (default: configured data_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Target database for the sqlite backend (default: configured database_path)
    #[arg(long)]
    pub database_path: Option<PathBuf>,
}

impl CopyCommand {
    /// The backend records are copied into.
    pub fn target(&self, config: &Config) -> Backend {
        match self.to {
            BackendKind::Files => Backend::Files {
                data_dir: self
                    .data_dir
                    .clone()
                    .unwrap_or_else(|| config.data_dir.value.clone()),
            },
            BackendKind::Sqlite => Backend::Sqlite {
                database_path: self
                    .database_path
                    .clone()
                    .unwrap_or_else(|| config.database_path.value.clone()),
            },
        }
    }

    pub async fn run(
        &self,
        source: &Store,
        config: &Config,
        providers: Arc<ProviderRegistry>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let target = self.target(config);
        if target == config.backend() {
            return Err(format!("Source and target are the same backend ({})", target).into());
        }

        let destination = Store::open(&target, providers).await?;
        let summary = copy_all(source, &destination).await?;
        destination.close().await?;

        println!("Copied {} into {}", summary, target);
        Ok(())
    }
}
