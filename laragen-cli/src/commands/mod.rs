pub mod backups;
pub mod config;
pub mod db;
pub mod generate;

use crate::config::{LaragenConfig, ResolvedConnection};
use crate::inspector::{self, DatabaseIntrospector};
use anyhow::Result;
use clap::Args;

/// Connection selection shared by every database command
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Named connection from laragen.toml
    #[arg(long)]
    pub connection: Option<String>,

    /// Database URL, overrides any configured connection
    #[arg(long)]
    pub url: Option<String>,
}

impl ConnectionArgs {
    pub fn resolve(&self, config: &LaragenConfig) -> Result<ResolvedConnection> {
        Ok(config.resolve_connection(self.connection.as_deref(), self.url.as_deref())?)
    }
}

/// Connect to the resolved database
pub async fn connect(connection: &ResolvedConnection) -> Result<Box<dyn DatabaseIntrospector>> {
    log::debug!(
        "Connecting to {}",
        inspector::mask_database_url(&connection.url)
    );
    inspector::create_introspector(&connection.url, connection.schema.as_deref()).await
}
