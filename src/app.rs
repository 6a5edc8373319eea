use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::import::load_questions;
use crate::search::{BuildResult, SearchEngine};

/// Everything a command needs: resolved config and a shared engine.
pub struct AppContext {
    pub config: Config,
    pub engine: Arc<SearchEngine>,
    pub output_format: OutputFormat,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let project_root = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        Self::with_config(config, cli.output_format())
    }

    pub fn with_config(config: Config, output_format: OutputFormat) -> Result<Self> {
        let engine = Arc::new(SearchEngine::from_config(&config)?);
        Ok(Self {
            config,
            engine,
            output_format,
        })
    }

    /// Load a bank file and index it, replacing whatever the engine held.
    pub fn load_bank(&self, path: &Path) -> Result<BuildResult> {
        let records = load_questions(path)?;
        let result = self.engine.build_index(&records);
        info!(
            bank = %path.display(),
            indexed = result.indexed,
            skipped = result.skipped,
            "bank loaded"
        );
        Ok(result)
    }

    #[must_use]
    pub fn is_robot(&self) -> bool {
        self.output_format != OutputFormat::Human
    }
}
