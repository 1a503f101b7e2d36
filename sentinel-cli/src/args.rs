//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};

use sentinel::SentinelConfig;

/// Sentinel - content-safety monitoring for user submissions
#[derive(Parser, Debug, Clone)]
#[command(name = "sentinel")]
#[command(about = "Check user submissions for safety violations and escalate repeat offenders")]
pub struct Args {
    /// YAML configuration file
    #[arg(long, env = "SENTINEL_CONFIG", global = true)]
    pub config: Option<String>,

    /// Log level (overrides general.log_level)
    #[arg(long, env = "SENTINEL_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "SENTINEL_LOG_JSON", global = true, default_value = "false")]
    pub log_json: bool,

    /// Image-safety classifier endpoint (overrides classifier.endpoint)
    #[arg(long, env = "SENTINEL_CLASSIFIER_URL", global = true)]
    pub classifier_url: Option<String>,

    /// Bearer token for the classifier
    #[arg(long, env = "SENTINEL_CLASSIFIER_API_KEY", global = true, hide_env_values = true)]
    pub classifier_api_key: Option<String>,

    /// JSON-lines audit file (overrides audit.path)
    #[arg(long, env = "SENTINEL_AUDIT_PATH", global = true)]
    pub audit_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check a single submission and print the outcome as JSON
    Check {
        /// Submitting user
        #[arg(long)]
        user: String,

        /// UI component the content came from
        #[arg(long)]
        component: String,

        /// Submitted text
        #[arg(long)]
        text: Option<String>,

        /// Submitted image reference
        #[arg(long)]
        image: Option<String>,
    },

    /// Read JSON-lines submissions from stdin, one result line per input
    Stream,
}

impl Args {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut SentinelConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(url) = &self.classifier_url {
            config.classifier.endpoint = Some(url.clone());
        }
        if let Some(key) = &self.classifier_api_key {
            config.classifier.api_key = Some(key.clone());
        }
        if let Some(path) = &self.audit_path {
            config.audit.path = Some(path.clone());
        }
    }

    /// Load the config file (defaults when none is given) and apply overrides.
    pub async fn resolve_config(&self) -> sentinel::Result<SentinelConfig> {
        let mut config = match &self.config {
            Some(path) => SentinelConfig::load(path).await?,
            None => SentinelConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }
}
