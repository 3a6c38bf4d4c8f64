//! CLI runner - executes commands

use crate::auth::{HttpTokenProvider, TokenProvider, TokenRequest};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, ExtractConfig};
use crate::engine::ExtractEngine;
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig};
use crate::output::{CloudDestination, Sink};
use crate::runlog::{LogSink, RunLog};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run { output } => self.extract(output.as_deref()).await,
            Commands::Check => self.check().await,
            Commands::Validate => self.validate(),
        }
    }

    fn load_config(&self) -> Result<ExtractConfig> {
        load_config(&self.cli.config)
    }

    /// Full extraction run, followed by the run log upload
    async fn extract(&self, output: Option<&str>) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(destination) = output {
            config.storage.destination = destination.to_string();
        }

        let started_at = Utc::now();
        let keys = config.object_keys(started_at)?;
        let destination = Arc::new(CloudDestination::from_config(&config.storage)?);
        let log = Arc::new(RunLog::new());

        let outcome =
            match ExtractEngine::from_config(&config, started_at, destination.clone(), log.clone())
            {
                Ok(mut engine) => engine.run().await,
                Err(e) => {
                    log.error(&format!("Failed to set up extraction: {e}"));
                    Err(e)
                }
            };

        log.info("Data extraction is over");
        let log_location = upload_run_log(destination.as_ref(), &keys.log, &log).await;

        match outcome {
            Ok(summary) => {
                let mut summary = serde_json::to_value(&summary)?;
                if let Value::Object(fields) = &mut summary {
                    fields.insert("status".into(), json!("SUCCEEDED"));
                    fields.insert("log_location".into(), json!(log_location));
                }
                self.output_message(&json!({
                    "type": "RUN_SUMMARY",
                    "summary": summary
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "RUN_SUMMARY",
                    "summary": {
                        "status": "FAILED",
                        "name": config.name,
                        "error": e.to_string(),
                        "log_location": log_location
                    }
                }));
                Err(e)
            }
        }
    }

    /// Request a token once and report the outcome
    ///
    /// A rejected token request is returned as an error after it is reported.
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking token endpoint for {}", config.name)
            }
        }));

        let client = HttpClient::with_config(HttpClientConfig::from(&config.http))?;
        let provider = HttpTokenProvider::new(TokenRequest::from_config(&config.token)?, client);

        match provider.authenticate().await {
            Ok(_) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": "Token obtained successfully"
                    }
                }));
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": format!("Token request failed: {e}")
                    }
                }));
                return Err(e);
            }
        }

        Ok(())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let keys = config.object_keys(Utc::now())?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration '{}' is valid; output {} under {}",
                    config.name, keys.data, config.storage.destination
                )
            }
        }));

        Ok(())
    }

    /// Output a JSON message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Upload the captured run log
///
/// A failed upload is recorded and printed to stderr; it never fails the run.
pub async fn upload_run_log(sink: &dyn Sink, key: &str, log: &RunLog) -> Option<String> {
    match sink.put(key, log.render()).await {
        Ok(location) => {
            log.info(&format!("Log file uploaded to '{location}'"));
            Some(location)
        }
        Err(e) => {
            let message = format!("Failed to upload log file: {e}");
            log.error(&message);
            eprintln!("{message}");
            None
        }
    }
}
