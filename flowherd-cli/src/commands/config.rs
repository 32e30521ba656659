//! `flowherd config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use flowherd_archive::RotationInterval;
use flowherd_core::config::FlowherdConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Validate the configuration file and report errors.
///
/// Beyond field validation this also parses the rotation interval, which
/// the daemon would otherwise reject only at startup.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let mut errors = Vec::new();
    match FlowherdConfig::load(config_path).await {
        Ok(config) => {
            if let Err(e) = config.archive.rotation.parse::<RotationInterval>() {
                errors.push(e.to_string());
            }
        }
        Err(e) => errors.push(e.to_string()),
    }

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = FlowherdConfig::load(config_path).await?;

    let to_toml = |result: Result<String, toml::ser::Error>| {
        result.unwrap_or_else(|e| format!("(serialization error: {})", e))
    };

    let report = if let Some(section_name) = section {
        let config_toml = match section_name.as_str() {
            "general" => to_toml(toml::to_string_pretty(&config.general)),
            "pipeline" => to_toml(toml::to_string_pretty(&config.pipeline)),
            "archive" => to_toml(toml::to_string_pretty(&config.archive)),
            "aggregation" => to_toml(toml::to_string_pretty(&config.aggregation)),
            "programs" => to_toml(toml::to_string_pretty(&config.programs)),
            _ => {
                return Err(CliError::Command(format!(
                    "unknown section: {} (expected: general, pipeline, archive, aggregation, programs)",
                    section_name
                )));
            }
        };
        ConfigReport {
            source: config_path.display().to_string(),
            section: Some(section_name),
            config_toml,
        }
    } else {
        ConfigReport {
            source: config_path.display().to_string(),
            section: None,
            config_toml: to_toml(toml::to_string_pretty(&config)),
        }
    };

    writer.render(&report)?;

    Ok(())
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization; JSON
/// consumers should read the structured config instead.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
