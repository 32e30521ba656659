//! Stage graph construction -- configuration to launchable stage specs.
//!
//! The topology is fixed; configuration selects branches and fills in
//! the command lines:
//!
//! ```text
//! capture -> hub -> archive
//!               \-> aggregate   (optional)
//! ```
//!
//! Capture and hub are critical: the pipeline cannot produce anything
//! without them, and restarting either would invalidate the readiness
//! the downstream stages were gated on. The archival writer is critical
//! too, since the archive is the primary record. Aggregation is a
//! best-effort side channel and stays degradable.

use std::path::Path;

use flowherd_archive::RotationInterval;
use flowherd_archive::rotation::write_template;
use flowherd_core::config::FlowherdConfig;
use flowherd_core::error::{ConfigError, FlowherdError};
use flowherd_core::stage::StageSpec;

/// Render the stage graph for one pipeline run.
///
/// Stages come back in start order (dependencies first). The rotation
/// interval is parsed here so a bad value fails before anything spawns.
pub fn build_stage_graph(config: &FlowherdConfig) -> Result<Vec<StageSpec>, FlowherdError> {
    let rotation: RotationInterval =
        config
            .archive
            .rotation
            .parse()
            .map_err(|e: flowherd_archive::ArchiveError| {
                FlowherdError::Config(ConfigError::InvalidValue {
                    field: "archive.rotation".to_owned(),
                    reason: e.to_string(),
                })
            })?;

    let capture_port = config.pipeline.capture_port.to_string();
    let hub_port = config.pipeline.hub_port.to_string();
    let hub_upstream = format!("127.0.0.1:{}", config.pipeline.capture_port);
    let branch_upstream = format!("127.0.0.1:{}", config.pipeline.hub_port);
    let template = write_template(Path::new(&config.archive.root), &config.archive.prefix);

    let mut specs = Vec::with_capacity(4);

    specs.push(
        StageSpec::new("capture", &config.programs.capture)
            .args([
                "--interface",
                config.pipeline.interface.as_str(),
                "--listen",
                capture_port.as_str(),
            ])
            .tcp_ready(config.pipeline.capture_port)
            .critical(),
    );

    let mut hub = StageSpec::new("hub", &config.programs.hub)
        .args([
            "--upstream",
            hub_upstream.as_str(),
            "--listen",
            hub_port.as_str(),
        ])
        .depends_on("capture")
        .tcp_ready(config.pipeline.hub_port)
        .critical();
    if config.pipeline.enrichment {
        hub = hub.args(["--enrich"]);
    }
    specs.push(hub);

    specs.push(
        StageSpec::new("archive", &config.programs.archiver)
            .args([
                "--upstream",
                branch_upstream.as_str(),
                "--rotate",
                rotation.as_str(),
                "--write",
                template.as_str(),
            ])
            .depends_on("hub")
            .critical(),
    );

    if config.aggregation.enabled {
        let bin_secs = config.aggregation.bin_interval_secs.to_string();
        specs.push(
            StageSpec::new("aggregate", &config.programs.aggregator)
                .args([
                    "--upstream",
                    branch_upstream.as_str(),
                    "--bin-secs",
                    bin_secs.as_str(),
                    "--out",
                    config.aggregation.pipe_path.as_str(),
                ])
                .depends_on("hub"),
        );
    }

    Ok(specs)
}
