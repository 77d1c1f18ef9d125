#[macro_use]
extern crate log;

use hubsink_cli::{forward, Options};
use hubsink_output::{IotHubConfig, IotHubOutput, Output, Registry};
use std::error::Error;
use std::io;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let options = Options::from_cmd_line();

    if options.sample_config {
        let output = IotHubOutput::new(IotHubConfig::default());
        println!("[[outputs.azure_iothub]]{}", output.sample_config());
        return Ok(());
    }

    let config_path = options.config.ok_or("--config is required")?;
    let text = std::fs::read_to_string(&config_path)?;
    let mut outputs = Registry::default().load_outputs(&text)?;
    if outputs.is_empty() {
        warn!("No outputs configured in {}", config_path.display());
    }

    for output in outputs.iter_mut() {
        debug!("Initializing: {}", output.description());
        output.init()?;
        output.connect()?;
    }

    let stdin = io::stdin();
    let forwarded = forward(stdin.lock(), &outputs, options.batch_size, options.once)?;

    for output in &outputs {
        if let Err(e) = output.close() {
            warn!("Failed to close output: {}", e);
        }
    }
    info!(
        "Forwarded {} metrics, skipped {} lines",
        forwarded.metrics, forwarded.skipped_lines
    );

    if forwarded.failed_writes > 0 {
        return Err(format!("{} batch writes failed", forwarded.failed_writes).into());
    }
    Ok(())
}
