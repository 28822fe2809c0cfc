//! Run the signal graph of a patch.

use anyhow::bail;
use clap::Args;
use patchbay_boxes::PeakMeter;
use patchbay_config::EngineConfig;

use super::load_page;

/// Run a patch for a number of DSP blocks.
#[derive(Args)]
pub struct RunArgs {
    /// Patch file, or the name of a patch in the user patches directory
    pub patch: String,

    /// Number of blocks to process
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// Sample rate in Hz
    #[arg(short = 'r', long)]
    pub sample_rate: Option<u32>,

    /// Samples per block
    #[arg(short, long)]
    pub block_size: Option<usize>,
}

impl RunArgs {
    /// Settings with command-line overrides applied.
    fn settings(&self, config: &EngineConfig) -> anyhow::Result<EngineConfig> {
        let settings = EngineConfig {
            sample_rate: self.sample_rate.unwrap_or(config.sample_rate),
            block_size: self.block_size.unwrap_or(config.block_size),
            ticks: self.ticks.unwrap_or(config.ticks),
            log_level: config.log_level.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Run the run command.
pub fn run(args: RunArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let settings = args.settings(config)?;
    let page = load_page(&args.patch)?;

    if !page.start_dsp(settings.sample_rate, settings.block_size) {
        bail!("DSP could not start for {}", args.patch);
    }
    tracing::info!(
        sample_rate = settings.sample_rate,
        block_size = settings.block_size,
        ticks = settings.ticks,
        "running"
    );
    for _ in 0..settings.ticks {
        page.tick_dsp();
    }

    let meters: Vec<_> = page
        .boxes()
        .into_iter()
        .filter(|object| object.kind::<PeakMeter>().is_some())
        .collect();
    if meters.is_empty() {
        println!("No peak~ boxes in {}", args.patch);
    }
    for object in &meters {
        if let Some(meter) = object.kind::<PeakMeter>() {
            println!(
                "peak~ {:>4}  peak {:.6}  blocks {}",
                object.id(),
                meter.peak(),
                meter.blocks()
            );
        }
    }
    page.stop_dsp();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ticks: Option<u64>, block_size: Option<usize>) -> RunArgs {
        RunArgs {
            patch: "patch.json".to_string(),
            ticks,
            sample_rate: None,
            block_size,
        }
    }

    #[test]
    fn flags_override_config() {
        let config = EngineConfig::default();
        let settings = args(Some(3), Some(128)).settings(&config).unwrap();
        assert_eq!(settings.ticks, 3);
        assert_eq!(settings.block_size, 128);
        assert_eq!(settings.sample_rate, config.sample_rate);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        assert!(args(None, Some(0)).settings(&EngineConfig::default()).is_err());
    }
}
