// cli.rs - Command-line interface configuration
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{schedulable, ViewerConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "imgviz-viewer")]
#[command(about = "Live image viewer fed by a synthetic frame producer", long_about = None)]
pub struct Cli {
    /// Start paused; press 'n' to step, 's' to play
    #[arg(long)]
    pub paused: bool,

    /// Seconds each frame stays up while playing
    #[arg(long)]
    pub interval: Option<f64>,

    /// Open the window on the first frame instead of at startup
    #[arg(long)]
    pub lazy: bool,

    /// Number of frames to produce (0 = until the window is closed)
    #[arg(long, default_value_t = 0)]
    pub frames: u64,

    /// Width of the generated frames
    #[arg(long, default_value_t = 320)]
    pub width: u32,

    /// Height of the generated frames
    #[arg(long, default_value_t = 240)]
    pub height: u32,

    /// Run without a window (frames are painted into memory)
    #[arg(long)]
    pub headless: bool,

    /// Show the frames as a blocking slideshow on the main thread instead
    #[arg(long, conflicts_with = "headless")]
    pub slideshow: bool,

    /// JSON viewer config; flags given on the command line override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Window title
    #[arg(long)]
    pub title: Option<String>,
}

impl Cli {
    /// Viewer config from the optional file with command-line overrides applied
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ViewerConfig::default(),
        };

        if self.paused {
            config.play = false;
        }
        if let Some(interval) = self.interval {
            let duration = schedulable(interval)
                .context("--interval must be a non-negative number of seconds")?;
            config = config.interval(duration);
        }
        if self.lazy {
            config.eager = false;
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["imgviz-viewer"]);
        let config = cli.viewer_config().expect("valid");
        assert_eq!(config, ViewerConfig::default());
        assert_eq!((cli.width, cli.height, cli.frames), (320, 240, 0));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "imgviz-viewer",
            "--paused",
            "--lazy",
            "--interval",
            "0.25",
            "--title",
            "demo",
        ]);
        let config = cli.viewer_config().expect("valid");
        assert!(!config.play);
        assert!(!config.eager);
        assert_eq!(config.interval_duration(), Duration::from_millis(250));
        assert_eq!(config.title, "demo");
    }

    #[test]
    fn test_negative_interval_is_rejected() {
        let cli = Cli::parse_from(["imgviz-viewer", "--interval=-1"]);
        assert!(cli.viewer_config().is_err());
    }

    #[test]
    fn test_unrepresentable_interval_is_rejected() {
        for interval in ["1e20", "inf", "NaN"] {
            let cli = Cli::parse_from(["imgviz-viewer", "--slideshow", "--interval", interval]);
            assert!(cli.viewer_config().is_err(), "{interval}");
        }
    }

    #[test]
    fn test_slideshow_conflicts_with_headless() {
        assert!(Cli::try_parse_from(["imgviz-viewer", "--slideshow", "--headless"]).is_err());
    }
}
