use anyhow::Result;
use clap::Parser;

use imgviz::cli::Cli;
use imgviz::math::hsv_to_rgb8;
use imgviz::{
    imshow, Frame, HeadlessBackend, ImageSource, ImshowOptions, RecordingPainter, Viewer,
    ViewerConfig, ViewerError,
};

/// Frames shown by `--slideshow` when `--frames` is not given
const SLIDESHOW_FRAMES: u64 = 12;

/// Diagonal hue gradient that scrolls with `phase`
fn gradient_frame(width: u32, height: u32, phase: u64) -> Frame {
    let span = (width + height).max(1) as f32;
    let shift = (phase % 120) as f32 / 120.0;

    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let hue = (x + y) as f32 / span + shift;
            data.extend_from_slice(&hsv_to_rgb8(hue, 0.8, 0.95));
        }
    }
    Frame::rgb(width, height, data)
}

fn run_slideshow(cli: &Cli, config: &ViewerConfig) -> Result<()> {
    let count = if cli.frames == 0 { SLIDESHOW_FRAMES } else { cli.frames };
    let frames = (0..count)
        .map(|i| gradient_frame(cli.width, cli.height, i * 10))
        .collect();

    let options = ImshowOptions {
        caption: config.title.clone(),
        interval: config.interval_duration(),
        ..Default::default()
    };
    imshow(ImageSource::Sequence(frames), options)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.viewer_config()?;

    if cli.slideshow {
        println!("imgviz slideshow - keys: n/p next/previous, s autoplay, h help, q quit");
        return run_slideshow(&cli, &config);
    }

    let viewer = if cli.headless {
        let (backend, _keys) = HeadlessBackend::new(RecordingPainter::new());
        Viewer::with_backend(config, Box::new(backend))?
    } else {
        Viewer::with_config(config)?
    };

    println!("imgviz viewer - keys: s play/pause, n step, h help, q quit");
    let mut produced = 0u64;
    while cli.frames == 0 || produced < cli.frames {
        let frame = gradient_frame(cli.width, cli.height, produced);
        match viewer.show(frame).and_then(|()| viewer.wait()) {
            Ok(()) => produced += 1,
            Err(ViewerError::Closed) => break,
            Err(err) => return Err(err.into()),
        }
    }

    viewer.close();
    log::info!("produced {produced} frames");
    Ok(())
}
