//! Renders a WAV file into a colour-mapped spectrogram PNG.

use std::path::PathBuf;

use tonescan::progress::TransformHooks;
use tonescan::signal::extract::{self, ExtractPolicy};
use tonescan::signal::wav::WavPcmSource;
use tonescan::spectrogram::{Spectrogram, SpectrogramSettings};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    tonescan::logging::init().map_err(|err| err.to_string())?;

    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };

    let settings = match &options.settings_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
            toml::from_str(&text)
                .map_err(|err| format!("Failed to parse {}: {err}", path.display()))?
        }
        None => SpectrogramSettings::default(),
    };

    let mut source = WavPcmSource::open(&options.input)
        .map_err(|err| format!("Failed to open {}: {err}", options.input.display()))?;
    let buffer = extract::extract(&mut source, &ExtractPolicy::default())
        .map_err(|err| format!("Extraction failed: {err}"))?;
    println!(
        "Loaded {:.2} s of audio at {} Hz",
        buffer.duration_secs(),
        buffer.sample_rate()
    );

    let mut report = |done: usize, total: usize| {
        eprint!("\rTransforming {done}/{total}");
        if done == total {
            eprintln!();
        }
    };
    let mut hooks = TransformHooks::with_progress(&mut report);
    let spectrogram = Spectrogram::from_samples(&buffer, settings, &mut hooks)
        .map_err(|err| format!("Transform failed: {err}"))?;

    let pixels = spectrogram
        .render()
        .map_err(|err| format!("Render failed: {err}"))?;

    let mut image = image::RgbImage::new(pixels.width() as u32, pixels.height() as u32);
    for y in 0..pixels.height() {
        for x in 0..pixels.width() {
            let packed = pixels.pixel(x, y);
            let rgb = [
                ((packed >> 16) & 0xff) as u8,
                ((packed >> 8) & 0xff) as u8,
                (packed & 0xff) as u8,
            ];
            image.put_pixel(x as u32, y as u32, image::Rgb(rgb));
        }
    }
    image
        .save(&options.output)
        .map_err(|err| format!("Failed to write {}: {err}", options.output.display()))?;

    println!(
        "Wrote {}x{} spectrogram to {}",
        pixels.width(),
        pixels.height(),
        options.output.display()
    );
    Ok(())
}

struct Options {
    input: PathBuf,
    output: PathBuf,
    settings_path: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut positional = Vec::new();
    let mut settings_path = None;
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("Usage: tonescan-render <input.wav> <output.png> [--settings FILE.toml]");
                return Ok(None);
            }
            "--settings" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--settings requires a file path".to_string())?;
                settings_path = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown option {other}"));
            }
            other => positional.push(PathBuf::from(other)),
        }
    }

    if positional.len() != 2 {
        return Err("Usage: tonescan-render <input.wav> <output.png> [--settings FILE.toml]".into());
    }
    let output = positional.pop().ok_or("missing output path")?;
    let input = positional.pop().ok_or("missing input path")?;

    Ok(Some(Options {
        input,
        output,
        settings_path,
    }))
}
