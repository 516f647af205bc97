//! An example showcasing how to convert a WAV file to another sample rate with the
//! prepare/out streaming protocol.

use std::{path::PathBuf, time::Instant};

use arg::{parse_args, Args};

use phonic_resampler::{Resampler, ResamplerOptions, ResamplingQuality};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const DEFAULT_OUTPUT_RATE: u32 = 48000;

/// Number of output frames rendered per block.
const BLOCK_SIZE: usize = 1024;

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "i", long = "input")]
    /// Path of the wav file to convert.
    input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Path of the resulting 32-bit float wav file.
    output_path: Option<PathBuf>,
    #[arg(short = "r", long = "rate")]
    /// Target sample rate. By default 48000.
    rate: Option<u32>,
    #[arg(short = "q", long = "quality")]
    /// Set resampling quality to \"Nearest\", \"Linear\", \"Default\" or \"HighQuality\".
    /// By default \"HighQuality\".
    quality: Option<ResamplingQuality>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args = parse_args::<Arguments>();

    // Init logger
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()?;

    let (Some(input_path), Some(output_path)) = (&args.input_path, &args.output_path) else {
        return Err("Missing arguments: both, an --input and --output path are required".into());
    };

    // Read input file
    let mut reader = hound::WavReader::open(input_path)?;
    let input_spec = reader.spec();
    let channel_count = input_spec.channels as usize;
    let input: Vec<f32> = match input_spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (input_spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    let input_frames = input.len() / channel_count;

    // Create resampler
    let output_rate = args.rate.unwrap_or(DEFAULT_OUTPUT_RATE);
    let quality = args.quality.unwrap_or(ResamplingQuality::HighQuality);
    let mut resampler = Resampler::with_options(
        ResamplerOptions::default()
            .rates(input_spec.sample_rate as f64, output_rate as f64)
            .quality(quality),
    )?;
    resampler.prealloc(channel_count, 0, BLOCK_SIZE)?;

    log::info!(
        "Converting {} frames from {} to {} Hz with {} quality...",
        input_frames,
        input_spec.sample_rate,
        output_rate,
        quality
    );

    // Convert
    let start = Instant::now();
    let mut output = Vec::with_capacity(
        (input.len() as f64 * output_rate as f64 / input_spec.sample_rate as f64) as usize
            + BLOCK_SIZE * channel_count,
    );
    let mut block = vec![0.0; BLOCK_SIZE * channel_count];
    let mut offset = 0;
    loop {
        let buffer = resampler.prepare(BLOCK_SIZE, channel_count)?;
        // supplying less input than requested flushes the stream
        let frames = (buffer.len() / channel_count).min(input_frames - offset);
        buffer[..frames * channel_count].copy_from_slice(
            &input[offset * channel_count..(offset + frames) * channel_count],
        );
        offset += frames;
        let written = resampler.out(&mut block, frames, BLOCK_SIZE, channel_count)?;
        output.extend_from_slice(&block[..written * channel_count]);
        if resampler.is_drained() {
            break;
        }
    }
    log::info!(
        "Converted {} frames in {:.2} ms",
        output.len() / channel_count,
        start.elapsed().as_secs_f64() * 1000.0
    );

    // Write output file
    let output_spec = hound::WavSpec {
        channels: input_spec.channels,
        sample_rate: output_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output_path, output_spec)?;
    for sample in output {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    log::info!("Wrote {}", output_path.display());
    Ok(())
}
