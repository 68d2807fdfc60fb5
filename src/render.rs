use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};
use std::path::Path;

use crate::processor::{PLUGIN_INFO, Processor, StreamFormat};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    pub peak: f32,
}

/// Run a WAV file through the processor and write the result as 32-bit float.
pub fn render_file(
    processor: &mut Processor,
    input: &Path,
    output: &Path,
    block_size: usize,
) -> Result<RenderStats> {
    if block_size == 0 {
        bail!("block size must be at least one frame");
    }

    let reader = WavReader::open(input)
        .with_context(|| format!("failed to open input '{}'", input.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    if channels == 0 || channels > PLUGIN_INFO.input_channels {
        bail!(
            "'{}' has {channels} channels, only mono or stereo is supported",
            input.display()
        );
    }

    debug!("Input spec: {spec:?}");
    let mut samples = read_samples(reader)
        .with_context(|| format!("failed to decode '{}'", input.display()))?;

    processor.setup(StreamFormat {
        sample_rate: spec.sample_rate as f32,
        max_block_size: block_size,
        channels,
    });

    for block in samples.chunks_mut(block_size * channels) {
        processor.process_interleaved(block);
    }

    processor.teardown();

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    write_samples(output, spec.channels, spec.sample_rate, &samples)
        .with_context(|| format!("failed to write output '{}'", output.display()))?;

    let stats = RenderStats {
        frames: samples.len() / channels,
        channels,
        sample_rate: spec.sample_rate,
        peak,
    };
    info!(
        "Rendered {} frames to {} (peak {:.3})",
        stats.frames,
        output.display(),
        stats.peak
    );

    Ok(stats)
}

fn read_samples<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();

    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read float samples"),
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported bit depth {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read integer samples")
        }
    }
}

fn write_samples(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).context("failed to create WAV file")?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .context("failed to write sample")?;
    }
    writer.finalize().context("failed to finalize WAV file")?;

    Ok(())
}
