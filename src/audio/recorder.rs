use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use hound::WavWriter;
use log::{error, info, warn};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{fs, thread};

pub type AudioBlock = Vec<i16>;
const BLOCK_POOL_SIZE: usize = 32;

/// Owns the writer thread. Its audio-thread half is [`RecorderTap`].
pub struct Recorder {
    path: PathBuf,
    dropped: Arc<AtomicUsize>,
    handle: thread::JoinHandle<()>,
}

/// Audio-thread side of a recording. Blocks come from a preallocated pool,
/// so pushing never allocates.
pub struct RecorderTap {
    free_rx: Receiver<AudioBlock>,
    free_tx: Sender<AudioBlock>,
    filled_tx: Sender<AudioBlock>,
    dropped: Arc<AtomicUsize>,
}

impl Recorder {
    /// Start a stereo 16-bit recording in `record_dir`. Blocks longer than
    /// `max_frames` are truncated.
    pub fn new(
        sample_rate: u32,
        record_dir: &Path,
        max_frames: usize,
    ) -> Result<(Self, RecorderTap)> {
        fs::create_dir_all(record_dir).with_context(|| {
            format!("failed to create recording directory '{}'", record_dir.display())
        })?;

        let path = record_dir.join(format!(
            "recording_{}.wav",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        info!("Recording to: {}", path.display());

        let (free_tx, free_rx) = bounded::<AudioBlock>(BLOCK_POOL_SIZE);
        let (filled_tx, filled_rx) = bounded::<AudioBlock>(BLOCK_POOL_SIZE);
        for _ in 0..BLOCK_POOL_SIZE {
            free_tx
                .send(Vec::with_capacity(max_frames * 2))
                .context("failed to fill recording block pool")?;
        }

        let dropped = Arc::new(AtomicUsize::new(0));
        let handle = {
            let path = path.clone();
            let free_tx = free_tx.clone();
            thread::spawn(move || run_writer_thread(sample_rate, &path, &filled_rx, &free_tx))
        };

        let tap = RecorderTap {
            free_rx,
            free_tx,
            filled_tx,
            dropped: Arc::clone(&dropped),
        };

        Ok((
            Self {
                path,
                dropped,
                handle,
            },
            tap,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for the writer thread to finish so the WAV header is finalized.
    /// The matching tap must be dropped first.
    pub fn stop(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|e| anyhow::anyhow!("Writer thread panicked (join failed): {e:?}"))?;

        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!("Recording dropped {dropped} block(s) while the writer was busy");
        }

        Ok(())
    }
}

impl RecorderTap {
    /// Queue one stereo block for writing. Never blocks or allocates; the
    /// block is counted as dropped when no free buffer is available.
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        let Ok(mut block) = self.free_rx.try_recv() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        block.clear();
        let frames = left.len().min(right.len()).min(block.capacity() / 2);
        for (&l, &r) in left.iter().zip(right).take(frames) {
            block.push(quantize(l));
            block.push(quantize(r));
        }

        if let Err(e) = self.filled_tx.try_send(block) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let _ = self.free_tx.try_send(e.into_inner());
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[inline]
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Writes blocks received over `rx` to a WAV file and returns their buffers to the pool.
fn run_writer_thread(
    sample_rate: u32,
    path: &Path,
    rx: &Receiver<AudioBlock>,
    free_tx: &Sender<AudioBlock>,
) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = match WavWriter::create(path, spec) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create WAV file '{}': {e}", path.display());
            return;
        }
    };

    if let Err(e) = write_blocks(&mut writer, rx, free_tx) {
        error!("Recording to '{}' stopped: {e}", path.display());
    } else if let Err(e) = writer.finalize() {
        error!("Failed to finalize WAV file: {e}");
    } else {
        info!("Recording saved: {}", path.display());
    }
}

/// Write every block until the channel closes. After the first failed write
/// the rest are discarded, but buffers still go back to the pool.
fn write_blocks<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    rx: &Receiver<AudioBlock>,
    free_tx: &Sender<AudioBlock>,
) -> hound::Result<()> {
    let mut result = Ok(());
    for block in rx {
        if result.is_ok() {
            result = block
                .iter()
                .try_for_each(|&sample| writer.write_sample(sample));
        }
        let _ = free_tx.send(block);
    }
    result
}
