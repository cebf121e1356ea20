//! Raw PCM file audio sink.
//!
//! Writes submitted blocks as little-endian 16-bit mono PCM, suitable for
//! playback with e.g. `aplay -f S16_LE -r 11025 -c 1`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use dae_scene::AudioSink;

pub struct PcmFileSink {
    writer: BufWriter<File>,
}

impl PcmFileSink {
    pub fn create(path: &Path) -> Result<Self, String> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create PCM file {}: {e}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn finish(mut self) -> Result<(), String> {
        self.writer
            .flush()
            .map_err(|e| format!("Failed to flush PCM file: {e}"))
    }
}

impl AudioSink for PcmFileSink {
    fn submit(&mut self, block: &[i16]) -> Result<(), String> {
        for &sample in block {
            self.writer
                .write_all(&sample.to_le_bytes())
                .map_err(|e| format!("Failed to write PCM block: {e}"))?;
        }
        Ok(())
    }
}
