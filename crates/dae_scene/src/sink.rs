//! Audio output seam.

/// Consumer of rendered sample blocks. The synthesis side produces f32
/// samples in [-1, 1]; sinks take interleaved-mono 16-bit PCM.
pub trait AudioSink: Send {
    fn submit(&mut self, block: &[i16]) -> Result<(), String>;
}

/// Converts a float block to 16-bit PCM, clipping out-of-range samples.
/// Reuses the output buffer's allocation across calls.
pub fn to_pcm16(samples: &[f32], out: &mut Vec<i16>) {
    out.clear();
    out.reserve(samples.len());
    for &s in samples {
        let clipped = s.clamp(-1.0, 1.0);
        out.push((clipped * i16::MAX as f32) as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_clips_and_scales() {
        let mut out = Vec::new();
        to_pcm16(&[0.0, 1.0, -1.0, 2.0, -3.0], &mut out);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], i16::MAX);
        assert_eq!(out[3], i16::MAX);
        assert_eq!(out[4], -i16::MAX);
        assert_eq!(out[2], -i16::MAX);
    }

    #[test]
    fn conversion_reuses_buffer() {
        let mut out = Vec::new();
        to_pcm16(&[0.5; 8], &mut out);
        assert_eq!(out.len(), 8);
        to_pcm16(&[0.25; 4], &mut out);
        assert_eq!(out.len(), 4);
    }
}
