//! Software synthesis: waveform generators, ADSHR envelopes, and
//! phase-accumulating oscillator voices.
//!
//! Everything here runs sample-by-sample rather than vectorized, because
//! frequency, duty cycle, and envelope amplitude may all change between any
//! two samples. Callers pull filled f32 blocks from an `Oscillator` and
//! hand them to whatever sink needs them; no thread or device is owned at
//! this layer.

pub mod envelope;
pub mod oscillator;
pub mod wave;

/// Output sample rate, Hz. Wavetable sizes and phase arithmetic both key
/// off this value.
pub const SAMPLE_RATE: u32 = 11025;

pub use envelope::{Adshr, EnvelopeState};
pub use oscillator::{Effect, Modulation, Oscillator, Voice};
pub use wave::{source_for, WaveSource, Waveform};
