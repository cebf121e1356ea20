//! Waveform generators.
//!
//! Two families: functional generators (pulse, the noise variants) compute
//! each sample on demand; tabled generators (saw, triangle, sin, tan,
//! hemicycle) index a precomputed one-cycle-at-1Hz table shared
//! process-wide. Tables hold one sample per output sample, so a wrapped
//! phase in `[0, SAMPLE_RATE)` indexes directly by `floor`.
//!
//! Phase wrapping is done with repeated subtraction rather than a float
//! modulo, preserving precision near zero across long-running phase
//! accumulators.

use std::sync::OnceLock;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::SAMPLE_RATE;

/// Selects what an oscillator voice sounds like. Pulse and the noise
/// variants generate on the fly; the rest read shared wavetables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Duty 0.5 gives a square wave; a randomized duty gives FM-ish noise.
    Pulse,
    /// Amplitude-modulated white noise.
    NoiseAm,
    /// Frequency-modulated noise: a random bit decision mapped to +/-1.
    NoiseFm,
    /// Pink-ish noise: runs of random duration with sign-flipped amplitude.
    NoisePink,
    Saw,
    /// Duty 1.0 degenerates to a saw, 0.0 to a reverse saw.
    Triangle,
    Sin,
    /// Tangent, hard-clipped to tame the asymptotes.
    Tan,
    /// Circular arc segments, positive then negative.
    Hemicycle,
}

/// One sample at a given phase. `phase` is pre-wrapped to
/// `[0, SAMPLE_RATE)`; `duty` is the active duty cycle in `[0, 1]`.
/// Stateful implementations (noise) mutate their own run state.
pub trait WaveSource: Send {
    fn sample(&mut self, phase: f32, duty: f32) -> f32;
}

/// Builds the generator for a waveform kind.
pub fn source_for(waveform: Waveform) -> Box<dyn WaveSource> {
    match waveform {
        Waveform::Pulse => Box::new(PulseWave),
        Waveform::NoiseAm => Box::new(WhiteNoise::new()),
        Waveform::NoiseFm => Box::new(FmNoise::new()),
        Waveform::NoisePink => Box::new(PinkNoise::new()),
        Waveform::Saw => Box::new(Tabled::new(saw_table())),
        Waveform::Triangle => Box::new(Tabled::new(triangle_table())),
        Waveform::Sin => Box::new(Tabled::new(sin_table())),
        Waveform::Tan => Box::new(Tabled::new(tan_table())),
        Waveform::Hemicycle => Box::new(Tabled::new(hemicycle_table())),
    }
}

// helpers /////////////////////////////////////////////////////////////////

/// Wavelength in samples for a tone at `freq`.
pub fn period(sample_rate: f32, freq: f32) -> f32 {
    sample_rate / freq
}

/// Clips a sample to `[-1, 1]`.
pub fn clip(sample: f32) -> f32 {
    sample.clamp(-1.0, 1.0)
}

/// Mixes two samples by taking their mean.
pub fn mix_mean(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

/// Amplitude-modulates one sample by an LFO sample, treating the LFO's
/// `[-1, 1]` swing as a `[0, 1]` gain.
pub fn amp_mod(sample: f32, lfo: f32) -> f32 {
    sample * ((lfo + 1.0) * 0.5)
}

/// Wraps a phase into `[0, SAMPLE_RATE)`.
pub fn wrap_around(mut phase: f32) -> f32 {
    let chunk = SAMPLE_RATE as f32;
    while phase >= chunk {
        phase -= chunk;
    }
    while phase < 0.0 {
        phase += chunk;
    }
    phase
}

// functional generators ///////////////////////////////////////////////////

struct PulseWave;

impl WaveSource for PulseWave {
    fn sample(&mut self, phase: f32, duty: f32) -> f32 {
        if phase < SAMPLE_RATE as f32 * duty {
            1.0
        } else {
            -1.0
        }
    }
}

struct WhiteNoise {
    rng: SmallRng,
}

impl WhiteNoise {
    fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl WaveSource for WhiteNoise {
    fn sample(&mut self, _phase: f32, _duty: f32) -> f32 {
        self.rng.gen::<f32>() * 2.0 - 1.0
    }
}

struct FmNoise {
    rng: SmallRng,
}

impl FmNoise {
    fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl WaveSource for FmNoise {
    fn sample(&mut self, _phase: f32, _duty: f32) -> f32 {
        if self.rng.gen::<i64>() > self.rng.gen::<i64>() {
            1.0
        } else {
            -1.0
        }
    }
}

struct PinkNoise {
    rng: SmallRng,
    duration: i32,
    flip: f32,
    amp: f32,
}

impl PinkNoise {
    fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            duration: 0,
            flip: 1.0,
            amp: 0.0,
        }
    }
}

impl WaveSource for PinkNoise {
    fn sample(&mut self, _phase: f32, _duty: f32) -> f32 {
        // Run lengths bottom out around 400 Hz and top out at Nyquist.
        if self.duration == 0 {
            let max = SAMPLE_RATE as i32 / 400;
            self.duration = self.rng.gen_range(0..max) + 1;
            self.amp = self.flip * (self.duration / max + 1) as f32 * 0.5;
        }
        let sample = self.amp;
        self.duration -= 1;
        if self.duration == 0 {
            self.flip *= -1.0;
        }
        sample
    }
}

// wavetables //////////////////////////////////////////////////////////////

struct Tabled {
    table: &'static [f32],
}

impl Tabled {
    fn new(table: &'static [f32]) -> Self {
        Self { table }
    }
}

impl WaveSource for Tabled {
    fn sample(&mut self, phase: f32, _duty: f32) -> f32 {
        // Wrapped phase is < SAMPLE_RATE, but float rounding at the wrap
        // boundary gets one last clamp.
        let index = (phase.floor() as usize).min(self.table.len() - 1);
        self.table[index]
    }
}

fn build_table(f: impl Fn(usize) -> f32) -> Vec<f32> {
    (0..SAMPLE_RATE as usize).map(f).collect()
}

fn saw_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let period = period(SAMPLE_RATE as f32, 1.0);
        build_table(|i| (i as f32 / period) * 2.0 - 1.0)
    })
}

fn triangle_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let period = period(SAMPLE_RATE as f32, 1.0);
        let half = period / 2.0;
        build_table(|i| {
            let i = i as f32;
            let ramp = if i <= half {
                i / half
            } else {
                (period - i) / half
            };
            ramp * 2.0 - 1.0
        })
    })
}

fn sin_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let period = period(SAMPLE_RATE as f32, 1.0);
        build_table(|i| {
            let theta = 2.0 * std::f32::consts::PI * (i as f32 / period);
            theta.sin()
        })
    })
}

fn tan_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let period = period(SAMPLE_RATE as f32, 1.0);
        build_table(|i| {
            let theta = 2.0 * std::f32::consts::PI * (i as f32 / period);
            clip(theta.tan() / (4.0 * std::f32::consts::PI))
        })
    })
}

fn hemicycle_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let period = period(SAMPLE_RATE as f32, 1.0);
        let half = period * 0.5;
        let quarter = half * 0.5;
        build_table(|i| {
            let pos = (i % half.round() as usize) as f32;
            let mut sample = (quarter * quarter - (pos - quarter) * (pos - quarter))
                .max(0.0)
                .sqrt();
            sample *= 1.0 / quarter;
            if i as f32 > half {
                sample = -sample;
            }
            sample
        })
    })
}
