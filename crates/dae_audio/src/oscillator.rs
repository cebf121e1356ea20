//! Oscillator voices and per-block synthesis.
//!
//! A `Voice` is one phase accumulator bound to a waveform generator, with
//! an optional envelope. `Oscillator` layers the user-facing parameter set
//! on top: main frequency, volume, a modulation routing, an optional LFO
//! voice that renders its own block first, and an effects chain applied to
//! the finished output.
//!
//! The phase-advance formula steps by
//! `sampleRate / (2 * portion * period)` where `portion` is the active
//! half's share of the duty cycle. At duty 0.5 this reduces to stepping by
//! the frequency; at other duty values the two half-periods advance at
//! different rates, which couples duty cycle to effective pitch. That
//! coupling is part of the sound of this synth and is kept as-is.

use crate::envelope::Adshr;
use crate::wave::{amp_mod, mix_mean, period, source_for, wrap_around, WaveSource, Waveform};
use crate::SAMPLE_RATE;

/// How the LFO (or a precomputed slide slope) reshapes the output.
///
/// The `*Mod` routings multiply or offset per-sample by the LFO scaled by
/// the modulation depth; the `*Slide` routings ignore the LFO and step the
/// named parameter linearly toward `slide_to` over `slide_time` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    None,
    AmpMod,
    FreqMod,
    PhaseMod,
    DutyMod,
    AmpSlide,
    FreqSlide,
    PhaseSlide,
    DutySlide,
}

/// Post-processing stage chained onto an oscillator's output. Blocks are
/// slices of an ongoing stream; implementations keep whatever state they
/// need for continuity across calls.
pub trait Effect: Send {
    fn process(&mut self, signal: &mut [f32]);
}

/// One synthesis voice: generator, phase accumulator, duty cycle, and an
/// optional envelope.
pub struct Voice {
    generator: Box<dyn WaveSource>,
    phase: f32,
    duty: f32,
    pub envelope: Option<Adshr>,
}

impl Voice {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            generator: source_for(waveform),
            phase: 0.0,
            duty: 0.5,
            envelope: None,
        }
    }

    pub fn set_duty(&mut self, duty: f32) {
        self.duty = duty.clamp(0.0, 1.0);
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Plain tone synthesis: no modulation, no slides. Still honors the
    /// envelope when one is attached.
    pub fn render_basic(&mut self, out: &mut [f32], freq: f32, phase_offset: f32, vol: f32, note_on: bool) {
        self.render(
            out,
            freq,
            phase_offset,
            vol,
            Modulation::None,
            None,
            0.0,
            0.0,
            0.0,
            note_on,
        );
    }

    /// Master block synthesis. Runs sample-by-sample so that frequency,
    /// duty, and envelope amplitude can all vary inside one block.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        out: &mut [f32],
        freq: f32,
        phase_offset: f32,
        vol: f32,
        modulation: Modulation,
        lfo: Option<&[f32]>,
        mod_depth: f32,
        slide_to: f32,
        slide_time: f32,
        note_on: bool,
    ) {
        // Envelope pre-pass decides whether there is any signal at all.
        let mut freq = freq;
        let mut amp = 1.0;
        if let Some(env) = self.envelope.as_mut() {
            freq = env.advance_gated(freq, note_on);
            amp = env.amp;
            if freq == 0.0 {
                out.fill(0.0);
                return;
            }
        } else if freq == 0.0 || !note_on {
            out.fill(0.0);
            return;
        }
        let env_freq = freq;

        let slide_step = if slide_time > 0.0 {
            match modulation {
                Modulation::AmpSlide => (slide_to - 1.0) / slide_time,
                Modulation::FreqSlide => (slide_to - freq) / slide_time,
                Modulation::DutySlide => (slide_to - self.duty) / slide_time,
                Modulation::PhaseSlide => (slide_to - self.phase) / slide_time,
                _ => 0.0,
            }
        } else {
            0.0
        };

        let rate = SAMPLE_RATE as f32;
        let mut wave_period = period(rate, freq);
        let mut duty = self.duty;
        let mut slide_amp = 1.0;
        for i in 0..out.len() {
            let lfo_sample = lfo.map(|l| l[i]).unwrap_or(0.0);

            // Pre-modulate the duty cycle.
            match modulation {
                Modulation::DutyMod => {
                    duty = wrap_around(mix_mean(duty, amp_mod(1.0, lfo_sample * mod_depth)));
                }
                Modulation::DutySlide => duty += slide_step,
                _ => {}
            }

            // Pre-modulate the phase shift.
            let mut phase = wrap_around(self.phase);
            match modulation {
                Modulation::PhaseMod => phase += rate * lfo_sample * mod_depth,
                Modulation::PhaseSlide => phase += slide_step,
                _ => phase += rate * phase_offset,
            }
            phase = wrap_around(phase);

            if let Some(env) = self.envelope.as_mut() {
                env.advance_gated(env_freq, note_on);
                amp = env.amp;
            }

            out[i] = self.generator.sample(phase, duty) * vol * amp;

            // Advance the accumulator through the active half-period. The
            // degenerate duties (0 in the first half, 1 in the second)
            // fall through to the opposite half's portion so the step
            // never divides by zero.
            let portion = if self.phase < rate / 2.0 {
                if duty == 0.0 {
                    1.0 - duty
                } else {
                    duty
                }
            } else if duty == 1.0 {
                duty
            } else {
                1.0 - duty
            };
            self.phase += rate / (2.0 * portion * wave_period);

            // Post-generation modulation.
            match modulation {
                Modulation::AmpMod => out[i] = amp_mod(out[i], lfo_sample * mod_depth),
                Modulation::AmpSlide => {
                    out[i] *= slide_amp;
                    slide_amp += slide_step;
                }
                Modulation::FreqMod => self.phase += lfo_sample * mod_depth,
                Modulation::FreqSlide => {
                    freq += slide_step;
                    wave_period = period(rate, freq);
                }
                _ => {}
            }
        }
        self.phase = wrap_around(self.phase);
    }
}

/// One user-facing synthesis channel with a fixed-size output buffer.
pub struct Oscillator {
    pub freq: f32,
    pub lfo_freq: f32,
    pub volume: f32,
    pub phase_offset: f32,
    pub modulation: Modulation,
    pub mod_depth: f32,
    pub slide_to: f32,
    pub slide_time: f32,
    pub enabled: bool,
    voice: Voice,
    lfo: Option<(Voice, Vec<f32>)>,
    out: Vec<f32>,
    effects: Vec<Box<dyn Effect>>,
}

impl Oscillator {
    pub fn new(buffer_size: usize, waveform: Waveform) -> Self {
        Self {
            freq: 0.0,
            lfo_freq: 0.0,
            volume: 0.5,
            phase_offset: 0.0,
            modulation: Modulation::None,
            mod_depth: 1.0,
            slide_to: 0.0,
            slide_time: 0.0,
            enabled: false,
            voice: Voice::new(waveform),
            lfo: None,
            out: vec![0.0; buffer_size],
            effects: Vec::new(),
        }
    }

    pub fn with_lfo(buffer_size: usize, waveform: Waveform, lfo_form: Waveform) -> Self {
        let mut osc = Self::new(buffer_size, waveform);
        osc.lfo = Some((Voice::new(lfo_form), vec![0.0; buffer_size]));
        osc
    }

    pub fn set_envelope(&mut self, envelope: Adshr) {
        self.voice.envelope = Some(envelope);
    }

    pub fn set_duty(&mut self, duty: f32) {
        self.voice.set_duty(duty);
    }

    /// Appends an effect to the output processing chain. Calls may be
    /// strung together.
    pub fn chain(&mut self, effect: Box<dyn Effect>) -> &mut Self {
        self.effects.push(effect);
        self
    }

    /// Renders one block: LFO first (if present), then the main voice,
    /// then the effects chain in order. Returns the finished block.
    pub fn generate(&mut self) -> &[f32] {
        match self.lfo.as_mut() {
            Some((lfo_voice, lfo_buf)) => {
                lfo_voice.render_basic(lfo_buf, self.lfo_freq, self.phase_offset, 1.0, self.enabled);
                self.voice.render(
                    &mut self.out,
                    self.freq,
                    self.phase_offset,
                    self.volume,
                    self.modulation,
                    Some(lfo_buf),
                    self.mod_depth,
                    self.slide_to,
                    self.slide_time,
                    self.enabled,
                );
            }
            None => {
                self.voice.render(
                    &mut self.out,
                    self.freq,
                    self.phase_offset,
                    self.volume,
                    self.modulation,
                    None,
                    self.mod_depth,
                    self.slide_to,
                    self.slide_time,
                    self.enabled,
                );
            }
        }
        for effect in &mut self.effects {
            effect.process(&mut self.out);
        }
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_oscillator_outputs_silence() {
        let mut osc = Oscillator::new(256, Waveform::Sin);
        osc.freq = 440.0;
        osc.enabled = false;
        assert!(osc.generate().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_frequency_outputs_silence() {
        let mut osc = Oscillator::new(256, Waveform::Saw);
        osc.freq = 0.0;
        osc.enabled = true;
        assert!(osc.generate().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn square_wave_period_matches_frequency() {
        // 441 Hz at 11025 Hz is exactly 25 samples per cycle.
        let mut osc = Oscillator::new(100, Waveform::Pulse);
        osc.freq = 441.0;
        osc.volume = 1.0;
        osc.enabled = true;
        let out = osc.generate();
        assert_eq!(out[0], 1.0);
        assert_eq!(out[12], 1.0);
        assert_eq!(out[13], -1.0);
        assert_eq!(out[24], -1.0);
        // Next cycle starts exactly one period later.
        assert_eq!(out[25], 1.0);
        assert_eq!(out[50], 1.0);
    }

    #[test]
    fn volume_scales_output() {
        let mut loud = Oscillator::new(64, Waveform::Pulse);
        loud.freq = 441.0;
        loud.volume = 1.0;
        loud.enabled = true;
        let mut quiet = Oscillator::new(64, Waveform::Pulse);
        quiet.freq = 441.0;
        quiet.volume = 0.25;
        quiet.enabled = true;
        let loud_block: Vec<f32> = loud.generate().to_vec();
        let quiet_block = quiet.generate();
        for (l, q) in loud_block.iter().zip(quiet_block) {
            assert_eq!(*q, l * 0.25);
        }
    }

    #[test]
    fn amp_mod_halves_output_under_silent_lfo() {
        // A zero-frequency LFO renders all zeros; amplitude modulation by
        // a zero LFO is a constant 0.5 gain.
        let mut plain = Oscillator::new(64, Waveform::Sin);
        plain.freq = 441.0;
        plain.volume = 1.0;
        plain.enabled = true;
        let mut modulated = Oscillator::with_lfo(64, Waveform::Sin, Waveform::Sin);
        modulated.freq = 441.0;
        modulated.lfo_freq = 0.0;
        modulated.volume = 1.0;
        modulated.modulation = Modulation::AmpMod;
        modulated.enabled = true;

        let plain_block: Vec<f32> = plain.generate().to_vec();
        let mod_block = modulated.generate();
        for (p, m) in plain_block.iter().zip(mod_block) {
            assert!((m - p * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn amp_slide_fades_toward_target() {
        let mut osc = Oscillator::new(100, Waveform::Pulse);
        osc.freq = 441.0;
        osc.volume = 1.0;
        osc.enabled = true;
        osc.modulation = Modulation::AmpSlide;
        osc.slide_to = 0.0;
        osc.slide_time = 100.0;
        let out = osc.generate();
        // Full amplitude at the start of the block, nearly gone by the end.
        assert_eq!(out[0].abs(), 1.0);
        assert!(out[99].abs() < 0.05);
    }

    #[test]
    fn envelope_shapes_block_amplitude() {
        let mut osc = Oscillator::new(50, Waveform::Pulse);
        osc.freq = 441.0;
        osc.volume = 1.0;
        osc.enabled = true;
        osc.set_envelope(Adshr::new(40, 10, 0.5, 5, 10));
        let out = osc.generate();
        // Attack ramp: early samples quieter than late ones.
        assert!(out[1].abs() < 0.1);
        assert!(out[39].abs() > 0.9);
    }

    #[test]
    fn gate_off_with_envelope_releases_to_silence() {
        let mut osc = Oscillator::new(64, Waveform::Pulse);
        osc.freq = 441.0;
        osc.volume = 1.0;
        osc.enabled = true;
        osc.set_envelope(Adshr::new(4, 4, 0.5, 5, 8));
        osc.generate();
        osc.enabled = false;
        // Release then fully off: the block after release is all silence.
        osc.generate();
        assert!(osc.generate().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn effects_chain_processes_in_order() {
        struct Gain(f32);
        impl Effect for Gain {
            fn process(&mut self, signal: &mut [f32]) {
                for s in signal {
                    *s *= self.0;
                }
            }
        }
        let mut osc = Oscillator::new(32, Waveform::Pulse);
        osc.freq = 441.0;
        osc.volume = 1.0;
        osc.enabled = true;
        osc.chain(Box::new(Gain(0.5))).chain(Box::new(Gain(0.5)));
        let out = osc.generate();
        assert!(out.iter().all(|&s| s.abs() == 0.25));
    }

    #[test]
    fn phase_accumulator_stays_wrapped_across_blocks() {
        let mut osc = Oscillator::new(64, Waveform::Saw);
        osc.freq = 1000.0;
        osc.volume = 1.0;
        osc.enabled = true;
        for _ in 0..50 {
            let out = osc.generate();
            assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
        assert!(osc.voice.phase >= 0.0);
        assert!(osc.voice.phase < SAMPLE_RATE as f32);
    }
}
