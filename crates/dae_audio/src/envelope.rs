//! ADSHR amplitude envelope.
//!
//! A five-state machine: OFF, ATTACK, DECAY, HOLD, RELEASE. Attack ramps
//! amplitude linearly to 1 over `a` samples, decay ramps down to the
//! sustain level over `d` samples, and release ramps to silence over `r`
//! samples. All ramps are linear per-sample increments; there are no
//! exponential curves.
//!
//! Two advance variants exist because callers gate notes two different
//! ways. `advance_gated` holds at sustain for as long as an explicit
//! note-on gate stays true; `advance_timed` runs unattended, counting `h`
//! samples of hold before releasing on its own. Both retrigger the attack
//! on a frequency change, and both report note-end by returning a zero
//! frequency so downstream generators can short-circuit to silence.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Off,
    Attack,
    Decay,
    Hold,
    Release,
}

/// Amplitude below this is treated as silence and snapped to zero.
const SILENCE_FLOOR: f32 = 0.0001;

#[derive(Debug, Clone)]
pub struct Adshr {
    /// Attack, decay, hold, release durations, in samples.
    pub a: u32,
    pub d: u32,
    pub h: u32,
    pub r: u32,
    /// Sustain level in `[0, 1]`.
    pub s: f32,
    pub amp: f32,
    freq: f32,
    elapsed: u32,
    state: EnvelopeState,
}

impl Adshr {
    pub fn new(a: u32, d: u32, s: f32, h: u32, r: u32) -> Self {
        Self {
            a: a.max(1),
            d: d.max(1),
            s,
            h: h.max(1),
            r: r.max(1),
            amp: 0.0,
            freq: 0.0,
            elapsed: 0,
            state: EnvelopeState::Off,
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// One step of the gate-driven variant. While `gate_on` is true the
    /// envelope runs attack and decay, then holds at sustain indefinitely;
    /// gate-off enters release. A frequency change, or gating on from OFF
    /// or RELEASE, retriggers the attack. Returns the frequency the
    /// generator should synthesize at: the input value, or 0 once the
    /// release has fully decayed.
    pub fn advance_gated(&mut self, mut freq: f32, gate_on: bool) -> f32 {
        if gate_on {
            if freq != self.freq
                || self.state == EnvelopeState::Off
                || self.state == EnvelopeState::Release
            {
                self.state = EnvelopeState::Attack;
            }
            if self.state == EnvelopeState::Attack {
                if self.amp >= 1.0 {
                    self.state = EnvelopeState::Decay;
                } else {
                    self.amp += 1.0 / self.a as f32;
                }
            }
            if self.state == EnvelopeState::Decay {
                if self.amp <= self.s {
                    self.amp = self.s;
                    self.state = EnvelopeState::Hold;
                } else {
                    self.amp -= (1.0 - self.s) / self.d as f32;
                }
            }
        } else {
            if self.state != EnvelopeState::Off {
                self.state = EnvelopeState::Release;
            }
            if self.state == EnvelopeState::Release {
                if self.amp <= SILENCE_FLOOR {
                    self.amp = 0.0;
                    self.state = EnvelopeState::Off;
                    freq = 0.0;
                } else {
                    self.amp -= self.s / self.r as f32;
                }
            }
        }
        self.freq = freq;
        freq
    }

    /// One step of the self-timed variant: hold lasts exactly `h` samples,
    /// then release begins without any external gate.
    pub fn advance_timed(&mut self, mut freq: f32) -> f32 {
        if freq != self.freq {
            self.elapsed = 0;
            self.state = EnvelopeState::Attack;
        }
        if self.state == EnvelopeState::Attack {
            if self.amp >= 1.0 {
                self.state = EnvelopeState::Decay;
            } else {
                self.amp += 1.0 / self.a as f32;
            }
        }
        if self.state == EnvelopeState::Decay {
            if self.amp <= self.s {
                self.amp = self.s;
                self.state = EnvelopeState::Hold;
            } else {
                self.amp -= (1.0 - self.s) / self.d as f32;
            }
        }
        if self.state == EnvelopeState::Hold {
            self.elapsed += 1;
            if self.elapsed >= self.h {
                self.elapsed = 0;
                self.state = EnvelopeState::Release;
            }
        }
        if self.state == EnvelopeState::Release {
            if self.amp <= SILENCE_FLOOR {
                self.amp = 0.0;
                self.state = EnvelopeState::Off;
                freq = 0.0;
            } else {
                self.amp -= self.s / self.r as f32;
            }
        }
        self.freq = freq;
        freq
    }
}
