//! One-bit square-wave beeper.
//!
//! The speaker is either on or off. To turn that into audio samples the
//! beeper takes two evenly spaced super-samples per output sample and
//! averages them, so a toggle that falls between two output samples still
//! contributes to both instead of aliasing.
//!
//! Output samples are emitted at `sound_hz`. Each super-sample is taken
//! every `period = tick_hz / (sound_hz * 2)` ticks.

use emu_core::{Chip, Pins};

/// Super-samples averaged into one output sample.
const SUPER_SAMPLES: u8 = 2;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beeper {
    on: bool,
    period: i64,
    counter: i64,
    magnitude: f32,
    acc: f32,
    remaining: u8,
    sample: f32,
}

impl Beeper {
    /// Speaker input: the chip follows this line while ticked over pins.
    pub const SPEAKER: u64 = Pins::chip_line(40);
    /// Driven high on the tick a new sample becomes available.
    pub const SAMPLE_READY: u64 = Pins::chip_line(41);

    /// # Panics
    ///
    /// If any argument is not positive, or the tick rate is too low to
    /// take two super-samples per output sample.
    #[must_use]
    pub fn new(tick_khz: u32, sound_hz: u32, magnitude: f32) -> Self {
        assert!(tick_khz > 0 && sound_hz > 0, "beeper rates must be positive");
        assert!(magnitude > 0.0, "beeper magnitude must be positive");
        let period = i64::from(tick_khz) * 1000 / (i64::from(sound_hz) * i64::from(SUPER_SAMPLES));
        assert!(period > 0, "tick rate too low for sound rate");
        Self {
            on: false,
            period,
            counter: period,
            magnitude,
            acc: 0.0,
            remaining: SUPER_SAMPLES,
            sample: 0.0,
        }
    }

    /// Ticks between super-samples.
    #[must_use]
    pub fn period(&self) -> i64 {
        self.period
    }

    pub fn reset(&mut self) {
        self.on = false;
        self.counter = self.period;
        self.acc = 0.0;
        self.remaining = SUPER_SAMPLES;
        self.sample = 0.0;
    }

    pub fn set(&mut self, on: bool) {
        self.on = on;
    }

    pub fn toggle(&mut self) {
        self.on = !self.on;
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// The most recently emitted sample.
    #[must_use]
    pub fn sample(&self) -> f32 {
        self.sample
    }

    /// Advance by `ticks`. Returns true if at least one new sample was
    /// emitted; [`Beeper::sample`] holds the latest.
    pub fn tick(&mut self, ticks: u32) -> bool {
        let mut ready = false;
        self.counter -= i64::from(ticks);
        while self.counter <= 0 {
            self.counter += self.period;
            if self.on {
                self.acc += self.magnitude;
            }
            self.remaining -= 1;
            if self.remaining == 0 {
                self.remaining = SUPER_SAMPLES;
                self.sample = self.acc / f32::from(SUPER_SAMPLES);
                self.acc = 0.0;
                ready = true;
            }
        }
        ready
    }
}

impl Chip for Beeper {
    fn tick(&mut self, pins: Pins) -> Pins {
        self.set(pins.is_set(Self::SPEAKER));
        let ready = Beeper::tick(self, 1);
        pins.with_control(Self::SAMPLE_READY, ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_rates() {
        // 3.5 MHz into 44.1 kHz: 39 ticks per super-sample.
        assert_eq!(Beeper::new(3_500, 44_100, 1.0).period(), 39);
        assert_eq!(Beeper::new(1_000, 500, 1.0).period(), 1_000);
    }

    #[test]
    fn full_on_window_emits_magnitude() {
        let mut b = Beeper::new(3_546, 48_000, 0.75);
        let window = (b.period() * 2) as u32;
        b.set(true);
        assert!(b.tick(window));
        assert_eq!(b.sample(), 0.75);
    }

    #[test]
    fn full_off_window_emits_zero() {
        let mut b = Beeper::new(3_546, 48_000, 0.75);
        let window = (b.period() * 2) as u32;
        b.set(true);
        b.tick(window);
        b.set(false);
        assert!(b.tick(window));
        assert_eq!(b.sample(), 0.0);
    }

    #[test]
    fn toggle_between_supersamples_averages() {
        let mut b = Beeper::new(1_000, 500, 1.0);
        b.set(true);
        assert!(!b.tick(1_000));
        b.toggle();
        assert!(b.tick(1_000));
        assert_eq!(b.sample(), 0.5);
    }

    #[test]
    fn single_ticks_match_batched() {
        let mut a = Beeper::new(3_546, 44_100, 1.0);
        let mut b = a.clone();
        let mut emitted = 0;
        for t in 0..10_000u32 {
            if t % 137 == 0 {
                a.toggle();
            }
            if a.tick(1) {
                emitted += 1;
            }
        }
        let mut batched = 0;
        for chunk in 0..(10_000 / 137 + 1) {
            b.toggle();
            let n = (10_000 - chunk * 137).min(137);
            if n > 0 && b.tick(n) {
                batched += 1;
            }
        }
        assert!(emitted > batched);
        assert_eq!(a.sample(), b.sample());
    }

    #[test]
    fn chip_drives_sample_ready() {
        let mut b = Beeper::new(1_000, 500, 1.0);
        let pins = Pins::new().with_control(Beeper::SPEAKER, true);
        let mut ready_ticks = 0;
        for _ in 0..4_000 {
            if Chip::tick(&mut b, pins).is_set(Beeper::SAMPLE_READY) {
                ready_ticks += 1;
            }
        }
        assert_eq!(ready_ticks, 2);
        assert_eq!(b.sample(), 1.0);
    }

    #[test]
    fn advance_matches_tick_loop() {
        let pins = Pins::new().with_control(Beeper::SPEAKER, true);
        let mut looped = Beeper::new(3_546, 48_000, 1.0);
        let mut batched = looped.clone();
        let n = looped.period() as u64 * 2 + 1;

        let mut out = pins;
        for _ in 0..n {
            out = Chip::tick(&mut looped, pins);
        }
        let advanced = batched.advance(pins, emu_core::Ticks::new(n));

        assert!(!out.is_set(Beeper::SAMPLE_READY));
        assert_eq!(advanced, out);
        assert_eq!(batched.sample(), looped.sample());
    }

    #[test]
    fn reset_silences() {
        let mut b = Beeper::new(1_000, 500, 1.0);
        b.set(true);
        b.tick(2_000);
        b.reset();
        assert!(!b.is_on());
        assert_eq!(b.sample(), 0.0);
    }
}
