//! Machine configuration.

/// Configuration for creating a [`Plus3`](crate::Plus3).
#[derive(Debug, Clone)]
pub struct Plus3Config {
    /// CPU clock in Hz.
    pub cpu_hz: u64,
    /// Beeper output sample rate.
    pub audio_hz: u32,
    /// Beeper sample value while the speaker is on.
    pub beeper_volume: f32,
    /// ROM image mapped at 0x0000 and write-protected. Only the first 16K
    /// are mapped. `None` leaves the whole 64K as RAM.
    pub rom: Option<Vec<u8>>,
    /// Keyboard updates a released key stays visible for.
    pub sticky_keys: u32,
}

impl Default for Plus3Config {
    fn default() -> Self {
        Self {
            cpu_hz: 3_546_900,
            audio_hz: 48_000,
            beeper_volume: 0.5,
            rom: None,
            sticky_keys: 2,
        }
    }
}
