use std::time::Duration;

/// Half clock period giving roughly a 125 kHz bus.
pub const DEFAULT_HALF_PERIOD: Duration = Duration::from_micros(4);

/// Upper bound on how long a target may hold SCL low.
pub const DEFAULT_STRETCH_DEADLINE: Duration = Duration::from_millis(100);

/// Bound applied while waiting for a stretched clock to be released.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StretchLimit {
    /// Spin forever, like firmware without a watchdog would.
    Unbounded,
    /// Give up after this many polls of SCL.
    Polls(u32),
    /// Give up once this much wall-clock time has passed.
    Deadline(Duration),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub half_period: Duration,
    pub clock_stretch: StretchLimit,
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Half period in nanoseconds, saturated to what `DelayNs` accepts.
    pub fn half_period_ns(&self) -> u32 {
        u32::try_from(self.half_period.as_nanos()).unwrap_or(u32::MAX)
    }

    /// Approximate SCL frequency, ignoring the time spent outside delays.
    pub fn bus_frequency_hz(&self) -> u32 {
        let period_ns = u64::from(self.half_period_ns()) * 2;
        if period_ns == 0 {
            return u32::MAX;
        }
        u32::try_from(1_000_000_000 / period_ns).unwrap_or(u32::MAX)
    }
}

pub struct ConfigBuilder {
    half_period: Duration,
    clock_stretch: StretchLimit,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            half_period: DEFAULT_HALF_PERIOD,
            clock_stretch: StretchLimit::Deadline(DEFAULT_STRETCH_DEADLINE),
        }
    }

    #[must_use]
    pub fn half_period(mut self, half_period: Duration) -> Self {
        self.half_period = half_period;
        self
    }

    /// Derives the half period from a target bus frequency.
    #[must_use]
    pub fn frequency_hz(mut self, hz: u32) -> Self {
        let hz = u64::from(hz.max(1));
        self.half_period = Duration::from_nanos(1_000_000_000 / (2 * hz));
        self
    }

    #[must_use]
    pub fn clock_stretch(mut self, limit: StretchLimit) -> Self {
        self.clock_stretch = limit;
        self
    }

    #[must_use]
    pub fn build(self) -> Config {
        Config {
            half_period: self.half_period,
            clock_stretch: self.clock_stretch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runs_at_125_khz() {
        let config = Config::default();
        assert_eq!(config.half_period_ns(), 4_000);
        assert_eq!(config.bus_frequency_hz(), 125_000);
        assert_eq!(
            config.clock_stretch,
            StretchLimit::Deadline(DEFAULT_STRETCH_DEADLINE)
        );
    }

    #[test]
    fn builder_from_frequency() {
        let config = Config::builder()
            .frequency_hz(100_000)
            .clock_stretch(StretchLimit::Polls(32))
            .build();

        assert_eq!(config.half_period, Duration::from_micros(5));
        assert_eq!(config.clock_stretch, StretchLimit::Polls(32));
    }

    #[test]
    fn half_period_saturates() {
        let config = Config::builder()
            .half_period(Duration::from_secs(60))
            .build();
        assert_eq!(config.half_period_ns(), u32::MAX);
    }
}
