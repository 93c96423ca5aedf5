//! Simulation clock and the per-frame ticker that drives it

use chrono::{Datelike, Timelike};

/// Lowest rate the UI offers
pub const MIN_RATE: f64 = 0.1;

/// Highest rate the UI offers
pub const MAX_RATE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockError {
    InvalidRate(f64),
    InvalidTime(String),
}

impl std::fmt::Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRate(rate) => write!(f, "Clock rate must be positive, got {}", rate),
            Self::InvalidTime(message) => write!(f, "Cannot convert wall-clock time: {}", message),
        }
    }
}

impl std::error::Error for ClockError {}

/// Current UTC wall-clock time as a satkit instant
pub fn wall_clock_now() -> Result<satkit::Instant, ClockError> {
    let now = chrono::Utc::now();
    let seconds = now.second() as f64 + now.nanosecond() as f64 * 1.0e-9;
    satkit::Instant::from_datetime(
        now.year(),
        now.month() as i32,
        now.day() as i32,
        now.hour() as i32,
        now.minute() as i32,
        seconds,
    )
    .map_err(|e| ClockError::InvalidTime(e.to_string()))
}

/// Simulated time. Owned by the application and passed by reference to
/// whatever needs the current instant.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    current_time: satkit::Instant,
    rate: f64,
    state: ClockState,
}

impl SimulationClock {
    /// Running clock at `start` with rate 1
    pub fn new(start: satkit::Instant) -> Self {
        Self {
            current_time: start,
            rate: 1.0,
            state: ClockState::Running,
        }
    }

    /// Running clock at the current wall-clock time
    pub fn starting_now() -> Result<Self, ClockError> {
        Ok(Self::new(wall_clock_now()?))
    }

    pub fn current_time(&self) -> satkit::Instant {
        self.current_time
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn pause(&mut self) {
        self.state = ClockState::Paused;
    }

    pub fn resume(&mut self) {
        self.state = ClockState::Running;
    }

    /// Set the rate multiplier; applies from the next advance
    pub fn set_rate(&mut self, rate: f64) -> Result<(), ClockError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ClockError::InvalidRate(rate));
        }
        self.rate = rate;
        Ok(())
    }

    /// Advance by `real_elapsed` scaled by the rate. No-op while paused.
    pub fn advance(&mut self, real_elapsed: std::time::Duration) {
        if self.state == ClockState::Paused {
            return;
        }
        let simulated = real_elapsed.as_secs_f64() * self.rate;
        if simulated > 0.0 {
            self.current_time = self.current_time + satkit::Duration::from_seconds(simulated);
        }
    }

    /// Jump back to real time. The only way time moves backwards.
    pub fn reset_to(&mut self, time: satkit::Instant) {
        self.current_time = time;
    }

    pub fn reset_to_now(&mut self) -> Result<(), ClockError> {
        self.reset_to(wall_clock_now()?);
        Ok(())
    }

    /// Format current time as string
    pub fn format_time(&self) -> String {
        let (year, month, day, hour, min, sec) = self.current_time.as_datetime();
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            year, month, day, hour, min, sec as u32
        )
    }
}

/// Armed state of the frame ticker; dropping it cancels further ticks
#[derive(Debug)]
struct TickToken {
    last_tick: std::time::Instant,
}

/// Repeating per-frame task. While armed, each `tick` yields the real time
/// elapsed since the previous one; once cancelled it yields nothing until
/// started again.
#[derive(Debug, Default)]
pub struct FrameTicker {
    token: Option<TickToken>,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the ticker. Time before `now` is never reported.
    pub fn start(&mut self, now: std::time::Instant) {
        if self.token.is_none() {
            self.token = Some(TickToken { last_tick: now });
        }
    }

    pub fn cancel(&mut self) {
        self.token = None;
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    /// Real time since the previous tick, or `None` when cancelled
    pub fn tick(&mut self, now: std::time::Instant) -> Option<std::time::Duration> {
        let token = self.token.as_mut()?;
        let elapsed = now.saturating_duration_since(token.last_tick);
        token.last_tick = now;
        Some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn start() -> satkit::Instant {
        satkit::Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
    }

    fn elapsed_seconds(clock: &SimulationClock) -> f64 {
        (clock.current_time() - start()).as_seconds()
    }

    #[test]
    fn test_rate_two_doubles_elapsed() {
        let mut clock = SimulationClock::new(start());
        clock.set_rate(2.0).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!((elapsed_seconds(&clock) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_advance_scales_by_rate() {
        for rate in [0.1, 0.5, 1.0, 3.0, 10.0] {
            let mut clock = SimulationClock::new(start());
            clock.set_rate(rate).unwrap();
            clock.advance(Duration::from_millis(1500));
            assert!((elapsed_seconds(&clock) - 1.5 * rate).abs() < 1e-6, "rate {}", rate);
        }
    }

    #[test]
    fn test_paused_and_zero_advance_hold_time() {
        let mut clock = SimulationClock::new(start());
        clock.advance(Duration::ZERO);
        assert_eq!(elapsed_seconds(&clock), 0.0);

        clock.pause();
        clock.advance(Duration::from_secs(60));
        assert_eq!(elapsed_seconds(&clock), 0.0);
        assert_eq!(clock.state(), ClockState::Paused);

        clock.resume();
        clock.advance(Duration::from_secs(60));
        assert!((elapsed_seconds(&clock) - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_rate_change_applies_to_next_advance() {
        let mut clock = SimulationClock::new(start());
        clock.advance(Duration::from_secs(1));
        clock.set_rate(5.0).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!((elapsed_seconds(&clock) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_rates_rejected() {
        let mut clock = SimulationClock::new(start());
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(clock.set_rate(rate).is_err());
        }
        assert_eq!(clock.rate(), 1.0);
    }

    #[test]
    fn test_ticker_reports_elapsed_while_armed() {
        let t0 = std::time::Instant::now();
        let mut ticker = FrameTicker::new();
        assert!(ticker.tick(t0).is_none());

        ticker.start(t0);
        assert_eq!(ticker.tick(t0 + Duration::from_millis(16)), Some(Duration::from_millis(16)));
        assert_eq!(ticker.tick(t0 + Duration::from_millis(40)), Some(Duration::from_millis(24)));

        ticker.cancel();
        assert!(!ticker.is_active());
        assert!(ticker.tick(t0 + Duration::from_secs(5)).is_none());

        // Time spent cancelled is not reported after re-arming
        ticker.start(t0 + Duration::from_secs(10));
        assert_eq!(ticker.tick(t0 + Duration::from_millis(10_016)), Some(Duration::from_millis(16)));
    }
}
