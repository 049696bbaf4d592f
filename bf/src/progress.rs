//! Attempt rate and progress lines for the console

use std::time::{Duration, Instant};

use crate::control::Snapshot;

/// Rolling attempts-per-second estimate, refreshed at most once per window
#[derive(Debug)]
pub struct RateMeter {
    window: Duration,
    mark_at: Instant,
    mark_count: u64,
    rate: f64,
}

impl RateMeter {
    pub fn new(window: Duration, now: Instant, count: u64) -> Self {
        Self {
            window,
            mark_at: now,
            mark_count: count,
            rate: 0.0,
        }
    }

    /// Feed the current attempt count and get the latest rate
    pub fn update(&mut self, now: Instant, count: u64) -> f64 {
        let elapsed = now.saturating_duration_since(self.mark_at);
        if elapsed >= self.window {
            let delta = count.saturating_sub(self.mark_count);
            self.rate = delta as f64 / elapsed.as_secs_f64();
            self.mark_at = now;
            self.mark_count = count;
        }
        self.rate
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Estimated time left at the given rate; None when unknown or too large
pub fn eta(remaining: u64, rate: f64) -> Option<Duration> {
    if rate > 0.0 {
        Duration::try_from_secs_f64(remaining as f64 / rate).ok()
    } else {
        None
    }
}

/// `1h 02m 03s` style
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// One-line status used for periodic progress output
pub fn progress_line(snapshot: &Snapshot, rate: f64, space: u64) -> String {
    let remaining = if snapshot.exhausted {
        0
    } else {
        space.saturating_sub((snapshot.progress_percent / 100.0 * space as f64).round() as u64)
    };
    let eta = eta(remaining, rate)
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} attempts, current {} ({:.2}%), {:.1}/s, eta {}",
        snapshot.attempt_count, snapshot.combination, snapshot.progress_percent, rate, eta
    )
}

/// True when `count` crossed a multiple of `every` since `previous`
pub fn crossed_interval(previous: u64, count: u64, every: u64) -> bool {
    every > 0 && count / every > previous / every
}
