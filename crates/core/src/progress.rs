//! Progress reporting rules.
//!
//! Callers must never observe progress moving backwards, and synthesized
//! progress must never claim completion before a true `Completed` status
//! is seen. These pure helpers enforce both.

/// Progress reported once a task has truly completed.
pub const PROGRESS_DONE: u8 = 100;

/// Lowest synthesized progress value, reported on the first poll attempt.
pub const SYNTHETIC_FLOOR: u8 = 5;

/// Highest progress a synthesized estimate may ever reach. Everything
/// above is reserved for provider-reported values and real completion.
pub const SYNTHETIC_CEILING: u8 = 90;

/// Combine the previously reported progress with a newly observed value.
///
/// The result is clamped to 0-100 and never less than `previous`.
pub fn advance(previous: u8, observed: u8) -> u8 {
    observed.min(PROGRESS_DONE).max(previous)
}

/// Estimate progress from poll-attempt position when the provider gives
/// no explicit number.
///
/// Ramps linearly from [`SYNTHETIC_FLOOR`] to [`SYNTHETIC_CEILING`] as
/// `attempt` approaches `max_attempts`, so the caller always observes
/// forward motion against the timeout ceiling.
pub fn synthesize(attempt: u32, max_attempts: u32) -> u8 {
    if max_attempts == 0 {
        return SYNTHETIC_FLOOR;
    }
    let fraction = (attempt as f64 / max_attempts as f64).clamp(0.0, 1.0);
    let span = (SYNTHETIC_CEILING - SYNTHETIC_FLOOR) as f64;
    SYNTHETIC_FLOOR + (span * fraction) as u8
}
