//! Pure seek-position math used by the command dispatcher.

/// Target for jumping to division `n` (1-based) of `divisions` equal parts of
/// a track: `floor((n - 1) * duration / divisions)`.
pub fn fraction_target_ms(n: u32, divisions: u32, duration_ms: u64) -> u64 {
    let divisions = divisions.max(1);
    let n = n.clamp(1, divisions);
    (u128::from(n - 1) * u128::from(duration_ms) / u128::from(divisions)) as u64
}

/// Forward delta. Never lands on or past the end of the track: the target is
/// `min(progress + delta, duration) - 1`, which also sidesteps boundary
/// rounding at the remote.
pub fn forward_target_ms(progress_ms: u64, delta_ms: u64, duration_ms: u64) -> u64 {
    progress_ms
        .saturating_add(delta_ms)
        .min(duration_ms)
        .saturating_sub(1)
}

/// Backward delta, clamped into `[0, duration - 1]`.
pub fn backward_target_ms(progress_ms: u64, delta_ms: u64, duration_ms: u64) -> u64 {
    progress_ms
        .saturating_sub(delta_ms)
        .min(duration_ms.saturating_sub(1))
}
