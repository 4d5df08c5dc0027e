use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Simulation time in seconds, kept in fixed point so every decision is
/// bit-reproducible across replicas.
pub type Seconds = Fixed64;

/// Number of simulation steps executed since start.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Shorthand for building a [`Seconds`] value from a float literal.
#[inline]
pub fn secs(v: f64) -> Seconds {
    f64_to_fixed64(v)
}

/// Checked division for Fixed64 that returns None on zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

/// `elapsed / total`, clamped to `[0, 1]`. A zero total counts as done.
pub fn progress_ratio(elapsed: Seconds, total: Seconds) -> Fixed64 {
    if total <= Fixed64::ZERO {
        return Fixed64::ONE;
    }
    checked_div_64(elapsed, total)
        .unwrap_or(Fixed64::ONE)
        .clamp(Fixed64::ZERO, Fixed64::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn fixed64_checked_div_by_zero() {
        assert!(checked_div_64(secs(1.0), secs(0.0)).is_none());
    }

    #[test]
    fn quarter_seconds_sum_exactly() {
        let mut t = Seconds::ZERO;
        for _ in 0..12 {
            t += secs(0.25);
        }
        assert_eq!(t, secs(3.0));
    }

    #[test]
    fn progress_ratio_is_clamped() {
        assert_eq!(progress_ratio(secs(1.5), secs(3.0)), secs(0.5));
        assert_eq!(progress_ratio(secs(4.0), secs(3.0)), Fixed64::ONE);
        assert_eq!(progress_ratio(secs(-1.0), secs(3.0)), Fixed64::ZERO);
    }

    #[test]
    fn progress_ratio_zero_total_is_done() {
        assert_eq!(progress_ratio(secs(0.0), secs(0.0)), Fixed64::ONE);
    }
}
