use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// All positions, lengths and speeds inside the simulation use this type so
/// that two runs fed the same inputs produce bit-identical state.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only at the config/driver boundary.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Floor a fixed-point value to an `i32` cell index.
///
/// Saturates at the `i32` bounds; callers bounds-check the result against
/// the grid anyway.
#[inline]
pub fn floor_to_i32(v: Fixed64) -> i32 {
    v.floor().saturating_to_num::<i32>()
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
    fn speed_times_elapsed_is_exact() {
        let speed = f64_to_fixed64(64.0);
        let dt = f64_to_fixed64(0.5);
        assert_eq!(speed * dt, Fixed64::from_num(32));
    }

    #[test]
    fn floor_rounds_toward_negative_infinity() {
        assert_eq!(floor_to_i32(f64_to_fixed64(6.99)), 6);
        assert_eq!(floor_to_i32(f64_to_fixed64(-0.25)), -1);
        assert_eq!(floor_to_i32(Fixed64::ZERO), 0);
    }

    #[test]
    fn out_of_range_f64_saturates() {
        assert_eq!(f64_to_fixed64(1e300), Fixed64::MAX);
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a * Fixed64::from_num(3), b * Fixed64::from_num(3));
    }
}
