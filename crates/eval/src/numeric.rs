//! Float helpers with Python semantics: symmetric rounding with
//! representation-error correction, floor division and modulo signs, and
//! zero padding.

/// Round `value` to a multiple of `precision`, half away from zero.
///
/// The value is nudged away from zero by an epsilon proportional to its
/// magnitude before rounding so that binary representation error does not
/// push exact halves down (`2.675` at 0.01 rounds to `2.68`). A missing or
/// negative precision rounds to integers.
pub fn round_precision(value: f64, precision: f64) -> f64 {
    if value == 0.0 || value.is_nan() {
        return 0.0;
    }
    let precision = if precision > 0.0 { precision } else { 1.0 };
    let mut normalized = value / precision;
    let epsilon = 2f64.powf(normalized.abs().log2() - 53.0);
    normalized += if normalized >= 0.0 { epsilon } else { -epsilon };
    let sign = if normalized < 0.0 { -1.0 } else { 1.0 };
    sign * normalized.abs().round() * precision
}

/// Round to `decimals` digits after the point (negative counts round to tens,
/// hundreds, ...).
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    round_precision(value, 10f64.powf(-f64::from(decimals)))
}

/// Whether `value` rounds to zero at `decimals` digits.
pub fn float_is_zero(value: f64, decimals: i32) -> bool {
    let epsilon = 10f64.powf(-f64::from(decimals));
    round_precision(value, epsilon).abs() < epsilon
}

/// Python `divmod` for floats: the remainder takes the sign of the divisor
/// and the quotient is floored. `y` must be non-zero.
pub fn divmod(x: f64, y: f64) -> (f64, f64) {
    let mut rem = x % y;
    let mut div = (x - rem) / y;
    if rem != 0.0 {
        if (y < 0.0) != (rem < 0.0) {
            rem += y;
            div -= 1.0;
        }
    } else {
        rem = 0.0f64.copysign(y);
    }
    let floor = if div != 0.0 {
        let f = div.floor();
        if div - f > 0.5 {
            f + 1.0
        } else {
            f
        }
    } else {
        0.0f64.copysign(x / y)
    };
    (floor, rem)
}

/// Split `x` into its non-negative fractional part and its floor.
pub fn modf(x: f64) -> (f64, f64) {
    let mut fractional = x % 1.0;
    if fractional < 0.0 {
        fractional += 1.0;
    }
    (fractional, x.floor())
}

/// Left-pad with zeros up to `size` characters.
pub fn lpad(value: &str, size: usize) -> String {
    format!("{value:0>size$}")
}

/// Right-pad with zeros up to `size` characters.
pub fn rpad(value: &str, size: usize) -> String {
    format!("{value:0<size$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_symmetric() {
        assert_eq!(round_decimals(-0.5, 0), -1.0);
        assert_eq!(round_decimals(0.5, 0), 1.0);
        assert_eq!(round_decimals(1.5, 0), 2.0);
        assert_eq!(round_decimals(-2.5, 0), -3.0);
    }

    #[test]
    fn rounding_corrects_representation_error() {
        assert_eq!(round_decimals(2.675, 2), 2.68);
        assert_eq!(round_decimals(1.005, 2), 1.01);
        assert_eq!(round_precision(0.0, 0.01), 0.0);
        assert_eq!(round_decimals(1234.0, -2), 1200.0);
    }

    #[test]
    fn zero_check() {
        assert!(float_is_zero(0.0001, 2));
        assert!(!float_is_zero(0.01, 2));
    }

    #[test]
    fn python_divmod_signs() {
        assert_eq!(divmod(7.0, 3.0), (2.0, 1.0));
        assert_eq!(divmod(-7.0, 3.0), (-3.0, 2.0));
        assert_eq!(divmod(7.0, -3.0), (-3.0, -2.0));
        assert_eq!(divmod(5.5, 2.0), (2.0, 1.5));
    }

    #[test]
    fn modf_floors() {
        assert_eq!(modf(2.25), (0.25, 2.0));
        assert_eq!(modf(-2.25), (0.75, -3.0));
    }

    #[test]
    fn padding() {
        assert_eq!(lpad("7", 3), "007");
        assert_eq!(rpad("7", 3), "700");
        assert_eq!(lpad("1234", 2), "1234");
    }
}
