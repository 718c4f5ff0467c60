use std::fmt::{Display, Formatter};

/// Renders a float the way a default-configured C++ output stream does:
/// six significant digits, trailing zeros dropped, switching to exponent
/// notation for very large or very small magnitudes (`printf("%g")`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeneralFloat(pub f64);

impl GeneralFloat {
    const PRECISION: usize = 6;
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl Display for GeneralFloat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v = self.0;
        if v.is_nan() {
            return write!(f, "nan");
        }
        if v.is_infinite() {
            return write!(f, "{}", if v > 0.0 { "inf" } else { "-inf" });
        }
        if v == 0.0 {
            return write!(f, "0");
        }

        // Rounding to the target precision first decides the exponent, so
        // 999999.5 becomes 1e+06 rather than 1000000.
        let sci = format!("{:.*e}", Self::PRECISION - 1, v);
        let Some((mantissa, exp)) = sci.split_once('e') else {
            return write!(f, "{}", sci);
        };
        let exp: i32 = exp.parse().map_err(|_| std::fmt::Error)?;

        if exp < -4 || exp >= Self::PRECISION as i32 {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(f, "{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
        } else {
            let decimals = (Self::PRECISION as i32 - 1 - exp) as usize;
            write!(f, "{}", trim_fraction(&format!("{:.*}", decimals, v)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GeneralFloat;

    fn g(v: f64) -> String {
        GeneralFloat(v).to_string()
    }

    #[test]
    fn fixed_notation() {
        assert_eq!(g(10.0 / 3.0), "3.33333");
        assert_eq!(g(4.0), "4");
        assert_eq!(g(2.5), "2.5");
        assert_eq!(g(1.0), "1");
        assert_eq!(g(100000.0), "100000");
        assert_eq!(g(123456.7), "123457");
        assert_eq!(g(0.0001), "0.0001");
        assert_eq!(g(-7.25), "-7.25");
        assert_eq!(g(0.0), "0");
    }

    #[test]
    fn exponent_notation() {
        assert_eq!(g(1234567.0), "1.23457e+06");
        assert_eq!(g(1e6), "1e+06");
        assert_eq!(g(999999.5), "1e+06");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(2.5e-7), "2.5e-07");
        assert_eq!(g(3e120), "3e+120");
    }
}
