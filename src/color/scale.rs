//! Monotonic value transforms applied before color interpolation.

use std::fmt;
use std::str::FromStr;

use crate::error::{HeatgridError, Result};

/// Transform applied to values before they are placed on the color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleType {
    /// Identity.
    #[default]
    Linear,
    /// `sign(v) * log10(1 + |v|)`, zero maps to zero.
    Log,
    /// Square root.
    Sqrt,
    /// `v^2`. Sign is lost even through the signed wrapper.
    Squared,
    /// Inverse hyperbolic sine.
    Asinh,
    /// Hyperbolic sine.
    Sinh,
    /// Softplus, `ln(e^v + 1)`.
    LogExp,
}

impl ScaleType {
    /// Every scale, in cycling order.
    pub const ALL: [ScaleType; 7] = [
        Self::Linear,
        Self::Log,
        Self::Sqrt,
        Self::Squared,
        Self::Asinh,
        Self::Sinh,
        Self::LogExp,
    ];

    /// Get the next scale in cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Linear => Self::Log,
            Self::Log => Self::Sqrt,
            Self::Sqrt => Self::Squared,
            Self::Squared => Self::Asinh,
            Self::Asinh => Self::Sinh,
            Self::Sinh => Self::LogExp,
            Self::LogExp => Self::Linear,
        }
    }

    /// Get scale name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Squared => "squared",
            Self::Asinh => "asinh",
            Self::Sinh => "sinh",
            Self::LogExp => "logexp",
        }
    }

    /// Apply the raw transform.
    pub fn apply(self, v: f64) -> f64 {
        match self {
            Self::Linear => v,
            Self::Log => {
                if v == 0.0 {
                    0.0
                } else {
                    v.signum() * v.abs().ln_1p() / std::f64::consts::LN_10
                }
            },
            Self::Sqrt => v.sqrt(),
            Self::Squared => v * v,
            Self::Asinh => v.asinh(),
            Self::Sinh => v.sinh(),
            Self::LogExp => v.exp().ln_1p(),
        }
    }

    /// Apply the transform so that negative inputs mirror positive ones.
    ///
    /// Every scale is odd under this wrapper, including
    /// [`ScaleType::Squared`] whose raw form loses the sign.
    pub fn apply_signed(self, v: f64) -> f64 {
        if v < 0.0 {
            -self.apply(-v)
        } else if v > 0.0 {
            self.apply(v)
        } else {
            0.0
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleType {
    type Err = HeatgridError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|scale| scale.name() == wanted)
            .ok_or_else(|| HeatgridError::invalid_config("scale", format!("unknown scale '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_zero_safe() {
        assert_eq!(ScaleType::Log.apply(0.0), 0.0);
        assert!((ScaleType::Log.apply(9.0) - 1.0).abs() < 1e-12);
        assert!((ScaleType::Log.apply(-99.0) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_squared_keeps_sign_only_when_signed() {
        assert_eq!(ScaleType::Squared.apply(-3.0), 9.0);
        assert_eq!(ScaleType::Squared.apply_signed(-3.0), -9.0);
        assert_eq!(ScaleType::Squared.apply_signed(3.0), 9.0);
    }

    #[test]
    fn test_sqrt_of_negative_goes_through_mirror() {
        assert_eq!(ScaleType::Sqrt.apply_signed(-4.0), -2.0);
        assert!(ScaleType::Sqrt.apply(-4.0).is_nan());
    }

    #[test]
    fn test_logexp_is_softplus() {
        assert!((ScaleType::LogExp.apply(0.0) - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_parse_and_reject() {
        assert_eq!("asinh".parse::<ScaleType>().unwrap(), ScaleType::Asinh);
        assert!("histequal".parse::<ScaleType>().is_err());
    }
}
