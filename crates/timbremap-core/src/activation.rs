//! Invertible elementwise activations for dense stages.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output range of the scaled sigmoid (MIDI controller range).
pub const SIGMOID_SCALE: f64 = 127.0;

/// Keeps the sigmoid inverse's logarithm finite as `y -> 127`.
pub const SIGMOID_INV_EPSILON: f64 = 1e-10;

/// Activation applied after a dense stage's affine map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    /// `127 / (1 + e^-x)`
    Sigmoid,
    Tanh,
    /// Recognized tag with pass-through forward and inverse. Not a real
    /// leaky ReLU; the host runtime treats it identically.
    LeakyRelu,
}

impl Activation {
    /// Tag as written to an `activation` file.
    pub fn tag(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::LeakyRelu => "leakyrelu",
        }
    }

    /// Parse a tag, falling back to [`Activation::Linear`] for anything
    /// unrecognized.
    pub fn from_tag_or_linear(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            tracing::warn!("Unrecognized activation tag {:?}, using linear", tag.trim());
            Activation::Linear
        })
    }

    /// Whether an `activation` file must be written for this tag.
    pub fn needs_tag_file(&self) -> bool {
        *self != Activation::Linear
    }

    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Linear | Activation::LeakyRelu => x,
            Activation::Sigmoid => SIGMOID_SCALE / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }

    #[inline]
    pub fn invert(&self, y: f64) -> f64 {
        match self {
            Activation::Linear | Activation::LeakyRelu => y,
            Activation::Sigmoid => {
                let p = y / SIGMOID_SCALE;
                (p / (1.0 - p + SIGMOID_INV_EPSILON)).ln()
            }
            Activation::Tanh => y.atanh(),
        }
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "linear" => Ok(Activation::Linear),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "leakyrelu" => Ok(Activation::LeakyRelu),
            other => Err(Error::InvalidStage(format!(
                "unknown activation tag: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_tag_parsing() {
        assert_eq!("sigmoid".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert_eq!("tanh\n".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!(
            "leakyrelu".parse::<Activation>().unwrap(),
            Activation::LeakyRelu
        );
        assert!("relu".parse::<Activation>().is_err());
        assert_eq!(Activation::from_tag_or_linear("softmax"), Activation::Linear);
        assert_eq!(Activation::from_tag_or_linear(""), Activation::Linear);
    }

    #[test]
    fn test_tag_display_round_trip() {
        for act in [
            Activation::Linear,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::LeakyRelu,
        ] {
            assert_eq!(act.to_string().parse::<Activation>().unwrap(), act);
        }
    }

    #[test]
    fn test_sigmoid_range() {
        let act = Activation::Sigmoid;
        assert_abs_diff_eq!(act.apply(0.0), 63.5);
        assert!(act.apply(50.0) <= SIGMOID_SCALE);
        assert!(act.apply(-50.0) >= 0.0);
    }

    #[test]
    fn test_inverse_pairs() {
        for &x in &[-2.0, -0.3, 0.0, 0.4, 1.7] {
            for act in [
                Activation::Linear,
                Activation::Sigmoid,
                Activation::Tanh,
                Activation::LeakyRelu,
            ] {
                assert_abs_diff_eq!(act.invert(act.apply(x)), x, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_leakyrelu_is_pass_through() {
        assert_eq!(Activation::LeakyRelu.apply(-3.0), -3.0);
        assert_eq!(Activation::LeakyRelu.invert(-3.0), -3.0);
    }

    #[test]
    fn test_sigmoid_inverse_saturation_is_finite() {
        let x = Activation::Sigmoid.invert(SIGMOID_SCALE);
        assert!(x.is_finite());
    }
}
