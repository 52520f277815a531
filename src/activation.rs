//! Node activation functions.
//!
//! Hidden nodes draw their activation from the mutator's palette when they are
//! created by a split; output nodes default to the steepened NEAT sigmoid.

use serde::{Deserialize, Serialize};

/// Slope of the NEAT sigmoid, as used by the original NEAT experiments.
const SIGMOID_SLOPE: f32 = 4.9;

/// Activation applied to a node's weighted input sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// f(x) = x
    #[default]
    Identity,
    /// Steepened sigmoid: f(x) = 1 / (1 + e^(-4.9x))
    Sigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// f(x) = max(0, x)
    ReLU,
    /// f(x) = e^(-x^2)
    Gaussian,
    /// f(x) = 1 if x > 0 else 0
    Step,
}

impl Activation {
    /// Every supported activation.
    pub const ALL: [Self; 6] = [
        Self::Identity,
        Self::Sigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Gaussian,
        Self::Step,
    ];

    /// Apply the activation to `x`.
    ///
    /// NaN propagates unchanged. Infinite inputs map to the function's limit
    /// wherever that limit is finite.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }

        match self {
            Self::Identity => x,
            Self::Sigmoid => {
                // exp overflows f32 past ~88
                let z = (SIGMOID_SLOPE * x).clamp(-88.0, 88.0);
                1.0 / (1.0 + (-z).exp())
            }
            Self::Tanh => x.tanh(),
            Self::ReLU => x.max(0.0),
            Self::Gaussian => {
                if x.abs() > 26.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Range of values this activation can produce.
    #[must_use]
    pub const fn output_range(self) -> (f32, f32) {
        match self {
            Self::Identity => (f32::NEG_INFINITY, f32::INFINITY),
            Self::Sigmoid | Self::Gaussian | Self::Step => (0.0, 1.0),
            Self::Tanh => (-1.0, 1.0),
            Self::ReLU => (0.0, f32::INFINITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_centered_and_steep() {
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
        // Steepened: already saturated at |x| = 2
        assert!(Activation::Sigmoid.apply(2.0) > 0.99);
        assert!(Activation::Sigmoid.apply(-2.0) < 0.01);
    }

    #[test]
    fn test_infinite_inputs_stay_finite() {
        assert!((Activation::Sigmoid.apply(f32::INFINITY) - 1.0).abs() < 1e-6);
        assert!(Activation::Sigmoid.apply(f32::NEG_INFINITY).abs() < 1e-6);
        assert!((Activation::Tanh.apply(f32::NEG_INFINITY) + 1.0).abs() < 1e-6);
        assert!(Activation::Gaussian.apply(f32::INFINITY).abs() < 1e-6);
        assert!(Activation::ReLU.apply(f32::NEG_INFINITY).abs() < 1e-6);
        assert!((Activation::Step.apply(f32::INFINITY) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        for activation in Activation::ALL {
            assert!(activation.apply(f32::NAN).is_nan(), "{activation:?}");
        }
    }

    #[test]
    fn test_outputs_fall_inside_declared_range() {
        for activation in Activation::ALL {
            let (lo, hi) = activation.output_range();
            for x in [-3.0_f32, -0.5, 0.0, 0.25, 4.0] {
                let y = activation.apply(x);
                assert!(y >= lo && y <= hi, "{activation:?}({x}) = {y}");
            }
        }
    }

    #[test]
    fn test_relu_and_step() {
        assert!((Activation::ReLU.apply(0.7) - 0.7).abs() < 1e-6);
        assert!(Activation::ReLU.apply(-0.7).abs() < 1e-6);
        assert!((Activation::Step.apply(0.1) - 1.0).abs() < 1e-6);
        assert!(Activation::Step.apply(0.0).abs() < 1e-6);
    }
}
