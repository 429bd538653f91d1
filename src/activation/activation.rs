use serde::{Serialize, Deserialize};
use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

/// Slope used by `LeakyReLU` for negative inputs.
pub const LEAKY_RELU_ALPHA: f64 = 0.01;

/// The fixed registry of point-wise activations.
///
/// Each variant pairs a function with its derivative, and the derivative is
/// expressed in terms of the activation's *output* `a = f(z)` rather than its
/// input. That is what backpropagation has on hand: the forward trace stores
/// post-activation values only.
///
/// Variants serialize by their snake_case name, so a saved layer records
/// `"sigmoid"` rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    Tanh,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
    Identity,
}

impl ActivationFunction {
    pub const ALL: [ActivationFunction; 5] = [
        ActivationFunction::Sigmoid,
        ActivationFunction::Tanh,
        ActivationFunction::ReLU,
        ActivationFunction::LeakyReLU,
        ActivationFunction::Identity,
    ];

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU => if x > 0.0 { x } else { LEAKY_RELU_ALPHA * x },
            ActivationFunction::Identity => x,
        }
    }

    /// Derivative of the activation, evaluated from its output `a`.
    pub fn derivative(&self, a: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => a * (1.0 - a),
            ActivationFunction::Tanh => 1.0 - a * a,
            ActivationFunction::ReLU => if a > 0.0 { 1.0 } else { 0.0 },
            // Positive slope keeps the sign of z, so a > 0 iff z > 0.
            ActivationFunction::LeakyReLU => if a > 0.0 { 1.0 } else { LEAKY_RELU_ALPHA },
            ActivationFunction::Identity => 1.0,
        }
    }

    /// Registry name, as written by persistence.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::ReLU => "relu",
            ActivationFunction::LeakyReLU => "leaky_relu",
            ActivationFunction::Identity => "identity",
        }
    }

    pub fn from_name(name: &str) -> Option<ActivationFunction> {
        ActivationFunction::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivationFunction::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = ActivationFunction::ALL.iter().map(|a| a.name()).collect();
            format!("unknown activation '{}', expected one of: {}", s, known.join(", "))
        })
    }
}
