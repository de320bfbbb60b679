use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::floating_point_eq;

/// The analytic pulse shapes understood by parametric pulses.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PulseShape {
    Gaussian,
    GaussianSquare,
    Drag,
    Constant,
}

/// A named pulse given by its complex samples, one per time step.
#[derive(Clone, Debug)]
pub struct Waveform {
    pub name: String,
    pub samples: Vec<Complex64>,
}

impl Waveform {
    pub fn new(name: String, samples: Vec<Complex64>) -> Self {
        Self { name, samples }
    }
}

impl PartialEq for Waveform {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && floating_point_eq::complex64::slice_eq(&self.samples, &other.samples)
    }
}

impl Eq for Waveform {}

/// A pulse described by a shape and its (possibly symbolic) parameters.
///
/// The pulse length is carried by the `duration` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParametricPulse {
    pub shape: PulseShape,
    pub parameters: IndexMap<String, Expression>,
}

impl ParametricPulse {
    pub const DURATION: &'static str = "duration";

    pub fn new(shape: PulseShape, parameters: IndexMap<String, Expression>) -> Self {
        Self { shape, parameters }
    }

    pub fn duration(&self) -> Option<&Expression> {
        self.parameters.get(Self::DURATION)
    }
}

impl fmt::Display for ParametricPulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.shape,
            self.parameters
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .join(", ")
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pulse {
    Waveform(Waveform),
    Parametric(ParametricPulse),
}

impl Pulse {
    /// The number of samples the pulse spans.
    pub fn duration(&self) -> Expression {
        match self {
            Pulse::Waveform(waveform) => Expression::from(waveform.samples.len() as f64),
            Pulse::Parametric(pulse) => pulse
                .duration()
                .cloned()
                .unwrap_or_else(|| Expression::from(0.0)),
        }
    }
}

impl fmt::Display for Pulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pulse::Waveform(waveform) => write!(f, "{}", waveform.name),
            Pulse::Parametric(pulse) => write!(f, "{pulse}"),
        }
    }
}

impl From<Waveform> for Pulse {
    fn from(waveform: Waveform) -> Self {
        Pulse::Waveform(waveform)
    }
}

impl From<ParametricPulse> for Pulse {
    fn from(pulse: ParametricPulse) -> Self {
        Pulse::Parametric(pulse)
    }
}
