// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serialized instruction records, and their conversion into native [`Instruction`]s.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::expression::{Expression, ParseError};
use crate::instruction::{
    Acquire, Channel, Delay, Instruction, ParametricPulse, ParseChannelError, Play, Pulse,
    PulseShape, SetFrequency, SetPhase, ShiftFrequency, ShiftPhase, Waveform,
};

/// Frequencies travel in GHz and are stored in Hz.
const GIGAHERTZ: f64 = 1e9;

/// A scalar field of a serialized instruction: either a literal or a parameter expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Number(f64),
    Expression(String),
}

impl WireValue {
    pub fn to_expression(&self) -> Result<Expression, ParseError> {
        match self {
            WireValue::Number(value) => Ok(Expression::from(*value)),
            WireValue::Expression(text) => Expression::from_str(text),
        }
    }
}

impl From<f64> for WireValue {
    fn from(value: f64) -> Self {
        WireValue::Number(value)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::Expression(value.to_string())
    }
}

/// A parametric pulse parameter: a real number, a `[re, im]` pair, or a parameter expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireParameter {
    Number(f64),
    Complex([f64; 2]),
    Expression(String),
}

impl WireParameter {
    pub fn to_expression(&self) -> Result<Expression, ParseError> {
        match self {
            WireParameter::Number(value) => Ok(Expression::from(*value)),
            WireParameter::Complex([re, im]) => Ok(Expression::from(Complex64::new(*re, *im))),
            WireParameter::Expression(text) => Expression::from_str(text),
        }
    }
}

/// One instruction record as it appears on the wire.
///
/// Which optional fields are required depends on `name`; see [`PulseLibraryConverter`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedInstruction {
    pub name: String,
    /// Start time, in samples.
    #[serde(default)]
    pub t0: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<WireValue>,
    /// In GHz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qubits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memory_slot: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_shape: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, WireParameter>,
}

impl SerializedInstruction {
    pub fn new(name: impl Into<String>, t0: u64) -> Self {
        Self {
            name: name.into(),
            t0,
            ..Self::default()
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.ch = Some(channel.to_string());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<WireValue>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<WireValue>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<WireValue>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: WireParameter) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    fn channel(&self) -> ConversionResult<Channel> {
        let text = self.ch.as_deref().ok_or_else(|| self.missing("ch"))?;
        Ok(Channel::from_str(text)?)
    }

    fn expression(
        &self,
        field: &'static str,
        value: &Option<WireValue>,
    ) -> ConversionResult<Expression> {
        let value = value.as_ref().ok_or_else(|| self.missing(field))?;
        Ok(value.to_expression()?)
    }

    fn missing(&self, field: &'static str) -> ConversionError {
        ConversionError::MissingField {
            instruction: self.name.clone(),
            field,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("unknown instruction {0:?}")]
    UnknownInstruction(String),

    #[error("instruction {instruction:?} is missing field {field:?}")]
    MissingField {
        instruction: String,
        field: &'static str,
    },

    #[error(transparent)]
    Channel(#[from] ParseChannelError),

    #[error("unknown pulse shape {0:?}")]
    UnknownPulseShape(String),

    #[error("invalid parameter expression: {0}")]
    Expression(#[from] ParseError),

    #[error("acquire of {qubits} qubits given {memory_slots} memory slots")]
    MemorySlotMismatch { qubits: usize, memory_slots: usize },
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Turns one serialized instruction into zero or more native instructions.
pub trait InstructionConverter: fmt::Debug + Send + Sync {
    fn convert(&self, instruction: &SerializedInstruction) -> ConversionResult<Vec<Instruction>>;
}

/// A named sampled pulse, as carried alongside serialized instructions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseLibraryItem {
    pub name: String,
    /// `[re, im]` per sample.
    pub samples: Vec<[f64; 2]>,
}

/// The default converter: frame changes, delays, parametric pulses and acquisitions are built in,
/// and any other name is looked up in a library of sampled pulses.
#[derive(Clone, Debug, Default)]
pub struct PulseLibraryConverter {
    pulse_library: IndexMap<String, Vec<Complex64>>,
}

impl PulseLibraryConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pulse_library(items: impl IntoIterator<Item = PulseLibraryItem>) -> Self {
        let pulse_library = items
            .into_iter()
            .map(|item| {
                let samples = item
                    .samples
                    .into_iter()
                    .map(|[re, im]| Complex64::new(re, im))
                    .collect();
                (item.name, samples)
            })
            .collect();
        Self { pulse_library }
    }

    pub fn pulse_library(&self) -> &IndexMap<String, Vec<Complex64>> {
        &self.pulse_library
    }

    fn convert_acquire(
        &self,
        instruction: &SerializedInstruction,
    ) -> ConversionResult<Vec<Instruction>> {
        let duration = instruction.expression("duration", &instruction.duration)?;
        let qubits = &instruction.qubits;
        let memory_slots = &instruction.memory_slot;
        if !memory_slots.is_empty() && memory_slots.len() != qubits.len() {
            return Err(ConversionError::MemorySlotMismatch {
                qubits: qubits.len(),
                memory_slots: memory_slots.len(),
            });
        }
        Ok(qubits
            .iter()
            .enumerate()
            .map(|(index, qubit)| {
                Instruction::Acquire(Acquire::new(
                    duration.clone(),
                    *qubit,
                    memory_slots.get(index).copied(),
                ))
            })
            .collect())
    }

    fn convert_parametric_pulse(
        &self,
        instruction: &SerializedInstruction,
    ) -> ConversionResult<Instruction> {
        let shape_name = instruction
            .pulse_shape
            .as_deref()
            .ok_or_else(|| instruction.missing("pulse_shape"))?;
        let shape = PulseShape::from_str(shape_name)
            .map_err(|_| ConversionError::UnknownPulseShape(shape_name.to_string()))?;
        let parameters = instruction
            .parameters
            .iter()
            .map(|(name, value)| {
                value
                    .to_expression()
                    .map(|expression| (name.clone(), expression))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        Ok(Instruction::Play(Play::new(
            Pulse::Parametric(ParametricPulse::new(shape, parameters)),
            instruction.channel()?,
        )))
    }
}

fn to_hertz(frequency: Expression) -> Expression {
    (frequency * Expression::from(GIGAHERTZ)).into_simplified()
}

impl InstructionConverter for PulseLibraryConverter {
    fn convert(&self, instruction: &SerializedInstruction) -> ConversionResult<Vec<Instruction>> {
        let converted = match instruction.name.as_str() {
            "fc" => vec![Instruction::ShiftPhase(ShiftPhase::new(
                instruction.expression("phase", &instruction.phase)?,
                instruction.channel()?,
            ))],
            "setp" => vec![Instruction::SetPhase(SetPhase::new(
                instruction.expression("phase", &instruction.phase)?,
                instruction.channel()?,
            ))],
            "shiftf" => vec![Instruction::ShiftFrequency(ShiftFrequency::new(
                to_hertz(instruction.expression("frequency", &instruction.frequency)?),
                instruction.channel()?,
            ))],
            "setf" => vec![Instruction::SetFrequency(SetFrequency::new(
                to_hertz(instruction.expression("frequency", &instruction.frequency)?),
                instruction.channel()?,
            ))],
            "delay" => vec![Instruction::Delay(Delay::new(
                instruction.expression("duration", &instruction.duration)?,
                instruction.channel()?,
            ))],
            "parametric_pulse" => vec![self.convert_parametric_pulse(instruction)?],
            "acquire" => self.convert_acquire(instruction)?,
            "snapshot" => vec![],
            name => match self.pulse_library.get(name) {
                Some(samples) => vec![Instruction::Play(Play::new(
                    Pulse::Waveform(Waveform::new(name.to_string(), samples.clone())),
                    instruction.channel()?,
                ))],
                None => return Err(ConversionError::UnknownInstruction(name.to_string())),
            },
        };

        tracing::debug!(
            name = %instruction.name,
            t0 = instruction.t0,
            converted = converted.len(),
            "converted serialized instruction"
        );

        Ok(converted)
    }
}
