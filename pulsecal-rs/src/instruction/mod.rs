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

//! Native pulse-level instructions, the contents of a [`Schedule`](crate::schedule::Schedule).

use std::fmt;

use indexmap::IndexSet;

use crate::expression::Expression;

mod channel;
mod frame;
mod timing;
mod waveform;

pub use self::channel::{Channel, ParseChannelError};
pub use self::frame::{Play, SetFrequency, SetPhase, ShiftFrequency, ShiftPhase};
pub use self::timing::{Acquire, Delay};
pub use self::waveform::{ParametricPulse, Pulse, PulseShape, Waveform};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Acquire(Acquire),
    Delay(Delay),
    Play(Play),
    SetFrequency(SetFrequency),
    SetPhase(SetPhase),
    ShiftFrequency(ShiftFrequency),
    ShiftPhase(ShiftPhase),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Acquire(acquire) => write!(f, "{acquire}"),
            Instruction::Delay(delay) => write!(f, "{delay}"),
            Instruction::Play(play) => write!(f, "{play}"),
            Instruction::SetFrequency(set_frequency) => write!(f, "{set_frequency}"),
            Instruction::SetPhase(set_phase) => write!(f, "{set_phase}"),
            Instruction::ShiftFrequency(shift_frequency) => write!(f, "{shift_frequency}"),
            Instruction::ShiftPhase(shift_phase) => write!(f, "{shift_phase}"),
        }
    }
}

impl Instruction {
    /// How long the instruction occupies its channel. Frame changes are instantaneous.
    pub fn duration(&self) -> Expression {
        match self {
            Instruction::Acquire(Acquire { duration, .. })
            | Instruction::Delay(Delay { duration, .. }) => duration.clone(),
            Instruction::Play(Play { pulse, .. }) => pulse.duration(),
            Instruction::SetFrequency(_)
            | Instruction::SetPhase(_)
            | Instruction::ShiftFrequency(_)
            | Instruction::ShiftPhase(_) => Expression::from(0.0),
        }
    }

    /// Apply the provided closure to every expression in the instruction.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pulsecal_rs::expression::Expression;
    /// use pulsecal_rs::instruction::{Channel, Instruction, ShiftPhase};
    ///
    /// let mut instruction = Instruction::ShiftPhase(ShiftPhase::new(
    ///     Expression::variable("theta"),
    ///     Channel::Drive(0),
    /// ));
    /// instruction.apply_to_expressions(|expression| *expression = Expression::from(1.0));
    ///
    /// assert_eq!(instruction.to_string(), "shift_phase(1) d0");
    /// ```
    pub fn apply_to_expressions(&mut self, mut closure: impl FnMut(&mut Expression)) {
        match self {
            Instruction::Acquire(Acquire { duration, .. })
            | Instruction::Delay(Delay { duration, .. }) => closure(duration),
            Instruction::Play(Play { pulse, .. }) => match pulse {
                Pulse::Parametric(ParametricPulse { parameters, .. }) => {
                    parameters.values_mut().for_each(closure)
                }
                Pulse::Waveform(_) => {}
            },
            Instruction::SetFrequency(SetFrequency {
                frequency: expression,
                ..
            })
            | Instruction::SetPhase(SetPhase {
                phase: expression, ..
            })
            | Instruction::ShiftFrequency(ShiftFrequency {
                frequency: expression,
                ..
            })
            | Instruction::ShiftPhase(ShiftPhase {
                phase: expression, ..
            }) => closure(expression),
        }
    }

    /// Return references to every expression in the instruction, in declaration order.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Instruction::Acquire(Acquire { duration, .. })
            | Instruction::Delay(Delay { duration, .. }) => vec![duration],
            Instruction::Play(Play { pulse, .. }) => match pulse {
                Pulse::Parametric(ParametricPulse { parameters, .. }) => {
                    parameters.values().collect()
                }
                Pulse::Waveform(_) => vec![],
            },
            Instruction::SetFrequency(SetFrequency {
                frequency: expression,
                ..
            })
            | Instruction::SetPhase(SetPhase {
                phase: expression, ..
            })
            | Instruction::ShiftFrequency(ShiftFrequency {
                frequency: expression,
                ..
            })
            | Instruction::ShiftPhase(ShiftPhase {
                phase: expression, ..
            }) => vec![expression],
        }
    }

    /// The names of the unbound parameters referenced by this instruction, in order of first
    /// appearance.
    pub fn parameters(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.extend_parameters(&mut names);
        names
    }

    pub(crate) fn extend_parameters(&self, names: &mut IndexSet<String>) {
        for expression in self.expressions() {
            expression.extend_variables(names);
        }
    }

    /// The channel the instruction occupies, if any. Acquisitions address a qubit instead.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Instruction::Acquire(_) => None,
            Instruction::Delay(Delay { channel, .. })
            | Instruction::Play(Play { channel, .. })
            | Instruction::SetFrequency(SetFrequency { channel, .. })
            | Instruction::SetPhase(SetPhase { channel, .. })
            | Instruction::ShiftFrequency(ShiftFrequency { channel, .. })
            | Instruction::ShiftPhase(ShiftPhase { channel, .. }) => Some(*channel),
        }
    }
}

macro_rules! impl_from_instruction {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Instruction {
                fn from(instruction: $variant) -> Self {
                    Instruction::$variant(instruction)
                }
            }
        )*
    };
}

impl_from_instruction!(
    Acquire,
    Delay,
    Play,
    SetFrequency,
    SetPhase,
    ShiftFrequency,
    ShiftPhase
);
