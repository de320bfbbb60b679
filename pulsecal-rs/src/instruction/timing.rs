use std::fmt;

use super::Channel;
use crate::expression::Expression;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delay {
    pub duration: Expression,
    pub channel: Channel,
}

impl Delay {
    pub fn new(duration: Expression, channel: Channel) -> Self {
        Self { duration, channel }
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay({}) {}", self.duration, self.channel)
    }
}

/// Acquire the readout of one qubit, optionally storing the result in a memory slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Acquire {
    pub duration: Expression,
    pub qubit: u32,
    pub memory_slot: Option<u32>,
}

impl Acquire {
    pub fn new(duration: Expression, qubit: u32, memory_slot: Option<u32>) -> Self {
        Self {
            duration,
            qubit,
            memory_slot,
        }
    }
}

impl fmt::Display for Acquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acquire({}) q{}", self.duration, self.qubit)?;
        if let Some(slot) = self.memory_slot {
            write!(f, " mem{slot}")?;
        }
        Ok(())
    }
}
