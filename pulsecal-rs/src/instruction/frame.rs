use std::fmt;

use super::{Channel, Pulse};
use crate::expression::Expression;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Play {
    pub pulse: Pulse,
    pub channel: Channel,
}

impl Play {
    pub fn new(pulse: Pulse, channel: Channel) -> Self {
        Self { pulse, channel }
    }
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "play({}) {}", self.pulse, self.channel)
    }
}

/// Frame changes all share one shape: a value applied to a channel, taking no time.
macro_rules! frame_change {
    ($name:ident, $field:ident, $mnemonic:literal) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            pub $field: Expression,
            pub channel: Channel,
        }

        impl $name {
            pub fn new($field: Expression, channel: Channel) -> Self {
                Self { $field, channel }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($mnemonic, "({}) {}"), self.$field, self.channel)
            }
        }
    };
}

frame_change!(SetFrequency, frequency, "set_frequency");
frame_change!(SetPhase, phase, "set_phase");
frame_change!(ShiftFrequency, frequency, "shift_frequency");
frame_change!(ShiftPhase, phase, "shift_phase");
