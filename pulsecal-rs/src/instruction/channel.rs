use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A hardware channel an instruction is played on.
///
/// Channels render as a one-letter prefix followed by the channel index: `d0`, `u1`, `m2`, `a3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channel {
    Drive(u32),
    Control(u32),
    Measure(u32),
    Acquire(u32),
}

impl Channel {
    pub fn index(&self) -> u32 {
        match self {
            Channel::Drive(index)
            | Channel::Control(index)
            | Channel::Measure(index)
            | Channel::Acquire(index) => *index,
        }
    }

    fn prefix(&self) -> char {
        match self {
            Channel::Drive(_) => 'd',
            Channel::Control(_) => 'u',
            Channel::Measure(_) => 'm',
            Channel::Acquire(_) => 'a',
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.index())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0:?} is not a channel name; expected one of d<n>, u<n>, m<n>, a<n>")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseChannelError(s.to_owned());
        let mut chars = s.chars();
        let prefix = chars.next().ok_or_else(error)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(error());
        }
        let index = digits.parse::<u32>().map_err(|_| error())?;
        match prefix {
            'd' => Ok(Channel::Drive(index)),
            'u' => Ok(Channel::Control(index)),
            'm' => Ok(Channel::Measure(index)),
            'a' => Ok(Channel::Acquire(index)),
            _ => Err(error()),
        }
    }
}

impl TryFrom<String> for Channel {
    type Error = ParseChannelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.to_string()
    }
}
