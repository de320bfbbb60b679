use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{
    CalibrationEntry, CalibrationResult, CallbackDefinition, DeferredSequenceDefinition,
    InlineDefinition,
};
use crate::expression::Expression;
use crate::schedule::Schedule;
use crate::signature::Signature;

/// Any one of the calibration entry kinds.
///
/// Inline and deferred entries compare by their schedules, building the deferred entry if
/// needed. Callback entries are only ever equal to other callback entries.
#[derive(Clone, Debug)]
pub enum CalibrationDefinition {
    Inline(InlineDefinition),
    Callback(CallbackDefinition),
    DeferredSequence(DeferredSequenceDefinition),
}

impl CalibrationDefinition {
    pub fn get_signature(&self) -> CalibrationResult<&Signature> {
        match self {
            CalibrationDefinition::Inline(entry) => entry.get_signature(),
            CalibrationDefinition::Callback(entry) => entry.get_signature(),
            CalibrationDefinition::DeferredSequence(entry) => entry.get_signature(),
        }
    }

    pub fn get_schedule(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>> {
        match self {
            CalibrationDefinition::Inline(entry) => entry.get_schedule(args, kwargs),
            CalibrationDefinition::Callback(entry) => entry.get_schedule(args, kwargs),
            CalibrationDefinition::DeferredSequence(entry) => entry.get_schedule(args, kwargs),
        }
    }
}

impl PartialEq for CalibrationDefinition {
    fn eq(&self, other: &Self) -> bool {
        use CalibrationDefinition::*;

        match (self, other) {
            (Inline(left), Inline(right)) => left == right,
            (Callback(left), Callback(right)) => left == right,
            (DeferredSequence(left), DeferredSequence(right)) => left == right,
            (Inline(inline), DeferredSequence(deferred))
            | (DeferredSequence(deferred), Inline(inline)) => deferred == inline,
            (Callback(_), _) | (_, Callback(_)) => false,
        }
    }
}

impl fmt::Display for CalibrationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationDefinition::Inline(entry) => write!(f, "{entry}"),
            CalibrationDefinition::Callback(entry) => write!(f, "{entry}"),
            CalibrationDefinition::DeferredSequence(entry) => write!(f, "{entry}"),
        }
    }
}

impl From<InlineDefinition> for CalibrationDefinition {
    fn from(entry: InlineDefinition) -> Self {
        CalibrationDefinition::Inline(entry)
    }
}

impl From<CallbackDefinition> for CalibrationDefinition {
    fn from(entry: CallbackDefinition) -> Self {
        CalibrationDefinition::Callback(entry)
    }
}

impl From<DeferredSequenceDefinition> for CalibrationDefinition {
    fn from(entry: DeferredSequenceDefinition) -> Self {
        CalibrationDefinition::DeferredSequence(entry)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use rstest::{fixture, rstest};

    use super::CalibrationDefinition;
    use crate::calibration::{
        CalibrationEntry, CallbackDefinition, DeferredSequenceDefinition, InlineDefinition,
        ScheduleGenerator,
    };
    use crate::converter::SerializedInstruction;
    use crate::instruction::Channel;
    use crate::schedule::Schedule;
    use crate::signature::Signature;

    fn sequence() -> Vec<SerializedInstruction> {
        vec![SerializedInstruction::new("delay", 0)
            .with_channel(Channel::Drive(0))
            .with_duration("dur")]
    }

    #[fixture]
    fn deferred() -> CalibrationDefinition {
        let mut entry = DeferredSequenceDefinition::new().with_name("wait");
        entry.define(sequence()).unwrap();
        entry.into()
    }

    #[fixture]
    fn inline() -> CalibrationDefinition {
        let mut reference = DeferredSequenceDefinition::new();
        reference.define(sequence()).unwrap();
        let schedule = reference.get_schedule(&[], &IndexMap::new()).unwrap();
        let mut entry = InlineDefinition::new();
        entry.define(Schedule::clone(&schedule)).unwrap();
        entry.into()
    }

    #[fixture]
    fn callback() -> CalibrationDefinition {
        let mut entry = CallbackDefinition::new();
        entry
            .define(ScheduleGenerator::new(
                "wait",
                Signature::from_names(["dur"]).unwrap(),
                |_| Ok(Schedule::new("wait")),
            ))
            .unwrap();
        entry.into()
    }

    #[rstest]
    fn inline_and_deferred_compare_by_schedule(
        deferred: CalibrationDefinition,
        inline: CalibrationDefinition,
    ) {
        assert_eq!(deferred.to_string(), "Serialized sequence");
        assert_eq!(inline, deferred);
        assert_eq!(deferred, inline);
        assert_eq!(deferred.to_string(), "Schedule wait(dur)");
    }

    #[rstest]
    fn callbacks_only_equal_callbacks(
        deferred: CalibrationDefinition,
        inline: CalibrationDefinition,
        callback: CalibrationDefinition,
    ) {
        assert_ne!(callback, inline);
        assert_ne!(deferred, callback);
        assert_eq!(callback, callback.clone());
        assert!(matches!(
            &deferred,
            CalibrationDefinition::DeferredSequence(entry) if !entry.is_built()
        ));
    }

    #[rstest]
    fn delegates_to_the_entry(callback: CalibrationDefinition, inline: CalibrationDefinition) {
        assert_eq!(callback.to_string(), "Callable wait(dur)");
        assert_eq!(
            callback.get_signature().unwrap().names().collect::<Vec<_>>(),
            vec!["dur"]
        );
        assert!(callback.get_schedule(&[], &IndexMap::new()).is_err());
        let schedule = inline.get_schedule(&[], &IndexMap::new()).unwrap();
        assert!(schedule.is_parameterized());
    }
}
