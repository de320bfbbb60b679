use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use super::{CalibrationEntry, CalibrationError, CalibrationPublisher, CalibrationResult};
use crate::expression::Expression;
use crate::schedule::Schedule;
use crate::signature::Signature;

/// Validate caller-supplied argument names. An empty list means "derive the order".
pub(super) fn parse_arguments<I, S>(names: I) -> CalibrationResult<Option<Vec<String>>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names = names.into_iter().map(Into::into).collect::<Vec<String>>();
    if names.is_empty() {
        return Ok(None);
    }
    Signature::from_names(names.iter().cloned())?;
    Ok(Some(names))
}

/// An entry holding a schedule in memory.
///
/// Its signature lists the parameters referenced by the schedule, in lexicographic order unless
/// explicit argument names were given at construction.
#[derive(Clone, Debug, Default)]
pub struct InlineDefinition {
    arguments: Option<Vec<String>>,
    definition: Option<Arc<Schedule>>,
    signature: Option<Signature>,
}

impl InlineDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// An entry whose signature lists `names` in the given order.
    ///
    /// The names must be distinct, and must later match the parameters of the
    /// defined schedule exactly.
    pub fn with_arguments<I, S>(names: I) -> CalibrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            arguments: parse_arguments(names)?,
            ..Self::default()
        })
    }

    pub(super) fn from_arguments(arguments: Option<Vec<String>>) -> Self {
        Self {
            arguments,
            ..Self::default()
        }
    }

    pub fn arguments(&self) -> Option<&[String]> {
        self.arguments.as_deref()
    }

    pub fn schedule(&self) -> Option<&Arc<Schedule>> {
        self.definition.as_ref()
    }

    pub fn is_defined(&self) -> bool {
        self.definition.is_some()
    }

    fn derive_signature(&self, schedule: &Schedule) -> CalibrationResult<Signature> {
        let parameters = schedule.parameters();
        match &self.arguments {
            Some(arguments) => {
                let given = arguments.iter().map(String::as_str).collect::<IndexSet<_>>();
                let matches = given.len() == parameters.len()
                    && parameters.iter().all(|name| given.contains(name.as_str()));
                if !matches {
                    return Err(CalibrationError::ArgumentMismatch {
                        arguments: arguments.clone(),
                        parameters: parameters.into_iter().sorted().collect(),
                    });
                }
                Ok(Signature::from_names(arguments.iter().cloned())?)
            }
            None => Ok(Signature::from_names(parameters.into_iter().sorted())?),
        }
    }
}

impl CalibrationEntry for InlineDefinition {
    type Definition = Schedule;

    /// Store the schedule, tagging it [`Native`](CalibrationPublisher::Native) unless it already
    /// names a publisher.
    fn define(&mut self, mut schedule: Schedule) -> CalibrationResult<()> {
        schedule.set_publisher_if_absent(CalibrationPublisher::Native);
        let signature = self.derive_signature(&schedule)?;
        self.definition = Some(Arc::new(schedule));
        self.signature = Some(signature);
        Ok(())
    }

    fn get_signature(&self) -> CalibrationResult<&Signature> {
        self.signature.as_ref().ok_or(CalibrationError::Undefined)
    }

    /// Without arguments, return the stored schedule itself. Otherwise return a copy with the
    /// bound parameters assigned; parameters left unbound stay symbolic.
    fn get_schedule(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>> {
        let schedule = self.definition.as_ref().ok_or(CalibrationError::Undefined)?;
        if args.is_empty() && kwargs.is_empty() {
            return Ok(Arc::clone(schedule));
        }
        let bound = self.get_signature()?.bind_partial(args, kwargs)?;
        Ok(Arc::new(schedule.assign_parameters(bound.as_map())))
    }
}

impl PartialEq for InlineDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl fmt::Display for InlineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schedule")?;
        if let Some(schedule) = &self.definition {
            if !schedule.name().is_empty() {
                write!(f, " {}", schedule.name())?;
            }
        }
        match &self.signature {
            Some(signature) if !signature.is_empty() => {
                write!(f, "({})", signature.names().join(", "))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::InlineDefinition;
    use crate::calibration::{CalibrationEntry, CalibrationError, CalibrationPublisher};
    use crate::expression::Expression;
    use crate::instruction::{Channel, Delay, ShiftPhase};
    use crate::schedule::Schedule;
    use crate::signature::{BindingError, SignatureError};

    #[fixture]
    fn schedule() -> Schedule {
        let mut schedule = Schedule::new("x90");
        schedule.insert(
            0,
            ShiftPhase::new(Expression::variable("theta"), Channel::Drive(0)),
        );
        schedule.insert(
            0,
            Delay::new(Expression::variable("dur"), Channel::Drive(0)),
        );
        schedule.insert(
            0,
            ShiftPhase::new(-Expression::variable("theta"), Channel::Control(0)),
        );
        schedule
    }

    fn names(entry: &InlineDefinition) -> Vec<&str> {
        entry.get_signature().unwrap().names().collect()
    }

    #[rstest]
    fn signature_is_sorted_without_arguments(schedule: Schedule) {
        let mut entry = InlineDefinition::new();
        entry.define(schedule).unwrap();
        assert_eq!(names(&entry), vec!["dur", "theta"]);
    }

    #[rstest]
    fn signature_follows_explicit_arguments(schedule: Schedule) {
        let mut entry = InlineDefinition::with_arguments(["theta", "dur"]).unwrap();
        entry.define(schedule).unwrap();
        assert_eq!(names(&entry), vec!["theta", "dur"]);
    }

    #[rstest]
    #[case(vec!["theta"])]
    #[case(vec!["theta", "dur", "amp"])]
    #[case(vec!["theta", "amp"])]
    fn mismatched_arguments(schedule: Schedule, #[case] arguments: Vec<&str>) {
        let mut entry = InlineDefinition::with_arguments(arguments).unwrap();
        let error = entry.define(schedule).unwrap_err();
        assert!(
            matches!(error, CalibrationError::ArgumentMismatch { .. }),
            "{error}"
        );
        assert!(!entry.is_defined());
    }

    #[test]
    fn invalid_argument_names() {
        assert!(matches!(
            InlineDefinition::with_arguments(["a", "a"]),
            Err(CalibrationError::InvalidArgument(
                SignatureError::DuplicateParameter(_)
            ))
        ));
        let empty = InlineDefinition::with_arguments(Vec::<String>::new()).unwrap();
        assert_eq!(empty.arguments(), None);
    }

    #[test]
    fn parameters_need_not_be_identifiers() {
        let mut schedule = Schedule::new("u2");
        schedule.insert(
            0,
            ShiftPhase::new(Expression::variable("theta[0]"), Channel::Drive(0)),
        );
        schedule.insert(
            0,
            ShiftPhase::new(Expression::variable("θ"), Channel::Control(0)),
        );

        let mut entry = InlineDefinition::new();
        entry.define(schedule.clone()).unwrap();
        assert_eq!(names(&entry), vec!["theta[0]", "θ"]);
        assert_eq!(entry.to_string(), "Schedule u2(theta[0], θ)");

        let bound = entry
            .get_schedule_keyword(&IndexMap::from([(
                "θ".to_string(),
                Expression::from(0.5),
            )]))
            .unwrap();
        assert_eq!(
            bound.parameters().into_iter().collect::<Vec<_>>(),
            vec!["theta[0]"]
        );

        let mut ordered = InlineDefinition::with_arguments(["θ", "theta[0]"]).unwrap();
        ordered.define(schedule).unwrap();
        assert_eq!(names(&ordered), vec!["θ", "theta[0]"]);
    }

    #[test]
    fn undefined_entry() {
        let entry = InlineDefinition::new();
        assert!(matches!(
            entry.get_signature(),
            Err(CalibrationError::Undefined)
        ));
        assert!(matches!(
            entry.get_schedule(&[], &IndexMap::new()),
            Err(CalibrationError::Undefined)
        ));
        assert_eq!(entry.to_string(), "Schedule");
    }

    #[rstest]
    fn no_arguments_return_the_stored_schedule(schedule: Schedule) {
        let mut entry = InlineDefinition::new();
        entry.define(schedule).unwrap();
        let first = entry.get_schedule(&[], &IndexMap::new()).unwrap();
        let second = entry.get_schedule_positional(&[]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, entry.schedule().unwrap()));
    }

    #[rstest]
    fn partial_binding_is_incremental(schedule: Schedule) {
        let mut entry = InlineDefinition::new();
        entry.define(schedule).unwrap();

        let partial = entry
            .get_schedule_keyword(&IndexMap::from([(
                "theta".to_string(),
                Expression::from(0.5),
            )]))
            .unwrap();
        assert_eq!(
            partial.parameters().into_iter().collect::<Vec<_>>(),
            vec!["dur"]
        );
        assert_snapshot!(partial.to_string().trim_end(), @r###"
        0 shift_phase(0.5) d0
        0 delay(dur) d0
        0 shift_phase(-0.5) u0
        "###);

        let stored = entry.schedule().unwrap();
        assert_eq!(stored.parameters().len(), 2);

        let mut next = InlineDefinition::new();
        next.define(Schedule::clone(&partial)).unwrap();
        let full = next.get_schedule_positional(&[Expression::from(64.0)]).unwrap();
        assert!(!full.is_parameterized());
        assert_eq!(full.stop_time().unwrap(), 64);
    }

    #[rstest]
    fn binding_errors(schedule: Schedule) {
        let mut entry = InlineDefinition::new();
        entry.define(schedule).unwrap();
        let three = [1.0, 2.0, 3.0].map(Expression::from);
        assert!(matches!(
            entry.get_schedule_positional(&three),
            Err(CalibrationError::Binding(BindingError::TooManyPositional { .. }))
        ));
        assert!(matches!(
            entry.get_schedule(
                &[Expression::from(1.0)],
                &IndexMap::from([("dur".to_string(), Expression::from(2.0))])
            ),
            Err(CalibrationError::Binding(BindingError::MultipleValues(_)))
        ));
        assert!(matches!(
            entry.get_schedule_keyword(&IndexMap::from([(
                "phi".to_string(),
                Expression::from(2.0)
            )])),
            Err(CalibrationError::Binding(BindingError::UnexpectedKeyword(_)))
        ));
    }

    #[rstest]
    fn publisher_set_only_when_absent(schedule: Schedule) {
        let mut native = InlineDefinition::new();
        native.define(schedule.clone()).unwrap();
        assert_eq!(
            native.schedule().unwrap().publisher(),
            Some(CalibrationPublisher::Native)
        );

        let mut tagged = schedule;
        tagged.set_publisher(CalibrationPublisher::ExternalService);
        let mut external = InlineDefinition::new();
        external.define(tagged).unwrap();
        assert_eq!(
            external.schedule().unwrap().publisher(),
            Some(CalibrationPublisher::ExternalService)
        );

        assert_eq!(native, external);
    }

    #[rstest]
    fn display(schedule: Schedule) {
        let mut entry = InlineDefinition::with_arguments(["theta", "dur"]).unwrap();
        entry.define(schedule).unwrap();
        assert_eq!(entry.to_string(), "Schedule x90(theta, dur)");

        let mut unparameterized = InlineDefinition::new();
        unparameterized.define(Schedule::new("idle")).unwrap();
        assert_eq!(unparameterized.to_string(), "Schedule idle");

        let mut unnamed = InlineDefinition::new();
        let mut schedule = Schedule::new("");
        schedule.insert(0, Delay::new(Expression::variable("t"), Channel::Drive(1)));
        unnamed.define(schedule).unwrap();
        assert_eq!(unnamed.to_string(), "Schedule(t)");
    }

    #[rstest]
    fn redefinition_replaces_signature(schedule: Schedule) {
        let mut entry = InlineDefinition::new();
        entry.define(schedule).unwrap();
        entry.define(Schedule::new("empty")).unwrap();
        assert!(entry.get_signature().unwrap().is_empty());
    }
}
