use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use super::inline::parse_arguments;
use super::{
    CalibrationEntry, CalibrationError, CalibrationPublisher, CalibrationResult,
    InlineDefinition,
};
use crate::converter::{InstructionConverter, PulseLibraryConverter, SerializedInstruction};
use crate::expression::Expression;
use crate::schedule::Schedule;
use crate::signature::Signature;

/// An entry holding serialized instructions, which are converted into a schedule the first time
/// the signature or a schedule is requested.
///
/// Once built, the entry behaves as an [`InlineDefinition`] of the converted schedule. The build
/// happens at most once per [`define`](CalibrationEntry::define), even when first requested from
/// several threads at once; a failed build is retried on the next request.
#[derive(Clone, Debug)]
pub struct DeferredSequenceDefinition {
    arguments: Option<Vec<String>>,
    converter: Arc<dyn InstructionConverter>,
    name: String,
    source: Option<Vec<SerializedInstruction>>,
    built: OnceCell<InlineDefinition>,
}

impl Default for DeferredSequenceDefinition {
    fn default() -> Self {
        Self {
            arguments: None,
            converter: Arc::new(PulseLibraryConverter::default()),
            name: String::new(),
            source: None,
            built: OnceCell::new(),
        }
    }
}

impl DeferredSequenceDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order the signature by `names`, as for [`InlineDefinition::with_arguments`].
    pub fn with_arguments<I, S>(mut self, names: I) -> CalibrationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = parse_arguments(names)?;
        self.built = OnceCell::new();
        Ok(self)
    }

    pub fn with_converter(mut self, converter: Arc<dyn InstructionConverter>) -> Self {
        self.converter = converter;
        self.built = OnceCell::new();
        self
    }

    /// Name the built schedule.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.built = OnceCell::new();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&[SerializedInstruction]> {
        self.source.as_deref()
    }

    /// Whether the source has been converted, without converting it.
    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// The converted entry, converting the source first if needed.
    pub fn built(&self) -> CalibrationResult<&InlineDefinition> {
        self.built.get_or_try_init(|| self.build())
    }

    fn build(&self) -> CalibrationResult<InlineDefinition> {
        let source = self.source.as_ref().ok_or(CalibrationError::Undefined)?;

        let mut schedule = Schedule::new(self.name.clone());
        for serialized in source {
            for instruction in self.converter.convert(serialized)? {
                schedule.insert(serialized.t0, instruction);
            }
        }
        schedule.set_publisher(CalibrationPublisher::BackendProvider);

        let mut inline = InlineDefinition::from_arguments(self.arguments.clone());
        inline.define(schedule)?;

        tracing::debug!(
            schedule = %self.name,
            serialized = source.len(),
            instructions = inline.schedule().map_or(0, |schedule| schedule.len()),
            "built calibration schedule from serialized sequence"
        );

        Ok(inline)
    }
}

impl CalibrationEntry for DeferredSequenceDefinition {
    type Definition = Vec<SerializedInstruction>;

    /// Store the sequence. Nothing is converted until it is needed.
    fn define(&mut self, sequence: Vec<SerializedInstruction>) -> CalibrationResult<()> {
        self.source = Some(sequence);
        self.built = OnceCell::new();
        Ok(())
    }

    fn get_signature(&self) -> CalibrationResult<&Signature> {
        self.built()?.get_signature()
    }

    fn get_schedule(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>> {
        self.built()?.get_schedule(args, kwargs)
    }
}

/// Compares the serialized sequences, without building either entry.
impl PartialEq for DeferredSequenceDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Builds this entry if needed, then compares schedules. An entry which fails to build is
/// unequal to everything.
impl PartialEq<InlineDefinition> for DeferredSequenceDefinition {
    fn eq(&self, other: &InlineDefinition) -> bool {
        match self.built() {
            Ok(built) => built == other,
            Err(error) => {
                tracing::debug!(%error, "serialized sequence failed to build for comparison");
                false
            }
        }
    }
}

impl PartialEq<DeferredSequenceDefinition> for InlineDefinition {
    fn eq(&self, other: &DeferredSequenceDefinition) -> bool {
        other == self
    }
}

impl fmt::Display for DeferredSequenceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.built.get() {
            Some(built) => fmt::Display::fmt(built, f),
            None => write!(f, "Serialized sequence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use indexmap::IndexMap;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::DeferredSequenceDefinition;
    use crate::calibration::{
        CalibrationEntry, CalibrationError, CalibrationPublisher, InlineDefinition,
    };
    use crate::converter::{
        ConversionError, ConversionResult, InstructionConverter, PulseLibraryConverter,
        SerializedInstruction,
    };
    use crate::expression::Expression;
    use crate::instruction::{Channel, Instruction};

    #[derive(Debug, Default)]
    struct CountingConverter {
        inner: PulseLibraryConverter,
        calls: AtomicUsize,
    }

    impl CountingConverter {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl InstructionConverter for CountingConverter {
        fn convert(
            &self,
            instruction: &SerializedInstruction,
        ) -> ConversionResult<Vec<Instruction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.convert(instruction)
        }
    }

    #[fixture]
    fn sequence() -> Vec<SerializedInstruction> {
        vec![
            SerializedInstruction::new("fc", 10)
                .with_channel(Channel::Drive(0))
                .with_phase("theta"),
            SerializedInstruction::new("delay", 5)
                .with_channel(Channel::Drive(0))
                .with_duration("dur"),
            SerializedInstruction::new("setf", 5)
                .with_channel(Channel::Control(0))
                .with_frequency(5.0),
        ]
    }

    fn entry(
        sequence: Vec<SerializedInstruction>,
    ) -> (DeferredSequenceDefinition, Arc<CountingConverter>) {
        let converter = Arc::new(CountingConverter::default());
        let mut entry = DeferredSequenceDefinition::new()
            .with_name("x90")
            .with_converter(converter.clone());
        entry.define(sequence).unwrap();
        (entry, converter)
    }

    #[rstest]
    fn display_does_not_build(sequence: Vec<SerializedInstruction>) {
        let (entry, converter) = entry(sequence);
        assert_eq!(entry.to_string(), "Serialized sequence");
        assert!(!entry.is_built());
        assert_eq!(converter.calls(), 0);

        entry.get_signature().unwrap();
        assert_eq!(entry.to_string(), "Schedule x90(dur, theta)");
    }

    #[rstest]
    fn builds_once(sequence: Vec<SerializedInstruction>) {
        let (entry, converter) = entry(sequence);
        assert_eq!(
            entry.get_signature().unwrap().names().collect::<Vec<_>>(),
            vec!["dur", "theta"]
        );
        assert!(entry.is_built());
        assert_eq!(converter.calls(), 3);

        entry.get_signature().unwrap();
        entry.get_schedule_positional(&[Expression::from(1.0)]).unwrap();
        entry.get_schedule(&[], &IndexMap::new()).unwrap();
        assert_eq!(converter.calls(), 3);
    }

    #[rstest]
    fn built_schedule_is_ordered_and_tagged(sequence: Vec<SerializedInstruction>) {
        let (entry, _) = entry(sequence);
        let schedule = entry.get_schedule(&[], &IndexMap::new()).unwrap();
        assert_eq!(schedule.name(), "x90");
        assert_eq!(
            schedule.publisher(),
            Some(CalibrationPublisher::BackendProvider)
        );
        assert_snapshot!(schedule.to_string().trim_end(), @r###"
        5 delay(dur) d0
        5 set_frequency(5000000000) u0
        10 shift_phase(theta) d0
        "###);
    }

    #[rstest]
    fn redefinition_resets_the_build(sequence: Vec<SerializedInstruction>) {
        let (mut entry, converter) = entry(sequence);
        entry.get_signature().unwrap();
        entry
            .define(vec![SerializedInstruction::new("fc", 0)
                .with_channel(Channel::Drive(1))
                .with_phase(0.5)])
            .unwrap();
        assert!(!entry.is_built());
        assert!(entry.get_signature().unwrap().is_empty());
        assert_eq!(converter.calls(), 4);
    }

    #[test]
    fn conversion_failures_leave_the_entry_unbuilt() {
        let (entry, converter) = entry(vec![SerializedInstruction::new("cx", 0)]);
        assert!(matches!(
            entry.get_signature(),
            Err(CalibrationError::Conversion(ConversionError::UnknownInstruction(_)))
        ));
        assert!(!entry.is_built());
        assert!(entry.get_signature().is_err());
        assert_eq!(converter.calls(), 2);
        assert_eq!(entry, entry.clone());
        assert_ne!(entry, InlineDefinition::new());
    }

    #[rstest]
    fn explicit_arguments_must_match(sequence: Vec<SerializedInstruction>) {
        let mut entry = DeferredSequenceDefinition::new()
            .with_arguments(["theta"])
            .unwrap();
        entry.define(sequence.clone()).unwrap();
        assert!(matches!(
            entry.get_signature(),
            Err(CalibrationError::ArgumentMismatch { .. })
        ));

        let mut entry = DeferredSequenceDefinition::new()
            .with_arguments(["theta", "dur"])
            .unwrap();
        entry.define(sequence).unwrap();
        assert_eq!(
            entry.get_signature().unwrap().names().collect::<Vec<_>>(),
            vec!["theta", "dur"]
        );
    }

    #[test]
    fn undefined_entry() {
        let entry = DeferredSequenceDefinition::new();
        assert!(matches!(
            entry.get_signature(),
            Err(CalibrationError::Undefined)
        ));
        assert_eq!(entry.to_string(), "Serialized sequence");
    }

    #[rstest]
    fn equality_between_sequences_does_not_build(sequence: Vec<SerializedInstruction>) {
        let (left, left_converter) = entry(sequence.clone());
        let (right, right_converter) = entry(sequence);
        assert_eq!(left, right);
        assert_eq!(left_converter.calls() + right_converter.calls(), 0);

        let (other, _) = entry(vec![]);
        assert_ne!(left, other);
    }

    #[rstest]
    fn equality_with_inline_builds_once(sequence: Vec<SerializedInstruction>) {
        let (deferred, converter) = entry(sequence.clone());
        let (reference, _) = entry(sequence);
        let schedule = reference.get_schedule(&[], &IndexMap::new()).unwrap();
        let mut inline = InlineDefinition::new();
        inline.define(schedule.as_ref().clone()).unwrap();

        assert!(deferred == inline);
        assert!(inline == deferred);
        assert_eq!(converter.calls(), 3);
    }

    #[rstest]
    fn concurrent_first_access_builds_once(sequence: Vec<SerializedInstruction>) {
        let (entry, converter) = entry(sequence);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| entry.get_signature().map(|signature| signature.len()).unwrap());
            }
        });
        assert_eq!(converter.calls(), 3);
    }
}
