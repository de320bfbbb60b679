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

//! A Schedule is a linear sequence of instructions, each assigned a start time in samples.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::{calibration::CalibrationPublisher, expression::Expression, instruction::Instruction};

/// The metadata key under which a schedule records who produced it.
pub const PUBLISHER_KEY: &str = "publisher";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataValue {
    String(String),
    Expression(Expression),
    Publisher(CalibrationPublisher),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(value) => write!(f, "{value:?}"),
            MetadataValue::Expression(value) => write!(f, "{value}"),
            MetadataValue::Publisher(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleItem {
    /// The inclusive start time of the instruction
    pub start_time: u64,
    pub instruction: Instruction,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("unknown duration for instruction {instruction}")]
    UnknownDuration { instruction: Instruction },

    #[error("instruction {instruction} at {start_time} ends past the last representable time")]
    DurationOutOfRange {
        instruction: Instruction,
        start_time: u64,
    },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[derive(Clone, Debug, Default)]
pub struct Schedule {
    name: String,
    metadata: IndexMap<String, MetadataValue>,
    items: Vec<ScheduleItem>,
}

/// Two schedules are equal when they play the same instructions at the same times.
///
/// Name and metadata, including the publisher tag, do not participate.
impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Schedule {}

impl Schedule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an instruction at `start_time`, after any instruction already starting at that time.
    pub fn insert(&mut self, start_time: u64, instruction: impl Into<Instruction>) {
        let index = self
            .items
            .partition_point(|item| item.start_time <= start_time);
        self.items.insert(
            index,
            ScheduleItem {
                start_time,
                instruction: instruction.into(),
            },
        );
    }

    /// The time at which the last instruction finishes.
    ///
    /// Fails if any instruction's duration is still parameterized, or ends past `u64::MAX`.
    pub fn stop_time(&self) -> ScheduleResult<u64> {
        self.items.iter().try_fold(0, |stop_time, item| {
            let duration = item
                .instruction
                .duration()
                .into_simplified()
                .to_real()
                .map_err(|_| ScheduleError::UnknownDuration {
                    instruction: item.instruction.clone(),
                })?
                .max(0.0)
                .round();
            let out_of_range = || ScheduleError::DurationOutOfRange {
                instruction: item.instruction.clone(),
                start_time: item.start_time,
            };
            // `u64::MAX as f64` rounds up to 2^64, so equality is already out of range.
            if !duration.is_finite() || duration >= u64::MAX as f64 {
                return Err(out_of_range());
            }
            let end = item
                .start_time
                .checked_add(duration as u64)
                .ok_or_else(out_of_range)?;
            Ok(stop_time.max(end))
        })
    }

    /// The names of all unbound parameters in the schedule, in order of first appearance.
    pub fn parameters(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        for item in &self.items {
            item.instruction.extend_parameters(&mut names);
        }
        for value in self.metadata.values() {
            if let MetadataValue::Expression(expression) = value {
                expression.extend_variables(&mut names);
            }
        }
        names
    }

    pub fn is_parameterized(&self) -> bool {
        !self.parameters().is_empty()
    }

    /// Return a copy of this schedule with the given parameters replaced by their values.
    #[must_use]
    pub fn assign_parameters(&self, values: &IndexMap<String, Expression>) -> Self {
        let mut assigned = self.clone();
        assigned.assign_parameters_in_place(values);
        assigned
    }

    /// Replace the given parameters with their values.
    ///
    /// Expressions which referenced an assigned parameter are simplified afterwards; parameters
    /// not named in `values` are left untouched.
    pub fn assign_parameters_in_place(&mut self, values: &IndexMap<String, Expression>) {
        if values.is_empty() {
            return;
        }
        let mut assign = |expression: &mut Expression| {
            if expression
                .variables()
                .iter()
                .any(|name| values.contains_key(name))
            {
                *expression = expression.substitute_variables(values).into_simplified();
            }
        };
        for item in &mut self.items {
            item.instruction.apply_to_expressions(&mut assign);
        }
        for value in self.metadata.values_mut() {
            if let MetadataValue::Expression(expression) = value {
                assign(expression);
            }
        }
    }

    pub fn metadata(&self) -> &IndexMap<String, MetadataValue> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut IndexMap<String, MetadataValue> {
        &mut self.metadata
    }

    pub fn publisher(&self) -> Option<CalibrationPublisher> {
        match self.metadata.get(PUBLISHER_KEY) {
            Some(MetadataValue::Publisher(publisher)) => Some(*publisher),
            _ => None,
        }
    }

    /// Record the publisher, replacing any existing tag.
    pub fn set_publisher(&mut self, publisher: CalibrationPublisher) {
        self.metadata
            .insert(PUBLISHER_KEY.to_string(), MetadataValue::Publisher(publisher));
    }

    /// Record the publisher unless the schedule is already tagged. Return whether it was recorded.
    pub fn set_publisher_if_absent(&mut self, publisher: CalibrationPublisher) -> bool {
        if self.metadata.contains_key(PUBLISHER_KEY) {
            false
        } else {
            self.set_publisher(publisher);
            true
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{} {}", item.start_time, item.instruction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::{MetadataValue, Schedule, ScheduleError, PUBLISHER_KEY};
    use crate::calibration::CalibrationPublisher;
    use crate::expression::Expression;
    use crate::instruction::{Channel, Delay, ShiftPhase};

    fn delay(duration: Expression) -> Delay {
        Delay::new(duration, Channel::Drive(0))
    }

    fn phase(name: &str) -> ShiftPhase {
        ShiftPhase::new(Expression::variable(name), Channel::Drive(0))
    }

    #[fixture]
    fn schedule() -> Schedule {
        let mut schedule = Schedule::new("x");
        schedule.insert(0, phase("theta"));
        schedule.insert(0, delay(Expression::variable("dur")));
        schedule.insert(20, phase("amp"));
        schedule
    }

    #[test]
    fn insert_is_stable_and_ordered() {
        let mut schedule = Schedule::new("ordered");
        schedule.insert(10, phase("a"));
        schedule.insert(5, phase("b"));
        schedule.insert(10, phase("c"));
        schedule.insert(0, phase("d"));
        assert_snapshot!(schedule.to_string().trim_end(), @r###"
        0 shift_phase(d) d0
        5 shift_phase(b) d0
        10 shift_phase(a) d0
        10 shift_phase(c) d0
        "###);
    }

    #[rstest]
    fn parameters_in_order_of_appearance(schedule: Schedule) {
        assert_eq!(
            schedule.parameters().into_iter().collect::<Vec<_>>(),
            vec!["theta", "dur", "amp"]
        );
        assert!(schedule.is_parameterized());
    }

    #[rstest]
    fn assign_parameters_leaves_original_untouched(schedule: Schedule) {
        let values = IndexMap::from([
            ("dur".to_string(), Expression::from(160.0)),
            ("unused".to_string(), Expression::from(1.0)),
        ]);
        let assigned = schedule.assign_parameters(&values);

        assert_eq!(
            assigned.parameters().into_iter().collect::<Vec<_>>(),
            vec!["theta", "amp"]
        );
        assert!(schedule.parameters().contains("dur"));
        assert_eq!(assigned.stop_time().unwrap(), 160);
    }

    #[test]
    fn assigned_expressions_are_simplified() {
        let mut schedule = Schedule::new("");
        schedule.insert(
            0,
            delay(Expression::variable("dur") * Expression::from(2.0)),
        );
        schedule.insert(0, ShiftPhase::new(Expression::PiConstant, Channel::Drive(0)));
        schedule.assign_parameters_in_place(&IndexMap::from([(
            "dur".to_string(),
            Expression::from(8.0),
        )]));
        assert_snapshot!(schedule.to_string().trim_end(), @r###"
        0 delay(16) d0
        0 shift_phase(pi) d0
        "###);
    }

    #[rstest]
    fn stop_time_needs_bound_durations(schedule: Schedule) {
        assert!(matches!(
            schedule.stop_time(),
            Err(ScheduleError::UnknownDuration { .. })
        ));
        assert_eq!(Schedule::new("empty").stop_time().unwrap(), 0);
    }

    #[rstest]
    #[case(5, 1e30)]
    #[case(u64::MAX, 1.0)]
    #[case(0, f64::INFINITY)]
    #[case(0, u64::MAX as f64)]
    fn stop_time_past_the_time_range(#[case] start_time: u64, #[case] duration: f64) {
        let mut schedule = Schedule::new("long");
        schedule.insert(0, delay(Expression::from(8.0)));
        schedule.insert(start_time, delay(Expression::from(duration)));
        assert!(matches!(
            schedule.stop_time(),
            Err(ScheduleError::DurationOutOfRange { start_time: start, .. }) if start == start_time
        ));
    }

    #[test]
    fn stop_time_at_the_end_of_the_time_range() {
        let mut schedule = Schedule::new("long");
        schedule.insert(u64::MAX - 10, delay(Expression::from(10.0)));
        assert_eq!(schedule.stop_time().unwrap(), u64::MAX);
    }

    #[test]
    fn equality_ignores_name_and_metadata() {
        let mut left = Schedule::new("left");
        left.insert(3, phase("a"));
        left.set_publisher(CalibrationPublisher::Native);
        let mut right = Schedule::new("right");
        right.insert(3, phase("a"));
        right
            .metadata_mut()
            .insert("note".to_string(), MetadataValue::String("hi".to_string()));
        assert_eq!(left, right);

        right.insert(4, phase("b"));
        assert_ne!(left, right);
    }

    #[test]
    fn publisher_is_set_once() {
        let mut schedule = Schedule::new("tagged");
        assert_eq!(schedule.publisher(), None);
        assert!(schedule.set_publisher_if_absent(CalibrationPublisher::ExternalService));
        assert!(!schedule.set_publisher_if_absent(CalibrationPublisher::Native));
        assert_eq!(
            schedule.publisher(),
            Some(CalibrationPublisher::ExternalService)
        );

        schedule.metadata_mut().insert(
            PUBLISHER_KEY.to_string(),
            MetadataValue::String("someone".to_string()),
        );
        assert_eq!(schedule.publisher(), None);
        assert!(!schedule.set_publisher_if_absent(CalibrationPublisher::Native));
    }
}
