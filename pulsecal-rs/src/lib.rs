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

//! Calibration entries for parameterized pulse schedules.
//!
//! Within this crate you'll find:
//!
//! * The [`CalibrationEntry`] contract and its three implementations:
//!   * [`InlineDefinition`], holding an in-memory [schedule],
//!   * [`CallbackDefinition`], holding a [generator] that builds a schedule on demand,
//!   * [`DeferredSequenceDefinition`], holding [serialized instructions] which are converted
//!     into a schedule the first time it is needed.
//! * A [signature] type implementing positional/keyword argument binding
//! * The [schedule], [instruction] and [expression] types calibration entries produce
//! * A [converter] from serialized instructions to native instructions
//!
//! Prior to `v1.0`, minor-version changes are considered breaking changes.
//!
//! [`CalibrationEntry`]: crate::calibration::CalibrationEntry
//! [`InlineDefinition`]: crate::calibration::InlineDefinition
//! [`CallbackDefinition`]: crate::calibration::CallbackDefinition
//! [`DeferredSequenceDefinition`]: crate::calibration::DeferredSequenceDefinition
//! [converter]: crate::converter::InstructionConverter
//! [expression]: crate::expression::Expression
//! [generator]: crate::calibration::ScheduleGenerator
//! [instruction]: crate::instruction::Instruction
//! [schedule]: crate::schedule::Schedule
//! [serialized instructions]: crate::converter::SerializedInstruction
//! [signature]: crate::signature::Signature

pub mod calibration;
pub mod converter;
pub mod expression;
mod floating_point_eq;
pub mod instruction;
mod macros;
pub(crate) mod parser;
pub mod schedule;
pub mod signature;

pub use calibration::{
    CalibrationDefinition, CalibrationEntry, CalibrationError, CalibrationPublisher,
    CallbackDefinition, DeferredSequenceDefinition, InlineDefinition, ScheduleGenerator,
};
pub use schedule::Schedule;
pub use signature::{BoundArguments, Signature};
