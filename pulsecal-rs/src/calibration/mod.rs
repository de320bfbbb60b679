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

//! Calibration entries: named, parameterized definitions of a [`Schedule`], which may be
//! instantiated with concrete argument values.
//!
//! Three kinds of entries share the [`CalibrationEntry`] contract, differing in where their
//! schedule comes from:
//!
//! * [`InlineDefinition`] holds the schedule itself.
//! * [`CallbackDefinition`] holds a [`ScheduleGenerator`] which builds a new schedule per call.
//! * [`DeferredSequenceDefinition`] holds serialized instructions, converted into a schedule the
//!   first time the entry's signature or schedule is requested.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::converter::ConversionError;
use crate::expression::Expression;
use crate::schedule::Schedule;
use crate::signature::{BindingError, Signature, SignatureError};

mod callback;
mod deferred;
mod definition;
mod inline;

pub use callback::{CallbackDefinition, GeneratorError, ScheduleGenerator};
pub use deferred::DeferredSequenceDefinition;
pub use definition::CalibrationDefinition;
pub use inline::InlineDefinition;

/// Who produced the contents of a schedule.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CalibrationPublisher {
    BackendProvider,
    Native,
    ExternalService,
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] SignatureError),

    #[error("arguments {arguments:?} do not match the schedule parameters {parameters:?}")]
    ArgumentMismatch {
        arguments: Vec<String>,
        parameters: Vec<String>,
    },

    #[error("arguments do not match the signature: {0}")]
    Binding(#[from] BindingError),

    #[error("the calibration entry has not been defined")]
    Undefined,

    #[error("failed to convert serialized instruction: {0}")]
    Conversion(#[from] ConversionError),

    #[error("schedule generator {name:?} failed: {source}")]
    Generator {
        name: String,
        #[source]
        source: GeneratorError,
    },
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// A parameterized schedule definition, which is [defined](Self::define) once and then asked for
/// its [signature](Self::get_signature) and [schedules](Self::get_schedule).
pub trait CalibrationEntry: fmt::Debug + fmt::Display {
    /// The source this entry is defined from.
    type Definition;

    /// Attach the source, replacing any earlier one along with everything derived from it.
    fn define(&mut self, definition: Self::Definition) -> CalibrationResult<()>;

    /// The ordered parameters accepted by [`get_schedule`](Self::get_schedule).
    fn get_signature(&self) -> CalibrationResult<&Signature>;

    /// Bind `args` and `kwargs` against the signature, and return the resulting schedule.
    fn get_schedule(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>>;

    fn get_schedule_positional(&self, args: &[Expression]) -> CalibrationResult<Arc<Schedule>> {
        self.get_schedule(args, &IndexMap::new())
    }

    fn get_schedule_keyword(
        &self,
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>> {
        self.get_schedule(&[], kwargs)
    }
}
