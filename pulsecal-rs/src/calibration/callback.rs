use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;

use super::{CalibrationEntry, CalibrationError, CalibrationPublisher, CalibrationResult};
use crate::expression::Expression;
use crate::schedule::Schedule;
use crate::signature::{BoundArguments, Signature};

/// The error type returned by a failing [`ScheduleGenerator`].
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

type GeneratorFunction =
    dyn Fn(&BoundArguments) -> Result<Schedule, GeneratorError> + Send + Sync;

/// A named function which builds a schedule from bound arguments, along with the signature
/// those arguments are bound against.
///
/// Clones share the same function; two generators are equal only if they share it.
#[derive(Clone)]
pub struct ScheduleGenerator {
    name: String,
    signature: Signature,
    function: Arc<GeneratorFunction>,
}

impl ScheduleGenerator {
    pub fn new<F>(name: impl Into<String>, signature: Signature, function: F) -> Self
    where
        F: Fn(&BoundArguments) -> Result<Schedule, GeneratorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn call(&self, arguments: &BoundArguments) -> Result<Schedule, GeneratorError> {
        (self.function)(arguments)
    }
}

impl PartialEq for ScheduleGenerator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.function, &other.function)
    }
}

impl fmt::Debug for ScheduleGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleGenerator")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// An entry which calls a [`ScheduleGenerator`] for every requested schedule.
///
/// Unlike [`InlineDefinition`](super::InlineDefinition), every required parameter must be bound,
/// and the signature keeps the generator's declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallbackDefinition {
    generator: Option<ScheduleGenerator>,
}

impl CallbackDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(&self) -> Option<&ScheduleGenerator> {
        self.generator.as_ref()
    }
}

impl CalibrationEntry for CallbackDefinition {
    type Definition = ScheduleGenerator;

    fn define(&mut self, generator: ScheduleGenerator) -> CalibrationResult<()> {
        self.generator = Some(generator);
        Ok(())
    }

    fn get_signature(&self) -> CalibrationResult<&Signature> {
        self.generator
            .as_ref()
            .map(ScheduleGenerator::signature)
            .ok_or(CalibrationError::Undefined)
    }

    fn get_schedule(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> CalibrationResult<Arc<Schedule>> {
        let generator = self.generator.as_ref().ok_or(CalibrationError::Undefined)?;
        let mut arguments = generator.signature.bind(args, kwargs)?;
        arguments.apply_defaults(&generator.signature);

        let mut schedule = generator
            .call(&arguments)
            .map_err(|source| CalibrationError::Generator {
                name: generator.name.clone(),
                source,
            })?;
        schedule.set_publisher_if_absent(CalibrationPublisher::Native);
        Ok(Arc::new(schedule))
    }
}

impl fmt::Display for CallbackDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable")?;
        if let Some(generator) = &self.generator {
            write!(
                f,
                " {}({})",
                generator.name,
                generator.signature.names().join(", ")
            )?;
        }
        Ok(())
    }
}
