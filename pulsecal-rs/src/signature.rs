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

//! Parameter signatures, and the binding of positional and keyword arguments against them.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::expression::Expression;

/// How an argument may be supplied for a parameter.
///
/// Within a [`Signature`], parameters are ordered by kind: positional-only first, keyword-only
/// last.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKind {
    PositionalOnly,
    #[default]
    PositionalOrKeyword,
    KeywordOnly,
}

impl ParameterKind {
    pub fn accepts_positional(&self) -> bool {
        !matches!(self, ParameterKind::KeywordOnly)
    }

    pub fn accepts_keyword(&self) -> bool {
        !matches!(self, ParameterKind::PositionalOnly)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Option<Expression>,
}

impl SignatureParameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind, default: Option<Expression>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// A required parameter which may be given by position or by keyword.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::PositionalOrKeyword, None)
    }

    pub fn with_default(mut self, default: impl Into<Expression>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for SignatureParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(default) = &self.default {
            write!(f, "={default}")?;
        }
        Ok(())
    }
}

/// Errors which make a parameter list unusable as a signature.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("{0:?} is not a valid parameter name")]
    InvalidName(String),

    #[error("duplicate parameter {0:?}")]
    DuplicateParameter(String),

    #[error("parameter {name:?} of kind {kind:?} follows a parameter of kind {previous:?}")]
    KindOrder {
        name: String,
        kind: ParameterKind,
        previous: ParameterKind,
    },

    #[error("required positional parameter {0:?} follows a parameter with a default")]
    RequiredAfterDefault(String),
}

/// Errors which occur when arguments cannot be matched against a [`Signature`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("takes {expected} positional arguments but {received} were given")]
    TooManyPositional { expected: usize, received: usize },

    #[error("got an unexpected keyword argument {0:?}")]
    UnexpectedKeyword(String),

    #[error("got multiple values for argument {0:?}")]
    MultipleValues(String),

    #[error("positional-only argument {0:?} was passed as a keyword")]
    PositionalOnlyAsKeyword(String),

    #[error("missing a required argument: {0:?}")]
    MissingArgument(String),
}

pub type BindingResult<T> = Result<T, BindingError>;

/// Whether `name` is usable as a parameter name: an ASCII identifier with no surrounding
/// whitespace.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// An ordered list of uniquely-named parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    parameters: Vec<SignatureParameter>,
}

impl Signature {
    /// Build a signature, checking that names are valid and distinct, that kinds appear in order,
    /// and that no required positional parameter follows one with a default.
    pub fn new(parameters: Vec<SignatureParameter>) -> Result<Self, SignatureError> {
        let mut seen = IndexSet::with_capacity(parameters.len());
        let mut previous_kind = ParameterKind::PositionalOnly;
        let mut positional_default_seen = false;

        for parameter in &parameters {
            if !is_valid_name(&parameter.name) {
                return Err(SignatureError::InvalidName(parameter.name.clone()));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(SignatureError::DuplicateParameter(parameter.name.clone()));
            }
            if parameter.kind < previous_kind {
                return Err(SignatureError::KindOrder {
                    name: parameter.name.clone(),
                    kind: parameter.kind,
                    previous: previous_kind,
                });
            }
            previous_kind = parameter.kind;

            if parameter.kind.accepts_positional() {
                if parameter.default.is_some() {
                    positional_default_seen = true;
                } else if positional_default_seen {
                    return Err(SignatureError::RequiredAfterDefault(parameter.name.clone()));
                }
            }
        }

        Ok(Self { parameters })
    }

    /// A signature of required positional-or-keyword parameters, one per name.
    ///
    /// The names are taken as given, so any name a schedule parameter can carry is accepted.
    /// Only duplicates are rejected.
    pub fn from_names<I, S>(names: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parameters = names
            .into_iter()
            .map(SignatureParameter::required)
            .collect::<Vec<_>>();
        let mut seen = IndexSet::with_capacity(parameters.len());
        for parameter in &parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(SignatureError::DuplicateParameter(parameter.name.clone()));
            }
        }
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &[SignatureParameter] {
        &self.parameters
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|parameter| parameter.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&SignatureParameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Bind arguments to parameters, requiring a value or default for every parameter.
    ///
    /// Defaults are not filled in; see [`BoundArguments::apply_defaults`].
    pub fn bind(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> BindingResult<BoundArguments> {
        self.bind_arguments(args, kwargs, false)
    }

    /// Bind arguments to parameters, allowing any parameter to be left without a value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use indexmap::IndexMap;
    /// use pulsecal_rs::expression::Expression;
    /// use pulsecal_rs::signature::Signature;
    ///
    /// let signature = Signature::from_names(["amp", "dur"]).unwrap();
    /// let bound = signature
    ///     .bind_partial(&[Expression::from(0.5)], &IndexMap::new())
    ///     .unwrap();
    ///
    /// assert_eq!(bound.get("amp"), Some(&Expression::from(0.5)));
    /// assert_eq!(bound.get("dur"), None);
    /// ```
    pub fn bind_partial(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
    ) -> BindingResult<BoundArguments> {
        self.bind_arguments(args, kwargs, true)
    }

    fn bind_arguments(
        &self,
        args: &[Expression],
        kwargs: &IndexMap<String, Expression>,
        partial: bool,
    ) -> BindingResult<BoundArguments> {
        let positional = self
            .parameters
            .iter()
            .filter(|parameter| parameter.kind.accepts_positional())
            .collect::<Vec<_>>();
        if args.len() > positional.len() {
            return Err(BindingError::TooManyPositional {
                expected: positional.len(),
                received: args.len(),
            });
        }

        let mut values: IndexMap<&str, Expression> = positional
            .iter()
            .zip(args)
            .map(|(parameter, value)| (parameter.name.as_str(), value.clone()))
            .collect();

        for (name, value) in kwargs {
            let parameter = self
                .get(name)
                .ok_or_else(|| BindingError::UnexpectedKeyword(name.clone()))?;
            if !parameter.kind.accepts_keyword() {
                return Err(BindingError::PositionalOnlyAsKeyword(name.clone()));
            }
            if values.insert(parameter.name.as_str(), value.clone()).is_some() {
                return Err(BindingError::MultipleValues(name.clone()));
            }
        }

        if !partial {
            if let Some(missing) = self.parameters.iter().find(|parameter| {
                parameter.is_required() && !values.contains_key(parameter.name.as_str())
            }) {
                return Err(BindingError::MissingArgument(missing.name.clone()));
            }
        }

        let arguments = self
            .parameters
            .iter()
            .filter_map(|parameter| {
                values
                    .swap_remove(parameter.name.as_str())
                    .map(|value| (parameter.name.clone(), value))
            })
            .collect::<IndexMap<_, _>>();

        tracing::trace!(
            signature = %self,
            bound = arguments.len(),
            partial,
            "bound arguments"
        );

        Ok(BoundArguments { arguments })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.parameters.iter().join(", "))
    }
}

/// The result of binding arguments against a [`Signature`]: parameter names mapped to values, in
/// signature order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundArguments {
    arguments: IndexMap<String, Expression>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.arguments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Expression)> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Fill in the default of every parameter which has not been bound, keeping signature order.
    pub fn apply_defaults(&mut self, signature: &Signature) {
        let mut arguments = IndexMap::with_capacity(signature.len());
        for parameter in signature.parameters() {
            let value = self
                .arguments
                .swap_remove(&parameter.name)
                .or_else(|| parameter.default.clone());
            if let Some(value) = value {
                arguments.insert(parameter.name.clone(), value);
            }
        }
        self.arguments = arguments;
    }

    pub fn as_map(&self) -> &IndexMap<String, Expression> {
        &self.arguments
    }

    pub fn into_inner(self) -> IndexMap<String, Expression> {
        self.arguments
    }
}

impl<'a> IntoIterator for &'a BoundArguments {
    type Item = (&'a String, &'a Expression);
    type IntoIter = indexmap::map::Iter<'a, String, Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.arguments.iter()
    }
}
