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

use std::{
    f64::consts::PI,
    fmt,
    hash::{Hash, Hasher},
    num::NonZeroI32,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use indexmap::{IndexMap, IndexSet};
use internment::ArcIntern;
use lexical::{format, to_string_with_options, WriteFloatOptions};
use num_complex::Complex64;
use once_cell::sync::Lazy;

use crate::{floating_point_eq, imag, parser, real};

pub use crate::parser::ParseError;

/// The different possible types of errors that could occur during expression evaluation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("There wasn't enough information to completely evaluate the expression.")]
    Incomplete,
    #[error("The operation expected a real number but received a complex one.")]
    NumberNotReal,
    #[error("The operation expected a number but received a different type of expression.")]
    NotANumber,
}

/// A parameter expression, as found in instruction operands and pulse parameters.
///
/// A [`Expression::Variable`] is an *unbound* parameter: a name which a calibration entry may
/// later replace with a value. Every other leaf is a bound value.
///
/// Child expressions are shared through [`ArcIntern`]s, so cloning and comparing large
/// expressions is cheap and sub-expressions are immutable.
///
/// Note that when comparing expressions, any embedded NaNs are treated as *equal* to other
/// NaNs, not unequal, in contravention of the IEEE 754 spec.
#[derive(Clone, Debug)]
pub enum Expression {
    FunctionCall(FunctionCallExpression),
    Infix(InfixExpression),
    Number(Complex64),
    PiConstant,
    Prefix(PrefixExpression),
    Variable(String),
}

/// The type of function call expressions, e.g. `sin(e)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionCallExpression {
    pub function: ExpressionFunction,
    pub expression: ArcIntern<Expression>,
}

impl FunctionCallExpression {
    pub fn new(function: ExpressionFunction, expression: ArcIntern<Expression>) -> Self {
        Self {
            function,
            expression,
        }
    }
}

/// The type of infix expressions, e.g. `e1 + e2`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InfixExpression {
    pub left: ArcIntern<Expression>,
    pub operator: InfixOperator,
    pub right: ArcIntern<Expression>,
}

impl InfixExpression {
    pub fn new(
        left: ArcIntern<Expression>,
        operator: InfixOperator,
        right: ArcIntern<Expression>,
    ) -> Self {
        Self {
            left,
            operator,
            right,
        }
    }
}

/// The type of prefix expressions, e.g. `-e`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrefixExpression {
    pub operator: PrefixOperator,
    pub expression: ArcIntern<Expression>,
}

impl PrefixExpression {
    pub fn new(operator: PrefixOperator, expression: ArcIntern<Expression>) -> Self {
        Self {
            operator,
            expression,
        }
    }
}

impl PartialEq for Expression {
    // Implemented by hand since we can't derive with f64s hidden inside.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::FunctionCall(left), Self::FunctionCall(right)) => left == right,
            (Self::Infix(left), Self::Infix(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => {
                floating_point_eq::complex64::eq(*left, *right)
            }
            (Self::PiConstant, Self::PiConstant) => true,
            (Self::Prefix(left), Self::Prefix(right)) => left == right,
            (Self::Variable(left), Self::Variable(right)) => left == right,

            // This explicit or-pattern ensures that we'll get a compilation error if
            // `Expression` grows another constructor.
            (
                Self::FunctionCall(_)
                | Self::Infix(_)
                | Self::Number(_)
                | Self::PiConstant
                | Self::Prefix(_)
                | Self::Variable(_),
                _,
            ) => false,
        }
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::FunctionCall(FunctionCallExpression {
                function,
                expression,
            }) => {
                "FunctionCall".hash(state);
                function.hash(state);
                expression.hash(state);
            }
            Self::Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                "Infix".hash(state);
                operator.hash(state);
                left.hash(state);
                right.hash(state);
            }
            Self::Number(n) => {
                "Number".hash(state);
                floating_point_eq::complex64::hash(*n, state);
            }
            Self::PiConstant => {
                "PiConstant".hash(state);
            }
            Self::Prefix(p) => {
                "Prefix".hash(state);
                p.operator.hash(state);
                p.expression.hash(state);
            }
            Self::Variable(v) => {
                "Variable".hash(state);
                v.hash(state);
            }
        }
    }
}

macro_rules! impl_expr_op {
    ($name:ident, $name_assign:ident, $function:ident, $function_assign:ident, $operator:ident) => {
        impl $name for Expression {
            type Output = Self;
            fn $function(self, other: Self) -> Self {
                Self::Infix(InfixExpression {
                    left: ArcIntern::new(self),
                    operator: InfixOperator::$operator,
                    right: ArcIntern::new(other),
                })
            }
        }

        impl $name_assign for Expression {
            fn $function_assign(&mut self, other: Self) {
                // Move out of self to avoid potentially cloning a large value
                let temp = ::std::mem::replace(self, Self::PiConstant);
                *self = temp.$function(other);
            }
        }
    };
}

impl_expr_op!(Add, AddAssign, add, add_assign, Plus);
impl_expr_op!(Sub, SubAssign, sub, sub_assign, Minus);
impl_expr_op!(Mul, MulAssign, mul, mul_assign, Star);
impl_expr_op!(Div, DivAssign, div, div_assign, Slash);

impl Neg for Expression {
    type Output = Self;

    fn neg(self) -> Self {
        Expression::Prefix(PrefixExpression {
            operator: PrefixOperator::Minus,
            expression: ArcIntern::new(self),
        })
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::Number(real!(value))
    }
}

impl From<Complex64> for Expression {
    fn from(value: Complex64) -> Self {
        Self::Number(value)
    }
}

/// Compute the result of an infix expression where both operands are complex.
#[inline]
pub(crate) fn calculate_infix(
    left: Complex64,
    operator: InfixOperator,
    right: Complex64,
) -> Complex64 {
    use InfixOperator::*;
    match operator {
        Caret => left.powc(right),
        Plus => left + right,
        Minus => left - right,
        Slash => left / right,
        Star => left * right,
    }
}

/// Compute the result of an expression function where the operand is complex.
#[inline]
pub(crate) fn calculate_function(function: ExpressionFunction, argument: Complex64) -> Complex64 {
    use ExpressionFunction::*;
    match function {
        Sine => argument.sin(),
        Cis => argument.cos() + imag!(1f64) * argument.sin(),
        Cosine => argument.cos(),
        Exponent => argument.exp(),
        SquareRoot => argument.sqrt(),
    }
}

/// Is this a small floating point number?
#[inline(always)]
fn is_small(x: f64) -> bool {
    x.abs() < 1e-16
}

impl Expression {
    /// Create an unbound parameter with the given name.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Return the names of all variables (unbound parameters) referenced by this expression, in
    /// order of first appearance.
    pub fn variables(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.extend_variables(&mut names);
        names
    }

    pub(crate) fn extend_variables(&self, names: &mut IndexSet<String>) {
        match self {
            Expression::FunctionCall(FunctionCallExpression { expression, .. })
            | Expression::Prefix(PrefixExpression { expression, .. }) => {
                expression.extend_variables(names)
            }
            Expression::Infix(InfixExpression { left, right, .. }) => {
                left.extend_variables(names);
                right.extend_variables(names);
            }
            Expression::Variable(name) => {
                if !names.contains(name) {
                    names.insert(name.clone());
                }
            }
            Expression::Number(_) | Expression::PiConstant => {}
        }
    }

    /// Whether any unbound parameter remains in this expression.
    pub fn is_parameterized(&self) -> bool {
        match self {
            Expression::FunctionCall(FunctionCallExpression { expression, .. })
            | Expression::Prefix(PrefixExpression { expression, .. }) => {
                expression.is_parameterized()
            }
            Expression::Infix(InfixExpression { left, right, .. }) => {
                left.is_parameterized() || right.is_parameterized()
            }
            Expression::Variable(_) => true,
            Expression::Number(_) | Expression::PiConstant => false,
        }
    }

    /// Simplify the expression as much as possible, in-place.
    ///
    /// Every sub-expression which does not reference a variable is folded into a single number.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pulsecal_rs::expression::Expression;
    /// use std::str::FromStr;
    /// use num_complex::Complex64;
    ///
    /// let mut expression = Expression::from_str("cos(2 * pi) + 2").unwrap();
    /// expression.simplify();
    ///
    /// assert_eq!(expression, Expression::Number(Complex64::from(3.0)));
    /// ```
    pub fn simplify(&mut self) {
        match self {
            Expression::Number(_) | Expression::Variable(_) => {}
            Expression::PiConstant => {
                *self = Expression::Number(real!(PI));
            }
            _ => *self = self.simplified(),
        }
    }

    /// Consume the expression, simplifying it as much as possible.
    pub fn into_simplified(mut self) -> Self {
        self.simplify();
        self
    }

    fn simplified(&self) -> Self {
        match self {
            Expression::FunctionCall(FunctionCallExpression {
                function,
                expression,
            }) => match expression.simplified() {
                Expression::Number(value) => {
                    Expression::Number(calculate_function(*function, value))
                }
                other => Expression::FunctionCall(FunctionCallExpression::new(
                    *function,
                    ArcIntern::new(other),
                )),
            },
            Expression::Infix(InfixExpression {
                left,
                operator,
                right,
            }) => match (left.simplified(), right.simplified()) {
                (Expression::Number(left), Expression::Number(right)) => {
                    Expression::Number(calculate_infix(left, *operator, right))
                }
                (left, right) => Expression::Infix(InfixExpression::new(
                    ArcIntern::new(left),
                    *operator,
                    ArcIntern::new(right),
                )),
            },
            Expression::Prefix(PrefixExpression {
                operator,
                expression,
            }) => match (operator, expression.simplified()) {
                (PrefixOperator::Plus, inner) => inner,
                (PrefixOperator::Minus, Expression::Number(value)) => Expression::Number(-value),
                (PrefixOperator::Minus, inner) => Expression::Prefix(PrefixExpression::new(
                    PrefixOperator::Minus,
                    ArcIntern::new(inner),
                )),
            },
            Expression::PiConstant => Expression::Number(real!(PI)),
            Expression::Number(_) | Expression::Variable(_) => self.clone(),
        }
    }

    /// Evaluate an expression, expecting that it may be fully reduced to a single complex number.
    /// If it cannot be reduced to a complex number, return an error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pulsecal_rs::expression::Expression;
    /// use std::str::FromStr;
    /// use indexmap::IndexMap;
    /// use num_complex::Complex64;
    ///
    /// let expression = Expression::from_str("beta + 2").unwrap();
    ///
    /// let mut variables = IndexMap::new();
    /// variables.insert(String::from("beta"), Complex64::from(1.0));
    ///
    /// assert_eq!(expression.evaluate(&variables).unwrap(), Complex64::from(3.0))
    /// ```
    pub fn evaluate(
        &self,
        variables: &IndexMap<String, Complex64>,
    ) -> Result<Complex64, EvaluationError> {
        use Expression::*;

        match self {
            FunctionCall(FunctionCallExpression {
                function,
                expression,
            }) => {
                let evaluated = expression.evaluate(variables)?;
                Ok(calculate_function(*function, evaluated))
            }
            Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                let left_evaluated = left.evaluate(variables)?;
                let right_evaluated = right.evaluate(variables)?;
                Ok(calculate_infix(left_evaluated, *operator, right_evaluated))
            }
            Prefix(PrefixExpression {
                operator,
                expression,
            }) => {
                let value = expression.evaluate(variables)?;
                if matches!(operator, PrefixOperator::Minus) {
                    Ok(-value)
                } else {
                    Ok(value)
                }
            }
            Variable(identifier) => variables
                .get(identifier)
                .copied()
                .ok_or(EvaluationError::Incomplete),
            PiConstant => Ok(real!(PI)),
            Number(number) => Ok(*number),
        }
    }

    /// Substitute an expression in the place of each matching variable.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pulsecal_rs::expression::Expression;
    /// use std::str::FromStr;
    /// use indexmap::IndexMap;
    ///
    /// let expression = Expression::from_str("x + y").unwrap();
    ///
    /// let mut values = IndexMap::new();
    /// values.insert(String::from("x"), Expression::from(1.0));
    ///
    /// let substituted = expression.substitute_variables(&values);
    ///
    /// assert_eq!(substituted, Expression::from_str("1.0 + y").unwrap())
    /// ```
    #[must_use]
    pub fn substitute_variables(&self, variable_values: &IndexMap<String, Expression>) -> Self {
        use Expression::*;

        match self {
            FunctionCall(FunctionCallExpression {
                function,
                expression,
            }) => FunctionCall(FunctionCallExpression {
                function: *function,
                expression: expression.substitute_variables(variable_values).into(),
            }),
            Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                let left = left.substitute_variables(variable_values).into();
                let right = right.substitute_variables(variable_values).into();
                Infix(InfixExpression {
                    left,
                    operator: *operator,
                    right,
                })
            }
            Prefix(PrefixExpression {
                operator,
                expression,
            }) => Prefix(PrefixExpression {
                operator: *operator,
                expression: expression.substitute_variables(variable_values).into(),
            }),
            Variable(identifier) => match variable_values.get(identifier) {
                Some(value) => value.clone(),
                None => Variable(identifier.clone()),
            },
            other => other.clone(),
        }
    }

    /// If this is a number with imaginary part "equal to" zero (of _small_ absolute value), return
    /// that number. Otherwise, error with an evaluation error of a descriptive type.
    pub fn to_real(&self) -> Result<f64, EvaluationError> {
        match self {
            Expression::PiConstant => Ok(PI),
            Expression::Number(x) if is_small(x.im) => Ok(x.re),
            Expression::Number(_) => Err(EvaluationError::NumberNotReal),
            _ => Err(EvaluationError::NotANumber),
        }
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_expression(s)
    }
}

static FORMAT_REAL_OPTIONS: Lazy<WriteFloatOptions> = Lazy::new(|| {
    WriteFloatOptions::builder()
        .negative_exponent_break(NonZeroI32::new(-5))
        .positive_exponent_break(NonZeroI32::new(15))
        .trim_floats(true)
        .build()
        .expect("options are valid")
});

static FORMAT_IMAGINARY_OPTIONS: Lazy<WriteFloatOptions> = Lazy::new(|| {
    WriteFloatOptions::builder()
        .negative_exponent_break(NonZeroI32::new(-5))
        .positive_exponent_break(NonZeroI32::new(15))
        .trim_floats(false)
        .build()
        .expect("options are valid")
});

/// Format a complex value, omitting the real or imaginary part when it is zero.
#[inline(always)]
pub(crate) fn format_complex(value: &Complex64) -> String {
    const FORMAT: u128 = format::STANDARD;
    if value.re == 0f64 && value.im == 0f64 {
        "0".to_owned()
    } else if value.im == 0f64 {
        to_string_with_options::<_, FORMAT>(value.re, &FORMAT_REAL_OPTIONS)
    } else if value.re == 0f64 {
        to_string_with_options::<_, FORMAT>(value.im, &FORMAT_IMAGINARY_OPTIONS) + "i"
    } else {
        let mut out = to_string_with_options::<_, FORMAT>(value.re, &FORMAT_REAL_OPTIONS);
        if value.im > 0f64 {
            out.push('+')
        }
        out.push_str(&to_string_with_options::<_, FORMAT>(
            value.im,
            &FORMAT_IMAGINARY_OPTIONS,
        ));
        out.push('i');
        out
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Expression::*;
        match self {
            FunctionCall(FunctionCallExpression {
                function,
                expression,
            }) => write!(f, "{function}({expression})"),
            Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                format_inner_expression(f, left)?;
                write!(f, "{operator}")?;
                format_inner_expression(f, right)
            }
            Number(value) => write!(f, "{}", format_complex(value)),
            PiConstant => write!(f, "pi"),
            Prefix(PrefixExpression {
                operator,
                expression,
            }) => {
                write!(f, "{operator}")?;
                format_inner_expression(f, expression)
            }
            Variable(identifier) => write!(f, "{identifier}"),
        }
    }
}

/// Wrap infix sub-expressions in parentheses, so that precedence survives a round trip.
fn format_inner_expression(f: &mut fmt::Formatter, expression: &Expression) -> fmt::Result {
    match expression {
        Expression::Infix(InfixExpression {
            left,
            operator,
            right,
        }) => {
            write!(f, "(")?;
            format_inner_expression(f, left)?;
            write!(f, "{operator}")?;
            format_inner_expression(f, right)?;
            write!(f, ")")
        }
        _ => write!(f, "{expression}"),
    }
}

/// A function which may be called within an expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExpressionFunction {
    Cis,
    Cosine,
    Exponent,
    Sine,
    SquareRoot,
}

impl fmt::Display for ExpressionFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ExpressionFunction::*;
        write!(
            f,
            "{}",
            match self {
                Cis => "cis",
                Cosine => "cos",
                Exponent => "exp",
                Sine => "sin",
                SquareRoot => "sqrt",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    Plus,
    Minus,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PrefixOperator::*;
        write!(
            f,
            "{}",
            match self {
                Plus => "",
                Minus => "-",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InfixOperator {
    Caret,
    Plus,
    Minus,
    Slash,
    Star,
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InfixOperator::*;
        write!(
            f,
            "{}",
            match self {
                Caret => "^",
                Plus => "+",
                Minus => " - ",
                Slash => "/",
                Star => "*",
            }
        )
    }
}
