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

use internment::ArcIntern;
use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, multispace0, one_of, satisfy},
    combinator::{map, map_res, not, opt, recognize},
    multi::fold_many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated},
};

use crate::expression::{
    Expression, ExpressionFunction, FunctionCallExpression, InfixExpression, InfixOperator,
    PrefixExpression, PrefixOperator,
};
use crate::{imag, real};

use super::{InternalParserResult, ParserInput};

/// Allow whitespace on either side of `inner`.
fn ws<'a, O, F>(inner: F) -> impl FnMut(ParserInput<'a>) -> InternalParserResult<'a, O>
where
    F: FnMut(ParserInput<'a>) -> InternalParserResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
    Expression::Infix(InfixExpression::new(
        ArcIntern::new(left),
        operator,
        ArcIntern::new(right),
    ))
}

fn prefix(operator: PrefixOperator, expression: Expression) -> Expression {
    Expression::Prefix(PrefixExpression::new(operator, ArcIntern::new(expression)))
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse an expression at the head of the input, for as long as the expression continues.
///
/// Precedence, from loosest to tightest: `+ -`, `* /`, unary `-`, `^` (right-associative).
pub(super) fn parse_expression(input: ParserInput) -> InternalParserResult<Expression> {
    parse_sum(input)
}

fn parse_sum(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, first) = parse_product(input)?;
    fold_many0(
        pair(ws(one_of("+-")), parse_product),
        move || first.clone(),
        |left, (operator, right)| {
            let operator = match operator {
                '+' => InfixOperator::Plus,
                _ => InfixOperator::Minus,
            };
            infix(left, operator, right)
        },
    )(input)
}

fn parse_product(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, first) = parse_unary(input)?;
    fold_many0(
        pair(ws(one_of("*/")), parse_unary),
        move || first.clone(),
        |left, (operator, right)| {
            let operator = match operator {
                '*' => InfixOperator::Star,
                _ => InfixOperator::Slash,
            };
            infix(left, operator, right)
        },
    )(input)
}

fn parse_unary(input: ParserInput) -> InternalParserResult<Expression> {
    alt((
        map(preceded(ws(char('-')), parse_unary), |expression| {
            prefix(PrefixOperator::Minus, expression)
        }),
        map(preceded(ws(char('+')), parse_unary), |expression| {
            prefix(PrefixOperator::Plus, expression)
        }),
        parse_power,
    ))(input)
}

fn parse_power(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, base) = parse_atom(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), parse_unary))(input)?;
    Ok((
        input,
        match exponent {
            Some(exponent) => infix(base, InfixOperator::Caret, exponent),
            None => base,
        },
    ))
}

fn parse_atom(input: ParserInput) -> InternalParserResult<Expression> {
    ws(alt((
        delimited(char('('), parse_sum, char(')')),
        parse_identifier_expression,
        parse_number,
    )))(input)
}

fn parse_identifier(input: ParserInput) -> InternalParserResult<&str> {
    recognize(pair(
        satisfy(is_identifier_start),
        take_while(is_identifier_char),
    ))(input)
}

/// Identifiers have to be handled specially because some have special meaning:
/// function names, `pi`, and the imaginary unit `i`. Anything else is a variable.
fn parse_identifier_expression(input: ParserInput) -> InternalParserResult<Expression> {
    let (remainder, name) = parse_identifier(input)?;
    match name.to_lowercase().as_str() {
        "cis" => parse_function_call(remainder, ExpressionFunction::Cis),
        "cos" => parse_function_call(remainder, ExpressionFunction::Cosine),
        "exp" => parse_function_call(remainder, ExpressionFunction::Exponent),
        "sin" => parse_function_call(remainder, ExpressionFunction::Sine),
        "sqrt" => parse_function_call(remainder, ExpressionFunction::SquareRoot),
        "i" => Ok((remainder, Expression::Number(imag!(1f64)))),
        "pi" => Ok((remainder, Expression::PiConstant)),
        _ => Ok((remainder, Expression::Variable(name.to_owned()))),
    }
}

fn parse_function_call(
    input: ParserInput,
    function: ExpressionFunction,
) -> InternalParserResult<Expression> {
    map(
        delimited(ws(char('(')), parse_sum, char(')')),
        move |expression| {
            Expression::FunctionCall(FunctionCallExpression::new(
                function,
                ArcIntern::new(expression),
            ))
        },
    )(input)
}

/// A real or imaginary literal, such as `2`, `1.5e-3` or `0.5i`.
fn parse_number(input: ParserInput) -> InternalParserResult<Expression> {
    let (input, value) = map_res(recognize_float, str::parse::<f64>)(input)?;
    let (input, imaginary) = opt(terminated(char('i'), not(satisfy(is_identifier_char))))(input)?;
    Ok((
        input,
        match imaginary {
            Some(_) => Expression::Number(imag!(value)),
            None => Expression::Number(real!(value)),
        },
    ))
}
