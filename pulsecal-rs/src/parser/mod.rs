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

//! Parsing of the parameter expressions embedded in serialized instructions.

mod expression;

use crate::expression::Expression;

type ParserInput<'a> = &'a str;
type InternalParserResult<'a, R> = nom::IResult<ParserInput<'a>, R>;

/// Errors which may occur while parsing an [`Expression`] from text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected an expression in {input:?}, found {found:?}")]
    Syntax { input: String, found: String },
    #[error("unexpected trailing input {remainder:?} after expression in {input:?}")]
    Leftover { input: String, remainder: String },
}

/// Parse the whole of `input` as an expression.
pub(crate) fn parse_expression(input: &str) -> Result<Expression, ParseError> {
    match expression::parse_expression(input) {
        Ok((remainder, parsed)) => {
            let remainder = remainder.trim();
            if remainder.is_empty() {
                Ok(parsed)
            } else {
                Err(ParseError::Leftover {
                    input: input.to_owned(),
                    remainder: remainder.to_owned(),
                })
            }
        }
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => Err(ParseError::Syntax {
            input: input.to_owned(),
            found: error.input.to_owned(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::Syntax {
            input: input.to_owned(),
            found: String::new(),
        }),
    }
}
