//! Flag-string collection independent of any CLI framework.
//!
//! Tokens are classified by a three-state machine:
//!
//! * `Flags`: `--name[=value]` and `-s[=value]` are matched against the definitions.
//!   Unknown flags are recorded as errors and scanning continues. A bare `--` or the
//!   first positional token switches to `Arguments`.
//! * `FlagArgument`: the next token is the value of the pending flag, whatever it
//!   looks like.
//! * `Arguments`: every remaining token is positional.
//!
//! Values are kept per flag in the order given. A flag present without a value is
//! recorded as `None` so that it can be told apart from an empty string.

use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::{
    error::ParameterError,
    parameters::{
        ParameterDefinition, ParameterDefinitions, ParameterType, ParsedParameters,
        apply_defaults,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Flags,
    FlagArgument,
    Arguments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnknownFlag,
    MissingValue,
    UnexpectedArgument,
}

/// A non-fatal problem found while collecting tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub flag: String,
    pub parameter: Option<String>,
}

impl ParseError {
    fn unknown_flag(token: &str, flag: &str) -> Self {
        Self {
            kind: ParseErrorKind::UnknownFlag,
            message: format!("Unknown flag: {token}"),
            flag: flag.to_string(),
            parameter: None,
        }
    }
}

pub type FlagStrings = BTreeMap<String, Vec<Option<String>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectResult {
    pub flag_strings: FlagStrings,
    pub arguments: Vec<String>,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseResult {
    /// Flag values, with defaults filled in for flags that were not given.
    pub parsed_values: ParsedParameters,
    /// Values of the declared positional arguments.
    pub parsed_arguments: ParsedParameters,
    /// Positional tokens as given.
    pub arguments: Vec<String>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    flags: ParameterDefinitions,
    arguments: ParameterDefinitions,
}

impl Parser {
    pub fn new(flags: ParameterDefinitions) -> Self {
        Self {
            flags,
            arguments: ParameterDefinitions::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: ParameterDefinitions) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn flags(&self) -> &ParameterDefinitions {
        &self.flags
    }

    pub fn collect_strings(&self, args: &[String]) -> CollectResult {
        let mut result = CollectResult::default();
        let mut state = State::Flags;
        let mut pending: Option<&ParameterDefinition> = None;

        for arg in args {
            match state {
                State::Flags => {
                    if arg == "--" {
                        state = State::Arguments;
                        continue;
                    }
                    let (flag, definition) = if let Some(long) =
                        arg.strip_prefix("--").filter(|rest| !rest.is_empty())
                    {
                        let name = long.split('=').next().unwrap_or(long);
                        (long, self.flags.get(name))
                    } else if let Some(short) =
                        arg.strip_prefix('-').filter(|rest| !rest.is_empty())
                    {
                        let name = short.split('=').next().unwrap_or(short);
                        (short, self.flags.by_short(name))
                    } else {
                        result.arguments.push(arg.clone());
                        state = State::Arguments;
                        continue;
                    };
                    let Some(definition) = definition else {
                        let name = flag.split('=').next().unwrap_or(flag);
                        result.errors.push(ParseError::unknown_flag(arg, name));
                        continue;
                    };
                    let values = result
                        .flag_strings
                        .entry(definition.name.clone())
                        .or_default();
                    if let Some((_, value)) = flag.split_once('=') {
                        values.push(Some(value.to_string()));
                    } else if definition.ty == ParameterType::Bool {
                        values.push(None);
                    } else {
                        pending = Some(definition);
                        state = State::FlagArgument;
                    }
                }
                State::FlagArgument => {
                    if let Some(definition) = pending.take() {
                        result
                            .flag_strings
                            .entry(definition.name.clone())
                            .or_default()
                            .push(Some(arg.clone()));
                    }
                    state = State::Flags;
                }
                State::Arguments => result.arguments.push(arg.clone()),
            }
        }

        if let Some(definition) = pending {
            result
                .flag_strings
                .entry(definition.name.clone())
                .or_default()
                .push(None);
        }
        result
    }

    /// Collects, then converts every flag and positional value to its typed form.
    ///
    /// Unknown flags, flags lacking a value and surplus positionals are reported in
    /// [`ParseResult::errors`]. Malformed values and missing required parameters
    /// abort with an error.
    pub fn parse(&self, args: &[String]) -> Result<ParseResult, ParameterError> {
        self.parse_over(args, ParsedParameters::new())
    }

    /// Like [`Parser::parse`], but values in `base` fill in flags that were not given
    /// on the command line before defaults apply.
    pub fn parse_over(
        &self,
        args: &[String],
        base: ParsedParameters,
    ) -> Result<ParseResult, ParameterError> {
        let collected = self.collect_strings(args);
        let mut errors = collected.errors;
        let mut parsed_values = base;

        for (name, raw) in &collected.flag_strings {
            let Some(definition) = self.flags.get(name) else {
                continue;
            };
            let mut values = Vec::with_capacity(raw.len());
            for value in raw {
                match value {
                    Some(value) => values.push(value.clone()),
                    None if definition.ty == ParameterType::Bool => values.push("true".to_string()),
                    None => errors.push(ParseError {
                        kind: ParseErrorKind::MissingValue,
                        message: format!("missing value for flag: --{name}"),
                        flag: name.clone(),
                        parameter: Some(name.clone()),
                    }),
                }
            }
            if values.is_empty() {
                continue;
            }
            debug!("Flag '{name}' raw values: {values:?}");
            parsed_values.insert(name.clone(), definition.parse_parameter(&values)?);
        }
        apply_defaults(&self.flags, &mut parsed_values)?;

        let parsed_arguments = self.map_arguments(&collected.arguments, &mut errors)?;

        Ok(ParseResult {
            parsed_values,
            parsed_arguments,
            arguments: collected.arguments,
            errors,
        })
    }

    /// Assigns positionals to argument definitions in order; a list-typed last
    /// argument takes all remaining tokens.
    fn map_arguments(
        &self,
        positionals: &[String],
        errors: &mut Vec<ParseError>,
    ) -> Result<ParsedParameters, ParameterError> {
        let mut parsed = ParsedParameters::new();
        if self.arguments.is_empty() {
            return Ok(parsed);
        }
        let mut remaining = positionals;
        let count = self.arguments.len();
        for (idx, definition) in self.arguments.iter().enumerate() {
            if remaining.is_empty() {
                break;
            }
            let take = if definition.ty.is_list() && idx + 1 == count {
                remaining.len()
            } else {
                1
            };
            let (current, rest) = remaining.split_at(take);
            parsed.insert(
                definition.name.clone(),
                definition.parse_parameter(current)?,
            );
            remaining = rest;
        }
        for extra in remaining {
            errors.push(ParseError {
                kind: ParseErrorKind::UnexpectedArgument,
                message: format!("unexpected argument: {extra}"),
                flag: extra.clone(),
                parameter: None,
            });
        }
        apply_defaults(&self.arguments, &mut parsed)?;
        Ok(parsed)
    }
}
