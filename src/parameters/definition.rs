//! A single named, typed parameter: validity checks, defaults and raw-string parsing.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value as JsonValue};

use super::{
    ParameterType, ParameterValue,
    files::{self, FileData},
};
use crate::{data::parse_date_value, error::ParameterError};

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub ty: ParameterType,
    pub short_flag: Option<String>,
    pub default: Option<ParameterValue>,
    pub choices: Vec<String>,
    pub required: bool,
    pub help: String,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
            short_flag: None,
            default: None,
            choices: Vec::new(),
            required: false,
            help: String::new(),
        }
    }

    pub fn with_short_flag(mut self, short: impl Into<String>) -> Self {
        self.short_flag = Some(short.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<ParameterValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Checks that the declared default satisfies this definition.
    pub fn validate(&self) -> Result<(), ParameterError> {
        match &self.default {
            Some(default) => {
                self.check_value_validity(default)
                    .map_err(|source| ParameterError::InvalidDefault {
                        name: self.name.clone(),
                        source: Box::new(source),
                    })
            }
            None => Ok(()),
        }
    }

    /// Structural type check of `value` against the declared type, followed by the
    /// membership check for choice kinds.
    pub fn check_value_validity(&self, value: &ParameterValue) -> Result<(), ParameterError> {
        if !matches_type(self.ty, value) {
            return Err(ParameterError::InvalidValueType {
                name: self.name.clone(),
                expected: self.ty,
                found: value.kind(),
            });
        }
        match (self.ty, value) {
            (ParameterType::Choice, ParameterValue::String(choice)) => self.check_choice(choice),
            (ParameterType::ChoiceList, ParameterValue::StringList(selected)) => selected
                .iter()
                .try_for_each(|choice| self.check_choice(choice)),
            _ => Ok(()),
        }
    }

    fn check_choice(&self, choice: &str) -> Result<(), ParameterError> {
        if self.choices.iter().any(|c| c == choice) {
            Ok(())
        } else {
            Err(ParameterError::InvalidChoice {
                name: self.name.clone(),
                value: choice.to_string(),
                choices: self.choices.clone(),
            })
        }
    }

    /// The declared default, or the zero value of the type when none is set.
    pub fn default_value(&self) -> ParameterValue {
        match &self.default {
            Some(default) => normalize(self.ty, default.clone()),
            None => ParameterValue::zero(self.ty),
        }
    }

    /// Writes the default (or the zero value) into `destination`, replacing whatever
    /// it held before. An invalid default is rejected and `destination` is untouched.
    pub fn set_value_from_default<T: ParameterTarget>(
        &self,
        destination: &mut T,
    ) -> Result<(), ParameterError> {
        self.validate()?;
        *destination = T::from_parameter(&self.name, self.default_value())?;
        Ok(())
    }

    /// Converts raw strings into the typed value of this parameter. Scalar kinds use
    /// the last raw value; file-sourced kinds read their files here.
    pub fn parse_parameter(&self, raw: &[String]) -> Result<ParameterValue, ParameterError> {
        let name = self.name.as_str();
        if raw.is_empty() {
            if self.ty.is_list() {
                return Ok(ParameterValue::zero(self.ty));
            }
            return Err(ParameterError::parse(name, "", "no value given"));
        }
        let last = raw[raw.len() - 1].as_str();
        let value = match self.ty {
            ParameterType::String => ParameterValue::String(last.to_string()),
            ParameterType::StringFromFile => ParameterValue::String(files::read_text(name, last)?),
            ParameterType::StringFromFiles => {
                let mut content = String::new();
                for path in raw {
                    content.push_str(&files::read_text(name, path)?);
                }
                ParameterValue::String(content)
            }
            ParameterType::File => ParameterValue::File(files::load_file_data(name, last)?),
            ParameterType::FileList => ParameterValue::FileList(
                raw.iter()
                    .map(|path| files::load_file_data(name, path))
                    .collect::<Result<_, _>>()?,
            ),
            ParameterType::ObjectFromFile => {
                ParameterValue::Object(files::load_object(name, last)?)
            }
            ParameterType::ObjectListFromFile | ParameterType::ObjectListFromFiles => {
                let mut objects = Vec::new();
                for path in raw {
                    objects.extend(files::load_object_list(name, path)?);
                }
                ParameterValue::ObjectList(objects)
            }
            ParameterType::StringListFromFile | ParameterType::StringListFromFiles => {
                let mut lines = Vec::new();
                for path in raw {
                    lines.extend(files::load_lines(name, path)?);
                }
                ParameterValue::StringList(lines)
            }
            ParameterType::KeyValue => ParameterValue::KeyValue(self.parse_key_values(raw)?),
            ParameterType::Integer => ParameterValue::Integer(parse_integer(name, last)?),
            ParameterType::Float => ParameterValue::Float(parse_float(name, last)?),
            ParameterType::Bool => ParameterValue::Bool(parse_bool(name, last)?),
            ParameterType::Date => ParameterValue::Date(
                parse_date_value(last)
                    .map_err(|err| ParameterError::parse(name, last, err.to_string()))?,
            ),
            ParameterType::StringList => ParameterValue::StringList(split_all(raw)),
            ParameterType::IntegerList => ParameterValue::IntegerList(
                split_all(raw)
                    .iter()
                    .map(|item| parse_integer(name, item))
                    .collect::<Result<_, _>>()?,
            ),
            ParameterType::FloatList => ParameterValue::FloatList(
                split_all(raw)
                    .iter()
                    .map(|item| parse_float(name, item))
                    .collect::<Result<_, _>>()?,
            ),
            ParameterType::Choice => {
                self.parse_choice(last)?;
                ParameterValue::String(last.to_string())
            }
            ParameterType::ChoiceList => {
                let selected = split_all(raw);
                for choice in &selected {
                    self.parse_choice(choice)?;
                }
                ParameterValue::StringList(selected)
            }
        };
        Ok(value)
    }

    /// Converts a structured value (from YAML defaults or a typed map) and validates it.
    /// Strings are coerced through [`Self::parse_parameter`] for every kind that is not
    /// a plain string, so `"9"` is accepted for an integer and `"@vars.yaml"` is loaded.
    pub fn value_from_json(&self, value: &JsonValue) -> Result<ParameterValue, ParameterError> {
        let parsed = match value {
            JsonValue::String(raw)
                if !matches!(self.ty, ParameterType::String | ParameterType::Choice) =>
            {
                self.parse_parameter(std::slice::from_ref(raw))?
            }
            JsonValue::Array(items)
                if self.ty.loads_files() && items.iter().all(JsonValue::is_string) =>
            {
                let raw: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                self.parse_parameter(&raw)?
            }
            _ => ParameterValue::from_json(self.ty, &self.name, value)?,
        };
        self.check_value_validity(&parsed)?;
        Ok(normalize(self.ty, parsed))
    }

    fn parse_choice(&self, raw: &str) -> Result<(), ParameterError> {
        if self.choices.iter().any(|c| c == raw) {
            Ok(())
        } else {
            Err(ParameterError::parse(
                &self.name,
                raw,
                format!("must be one of: {}", self.choices.join(", ")),
            ))
        }
    }

    fn parse_key_values(&self, raw: &[String]) -> Result<BTreeMap<String, String>, ParameterError> {
        let mut map = BTreeMap::new();
        for value in raw {
            if self.ty.is_file_loading(value) {
                map.extend(files::load_string_map(&self.name, value)?);
                continue;
            }
            for pair in split_key_value_pairs(value) {
                let (key, val) = pair.split_once(':').ok_or_else(|| {
                    ParameterError::parse(&self.name, &pair, "expected key:value")
                })?;
                map.insert(key.trim().to_string(), val.trim().to_string());
            }
        }
        Ok(map)
    }
}

fn matches_type(ty: ParameterType, value: &ParameterValue) -> bool {
    use ParameterType as T;
    use ParameterValue as V;
    match ty {
        T::String | T::StringFromFile | T::StringFromFiles | T::Choice => {
            matches!(value, V::String(_))
        }
        T::Integer => matches!(value, V::Integer(_)),
        T::Float => matches!(value, V::Float(_) | V::Integer(_)),
        T::Bool => matches!(value, V::Bool(_)),
        T::Date => match value {
            V::Date(_) => true,
            V::String(raw) => parse_date_value(raw).is_ok(),
            _ => false,
        },
        T::StringList | T::ChoiceList | T::StringListFromFile | T::StringListFromFiles => {
            matches!(value, V::StringList(_))
        }
        T::IntegerList => matches!(value, V::IntegerList(_)),
        T::FloatList => matches!(value, V::FloatList(_) | V::IntegerList(_)),
        T::KeyValue => matches!(value, V::KeyValue(_)),
        T::ObjectFromFile => matches!(value, V::Object(_)),
        T::ObjectListFromFile | T::ObjectListFromFiles => matches!(value, V::ObjectList(_)),
        T::File => matches!(value, V::File(_)),
        T::FileList => matches!(value, V::FileList(_)),
    }
}

/// Brings a valid value into the canonical variant for `ty`.
pub(crate) fn normalize(ty: ParameterType, value: ParameterValue) -> ParameterValue {
    match (ty, value) {
        (ParameterType::Float, ParameterValue::Integer(i)) => ParameterValue::Float(i as f64),
        (ParameterType::FloatList, ParameterValue::IntegerList(items)) => {
            ParameterValue::FloatList(items.into_iter().map(|i| i as f64).collect())
        }
        (ParameterType::Date, ParameterValue::String(raw)) => match parse_date_value(&raw) {
            Ok(date) => ParameterValue::Date(date),
            Err(_) => ParameterValue::String(raw),
        },
        (_, value) => value,
    }
}

/// Splits a list flag value: surrounding brackets are trimmed and items are separated
/// by commas. Empty items are dropped.
pub fn split_list_value(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits `a:1,b:2` into pairs. Commas inside `{{ }}` or double quotes belong to the
/// value, so `c:{{ default(a, "x") }}` stays one pair.
fn split_key_value_pairs(raw: &str) -> Vec<String> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut chars = raw.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => quoted = !quoted,
            '{' if !quoted && chars.peek() == Some(&'{') => {
                chars.next();
                depth += 1;
                current.push_str("{{");
                continue;
            }
            '}' if !quoted && depth > 0 && chars.peek() == Some(&'}') => {
                chars.next();
                depth -= 1;
                current.push_str("}}");
                continue;
            }
            ',' if !quoted && depth == 0 => {
                pairs.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    pairs.push(current);
    pairs
        .into_iter()
        .map(|pair| pair.trim().to_string())
        .filter(|pair| !pair.is_empty())
        .collect()
}

fn split_all(raw: &[String]) -> Vec<String> {
    raw.iter().flat_map(|value| split_list_value(value)).collect()
}

fn parse_integer(name: &str, raw: &str) -> Result<i64, ParameterError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| ParameterError::parse(name, raw, err.to_string()))
}

fn parse_float(name: &str, raw: &str) -> Result<f64, ParameterError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|err| ParameterError::parse(name, raw, err.to_string()))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ParameterError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(ParameterError::parse(name, raw, "expected a boolean")),
    }
}

/// A destination that a parameter value can be written into.
pub trait ParameterTarget: Sized {
    const TARGET: &'static str;

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError>;
}

fn incompatible(name: &str, target: &'static str, reason: impl Into<String>) -> ParameterError {
    ParameterError::IncompatibleTarget {
        name: name.to_string(),
        target,
        reason: reason.into(),
    }
}

fn wrong_kind(name: &str, target: &'static str, value: &ParameterValue) -> ParameterError {
    incompatible(name, target, format!("cannot hold a {} value", value.kind()))
}

macro_rules! integer_target {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParameterTarget for $ty {
                const TARGET: &'static str = stringify!($ty);

                fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
                    match value {
                        ParameterValue::Integer(i) => <$ty>::try_from(i).map_err(|_| {
                            incompatible(name, Self::TARGET, format!("{i} is out of range"))
                        }),
                        other => Err(wrong_kind(name, Self::TARGET, &other)),
                    }
                }
            }
        )*
    };
}

integer_target!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ParameterTarget for f64 {
    const TARGET: &'static str = "f64";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        value
            .as_f64()
            .ok_or_else(|| wrong_kind(name, Self::TARGET, &value))
    }
}

impl ParameterTarget for f32 {
    const TARGET: &'static str = "f32";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        let wide = value
            .as_f64()
            .ok_or_else(|| wrong_kind(name, Self::TARGET, &value))?;
        if wide.is_finite() && wide.abs() > f32::MAX as f64 {
            return Err(incompatible(
                name,
                Self::TARGET,
                format!("{wide} is out of range"),
            ));
        }
        Ok(wide as f32)
    }
}

impl ParameterTarget for bool {
    const TARGET: &'static str = "bool";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        value
            .as_bool()
            .ok_or_else(|| wrong_kind(name, Self::TARGET, &value))
    }
}

impl ParameterTarget for String {
    const TARGET: &'static str = "string";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        match value {
            ParameterValue::String(s) => Ok(s),
            other => Err(wrong_kind(name, Self::TARGET, &other)),
        }
    }
}

impl ParameterTarget for NaiveDateTime {
    const TARGET: &'static str = "datetime";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        match value {
            ParameterValue::Date(date) => Ok(date),
            ParameterValue::String(raw) => parse_date_value(&raw)
                .map_err(|err| ParameterError::parse(name, &raw, err.to_string())),
            other => Err(wrong_kind(name, Self::TARGET, &other)),
        }
    }
}

impl ParameterTarget for NaiveDate {
    const TARGET: &'static str = "date";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        NaiveDateTime::from_parameter(name, value).map(|datetime| datetime.date())
    }
}

impl ParameterTarget for BTreeMap<String, String> {
    const TARGET: &'static str = "string map";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        match value {
            ParameterValue::KeyValue(map) => Ok(map),
            other => Err(wrong_kind(name, Self::TARGET, &other)),
        }
    }
}

impl ParameterTarget for HashMap<String, String> {
    const TARGET: &'static str = "string map";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        BTreeMap::from_parameter(name, value).map(|map| map.into_iter().collect())
    }
}

impl ParameterTarget for Map<String, JsonValue> {
    const TARGET: &'static str = "object";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        match value {
            ParameterValue::Object(map) => Ok(map),
            other => Err(wrong_kind(name, Self::TARGET, &other)),
        }
    }
}

impl ParameterTarget for FileData {
    const TARGET: &'static str = "file";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        match value {
            ParameterValue::File(file) => Ok(file),
            other => Err(wrong_kind(name, Self::TARGET, &other)),
        }
    }
}

/// Lists are written element by element, so any scalar target also works as a list.
impl<T: ParameterTarget> ParameterTarget for Vec<T> {
    const TARGET: &'static str = "list";

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        let items: Vec<ParameterValue> = match value {
            ParameterValue::StringList(items) => {
                items.into_iter().map(ParameterValue::String).collect()
            }
            ParameterValue::IntegerList(items) => {
                items.into_iter().map(ParameterValue::Integer).collect()
            }
            ParameterValue::FloatList(items) => {
                items.into_iter().map(ParameterValue::Float).collect()
            }
            ParameterValue::ObjectList(items) => {
                items.into_iter().map(ParameterValue::Object).collect()
            }
            ParameterValue::FileList(items) => items.into_iter().map(ParameterValue::File).collect(),
            other => return Err(wrong_kind(name, Self::TARGET, &other)),
        };
        items
            .into_iter()
            .map(|item| T::from_parameter(name, item))
            .collect()
    }
}

impl<T: ParameterTarget> ParameterTarget for Option<T> {
    const TARGET: &'static str = T::TARGET;

    fn from_parameter(name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        T::from_parameter(name, value).map(Some)
    }
}

impl ParameterTarget for ParameterValue {
    const TARGET: &'static str = "value";

    fn from_parameter(_name: &str, value: ParameterValue) -> Result<Self, ParameterError> {
        Ok(value)
    }
}
