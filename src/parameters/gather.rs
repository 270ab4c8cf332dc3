//! Gathering typed values from token lists and structured maps.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{
    ParameterDefinitions, ParameterType, ParameterValue,
    definition::{ParameterTarget, split_list_value},
};
use crate::error::ParameterError;

/// Typed values keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl ParsedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParameterValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Overlays `other`; its values win.
    pub fn merge(&mut self, other: ParsedParameters) {
        self.values.extend(other.values);
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParameterValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParameterValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParameterValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParameterValue::as_bool)
    }

    pub fn get_string_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ParameterValue::as_string_list)
    }

    pub fn get_key_value(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.get(name).and_then(ParameterValue::as_key_value)
    }

    pub fn get_object(&self, name: &str) -> Option<&Map<String, JsonValue>> {
        self.get(name).and_then(ParameterValue::as_object)
    }

    /// Converts the value of `name` into any [`ParameterTarget`].
    pub fn get_as<T: ParameterTarget>(&self, name: &str) -> Result<Option<T>, ParameterError> {
        self.get(name)
            .cloned()
            .map(|value| T::from_parameter(name, value))
            .transpose()
    }
}

impl FromIterator<(String, ParameterValue)> for ParsedParameters {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parses a flat list of flag tokens in one pass.
///
/// Unknown flags and a trailing flag without value are errors. Boolean flags collect
/// `"true"`; list flags split `[a,b,c]` values on commas. Tokens that are not flags
/// are skipped.
pub fn gather_flags_from_string_list(
    args: &[String],
    definitions: &ParameterDefinitions,
) -> Result<ParsedParameters, ParameterError> {
    let mut raw_values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut idx = 0;
    while idx < args.len() {
        let arg = args[idx].as_str();
        idx += 1;
        let (flag, definition) = if let Some(long) = arg.strip_prefix("--") {
            (long, definitions.get(long.split('=').next().unwrap_or(long)))
        } else if let Some(short) = arg.strip_prefix('-') {
            (short, definitions.by_short(short.split('=').next().unwrap_or(short)))
        } else {
            continue;
        };
        let definition = definition.ok_or_else(|| ParameterError::UnknownFlag {
            flag: arg.to_string(),
        })?;
        let entry = raw_values.entry(definition.name.clone()).or_default();
        let inline = flag.split_once('=').map(|(_, value)| value.to_string());

        if definition.ty == ParameterType::Bool {
            entry.push(inline.unwrap_or_else(|| "true".to_string()));
            continue;
        }
        let value = match inline {
            Some(value) => value,
            None => {
                let value = args.get(idx).ok_or_else(|| ParameterError::MissingValue {
                    flag: arg.to_string(),
                })?;
                idx += 1;
                value.clone()
            }
        };
        if definition.ty.is_list()
            && definition.ty != ParameterType::KeyValue
            && !definition.ty.is_file_loading(&value)
        {
            entry.extend(split_list_value(&value));
        } else {
            entry.push(value);
        }
    }

    let mut parsed = ParsedParameters::new();
    for (name, values) in raw_values {
        if let Some(definition) = definitions.get(&name) {
            parsed.insert(name, definition.parse_parameter(&values)?);
        }
    }
    Ok(parsed)
}

/// Gathers typed values from a structured mapping (a JSON or YAML document).
///
/// Each provided value is validated against its definition; strings are coerced the
/// same way as flag values. With `only_provided`, absent parameters are left out;
/// otherwise they receive their defaults and required ones must be present.
pub fn gather_from_map(
    definitions: &ParameterDefinitions,
    map: &Map<String, JsonValue>,
    only_provided: bool,
) -> Result<ParsedParameters, ParameterError> {
    let mut parsed = ParsedParameters::new();
    for definition in definitions {
        match map.get(&definition.name).filter(|value| !value.is_null()) {
            Some(value) => {
                parsed.insert(definition.name.clone(), definition.value_from_json(value)?);
            }
            None if only_provided => {}
            None if definition.required => {
                return Err(ParameterError::MissingRequired {
                    name: definition.name.clone(),
                });
            }
            None => parsed.insert(definition.name.clone(), definition.default_value()),
        }
    }
    for key in map.keys().filter(|key| !definitions.contains(key)) {
        debug!("Ignoring unknown parameter '{key}'");
    }
    Ok(parsed)
}

/// Fills in defaults for every definition without a value; required parameters
/// without a value fail.
pub fn apply_defaults(
    definitions: &ParameterDefinitions,
    parsed: &mut ParsedParameters,
) -> Result<(), ParameterError> {
    for definition in definitions {
        if parsed.contains(&definition.name) {
            continue;
        }
        if definition.required {
            return Err(ParameterError::MissingRequired {
                name: definition.name.clone(),
            });
        }
        parsed.insert(definition.name.clone(), definition.default_value());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterDefinition;
    use serde_json::json;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn definitions() -> ParameterDefinitions {
        ParameterDefinitions::from_definitions([
            ParameterDefinition::new("verbose", ParameterType::Bool).with_short_flag("v"),
            ParameterDefinition::new("output", ParameterType::String).with_short_flag("o"),
            ParameterDefinition::new("fields", ParameterType::StringList),
            ParameterDefinition::new("count", ParameterType::Integer).with_default(5),
        ])
        .unwrap()
    }

    #[test]
    fn gathers_bool_short_and_list_flags() {
        let parsed = gather_flags_from_string_list(
            &args(&["--verbose", "-o", "file.txt", "--fields", "[a,b]", "--fields", "c"]),
            &definitions(),
        )
        .unwrap();
        assert_eq!(parsed.get_bool("verbose"), Some(true));
        assert_eq!(parsed.get_str("output"), Some("file.txt"));
        assert_eq!(
            parsed.get_string_list("fields").unwrap(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(!parsed.contains("count"));
    }

    #[test]
    fn key_value_flags_are_not_split_inside_templates() {
        let definitions = ParameterDefinitions::from_definitions([ParameterDefinition::new(
            "template-field",
            ParameterType::KeyValue,
        )])
        .unwrap();
        let parsed = gather_flags_from_string_list(
            &args(&["--template-field", "c:{{ default(a, \"x\") }},d:{{ b }}"]),
            &definitions,
        )
        .unwrap();
        let map = parsed.get("template-field").unwrap().as_key_value().unwrap();
        assert_eq!(map.get("c").map(String::as_str), Some("{{ default(a, \"x\") }}"));
        assert_eq!(map.get("d").map(String::as_str), Some("{{ b }}"));
    }

    #[test]
    fn unknown_flag_and_missing_value_are_fatal() {
        assert!(matches!(
            gather_flags_from_string_list(&args(&["--nope"]), &definitions()),
            Err(ParameterError::UnknownFlag { .. })
        ));
        assert!(matches!(
            gather_flags_from_string_list(&args(&["--output"]), &definitions()),
            Err(ParameterError::MissingValue { .. })
        ));
    }

    #[test]
    fn gather_from_map_coerces_and_defaults() {
        let map = json!({"count": "9", "fields": ["x"], "unrelated": 1});
        let parsed = gather_from_map(&definitions(), map.as_object().unwrap(), false).unwrap();
        assert_eq!(parsed.get_i64("count"), Some(9));
        assert_eq!(parsed.get_bool("verbose"), Some(false));
        assert_eq!(parsed.get_str("output"), Some(""));

        let only = gather_from_map(&definitions(), map.as_object().unwrap(), true).unwrap();
        assert_eq!(only.len(), 2);
    }

    #[test]
    fn gather_from_map_validates_types() {
        let map = json!({"verbose": "maybe"});
        assert!(matches!(
            gather_from_map(&definitions(), map.as_object().unwrap(), true),
            Err(ParameterError::Parse { .. })
        ));
        let map = json!({"fields": 3});
        assert!(matches!(
            gather_from_map(&definitions(), map.as_object().unwrap(), true),
            Err(ParameterError::InvalidValueType { .. })
        ));
    }

    #[test]
    fn apply_defaults_reports_missing_required() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("name", ParameterType::String).required()
        ])
        .unwrap();
        let mut parsed = ParsedParameters::new();
        assert!(matches!(
            apply_defaults(&defs, &mut parsed),
            Err(ParameterError::MissingRequired { .. })
        ));
    }

    #[test]
    fn get_as_converts_to_narrow_targets() {
        let mut parsed = ParsedParameters::new();
        apply_defaults(&definitions(), &mut parsed).unwrap();
        let count: Option<u16> = parsed.get_as("count").unwrap();
        assert_eq!(count, Some(5));
        let missing: Option<u16> = parsed.get_as("absent").unwrap();
        assert_eq!(missing, None);
    }
}
