//! Definition sets and their YAML representation.
//!
//! A set keeps declaration order (for help and positional mapping) next to a name
//! index (for lookups). A document is either a plain list of flag definitions or a
//! mapping with `flags` and `arguments` lists:
//!
//! ```yaml
//! flags:
//!   - name: count
//!     type: integer
//!     short: c
//!     default: 5
//!     help: How many items to emit
//! arguments:
//!   - name: inputs
//!     type: stringList
//! ```

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{ParameterDefinition, ParameterType};
use crate::error::ParameterError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDefinitions {
    ordered: Vec<ParameterDefinition>,
    by_name: HashMap<String, usize>,
}

impl ParameterDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from definitions, validating each default.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, ParameterError>
    where
        I: IntoIterator<Item = ParameterDefinition>,
    {
        let mut set = Self::new();
        for definition in definitions {
            set.push(definition)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, definition: ParameterDefinition) -> Result<(), ParameterError> {
        definition.validate()?;
        if self.by_name.contains_key(&definition.name) {
            return Err(ParameterError::DuplicateParameter(definition.name));
        }
        if let Some(short) = &definition.short_flag {
            if self.by_short(short).is_some() {
                return Err(ParameterError::DuplicateParameter(format!("-{short}")));
            }
        }
        self.by_name
            .insert(definition.name.clone(), self.ordered.len());
        self.ordered.push(definition);
        Ok(())
    }

    /// Appends every definition of `other`; names must stay unique.
    pub fn merge(&mut self, other: ParameterDefinitions) -> Result<(), ParameterError> {
        for definition in other.ordered {
            self.push(definition)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.by_name.get(name).map(|&idx| &self.ordered[idx])
    }

    pub fn by_short(&self, short: &str) -> Option<&ParameterDefinition> {
        self.ordered
            .iter()
            .find(|definition| definition.short_flag.as_deref() == Some(short))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.ordered.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|definition| definition.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Parses a flag list. Documents with an `arguments` section are rejected here;
    /// use [`DefinitionDocument::from_yaml_str`] for those.
    pub fn from_yaml_str(text: &str) -> Result<Self, ParameterError> {
        let document = DefinitionDocument::from_yaml_str(text)?;
        if !document.arguments.is_empty() {
            return Err(ParameterError::InvalidDocument(
                "unexpected 'arguments' section in a flag list".to_string(),
            ));
        }
        Ok(document.flags)
    }
}

impl<'a> IntoIterator for &'a ParameterDefinitions {
    type Item = &'a ParameterDefinition;
    type IntoIter = std::slice::Iter<'a, ParameterDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

/// Flags plus positional argument definitions loaded from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionDocument {
    pub flags: ParameterDefinitions,
    pub arguments: ParameterDefinitions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
    name: String,
    #[serde(rename = "type")]
    ty: ParameterType,
    #[serde(default, alias = "shortFlag", alias = "short_flag")]
    short: Option<String>,
    #[serde(default)]
    default: Option<JsonValue>,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    help: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    List(Vec<RawDefinition>),
    Sections {
        #[serde(default)]
        flags: Vec<RawDefinition>,
        #[serde(default)]
        arguments: Vec<RawDefinition>,
    },
}

impl RawDefinition {
    fn into_definition(self) -> Result<ParameterDefinition, ParameterError> {
        let mut definition = ParameterDefinition::new(self.name, self.ty);
        definition.short_flag = self.short;
        definition.choices = self.choices;
        definition.required = self.required;
        definition.help = self.help;
        if let Some(raw) = self.default.filter(|value| !value.is_null()) {
            let value = definition.value_from_json(&raw).map_err(|source| {
                ParameterError::InvalidDefault {
                    name: definition.name.clone(),
                    source: Box::new(source),
                }
            })?;
            definition.default = Some(value);
        }
        Ok(definition)
    }
}

fn build_set(raw: Vec<RawDefinition>) -> Result<ParameterDefinitions, ParameterError> {
    ParameterDefinitions::from_definitions(
        raw.into_iter()
            .map(RawDefinition::into_definition)
            .collect::<Result<Vec<_>, _>>()?,
    )
}

impl DefinitionDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self, ParameterError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawDocument = serde_yaml::from_str(text)
            .map_err(|err| ParameterError::InvalidDocument(err.to_string()))?;
        let (flags, arguments) = match raw {
            RawDocument::List(flags) => (flags, Vec::new()),
            RawDocument::Sections { flags, arguments } => (flags, arguments),
        };
        Ok(Self {
            flags: build_set(flags)?,
            arguments: build_set(arguments)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ParameterError> {
        let text = fs::read_to_string(path).map_err(|source| ParameterError::FileLoad {
            name: "definitions".to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterValue;

    const DOCUMENT: &str = r#"
flags:
  - name: int-flag
    type: int
    default: 42
  - name: float-flag-with-int-default
    type: float
    default: 42
  - name: choice-list
    type: choiceList
    choices: [red, green, blue]
    default: [red]
  - name: verbose
    type: bool
    short: v
arguments:
  - name: inputs
    type: stringList
    required: true
"#;

    #[test]
    fn loads_flags_in_declaration_order() {
        let document = DefinitionDocument::from_yaml_str(DOCUMENT).unwrap();
        let names: Vec<&str> = document.flags.names().collect();
        assert_eq!(
            names,
            vec!["int-flag", "float-flag-with-int-default", "choice-list", "verbose"]
        );
        assert_eq!(
            document.flags.get("float-flag-with-int-default").unwrap().default,
            Some(ParameterValue::Float(42.0))
        );
        assert_eq!(document.flags.by_short("v").unwrap().name, "verbose");
        assert!(document.arguments.get("inputs").unwrap().required);
    }

    #[test]
    fn rejects_default_outside_choices() {
        let text = r#"
- name: color
  type: choice
  choices: [red]
  default: purple
"#;
        assert!(matches!(
            ParameterDefinitions::from_yaml_str(text),
            Err(ParameterError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn rejects_duplicates_and_unknown_types() {
        let duplicate = "- {name: a, type: string}\n- {name: a, type: integer}\n";
        assert!(matches!(
            ParameterDefinitions::from_yaml_str(duplicate),
            Err(ParameterError::DuplicateParameter(_))
        ));
        let unknown = "- {name: a, type: spaceship}\n";
        assert!(matches!(
            ParameterDefinitions::from_yaml_str(unknown),
            Err(ParameterError::InvalidDocument(_))
        ));
    }
}
