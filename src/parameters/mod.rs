//! Typed, named parameters: kinds, definitions, coercion and gathering.

pub mod definition;
pub mod definitions;
pub mod files;
pub mod gather;
pub mod types;
pub mod value;

pub use definition::{ParameterDefinition, ParameterTarget, split_list_value};
pub use definitions::{DefinitionDocument, ParameterDefinitions};
pub use files::FileData;
pub use gather::{ParsedParameters, apply_defaults, gather_flags_from_string_list, gather_from_map};
pub use types::{FileLoading, ParameterType, TypeInfo};
pub use value::ParameterValue;
