//! Capability description document types.
//!
//! The capability description is a declarative JSON document enumerating
//! the domains, methods and events the remote endpoint understands:
//!
//! ```json
//! {
//!   "domains": [
//!     {
//!       "domain": "Page",
//!       "methods": [
//!         {
//!           "name": "navigate",
//!           "parameters": [ { "name": "url", "type": "string" } ],
//!           "returns": [ { "name": "frameId", "type": "string" } ]
//!         }
//!       ],
//!       "events": [
//!         {
//!           "name": "loadEventFired",
//!           "parameters": [ { "name": "timestamp", "type": "number" } ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! This module holds the raw serde document plus the validated descriptor
//! types the registry builds from it. Descriptors are immutable once loaded;
//! every invocation of a method shares one descriptor.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// ParamKind
// ============================================================================

/// Primitive kind of a parameter or return field.
///
/// Validation stops at primitive leaves: [`ParamKind::Compound`] covers
/// objects, arrays and `any`, and such values pass through without deep
/// structural checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string.
    String,
    /// JSON number (integer or float).
    Number,
    /// JSON boolean.
    Boolean,
    /// Object, array or unconstrained value; not deep-validated.
    Compound,
}

impl ParamKind {
    /// Maps a wire type string to a kind.
    ///
    /// Returns `None` for type strings the description format does not
    /// define, which the registry rejects at load time.
    #[must_use]
    pub fn from_wire(wire: &str) -> Option<Self> {
        match wire {
            "string" => Some(Self::String),
            "number" | "integer" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "object" | "array" | "any" | "compound" => Some(Self::Compound),
            _ => None,
        }
    }

    /// Returns the kind name used in error messages.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Compound => "compound",
        }
    }

    /// Checks whether a JSON value matches this kind.
    ///
    /// Compound accepts any value, including primitives: the declared shape
    /// of a compound leaf is unknown to the registry.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Compound => true,
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Schema entry for one parameter or return field.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    /// Field name.
    pub name: String,
    /// Primitive kind.
    pub kind: ParamKind,
    /// Whether the field may be omitted.
    pub optional: bool,
}

/// The validated, schema-backed definition of one remote method.
#[derive(Debug, Clone)]
pub struct ProcedureDescriptor {
    /// Qualified `Domain.method` name.
    pub method: String,
    /// Ordered parameter schema.
    pub parameters: Vec<ParamSchema>,
    /// Return field schema.
    pub returns: Vec<ParamSchema>,
}

impl ProcedureDescriptor {
    /// Looks up a parameter schema by name.
    #[inline]
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParamSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// The validated payload schema of one event.
#[derive(Debug, Clone)]
pub struct PayloadSchema {
    /// Qualified `Domain.event` name.
    pub event: String,
    /// Payload field schema.
    pub parameters: Vec<ParamSchema>,
}

// ============================================================================
// Raw Document
// ============================================================================

/// Top-level capability description document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolDocument {
    /// Protocol domains.
    pub domains: Vec<DomainDocument>,
}

/// One protocol domain.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDocument {
    /// Domain name, e.g. `Page`.
    pub domain: String,

    /// Methods callable in this domain.
    #[serde(default)]
    pub methods: Vec<MethodDocument>,

    /// Events emitted by this domain.
    #[serde(default)]
    pub events: Vec<EventDocument>,
}

/// One method declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodDocument {
    /// Unqualified method name.
    pub name: String,

    /// Parameter declarations.
    #[serde(default)]
    pub parameters: Vec<ParamDocument>,

    /// Return field declarations.
    #[serde(default)]
    pub returns: Vec<ParamDocument>,
}

/// One event declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDocument {
    /// Unqualified event name.
    pub name: String,

    /// Payload field declarations.
    #[serde(default)]
    pub parameters: Vec<ParamDocument>,
}

/// One parameter or field declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamDocument {
    /// Field name.
    pub name: String,

    /// Wire type string, e.g. `string`, `integer`, `object`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether the field may be omitted.
    #[serde(default)]
    pub optional: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_param_kind_from_wire() {
        assert_eq!(ParamKind::from_wire("string"), Some(ParamKind::String));
        assert_eq!(ParamKind::from_wire("integer"), Some(ParamKind::Number));
        assert_eq!(ParamKind::from_wire("number"), Some(ParamKind::Number));
        assert_eq!(ParamKind::from_wire("boolean"), Some(ParamKind::Boolean));
        assert_eq!(ParamKind::from_wire("object"), Some(ParamKind::Compound));
        assert_eq!(ParamKind::from_wire("array"), Some(ParamKind::Compound));
        assert_eq!(ParamKind::from_wire("banana"), None);
    }

    #[test]
    fn test_param_kind_matches() {
        assert!(ParamKind::String.matches(&json!("x")));
        assert!(!ParamKind::String.matches(&json!(1)));
        assert!(ParamKind::Number.matches(&json!(1.5)));
        assert!(ParamKind::Boolean.matches(&json!(true)));
        assert!(ParamKind::Compound.matches(&json!({"a": 1})));
        assert!(ParamKind::Compound.matches(&json!("even a string")));
    }

    #[test]
    fn test_document_deserialization() {
        let doc: ProtocolDocument = serde_json::from_value(json!({
            "domains": [{
                "domain": "Page",
                "methods": [{
                    "name": "navigate",
                    "parameters": [{ "name": "url", "type": "string" }],
                    "returns": [{ "name": "frameId", "type": "string" }]
                }],
                "events": [{
                    "name": "loadEventFired",
                    "parameters": [{ "name": "timestamp", "type": "number" }]
                }]
            }]
        }))
        .expect("deserialize");

        assert_eq!(doc.domains.len(), 1);
        assert_eq!(doc.domains[0].domain, "Page");
        assert_eq!(doc.domains[0].methods[0].name, "navigate");
        assert_eq!(doc.domains[0].events[0].name, "loadEventFired");
        assert!(!doc.domains[0].methods[0].parameters[0].optional);
    }

    #[test]
    fn test_descriptor_parameter_lookup() {
        let descriptor = ProcedureDescriptor {
            method: "Page.navigate".to_string(),
            parameters: vec![ParamSchema {
                name: "url".to_string(),
                kind: ParamKind::String,
                optional: false,
            }],
            returns: Vec::new(),
        };

        assert!(descriptor.parameter("url").is_some());
        assert!(descriptor.parameter("nope").is_none());
    }
}
