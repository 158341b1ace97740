//! Capability registry.
//!
//! Loaded once at startup from a capability description document; afterwards
//! it is pure data plus lookup. The registry performs no network activity.
//! A malformed description fails at load time with [`Error::Schema`], never
//! at first use.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::schema::{
    ParamDocument, ParamKind, ParamSchema, PayloadSchema, ProcedureDescriptor, ProtocolDocument,
};

// ============================================================================
// Constants
// ============================================================================

/// Capability description for the browser domains this crate drives.
///
/// Covers the Page, Runtime and Network subset the [`Session`] facade uses.
/// Callers talking to other domains load their own description.
///
/// [`Session`]: crate::session::Session
const BUNDLED_DESCRIPTION: &str = include_str!("protocol/browser_protocol.json");

// ============================================================================
// CapabilityRegistry
// ============================================================================

/// Immutable mapping from qualified names to schema descriptors.
///
/// Many call invocations share one descriptor; the registry hands out
/// references, never copies.
#[derive(Debug)]
pub struct CapabilityRegistry {
    /// `Domain.method` → procedure descriptor.
    methods: FxHashMap<String, ProcedureDescriptor>,
    /// `Domain.event` → payload schema.
    events: FxHashMap<String, PayloadSchema>,
}

impl CapabilityRegistry {
    /// Loads the registry from a JSON capability description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for documents that do not parse, declare
    /// empty or duplicate names, or use undefined type strings.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: ProtocolDocument = serde_json::from_str(json)
            .map_err(|e| Error::schema(format!("capability description does not parse: {e}")))?;
        Self::from_document(document)
    }

    /// Loads the registry from a parsed description document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] on structural defects; see [`Self::from_json`].
    pub fn from_document(document: ProtocolDocument) -> Result<Self> {
        let mut methods = FxHashMap::default();
        let mut events = FxHashMap::default();

        for domain in &document.domains {
            if domain.domain.is_empty() {
                return Err(Error::schema("domain with empty name"));
            }

            for method in &domain.methods {
                if method.name.is_empty() {
                    return Err(Error::schema(format!(
                        "empty method name in domain {}",
                        domain.domain
                    )));
                }

                let qualified = format!("{}.{}", domain.domain, method.name);
                let descriptor = ProcedureDescriptor {
                    method: qualified.clone(),
                    parameters: convert_params(&qualified, &method.parameters)?,
                    returns: convert_params(&qualified, &method.returns)?,
                };

                if methods.insert(qualified.clone(), descriptor).is_some() {
                    return Err(Error::schema(format!("duplicate method {qualified}")));
                }
            }

            for event in &domain.events {
                if event.name.is_empty() {
                    return Err(Error::schema(format!(
                        "empty event name in domain {}",
                        domain.domain
                    )));
                }

                let qualified = format!("{}.{}", domain.domain, event.name);
                let schema = PayloadSchema {
                    event: qualified.clone(),
                    parameters: convert_params(&qualified, &event.parameters)?,
                };

                if events.insert(qualified.clone(), schema).is_some() {
                    return Err(Error::schema(format!("duplicate event {qualified}")));
                }
            }
        }

        debug!(
            methods = methods.len(),
            events = events.len(),
            "Capability registry loaded"
        );

        Ok(Self { methods, events })
    }

    /// Loads the bundled Page/Runtime/Network description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] only if the bundled document is defective,
    /// which the registry load tests rule out.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_DESCRIPTION)
    }

    /// Resolves a qualified `Domain.method` name to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the description does not declare
    /// the method.
    pub fn resolve(&self, method: &str) -> Result<&ProcedureDescriptor> {
        self.methods
            .get(method)
            .ok_or_else(|| Error::unknown_method(method))
    }

    /// Returns the payload schema for a qualified `Domain.event` name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if the description does not declare
    /// the event.
    pub fn event_schema(&self, event: &str) -> Result<&PayloadSchema> {
        self.events
            .get(event)
            .ok_or_else(|| Error::unknown_event(event))
    }

    /// Returns the number of registered methods.
    #[inline]
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Returns the number of registered events.
    #[inline]
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts raw parameter declarations, rejecting defects.
fn convert_params(owner: &str, raw: &[ParamDocument]) -> Result<Vec<ParamSchema>> {
    let mut converted = Vec::with_capacity(raw.len());

    for param in raw {
        if param.name.is_empty() {
            return Err(Error::schema(format!("empty parameter name in {owner}")));
        }
        if converted.iter().any(|p: &ParamSchema| p.name == param.name) {
            return Err(Error::schema(format!(
                "duplicate parameter '{}' in {owner}",
                param.name
            )));
        }

        let kind = ParamKind::from_wire(&param.kind).ok_or_else(|| {
            Error::schema(format!(
                "undefined type '{}' for parameter '{}' in {owner}",
                param.kind, param.name
            ))
        })?;

        converted.push(ParamSchema {
            name: param.name.clone(),
            kind,
            optional: param.optional,
        });
    }

    Ok(converted)
}

// ============================================================================
// Tests
// ============================================================================
