//! Schema-validated method dispatch.
//!
//! One generic call path serves every remote method: the capability registry
//! supplies a [`ProcedureDescriptor`], the dispatcher validates the supplied
//! arguments against it, sends the call through the router, and shallow-
//! validates the response against the return schema.
//!
//! Validation stops at primitive leaves. Compound arguments (objects,
//! arrays) pass through without deep structural checks; this mirrors the
//! declared schema, which does not describe compound interiors.
//!
//! Validation failures are rejected locally and never reach the wire.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::schema::ProcedureDescriptor;
use crate::registry::CapabilityRegistry;
use crate::router::MessageRouter;

// ============================================================================
// Constants
// ============================================================================

/// Default budget for one call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// MethodDispatcher
// ============================================================================

/// Validates and executes schema-backed remote calls.
pub struct MethodDispatcher {
    /// Underlying router.
    router: Arc<MessageRouter>,
    /// Loaded capability registry.
    registry: Arc<CapabilityRegistry>,
    /// Per-call budget.
    call_timeout: Duration,
}

impl MethodDispatcher {
    /// Creates a dispatcher with the default 30s call budget.
    #[must_use]
    pub fn new(router: Arc<MessageRouter>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            router,
            registry,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the per-call budget.
    #[must_use]
    pub fn with_call_timeout(mut self, budget: Duration) -> Self {
        self.call_timeout = budget;
        self
    }

    /// Returns the per-call budget.
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Returns the capability registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Resolves and executes a call by qualified name.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownMethod`] if the registry does not declare the method
    /// - argument validation errors, before any wire traffic
    /// - [`Error::CallTimeout`], [`Error::ConnectionLost`] from the router
    /// - [`Error::Remote`] if the endpoint reported failure
    pub async fn call(&self, method: &str, args: Value) -> Result<Value> {
        let descriptor = self.registry.resolve(method)?;
        self.call_descriptor(descriptor, args, self.call_timeout).await
    }

    /// Executes a call with an explicit budget.
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn call_with_timeout(
        &self,
        method: &str,
        args: Value,
        budget: Duration,
    ) -> Result<Value> {
        let descriptor = self.registry.resolve(method)?;
        self.call_descriptor(descriptor, args, budget).await
    }

    /// Executes a call against a resolved descriptor.
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn call_descriptor(
        &self,
        descriptor: &ProcedureDescriptor,
        args: Value,
        budget: Duration,
    ) -> Result<Value> {
        validate_arguments(descriptor, &args)?;

        trace!(method = %descriptor.method, "Dispatching validated call");

        let handle = self.router.dispatch(&descriptor.method, args)?;
        let response = self.router.await_call(handle, budget).await?;
        let result = response.into_result()?;

        validate_result(descriptor, &result)?;
        Ok(result)
    }
}

// ============================================================================
// Argument Validation
// ============================================================================

/// Checks supplied arguments against the parameter schema.
///
/// Order of rejection: missing required parameters first (in declared
/// order), then undeclared names, then primitive kind mismatches.
fn validate_arguments(descriptor: &ProcedureDescriptor, args: &Value) -> Result<()> {
    let supplied = match args {
        Value::Null => None,
        Value::Object(map) => Some(map),
        _ => {
            return Err(Error::argument_type(
                &descriptor.method,
                "params",
                "compound",
            ));
        }
    };

    for parameter in &descriptor.parameters {
        let present = supplied.is_some_and(|map| map.contains_key(&parameter.name));
        if !parameter.optional && !present {
            return Err(Error::missing_argument(
                &descriptor.method,
                &parameter.name,
            ));
        }
    }

    let Some(map) = supplied else {
        return Ok(());
    };

    for (name, value) in map {
        let Some(parameter) = descriptor.parameter(name) else {
            return Err(Error::unknown_parameter(&descriptor.method, name));
        };

        if !parameter.kind.matches(value) {
            return Err(Error::argument_type(
                &descriptor.method,
                name,
                parameter.kind.name(),
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Result Validation
// ============================================================================

/// Shallow-checks a result value against the return schema.
///
/// Declared primitive fields are type-checked when present; extra fields the
/// schema does not declare pass through, since endpoints add fields across
/// protocol versions.
fn validate_result(descriptor: &ProcedureDescriptor, result: &Value) -> Result<()> {
    if descriptor.returns.is_empty() {
        return Ok(());
    }

    let Value::Object(map) = result else {
        return Err(Error::protocol(format!(
            "{} returned a non-object result",
            descriptor.method
        )));
    };

    for field in &descriptor.returns {
        match map.get(&field.name) {
            Some(value) => {
                if !field.kind.matches(value) {
                    return Err(Error::protocol(format!(
                        "{} returned field '{}' with wrong type, expected {}",
                        descriptor.method,
                        field.name,
                        field.kind.name()
                    )));
                }
            }
            None if !field.optional => {
                return Err(Error::protocol(format!(
                    "{} response is missing field '{}'",
                    descriptor.method, field.name
                )));
            }
            None => {}
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    use crate::observer::TracingObserver;
    use crate::transport::ConnectionCommand;

    fn test_dispatcher() -> (
        MethodDispatcher,
        Arc<MessageRouter>,
        tokio::sync::mpsc::UnboundedReceiver<ConnectionCommand>,
    ) {
        let (router, outbound_rx) = MessageRouter::new(Arc::new(TracingObserver));
        let registry = Arc::new(CapabilityRegistry::bundled().expect("bundled registry"));
        let dispatcher = MethodDispatcher::new(Arc::clone(&router), registry);
        (dispatcher, router, outbound_rx)
    }

    #[tokio::test]
    async fn test_unknown_method_produces_no_wire_traffic() {
        let (dispatcher, _router, mut outbound) = test_dispatcher();

        let err = dispatcher
            .call("Bogus.method", json!({}))
            .await
            .expect_err("unknown method");
        assert!(matches!(err, Error::UnknownMethod { .. }));
        assert!(matches!(outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let (dispatcher, _router, mut outbound) = test_dispatcher();

        let err = dispatcher
            .call("Page.navigate", json!({}))
            .await
            .expect_err("missing url");
        assert!(
            matches!(err, Error::MissingArgument { ref parameter, .. } if parameter == "url")
        );
        assert!(matches!(outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_argument_type_mismatch() {
        let (dispatcher, _router, mut outbound) = test_dispatcher();

        let err = dispatcher
            .call("Page.navigate", json!({ "url": 42 }))
            .await
            .expect_err("wrong kind");
        assert!(matches!(err, Error::ArgumentType { ref parameter, .. } if parameter == "url"));
        assert!(matches!(outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unknown_parameter_rejected() {
        let (dispatcher, _router, mut outbound) = test_dispatcher();

        let err = dispatcher
            .call(
                "Page.navigate",
                json!({ "url": "https://example.com", "turbo": true }),
            )
            .await
            .expect_err("undeclared parameter");
        assert!(
            matches!(err, Error::UnknownParameter { ref parameter, .. } if parameter == "turbo")
        );
        assert!(matches!(outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_compound_argument_passes_shallow_validation() {
        let (dispatcher, router, mut outbound) = test_dispatcher();

        let call = dispatcher.call(
            "Network.setExtraHTTPHeaders",
            json!({ "headers": { "X-Custom": "1", "nested": { "deep": true } } }),
        );

        let respond = async {
            let frame = match outbound.recv().await.expect("frame") {
                ConnectionCommand::Send(text) => text,
                ConnectionCommand::Shutdown => panic!("unexpected shutdown"),
            };
            let value: Value = serde_json::from_str(&frame).expect("json");
            router
                .on_message(&format!(r#"{{"id": {}, "result": {{}}}}"#, value["id"]))
                .expect("route");
        };

        let (result, ()) = tokio::join!(call, respond);
        result.expect("compound accepted");
    }

    #[tokio::test]
    async fn test_successful_call_validates_return_shape() {
        let (dispatcher, router, mut outbound) = test_dispatcher();

        let call = dispatcher.call("Page.navigate", json!({ "url": "https://example.com" }));

        let respond = async {
            let frame = match outbound.recv().await.expect("frame") {
                ConnectionCommand::Send(text) => text,
                ConnectionCommand::Shutdown => panic!("unexpected shutdown"),
            };
            let value: Value = serde_json::from_str(&frame).expect("json");
            router
                .on_message(&format!(
                    r#"{{"id": {}, "result": {{"frameId": "F7"}}}}"#,
                    value["id"]
                ))
                .expect("route");
        };

        let (result, ()) = tokio::join!(call, respond);
        assert_eq!(result.expect("result")["frameId"], "F7");
    }

    #[tokio::test]
    async fn test_malformed_return_shape_is_protocol_error() {
        let (dispatcher, router, mut outbound) = test_dispatcher();

        let call = dispatcher.call("Page.navigate", json!({ "url": "https://example.com" }));

        let respond = async {
            let frame = match outbound.recv().await.expect("frame") {
                ConnectionCommand::Send(text) => text,
                ConnectionCommand::Shutdown => panic!("unexpected shutdown"),
            };
            let value: Value = serde_json::from_str(&frame).expect("json");
            // frameId declared as string, returned as number.
            router
                .on_message(&format!(
                    r#"{{"id": {}, "result": {{"frameId": 9}}}}"#,
                    value["id"]
                ))
                .expect("route");
        };

        let (result, ()) = tokio::join!(call, respond);
        let err = result.expect_err("shape mismatch");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_remote_error_surfaces_with_code_and_message() {
        let (dispatcher, router, mut outbound) = test_dispatcher();

        let call = dispatcher.call("Page.navigate", json!({ "url": "https://example.com" }));

        let respond = async {
            let frame = match outbound.recv().await.expect("frame") {
                ConnectionCommand::Send(text) => text,
                ConnectionCommand::Shutdown => panic!("unexpected shutdown"),
            };
            let value: Value = serde_json::from_str(&frame).expect("json");
            router
                .on_message(&format!(
                    r#"{{"id": {}, "error": {{"code": -32000, "message": "Cannot navigate"}}}}"#,
                    value["id"]
                ))
                .expect("route");
        };

        let (result, ()) = tokio::join!(call, respond);
        let err = result.expect_err("remote failure");
        match err {
            Error::Remote { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "Cannot navigate");
            }
            other => panic!("expected remote error, got {other}"),
        }
    }
}
