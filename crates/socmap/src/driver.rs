//! Host-callable driver methods.
//!
//! A driver method is an operation the host driver can invoke by its fully-qualified name. It
//! has no hardware footprint, but it lives in the same memory-map namespace as the registers of
//! the component that declared it, so one dotted path identifies it uniquely.

use std::fmt;
use std::sync::Arc;

use crate::common::error::{BusError, BusResult};

/// Register access offered to a driver method by the host-side collaborator.
///
/// Register names are relative to the component that declared the method.
pub trait RegisterIo {
    /// Reads the register named `register`.
    fn read(&mut self, register: &str) -> BusResult<u64>;
    /// Writes `value` to the register named `register`.
    fn write(&mut self, register: &str, value: u64) -> BusResult<()>;
}

/// Signature of a driver method body.
pub type DriverFn = dyn Fn(&mut dyn RegisterIo, &[u64]) -> BusResult<u64> + Send + Sync;

/// A named host-callable operation.
#[derive(Clone)]
pub struct DriverMethod {
    name: String,
    doc: Option<String>,
    body: Option<Arc<DriverFn>>,
}

impl DriverMethod {
    /// Creates a driver method with a body.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the method inside its component's namespace.
    /// * `body` - Called with the host's register access and the call arguments.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn RegisterIo, &[u64]) -> BusResult<u64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            body: Some(Arc::new(body)),
        }
    }

    /// Creates a method that is only declared; invoking it answers [`BusError::NoHandler`].
    ///
    /// Textual design descriptions produce these since they cannot carry code.
    pub fn declared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            body: None,
        }
    }

    /// Attaches a one-line description for generated driver code.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Returns the method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Returns `true` if the method can be invoked.
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Invokes the method.
    pub fn invoke(&self, io: &mut dyn RegisterIo, args: &[u64]) -> BusResult<u64> {
        self.body
            .as_ref()
            .map_or(Err(BusError::NoHandler), |body| body(io, args))
    }
}

impl fmt::Debug for DriverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverMethod")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("has_body", &self.has_body())
            .finish()
    }
}
