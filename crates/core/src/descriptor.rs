//! Static metadata describing one deployed component.
//!
//! A [`ComponentDescriptor`] is built at deployment time and immutable
//! afterwards. The container owns it; every proxy and pool built for the
//! component holds an `Arc` reference.

use std::collections::HashMap;
use std::fmt;

/// Signature used in a transaction-policy entry to override the component's
/// default propagation mode instead of naming a single method.
pub const WILDCARD_METHOD: &str = "*";

/// Unique deployment key for a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentName(String);

impl ComponentName {
    /// Create a component name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Business-method signature, e.g. `"addItem(String,int)"`.
///
/// The container treats the signature as an opaque key; it only has to be
/// stable between the descriptor and the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig(String);

impl MethodSig {
    /// Create a method signature.
    pub fn new(sig: impl Into<String>) -> Self {
        Self(sig.into())
    }

    /// The signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodSig {
    fn from(sig: &str) -> Self {
        Self::new(sig)
    }
}

/// Which front-end a call arrived through.
///
/// The same method name may carry different transaction policy per path, and
/// unchecked failures are wrapped on the remote path only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallPath {
    /// In-process front-end; failures propagate unwrapped.
    Local,
    /// Cross-boundary front-end; implementation-only failure types must not
    /// leak through, so unchecked failures are re-wrapped.
    Remote,
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPath::Local => f.write_str("local"),
            CallPath::Remote => f.write_str("remote"),
        }
    }
}

/// Lifecycle style of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStyle {
    /// No per-client state; instances are pooled and interchangeable.
    Shared,
    /// Conversational state private to one client; one instance per session,
    /// never pooled, calls serialized.
    PerClient,
}

/// Who drives transaction boundaries for the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxManagement {
    /// The container applies the propagation policy around every call.
    Container,
    /// The component drives the coordinator itself; the container's
    /// transaction handler forwards untouched.
    SelfManaged,
}

/// Transaction propagation mode governing how a call relates to the ambient
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Join the ambient transaction, or begin a new one if there is none.
    Required,
    /// Always begin a new transaction, suspending any ambient one.
    RequiresNew,
    /// An ambient transaction must already exist.
    Mandatory,
    /// Run outside any transaction, suspending any ambient one.
    NotSupported,
    /// Run in the ambient transaction if present, otherwise without one.
    Supports,
    /// An ambient transaction must not exist.
    Never,
}

/// Static description of one deployed component.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    name: ComponentName,
    lifecycle: LifecycleStyle,
    tx_management: TxManagement,
    default_propagation: Propagation,
    method_propagation: HashMap<(CallPath, MethodSig), Propagation>,
}

impl ComponentDescriptor {
    /// Create a descriptor with the default propagation mode (`Required`)
    /// and no per-method entries.
    pub fn new(
        name: impl Into<ComponentName>,
        lifecycle: LifecycleStyle,
        tx_management: TxManagement,
    ) -> Self {
        Self {
            name: name.into(),
            lifecycle,
            tx_management,
            default_propagation: Propagation::Required,
            method_propagation: HashMap::new(),
        }
    }

    /// Override the default propagation mode.
    pub fn with_default_propagation(mut self, mode: Propagation) -> Self {
        self.default_propagation = mode;
        self
    }

    /// Record the propagation mode for one `(call path, signature)` pair.
    ///
    /// The wildcard signature `*` overrides the default mode instead of
    /// adding a per-method entry.
    pub fn with_method(
        mut self,
        path: CallPath,
        sig: impl Into<MethodSig>,
        mode: Propagation,
    ) -> Self {
        let sig = sig.into();
        if sig.as_str() == WILDCARD_METHOD {
            self.default_propagation = mode;
        } else {
            self.method_propagation.insert((path, sig), mode);
        }
        self
    }

    /// Deployment name.
    pub fn name(&self) -> &ComponentName {
        &self.name
    }

    /// Lifecycle style.
    pub fn lifecycle(&self) -> LifecycleStyle {
        self.lifecycle
    }

    /// Whether transactions are container-managed or self-managed.
    pub fn tx_management(&self) -> TxManagement {
        self.tx_management
    }

    /// The default propagation mode methods fall back to.
    pub fn default_propagation(&self) -> Propagation {
        self.default_propagation
    }

    /// Resolve the propagation mode for a call, falling back to the default
    /// when no per-method entry exists.
    pub fn propagation_for(&self, path: CallPath, sig: &MethodSig) -> Propagation {
        self.method_propagation
            .get(&(path, sig.clone()))
            .copied()
            .unwrap_or(self.default_propagation)
    }

    /// True for pooled shared-style components.
    pub fn is_shared(&self) -> bool {
        self.lifecycle == LifecycleStyle::Shared
    }
}
