//! The engine handle hosts hold on to.
//!
//! A [`TemplateEngine`] owns the configuration and the notification channels.
//! Each call to [`TemplateEngine::begin_pass`] starts a [`DiscoveryPass`] with
//! its own empty dedup store.
//!
//! # Example
//!
//! ```
//! use stencil_core::{
//!     ConcreteType, ConstraintFlags, DeclarationKind, DeclarationShape, DeclaredMember, Marker,
//!     MemberSignature, Param, ParamConstraints, TypeRef,
//! };
//! use stencil_engine::{EngineConfig, TemplateEngine};
//!
//! let less = MemberSignature::new(
//!     "less",
//!     vec![Param::new("a", TypeRef::param("T")), Param::new("b", TypeRef::param("T"))],
//!     TypeRef::named("Bool"),
//! );
//! let value_t = ParamConstraints::new("T").with_flags(ConstraintFlags::VALUE_TYPE);
//!
//! let engine = TemplateEngine::new(EngineConfig::default());
//! let interfaces = engine.subscribe_interfaces();
//! let pass = engine.begin_pass();
//!
//! let comparer = DeclarationShape::new("Comparer", DeclarationKind::Interface)
//!     .with_param(value_t.clone())
//!     .with_member(DeclaredMember::abstract_member(less.clone()));
//! let num = DeclarationShape::new("NumComparer", DeclarationKind::Struct)
//!     .with_param(value_t)
//!     .with_member(DeclaredMember::with_body(less, "return a < b;"));
//! let request = DeclarationShape::new("Requests", DeclarationKind::Class);
//!
//! pass.offer(&comparer, &Marker::Interface).unwrap();
//! pass.offer(&num, &Marker::implementation("Comparer")).unwrap();
//! pass.offer(
//!     &request,
//!     &Marker::instantiation(
//!         "Comparer",
//!         vec![ConcreteType::unmanaged("Int32")],
//!         "Comparer_Int32",
//!     ),
//! )
//! .unwrap();
//!
//! let outcome = pass.complete().unwrap();
//! let (units, diagnostics) = outcome.synthesize_all();
//! assert!(diagnostics.is_empty());
//! assert!(units[0].source_text.contains("fn less(a: Int32, b: Int32) -> Bool"));
//! assert_eq!(interfaces.drain().len(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stencil_core::{
    TemplateImplementationRecord, TemplateInstantiationRecord, TemplateInterfaceRecord,
};

use crate::config::EngineConfig;
use crate::events::{Discovery, EventHub, Subscription};
use crate::pass::DiscoveryPass;

/// Entry point of the discovery engine.
#[derive(Debug)]
pub struct TemplateEngine {
    config: Arc<EngineConfig>,
    hub: Arc<EventHub>,
    next_pass: AtomicU64,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TemplateEngine {
    pub fn new(config: EngineConfig) -> Self {
        let hub = Arc::new(EventHub::new(&config));
        Self {
            config: Arc::new(config),
            hub,
            next_pass: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a pass with a fresh dedup store.
    pub fn begin_pass(&self) -> DiscoveryPass {
        let id = self.next_pass.fetch_add(1, Ordering::Relaxed);
        DiscoveryPass::new(id, Arc::clone(&self.config), Arc::clone(&self.hub))
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    pub fn subscribe_interfaces(&self) -> Subscription<TemplateInterfaceRecord> {
        self.hub.interfaces.subscribe()
    }

    pub fn subscribe_implementations(&self) -> Subscription<TemplateImplementationRecord> {
        self.hub.implementations.subscribe()
    }

    pub fn subscribe_instantiations(&self) -> Subscription<TemplateInstantiationRecord> {
        self.hub.instantiations.subscribe()
    }

    /// Run `listener` on the dispatch lane for every new interface.
    pub fn on_interface_found(
        &self,
        listener: impl Fn(&Discovery<TemplateInterfaceRecord>) + Send + Sync + 'static,
    ) {
        self.hub.interfaces.add_listener(listener);
    }

    pub fn on_implementation_found(
        &self,
        listener: impl Fn(&Discovery<TemplateImplementationRecord>) + Send + Sync + 'static,
    ) {
        self.hub.implementations.add_listener(listener);
    }

    pub fn on_instantiation_found(
        &self,
        listener: impl Fn(&Discovery<TemplateInstantiationRecord>) + Send + Sync + 'static,
    ) {
        self.hub.instantiations.add_listener(listener);
    }

    /// Block until every callback notification dispatched so far has run.
    pub fn flush_notifications(&self) {
        self.hub.flush();
    }
}
