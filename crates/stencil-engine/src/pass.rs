//! Discovery passes.
//!
//! A [`DiscoveryPass`] owns a fresh dedup store and is shared by reference
//! across every host thread that feeds it declarations. For each offer:
//!
//! 1. the declaration is classified;
//! 2. the record is offered to the store;
//! 3. only if it was new, it is published on its channel;
//! 4. then matching runs: an instantiation is attempted at once, while a new
//!    interface or implementation re-attempts every instantiation of its
//!    template.
//!
//! Attempts made while the pass is open are provisional, since another thread
//! may be about to offer the record that decides them. [`DiscoveryPass::complete`]
//! runs a final sweep over everything, so its result does not depend on arrival
//! order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use stencil_core::{
    DeclarationShape, Diagnostic, DiagnosticCode, Diagnostics, DiscoveryError, Marker,
    MatchFailureKind, PassError, QualifiedName, RecordIdentity, SynthesisError, TemplateId,
    TemplateImplementationRecord, TemplateInstantiationRecord, TemplateName,
};
use tracing::{debug, info_span, warn};

use crate::classify::{ClassifiedRecord, classify_with};
use crate::config::{DeferredPolicy, EngineConfig};
use crate::events::EventHub;
use crate::matcher::{Binding, Phase, Resolution, pair, resolve, select_interface};
use crate::store::{DiscoveryStore, Offer};
use crate::template::{SynthesizedUnit, synthesize, synthesize_all};

/// Cloneable cancellation flag for a pass.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One discovery pass.
#[derive(Debug)]
pub struct DiscoveryPass {
    id: u64,
    config: Arc<EngineConfig>,
    hub: Arc<EventHub>,
    store: DiscoveryStore,
    /// Bumped after every record that becomes visible in the store.
    generation: AtomicU64,
    /// Latest resolution per instantiation, tagged with the generation it saw.
    provisional: DashMap<Arc<TemplateInstantiationRecord>, (u64, Resolution)>,
    rejected: Mutex<Diagnostics>,
    abort: AbortHandle,
    completed: AtomicBool,
}

impl DiscoveryPass {
    pub(crate) fn new(id: u64, config: Arc<EngineConfig>, hub: Arc<EventHub>) -> Self {
        debug!(pass = id, "discovery pass started");
        Self {
            id,
            config,
            hub,
            store: DiscoveryStore::new(),
            generation: AtomicU64::new(0),
            provisional: DashMap::new(),
            rejected: Mutex::new(Diagnostics::new()),
            abort: AbortHandle::default(),
            completed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn store(&self) -> &DiscoveryStore {
        &self.store
    }

    pub fn abort(&self) {
        debug!(pass = self.id, "discovery pass aborted");
        self.abort.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), DiscoveryError> {
        if self.is_aborted() {
            return Err(DiscoveryError::Aborted { pass: self.id });
        }
        if self.is_complete() {
            return Err(DiscoveryError::Completed { pass: self.id });
        }
        Ok(())
    }

    /// Classify a declaration and offer the resulting record.
    ///
    /// A classification failure is returned and also kept for the pass
    /// outcome's diagnostics.
    pub fn offer(
        &self,
        declaration: &DeclarationShape,
        marker: &Marker,
    ) -> Result<Offer, DiscoveryError> {
        self.ensure_open()?;
        match classify_with(declaration, marker, &self.config) {
            Ok(record) => self.offer_record(record),
            Err(err) => {
                warn!(pass = self.id, error = %err, "declaration rejected");
                self.rejected.lock().push((&err).into());
                Err(err.into())
            }
        }
    }

    /// Offer an already classified record.
    pub fn offer_record(&self, record: ClassifiedRecord) -> Result<Offer, DiscoveryError> {
        self.ensure_open()?;
        let _span = info_span!("discovery_pass", pass = self.id).entered();
        let fingerprint = record.fingerprint();

        let offer = match record {
            ClassifiedRecord::Interface(record) => {
                let (offer, record) = self.store.interfaces.offer(record);
                if offer.is_added() {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.hub.publish_interface(self.id, Arc::clone(&record));
                    self.rematch(record.name())?;
                }
                offer
            }
            ClassifiedRecord::Implementation(record) => {
                let (offer, record) = self.store.implementations.offer(record);
                if offer.is_added() {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.hub.publish_implementation(self.id, Arc::clone(&record));
                    self.rematch(&record.template)?;
                }
                offer
            }
            ClassifiedRecord::Instantiation(record) => {
                let (offer, record) = self.store.instantiations.offer(record);
                if offer.is_added() {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.hub.publish_instantiation(self.id, Arc::clone(&record));
                    self.attempt(&record);
                }
                offer
            }
        };
        debug!(%fingerprint, ?offer, "record offered");
        Ok(offer)
    }

    /// Offer many declarations, collecting rejections instead of stopping.
    ///
    /// Stops early only when the pass is aborted or completed.
    pub fn offer_all<'a, I>(&self, declarations: I) -> Result<Diagnostics, DiscoveryError>
    where
        I: IntoIterator<Item = (&'a DeclarationShape, &'a Marker)>,
    {
        let mut diagnostics = Diagnostics::new();
        for (declaration, marker) in declarations {
            match self.offer(declaration, marker) {
                Ok(_) => {}
                Err(DiscoveryError::Classification(err)) => diagnostics.push((&err).into()),
                Err(err) => return Err(err),
            }
        }
        Ok(diagnostics)
    }

    fn rematch(&self, template: &TemplateName) -> Result<(), DiscoveryError> {
        for instantiation in self.store.instantiations_of(template) {
            if self.is_aborted() {
                return Err(DiscoveryError::Aborted { pass: self.id });
            }
            self.attempt(&instantiation);
        }
        Ok(())
    }

    fn attempt(&self, instantiation: &Arc<TemplateInstantiationRecord>) {
        // Read before resolving: the attempt saw at least this much.
        let generation = self.generation.load(Ordering::SeqCst);
        let resolution = resolve(&self.store, instantiation, Phase::Discovering);
        self.record_provisional(instantiation, generation, resolution);
    }

    /// Keep the resolution computed from the newest view of the store. A
    /// slower thread finishing an older attempt never overwrites it.
    fn record_provisional(
        &self,
        instantiation: &Arc<TemplateInstantiationRecord>,
        generation: u64,
        resolution: Resolution,
    ) {
        match self.provisional.entry(Arc::clone(instantiation)) {
            Entry::Occupied(mut entry) => {
                if entry.get().0 <= generation {
                    entry.insert((generation, resolution));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((generation, resolution));
            }
        }
    }

    /// The provisional resolution computed from the newest view of the store,
    /// if the instantiation has been attempted in this pass.
    pub fn provisional(&self, instantiation: &TemplateInstantiationRecord) -> Option<Resolution> {
        self.provisional
            .get(instantiation)
            .map(|entry| entry.value().1.clone())
    }

    /// Close the pass: report definition problems, match every instantiation
    /// against the complete store and hand back bindings and diagnostics.
    pub fn complete(&self) -> Result<PassOutcome, PassError> {
        if self.is_aborted() {
            return Err(PassError::Aborted { pass: self.id });
        }
        if self.completed.swap(true, Ordering::SeqCst) {
            return Err(PassError::AlreadyComplete { pass: self.id });
        }
        let _span = info_span!("discovery_pass", pass = self.id).entered();

        let mut diagnostics = std::mem::take(&mut *self.rejected.lock());
        self.check_interfaces(&mut diagnostics);
        self.check_implementations(&mut diagnostics);

        let phase = match self.config.deferred_policy {
            DeferredPolicy::FailOnComplete => Phase::Concluded,
            DeferredPolicy::ReportPending => Phase::Discovering,
        };

        let mut bindings: Vec<Binding> = Vec::new();
        let mut outputs: FxHashMap<QualifiedName, RecordIdentity> = FxHashMap::default();
        for instantiation in self.store.instantiations.snapshot() {
            if self.is_aborted() {
                return Err(PassError::Aborted { pass: self.id });
            }
            match resolve(&self.store, &instantiation, phase) {
                Resolution::Bound(binding) => {
                    let identity = RecordIdentity::from(instantiation.as_ref());
                    if let Some(first) = outputs.get(binding.output_name()) {
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticCode::ConflictingDefinition,
                                format!(
                                    "output name '{}' is already produced by {first}",
                                    binding.output_name()
                                ),
                            )
                            .with_related(identity),
                        );
                        continue;
                    }
                    outputs.insert(binding.output_name().clone(), identity);
                    bindings.push(binding);
                }
                Resolution::Failed(failure) => diagnostics.push(failure.into()),
                Resolution::Deferred => {
                    diagnostics.push(self.pending_diagnostic(&instantiation));
                }
            }
        }

        debug!(
            pass = self.id,
            bindings = bindings.len(),
            errors = diagnostics.error_count(),
            "discovery pass complete"
        );
        Ok(PassOutcome {
            pass: self.id,
            bindings,
            diagnostics,
            config: Arc::clone(&self.config),
        })
    }

    /// A request still deferred at completion. No interface can arrive any
    /// more, so an arity mismatch stays an error.
    fn pending_diagnostic(&self, instantiation: &Arc<TemplateInstantiationRecord>) -> Diagnostic {
        if let Resolution::Failed(failure) = resolve(&self.store, instantiation, Phase::Concluded)
            && matches!(failure.kind, MatchFailureKind::ArityMismatch { .. })
        {
            return failure.into();
        }
        Diagnostic::warning(
            DiagnosticCode::PendingInstantiation,
            format!(
                "instantiation of '{}' is still waiting for a matching implementation",
                instantiation.template
            ),
        )
        .with_related(instantiation.as_ref())
    }

    /// Several interfaces with one name and arity: the first one discovered is
    /// used.
    fn check_interfaces(&self, diagnostics: &mut Diagnostics) {
        let mut seen: FxHashMap<TemplateId, usize> = FxHashMap::default();
        for interface in self.store.interfaces.snapshot() {
            let count = seen.entry(interface.id.clone()).or_default();
            *count += 1;
            if *count == 2 {
                warn!(template = %interface.id, "conflicting template interface definitions");
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::ConflictingDefinition,
                        format!(
                            "template interface '{}' is declared more than once; \
                             the first declaration is used",
                            interface.id
                        ),
                    )
                    .with_related(interface.as_ref()),
                );
            }
        }
    }

    /// Pairing problems and implementations of unknown templates, once per
    /// implementation.
    fn check_implementations(&self, diagnostics: &mut Diagnostics) {
        let mut names: FxHashMap<(QualifiedName, TemplateName), usize> = FxHashMap::default();
        for implementation in self.store.implementations.snapshot() {
            let key = (implementation.name.clone(), implementation.template.clone());
            let count = names.entry(key).or_default();
            *count += 1;
            if *count > 1 {
                warn!(
                    implementation = %implementation.name,
                    template = %implementation.template,
                    "conflicting template implementation definitions"
                );
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCode::ConflictingDefinition,
                        format!(
                            "implementation '{}' of '{}' is declared more than once; \
                             the first declaration is used",
                            implementation.name, implementation.template
                        ),
                    )
                    .with_related(implementation.as_ref()),
                );
                continue;
            }
            self.check_pairing(&implementation, diagnostics);
        }
    }

    fn check_pairing(
        &self,
        implementation: &TemplateImplementationRecord,
        diagnostics: &mut Diagnostics,
    ) {
        let interfaces = self.store.interfaces_named(&implementation.template);
        let Some(first) = interfaces.first() else {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::UnknownTemplate,
                    format!(
                        "'{}' implements unknown template '{}'",
                        implementation.name, implementation.template
                    ),
                )
                .with_related(implementation),
            );
            return;
        };
        let interface = select_interface(&interfaces, implementation.arity()).unwrap_or(first);
        if let Err(kind) = pair(interface, implementation) {
            warn!(
                implementation = %implementation.name,
                template = %implementation.template,
                reason = %kind,
                "implementation excluded from matching"
            );
            let code = DiagnosticCode::from(&kind);
            diagnostics
                .push(Diagnostic::error(code, kind.to_string()).with_related(implementation));
        }
    }
}

/// The result of a completed pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pass: u64,
    bindings: Vec<Binding>,
    diagnostics: Diagnostics,
    config: Arc<EngineConfig>,
}

impl PassOutcome {
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Successful matches in instantiation discovery order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn binding_for(&self, output_name: &QualifiedName) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.output_name() == output_name)
    }

    /// Classification, pairing and matching diagnostics.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Synthesize units lazily, one per binding.
    pub fn units(&self) -> impl Iterator<Item = Result<SynthesizedUnit, SynthesisError>> + '_ {
        self.bindings
            .iter()
            .map(|binding| synthesize(binding, &self.config))
    }

    /// Synthesize every unit. The returned diagnostics include the pass's own.
    pub fn synthesize_all(&self) -> (Vec<SynthesizedUnit>, Diagnostics) {
        let (units, synthesis) = synthesize_all(&self.bindings, &self.config);
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.extend(synthesis);
        (units, diagnostics)
    }
}
