//! Instantiation matching.
//!
//! [`resolve`] decides, for one instantiation request, which interface and
//! implementation serve it, or why none can. The order of checks matters for
//! diagnostics:
//!
//! 1. interface lookup by name, then by arity (an arity mismatch is reported
//!    before any constraint is looked at)
//! 2. interface constraints against the arguments
//! 3. candidate pairing (arity, subsumption, members)
//! 4. selection: explicit name, or auto-selection among candidates whose own
//!    constraints accept the arguments
//! 5. implementation constraints against the arguments
//!
//! While a pass is still discovering, a request whose template, arity or
//! named implementation is not known yet is [`Resolution::Deferred`] rather
//! than failed.

mod binding;
mod pairing;

pub use binding::Binding;
pub use pairing::{missing_members, pair};

use std::sync::Arc;

use rustc_hash::FxHashSet;
use stencil_core::{
    ConcreteType, ConstraintSet, MatchFailure, MatchFailureKind, QualifiedName,
    TemplateImplementationRecord, TemplateInstantiationRecord, TemplateInterfaceRecord,
};
use tracing::trace;

use crate::store::DiscoveryStore;
use crate::template::substitution::build_substitution_map;

/// Whether more records may still arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The pass is open; unknown templates may still be discovered.
    Discovering,
    /// Everything has been seen.
    Concluded,
}

/// Outcome of one match attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Waiting for an interface or implementation that is not known yet.
    Deferred,
    Bound(Binding),
    Failed(MatchFailure),
}

impl Resolution {
    pub fn binding(&self) -> Option<&Binding> {
        match self {
            Resolution::Bound(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&MatchFailure> {
        match self {
            Resolution::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Resolution::Deferred)
    }
}

/// Match one instantiation request against what the store knows.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve(
    store: &DiscoveryStore,
    instantiation: &Arc<TemplateInstantiationRecord>,
    phase: Phase,
) -> Resolution {
    let resolution = match Matcher::new(store, instantiation, phase).run() {
        Ok(Some(binding)) => Resolution::Bound(binding),
        Ok(None) => Resolution::Deferred,
        Err(kind) => Resolution::Failed(MatchFailure::new(kind, instantiation.as_ref())),
    };
    trace!(
        template = %instantiation.template,
        output = %instantiation.output_name,
        ?phase,
        outcome = match &resolution {
            Resolution::Deferred => "deferred",
            Resolution::Bound(_) => "bound",
            Resolution::Failed(_) => "failed",
        },
        "match attempt"
    );
    resolution
}

/// The interface an instantiation resolves to by name and arity.
pub fn select_interface(
    interfaces: &[Arc<TemplateInterfaceRecord>],
    arity: usize,
) -> Option<&Arc<TemplateInterfaceRecord>> {
    interfaces.iter().find(|i| i.arity() == arity)
}

struct Matcher<'a> {
    store: &'a DiscoveryStore,
    request: &'a Arc<TemplateInstantiationRecord>,
    phase: Phase,
}

type MatchResult<T> = Result<T, MatchFailureKind>;

impl<'a> Matcher<'a> {
    fn new(
        store: &'a DiscoveryStore,
        request: &'a Arc<TemplateInstantiationRecord>,
        phase: Phase,
    ) -> Self {
        Self {
            store,
            request,
            phase,
        }
    }

    fn args(&self) -> &'a [ConcreteType] {
        &self.request.arguments
    }

    /// Defer while discovering, fail once concluded.
    fn not_yet<T>(&self, kind: MatchFailureKind) -> MatchResult<Option<T>> {
        match self.phase {
            Phase::Discovering => Ok(None),
            Phase::Concluded => Err(kind),
        }
    }

    fn no_implementation(&self) -> MatchFailureKind {
        MatchFailureKind::NoImplementationFound {
            template: self.request.template.clone(),
        }
    }

    fn run(&self) -> MatchResult<Option<Binding>> {
        let interfaces = self.store.interfaces_named(&self.request.template);
        if interfaces.is_empty() {
            return self.not_yet(self.no_implementation());
        }

        // Another interface of the same name may still declare this arity.
        let Some(interface) = select_interface(&interfaces, self.args().len()) else {
            return self.not_yet(MatchFailureKind::ArityMismatch {
                template: self.request.template.clone(),
                expected: interfaces[0].arity(),
                got: self.args().len(),
            });
        };

        check_constraints(&interface.constraints, self.args())?;

        let mut rejected: Vec<(Arc<TemplateImplementationRecord>, MatchFailureKind)> = Vec::new();
        let mut candidates: Vec<Arc<TemplateImplementationRecord>> = Vec::new();
        let mut seen: FxHashSet<QualifiedName> = FxHashSet::default();
        for implementation in self.store.implementations_of(&self.request.template) {
            // Conflicting definitions under one name: the first discovered
            // wins even when it fails pairing.
            if !seen.insert(implementation.name.clone()) {
                continue;
            }
            match pair(interface, &implementation) {
                Ok(()) => candidates.push(implementation),
                Err(kind) => rejected.push((implementation, kind)),
            }
        }

        let chosen = match &self.request.implementation {
            Some(name) => match self.named(name, &candidates, &rejected)? {
                Some(chosen) => chosen,
                None => return Ok(None),
            },
            None => match self.auto_select(&candidates)? {
                Some(chosen) => chosen,
                None => return Ok(None),
            },
        };

        check_constraints(&chosen.constraints, self.args())?;

        let substitution =
            build_substitution_map(interface.name(), &interface.constraints, self.args())?;
        let implementation_substitution =
            build_substitution_map(interface.name(), &chosen.constraints, self.args())?;
        Ok(Some(Binding {
            interface: Arc::clone(interface),
            implementation: chosen,
            instantiation: Arc::clone(self.request),
            substitution,
            implementation_substitution,
        }))
    }

    fn named(
        &self,
        name: &QualifiedName,
        candidates: &[Arc<TemplateImplementationRecord>],
        rejected: &[(Arc<TemplateImplementationRecord>, MatchFailureKind)],
    ) -> MatchResult<Option<Arc<TemplateImplementationRecord>>> {
        if let Some(found) = candidates.iter().find(|c| &c.name == name) {
            return Ok(Some(Arc::clone(found)));
        }
        if let Some((_, kind)) = rejected.iter().find(|(r, _)| &r.name == name) {
            return Err(kind.clone());
        }
        self.not_yet(MatchFailureKind::UnknownImplementation {
            template: self.request.template.clone(),
            name: name.clone(),
        })
    }

    fn auto_select(
        &self,
        candidates: &[Arc<TemplateImplementationRecord>],
    ) -> MatchResult<Option<Arc<TemplateImplementationRecord>>> {
        let Some(first) = candidates.first() else {
            return self.not_yet(self.no_implementation());
        };

        let compatible: Vec<&Arc<TemplateImplementationRecord>> = candidates
            .iter()
            .filter(|c| c.constraints.accepts(self.args()))
            .collect();

        match compatible.as_slice() {
            [] => {
                check_constraints(&first.constraints, self.args())?;
                // accepts() and check_constraints() agree on equal arity.
                Err(self.no_implementation())
            }
            [only] => Ok(Some(Arc::clone(only))),
            several => {
                let forced: Vec<_> = several.iter().filter(|c| c.forced).collect();
                if let [winner] = forced.as_slice() {
                    return Ok(Some(Arc::clone(winner)));
                }
                let contenders = if forced.is_empty() {
                    several.iter().map(|c| c.name.clone()).collect()
                } else {
                    forced.iter().map(|c| c.name.clone()).collect()
                };
                Err(MatchFailureKind::AmbiguousImplementations {
                    template: self.request.template.clone(),
                    candidates: contenders,
                })
            }
        }
    }
}

/// Report the first failing position as a constraint violation.
fn check_constraints(constraints: &ConstraintSet, args: &[ConcreteType]) -> MatchResult<()> {
    constraints.check_arguments(args).map_err(|violation| {
        MatchFailureKind::ConstraintViolation {
            position: violation.position,
            parameter: violation.parameter,
            argument: args[violation.position].ty.clone(),
            requirement: violation.requirement,
        }
    })
}
