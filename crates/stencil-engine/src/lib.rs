//! Template discovery, matching and synthesis.
//!
//! This crate drives the lifecycle of template records:
//!
//! - [`classify`]: declaration + marker → typed record
//! - [`store`]: per-pass structural dedup with atomic test-and-set
//! - [`events`]: the three "found" channels and the dispatch lane
//! - [`matcher`]: instantiation → binding, or a precise failure
//! - [`template`]: substitution, naming and unit synthesis
//! - [`pass`] / [`engine`]: pass orchestration and the host-facing handle
//!
//! Value types (records, constraints, diagnostics) live in `stencil-core`.

pub mod classify;
pub mod config;
pub mod engine;
pub mod events;
pub mod matcher;
pub mod pass;
pub mod store;
pub mod template;

pub use classify::{ClassifiedRecord, classify, classify_with};
pub use config::{DeferredPolicy, EngineConfig};
pub use engine::TemplateEngine;
pub use events::{Discovery, DispatchLane, EventHub, Subscription};
pub use matcher::{Binding, Phase, Resolution, resolve};
pub use pass::{AbortHandle, DiscoveryPass, PassOutcome};
pub use store::{DiscoveryStore, Offer, RecordSet};
pub use template::{SynthesizedMember, SynthesizedType, SynthesizedUnit, synthesize};
