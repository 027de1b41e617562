//! Kiln synthetic items.
//!
//! Tracks the helper classes and methods that whole-program passes generate
//! (lambda bodies, bridges, backports, desugaring helpers), and gives them
//! final names once optimization is done.
//!
//! This crate contains:
//! - Synthetic kinds and the naming scheme
//! - Synthesizing contexts, definitions and references
//! - The pending registry and immutable committed snapshots
//! - Synthetic markers for intermediate output
//! - Finalization: structural deduplication, naming and the rewrite lens
//!
//! # Design Philosophy
//!
//! - **Deterministic**: every observable choice orders by descriptor text,
//!   never by thread scheduling or handle value
//! - **Snapshots**: commits produce new immutable values; nothing committed
//!   is mutated in place
//! - **Scoped locking**: concurrent creation only contends on the type
//!   being created
//!
//! # Tracing
//!
//! Enable with `RUST_LOG=kiln_synthesis=debug` after calling
//! [`init_tracing`].

mod app_view;
mod builder;
mod committed;
mod context;
mod definition;
mod equivalence;
mod error;
mod finalization;
mod invariant;
mod items;
mod kind;
mod lens_builder;
pub mod marker;
pub mod naming;
mod options;
mod pending;
mod processing;
mod reference;

use invariant::invariant;

pub use app_view::AppView;
pub use builder::{SyntheticClassBuilder, SyntheticMethodBuilder};
pub use committed::{
    CommittedItems, CommittedSyntheticsBuilder, CommittedSyntheticsCollection,
    INVALID_ID_AFTER_SYNTHETIC_FINALIZATION,
};
pub use context::SynthesizingContext;
pub use definition::{HasHolder, Rewritable, Rewritten, SyntheticDefinition, SyntheticItem};
pub use equivalence::EquivalenceGroup;
pub use error::SynthesisError;
pub use finalization::{compute_final_synthetics, finalize, FinalizationResult};
pub use items::{SynthesisPhase, SyntheticItems};
pub use kind::{naming_version_hash, KindFlavor, SyntheticKind};
pub use lens_builder::FinalizationLensBuilder;
pub use options::{SynthesisOptions, TestingOptions};
pub use pending::PendingSynthetics;
pub use processing::{MethodProcessingContext, ProcessorContext, UniqueContext};
pub use reference::SyntheticReference;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber for debugging.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=kiln_synthesis=debug` or `RUST_LOG=kiln_synthesis=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
