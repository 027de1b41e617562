//! Fatal synthesis errors.
//!
//! These report compiler bugs found while finalizing, or misuse of the
//! creation API; user input problems go through the diagnostic reporter.

/// Error returned by synthetic item operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("unresolved synthetic reference `{ty}`; pruned synthetics must be removed from the committed items")]
    UnresolvedReference { ty: String },

    #[error("synthetic `{ty}` no longer has the shape required of a {kind} item")]
    InvalidSynthetic { ty: String, kind: String },

    #[error("missing representative `{ty}` after building the final program")]
    MissingRepresentative { ty: String },

    #[error("unexpected creation of an existing external synthetic type `{ty}`")]
    ConflictingExternalType { ty: String },

    #[error("synthetic type `{ty}` already exists; each unique context creates one item")]
    ExistingSyntheticType { ty: String },

    #[error("cannot compute the external synthetic prefix of `{ty}`")]
    MalformedSyntheticName { ty: String },

    #[error("cannot create {kind} synthetic: synthetic items are {phase}")]
    CreationAfterFinalization { kind: String, phase: String },

    #[error("synthetic items are already finalized")]
    AlreadyFinalized,
}
