//! Synthesis configuration.

/// Options that change how synthetics are named and finalized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Output is meant to be compiled again (per-input naming, markers kept).
    pub intermediate: bool,
    /// Class-file to class-file desugaring only; no markers are written.
    pub cf_to_cf_desugar: bool,
    pub testing: TestingOptions,
}

/// Switches used by tests only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestingOptions {
    /// Skip ids whose external name collides with a non-synthetic type.
    pub allow_conflicting_synthetic_types: bool,
}

impl SynthesisOptions {
    /// Whole-program release build.
    pub fn release() -> Self {
        Self::default()
    }

    /// Intermediate build whose output carries synthetic markers.
    pub fn intermediate() -> Self {
        SynthesisOptions {
            intermediate: true,
            ..Self::default()
        }
    }

    /// Intermediate class-file desugaring.
    pub fn desugar_only() -> Self {
        SynthesisOptions {
            intermediate: true,
            cf_to_cf_desugar: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_testing(mut self, testing: TestingOptions) -> Self {
        self.testing = testing;
        self
    }

    pub fn should_annotate_synthetics(&self) -> bool {
        self.intermediate && !self.cf_to_cf_desugar
    }
}
