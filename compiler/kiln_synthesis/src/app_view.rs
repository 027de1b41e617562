//! Application view: the compilation state synthesis works against.
//!
//! Bundles the current application snapshot with the synthetic registry,
//! the accumulated rewrite lens and the side tables (main-dex, feature
//! splits) that synthetics inherit from their contexts.

use crate::{CommittedItems, ProcessorContext, SynthesisOptions, SyntheticItems};
use kiln_diagnostic::{ErrorGuaranteed, Reporter};
use kiln_ir::{
    rewrite_application, Application, ClassToFeatureSplitMap, DefinitionLookup, DexClass,
    ItemFactory, LensDelta, MainDexInfo, PrunedItems, RewriteLens, SharedFactory, TypeId,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub struct AppView {
    factory: SharedFactory,
    options: SynthesisOptions,
    reporter: Reporter,
    app: Application,
    synthetics: SyntheticItems,
    lens: RewriteLens,
    main_dex: MainDexInfo,
    features: ClassToFeatureSplitMap,
    next_processor_id: AtomicU32,
}

impl AppView {
    pub fn new(factory: SharedFactory, app: Application, options: SynthesisOptions) -> Self {
        AppView {
            factory,
            options,
            reporter: Reporter::new(),
            app,
            synthetics: SyntheticItems::default(),
            lens: RewriteLens::identity(),
            main_dex: MainDexInfo::new(),
            features: ClassToFeatureSplitMap::new(),
            next_processor_id: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_main_dex(mut self, main_dex: MainDexInfo) -> Self {
        self.main_dex = main_dex;
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: ClassToFeatureSplitMap) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn factory(&self) -> &ItemFactory {
        &self.factory
    }

    pub fn shared_factory(&self) -> &SharedFactory {
        &self.factory
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    pub fn synthetics(&self) -> &SyntheticItems {
        &self.synthetics
    }

    pub(crate) fn synthetics_mut(&mut self) -> &mut SyntheticItems {
        &mut self.synthetics
    }

    /// Start a processing wave. Ids count up for the whole compilation.
    pub fn create_processor_context(&self) -> ProcessorContext {
        ProcessorContext::new(self.next_processor_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn lens(&self) -> &RewriteLens {
        &self.lens
    }

    pub fn main_dex(&self) -> &MainDexInfo {
        &self.main_dex
    }

    pub fn features(&self) -> &ClassToFeatureSplitMap {
        &self.features
    }

    /// Definition of `ty`, including pending synthetics.
    pub fn definition_for(&self, ty: TypeId) -> Option<Arc<DexClass>> {
        self.synthetics.definition_for(ty, &self.app)
    }

    /// Strip synthetic markers from the input and record the synthetics
    /// they describe. Runs once, before any pass creates synthetics.
    pub fn collect_synthetic_inputs(&mut self) -> Result<(), ErrorGuaranteed> {
        let commit = crate::items::collect_synthetic_inputs(self)?;
        tracing::debug!(
            inputs = commit.committed().synthetic_inputs().len(),
            "synthetic inputs collected"
        );
        self.set_commit(commit);
        Ok(())
    }

    /// Install `commit` as the current application and registry.
    pub fn set_commit(&mut self, commit: CommittedItems) {
        self.synthetics = SyntheticItems::from_commit(&commit);
        self.app = commit.application().clone();
    }

    /// Commit pending synthetics into the current application.
    pub fn commit(&mut self) -> CommittedItems {
        let app = self.app.clone();
        self.commit_application(app)
    }

    /// Commit pending synthetics into `app`, replacing the current one.
    pub fn commit_application(&mut self, app: Application) -> CommittedItems {
        let synthetics = std::mem::take(&mut self.synthetics);
        let commit = synthetics.commit(app, &self.factory);
        self.set_commit(commit.clone());
        commit
    }

    /// Commit into a pruned application and forget what it removed.
    pub fn prune_items(&mut self, pruned: &PrunedItems) -> CommittedItems {
        self.main_dex.prune(pruned);
        let synthetics = std::mem::take(&mut self.synthetics);
        let commit = synthetics.commit_pruned_items(pruned, &self.factory);
        self.set_commit(commit.clone());
        commit
    }

    /// Commit into `app`, which a pass produced by applying `delta`.
    pub fn commit_rewritten_with_lens(&mut self, app: Application, delta: LensDelta) -> CommittedItems {
        self.commit_rewritten(app, Arc::new(delta))
    }

    /// Apply `delta` to every program class and commit the result.
    pub fn rewrite_with_lens(&mut self, delta: LensDelta) -> CommittedItems {
        let delta = Arc::new(delta);
        let step = RewriteLens::identity().with_delta(Arc::clone(&delta));
        let app = rewrite_application(&self.app, &step, &self.factory);
        self.commit_rewritten(app, delta)
    }

    fn commit_rewritten(&mut self, app: Application, delta: Arc<LensDelta>) -> CommittedItems {
        let step = RewriteLens::identity().with_delta(Arc::clone(&delta));
        self.lens = self.lens.with_delta(delta);
        let synthetics = std::mem::take(&mut self.synthetics);
        let commit = synthetics.commit_rewritten_with_lens(app, &step, &self.factory);
        self.set_commit(commit.clone());
        commit
    }

    pub(crate) fn set_main_dex(&mut self, main_dex: MainDexInfo) {
        self.main_dex = main_dex;
    }

    pub(crate) fn append_lens(&mut self, delta: LensDelta) {
        self.lens = self.lens.with_delta(Arc::new(delta));
    }
}

impl DefinitionLookup for AppView {
    fn definition_for(&self, ty: TypeId) -> Option<Arc<DexClass>> {
        AppView::definition_for(self, ty)
    }
}
