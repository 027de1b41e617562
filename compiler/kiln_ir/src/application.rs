//! Application snapshots.
//!
//! An [`Application`] is an immutable set of program and classpath classes
//! plus the names of library types. Snapshots are cheap to clone; every
//! change goes through an [`ApplicationBuilder`] and produces a new snapshot.

use crate::{DexClass, ItemFactory, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

type ClassMap = FxHashMap<TypeId, Arc<DexClass>>;

/// Anything that can resolve a type to its definition.
pub trait DefinitionLookup {
    fn definition_for(&self, ty: TypeId) -> Option<Arc<DexClass>>;
}

#[derive(Clone, Debug, Default)]
pub struct Application {
    program: Arc<ClassMap>,
    classpath: Arc<ClassMap>,
    library: Arc<FxHashSet<TypeId>>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder(&self) -> ApplicationBuilder {
        ApplicationBuilder {
            program: (*self.program).clone(),
            classpath: (*self.classpath).clone(),
            library: (*self.library).clone(),
        }
    }

    pub fn program_definition_for(&self, ty: TypeId) -> Option<&Arc<DexClass>> {
        self.program.get(&ty)
    }

    pub fn classpath_definition_for(&self, ty: TypeId) -> Option<&Arc<DexClass>> {
        self.classpath.get(&ty)
    }

    pub fn is_library_type(&self, ty: TypeId) -> bool {
        self.library.contains(&ty)
    }

    /// Whether `ty` names a classpath class or library type.
    pub fn has_non_program_type(&self, ty: TypeId) -> bool {
        self.classpath.contains_key(&ty) || self.library.contains(&ty)
    }

    pub fn contains_type(&self, ty: TypeId) -> bool {
        self.program.contains_key(&ty) || self.has_non_program_type(ty)
    }

    /// Program classes in unspecified order.
    pub fn program_classes(&self) -> impl Iterator<Item = &Arc<DexClass>> {
        self.program.values()
    }

    /// Program classes ordered by descriptor.
    pub fn program_classes_sorted(&self, factory: &ItemFactory) -> Vec<&Arc<DexClass>> {
        let mut classes: Vec<_> = self.program.values().collect();
        classes.sort_by(|a, b| factory.cmp_types(a.ty, b.ty));
        classes
    }

    pub fn classpath_classes(&self) -> impl Iterator<Item = &Arc<DexClass>> {
        self.classpath.values()
    }

    pub fn program_class_count(&self) -> usize {
        self.program.len()
    }
}

impl DefinitionLookup for Application {
    fn definition_for(&self, ty: TypeId) -> Option<Arc<DexClass>> {
        self.program
            .get(&ty)
            .or_else(|| self.classpath.get(&ty))
            .cloned()
    }
}

#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    program: ClassMap,
    classpath: ClassMap,
    library: FxHashSet<TypeId>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a program class.
    pub fn add_program_class(&mut self, class: Arc<DexClass>) -> &mut Self {
        debug_assert!(class.is_program_class());
        debug_assert!(
            !self.classpath.contains_key(&class.ty),
            "program class shadows a classpath class"
        );
        self.program.insert(class.ty, class);
        self
    }

    /// Add a program class that takes precedence over a classpath or library
    /// definition of the same type.
    pub fn add_program_class_overriding_non_program(&mut self, class: Arc<DexClass>) -> &mut Self {
        debug_assert!(class.is_program_class());
        self.classpath.remove(&class.ty);
        self.library.remove(&class.ty);
        self.program.insert(class.ty, class);
        self
    }

    pub fn add_classpath_class(&mut self, class: Arc<DexClass>) -> &mut Self {
        debug_assert!(class.is_classpath_class());
        self.classpath.insert(class.ty, class);
        self
    }

    pub fn add_library_type(&mut self, ty: TypeId) -> &mut Self {
        self.library.insert(ty);
        self
    }

    pub fn remove_program_class(&mut self, ty: TypeId) -> &mut Self {
        self.program.remove(&ty);
        self
    }

    /// Replace the whole set of program classes.
    pub fn replace_program_classes(
        &mut self,
        classes: impl IntoIterator<Item = Arc<DexClass>>,
    ) -> &mut Self {
        self.program = classes.into_iter().map(|class| (class.ty, class)).collect();
        self
    }

    pub fn build(&mut self) -> Application {
        Application {
            program: Arc::new(std::mem::take(&mut self.program)),
            classpath: Arc::new(std::mem::take(&mut self.classpath)),
            library: Arc::new(std::mem::take(&mut self.library)),
        }
    }
}

/// Result of a pruning pass: the reduced application and what it removed.
#[derive(Clone, Debug)]
pub struct PrunedItems {
    pruned_app: Application,
    removed_classes: Arc<FxHashSet<TypeId>>,
    no_longer_synthetic: Arc<FxHashSet<TypeId>>,
}

impl PrunedItems {
    /// Nothing removed.
    pub fn empty(app: Application) -> Self {
        PrunedItems {
            pruned_app: app,
            removed_classes: Arc::default(),
            no_longer_synthetic: Arc::default(),
        }
    }

    pub fn builder() -> PrunedItemsBuilder {
        PrunedItemsBuilder::default()
    }

    pub fn pruned_app(&self) -> &Application {
        &self.pruned_app
    }

    pub fn is_empty(&self) -> bool {
        self.removed_classes.is_empty() && self.no_longer_synthetic.is_empty()
    }

    pub fn removed_classes(&self) -> &FxHashSet<TypeId> {
        &self.removed_classes
    }

    pub fn is_removed(&self, ty: TypeId) -> bool {
        self.removed_classes.contains(&ty)
    }

    /// Removed classes plus classes that survive as ordinary classes.
    pub fn is_no_longer_synthetic(&self, ty: TypeId) -> bool {
        self.removed_classes.contains(&ty) || self.no_longer_synthetic.contains(&ty)
    }
}

#[derive(Debug, Default)]
pub struct PrunedItemsBuilder {
    pruned_app: Option<Application>,
    removed_classes: FxHashSet<TypeId>,
    no_longer_synthetic: FxHashSet<TypeId>,
}

impl PrunedItemsBuilder {
    pub fn set_pruned_app(&mut self, app: Application) -> &mut Self {
        self.pruned_app = Some(app);
        self
    }

    pub fn add_removed_class(&mut self, ty: TypeId) -> &mut Self {
        self.removed_classes.insert(ty);
        self
    }

    pub fn add_removed_classes(&mut self, types: impl IntoIterator<Item = TypeId>) -> &mut Self {
        self.removed_classes.extend(types);
        self
    }

    pub fn add_no_longer_synthetic(&mut self, ty: TypeId) -> &mut Self {
        self.no_longer_synthetic.insert(ty);
        self
    }

    pub fn build(&mut self) -> PrunedItems {
        PrunedItems {
            pruned_app: self.pruned_app.take().unwrap_or_default(),
            removed_classes: Arc::new(std::mem::take(&mut self.removed_classes)),
            no_longer_synthetic: Arc::new(std::mem::take(&mut self.no_longer_synthetic)),
        }
    }
}

/// Classes that must be placed in the primary output file.
#[derive(Clone, Debug, Default)]
pub struct MainDexInfo {
    types: FxHashSet<TypeId>,
}

impl MainDexInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_main_dex(&self, ty: TypeId) -> bool {
        self.types.contains(&ty)
    }

    pub fn add(&mut self, ty: TypeId) {
        self.types.insert(ty);
    }

    /// Drop entries for classes the pruning pass removed.
    pub fn prune(&mut self, pruned: &PrunedItems) {
        self.types.retain(|ty| !pruned.is_removed(*ty));
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}
