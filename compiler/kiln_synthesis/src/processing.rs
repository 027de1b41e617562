//! Processing contexts.
//!
//! Each processing wave runs under a [`ProcessorContext`] handed out by the
//! [`AppView`](crate::AppView). A pass processing a method asks its
//! [`MethodProcessingContext`] for a [`UniqueContext`] per synthetic it
//! creates. The suffix derives from the wave, the method signature and a
//! per-method counter, so internal names do not depend on which worker
//! thread got there first, and a method processed again in a later wave
//! never reuses a name.

use kiln_ir::{ItemFactory, Origin, ProgramMethod, TypeId};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Class context plus a suffix no other creation request will use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueContext {
    class_context: TypeId,
    origin: Origin,
    suffix: String,
}

impl UniqueContext {
    pub fn class_context(&self) -> TypeId {
        self.class_context
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn synthetic_suffix(&self) -> &str {
        &self.suffix
    }
}

/// One processing wave.
///
/// Waves must be created in program order by the pass driver, never from
/// worker threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProcessorContext {
    id: u32,
}

impl ProcessorContext {
    pub(crate) fn new(id: u32) -> Self {
        ProcessorContext { id }
    }

    pub fn id(self) -> u32 {
        self.id
    }

    /// A method is processed at most once per wave.
    pub fn create_method_processing_context(
        self,
        method: ProgramMethod,
        factory: &ItemFactory,
    ) -> MethodProcessingContext {
        let mut hasher = FxHasher::default();
        factory.method_to_string(method.reference).hash(&mut hasher);
        MethodProcessingContext {
            method,
            processor: self.id,
            signature_hash: hasher.finish(),
            next_id: 0,
        }
    }
}

pub struct MethodProcessingContext {
    method: ProgramMethod,
    processor: u32,
    signature_hash: u64,
    next_id: u32,
}

impl MethodProcessingContext {
    pub fn method(&self) -> &ProgramMethod {
        &self.method
    }

    pub fn create_unique_context(&mut self) -> UniqueContext {
        let id = self.next_id;
        self.next_id += 1;
        UniqueContext {
            class_context: self.method.holder.ty,
            origin: self.method.holder.origin.clone(),
            suffix: format!("${:x}${}${id}", self.signature_hash, self.processor),
        }
    }
}
