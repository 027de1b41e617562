//! Synthetic markers.
//!
//! Intermediate output tags each synthetic class with a build-visible
//! annotation so a later compilation can recognize it:
//!
//! ```text
//! @Lkiln/annotation/SynthesizedClass;(value = "<kind-id>:<version-hash>:<context-descriptor>")
//! ```
//!
//! Global kinds have an empty context descriptor. Markers are stripped
//! before a class is treated as ordinary input.

use crate::kind::naming_version_hash;
use crate::{SynthesizingContext, SyntheticKind};
use kiln_diagnostic::{Diagnostic, ErrorCode, Reporter};
use kiln_ir::{
    is_valid_type_descriptor, Annotation, AnnotationElement, AnnotationValue,
    AnnotationVisibility, ClassToFeatureSplitMap, DexClass, ItemFactory, TypeId,
};
use std::sync::Arc;

pub const SYNTHETIC_MARKER_DESCRIPTOR: &str = "Lkiln/annotation/SynthesizedClass;";
const VALUE_ELEMENT: &str = "value";

/// Kind and context read back from a marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticMarker {
    kind: SyntheticKind,
    context: SynthesizingContext,
}

impl SyntheticMarker {
    pub fn kind(&self) -> SyntheticKind {
        self.kind
    }

    pub fn context(&self) -> &SynthesizingContext {
        &self.context
    }

    pub fn is_synthetic_methods(&self) -> bool {
        self.kind.is_single_method()
    }

    pub fn is_synthetic_class(&self) -> bool {
        !self.kind.is_single_method()
    }

    pub fn into_parts(self) -> (SyntheticKind, SynthesizingContext) {
        (self.kind, self.context)
    }
}

/// A class with its marker removed, and the marker if it was well formed.
#[derive(Clone, Debug)]
pub struct StrippedClass {
    pub class: Arc<DexClass>,
    pub marker: Option<SyntheticMarker>,
}

pub fn marker_annotation(
    kind: SyntheticKind,
    context: &SynthesizingContext,
    factory: &ItemFactory,
) -> Annotation {
    let context_descriptor = if kind.is_global() {
        ""
    } else {
        factory.descriptor(context.synthesizing_context_type())
    };
    let value = format!("{}:{}:{context_descriptor}", kind.id(), naming_version_hash());
    Annotation {
        ty: factory.intern_type(SYNTHETIC_MARKER_DESCRIPTOR),
        visibility: AnnotationVisibility::Build,
        elements: vec![AnnotationElement {
            name: factory.intern_name(VALUE_ELEMENT),
            value: AnnotationValue::String(factory.intern_name(&value)),
        }],
    }
}

/// `class` with exactly one marker for `kind` and `context`.
pub fn add_marker_to_class(
    class: &DexClass,
    kind: SyntheticKind,
    context: &SynthesizingContext,
    factory: &ItemFactory,
) -> DexClass {
    let marker_type = factory.intern_type(SYNTHETIC_MARKER_DESCRIPTOR);
    let mut marked = class.clone();
    marked.annotations.retain(|annotation| annotation.ty != marker_type);
    marked
        .annotations
        .push(marker_annotation(kind, context, factory));
    marked
}

pub fn has_marker(class: &DexClass, factory: &ItemFactory) -> bool {
    factory
        .lookup_type(SYNTHETIC_MARKER_DESCRIPTOR)
        .is_some_and(|marker_type| class.annotations.iter().any(|a| a.ty == marker_type))
}

/// Remove every marker from `class` and decode the first one.
///
/// Malformed markers are reported and yield no marker, so the class is
/// compiled as an ordinary class.
pub fn strip_marker_from_class(
    class: &Arc<DexClass>,
    factory: &ItemFactory,
    features: &ClassToFeatureSplitMap,
    reporter: &Reporter,
) -> StrippedClass {
    let Some(marker_type) = factory.lookup_type(SYNTHETIC_MARKER_DESCRIPTOR) else {
        return unmarked(class);
    };
    let Some(annotation) = class
        .annotations
        .iter()
        .find(|annotation| annotation.ty == marker_type)
    else {
        return unmarked(class);
    };

    let mut stripped = (**class).clone();
    stripped.annotations.retain(|annotation| annotation.ty != marker_type);
    let stripped = Arc::new(stripped);

    if class.is_classpath_class() {
        reporter.report(
            Diagnostic::warning(ErrorCode::W7001)
                .with_message(format!(
                    "synthetic marker on classpath class `{}` is ignored",
                    factory.descriptor(class.ty)
                ))
                .with_origin(class.origin.clone()),
        );
        return StrippedClass {
            class: stripped,
            marker: None,
        };
    }

    let marker = match decode(annotation, factory) {
        Ok((kind, context_type)) => {
            let context_type = context_type.unwrap_or(class.ty);
            Some(SyntheticMarker {
                kind,
                context: SynthesizingContext::from_synthetic_input_context(
                    context_type,
                    class.ty,
                    class.origin.clone(),
                    features.feature_split_for(class.ty),
                ),
            })
        }
        Err(diagnostic) => {
            reporter.error(
                diagnostic
                    .with_origin(class.origin.clone())
                    .with_note(format!("in class `{}`", factory.descriptor(class.ty))),
            );
            None
        }
    };
    StrippedClass {
        class: stripped,
        marker,
    }
}

fn unmarked(class: &Arc<DexClass>) -> StrippedClass {
    StrippedClass {
        class: Arc::clone(class),
        marker: None,
    }
}

fn malformed(message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(ErrorCode::E7004).with_message(message)
}

/// Kind and context type; the context is `None` for global kinds.
fn decode(
    annotation: &Annotation,
    factory: &ItemFactory,
) -> Result<(SyntheticKind, Option<TypeId>), Diagnostic> {
    let Some(AnnotationValue::String(value)) = annotation.element(factory.intern_name(VALUE_ELEMENT))
    else {
        return Err(malformed("synthetic marker has no string value"));
    };
    let value = factory.name_str(*value);
    let mut parts = value.splitn(3, ':');
    let (Some(id), Some(version), Some(context)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed(format!("synthetic marker `{value}` has too few fields")));
    };

    let kind = id
        .parse::<u32>()
        .ok()
        .and_then(SyntheticKind::from_id)
        .ok_or_else(|| {
            Diagnostic::error(ErrorCode::E7002)
                .with_message(format!("unknown synthetic kind `{id}`"))
        })?;
    if version != naming_version_hash() {
        return Err(Diagnostic::error(ErrorCode::E7003)
            .with_message(format!(
                "synthetic marker version `{version}` does not match `{}`",
                naming_version_hash()
            ))
            .with_note("the input was compiled by a different compiler version"));
    }

    if kind.is_global() {
        if !context.is_empty() {
            return Err(malformed(format!("global {kind} marker carries a context")));
        }
        return Ok((kind, None));
    }
    if !is_valid_type_descriptor(context) {
        return Err(malformed(format!("invalid context descriptor `{context}`")));
    }
    Ok((kind, Some(factory.intern_type(context))))
}
