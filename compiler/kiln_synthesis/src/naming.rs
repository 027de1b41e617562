//! Synthetic naming scheme.
//!
//! Names are pure functions of kind, context and id:
//!
//! ```text
//! internal:  <context><INTERNAL_SEPARATOR><kind><unique suffix>
//! external:  <prefix><EXTERNAL_SEPARATOR><kind><decimal id>
//! fixed:     <context><kind>
//! global:    <type>
//! ```
//!
//! Internal names only exist between creation and finalization and must
//! never reach the output.

use crate::{invariant, SynthesizingContext, SyntheticKind};
use kiln_ir::{ItemFactory, TypeId};

/// Separator shared by every synthetic name.
pub const SYNTHETIC_CLASS_SEPARATOR: &str = "$$";
pub const INTERNAL_SYNTHETIC_CLASS_SEPARATOR: &str = "$$InternalSynthetic";
pub const EXTERNAL_SYNTHETIC_CLASS_SEPARATOR: &str = "$$";
/// Name of the single method of a finalized method synthetic.
pub const INTERNAL_SYNTHETIC_METHOD_NAME: &str = "m";

/// Naming phase of a numbered synthetic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Internal,
    External,
}

impl Phase {
    pub const fn separator(self) -> &'static str {
        match self {
            Phase::Internal => INTERNAL_SYNTHETIC_CLASS_SEPARATOR,
            Phase::External => EXTERNAL_SYNTHETIC_CLASS_SEPARATOR,
        }
    }
}

pub fn internal_binary_name(kind: SyntheticKind, context: &str, id: &str) -> String {
    invariant!(
        !kind.is_fixed_suffix(),
        "fixed kind {kind} has no internal name"
    );
    invariant!(!id.is_empty(), "internal name of {kind} needs a suffix");
    format!(
        "{context}{INTERNAL_SYNTHETIC_CLASS_SEPARATOR}{}{id}",
        kind.descriptor()
    )
}

/// External name; fixed kinds take no id, numbered kinds must have one.
pub fn external_binary_name(kind: SyntheticKind, prefix: &str, id: &str) -> String {
    invariant!(
        kind.is_fixed_suffix() == id.is_empty(),
        "external name of {kind} with id `{id}`"
    );
    if kind.is_fixed_suffix() {
        format!("{prefix}{}", kind.descriptor())
    } else {
        format!(
            "{prefix}{EXTERNAL_SYNTHETIC_CLASS_SEPARATOR}{}{id}",
            kind.descriptor()
        )
    }
}

pub fn fixed_binary_name(kind: SyntheticKind, context: &str) -> String {
    invariant!(kind.is_fixed_suffix(), "{kind} is not a fixed kind");
    format!("{context}{}", kind.descriptor())
}

pub fn create_internal_type(
    kind: SyntheticKind,
    context: &SynthesizingContext,
    id: &str,
    intermediate: bool,
    factory: &ItemFactory,
) -> TypeId {
    let context_type = context.synthesizing_input_context(intermediate);
    let name = internal_binary_name(kind, factory.binary_name(context_type), id);
    factory.type_for_binary_name(&name)
}

pub fn create_external_type(
    kind: SyntheticKind,
    prefix: &str,
    id: &str,
    factory: &ItemFactory,
) -> TypeId {
    factory.type_for_binary_name(&external_binary_name(kind, prefix, id))
}

pub fn create_fixed_type(
    kind: SyntheticKind,
    context: &SynthesizingContext,
    factory: &ItemFactory,
) -> TypeId {
    let context_type = context.synthesizing_context_type();
    factory.type_for_binary_name(&fixed_binary_name(kind, factory.binary_name(context_type)))
}

/// Prefix that numbered external names of `binary_name` share.
///
/// Accepts both internal names and already external names (synthetic inputs).
pub fn prefix_for_external_synthetic_type(kind: SyntheticKind, binary_name: &str) -> Option<&str> {
    if kind.is_global() {
        return Some(binary_name);
    }
    if kind.is_fixed_suffix() {
        return binary_name
            .rfind(kind.descriptor())
            .map(|index| &binary_name[..index]);
    }
    [Phase::Internal, Phase::External]
        .into_iter()
        .find_map(|phase| {
            let pattern = format!("{}{}", phase.separator(), kind.descriptor());
            binary_name.rfind(&pattern)
        })
        .map(|index| &binary_name[..index])
}

/// Outermost non-synthetic class a synthetic name was derived from.
pub fn outer_context_from_external_synthetic_type(
    kind: SyntheticKind,
    binary_name: &str,
) -> Option<&str> {
    invariant!(!kind.is_global(), "global {kind} has no outer context");
    let prefix = prefix_for_external_synthetic_type(kind, binary_name)?;
    Some(
        prefix
            .find(SYNTHETIC_CLASS_SEPARATOR)
            .map_or(prefix, |index| &prefix[..index]),
    )
}

/// Whether `binary_name` has the shape of a `kind` name in `phase`.
///
/// Fixed kinds ignore the phase. Global names carry no evidence.
pub fn is_synthetic(binary_name: &str, phase: Phase, kind: SyntheticKind) -> bool {
    if kind.is_global() {
        return false;
    }
    if kind.is_fixed_suffix() {
        return binary_name.ends_with(kind.descriptor());
    }
    let pattern = format!("{}{}", phase.separator(), kind.descriptor());
    let Some(index) = binary_name.rfind(&pattern) else {
        return false;
    };
    let suffix = &binary_name[index + pattern.len()..];
    match phase {
        Phase::Internal => !suffix.is_empty(),
        Phase::External => is_canonical_int(suffix),
    }
}

/// Whether `name` is free of internal synthetic separators.
pub fn verify_not_internal_synthetic(name: &str) -> bool {
    !name.contains(INTERNAL_SYNTHETIC_CLASS_SEPARATOR)
}

/// Non-empty decimal digits without a leading zero, or `0` itself.
fn is_canonical_int(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}
