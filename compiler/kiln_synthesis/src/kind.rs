//! Synthetic kinds.
//!
//! A kind tags what a synthetic item is for. Kinds are only hints for
//! naming and tooling; the compiler never branches on a particular kind
//! beyond the flags below. Every kind's descriptor appears in non-minified
//! names, so descriptors must be distinct.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// How items of a kind are shaped and named.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KindFlavor {
    /// A class holding exactly one static method.
    Method { allow_global_merging: bool },
    /// A whole class with a numbered name.
    Class { shareable: bool },
    /// A class named by its context plus a fixed suffix.
    Fixed { may_override_non_program_type: bool },
    /// A single program-wide class named by its type.
    Global { may_override_non_program_type: bool },
}

macro_rules! synthetic_kinds {
    ($($variant:ident => ($descriptor:expr, $flavor:expr),)*) => {
        /// Every synthetic kind. Ids are 1-based positions in declaration order.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum SyntheticKind {
            $($variant,)*
        }

        impl SyntheticKind {
            pub const ALL: &'static [SyntheticKind] = &[$(SyntheticKind::$variant,)*];

            /// Short tag used in names.
            pub const fn descriptor(self) -> &'static str {
                match self {
                    $(SyntheticKind::$variant => $descriptor,)*
                }
            }

            pub const fn flavor(self) -> KindFlavor {
                match self {
                    $(SyntheticKind::$variant => $flavor,)*
                }
            }
        }
    };
}

const fn method(allow_global_merging: bool) -> KindFlavor {
    KindFlavor::Method {
        allow_global_merging,
    }
}

const fn class(shareable: bool) -> KindFlavor {
    KindFlavor::Class { shareable }
}

const FIXED: KindFlavor = KindFlavor::Fixed {
    may_override_non_program_type: false,
};
const GLOBAL: KindFlavor = KindFlavor::Global {
    may_override_non_program_type: true,
};
const GLOBAL_CLASSPATH: KindFlavor = KindFlavor::Global {
    may_override_non_program_type: false,
};

synthetic_kinds! {
    // Global synthetics
    RecordTag => ("", GLOBAL),
    ApiModelStub => ("", GLOBAL),
    MethodHandlesLookup => ("", GLOBAL),
    VarHandle => ("", GLOBAL),

    // Classpath-only synthetics in the global type namespace
    GenericApiConversionStub => ("", GLOBAL_CLASSPATH),
    RetargetStub => ("", GLOBAL_CLASSPATH),
    EmulatedInterfaceMarkerClass => ("", GLOBAL_CLASSPATH),

    // Fixed suffix synthetics, each with a hygienic prefix type
    EnumUnboxingLocalUtilityClass => ("$EnumUnboxingLocalUtility", FIXED),
    EnumUnboxingSharedUtilityClass => ("$EnumUnboxingSharedUtility", FIXED),
    CompanionClass => ("$-CC", FIXED),
    EmulatedInterfaceClass => ("$-EL", FIXED),
    RetargetClass => ("RetargetClass", FIXED),
    RetargetInterface => ("RetargetInterface", FIXED),
    Wrapper => ("$Wrapper", FIXED),
    VivifiedWrapper => ("$VivifiedWrapper", FIXED),
    InitTypeArgument => ("-IA", FIXED),
    HorizontalInitTypeArgument1 => ("$$IA$1", FIXED),
    HorizontalInitTypeArgument2 => ("$$IA$2", FIXED),
    HorizontalInitTypeArgument3 => ("$$IA$3", FIXED),
    EnumConversion => ("$EnumConversion", FIXED),

    // Locally generated classes
    Lambda => ("Lambda", class(true)),
    ThreadLocal => ("ThreadLocal", class(true)),
    // Sharing would defeat the purpose of these classes.
    SharedSuperClass => ("SharedSuper", class(false)),
    NonFixedInitTypeArgument => ("$IA", class(false)),
    ConstDynamic => ("$Condy", class(false)),

    // Single-method synthetics
    EnumUnboxingCheckNotZeroMethod => ("CheckNotZero", method(true)),
    RecordHelper => ("Record", method(true)),
    Backport => ("Backport", method(true)),
    BackportWithForwarding => ("BackportWithForwarding", method(false)),
    StaticInterfaceCall => ("StaticInterfaceCall", method(false)),
    ToStringIfNotNull => ("ToStringIfNotNull", method(true)),
    ThrowCceIfNotNull => ("ThrowCCEIfNotNull", method(true)),
    ThrowIae => ("ThrowIAE", method(true)),
    ThrowIcce => ("ThrowICCE", method(true)),
    ThrowNsme => ("ThrowNSME", method(true)),
    ThrowRte => ("ThrowRTE", method(true)),
    TwrCloseResource => ("TwrCloseResource", method(true)),
    ServiceLoader => ("ServiceLoad", method(true)),
    Outline => ("Outline", method(false)),
    CovariantOutline => ("CovariantOutline", method(false)),
    ApiConversion => ("APIConversion", method(false)),
    ApiConversionParameters => ("APIConversionParameters", method(false)),
    CollectionConversion => ("$CollectionConversion", method(false)),
    ApiModelOutline => ("ApiModelOutline", method(true)),
    DesugaredLibraryBridge => ("DesugaredLibraryBridge", method(false)),
    Bridge => ("Bridge", method(false)),
}

impl SyntheticKind {
    /// 1-based id, stable for a given compiler version.
    pub fn id(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_id(id: u32) -> Option<SyntheticKind> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    pub fn is_single_method(self) -> bool {
        matches!(self.flavor(), KindFlavor::Method { .. })
    }

    /// Fixed-suffix kinds, including global kinds, are never numbered.
    pub fn is_fixed_suffix(self) -> bool {
        matches!(
            self.flavor(),
            KindFlavor::Fixed { .. } | KindFlavor::Global { .. }
        )
    }

    pub fn is_global(self) -> bool {
        matches!(self.flavor(), KindFlavor::Global { .. })
    }

    /// Whether two equal items of this kind may be merged.
    pub fn is_shareable(self) -> bool {
        match self.flavor() {
            KindFlavor::Method { .. } => true,
            KindFlavor::Class { shareable } => shareable,
            KindFlavor::Fixed { .. } | KindFlavor::Global { .. } => false,
        }
    }

    pub fn allows_global_merging(self) -> bool {
        matches!(
            self.flavor(),
            KindFlavor::Method {
                allow_global_merging: true
            }
        )
    }

    /// Whether a program definition of this kind may replace a classpath or
    /// library definition of the same type.
    pub fn may_override_non_program_type(self) -> bool {
        match self.flavor() {
            KindFlavor::Fixed {
                may_override_non_program_type,
            }
            | KindFlavor::Global {
                may_override_non_program_type,
            } => may_override_non_program_type,
            KindFlavor::Method { .. } | KindFlavor::Class { .. } => false,
        }
    }

    /// Whether items of this kind may be the context of further synthetics.
    ///
    /// Global items are shared by the whole program and have no single
    /// input to attribute a derived item to.
    pub fn may_be_context(self) -> bool {
        !self.is_global()
    }

    fn hash_into(self, hasher: &mut FxHasher) {
        self.id().hash(hasher);
        self.descriptor().hash(hasher);
        match self.flavor() {
            KindFlavor::Method { .. } => "method".hash(hasher),
            KindFlavor::Class { shareable } => {
                "class".hash(hasher);
                shareable.hash(hasher);
            }
            KindFlavor::Global {
                may_override_non_program_type,
            } => {
                "global".hash(hasher);
                may_override_non_program_type.hash(hasher);
            }
            KindFlavor::Fixed {
                may_override_non_program_type,
            } => {
                "fixed".hash(hasher);
                may_override_non_program_type.hash(hasher);
            }
        }
    }
}

impl fmt::Display for SyntheticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Hash over the compiler version and every kind, stamped into markers so
/// that intermediate output from a different naming scheme is rejected.
pub fn naming_version_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        let mut hasher = FxHasher::default();
        env!("CARGO_PKG_VERSION").hash(&mut hasher);
        for kind in SyntheticKind::ALL {
            kind.hash_into(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    })
}
