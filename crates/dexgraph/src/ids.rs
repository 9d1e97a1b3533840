//! Handles for canonical entities.
//!
//! Every canonical entity lives in a [`DexContext`](crate::DexContext) arena and
//! is addressed by one of these handles. Within one context two handles are
//! equal exactly when they name the same entity, so handle comparison stands in
//! for value comparison everywhere in the graph.
//!
//! Handles deliberately have no `Ord`: arena order is creation order, which is
//! never the dex order. Use the comparators in [`order`](crate::order).

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub(crate) fn new(index: u32) -> Self {
                Self(index)
            }

            /// Raw arena index, for debugging and external side tables.
            #[inline]
            pub fn as_u32(self) -> u32 {
                self.0
            }

            #[inline]
            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Canonical string.
    StringId
);
define_id!(
    /// Canonical type descriptor.
    TypeId
);
define_id!(
    /// Canonical ordered list of types.
    TypeListId
);
define_id!(
    /// Canonical method prototype.
    ProtoId
);
define_id!(
    /// Canonical field reference.
    FieldId
);
define_id!(
    /// Canonical method reference.
    MethodId
);

/// Entity kind, used in resolution and encoding errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdKind {
    String,
    Type,
    TypeList,
    Proto,
    Field,
    Method,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Type => "type",
            Self::TypeList => "type list",
            Self::Proto => "proto",
            Self::Field => "field",
            Self::Method => "method",
        };
        f.write_str(name)
    }
}
