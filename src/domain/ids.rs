//! Type-safe identifiers for drafts and the catalog entities they reference.
//!
//! Each identifier is a newtype wrapper around [`uuid::Uuid`] so that, for
//! example, a participant ID can never be passed where a nomination ID is
//! expected.

/// Declares a UUID newtype with the conversions shared by every identifier.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            utoipa::ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a draft (one per league season).
    DraftId
);

uuid_id!(
    /// Identifier of the league season that owns a draft.
    SeasonId
);

uuid_id!(
    /// Identifier of a league member taking part in a draft.
    ParticipantId
);

uuid_id!(
    /// Identifier of the ceremony whose nominations are being drafted.
    CeremonyId
);

uuid_id!(
    /// Identifier of a draftable nomination in the ceremony catalog.
    NominationId
);

uuid_id!(
    /// Identifier of a participant-authored ranked autodraft plan.
    PlanId
);
