//! Status helper enums mapping to SMALLINT lookup columns.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Parse a database status ID back into the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Queue message lifecycle status.
    MessageStatus {
        /// Waiting to be claimed (or waiting out a retry backoff).
        Pending = 1,
        /// Claimed by a dispatcher and currently being handled.
        Processing = 2,
        /// Handler reported success.
        Completed = 3,
        /// Dropped or permanently failed; never retried.
        Failed = 4,
        /// Retries exhausted; parked for manual inspection.
        DeadLettered = 5,
    }
}

define_status_enum! {
    /// Background job lifecycle status.
    JobStatus {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
        Cancelled = 5,
    }
}

define_status_enum! {
    /// Primitive artifact kind. Only `Regular` artifacts carry a workflow.
    ArtifactKind {
        Regular = 1,
        Folder = 2,
        Attachment = 3,
    }
}
