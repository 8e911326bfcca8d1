//! Process-unique identifiers. Every id is minted by a monotonic counter
//! and never reused, per the data model's identifier rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

macro_rules! id_type_u64 {
    ($name:ident, $counter:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        static $counter: AtomicU64 = AtomicU64::new(1);

        impl $name {
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type_u64!(WorkspaceId, NEXT_WORKSPACE_ID);
id_type_u64!(PaneGroupId, NEXT_PANE_GROUP_ID);
id_type_u64!(TabId, NEXT_TAB_ID);
id_type_u64!(SplitId, NEXT_SPLIT_ID);

/// Session and client identifiers are u32 on the wire (§6 Ranges: "never
/// zero"), so their generator starts at 1 and wraps into the same space
/// callers will see in binary frames and JSON control messages.
macro_rules! id_type_u32 {
    ($name:ident, $counter:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        static $counter: AtomicU32 = AtomicU32::new(1);

        impl $name {
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type_u32!(SessionId, NEXT_SESSION_ID);
id_type_u32!(ClientId, NEXT_CLIENT_ID);
