//! Record identifiers
//!
//! ULIDs are lexicographically sortable by creation time, which keeps store
//! listings stable without a separate sequence counter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Ulid);

        impl $name {
            /// Generate a new identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
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

        impl FromStr for $name {
            type Err = crate::error::ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ulid::from_string(s)
                    .map(Self)
                    .map_err(|_| crate::error::ModelError::InvalidId(s.to_string()))
            }
        }
    };
}

record_id!(
    /// Identifier of an analyzer-emitted issue
    IssueId
);
record_id!(
    /// Identifier of a detected alert
    AlertId
);
record_id!(
    /// Identifier of a synthesized recommendation
    RecommendationId
);
record_id!(
    /// Identifier of a classified action (also keys the gestation queue)
    ActionId
);
record_id!(
    /// Identifier of a tracked outcome
    OutcomeId
);
