//! Tri-state field for partial updates.
//!
//! A JSON payload field can be missing, explicitly `null`, or carry a value.
//! Collapsing that to `Option<T>` loses the difference between "leave it
//! alone" and "clear it", so partial-update payloads use [`Patch`] together
//! with `#[serde(default)]`:
//!
//! ```
//! use clawhq_core::Patch;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Update {
//!     #[serde(default)]
//!     mood: Patch<String>,
//! }
//!
//! let absent: Update = serde_json::from_str("{}").unwrap();
//! assert!(absent.mood.is_absent());
//! let cleared: Update = serde_json::from_str(r#"{"mood":null}"#).unwrap();
//! assert_eq!(cleared.mood, Patch::Null);
//! ```

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field was not present in the payload.
    Absent,
    /// Field was present and explicitly `null`.
    Null,
    /// Field was present with a value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// `None` when absent, `Some(None)` when null, `Some(Some(v))` otherwise.
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Self::Absent => None,
            Self::Null => Some(None),
            Self::Value(v) => Some(Some(v)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Value(v) => Patch::Value(f(v)),
        }
    }

    /// Write the patch into `target`; absent leaves it untouched.
    pub fn apply_to(self, target: &mut Option<T>) {
        if let Some(update) = self.into_update() {
            *target = update;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Self::Null, Self::Value))
    }
}
