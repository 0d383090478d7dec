//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Borrow;
use std::hash::Hash;

/// Define a newtype wrapper around an `Rc<str>` to be used as an ID type
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Deserialize,
            serde::Serialize,
        )]
        /// An ID type (e.g. `UnitID`, `StorageID`, etc.)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.into())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s.into())
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(id.into())
            }
        }
    };
}
pub(crate) use define_id_type;

/// A data structure containing a set of IDs
pub trait IDCollection<ID> {
    /// Get the ID from the collection by its string representation.
    ///
    /// # Returns
    ///
    /// A copy of the ID in `self`, or an error if not found.
    fn get_id(&self, id: &str) -> Result<&ID>;
}

impl<ID> IDCollection<ID> for IndexSet<ID>
where
    ID: Eq + Hash + Borrow<str>,
{
    fn get_id(&self, id: &str) -> Result<&ID> {
        self.get(id)
            .with_context(|| format!("Unknown ID {id} found"))
    }
}

impl<ID, V> IDCollection<ID> for IndexMap<ID, V>
where
    ID: Eq + Hash + Borrow<str>,
{
    fn get_id(&self, id: &str) -> Result<&ID> {
        self.get_key_value(id)
            .map(|(id, _)| id)
            .with_context(|| format!("Unknown ID {id} found"))
    }
}
