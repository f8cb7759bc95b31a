use std::fmt;

use serde::{Deserialize, Serialize};

/// Records travel through the data service as untyped JSON.
pub type Record = serde_json::Value;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

name_newtype!(FragmentName);
name_newtype!(ControlId);
name_newtype!(EntitySet);

impl FragmentName {
    /// Segment after the last `.`, e.g. `app.view.fragments.SalesOrder` => `SalesOrder`.
    pub fn short_id(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl EntitySet {
    /// Addresses a single entity, e.g. `Orders` + `'A1'` => `Orders('A1')`.
    pub fn with_key(name: &str, key: &EntityKey) -> Self {
        Self(format!("{}({key})", name.trim_start_matches('/')))
    }

    /// Service-relative path with exactly one leading separator.
    pub fn path(&self) -> String {
        format!("/{}", self.0.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Int(value) => write!(f, "{value}"),
            EntityKey::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        EntityKey::Int(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Text(value.to_string())
    }
}
