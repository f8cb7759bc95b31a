use std::str::FromStr;

use shared::domain::EntityKey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityPathError {
    #[error("entity path must start with '/': '{0}'")]
    MissingLeadingSeparator(String),
    #[error("entity path '{0}' names no entity set")]
    EmptyEntitySet(String),
    #[error("malformed key predicate in '{0}'")]
    MalformedKey(String),
}

/// `/Orders`, `/Orders(7)` or `/Orders('A1')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    pub entity_set: String,
    pub key: Option<EntityKey>,
}

impl FromStr for EntityPath {
    type Err = EntityPathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| EntityPathError::MissingLeadingSeparator(raw.to_string()))?;

        let (entity_set, key) = match rest.find('(') {
            Some(open) => {
                let predicate = rest[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| EntityPathError::MalformedKey(raw.to_string()))?;
                (&rest[..open], Some(parse_key(predicate, raw)?))
            }
            None => (rest, None),
        };

        if entity_set.is_empty() {
            return Err(EntityPathError::EmptyEntitySet(raw.to_string()));
        }

        Ok(Self {
            entity_set: entity_set.to_string(),
            key,
        })
    }
}

fn parse_key(predicate: &str, raw: &str) -> Result<EntityKey, EntityPathError> {
    let predicate = predicate.trim();
    if let Some(text) = predicate
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        return Ok(EntityKey::Text(text.replace("''", "'")));
    }

    predicate
        .parse::<i64>()
        .map(EntityKey::Int)
        .map_err(|_| EntityPathError::MalformedKey(raw.to_string()))
}
