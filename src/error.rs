use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum FoodgramError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    AlreadyExists(String),

    /// A relation row (favorite, cart entry, subscription) that should be there is not.
    #[error("{0}")]
    NotFound(String),

    #[error("{entity} {id} does not exist")]
    UnknownEntity { entity: &'static str, id: i32 },

    #[error("you cannot subscribe to yourself")]
    SelfSubscription,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FoodgramError {
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        FoodgramError::Config(msg.to_string())
    }

    /// Status the HTTP layer answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            FoodgramError::Validation(_)
            | FoodgramError::AlreadyExists(_)
            | FoodgramError::NotFound(_)
            | FoodgramError::SelfSubscription => 400,
            FoodgramError::UnknownEntity { .. } => 404,
            FoodgramError::Config(_) | FoodgramError::Store(_) | FoodgramError::Io(_) => 500,
        }
    }
}

/// Field name to the list of problems found with it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn into_result(self) -> Result<(), FoodgramError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FoodgramError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
