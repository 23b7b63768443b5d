//! Read access to a holder of player models.
//!
//! The server's document store and the client's in-memory model set both
//! implement [`DataProvider`], so the desync checker can hash either one
//! the same way.

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::model::{Model, serialize_model};

/// Anything that can produce the current payload for a model type.
pub trait DataProvider {
    /// Identifiers of every model type currently held.
    fn type_ids(&self) -> Vec<String>;

    /// Current payload for `type_id`, or `None` if the type is not held.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if a held model cannot be serialized.
    fn serialized(&self, type_id: &str) -> Result<Option<String>, CodecError>;
}

/// Object-safe view of a [`Model`] so heterogeneous models share one map.
trait StoredModel: Send + Sync {
    fn payload(&self) -> Result<String, CodecError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn boxed_clone(&self) -> Box<dyn StoredModel>;
}

impl<T: Model> StoredModel for T {
    fn payload(&self) -> Result<String, CodecError> {
        serialize_model(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn boxed_clone(&self) -> Box<dyn StoredModel> {
        Box::new(self.clone())
    }
}

/// Typed, in-memory model set.
///
/// This is what a client holds as its predicted state: commands mutate the
/// typed models directly and the desync checker serializes them on demand.
#[derive(Default)]
pub struct LocalDataProvider {
    models: BTreeMap<&'static str, Box<dyn StoredModel>>,
}

impl LocalDataProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the model of type `T`.
    pub fn insert<T: Model>(&mut self, model: T) {
        self.models.insert(T::TYPE_ID, Box::new(model));
    }

    /// Borrow the model of type `T`, if held.
    pub fn get<T: Model>(&self) -> Option<&T> {
        self.models
            .get(T::TYPE_ID)
            .and_then(|m| m.as_any().downcast_ref::<T>())
    }

    /// Mutably borrow the model of type `T`, inserting a default one if absent.
    pub fn get_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.models
            .entry(T::TYPE_ID)
            .or_insert_with(|| Box::new(T::default()) as Box<dyn StoredModel>)
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Number of held models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is held.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Clone for LocalDataProvider {
    fn clone(&self) -> Self {
        Self {
            models: self
                .models
                .iter()
                .map(|(k, v)| (*k, v.boxed_clone()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for LocalDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDataProvider")
            .field("types", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DataProvider for LocalDataProvider {
    fn type_ids(&self) -> Vec<String> {
        self.models.keys().map(|k| (*k).to_owned()).collect()
    }

    fn serialized(&self, type_id: &str) -> Result<Option<String>, CodecError> {
        self.models.get(type_id).map(|m| m.payload()).transpose()
    }
}
