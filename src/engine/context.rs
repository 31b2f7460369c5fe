// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-run typed key/value store shared by all steps of one run.
//!
//! Keys are declared once per workflow definition as [`ContextKey<T>`]
//! constants and registered with the builder, which rejects two declarations
//! of the same name with different types. At run time only declared keys may
//! be read or written, and `get` on a key nobody has set is an error rather
//! than a default.
//!
//! Values live in a sharded [`DashMap`], so writes to a single key are
//! linearizable without a store-wide lock. No multi-key transactions.
//!
//! # Example
//! ```
//! use caseflow::engine::{Context, ContextKey, ContextSchema};
//!
//! const ATTEMPTS: ContextKey<u32> = ContextKey::new("attempts");
//!
//! let mut schema = ContextSchema::default();
//! schema.declare(&ATTEMPTS).unwrap();
//!
//! let ctx = Context::new(schema.into());
//! assert!(ctx.get(&ATTEMPTS).is_err());
//! ctx.set(&ATTEMPTS, 3).unwrap();
//! assert_eq!(*ctx.get(&ATTEMPTS).unwrap(), 3);
//! ```

use crate::errors::{RegistrationError, WorkflowError};
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed name of a context entry.
pub struct ContextKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextKey<T> {}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey<{}>({})", type_name::<T>(), self.name)
    }
}

#[derive(Debug, Clone, Copy)]
struct Declaration {
    type_id: TypeId,
    type_name: &'static str,
}

/// The set of keys a workflow definition declares.
#[derive(Debug, Clone, Default)]
pub struct ContextSchema {
    keys: HashMap<&'static str, Declaration>,
}

impl ContextSchema {
    /// Declare a key. Re-declaring with the same type is a no-op.
    pub fn declare<T: Send + Sync + 'static>(
        &mut self,
        key: &ContextKey<T>,
    ) -> Result<(), RegistrationError> {
        let declaration = Declaration {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        };
        match self.keys.get(key.name) {
            Some(existing) if existing.type_id != declaration.type_id => {
                Err(RegistrationError::ConflictingContextKey {
                    key: key.name,
                    first: existing.type_name,
                    second: declaration.type_name,
                })
            }
            Some(_) => Ok(()),
            None => {
                self.keys.insert(key.name, declaration);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn check<T: 'static>(&self, key: &ContextKey<T>) -> Result<(), WorkflowError> {
        match self.keys.get(key.name) {
            None => Err(WorkflowError::UndeclaredContextKey(key.name)),
            Some(declared) if declared.type_id != TypeId::of::<T>() => {
                Err(WorkflowError::ContextTypeMismatch {
                    key: key.name,
                    expected: declared.type_name,
                })
            }
            Some(_) => Ok(()),
        }
    }
}

/// Handle to one run's context. Cloning shares the same store.
#[derive(Clone)]
pub struct Context {
    schema: Arc<ContextSchema>,
    values: Arc<DashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new(schema: Arc<ContextSchema>) -> Self {
        Self {
            schema,
            values: Arc::new(DashMap::new()),
        }
    }

    pub fn set<T: Send + Sync + 'static>(
        &self,
        key: &ContextKey<T>,
        value: T,
    ) -> Result<(), WorkflowError> {
        self.schema.check(key)?;
        self.values.insert(key.name, Arc::new(value));
        Ok(())
    }

    pub fn get<T: Send + Sync + 'static>(
        &self,
        key: &ContextKey<T>,
    ) -> Result<Arc<T>, WorkflowError> {
        self.schema.check(key)?;
        let value = self
            .values
            .get(key.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(WorkflowError::MissingContextKey(key.name))?;
        value
            .downcast::<T>()
            .map_err(|_| WorkflowError::ContextTypeMismatch {
                key: key.name,
                expected: type_name::<T>(),
            })
    }

    pub fn contains<T>(&self, key: &ContextKey<T>) -> bool {
        self.values.contains_key(key.name)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("declared", &self.schema.len())
            .field("set", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT: ContextKey<usize> = ContextKey::new("count");
    const NAME: ContextKey<String> = ContextKey::new("name");
    const COUNT_AS_TEXT: ContextKey<String> = ContextKey::new("count");

    fn context() -> Context {
        let mut schema = ContextSchema::default();
        schema.declare(&COUNT).unwrap();
        schema.declare(&NAME).unwrap();
        Context::new(Arc::new(schema))
    }

    #[test]
    fn test_get_missing_key_is_an_error() {
        let ctx = context();
        match ctx.get(&COUNT) {
            Err(WorkflowError::MissingContextKey("count")) => {}
            other => panic!("Expected MissingContextKey, got {:?}", other),
        }
    }

    #[test]
    fn test_set_then_get_round_trips_and_overwrites() {
        let ctx = context();
        ctx.set(&NAME, "Ada".to_string()).unwrap();
        ctx.set(&NAME, "Grace".to_string()).unwrap();
        assert_eq!(ctx.get(&NAME).unwrap().as_str(), "Grace");
        assert!(ctx.contains(&NAME));
        assert!(!ctx.contains(&COUNT));
    }

    #[test]
    fn test_undeclared_key_is_rejected() {
        let ctx = Context::new(Arc::new(ContextSchema::default()));
        match ctx.set(&COUNT, 1) {
            Err(WorkflowError::UndeclaredContextKey("count")) => {}
            other => panic!("Expected UndeclaredContextKey, got {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_declaration_is_rejected() {
        let mut schema = ContextSchema::default();
        schema.declare(&COUNT).unwrap();
        schema.declare(&COUNT).unwrap();
        match schema.declare(&COUNT_AS_TEXT) {
            Err(RegistrationError::ConflictingContextKey { key, .. }) => assert_eq!(key, "count"),
            other => panic!("Expected ConflictingContextKey, got {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_the_same_store() {
        let ctx = context();
        let other = ctx.clone();
        other.set(&COUNT, 7).unwrap();
        assert_eq!(*ctx.get(&COUNT).unwrap(), 7);
    }
}
