//! Category → fallback bindings.

use crate::base::category::CategoryKey;
use crate::base::consenterror::ConsentError;
use crate::consent::consentmap::ConsentMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A cookie-free fallback behavior.
pub trait AlternativeHandler: Send + Sync {
    fn invoke(&self, arguments: &[Value]) -> Result<(), ConsentError>;
}

impl<F> AlternativeHandler for F
where
    F: Fn(&[Value]) -> Result<(), ConsentError> + Send + Sync,
{
    fn invoke(&self, arguments: &[Value]) -> Result<(), ConsentError> {
        self(arguments)
    }
}

/// Handler name plus the arguments it is invoked with.
///
/// Encoded as a two-element JSON array: `["ga", ["UA-1234-1"]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeBinding {
    pub handler: String,
    pub arguments: Vec<Value>,
}

impl AlternativeBinding {
    pub fn new(handler: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            handler: handler.into(),
            arguments,
        }
    }
}

impl<'de> Deserialize<'de> for AlternativeBinding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (handler, arguments) = <(String, Vec<Value>)>::deserialize(deserializer)?;
        Ok(Self { handler, arguments })
    }
}

/// Named alternative handlers.
#[derive(Clone, Default)]
pub struct AlternativeHandlers {
    handlers: HashMap<String, Arc<dyn AlternativeHandler>>,
}

impl AlternativeHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler.
    pub fn register(&mut self, name: impl Into<String>, handler: impl AlternativeHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AlternativeHandler>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl fmt::Debug for AlternativeHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("AlternativeHandlers")
            .field("handlers", &names)
            .finish()
    }
}

/// Static category → fallback mapping, validated once at load.
#[derive(Clone, Default)]
pub struct AlternativeRegistry {
    bindings: BTreeMap<CategoryKey, AlternativeBinding>,
    handlers: AlternativeHandlers,
}

impl AlternativeRegistry {
    /// Registry without bindings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind categories to handlers, rejecting any binding whose handler is
    /// not registered.
    pub fn new(
        handlers: AlternativeHandlers,
        bindings: BTreeMap<CategoryKey, AlternativeBinding>,
    ) -> Result<Self, ConsentError> {
        for (category, binding) in &bindings {
            if !handlers.contains(&binding.handler) {
                return Err(ConsentError::UnknownAlternative {
                    category: category.to_string(),
                    name: binding.handler.clone(),
                });
            }
        }

        tracing::debug!(bindings = bindings.len(), "loaded alternative bindings");
        Ok(Self { bindings, handlers })
    }

    /// Load bindings from a JSON object `{category: [handler, [args]]}`.
    pub fn from_json(handlers: AlternativeHandlers, json: &str) -> Result<Self, ConsentError> {
        let bindings: BTreeMap<CategoryKey, AlternativeBinding> = serde_json::from_str(json)
            .map_err(|e| ConsentError::InvalidAlternatives {
                reason: e.to_string(),
            })?;
        Self::new(handlers, bindings)
    }

    /// Load bindings from base64-encoded JSON, as carried by page markup.
    pub fn from_encoded(handlers: AlternativeHandlers, encoded: &str) -> Result<Self, ConsentError> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConsentError::InvalidAlternatives {
                reason: e.to_string(),
            })?;
        let json = String::from_utf8(decoded).map_err(|e| ConsentError::InvalidAlternatives {
            reason: e.to_string(),
        })?;
        Self::from_json(handlers, &json)
    }

    pub fn binding(&self, key: &str) -> Option<&AlternativeBinding> {
        self.bindings.get(key)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryKey> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run the fallback for `key` unless `consents` allows it.
    ///
    /// Undecided counts as declined. Returns whether a handler ran.
    pub fn invoke_if_declined(&self, key: &str, consents: &ConsentMap) -> Result<bool, ConsentError> {
        if consents.is_allowed(key) {
            return Ok(false);
        }
        let Some(binding) = self.bindings.get(key) else {
            return Ok(false);
        };
        let handler = self
            .handlers
            .get(&binding.handler)
            .ok_or_else(|| ConsentError::UnknownAlternative {
                category: key.to_string(),
                name: binding.handler.clone(),
            })?;

        tracing::debug!(category = key, handler = %binding.handler, "running alternative");
        handler.invoke(&binding.arguments)?;
        Ok(true)
    }
}

impl fmt::Debug for AlternativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlternativeRegistry")
            .field("bindings", &self.bindings)
            .field("handlers", &self.handlers)
            .finish()
    }
}
