use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Error, Result};

/// Borrowed view of an inbound message's `params` field.
#[derive(Clone, Copy, Debug)]
pub struct Params<'a>(pub(crate) Option<&'a Value>);

impl<'a> Params<'a> {
    /// Deserializes the params, failing if the field is absent.
    pub fn to<T>(&self) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        if let Some(p) = self.to_opt()? {
            Ok(p)
        } else {
            Err(Error::ParamsMissing)
        }
    }

    /// Deserializes the params; `None` if the field is absent.
    pub fn to_opt<T>(&self) -> Result<Option<T>>
    where
        T: Deserialize<'a>,
    {
        match self.0 {
            Some(p) => match T::deserialize(p) {
                Ok(p) => Ok(Some(p)),
                Err(e) => Err(Error::ParamsParse(e)),
            },
            None => Ok(None),
        }
    }
}

type LocalMethod = Box<dyn Fn(Params) -> Result<Value> + Send + Sync>;

/// Table of locally served methods, fixed once the client is constructed.
///
/// Handlers run synchronously on the dispatch loop; a handler's return value
/// becomes the `result` of the response when the inbound message carried an
/// id, and is discarded for notifications. A handler that fails is reported
/// on the general error channel and answers nothing.
#[derive(Default)]
pub struct Methods {
    table: HashMap<String, LocalMethod>,
}

impl Methods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous
    /// registration of that name.
    pub fn with<T, F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        T: Serialize,
        F: Fn(Params) -> Result<T> + Send + Sync + 'static,
    {
        self.table
            .insert(name.into(), Box::new(move |params| to_value(handler(params)?)));
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&LocalMethod> {
        self.table.get(name)
    }
}

fn to_value(result: impl Serialize) -> Result<Value> {
    match serde_json::to_value(result) {
        Ok(value) => Ok(value),
        Err(e) => Err(Error::Serialize(e)),
    }
}
