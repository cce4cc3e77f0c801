// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

/// Results of earlier stages, attached to a type's working data and keyed by
/// their Rust type. A stage reads what upstream stages stored and adds its own.
#[derive(Default)]
pub struct Annotations {
    map: BTreeMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Annotations {
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map.get(&TypeId::of::<T>()).and_then(|b| b.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Annotations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Annotations({} entries)", self.map.len())
    }
}
