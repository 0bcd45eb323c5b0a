//! Source ids that never need processing again.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::file_store::{StateStore, load_or_default, reload_into, save_logged};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandledState {
    #[serde(default)]
    pub ids: BTreeSet<String>,
}

pub struct HandledSources {
    store: Box<dyn StateStore<HandledState>>,
    state: HandledState,
}

impl HandledSources {
    pub fn open(store: Box<dyn StateStore<HandledState>>) -> Self {
        let state = load_or_default(store.as_ref(), "handled sources");
        Self { store, state }
    }

    pub fn reload(&mut self) {
        reload_into(self.store.as_ref(), &mut self.state, "handled sources");
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.state.ids.contains(source_id)
    }

    pub fn mark(&mut self, source_id: &str) {
        if self.state.ids.insert(source_id.to_string()) {
            save_logged(self.store.as_ref(), &self.state, "handled sources");
        }
    }

    pub fn len(&self) -> usize {
        self.state.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.ids.is_empty()
    }
}
