//! Variables declared by the active document.
//!
//! `var="…"` attributes on custom tags and `<jsp:useBean id class>`
//! declarations introduce page variables.  [`DocumentVariables`] listens to
//! the registry's refresh broadcast and, at most once per scan interval,
//! rescans the active document and brings the registry in line with it:
//! new names are inserted, re-typed beans are replaced and names that have
//! disappeared are removed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::elapsed_between;
use crate::descriptor::{Descriptor, DescriptorKind, VarDesc};
use crate::registry::{EntryId, NewEntry, Query, Refresh, Registry};
use crate::scanner::{BindingSource, scan_variables};

/// Text of the document the user is editing, shared between the server and
/// the variable scanner.
#[derive(Debug, Clone, Default)]
pub struct ActiveDocument {
    text: Arc<Mutex<Option<String>>>,
}

impl ActiveDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.text.lock() = Some(text.into());
    }

    pub fn clear(&self) {
        *self.text.lock() = None;
    }

    pub fn text(&self) -> Option<String> {
        self.text.lock().clone()
    }
}

#[derive(Debug, Clone)]
struct Owned {
    id: EntryId,
    var_type: Option<String>,
}

/// Keeps the registry's document variables in sync with the active document.
#[derive(Debug)]
pub struct DocumentVariables {
    active: ActiveDocument,
    interval: Arc<Mutex<Duration>>,
    last_scan: Option<SystemTime>,
    owned: HashMap<String, Owned>,
}

impl DocumentVariables {
    pub fn new(active: ActiveDocument, interval: Arc<Mutex<Duration>>) -> Self {
        Self {
            active,
            interval,
            last_scan: None,
            owned: HashMap::new(),
        }
    }

    /// Hand the scanner over to `registry` as a refresh listener.
    pub fn register(mut self, registry: &mut Registry) {
        registry.on_refresh(move |registry| self.on_refresh(registry));
    }

    fn on_refresh(&mut self, registry: &mut Registry) {
        let now = registry.now();
        let interval = *self.interval.lock();
        if let Some(last) = self.last_scan
            && elapsed_between(last, now) < interval
        {
            return;
        }
        self.last_scan = Some(now);

        let text = self.active.text().unwrap_or_default();
        self.sweep(&text, interval, registry);
    }

    /// Make the registry's document variables match `text`.
    pub fn sweep(&mut self, text: &str, live_time: Duration, registry: &mut Registry) {
        let desired = desired_variables(text);

        // Names bound by something other than this scanner (implicit
        // objects) are never shadowed.
        let reserved: Vec<String> = registry
            .get_all_entries(&Query::of_kind(DescriptorKind::Var), false)
            .into_iter()
            .filter(|(id, _)| !self.owned.values().any(|owned| owned.id == *id))
            .map(|(_, descriptor)| descriptor.name().to_string())
            .collect();

        let stale: Vec<String> = self
            .owned
            .iter()
            .filter(|(name, owned)| {
                !registry.contains(owned.id)
                    || !desired
                        .iter()
                        .any(|(n, ty)| n == *name && *ty == owned.var_type)
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in stale {
            if let Some(owned) = self.owned.remove(&name)
                && registry.contains(owned.id)
            {
                debug!("dropping document variable {name}");
                let _ = registry.remove(owned.id);
            }
        }

        for (name, var_type) in desired {
            if self.owned.contains_key(&name) || reserved.contains(&name) {
                continue;
            }
            let desc = match VarDesc::new(&name) {
                Ok(desc) => desc.with_type(var_type.as_deref().unwrap_or_default()),
                Err(_) => continue,
            };
            debug!("adding document variable {name}");
            let id = registry.add(NewEntry::refreshable(
                Descriptor::Var(Arc::new(desc)),
                live_time,
                |_| Refresh::Keep,
            ));
            self.owned.insert(name, Owned { id, var_type });
        }
    }
}

/// `name → type` of every variable `text` declares, in first-seen order.
///
/// The first binding of a name fixes its position.  A later bean
/// declaration re-types the name; a later plain `var` does not.
fn desired_variables(text: &str) -> Vec<(String, Option<String>)> {
    let mut out: Vec<(String, Option<String>)> = Vec::new();
    for binding in scan_variables(text) {
        match out.iter_mut().find(|(name, _)| *name == binding.name) {
            Some(existing) if binding.source == BindingSource::Bean => existing.1 = binding.var_type,
            Some(_) => {}
            None => out.push((binding.name, binding.var_type)),
        }
    }
    out
}
