//! The descriptor registry.
//!
//! Every completion source reads from one [`Registry`]: keywords, implicit
//! objects and scopes are registered once at startup, taglibs (with their
//! functions and tags) whenever a TLD is imported, and document variables
//! by the [`DocumentVariables`](crate::sources::document_vars::DocumentVariables)
//! refresh listener.
//!
//! Entries live in an ordered arena keyed by [`EntryId`], so query results
//! come back in insertion order.  A per-kind index keeps typed queries
//! proportional to the number of entries of that kind.
//!
//! # Refreshing
//!
//! An entry added with [`NewEntry::refreshable`] has a finite live time.
//! When it is read after that time has elapsed its refresh callable is
//! invoked and decides whether to keep, replace or drop the element.
//! Independently, every query with `do_refresh = true` first broadcasts a
//! refresh signal to all listeners registered with [`Registry::on_refresh`],
//! which lets the document scanner rescan lazily instead of on a timer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock, elapsed_between};
use crate::descriptor::{Descriptor, DescriptorKind, TaglibDesc};

/// Opaque identity of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entry {0:?} is not part of the registry")]
    NotRegistered(EntryId),
}

/// What a refresh callable decided for an expired entry.
#[derive(Debug, Clone)]
pub enum Refresh {
    /// Keep the current element and restart its live time.
    Keep,
    /// Store a new element in place and restart its live time.
    Replace(Descriptor),
    /// Drop the entry.
    Remove,
}

pub type RefreshFn = Box<dyn FnMut(&Descriptor) -> Refresh + Send>;
pub type RefreshListener = Box<dyn FnMut(&mut Registry) + Send>;

/// Arguments of [`Registry::add`].
pub struct NewEntry {
    element: Descriptor,
    live_time: Option<Duration>,
    refresh: Option<RefreshFn>,
    owner: Option<EntryId>,
}

impl NewEntry {
    /// A static entry that lives until it is removed.
    pub fn new(element: Descriptor) -> Self {
        Self {
            element,
            live_time: None,
            refresh: None,
            owner: None,
        }
    }

    /// An entry that asks `refresh` what to do once `live_time` has passed.
    pub fn refreshable(
        element: Descriptor,
        live_time: Duration,
        refresh: impl FnMut(&Descriptor) -> Refresh + Send + 'static,
    ) -> Self {
        Self {
            element,
            live_time: Some(live_time),
            refresh: Some(Box::new(refresh)),
            owner: None,
        }
    }

    /// Tie this entry's lifetime to `owner`: removing the owner removes it.
    pub fn owned_by(mut self, owner: EntryId) -> Self {
        self.owner = Some(owner);
        self
    }
}

struct Entry {
    element: Descriptor,
    live_time: Option<Duration>,
    refresh: Option<RefreshFn>,
    last_changed: SystemTime,
    owner: Option<EntryId>,
}

/// One filter rule of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    /// Property name, see [`Descriptor::property`].
    pub name: String,
    pub matcher: RuleMatcher,
    /// Invert the rule.
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// The property equals this value.
    Value(String),
    /// The property is one of these values.
    Values(Vec<String>),
}

impl FilterRule {
    pub fn value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            matcher: RuleMatcher::Value(value.to_string()),
            negate: false,
        }
    }

    pub fn values<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            matcher: RuleMatcher::Values(values.into_iter().map(Into::into).collect()),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    fn accepts(&self, element: &Descriptor) -> bool {
        let property = element.property(&self.name);
        let hit = match (&self.matcher, property) {
            (RuleMatcher::Value(value), Some(prop)) => prop == value,
            (RuleMatcher::Values(values), Some(prop)) => values.iter().any(|v| v == prop),
            (_, None) => false,
        };
        hit != self.negate
    }
}

/// Selection passed to [`Registry::get_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub kind: Option<DescriptorKind>,
    pub filter: Vec<FilterRule>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: DescriptorKind) -> Self {
        Self {
            kind: Some(kind),
            filter: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.filter.push(rule);
        self
    }
}

/// The descriptor store.
pub struct Registry {
    entries: BTreeMap<EntryId, Entry>,
    by_kind: HashMap<DescriptorKind, BTreeSet<EntryId>>,
    /// Owner → owned entries, so the removal cascade never scans the arena.
    children: HashMap<EntryId, Vec<EntryId>>,
    next_id: u64,
    listeners: Vec<RefreshListener>,
    clock: Arc<dyn Clock>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_kind: HashMap::new(),
            children: HashMap::new(),
            next_id: 0,
            listeners: Vec::new(),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert an entry under a fresh identity.
    pub fn add(&mut self, new: NewEntry) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let kind = new.element.kind();
        self.entries.insert(
            id,
            Entry {
                element: new.element,
                live_time: new.live_time,
                refresh: new.refresh,
                last_changed: self.clock.now(),
                owner: new.owner,
            },
        );
        self.by_kind.entry(kind).or_default().insert(id);
        if let Some(owner) = new.owner {
            self.children.entry(owner).or_default().push(id);
        }
        id
    }

    /// Remove an entry and, recursively, every entry it owns.
    pub fn remove(&mut self, id: EntryId) -> Result<Descriptor, RegistryError> {
        let Some(entry) = self.entries.remove(&id) else {
            error!("attempted to remove unregistered registry entry {id:?}");
            return Err(RegistryError::NotRegistered(id));
        };
        if let Some(ids) = self.by_kind.get_mut(&entry.element.kind()) {
            ids.remove(&id);
        }

        if let Some(owner) = entry.owner
            && let Some(siblings) = self.children.get_mut(&owner)
        {
            siblings.retain(|sibling| *sibling != id);
        }
        for owned_id in self.children.remove(&id).unwrap_or_default() {
            let _ = self.remove(owned_id);
        }
        Ok(entry.element)
    }

    /// Subscribe to the refresh broadcast sent before every refreshing query.
    pub fn on_refresh(&mut self, listener: impl FnMut(&mut Registry) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Broadcast the refresh signal to every listener, in subscription order.
    pub fn refresh(&mut self) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener(self);
        }
        // Listeners subscribed during the broadcast were pushed onto the
        // fresh vector; keep them after the original ones.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }

    /// Read one entry, applying its refresh rule first.  Returns `None` if
    /// the entry does not exist or removed itself.
    pub fn get(&mut self, id: EntryId) -> Option<Descriptor> {
        let now = self.clock.now();
        let entry = self.entries.get_mut(&id)?;

        let expired = entry
            .live_time
            .is_some_and(|live| elapsed_between(entry.last_changed, now) >= live);
        if !expired {
            return Some(entry.element.clone());
        }

        let decision = match entry.refresh.as_mut() {
            Some(refresh) => refresh(&entry.element),
            None => Refresh::Keep,
        };
        match decision {
            Refresh::Keep => {
                entry.last_changed = now;
                Some(entry.element.clone())
            }
            Refresh::Replace(element) => {
                let (old_kind, new_kind) = (entry.element.kind(), element.kind());
                entry.element = element.clone();
                entry.last_changed = now;
                if old_kind != new_kind {
                    if let Some(ids) = self.by_kind.get_mut(&old_kind) {
                        ids.remove(&id);
                    }
                    self.by_kind.entry(new_kind).or_default().insert(id);
                }
                Some(element)
            }
            Refresh::Remove => {
                debug!("registry entry {id:?} expired");
                let _ = self.remove(id);
                None
            }
        }
    }

    /// Every live entry matching `query`, with its identity.
    pub fn get_all_entries(&mut self, query: &Query, do_refresh: bool) -> Vec<(EntryId, Descriptor)> {
        if do_refresh {
            self.refresh();
        }

        let candidates: Vec<EntryId> = match query.kind {
            Some(kind) => self
                .by_kind
                .get(&kind)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
            None => self.entries.keys().copied().collect(),
        };

        candidates
            .into_iter()
            .filter_map(|id| self.get(id).map(|element| (id, element)))
            .filter(|(_, element)| query.kind.is_none_or(|kind| element.kind() == kind))
            .filter(|(_, element)| query.filter.iter().all(|rule| rule.accepts(element)))
            .collect()
    }

    /// Every live descriptor matching `query`.
    pub fn get_all(&mut self, query: &Query, do_refresh: bool) -> Vec<Descriptor> {
        self.get_all_entries(query, do_refresh)
            .into_iter()
            .map(|(_, element)| element)
            .collect()
    }

    /// Register a taglib plus its functions and tags as owned entries.
    ///
    /// A live taglib with the same `uri` is removed first, together with
    /// everything it owns.
    pub fn import_taglib(&mut self, taglib: TaglibDesc) -> EntryId {
        let same_uri = Query::of_kind(DescriptorKind::Taglib).with_rule(FilterRule::value("uri", &taglib.uri));
        for (id, _) in self.get_all_entries(&same_uri, false) {
            debug!("replacing taglib {}", taglib.uri);
            let _ = self.remove(id);
        }

        let taglib = Arc::new(taglib);
        let id = self.add(NewEntry::new(Descriptor::Taglib(Arc::clone(&taglib))));
        for function in &taglib.functions {
            self.add(NewEntry::new(Descriptor::Function(Arc::clone(function))).owned_by(id));
        }
        for tag in &taglib.tags {
            self.add(NewEntry::new(Descriptor::Tag(Arc::clone(tag))).owned_by(id));
        }
        id
    }
}
