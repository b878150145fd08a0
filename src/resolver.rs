//! Declared-taglib resolution.
//!
//! [`TaglibResolver::find_declared_taglibs`] answers "which taglibs, under
//! which prefixes, are visible at the cursor?".  It scans the text before
//! the cursor, follows include directives transitively, merges every
//! declaration it finds and looks the resulting URIs up in the registry.
//!
//! # Include resolution
//!
//! - An absolute include (`/WEB-INF/x.jspf`) is resolved against the web
//!   application root: the directory after `src/main` if the including
//!   file lives below one, else the nearest `webapp` directory.
//! - A relative include is resolved against the including file's
//!   directory.
//!
//! An include already on the current include trace is skipped, so cyclic
//! includes terminate.  A missing or unreadable include is logged and
//! contributes nothing; its siblings are unaffected.
//!
//! # Caching
//!
//! Scans of included files are cached per path.  A cached scan younger
//! than [`FreshnessPolicy::recheck_after`] is reused without touching the
//! file system; an older one is reused only if the file's modification
//! time has not moved past it.  Either way the cached file's own includes
//! are crawled again, so edits deeper in the include graph are picked up.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock, elapsed_between};
use crate::descriptor::{Descriptor, DescriptorKind};
use crate::fs::{FileSystem, OsFileSystem};
use crate::registry::{FilterRule, Query, Registry};
use crate::scanner::{FileInfos, TaglibDeclaration, scan_text};
use crate::types::DeclaredTaglib;

/// Why an include branch contributed nothing.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no web application root above {0}")]
    NoWebappRoot(PathBuf),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// When a cached scan must be checked against the file's modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub recheck_after: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            recheck_after: Duration::from_millis(400),
        }
    }
}

impl FreshnessPolicy {
    pub fn new(recheck_after: Duration) -> Self {
        Self { recheck_after }
    }

    /// `true` once the cached scan is old enough that the file must be
    /// stat'ed before trusting it.
    pub fn needs_recheck(&self, last_scan: SystemTime, now: SystemTime) -> bool {
        elapsed_between(last_scan, now) > self.recheck_after
    }
}

#[derive(Debug, Clone)]
struct CachedScan {
    last_scan: SystemTime,
    infos: FileInfos,
}

/// Declarations gathered from a file and everything it includes.
#[derive(Debug, Default)]
struct Crawled {
    /// Directive declarations, in merge order (outer file first).
    directives: Vec<TaglibDeclaration>,
    /// Every include seen, for diagnostics.
    includes: Vec<PathBuf>,
}

/// Resolves the taglibs in scope for a document.
pub struct TaglibResolver {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    policy: FreshnessPolicy,
    cache: HashMap<PathBuf, CachedScan>,
}

impl Default for TaglibResolver {
    fn default() -> Self {
        Self::new(Arc::new(OsFileSystem), Arc::new(SystemClock), FreshnessPolicy::default())
    }
}

impl std::fmt::Debug for TaglibResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaglibResolver")
            .field("policy", &self.policy)
            .field("cached_files", &self.cache.len())
            .finish()
    }
}

impl TaglibResolver {
    pub fn new(fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>, policy: FreshnessPolicy) -> Self {
        Self {
            fs,
            clock,
            policy,
            cache: HashMap::new(),
        }
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: FreshnessPolicy) {
        self.policy = policy;
    }

    /// Drop every cached scan.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// The taglibs visible to `text`, the content of `file_path` up to the
    /// cursor.  Without a path, includes cannot be followed and only the
    /// text itself is considered.
    pub fn find_declared_taglibs(
        &mut self,
        text: &str,
        file_path: Option<&Path>,
        registry: &mut Registry,
    ) -> Vec<DeclaredTaglib> {
        let root = scan_text(text);

        let crawled = match file_path {
            Some(path) => {
                let trace = vec![path.to_path_buf()];
                self.crawl_and_merge(&root, path, &trace)
            }
            None => Crawled {
                directives: root.taglib_declaration_directives.clone(),
                includes: Vec::new(),
            },
        };
        debug!(
            "resolved {} include(s) for {}",
            crawled.includes.len(),
            file_path.map_or_else(|| "<unsaved>".to_string(), |p| p.display().to_string())
        );

        // Namespaces first so that directives win on the same uri.
        let mut prefixes: HashMap<String, String> = HashMap::new();
        for decl in root
            .taglib_declaration_namespaces
            .iter()
            .chain(crawled.directives.iter())
        {
            prefixes.insert(decl.uri.clone(), decl.prefix.clone());
        }
        if prefixes.is_empty() {
            return Vec::new();
        }

        let query = Query::of_kind(DescriptorKind::Taglib)
            .with_rule(FilterRule::values("uri", prefixes.keys().cloned()));
        registry
            .get_all(&query, false)
            .into_iter()
            .filter_map(|descriptor| match descriptor {
                Descriptor::Taglib(desc) => Some(DeclaredTaglib {
                    prefix: prefixes.get(&desc.uri)?.clone(),
                    desc,
                }),
                _ => None,
            })
            .collect()
    }

    /// Follow the includes of `infos` (the scan of `path`) and merge the
    /// result.  Only directive declarations travel up from included files.
    fn crawl_and_merge(&mut self, infos: &FileInfos, path: &Path, trace: &[PathBuf]) -> Crawled {
        let mut merged = Crawled {
            directives: infos.taglib_declaration_directives.clone(),
            includes: Vec::new(),
        };

        for include in &infos.include_directives {
            let resolved = match resolve_include_path(path, include) {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!("cannot resolve include \"{include}\" in {}: {err}", path.display());
                    continue;
                }
            };
            if trace.contains(&resolved) {
                debug!("skipping cyclic include {}", resolved.display());
                continue;
            }

            let mut child_trace = Vec::with_capacity(trace.len() + 1);
            child_trace.push(resolved.clone());
            child_trace.extend_from_slice(trace);

            match self.restore_or_read_and_crawl(&resolved, &child_trace) {
                Ok(child) => {
                    merged.includes.push(resolved);
                    merged.includes.extend(child.includes);
                    merged.directives.extend(child.directives);
                }
                Err(err) => warn!("error reading included file: {err}"),
            }
        }

        merged
    }

    fn restore_or_read_and_crawl(&mut self, path: &Path, trace: &[PathBuf]) -> Result<Crawled, ResolveError> {
        if let Some(cached) = self.cache.get(path) {
            let now = self.clock.now();
            let reuse = if self.policy.needs_recheck(cached.last_scan, now) {
                let modified = self.fs.modified(path).map_err(|source| ResolveError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                modified <= cached.last_scan
            } else {
                true
            };
            if reuse {
                debug!("reusing cached scan of {}", path.display());
                let infos = cached.infos.clone();
                return Ok(self.crawl_and_merge(&infos, path, trace));
            }
        }
        self.read_scan_and_crawl(path, trace)
    }

    fn read_scan_and_crawl(&mut self, path: &Path, trace: &[PathBuf]) -> Result<Crawled, ResolveError> {
        debug!("scanning {}", path.display());
        let content = self.fs.read_to_string(path).map_err(|source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let infos = scan_text(&content);
        self.cache.insert(
            path.to_path_buf(),
            CachedScan {
                last_scan: self.clock.now(),
                infos: infos.clone(),
            },
        );
        Ok(self.crawl_and_merge(&infos, path, trace))
    }
}

/// Resolve an include directive's `file` value written in `including_file`.
pub fn resolve_include_path(including_file: &Path, include: &str) -> Result<PathBuf, ResolveError> {
    let dir = including_file.parent().unwrap_or(Path::new(""));
    let trimmed = include.trim_start_matches(['/', '\\']);
    if trimmed.len() != include.len() {
        let root = find_webapp_root(dir).ok_or_else(|| ResolveError::NoWebappRoot(including_file.to_path_buf()))?;
        Ok(normalize(&root.join(trimmed)))
    } else {
        Ok(normalize(&dir.join(include)))
    }
}

/// The web application root for files below `dir`.
///
/// The first `src` directory immediately followed by `main` and one more
/// directory gives `…/src/main/<dir>`; failing that, the first directory
/// literally called `webapp`.
pub fn find_webapp_root(dir: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = dir.components().collect();
    let is = |i: usize, name: &str| {
        components
            .get(i)
            .is_some_and(|c| matches!(c, Component::Normal(n) if *n == name))
    };

    let end = (0..components.len())
        .find(|&i| is(i, "src") && is(i + 1, "main") && matches!(components.get(i + 2), Some(Component::Normal(_))))
        .map(|i| i + 2)
        .or_else(|| (0..components.len()).find(|&i| is(i, "webapp")))?;

    Some(components[..=end].iter().collect())
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
