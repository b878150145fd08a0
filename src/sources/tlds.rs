//! Loading TLD files from the configured source directories.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::descriptor::{Descriptor, DescriptorKind};
use crate::registry::{Query, Registry};
use crate::tld::{TldError, load_tld};

/// Outcome of [`load_tlds`].
#[derive(Debug, Default)]
pub struct TldLoadReport {
    /// `(file, uri)` of every imported taglib.
    pub loaded: Vec<(PathBuf, String)>,
    pub failures: Vec<TldError>,
    /// Uris of taglibs dropped because no source provides them any more.
    pub removed: Vec<String>,
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(dir: &str) -> PathBuf {
    let Some(rest) = dir.strip_prefix('~') else {
        return PathBuf::from(dir);
    };
    match etcetera::home_dir() {
        Ok(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        Err(err) => {
            warn!("cannot expand {dir}: {err}");
            PathBuf::from(dir)
        }
    }
}

/// Every `*.tld` file below the given directories, sorted per directory.
pub fn collect_tld_paths<S: AsRef<str>>(dirs: &[S]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for dir in dirs {
        let root = expand_home(dir.as_ref());
        let mut found = Vec::new();
        for entry in WalkBuilder::new(&root).standard_filters(false).build() {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_some_and(|ft| ft.is_file()) && is_tld(path) {
                        found.push(path.to_path_buf());
                    }
                }
                Err(err) => warn!("cannot scan TLD source {}: {err}", root.display()),
            }
        }
        found.sort();
        debug!("found {} TLD file(s) in {}", found.len(), root.display());
        paths.extend(found);
    }
    paths
}

fn is_tld(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tld"))
}

/// Parse every TLD below `dirs` and import it into `registry`.
///
/// A file that fails to load is reported and skipped; the others are
/// still imported.  Taglibs from an earlier load that none of the files
/// provides any more are removed together with their functions and tags.
pub fn load_tlds<S: AsRef<str>>(dirs: &[S], registry: &mut Registry) -> TldLoadReport {
    let mut report = TldLoadReport::default();
    let previous = registry.get_all_entries(&Query::of_kind(DescriptorKind::Taglib), false);

    for path in collect_tld_paths(dirs) {
        match load_tld(&path) {
            Ok(taglib) => {
                let uri = taglib.uri.clone();
                registry.import_taglib(taglib);
                report.loaded.push((path, uri));
            }
            Err(err) => {
                warn!("{err}");
                report.failures.push(err);
            }
        }
    }

    // Re-imported uris already replaced their old entries.
    for (id, _) in previous {
        if !registry.contains(id) {
            continue;
        }
        if let Ok(Descriptor::Taglib(taglib)) = registry.remove(id) {
            info!("removed taglib {} (no longer provided)", taglib.uri);
            report.removed.push(taglib.uri.clone());
        }
    }
    report
}
