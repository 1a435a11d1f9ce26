/*!
Application database - the catalog of installed desktop-file applications.

- `desktop_entry.rs` - desktop-file projection and desktop-ID derivation
- `menu.rs` - category menu over the catalog

The catalog is loaded explicitly with [`ApplicationDatabase::load`]; lookups
never touch the disk except for absolute paths that are not in the catalog.
*/

mod desktop_entry;
mod menu;

pub use desktop_entry::AppInfo;
pub use menu::{Menu, MenuSection, MAIN_CATEGORIES, OTHER_CATEGORY};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use freedesktop_desktop_entry::Iter;
use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{DesktopId, TrackerError, TrackerResult};
use desktop_entry::ParsedEntry;

/// Desktop IDs that appeared or disappeared during a rescan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogChanges {
  pub added: Vec<DesktopId>,
  pub removed: Vec<DesktopId>,
}

impl CatalogChanges {
  /// Nothing was added or removed.
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty()
  }
}

#[derive(Debug, Default)]
struct Catalog {
  apps: BTreeMap<DesktopId, AppInfo>,
  loaded: bool,
}

/// Installed applications keyed by desktop ID.
#[derive(Debug)]
pub struct ApplicationDatabase {
  search_paths: Vec<PathBuf>,
  catalog: RwLock<Catalog>,
}

impl ApplicationDatabase {
  /// Database over the given `applications` directories, highest precedence
  /// first. Nothing is read until [`load`](Self::load).
  pub fn new(search_paths: impl IntoIterator<Item = PathBuf>) -> Self {
    Self {
      search_paths: search_paths.into_iter().collect(),
      catalog: RwLock::new(Catalog::default()),
    }
  }

  /// Database over the XDG application directories of this session:
  /// `$XDG_DATA_HOME/applications`, then each of `$XDG_DATA_DIRS`.
  pub fn system() -> Self {
    Self::new(freedesktop_desktop_entry::default_paths())
  }

  /// Already-loaded database with a fixed set of applications.
  ///
  /// Has no search paths, so [`reload`](Self::reload) never changes it.
  pub fn from_applications(apps: impl IntoIterator<Item = AppInfo>) -> Self {
    let apps = apps.into_iter().map(|app| (app.desktop_id.clone(), app)).collect();
    Self {
      search_paths: Vec::new(),
      catalog: RwLock::new(Catalog { apps, loaded: true }),
    }
  }

  pub fn search_paths(&self) -> &[PathBuf] {
    &self.search_paths
  }

  pub fn is_loaded(&self) -> bool {
    self.catalog.read().loaded
  }

  /// Scan the search paths and replace the catalog.
  ///
  /// Missing directories count as empty. Fails only when every search path
  /// exists but none could be read.
  pub fn load(&self) -> TrackerResult<()> {
    let apps = scan(&self.search_paths)?;
    log::debug!("Application catalog loaded: {} applications", apps.len());
    *self.catalog.write() = Catalog { apps, loaded: true };
    Ok(())
  }

  /// Rescan and report what changed. A database without search paths keeps
  /// its current catalog.
  pub fn reload(&self) -> TrackerResult<CatalogChanges> {
    if self.search_paths.is_empty() {
      return Ok(CatalogChanges::default());
    }

    let apps = scan(&self.search_paths)?;
    let mut catalog = self.catalog.write();

    let added = apps
      .keys()
      .filter(|id| !catalog.apps.contains_key(*id))
      .cloned()
      .collect();
    let removed = catalog
      .apps
      .keys()
      .filter(|id| !apps.contains_key(*id))
      .cloned()
      .collect();

    *catalog = Catalog { apps, loaded: true };
    Ok(CatalogChanges { added, removed })
  }

  /// Look up an application by desktop ID, or by path if `id` is absolute.
  pub fn lookup_desktop_id(&self, id: &str) -> Option<AppInfo> {
    let path = Path::new(id);
    if path.is_absolute() {
      return self.lookup_path(path);
    }
    self.catalog.read().apps.get(id).cloned()
  }

  /// Look up the application defined by a desktop file.
  ///
  /// Files outside the catalog are parsed directly and identified by their
  /// file name.
  pub fn lookup_path(&self, path: &Path) -> Option<AppInfo> {
    let known = self
      .catalog
      .read()
      .apps
      .values()
      .find(|app| app.path == path)
      .cloned();
    if known.is_some() {
      return known;
    }

    let id = path.file_name()?.to_str()?;
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(e) => {
        log::debug!("Cannot read desktop file {}: {e}", path.display());
        return None;
      }
    };
    match desktop_entry::parse(&contents, DesktopId::from(id), path) {
      Ok(ParsedEntry::Application(app)) => Some(app),
      Ok(_) => None,
      Err(e) => {
        log::debug!("Invalid desktop file {}: {e}", path.display());
        None
      }
    }
  }

  /// Every application in the catalog, sorted by desktop ID.
  pub fn get_all_applications(&self) -> Vec<AppInfo> {
    self.catalog.read().apps.values().cloned().collect()
  }

  pub fn get_application_menu(&self) -> Menu {
    Menu::build(self.catalog.read().apps.values())
  }

  pub fn len(&self) -> usize {
    self.catalog.read().apps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.catalog.read().apps.is_empty()
  }
}

/// Read every search path, earlier paths shadowing later ones.
fn scan(search_paths: &[PathBuf]) -> TrackerResult<BTreeMap<DesktopId, AppInfo>> {
  let mut apps = BTreeMap::new();
  let mut seen: HashSet<DesktopId> = HashSet::new();
  let mut first_error = None;
  let mut readable = search_paths.is_empty();

  for app_dir in search_paths {
    match fs::read_dir(app_dir) {
      Ok(_) => readable = true,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        readable = true;
        continue;
      }
      Err(e) => {
        log::warn!("Cannot read application directory {}: {e}", app_dir.display());
        first_error.get_or_insert(TrackerError::Catalog {
          path: app_dir.clone(),
          source: e,
        });
        continue;
      }
    }

    let mut files: Vec<PathBuf> = Iter::new(vec![app_dir.clone()]).collect();
    files.sort();

    for file in files {
      let Some(id) = desktop_entry::desktop_id_for(app_dir, &file) else {
        continue;
      };
      if seen.contains(&id) {
        continue;
      }
      let contents = match fs::read_to_string(&file) {
        Ok(contents) => contents,
        Err(e) => {
          log::warn!("Skipping unreadable desktop file {}: {e}", file.display());
          continue;
        }
      };
      match desktop_entry::parse(&contents, id.clone(), &file) {
        Ok(ParsedEntry::Application(app)) => {
          apps.insert(id.clone(), app);
          seen.insert(id);
        }
        Ok(ParsedEntry::Hidden | ParsedEntry::NotApplication) => {
          seen.insert(id);
        }
        Err(e) => log::warn!("Skipping invalid desktop file {}: {e}", file.display()),
      }
    }
  }

  match first_error {
    Some(e) if !readable => Err(e),
    _ => Ok(apps),
  }
}
