/*!
Projection of decoded desktop files onto [`AppInfo`].

Decoding is done by `freedesktop_desktop_entry`. Only the `[Desktop Entry]`
group is read and localized keys (`Name[de]=...`) are not consulted, so every
string is the untranslated value.
*/

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use freedesktop_desktop_entry::DesktopEntry;
use serde::Serialize;

use crate::types::DesktopId;

/// Application metadata from one desktop file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppInfo {
  pub desktop_id: DesktopId,
  pub path: PathBuf,
  pub name: String,
  pub generic_name: Option<String>,
  pub comment: Option<String>,
  pub icon: Option<String>,
  pub exec: Option<String>,
  pub startup_wm_class: Option<String>,
  pub categories: Vec<String>,
  /// Installed but not meant to be shown in menus.
  pub no_display: bool,
  pub terminal: bool,
}

impl AppInfo {
  /// Minimal entry, for embedding applications that build their catalog by hand.
  pub fn new(desktop_id: impl Into<DesktopId>, name: impl Into<String>) -> Self {
    let desktop_id = desktop_id.into();
    Self {
      path: PathBuf::from(desktop_id.as_str()),
      desktop_id,
      name: name.into(),
      generic_name: None,
      comment: None,
      icon: None,
      exec: None,
      startup_wm_class: None,
      categories: Vec::new(),
      no_display: false,
      terminal: false,
    }
  }
}

/// What a desktop file turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedEntry {
  Application(AppInfo),
  /// `Hidden=true`: the ID is deleted, masking lower-precedence files.
  Hidden,
  /// Valid entry of another type (`Link`, `Directory`).
  NotApplication,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum DesktopEntryError {
  #[error("cannot decode desktop file: {0}")]
  Decode(String),
  #[error("required key '{0}' missing")]
  MissingKey(&'static str),
}

/// Desktop ID of `file` below the `applications` directory `app_dir`:
/// the relative path with `/` replaced by `-`.
pub(crate) fn desktop_id_for(app_dir: &Path, file: &Path) -> Option<DesktopId> {
  let relative = file.strip_prefix(app_dir).ok()?;
  let mut parts = Vec::new();
  for component in relative.components() {
    match component {
      Component::Normal(part) => parts.push(part.to_str()?),
      _ => return None,
    }
  }
  if parts.is_empty() {
    return None;
  }
  Some(DesktopId(parts.join("-")))
}

fn flag(entry: &DesktopEntry<'_>, key: &str) -> bool {
  entry.desktop_entry(key).is_some_and(|value| value.trim() == "true")
}

fn owned(value: Option<&str>) -> Option<String> {
  value.map(str::to_owned)
}

/// Decode the contents of a desktop file.
pub(crate) fn parse(
  contents: &str,
  desktop_id: DesktopId,
  path: &Path,
) -> Result<ParsedEntry, DesktopEntryError> {
  let entry =
    DesktopEntry::decode(path, contents).map_err(|e| DesktopEntryError::Decode(e.to_string()))?;

  if flag(&entry, "Hidden") {
    return Ok(ParsedEntry::Hidden);
  }
  match entry.type_() {
    Some("Application") => {}
    Some(_) => return Ok(ParsedEntry::NotApplication),
    None => return Err(DesktopEntryError::MissingKey("Type")),
  }
  let name = entry.name(None).ok_or(DesktopEntryError::MissingKey("Name"))?;

  Ok(ParsedEntry::Application(AppInfo {
    desktop_id,
    path: path.to_path_buf(),
    name: name.into_owned(),
    generic_name: entry.generic_name(None).map(Cow::into_owned),
    comment: entry.comment(None).map(Cow::into_owned),
    icon: owned(entry.icon()),
    exec: owned(entry.exec()),
    startup_wm_class: owned(entry.startup_wm_class()),
    categories: entry
      .categories()
      .map(|list| {
        list
          .split(';')
          .map(str::trim)
          .filter(|item| !item.is_empty())
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default(),
    no_display: entry.no_display(),
    terminal: flag(&entry, "Terminal"),
  }))
}
