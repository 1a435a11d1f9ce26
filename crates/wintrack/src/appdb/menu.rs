/*! Category menu built from the application catalog. */

use serde::Serialize;

use super::AppInfo;
use crate::types::DesktopId;

/// Freedesktop main categories, in menu order.
pub const MAIN_CATEGORIES: [&str; 11] = [
  "AudioVideo",
  "Development",
  "Education",
  "Game",
  "Graphics",
  "Network",
  "Office",
  "Science",
  "Settings",
  "System",
  "Utility",
];

/// Section for applications without a main category.
pub const OTHER_CATEGORY: &str = "Other";

/// One menu section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSection {
  pub category: String,
  /// Sorted by application name.
  pub applications: Vec<DesktopId>,
}

/// Applications grouped by main category. Empty sections are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Menu {
  pub sections: Vec<MenuSection>,
}

impl Menu {
  /// Section for a category, if it has any applications.
  pub fn section(&self, category: &str) -> Option<&MenuSection> {
    self.sections.iter().find(|s| s.category == category)
  }

  pub(crate) fn build<'a>(apps: impl IntoIterator<Item = &'a AppInfo>) -> Self {
    let mut buckets: Vec<Vec<&AppInfo>> = vec![Vec::new(); MAIN_CATEGORIES.len() + 1];

    for app in apps.into_iter().filter(|app| !app.no_display) {
      let slot = app
        .categories
        .iter()
        .find_map(|c| MAIN_CATEGORIES.iter().position(|main| main == c))
        .unwrap_or(MAIN_CATEGORIES.len());
      if let Some(bucket) = buckets.get_mut(slot) {
        bucket.push(app);
      }
    }

    let names = MAIN_CATEGORIES.iter().copied().chain([OTHER_CATEGORY]);
    let sections = names
      .zip(buckets)
      .filter(|(_, bucket)| !bucket.is_empty())
      .map(|(category, mut bucket)| {
        bucket.sort_by(|a, b| {
          a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.desktop_id.cmp(&b.desktop_id))
        });
        MenuSection {
          category: category.to_owned(),
          applications: bucket.into_iter().map(|app| app.desktop_id.clone()).collect(),
        }
      })
      .collect();

    Self { sections }
  }
}
