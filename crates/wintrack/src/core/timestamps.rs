/*!
Timestamps for window-manager requests.

Sources are tried in [`TimestampSource::ALL`] order. The two toolkit tiers are
fed by the embedding application through [`Tracker::note_event_time`]; the
rest are asked of the window system.
*/

use super::Tracker;
use crate::platform::TimestampSource;

impl Tracker {
  /// Record the time of the most recent event a toolkit delivered.
  ///
  /// Only toolkit sources are recorded; the others belong to the window
  /// system and are ignored here.
  pub fn note_event_time(&self, source: TimestampSource, time: u32) {
    if !source.is_toolkit() {
      log::debug!("Ignoring event time for non-toolkit source {source:?}");
      return;
    }
    self.inner.toolkit_times.lock().insert(source, time);
  }

  /// Best available timestamp, or 0 if no source has one.
  pub fn current_time(&self) -> u32 {
    for source in TimestampSource::ALL {
      let time = if source.is_toolkit() {
        self.inner.toolkit_times.lock().get(&source).copied()
      } else {
        self.inner.system.timestamp(source)
      };
      match time {
        Some(time) if time != 0 => return time,
        _ => log::debug!("No timestamp from {source:?}, trying next source"),
      }
    }
    log::debug!("No usable timestamp from any source");
    0
  }
}
