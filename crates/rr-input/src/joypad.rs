//! Joypad reports and overrides

use bitflags::bitflags;
use rr_core::InputField;

/// Number of digital fields the override buffer can address
pub const MAX_DIGITAL_FIELDS: usize = 256;

bitflags! {
    /// Which field states a joypad report includes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReportFilter: u8 {
        /// Include released fields
        const UP   = 0x01;
        /// Include pressed fields
        const DOWN = 0x02;
        const ALL  = Self::UP.bits() | Self::DOWN.bits();
    }
}

impl ReportFilter {
    #[inline]
    pub fn accepts(&self, pressed: bool) -> bool {
        if pressed {
            self.contains(ReportFilter::DOWN)
        } else {
            self.contains(ReportFilter::UP)
        }
    }
}

/// Build a `(name, pressed)` report of the fields that pass `filter`,
/// in port order
pub fn read_report(fields: &[InputField], filter: ReportFilter) -> Vec<(String, bool)> {
    fields
        .iter()
        .filter(|field| filter.accepts(field.pressed))
        .map(|field| (field.name.clone(), field.pressed))
        .collect()
}

/// Override flags handed to the host for one frame
#[derive(Clone, PartialEq, Eq)]
pub struct JoypadOverrideSet {
    flags: [bool; MAX_DIGITAL_FIELDS],
}

impl JoypadOverrideSet {
    /// Whether the field at `index` is forced pressed
    pub fn is_forced(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Indices of every forced field
    pub fn forced_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &forced)| forced.then_some(i))
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }
}

impl std::fmt::Debug for JoypadOverrideSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.forced_indices()).finish()
    }
}

/// Per-field override buffer written by `joypad.set`
#[derive(Debug, Clone)]
pub struct JoypadOverrides {
    flags: [bool; MAX_DIGITAL_FIELDS],
    used: bool,
}

impl JoypadOverrides {
    pub fn new() -> Self {
        Self {
            flags: [false; MAX_DIGITAL_FIELDS],
            used: false,
        }
    }

    /// Replace the buffer: every field for which `present` returns true is
    /// forced. Fields past [`MAX_DIGITAL_FIELDS`] are ignored.
    pub fn set<F>(&mut self, fields: &[InputField], mut present: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.flags = [false; MAX_DIGITAL_FIELDS];
        for (i, field) in fields.iter().enumerate().take(MAX_DIGITAL_FIELDS) {
            if present(&field.name) {
                self.flags[i] = true;
            }
        }
        if fields.len() > MAX_DIGITAL_FIELDS {
            tracing::warn!(
                "Joypad override ignores {} fields past slot {}",
                fields.len() - MAX_DIGITAL_FIELDS,
                MAX_DIGITAL_FIELDS
            );
        }
        self.used = true;
    }

    /// Whether overrides are pending for the next input poll
    pub fn in_use(&self) -> bool {
        self.used
    }

    /// Hand the pending overrides to the host and clear the buffer.
    /// A second call in the same frame returns `None`.
    pub fn take(&mut self) -> Option<JoypadOverrideSet> {
        if !self.used {
            return None;
        }
        let set = JoypadOverrideSet { flags: self.flags };
        self.clear();
        Some(set)
    }

    pub fn clear(&mut self) {
        self.flags = [false; MAX_DIGITAL_FIELDS];
        self.used = false;
    }
}

impl Default for JoypadOverrides {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<InputField> {
        vec![
            InputField::new("P1 Up", false),
            InputField::new("P1 Button 1", true),
            InputField::new("Coin 1", false),
        ]
    }

    #[test]
    fn test_report_filters() {
        let all = read_report(&fields(), ReportFilter::ALL);
        assert_eq!(all.len(), 3);

        let down = read_report(&fields(), ReportFilter::DOWN);
        assert_eq!(down, vec![("P1 Button 1".to_string(), true)]);

        let up = read_report(&fields(), ReportFilter::UP);
        assert_eq!(up.len(), 2);
        assert!(up.iter().all(|(_, pressed)| !pressed));
    }

    #[test]
    fn test_override_consumed_once() {
        let mut overrides = JoypadOverrides::new();
        assert!(!overrides.in_use());

        overrides.set(&fields(), |name| name == "Coin 1");
        assert!(overrides.in_use());

        let set = overrides.take().unwrap();
        assert!(set.is_forced(2));
        assert!(!set.is_forced(0));
        assert_eq!(set.forced_indices().collect::<Vec<_>>(), vec![2]);

        assert!(!overrides.in_use());
        assert!(overrides.take().is_none());
    }

    #[test]
    fn test_set_replaces_previous() {
        let mut overrides = JoypadOverrides::new();
        overrides.set(&fields(), |name| name == "P1 Up");
        overrides.set(&fields(), |name| name == "Coin 1");

        let set = overrides.take().unwrap();
        assert!(!set.is_forced(0));
        assert!(set.is_forced(2));
    }

    #[test]
    fn test_empty_set_still_counts_as_used() {
        let mut overrides = JoypadOverrides::new();
        overrides.set(&fields(), |_| false);
        let set = overrides.take().unwrap();
        assert_eq!(set.forced_indices().count(), 0);
    }
}
