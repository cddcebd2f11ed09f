//! The concrete detectors.

pub mod brightness;
pub mod command;
pub mod display;
pub mod icons;
pub mod theme;
pub mod title;
pub mod users;

pub use brightness::Brightness;
pub use command::Command;
pub use display::Display;
pub use icons::Icons;
pub use theme::Theme;
pub use title::Title;
pub use users::Users;

use crate::background::{Background, GtkVersion, ToolkitSettings};
use crate::format::{FormatArg, LIST_SEPARATOR};
use serde::Serialize;

/// One setting as configured in each toolkit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolkitValues {
    /// Qt / KDE.
    pub qt: Option<String>,
    /// GTK 2.
    pub gtk2: Option<String>,
    /// GTK 3.
    pub gtk3: Option<String>,
    /// GTK 4.
    pub gtk4: Option<String>,
}

impl ToolkitValues {
    /// Collect one setting from every toolkit probe.
    pub(crate) fn collect(
        background: &Background,
        pick: fn(&ToolkitSettings) -> Option<&String>,
    ) -> Self {
        let gtk = |version| pick(&background.gtk(version)).cloned();
        Self {
            qt: pick(&background.qt()).cloned(),
            gtk2: gtk(GtkVersion::Gtk2),
            gtk3: gtk(GtkVersion::Gtk3),
            gtk4: gtk(GtkVersion::Gtk4),
        }
    }

    /// Whether no toolkit has the setting.
    pub fn is_empty(&self) -> bool {
        self.qt.is_none() && self.gtk2.is_none() && self.gtk3.is_none() && self.gtk4.is_none()
    }

    /// `Breeze [Qt], Adwaita [GTK2/3/4]`: Qt first, then GTK with equal
    /// neighbouring versions merged.
    pub fn pretty(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(qt) = &self.qt {
            parts.push(format!("{qt} [Qt]"));
        }

        let (g2, g3, g4) = (self.gtk2.as_deref(), self.gtk3.as_deref(), self.gtk4.as_deref());
        let mut push = |value: Option<&str>, label: &str| {
            if let Some(value) = value {
                parts.push(format!("{value} [{label}]"));
            }
        };
        if g2.is_some() && g2 == g3 && g3 == g4 {
            push(g2, "GTK2/3/4");
        } else if g2.is_some() && g2 == g3 {
            push(g2, "GTK2/3");
            push(g4, "GTK4");
        } else if g3.is_some() && g3 == g4 {
            push(g2, "GTK2");
            push(g3, "GTK3/4");
        } else {
            push(g2, "GTK2");
            push(g3, "GTK3");
            push(g4, "GTK4");
        }

        parts.join(LIST_SEPARATOR)
    }

    pub(crate) fn format_args(&self) -> Vec<FormatArg<'_>> {
        [&self.qt, &self.gtk2, &self.gtk3, &self.gtk4]
            .into_iter()
            .map(|value| FormatArg::Str(value.as_deref().unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(qt: Option<&str>, g2: Option<&str>, g3: Option<&str>, g4: Option<&str>) -> ToolkitValues {
        ToolkitValues {
            qt: qt.map(str::to_string),
            gtk2: g2.map(str::to_string),
            gtk3: g3.map(str::to_string),
            gtk4: g4.map(str::to_string),
        }
    }

    #[test]
    fn test_pretty_all_equal() {
        let v = values(None, Some("Adwaita"), Some("Adwaita"), Some("Adwaita"));
        assert_eq!(v.pretty(), "Adwaita [GTK2/3/4]");
    }

    #[test]
    fn test_pretty_partial_merges() {
        let v = values(None, Some("A"), Some("A"), Some("B"));
        assert_eq!(v.pretty(), "A [GTK2/3], B [GTK4]");

        let v = values(None, Some("A"), Some("B"), Some("B"));
        assert_eq!(v.pretty(), "A [GTK2], B [GTK3/4]");

        let v = values(None, None, Some("B"), Some("B"));
        assert_eq!(v.pretty(), "B [GTK3/4]");
    }

    #[test]
    fn test_pretty_no_merge_across_gap() {
        let v = values(None, Some("A"), Some("B"), Some("A"));
        assert_eq!(v.pretty(), "A [GTK2], B [GTK3], A [GTK4]");
    }

    #[test]
    fn test_pretty_qt_first() {
        let v = values(Some("Breeze"), None, Some("Adwaita-dark"), None);
        assert_eq!(v.pretty(), "Breeze [Qt], Adwaita-dark [GTK3]");
    }

    #[test]
    fn test_empty() {
        assert!(ToolkitValues::default().is_empty());
        assert_eq!(ToolkitValues::default().pretty(), "");
    }
}
