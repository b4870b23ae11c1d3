//! Severity classification for detection alerts
//!
//! This module maps the free-text `classification` label delivered by the
//! external service to one of five canonical tiers. The tier determines how
//! an alert is presented:
//! - Serious / Severe / Grievous: high-intensity, full-screen interrupt
//! - Simple / Minor: passive side toast

use ratatui::style::Color;

/// Canonical severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Simple,
    Minor,
    Serious,
    Severe,
    Grievous,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Simple => "Simple",
            Severity::Minor => "Minor",
            Severity::Serious => "Serious",
            Severity::Severe => "Severe",
            Severity::Grievous => "Grievous",
        }
    }

    /// Whether this tier interrupts the operator with a full-screen alert
    pub fn is_high_intensity(&self) -> bool {
        matches!(self, Severity::Serious | Severity::Severe | Severity::Grievous)
    }

    /// Accent color for toast/modal borders and the sidebar marker
    pub fn accent(&self) -> Color {
        match self {
            Severity::Simple => Color::Blue,
            Severity::Minor => Color::Yellow,
            Severity::Serious => Color::LightRed,
            Severity::Severe => Color::Red,
            Severity::Grievous => Color::Magenta,
        }
    }

    /// Icon glyph shown next to the alert
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Simple => "◌",
            Severity::Minor => "◉",
            Severity::Serious => "⚠",
            Severity::Severe => "▲",
            Severity::Grievous => "⬢",
        }
    }
}

/// Classify a raw severity label into a canonical tier.
///
/// Total and deterministic: matching is case-insensitive on the trimmed
/// label; an absent or unrecognized label falls back to `Simple`. The
/// misspelling `grevious` is accepted as `Grievous` because the external
/// service is known to emit it.
pub fn classify(label: Option<&str>) -> Severity {
    let normalized = label.unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "minor" => Severity::Minor,
        "serious" => Severity::Serious,
        "severe" => Severity::Severe,
        "grievous" | "grevious" => Severity::Grievous,
        _ => Severity::Simple,
    }
}
