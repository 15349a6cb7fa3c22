//! Shared numeric constants for the reconciliation engine.

// ── Equality ────────────────────────────────────────────────────

/// Tolerance for position and angle comparison, in page-space units (or degrees).
pub const POSITION_TOLERANCE: f64 = 0.5;

/// Tolerance for image footprint comparison, in page-space units.
pub const IMAGE_SIZE_TOLERANCE: f64 = 1.0;

// ── Text ────────────────────────────────────────────────────────

/// Content of a text item created from a palette drop.
pub const DEFAULT_TEXT: &str = "New text";

/// Fill color for text objects built by the constructors.
pub const DEFAULT_TEXT_FILL: &str = "#1F1A17";

/// Smallest font size a scale fold may produce.
pub const MIN_FONT_SIZE: f64 = 1.0;

/// Line height as a multiple of font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

/// Average glyph advance as a fraction of font size (in-memory measurement).
pub const GLYPH_ADVANCE: f64 = 0.6;

/// Extra advance applied to bold glyphs.
pub const BOLD_ADVANCE: f64 = 1.08;

// ── Placeholder ─────────────────────────────────────────────────

/// Border and diagonal color of the image placeholder marker.
pub const PLACEHOLDER_STROKE: &str = "#9A948E";

/// Background of the image placeholder marker.
pub const PLACEHOLDER_FILL: &str = "#F4F1EC";

// ── Page ────────────────────────────────────────────────────────

/// Page-space units per inch. Page space is DPI independent.
pub const UNITS_PER_INCH: f64 = 96.0;

/// US Letter short edge in inches.
pub const PAGE_SHORT_EDGE_IN: f64 = 8.5;

/// US Letter long edge in inches.
pub const PAGE_LONG_EDGE_IN: f64 = 11.0;

// ── Ingestion ───────────────────────────────────────────────────

/// Source prefixes accepted for dropped or pasted images.
pub const IMAGE_SOURCE_PREFIXES: [&str; 4] = ["blob:", "data:image/", "http://", "https://"];
