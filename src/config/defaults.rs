//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Site Defaults
// =============================================================================

pub fn default_site_name() -> String {
    "DealPort.co".to_string()
}

// =============================================================================
// Editing Defaults
// =============================================================================

/// Edits are sent to the document service at most every 500ms.
pub fn default_flush_interval_ms() -> u64 {
    500
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_filter() -> String {
    "info".to_string()
}
