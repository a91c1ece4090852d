//! Process-wide settings
//!
//! Read once at startup and shared read-only between requests.

/// Datatable process settings
#[derive(Debug, Clone, Default)]
pub struct DatatableSettings {
    /// Pretty-print AJAX payloads with 4-space indentation
    pub debug: bool,
}

impl DatatableSettings {
    /// Settings from the environment.
    ///
    /// `DATATABLE_DEBUG` accepts `1`, `true` or `yes` (any case).
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var("DATATABLE_DEBUG")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        }
    }

    pub fn debug() -> Self {
        Self { debug: true }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_default_is_compact() {
        assert!(!DatatableSettings::default().debug);
        assert!(DatatableSettings::debug().debug);
    }
}
