//! Default values for configuration fields, used by serde and educe.

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn pages() -> PathBuf {
        "pages".into()
    }

    pub fn components() -> PathBuf {
        "components".into()
    }

    pub fn assets() -> PathBuf {
        "assets".into()
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    pub fn extension() -> String {
        "vue".into()
    }

    pub fn styles() -> Vec<String> {
        vec![r"\.css$".into()]
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        5277
    }

    pub fn reload_port() -> u16 {
        5278
    }

    pub fn debounce_ms() -> u64 {
        300
    }
}
