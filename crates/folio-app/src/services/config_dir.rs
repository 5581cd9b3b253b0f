// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration file location.

use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

/// Default configuration file: `$XDG_CONFIG_HOME/folio/config.json`, falling
/// back to `~/.config/folio/config.json`.
pub fn default_config_path() -> PathBuf {
    config_base(
        std::env::var_os("XDG_CONFIG_HOME").as_deref().map(Path::new),
        std::env::var_os("HOME").as_deref().map(Path::new),
    )
    .join("folio")
    .join(CONFIG_FILE)
}

fn config_base(xdg: Option<&Path>, home: Option<&Path>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return xdg.to_path_buf();
    }
    if let Some(home) = home {
        return home.join(".config");
    }
    // Last resort: next to the work directory.
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = config_base(Some(Path::new("/xdg")), Some(Path::new("/home/op")));
        assert_eq!(base, PathBuf::from("/xdg"));
    }

    #[test]
    fn home_fallback() {
        assert_eq!(
            config_base(Some(Path::new("")), Some(Path::new("/home/op"))),
            PathBuf::from("/home/op/.config")
        );
        assert_eq!(config_base(None, None), PathBuf::from("."));
    }

    #[test]
    fn default_path_ends_in_folio_config() {
        assert!(default_config_path().ends_with("folio/config.json"));
    }
}
