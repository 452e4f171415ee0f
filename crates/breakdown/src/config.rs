use crate::prelude::*;
use breakdown_core::config::ExtractConfig;
use std::path::Path;

/// Build the extraction settings: defaults, then the TOML file if given,
/// then command-line switches.
pub fn load_config(path: Option<&Path>, amount: bool) -> Result<ExtractConfig> {
    let mut config = match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .wrap_err_with(|| f!("Failed to read config file {}", path.display()))?;
            ExtractConfig::from_toml(&source)
                .wrap_err_with(|| f!("Invalid config file {}", path.display()))?
        }
        None => ExtractConfig::default(),
    };

    if amount {
        config.amount = true;
    }

    log::debug!("extraction settings: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load_config(None, false).unwrap(), ExtractConfig::default());
    }

    #[test]
    fn test_flag_enables_amount() {
        assert!(load_config(None, true).unwrap().amount);
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breakdown.toml");
        std::fs::write(&path, "row_tolerance = 3.0\n[margins]\nleft = 0.0\n").unwrap();

        let config = load_config(Some(&path), false).unwrap();
        assert_eq!(config.row_tolerance, 3.0);
        assert_eq!(config.margins.left, 0.0);
        assert!(!config.amount);
    }

    #[test]
    fn test_flag_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breakdown.toml");
        std::fs::write(&path, "amount = false\n").unwrap();
        assert!(load_config(Some(&path), true).unwrap().amount);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/breakdown.toml")), false).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "amount = 3").unwrap();
        assert!(load_config(Some(&path), false).is_err());
    }
}
