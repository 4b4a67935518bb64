//! Configuration file loading.

use std::path::Path;

use kdll_common::{ConfigError, EngineConfig};
use tracing::info;

/// Read and validate an [`EngineConfig`] from a JSON file. Missing fields
/// take their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let config = EngineConfig::from_json_str(&json)?;
    info!(path = %path.display(), "Engine configuration file read");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config("/nonexistent/kdll.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn reads_partial_file() {
        let path = std::env::temp_dir().join(format!("kdll-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "limits": { "max_kernels": 64 }, "procamp_slots": 2 }"#)
            .unwrap();
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.limits.max_kernels, 64);
        assert_eq!(config.procamp_slots, 2);
        assert_eq!(config.cache, EngineConfig::default().cache);
    }
}
