//! Settings parser for .owkit/config.toml

use super::types::Settings;
use owkit_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const OWKIT_DIR: &str = ".owkit";

/// Load settings from .owkit/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(OWKIT_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Load settings from an explicit file.
///
/// Unlike [`load_settings`], a missing or malformed file is an error.
pub fn load_settings_from(config_path: &Path) -> Result<Settings> {
    if !config_path.is_file() {
        return Err(Error::ConfigNotFound {
            path: config_path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(config_path)?;
    let settings = toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {:?}: {}", config_path, e)))?;
    debug!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

/// Create a default config file in the .owkit/ directory
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let owkit_dir = project_path.join(OWKIT_DIR);

    if !owkit_dir.exists() {
        std::fs::create_dir_all(&owkit_dir)
            .map_err(|e| Error::config(format!("Failed to create .owkit dir: {}", e)))?;
    }

    let config_path = owkit_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# owkit configuration

[telemetry]
game_max_attempts = 60      # Feature negotiation attempts for game events
launcher_max_attempts = 25  # Feature negotiation attempts for launcher events
retry_delay_ms = 2000       # Pause between attempts
verbose = false             # Log every raw host push at debug level

[state]
# Directory for persistent state stores (empty = user data directory)
# storage_dir = "/path/to/storage"
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.telemetry.game_max_attempts, 60);
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let owkit_dir = temp.path().join(".owkit");
        std::fs::create_dir_all(&owkit_dir).unwrap();

        let config = r#"
[telemetry]
game_max_attempts = 5
retry_delay_ms = 100

[state]
storage_dir = "/var/tmp/owkit"
"#;
        std::fs::write(owkit_dir.join("config.toml"), config).unwrap();

        let settings = load_settings(temp.path());

        assert_eq!(settings.telemetry.game_max_attempts, 5);
        assert_eq!(settings.telemetry.launcher_max_attempts, 25);
        assert_eq!(settings.telemetry.retry_delay_ms, 100);
        assert_eq!(
            settings.state.storage_dir.as_deref(),
            Some(Path::new("/var/tmp/owkit"))
        );
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let owkit_dir = temp.path().join(".owkit");
        std::fs::create_dir_all(&owkit_dir).unwrap();
        std::fs::write(owkit_dir.join("config.toml"), "[telemetry\nverbose = ").unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_from_requires_file() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("owkit.toml");
        let err = load_settings_from(&missing).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { ref path } if path == &missing));

        std::fs::write(&missing, "[telemetry]\nretry_delay_ms = 10\n").unwrap();
        assert_eq!(load_settings_from(&missing).unwrap().telemetry.retry_delay_ms, 10);

        std::fs::write(&missing, "[telemetry\n").unwrap();
        assert!(matches!(
            load_settings_from(&missing).unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[test]
    fn test_init_config_dir_writes_parsable_defaults() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        let path = temp.path().join(".owkit").join("config.toml");
        assert!(path.exists());
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let temp = tempdir().unwrap();
        let owkit_dir = temp.path().join(".owkit");
        std::fs::create_dir_all(&owkit_dir).unwrap();
        std::fs::write(owkit_dir.join("config.toml"), "[telemetry]\nverbose = true\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        assert!(load_settings(temp.path()).telemetry.verbose);
    }
}
