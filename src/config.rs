use std::{collections::HashMap, path::Path, path::PathBuf};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub signing: SigningConfig,
    pub output: OutputConfig,
}

/// Where the signing certificate comes from when the command line does not say.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningConfig {
    /// PKCS#12 (PFX) file holding the private key and certificate.
    pub pfx_path: Option<PathBuf>,
    pub pfx_password: Option<SecretString>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Overwrite the input document with the signed one when no output path
    /// is given. Otherwise the signed document goes to stdout.
    pub in_place: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        Self::load_from("config/settings", env_vars)
    }

    /// Load defaults, then the optional settings file, then the environment.
    pub fn load_from(
        settings_file: impl AsRef<Path>,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("output.in_place", true)?
            .add_source(File::from(settings_file.as_ref()).required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format XMLDSIG_SIGNING__PFX_PATH or XMLDSIG_OUTPUT__IN_PLACE
            builder = builder.add_source(
                Environment::with_prefix("XMLDSIG")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config =
            Config::load_with_sources(Some(HashMap::new())).expect("Failed to load config");

        assert!(config.output.in_place);
        assert!(config.signing.pfx_path.is_none());
        assert!(config.signing.pfx_password.is_none());
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "signing.pfx_path".to_string(),
            "/etc/xmldsig/signer.pfx".to_string(),
        );
        env_vars.insert("signing.pfx_password".to_string(), "changeit".to_string());
        env_vars.insert("output.in_place".to_string(), "false".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(
            config.signing.pfx_path.as_deref(),
            Some(Path::new("/etc/xmldsig/signer.pfx"))
        );
        assert_eq!(
            config.signing.pfx_password.unwrap().expose_secret(),
            "changeit"
        );
        assert!(!config.output.in_place);
    }

    #[test]
    fn test_settings_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.toml");
        std::fs::write(
            &settings,
            "[signing]\npfx_path = \"from-file.pfx\"\n\n[output]\nin_place = false\n",
        )
        .unwrap();

        let mut env_vars = HashMap::new();
        // We just override the path
        env_vars.insert("signing.pfx_path".to_string(), "from-env.pfx".to_string());

        let config = Config::load_from(&settings, Some(env_vars)).expect("Failed to load config");

        assert_eq!(
            config.signing.pfx_path.as_deref(),
            Some(Path::new("from-env.pfx"))
        );
        // The other values come from the file
        assert!(!config.output.in_place);
    }

    #[test]
    fn test_missing_settings_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml"), Some(HashMap::new()))
            .expect("Failed to load config");
        assert!(config.output.in_place);
    }
}
