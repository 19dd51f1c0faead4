//! Configuration file loading and environment-variable overlay.
//!
//! The config is a flat JSON object with lowercase keys; every key is
//! optional. After file parsing, each key may be overridden by an
//! environment variable named `SQLTOELASTIC_<KEY UPPERCASED>`; array-typed
//! keys split the variable on commas. The overlay is an explicit key table,
//! so adding a config field means adding it here too.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dbprovider: String,
    pub connstr: String,
    pub sql: String,

    pub toupperfields: Vec<String>,
    pub tolowerfields: Vec<String>,
    pub addconstantfields: Vec<String>,
    pub expandjsonfields: Vec<String>,
    pub deescapefields: Vec<String>,

    pub elasticserverurl: String,
    pub cacertfile: String,
    pub allowinvalidhttpscert: bool,
    pub username: String,
    pub password: String,
    pub indexname: String,
    pub timestampfield: String,
    pub idfield: String,
    pub idprefix: String,
}

impl Config {
    /// Load the config file and apply the process-environment overlay.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let mut config: Config = serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in config file '{}'", path.display()))?;
        config.overlay(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply the environment overlay through an injectable lookup.
    ///
    /// An unset or empty variable leaves the file value untouched.
    pub fn overlay(&mut self, get: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| {
            get(&format!("SQLTOELASTIC_{}", key.to_uppercase())).filter(|v| !v.is_empty())
        };

        let string_keys: [(&str, &mut String); 11] = [
            ("dbprovider", &mut self.dbprovider),
            ("connstr", &mut self.connstr),
            ("sql", &mut self.sql),
            ("elasticserverurl", &mut self.elasticserverurl),
            ("cacertfile", &mut self.cacertfile),
            ("username", &mut self.username),
            ("password", &mut self.password),
            ("indexname", &mut self.indexname),
            ("timestampfield", &mut self.timestampfield),
            ("idfield", &mut self.idfield),
            ("idprefix", &mut self.idprefix),
        ];
        for (key, slot) in string_keys {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }

        let array_keys: [(&str, &mut Vec<String>); 5] = [
            ("toupperfields", &mut self.toupperfields),
            ("tolowerfields", &mut self.tolowerfields),
            ("addconstantfields", &mut self.addconstantfields),
            ("expandjsonfields", &mut self.expandjsonfields),
            ("deescapefields", &mut self.deescapefields),
        ];
        for (key, slot) in array_keys {
            if let Some(value) = lookup(key) {
                *slot = value.split(',').map(str::to_string).collect();
            }
        }

        if let Some(value) = lookup("allowinvalidhttpscert") {
            if let Ok(flag) = value.parse::<bool>() {
                self.allowinvalidhttpscert = flag;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_parses_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "dbprovider": "postgres",
                "connstr": "host=localhost user=app",
                "sql": "select * from logs",
                "tolowerfields": ["level"],
                "allowinvalidhttpscert": true,
                "indexname": "logs"
            }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.dbprovider, "postgres");
        assert_eq!(config.tolowerfields, vec!["level"]);
        assert!(config.allowinvalidhttpscert);
        assert_eq!(config.indexname, "logs");
        // Unlisted keys fall back to their defaults.
        assert_eq!(config.idprefix, "");
        assert!(config.toupperfields.is_empty());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn overlay_overrides_scalars_arrays_and_bools() {
        let mut config = Config {
            connstr: "from-file".into(),
            toupperfields: vec!["a".into()],
            ..Config::default()
        };

        config.overlay(|name| match name {
            "SQLTOELASTIC_CONNSTR" => Some("from-env".into()),
            "SQLTOELASTIC_TOUPPERFIELDS" => Some("x,y,z".into()),
            "SQLTOELASTIC_ALLOWINVALIDHTTPSCERT" => Some("true".into()),
            _ => None,
        });

        assert_eq!(config.connstr, "from-env");
        assert_eq!(config.toupperfields, vec!["x", "y", "z"]);
        assert!(config.allowinvalidhttpscert);
    }

    #[test]
    fn overlay_ignores_empty_values() {
        let mut config = Config {
            connstr: "from-file".into(),
            ..Config::default()
        };
        config.overlay(|name| match name {
            "SQLTOELASTIC_CONNSTR" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.connstr, "from-file");
    }
}
