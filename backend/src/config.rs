use std::path::PathBuf;

use serde::Deserialize;

use crate::auth::{AdminDirectory, FileAdminDirectory, StaticAdminDirectory};

/// Service settings read from Rocket's figment (`Rocket.toml`, `ROCKET_*` env vars).
#[derive(Deserialize, Debug, Default)]
pub struct AppConfig {
    /// JSON file holding the admin tokens. Takes precedence over `admins`.
    pub admins_file: Option<PathBuf>,
    #[serde(default)]
    pub admins: Vec<String>,
}

impl AppConfig {
    pub fn admin_directory(self) -> Box<dyn AdminDirectory> {
        match self.admins_file {
            Some(path) => Box::new(FileAdminDirectory::new(path)),
            None => Box::new(StaticAdminDirectory(self.admins)),
        }
    }

    pub fn has_admins(&self) -> bool {
        self.admins_file.is_some() || !self.admins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::Figment;
    use rocket::figment::providers::{Format, Toml};

    fn extract(toml: &str) -> AppConfig {
        Figment::from(Toml::string(toml)).extract().unwrap()
    }

    #[test]
    fn admins_default_to_empty() {
        let config = extract("");

        assert!(config.admins_file.is_none());
        assert!(config.admins.is_empty());
        assert!(!config.has_admins());
    }

    #[test]
    fn inline_admins_are_read() {
        let config = extract(r#"admins = ["root", "u1"]"#);

        assert_eq!(config.admins, vec!["root", "u1"]);
        assert!(config.has_admins());
    }

    #[rocket::async_test]
    async fn inline_admins_become_static_directory() {
        let directory = extract(r#"admins = ["root"]"#).admin_directory();

        assert_eq!(directory.admins().await.unwrap(), vec!["root"]);
    }

    #[rocket::async_test]
    async fn admins_file_wins() {
        let config = extract("admins = [\"root\"]\nadmins_file = \"/nonexistent/admins.json\"");

        // The file does not exist, so a lookup through it fails instead of falling back.
        assert!(config.admin_directory().admins().await.is_err());
    }
}
