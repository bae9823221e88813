use std::env;

/// Runtime settings read from the environment at startup.
///
/// | Variable | Default |
/// |----------|---------|
/// | `DATABASE_URL` | `sqlite://./data/barbershop.db` |
/// | `PORT` | `8080` |
/// | `ADMIN_EMAIL` | `admin@barbearia.com` |
/// | `ADMIN_PASSWORD` | `admin` |
/// | `ADMIN_NAME` | `Administrador` |
/// | `STATIC_DIR` | `./static` |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => 8080,
        };

        let admin_email = var("ADMIN_EMAIL")
            .unwrap_or_else(|| "admin@barbearia.com".to_string())
            .trim()
            .to_lowercase();
        if !admin_email.contains('@') {
            return Err(ConfigError::InvalidAdminEmail(admin_email));
        }

        Ok(Self {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://./data/barbershop.db".to_string()),
            port,
            admin_email,
            admin_password: var("ADMIN_PASSWORD").unwrap_or_else(|| "admin".to_string()),
            admin_name: var("ADMIN_NAME").unwrap_or_else(|| "Administrador".to_string()),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("ADMIN_EMAIL must be an email address, got {0:?}")]
    InvalidAdminEmail(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_email, "admin@barbearia.com");
        assert_eq!(config.database_url, "sqlite://./data/barbershop.db");
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn admin_email_is_normalised() {
        let config = load(&[("ADMIN_EMAIL", "  Dono@Barbearia.com "), ("PORT", " 9000 ")]).unwrap();
        assert_eq!(config.admin_email, "dono@barbearia.com");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            load(&[("PORT", "oitenta")]),
            Err(ConfigError::InvalidPort(value)) if value == "oitenta"
        ));
        assert!(matches!(load(&[("PORT", "70000")]), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn admin_email_without_at_is_rejected() {
        assert!(matches!(
            load(&[("ADMIN_EMAIL", "admin")]),
            Err(ConfigError::InvalidAdminEmail(value)) if value == "admin"
        ));
    }
}
