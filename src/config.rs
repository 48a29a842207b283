// config.rs
const DEFAULT_DATABASE_URL: &str = "sqlite://blog.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
}

impl Config {
    /// Reads `DATABASE_URL` and `BIND_ADDR`. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        Self {
            database_url: read("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr: read("BIND_ADDR", DEFAULT_BIND_ADDR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn values_override_defaults() {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/blog".into()),
            "BIND_ADDR" => Some("127.0.0.1:8080".into()),
            _ => None,
        });
        assert_eq!(config.database_url, "postgres://localhost/blog");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn blank_values_fall_back() {
        let config = Config::from_lookup(|_| Some("  ".into()));
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }
}
