use tokio_postgres::Config as PostgresConfig;

/// Configuration for the replication connection and session.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection configuration.
    pub postgres_config: PostgresConfig,

    /// Tables to publish (empty means all tables).
    pub tables: Vec<String>,

    /// Replication slot name.
    pub slot: String,

    /// Publication name passed to the pgoutput plugin.
    pub publication: String,
}

impl Config {
    /// Creates a config from a connection string.
    ///
    /// # Errors
    /// Returns an error if the connection string cannot be parsed.
    pub fn new(
        connection_string: &str,
        slot: String,
        publication: String,
    ) -> Result<Self, tokio_postgres::Error> {
        let postgres_config = connection_string.parse::<PostgresConfig>()?;

        Ok(Self {
            postgres_config,
            tables: Vec::new(),
            slot,
            publication,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let postgres_config = "host=localhost user=postgres password=postgres dbname=postgres"
            .parse::<PostgresConfig>()
            .expect("Default PostgreSQL config should be valid");

        Self {
            postgres_config,
            tables: Vec::new(),
            slot: "pg_relay_slot".to_string(),
            publication: "pg_relay_pub".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_connection_string() {
        let config = Config::new(
            "host=localhost user=testuser password=testpass dbname=testdb",
            "test_slot".to_string(),
            "test_pub".to_string(),
        )
        .unwrap();

        let host = &config.postgres_config.get_hosts()[0];
        let tokio_postgres::config::Host::Tcp(host) = host else {
            panic!("Expected TCP host");
        };
        assert_eq!(host.as_str(), "localhost");
        assert_eq!(config.postgres_config.get_user(), Some("testuser"));
        assert_eq!(config.postgres_config.get_dbname(), Some("testdb"));
        assert_eq!(config.slot, "test_slot");
        assert_eq!(config.publication, "test_pub");
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.slot, "pg_relay_slot");
        assert_eq!(config.publication, "pg_relay_pub");
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_invalid_connection_string() {
        let result = Config::new(
            "invalid connection string",
            "s".to_string(),
            "p".to_string(),
        );
        assert!(result.is_err());
    }
}
