//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn full_config() -> Config {
        let toml_str = r#"
[polymarket]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
api_key = "key"
api_secret = "c2VjcmV0"
api_passphrase = "pass"
proxy_address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
"#;
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_polymarket_config_defaults() {
        let config = PolymarketConfig::default();
        assert_eq!(config.host, "https://clob.polymarket.com");
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.signature_type, 1);
        assert!(config.private_key.is_empty());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.files.scheduled_tasks, "scheduled_tasks.csv");
        assert_eq!(config.files.orders_to_run, "orders_to_run.csv");
        assert_eq!(config.files.export_dir, ".");
        assert_eq!(config.runner.poll_interval_secs, 60);
        assert_eq!(config.runner.gtd_expiration_buffer_secs, 60);
    }

    #[test]
    fn test_runner_and_files_sections() {
        let toml_str = r#"
[files]
scheduled_tasks = "/tmp/tasks.csv"
export_dir = "/tmp/exports"

[runner]
poll_interval_secs = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.files.scheduled_tasks_path(), PathBuf::from("/tmp/tasks.csv"));
        assert_eq!(config.files.orders_to_run, "orders_to_run.csv");
        assert_eq!(config.files.export_dir(), PathBuf::from("/tmp/exports"));
        assert_eq!(config.runner.poll_interval_secs, 5);
        assert_eq!(config.runner.gtd_expiration_buffer_secs, 60);
    }

    #[test]
    fn test_paths_expand_tilde() {
        let toml_str = r#"
[files]
orders_to_run = "~/orders.csv"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let path = config.files.orders_to_run_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("orders.csv"));
    }

    #[test]
    fn test_validate_complete_config() {
        assert!(full_config().validate().is_ok());
    }

    #[test]
    fn test_validate_lists_missing_variables_in_order() {
        let mut config = full_config();
        config.polymarket.proxy_address.clear();
        config.polymarket.private_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Missing environment variables: POLYMARKET_KEY, POLYMARKET_PROXY_ADDRESS"));
    }

    #[test]
    fn test_validate_partial_api_credentials() {
        let mut config = full_config();
        config.polymarket.api_secret.clear();

        assert!(!config.derive_api_credentials());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("POLYMARKET_API_SECRET"));
        assert!(!err.contains("POLYMARKET_API_KEY"));
    }

    #[test]
    fn test_validate_without_api_credentials_derives() {
        let mut config = full_config();
        config.polymarket.api_key.clear();
        config.polymarket.api_secret.clear();
        config.polymarket.api_passphrase.clear();

        assert!(config.derive_api_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[polymarket]
chain_id = 80002

[runner]
poll_interval_secs = 15
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.polymarket.chain_id, 80002);
        assert_eq!(config.runner.poll_interval_secs, 15);
        assert_eq!(config.files.scheduled_tasks, "scheduled_tasks.csv");
    }

    #[test]
    fn test_load_missing_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.polymarket.signature_type, 1);
        assert_eq!(config.runner.gtd_expiration_buffer_secs, 60);
    }
}
