// Integration tests for configuration file loading

use redis_geo::ClientConfig;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_client_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("client.conf");

    let config_content = r#"
# where the geo index lives
host 10.1.2.3
port 6380
db 4
username geo
password "p@ss word"
pool-size 16
connect-timeout-ms 250
command-timeout-ms 1000
"#;

    fs::write(&config_path, config_content).unwrap();

    let config = ClientConfig::from_file(&config_path).unwrap();

    assert_eq!(config.addr(), "10.1.2.3:6380");
    assert_eq!(config.db, 4);
    assert_eq!(config.username.as_deref(), Some("geo"));
    assert_eq!(config.password.as_deref(), Some("p@ss word"));
    assert_eq!(config.pool_size, 16);
    assert_eq!(config.connect_timeout, Duration::from_millis(250));
    assert_eq!(config.command_timeout, Some(Duration::from_secs(1)));
}

#[test]
fn test_client_config_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("client.conf");
    fs::write(&config_path, "port 7000\n").unwrap();

    let config = ClientConfig::from_file(&config_path).unwrap();
    let defaults = ClientConfig::default();

    assert_eq!(config.port, 7000);
    assert_eq!(config.host, defaults.host);
    assert_eq!(config.pool_size, defaults.pool_size);
    assert_eq!(config.command_timeout, None);
}

#[test]
fn test_client_config_errors_name_the_line() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("client.conf");
    fs::write(&config_path, "host localhost\nport lots\n").unwrap();

    let err = ClientConfig::from_file(&config_path).unwrap_err();
    assert!(format!("{:#}", err).contains("line 2"));
}

#[test]
fn test_client_config_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ClientConfig::from_file(temp_dir.path().join("absent.conf")).unwrap_err();
    assert!(err.to_string().contains("Failed to read configuration file"));
}
