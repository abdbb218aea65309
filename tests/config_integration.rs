use serial_test::serial;
use std::env;
use std::fs;
use tara_chat::config::AppConfig;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("TARA_SERVER__PORT");
        env::remove_var("TARA_WAGES__API_URL");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("CHAT_ENDPOINT");
        env::remove_var("MINIMUM_WAGE_API_URL");
        env::remove_var("EXPORT_DIR");
        env::remove_var("LLM_BASE_URL");
        env::remove_var("LLM_MODEL");
        env::remove_var("LLM_API_KEY");
        env::remove_var("TARA_LLM__TEMPERATURE");
    }
}

fn load(args: &[&str]) -> AppConfig {
    let mut argv = vec!["tara-chat"];
    argv.extend_from_slice(args);
    AppConfig::load_from_args(argv).expect("Failed to load config")
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.client.endpoint, "http://127.0.0.1:5000");
    assert!(config.wages.api_url.is_none());
    assert_eq!(config.export.output_dir.to_str(), Some("exports"));
    assert!(config.llm.base_url.is_none());
    assert_eq!(config.llm.timeout_secs, 20);
}

#[test]
#[serial]
fn test_llm_env_vars() {
    clear_env_vars();
    unsafe {
        env::set_var("LLM_BASE_URL", "https://api.groq.com/openai");
        env::set_var("LLM_API_KEY", "gsk-test");
        env::set_var("TARA_LLM__TEMPERATURE", "0.7");
    }

    let config = load(&["--llm-model", "llama-3.3-70b-versatile"]);
    assert_eq!(config.llm.base_url.as_deref(), Some("https://api.groq.com/openai"));
    assert_eq!(config.llm.api_key.as_deref(), Some("gsk-test"));
    assert_eq!(config.llm.model.as_deref(), Some("llama-3.3-70b-versatile"));
    assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    assert!(!format!("{:?}", config.llm).contains("gsk-test"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("TARA_SERVER__PORT", "9090");
        env::set_var("TARA_WAGES__API_URL", "http://wages.test/api");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.wages.api_url.as_deref(), Some("http://wages.test/api"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("TARA_SERVER__PORT", "9090");
    }

    let config = load(&["--port", "8081", "--endpoint", "http://localhost:8081", "chat"]);
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.client.endpoint, "http://localhost:8081");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("tara.yaml");
    fs::write(
        &file_path,
        r"
server:
  port: 7070
export:
  output_dir: /tmp/reports
",
    )
    .expect("Failed to write temp config");

    // Point CONFIG_FILE at it, as a deployment would
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.export.output_dir.to_str(), Some("/tmp/reports"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let cwd_path = "config.yaml";
    fs::write(cwd_path, "server:\n  port: 6060\n").expect("Failed to write ./config.yaml");

    let result = AppConfig::load_from_args(["tara-chat"]);
    fs::remove_file(cwd_path).unwrap();

    assert_eq!(result.expect("Failed to load config").server.port, 6060);
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["tara-chat", "--config", "does-not-exist.yaml"]);
    assert!(result.is_err());
}
