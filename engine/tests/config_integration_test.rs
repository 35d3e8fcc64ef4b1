//! Integration tests for configuration management
//!
//! Configs are parsed from TOML text with the data directory pointed at a
//! temporary directory, so nothing touches ~/.taskpal.

use std::path::Path;
use taskpal_engine::config::Config;
use taskpal_engine::session::TurnPolicy;
use tempfile::TempDir;

fn minimal_toml(data_dir: &Path) -> String {
    format!(
        r#"
[core]
data_dir = "{}"

[llm]
default_provider = "ollama"
"#,
        data_dir.display()
    )
}

#[test]
fn test_minimal_config_gets_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");

    let config = Config::from_toml_str(&minimal_toml(&data_dir)).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.llm.max_tokens, 512);
    assert_eq!(config.llm.timeout_secs, 60);
    assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
    assert_eq!(config.session.history_limit, 10);
    assert_eq!(config.session.context_window, 4);
    assert_eq!(config.store.backend, "sqlite");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8787);

    // Data directory is created during processing
    assert!(data_dir.exists());
    assert_eq!(config.store_path(), data_dir.join("sessions.db"));
}

#[test]
fn test_full_config_parsing() {
    let temp_dir = TempDir::new().unwrap();
    let toml_content = format!(
        r#"
[core]
log_level = "debug"
data_dir = "{data}"

[llm]
default_provider = "workers_ai"
max_tokens = 256
temperature = 0.25
timeout_secs = 30

[llm.workers_ai]
account_id = "acct-1"
model = "@cf/meta/llama-3.1-8b-instruct"

[llm.openai]
model = "gpt-4o"

[session]
history_limit = 20
context_window = 6

[store]
backend = "memory"
path = "{data}/custom.db"

[server]
host = "0.0.0.0"
port = 9000
"#,
        data = temp_dir.path().display()
    );

    let config = Config::from_toml_str(&toml_content).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "workers_ai");
    assert_eq!(config.llm.active_model(), "@cf/meta/llama-3.1-8b-instruct");
    assert_eq!(config.llm.workers_ai.account_id, "acct-1");
    assert_eq!(
        config.llm.workers_ai.base_url,
        "https://api.cloudflare.com/client/v4"
    );
    assert_eq!(config.llm.openai.model, "gpt-4o");
    assert_eq!(config.store.backend, "memory");
    assert_eq!(config.store_path(), temp_dir.path().join("custom.db"));
    assert_eq!(config.server.port, 9000);

    let policy = TurnPolicy::from_config(&config);
    assert_eq!(policy.history_limit, 20);
    assert_eq!(policy.context_window, 6);
    assert_eq!(policy.model, "@cf/meta/llama-3.1-8b-instruct");
    assert_eq!(policy.max_tokens, 256);
    assert_eq!(policy.temperature, 0.25);
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let base = minimal_toml(temp_dir.path());

    let cases = [
        ("[session]\nhistory_limit = 1\ncontext_window = 1\n", "history_limit"),
        ("[session]\nhistory_limit = 4\ncontext_window = 5\n", "context_window"),
        ("[store]\nbackend = \"redis\"\n", "store backend"),
    ];

    for (extra, expected) in cases {
        let err = Config::from_toml_str(&format!("{}\n{}", base, extra)).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{}' in: {}",
            expected,
            err
        );
    }

    let bad_level = base.replace("[core]\n", "[core]\nlog_level = \"loud\"\n");
    assert!(Config::from_toml_str(&bad_level).is_err());

    let bad_temperature = base.replace(
        "default_provider = \"ollama\"",
        "default_provider = \"ollama\"\ntemperature = 3.5",
    );
    assert!(Config::from_toml_str(&bad_temperature).is_err());
}

#[test]
fn test_missing_llm_section_rejected() {
    let err = Config::from_toml_str("[core]\nlog_level = \"info\"\n").unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_load_from_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, minimal_toml(&temp_dir.path().join("d"))).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(config.llm.default_provider, "ollama");

    assert!(Config::load_from_path(&temp_dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = Config::default_config();
    let text = toml::to_string_pretty(&config).unwrap();

    assert!(text.contains("data_dir = \"~/.taskpal\""));

    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.session.history_limit, config.session.history_limit);
    assert_eq!(parsed.server.port, config.server.port);
    assert!(parsed.validate().is_ok());
}
