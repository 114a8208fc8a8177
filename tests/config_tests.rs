use anyhow::Result;
use cortex_relay::config::{Config, FailurePolicy};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

/// Helper to clear every environment override
fn clear_env_overrides() {
    std::env::remove_var("USE_LLM");
    std::env::remove_var("LLM_MODEL");
    std::env::remove_var("OLLAMA_BASE_URL");
}

#[test]
#[serial]
fn test_config_default() {
    clear_env_overrides();

    let config = Config::default();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.server.cors_enabled);

    assert!(!config.planner.llm_enabled);
    assert_eq!(config.planner.model, "mistral:latest");
    assert!(config.planner.base_url.is_none());
    assert_eq!(config.planner.timeout_secs, 30);

    assert_eq!(config.sequencer.navigation_settle_ms, 2000);
    assert_eq!(config.sequencer.step_settle_ms, 500);
    assert_eq!(config.sequencer.failure_policy, FailurePolicy::Continue);
    assert_eq!(config.sequencer.task_ttl_secs, 600);
}

#[test]
fn test_config_serialization() -> Result<()> {
    let config = Config::default();

    let toml_str = toml::to_string_pretty(&config)?;
    assert!(toml_str.contains("[server]"));
    assert!(toml_str.contains("[planner]"));
    assert!(toml_str.contains("[sequencer]"));

    let deserialized: Config = toml::from_str(&toml_str)?;
    assert_eq!(config.planner.model, deserialized.planner.model);
    assert_eq!(
        config.sequencer.failure_policy,
        deserialized.sequencer.failure_policy
    );

    Ok(())
}

#[test]
fn test_config_save_load_roundtrip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.server.port = 9000;
    config.planner.llm_enabled = true;
    config.planner.model = "llama3:8b".to_string();
    config.sequencer.failure_policy = FailurePolicy::AbortOnFirstFailure;

    fs::write(&config_path, toml::to_string_pretty(&config)?)?;

    let loaded = Config::from_toml(&fs::read_to_string(&config_path)?)?;
    assert_eq!(loaded.server.port, 9000);
    assert!(loaded.planner.llm_enabled);
    assert_eq!(loaded.planner.model, "llama3:8b");
    assert_eq!(
        loaded.sequencer.failure_policy,
        FailurePolicy::AbortOnFirstFailure
    );

    Ok(())
}

#[test]
fn test_invalid_toml_is_rejected() {
    assert!(Config::from_toml("[server]\nport = \"eighty\"").is_err());
}

#[test]
fn test_config_path_layout() -> Result<()> {
    let path = Config::config_path()?;
    assert!(path.ends_with("cortex-relay/config.toml"));
    Ok(())
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use std::env;

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env_overrides();

        env::set_var("USE_LLM", "true");
        env::set_var("LLM_MODEL", "llama3:8b");
        env::set_var("OLLAMA_BASE_URL", "http://gpu-box:11434");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert!(config.planner.llm_enabled);
        assert_eq!(config.planner.model, "llama3:8b");
        assert_eq!(
            config.planner.base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
        assert!(config.validate().is_ok());

        clear_env_overrides();
    }

    #[test]
    #[serial]
    fn test_use_llm_false_disables_file_setting() {
        clear_env_overrides();
        env::set_var("USE_LLM", "false");

        let mut config = Config::from_toml("[planner]\nllm_enabled = true").unwrap();
        config.apply_env_overrides();
        assert!(!config.planner.llm_enabled);

        clear_env_overrides();
    }

    #[test]
    #[serial]
    fn test_file_edits_do_not_persist_env_overrides() -> Result<()> {
        clear_env_overrides();
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("cortex-relay").join("config.toml");
        fs::create_dir_all(config_path.parent().unwrap())?;
        fs::write(&config_path, "[planner]\nmodel = \"mistral:latest\"\n")?;

        env::set_var("USE_LLM", "true");
        env::set_var("LLM_MODEL", "llama3:8b");

        let mut config = Config::read_from(&config_path)?;
        assert!(!config.planner.llm_enabled);
        config.server.port = 9100;
        config.save_to(&config_path)?;

        clear_env_overrides();

        let saved = Config::read_from(&config_path)?;
        assert_eq!(saved.server.port, 9100);
        assert!(!saved.planner.llm_enabled);
        assert_eq!(saved.planner.model, "mistral:latest");
        Ok(())
    }

    #[test]
    fn test_missing_file_reads_as_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::read_from(&temp_dir.path().join("absent.toml"))?;
        assert_eq!(config.server.port, 8080);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_empty_env_values_are_ignored() {
        clear_env_overrides();
        env::set_var("LLM_MODEL", "");
        env::set_var("OLLAMA_BASE_URL", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.planner.model, "mistral:latest");
        assert!(config.planner.base_url.is_none());

        clear_env_overrides();
    }
}
