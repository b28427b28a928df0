//! Tests for planning configuration.

use super::*;
use planforge_core::ErrorCode;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        [interface]
        use_constraints_approximations = false
        default_attempts = 3
        random_seed = 42

        [approximation]
        samples = 250
        connection_radius = 0.3

        [[planner_configs]]
        name = "arm"
        group = "arm"
        planner_id = "RRTConnect"

        [[planner_configs]]
        name = "arm[RandomTree]"
        group = "arm"
        planner_id = "RandomTree"
        [planner_configs.parameters]
        range = "0.2"
        goal_bias = "0.1"
    "#;

    let config = PlanningConfig::from_toml_str(toml).unwrap();
    assert!(!config.interface.use_constraints_approximations);
    assert_eq!(config.interface.default_attempts, 3);
    assert_eq!(config.interface.random_seed, Some(42));
    assert_eq!(config.approximation.samples, 250);
    assert_eq!(config.approximation.max_neighbors, 8);
    assert_eq!(config.planner_configs.len(), 2);
    assert_eq!(
        config.planner_configs[1].parameters.get("range").map(String::as_str),
        Some("0.2")
    );
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        interface:
          default_timeout_seconds: 1.5
          stop_at_first_success: false
        planner_configs:
          - name: arm
            group: arm
            planner_id: RRTConnect
    "#;

    let config = PlanningConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.interface.default_timeout(), Duration::from_millis(1500));
    assert!(!config.interface.stop_at_first_success);
    assert_eq!(config.planner_configs[0].group, "arm");
}

#[test]
fn test_defaults() {
    let config = PlanningConfig::from_toml_str("").unwrap();
    assert!(config.interface.use_constraints_approximations);
    assert_eq!(config.interface.default_attempts, 1);
    assert_eq!(config.interface.default_timeout(), Duration::from_secs(5));
    assert!(config.planner_configs.is_empty());
}

#[test]
fn test_validation_rejects_bad_values() {
    let zero_attempts = "[interface]\ndefault_attempts = 0\n";
    assert!(matches!(
        PlanningConfig::from_toml_str(zero_attempts),
        Err(ConfigError::Invalid(_))
    ));

    let negative_timeout = "[interface]\ndefault_timeout_seconds = -1.0\n";
    assert!(matches!(
        PlanningConfig::from_toml_str(negative_timeout),
        Err(ConfigError::Invalid(_))
    ));

    let duplicate = r#"
        [[planner_configs]]
        name = "arm"
        group = "arm"
        [[planner_configs]]
        name = "arm"
        group = "arm"
    "#;
    assert!(matches!(
        PlanningConfig::from_toml_str(duplicate),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_builder() {
    let config = PlanningConfig::new()
        .with_random_seed(123)
        .with_default_timeout(Duration::from_secs(2))
        .with_planner_config(PlannerConfiguration::new("arm", "arm", "RRTConnect"));

    assert_eq!(config.interface.random_seed, Some(123));
    assert_eq!(config.interface.default_timeout(), Duration::from_secs(2));
    assert_eq!(config.planner_configs.len(), 1);
}

#[test]
fn test_registry_register_replaces_wholesale() {
    let registry = PlannerConfigRegistry::new();
    registry.register(vec![
        PlannerConfiguration::new("arm", "arm", "RRTConnect"),
        PlannerConfiguration::new("base", "base", "RRTConnect"),
    ]);
    assert_eq!(registry.names(), vec!["arm".to_string(), "base".to_string()]);

    registry.register(vec![PlannerConfiguration::new("arm[PRM]", "arm", "PRM")]);
    assert_eq!(registry.len(), 1);
    assert!(matches!(registry.resolve("arm"), Err(ConfigError::NotFound(_))));
    assert_eq!(registry.resolve("arm[PRM]").unwrap().planner_id, "PRM");
}

#[test]
fn test_registry_for_group() {
    let registry = PlannerConfigRegistry::new();
    registry.register(vec![
        PlannerConfiguration::new("arm[b]", "arm", "B"),
        PlannerConfiguration::new("arm[a]", "arm", "A"),
        PlannerConfiguration::new("base", "base", "A"),
    ]);
    let names: Vec<String> = registry
        .for_group("arm")
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, vec!["arm[a]", "arm[b]"]);
}

#[test]
fn test_not_found_converts_to_config_not_found_code() {
    let err: PlanForgeError = ConfigError::NotFound("arm[PRM]".into()).into();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);

    let err: PlanForgeError = ConfigError::Invalid("bad".into()).into();
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
