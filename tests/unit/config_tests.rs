// Deployment file unit tests
// Cover loading from disk and option resolution

use image_handler_stack::config::{DeploymentConfig, RegionMode};
use image_handler_stack::constants::DEFAULT_VERSION;
use image_handler_stack::error::ErrorCategory;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config file");
    file.write_all(yaml.as_bytes())
        .expect("Failed to write temp config file");
    file
}

#[test]
fn test_can_load_deployment_file() {
    let file = write_config(
        r#"
version: v6.2.0-test
region_mode: true
parameters:
  SourceBuckets: my-images
  ApiDomain: img.example.com
  LogRetentionPeriod: 30
attributes:
  ImageHandlerDistribution.DomainName: d111111abcdef8.cloudfront.net
"#,
    );

    let config = DeploymentConfig::from_file(file.path()).expect("Failed to load config");
    assert_eq!(config.version.as_deref(), Some("v6.2.0-test"));
    assert_eq!(config.parameters["SourceBuckets"], "my-images");
    assert_eq!(config.parameters["LogRetentionPeriod"], "30");
    assert_eq!(
        config.attributes["ImageHandlerDistribution.DomainName"],
        "d111111abcdef8.cloudfront.net"
    );

    let options = config.synthesis_options(None, None);
    assert_eq!(options.version, "v6.2.0-test");
    assert_eq!(options.region_mode, RegionMode::Restricted);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let err = DeploymentConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_invalid_yaml_is_a_config_error() {
    let file = write_config("parameters: [not, a, map}\n");
    let err = DeploymentConfig::from_file(file.path()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_unknown_top_level_field_is_ignored() {
    let file = write_config("notes: anything\nparameters:\n  SourceBuckets: b\n");
    let config = DeploymentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.parameters.len(), 1);
}

#[test]
fn test_env_substitution_in_file() {
    std::env::set_var("IMAGE_HANDLER_STACK_TEST_BUCKET", "bucket-from-env");
    let file = write_config("parameters:\n  SourceBuckets: ${IMAGE_HANDLER_STACK_TEST_BUCKET}\n");

    let config = DeploymentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.parameters["SourceBuckets"], "bucket-from-env");
}

#[test]
fn test_region_flag_resolution() {
    let config = DeploymentConfig::default();
    assert_eq!(
        config.synthesis_options(None, Some("1")).region_mode,
        RegionMode::Restricted
    );
    assert_eq!(
        config.synthesis_options(None, Some("  ")).region_mode,
        RegionMode::Standard
    );
    assert_eq!(config.synthesis_options(None, None).version, DEFAULT_VERSION);
}

#[test]
fn test_template_file_names_differ_per_mode() {
    let names: Vec<&str> = RegionMode::all()
        .iter()
        .map(|m| m.template_file_name())
        .collect();
    assert_eq!(
        names,
        vec!["image-handler.template", "image-handler-restricted.template"]
    );
}
