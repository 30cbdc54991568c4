// Error type unit tests

use image_handler_stack::error::ErrorCategory;
use image_handler_stack::SynthError;

#[test]
fn test_messages_name_the_offending_item() {
    let err = SynthError::PatternMismatch {
        parameter: "ApiDomain".into(),
        value: "bad domain".into(),
        pattern: ".+".into(),
    };
    let message = err.to_string();
    assert!(message.contains("ApiDomain"));
    assert!(message.contains("bad domain"));

    assert_eq!(
        SynthError::UnknownCondition("DeployDemoUICondition".into()).to_string(),
        "Condition 'DeployDemoUICondition' is not declared by any component"
    );
}

#[test]
fn test_each_category_is_reachable() {
    let cases = [
        (SynthError::MissingValue("A".into()), ErrorCategory::Schema),
        (SynthError::duplicate("output", "B"), ErrorCategory::Structural),
        (SynthError::UnknownAttribute("C.D".into()), ErrorCategory::Reference),
        (SynthError::config("broken"), ErrorCategory::Config),
    ];
    for (err, category) in cases {
        assert_eq!(err.category(), category, "{:?}", err);
    }
}

#[test]
fn test_io_error_converts_to_config_error() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: SynthError = io.into();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_error_works_with_anyhow_context() {
    use anyhow::Context;

    let result: Result<(), SynthError> = Err(SynthError::MissingValue("SourceBuckets".into()));
    let err = result.context("Deployment preview failed").unwrap_err();
    assert_eq!(
        format!("{:#}", err),
        "Deployment preview failed: Parameter 'SourceBuckets' has no default and no value was supplied"
    );
}
