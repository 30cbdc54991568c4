// Stack synthesis unit tests
// Cover the rendered template for both deployment targets

use image_handler_stack::assembler::ParameterValues;
use image_handler_stack::config::{RegionMode, SynthesisOptions};
use image_handler_stack::stack::{self, synthesize};
use image_handler_stack::template::{ConditionExpr, Template};
use image_handler_stack::SynthError;
use rstest::rstest;
use serde_json::Value;

const REGION_ONLY_PARAMETERS: [&str; 4] = [
    "ApiDomain",
    "ApiCertificateIamId",
    "DemoUIDomain",
    "DemoUICertificateIamId",
];

fn standard() -> SynthesisOptions {
    SynthesisOptions::new("v1.2.3", RegionMode::Standard)
}

fn restricted() -> SynthesisOptions {
    SynthesisOptions::new("v1.2.3", RegionMode::Restricted)
}

fn values(pairs: &[(&str, &str)]) -> ParameterValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn render(template: &Template) -> Value {
    serde_json::from_str(&template.to_json().expect("Failed to render template"))
        .expect("Rendered template is not valid JSON")
}

#[test]
fn test_standard_mode_declares_no_region_parameters() {
    let template = synthesize(&standard(), &ParameterValues::new()).unwrap();

    for id in REGION_ONLY_PARAMETERS {
        assert!(!template.has_parameter(id), "{} should not be declared", id);
    }
    assert!(!template.has_output("ApiEndpointCNAME"));
    assert!(!template.has_output("DemoUrlCNAME"));
    assert!(template.group(stack::API_DOMAIN_GROUP).is_none());
}

#[test]
fn test_region_mode_declares_region_parameters_and_cname_outputs() {
    let template = synthesize(&restricted(), &ParameterValues::new()).unwrap();

    for id in REGION_ONLY_PARAMETERS {
        assert!(template.has_parameter(id), "{} should be declared", id);
    }
    assert!(template.has_output("ApiEndpointCNAME"));
    assert!(template.has_output("DemoUrlCNAME"));

    let group = template.group(stack::API_DOMAIN_GROUP).unwrap();
    let ids: Vec<&str> = group.parameter_ids().collect();
    assert_eq!(ids, vec!["ApiDomain", "ApiCertificateIamId"]);
}

#[test]
fn test_parameter_declaration_order() {
    let template = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    let ids: Vec<&str> = template.parameters.ids().collect();
    assert_eq!(
        ids,
        vec![
            "ApiDomain",
            "ApiCertificateIamId",
            "DeployDemoUI",
            "DemoUIDomain",
            "DemoUICertificateIamId",
            "CorsEnabled",
            "CorsOrigin",
            "SourceBuckets",
            "LogRetentionPeriod",
            "AutoWebP",
            "EnableSignature",
            "SecretsManagerSecret",
            "SecretsManagerKey",
            "EnableDefaultFallbackImage",
            "FallbackImageS3Bucket",
            "FallbackImageS3Key",
        ]
    );
}

#[test]
fn test_demo_ui_group_filters_absent_region_parameters() {
    let standard = synthesize(&standard(), &ParameterValues::new()).unwrap();
    let ids: Vec<&str> = standard
        .group(stack::DEMO_UI_GROUP)
        .unwrap()
        .parameter_ids()
        .collect();
    assert_eq!(ids, vec!["DeployDemoUI"]);

    let restricted = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    let ids: Vec<&str> = restricted
        .group(stack::DEMO_UI_GROUP)
        .unwrap()
        .parameter_ids()
        .collect();
    assert_eq!(
        ids,
        vec!["DeployDemoUI", "DemoUIDomain", "DemoUICertificateIamId"]
    );
}

#[test]
fn test_region_mode_puts_api_domain_group_first() {
    let template = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    assert_eq!(template.groups[0].label(), stack::API_DOMAIN_GROUP);
    assert_eq!(template.groups.len(), 8);
}

#[test]
fn test_rendered_document_layout() {
    let template = synthesize(&standard(), &ParameterValues::new()).unwrap();
    let json = render(&template);

    assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(json["Description"]
        .as_str()
        .unwrap()
        .ends_with("Template version v1.2.3"));
    assert_eq!(json["Mappings"]["Solution"]["Config"]["Version"], "v1.2.3");
    assert_eq!(json["Mappings"]["Solution"]["Config"]["SolutionId"], "SO0023");

    let interface = &json["Metadata"]["AWS::CloudFormation::Interface"];
    assert_eq!(
        interface["ParameterGroups"][0]["Label"]["default"],
        stack::CORS_GROUP
    );
    assert_eq!(
        interface["ParameterGroups"][0]["Parameters"],
        serde_json::json!(["CorsEnabled", "CorsOrigin"])
    );
    assert_eq!(
        interface["ParameterLabels"]["SourceBuckets"]["default"],
        "Source Buckets"
    );
}

#[test]
fn test_rendered_parameter_constraints() {
    let template = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    let json = render(&template);
    let parameters = &json["Parameters"];

    assert_eq!(parameters["LogRetentionPeriod"]["Type"], "Number");
    assert_eq!(parameters["LogRetentionPeriod"]["Default"], "1");
    assert_eq!(
        parameters["LogRetentionPeriod"]["AllowedValues"]
            .as_array()
            .unwrap()
            .len(),
        17
    );
    assert_eq!(
        parameters["CorsEnabled"]["AllowedValues"],
        serde_json::json!(["Yes", "No"])
    );
    assert_eq!(parameters["DeployDemoUI"]["Default"], "Yes");
    assert!(parameters["ApiDomain"].get("Default").is_none());
    assert!(parameters["ApiDomain"]["AllowedPattern"].is_string());
    assert_eq!(parameters["SourceBuckets"]["AllowedPattern"], ".+");
}

#[test]
fn test_guarded_outputs_render_condition() {
    let template = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    let json = render(&template);
    let outputs = &json["Outputs"];

    assert_eq!(outputs["DemoUrl"]["Condition"], "DeployDemoUICondition");
    assert_eq!(outputs["DemoUrlCNAME"]["Condition"], "DeployDemoUICondition");
    assert_eq!(outputs["CorsOrigin"]["Condition"], "EnableCorsCondition");
    assert_eq!(outputs["CorsOrigin"]["Value"], serde_json::json!({"Ref": "CorsOrigin"}));
    assert!(outputs["SourceBuckets"].get("Condition").is_none());
    assert_eq!(
        outputs["ApiEndpointCNAME"]["Value"],
        serde_json::json!({"Fn::GetAtt": ["ImageHandlerDistribution", "DomainName"]})
    );
    assert_eq!(
        outputs["ApiEndpoint"]["Value"]["Fn::If"][0],
        "ApiCertificateCondition"
    );
}

#[rstest]
#[case("not a domain")]
#[case("example")]
#[case("-bad-.example.com")]
#[case("")]
fn test_invalid_api_domain_fails_synthesis(#[case] domain: &str) {
    let err = synthesize(&restricted(), &values(&[("ApiDomain", domain)])).unwrap_err();
    assert!(
        matches!(err, SynthError::PatternMismatch { ref parameter, .. } if parameter == "ApiDomain"),
        "unexpected error: {:?}",
        err
    );
}

#[rstest]
#[case("img.example.com")]
#[case("a.b.example.co.uk")]
fn test_valid_api_domain_is_accepted(#[case] domain: &str) {
    assert!(synthesize(&restricted(), &values(&[("ApiDomain", domain)])).is_ok());
}

#[test]
fn test_region_value_in_standard_mode_is_unknown() {
    let err = synthesize(&standard(), &values(&[("ApiDomain", "img.example.com")])).unwrap_err();
    assert_eq!(err, SynthError::UnknownParameterValue("ApiDomain".into()));
}

#[rstest]
#[case("LogRetentionPeriod", "2")]
#[case("CorsEnabled", "yes")]
#[case("DeployDemoUI", "true")]
#[case("SourceBuckets", "")]
fn test_invalid_supplied_values_fail_synthesis(#[case] id: &str, #[case] value: &str) {
    let err = synthesize(&standard(), &values(&[(id, value)])).unwrap_err();
    assert_eq!(err.category(), image_handler_stack::error::ErrorCategory::Schema);
}

#[test]
fn test_synthesis_is_deterministic() {
    for options in [standard(), restricted()] {
        let first = synthesize(&options, &ParameterValues::new())
            .unwrap()
            .to_json()
            .unwrap();
        let second = synthesize(&options, &ParameterValues::new())
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_concurrent_passes_match_sequential_passes() {
    use rayon::prelude::*;

    let sequential: Vec<String> = RegionMode::all()
        .iter()
        .map(|mode| {
            synthesize(&SynthesisOptions::new("v1.2.3", *mode), &ParameterValues::new())
                .unwrap()
                .to_json()
                .unwrap()
        })
        .collect();

    let concurrent: Vec<String> = RegionMode::all()
        .par_iter()
        .map(|mode| {
            synthesize(&SynthesisOptions::new("v1.2.3", *mode), &ParameterValues::new())
                .unwrap()
                .to_json()
                .unwrap()
        })
        .collect();

    assert_eq!(sequential, concurrent);
    assert_ne!(concurrent[0], concurrent[1]);
}

#[test]
fn test_region_mode_only_changes_region_parts() {
    let standard = synthesize(&standard(), &ParameterValues::new()).unwrap();
    let restricted = synthesize(&restricted(), &ParameterValues::new()).unwrap();

    assert_eq!(standard.parameters.len() + 4, restricted.parameters.len());
    assert_eq!(standard.outputs.len() + 2, restricted.outputs.len());
    assert_eq!(standard.description, restricted.description);
}

#[test]
fn test_certificate_conditions_only_in_region_mode() {
    let standard = synthesize(&standard(), &ParameterValues::new()).unwrap();
    assert!(standard.condition("ApiCertificateCondition").is_none());
    assert_eq!(
        standard.condition("EnableCorsCondition"),
        Some(&ConditionExpr::parameter_equals("CorsEnabled", "Yes"))
    );

    let restricted = synthesize(&restricted(), &ParameterValues::new()).unwrap();
    assert_eq!(
        restricted.condition("ApiCertificateCondition"),
        Some(&ConditionExpr::parameter_not_empty("ApiCertificateIamId"))
    );
}
