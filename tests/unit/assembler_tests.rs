// Configuration assembler unit tests
// Exercise parameter, group, condition and output bookkeeping directly

use image_handler_stack::assembler::{Assembler, ParameterValues};
use image_handler_stack::config::{RegionMode, SynthesisOptions};
use image_handler_stack::error::ErrorCategory;
use image_handler_stack::template::{ConditionExpr, Expr, ParameterSpec, Property, Resource};
use image_handler_stack::SynthError;

fn assembler() -> Assembler {
    Assembler::new(SynthesisOptions::default())
}

#[test]
fn test_duplicate_parameter_is_rejected() {
    let mut asm = assembler();
    asm.declare_parameter("CorsOrigin", ParameterSpec::string("origin"))
        .unwrap();

    let err = asm
        .declare_parameter("CorsOrigin", ParameterSpec::string("origin"))
        .unwrap_err();
    assert_eq!(err, SynthError::duplicate("parameter", "CorsOrigin"));
    assert_eq!(err.category(), ErrorCategory::Structural);
}

#[test]
fn test_conditional_declaration_returns_absent_handle() {
    let mut asm = assembler();
    let skipped = asm
        .declare_parameter_if(false, "ApiDomain", ParameterSpec::string("domain"))
        .unwrap();
    let declared = asm
        .declare_parameter_if(true, "CorsOrigin", ParameterSpec::string("origin"))
        .unwrap();

    assert!(skipped.is_none());
    assert_eq!(declared.unwrap().id(), "CorsOrigin");

    let template = asm.finish().unwrap();
    assert!(!template.has_parameter("ApiDomain"));
}

#[test]
fn test_group_filters_absent_handles_and_keeps_label() {
    let mut asm = assembler();
    let deploy = asm
        .declare_parameter("DeployDemoUI", ParameterSpec::yes_no("demo", "Yes"))
        .unwrap();

    let group = asm
        .build_group("Demo UI", &[Some(&deploy), None, None])
        .unwrap();
    assert_eq!(group.label(), "Demo UI");
    assert_eq!(group.parameter_ids().collect::<Vec<_>>(), vec!["DeployDemoUI"]);

    let empty = asm.build_group("Nothing", &[None]).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.label(), "Nothing");
}

#[test]
fn test_suppressed_group_is_absent() {
    let asm = assembler();
    assert!(asm.build_group_if(false, "API Domain", &[]).unwrap().is_none());
    assert!(asm.build_group_if(true, "API Domain", &[]).unwrap().is_some());
}

#[test]
fn test_group_with_foreign_handle_is_rejected() {
    let mut other = assembler();
    let foreign = other
        .declare_parameter("Elsewhere", ParameterSpec::string("x"))
        .unwrap();

    let err = assembler().build_group("G", &[Some(&foreign)]).unwrap_err();
    assert_eq!(err, SynthError::UndeclaredParameter("Elsewhere".into()));
}

#[test]
fn test_output_with_unknown_condition_is_rejected() {
    let mut asm = assembler();
    let err = asm
        .declare_output("DemoUrl", "demo", Expr::literal("x"), Some("NoSuchCondition"))
        .unwrap_err();
    assert_eq!(err, SynthError::UnknownCondition("NoSuchCondition".into()));
    assert_eq!(err.category(), ErrorCategory::Reference);
}

#[test]
fn test_output_referencing_unexposed_attribute_is_rejected() {
    let mut asm = assembler();
    asm.declare_resource("Bucket", Resource::new("AWS::S3::Bucket"))
        .unwrap();

    let err = asm
        .declare_output("Url", "url", Expr::sub("https://${Bucket.DomainName}"), None)
        .unwrap_err();
    assert_eq!(err, SynthError::UnknownAttribute("Bucket.DomainName".into()));
}

#[test]
fn test_output_referencing_undeclared_parameter_is_rejected() {
    let mut asm = assembler();
    let err = asm
        .declare_output("Origin", "origin", Expr::reference("CorsOrigin"), None)
        .unwrap_err();
    assert_eq!(err, SynthError::UndeclaredParameter("CorsOrigin".into()));
}

#[test]
fn test_pseudo_parameters_are_always_known() {
    let mut asm = assembler();
    asm.declare_output("Region", "region", Expr::sub("${AWS::Region}"), None)
        .unwrap();
    asm.declare_output("Nothing", "nothing", Expr::no_value(), None)
        .unwrap();
}

#[test]
fn test_condition_over_declared_parameter() {
    let mut asm = assembler();
    asm.declare_parameter("CorsEnabled", ParameterSpec::yes_no("cors", "No"))
        .unwrap();
    asm.declare_condition(
        "EnableCorsCondition",
        ConditionExpr::parameter_equals("CorsEnabled", "Yes"),
    )
    .unwrap();

    assert!(asm.has_condition("EnableCorsCondition"));
    let err = asm
        .declare_condition(
            "EnableCorsCondition",
            ConditionExpr::parameter_equals("CorsEnabled", "No"),
        )
        .unwrap_err();
    assert_eq!(err, SynthError::duplicate("condition", "EnableCorsCondition"));
}

#[test]
fn test_resource_dependency_must_exist() {
    let mut asm = assembler();
    let err = asm
        .declare_resource(
            "Function",
            Resource::new("AWS::Lambda::Function").depending_on("Role"),
        )
        .unwrap_err();
    assert_eq!(err, SynthError::UndeclaredResource("Role".into()));
}

#[test]
fn test_supplied_values_are_validated_on_declaration() {
    let values: ParameterValues = [("Retention".to_string(), "abc".to_string())]
        .into_iter()
        .collect();
    let mut asm = Assembler::with_values(SynthesisOptions::default(), values);

    let err = asm
        .declare_parameter("Retention", ParameterSpec::number("days"))
        .unwrap_err();
    assert_eq!(
        err,
        SynthError::NotANumber {
            parameter: "Retention".into(),
            value: "abc".into(),
        }
    );
}

#[test]
fn test_region_mode_is_read_from_options() {
    assert!(!assembler().region_mode());
    let asm = Assembler::new(SynthesisOptions::new("v1", RegionMode::Restricted));
    assert!(asm.region_mode());
}

#[test]
fn test_resource_with_undeclared_condition_is_rejected() {
    let mut asm = assembler();
    let err = asm
        .declare_resource(
            "DemoBucket",
            Resource::new("AWS::S3::Bucket").with_condition("DeployDemoUICondition"),
        )
        .unwrap_err();
    assert_eq!(err, SynthError::UnknownCondition("DeployDemoUICondition".into()));
    assert!(!asm.finish().unwrap().resources.contains("DemoBucket"));
}

#[test]
fn test_resource_property_branch_on_undeclared_condition_is_rejected() {
    let mut asm = assembler();
    let err = asm
        .declare_resource(
            "Distribution",
            Resource::new("AWS::CloudFront::Distribution").with_property(
                "ViewerCertificate",
                Property::branch(
                    "ApiCertificateCondition",
                    Property::object().with("SslSupportMethod", "sni-only"),
                    Property::object().with("CloudFrontDefaultCertificate", "true"),
                ),
            ),
        )
        .unwrap_err();
    assert_eq!(err, SynthError::UnknownCondition("ApiCertificateCondition".into()));
}

#[test]
fn test_undeclared_mapping_entry_is_a_reference_error() {
    let mut asm = assembler();
    asm.add_mapping("Solution", "Config", "SolutionId", "SO0023");

    let err = asm
        .declare_output(
            "Version",
            "version",
            Expr::find_in_map("Solution", "Config", "Version"),
            None,
        )
        .unwrap_err();
    assert_eq!(err, SynthError::UnknownMapping("Solution.Config.Version".into()));
    assert_eq!(err.category(), ErrorCategory::Reference);

    asm.declare_output(
        "SolutionId",
        "id",
        Expr::find_in_map("Solution", "Config", "SolutionId"),
        None,
    )
    .unwrap();
}
