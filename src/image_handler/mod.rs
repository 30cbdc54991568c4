//! Image handler component.
//!
//! Consumes the stack's parameter handles, declares its own deploy-time
//! conditions from parameter *values*, and declares the resources that
//! carry the parameter wiring (function environment, log retention,
//! distributions, feature checks). What it exposes back to the stack is a
//! capability map: condition names and `Resource.Attribute` names.
//!
//! Which conditions exist depends only on which handles were supplied: the
//! certificate conditions appear when the matching certificate parameter is
//! present in the bag.

use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::assembler::{Assembler, ParameterHandle};
use crate::constants::{
    DEMO_UI_INDEX_PATH, DOMAIN_NAME_ATTRIBUTE, IMAGE_HANDLER_MEMORY_MB, IMAGE_HANDLER_RUNTIME,
    IMAGE_HANDLER_TIMEOUT_SECS, YES,
};
use crate::error::{Result, SynthError};
use crate::template::{ConditionExpr, Expr, Property, Resource};

// =============================================================================
// Exposed names
// =============================================================================

pub const ENABLE_CORS_CONDITION: &str = "EnableCorsCondition";
pub const DEPLOY_DEMO_UI_CONDITION: &str = "DeployDemoUICondition";
pub const AUTO_WEBP_CONDITION: &str = "AutoWebPCondition";
pub const ENABLE_SIGNATURE_CONDITION: &str = "EnableSignatureCondition";
pub const ENABLE_DEFAULT_FALLBACK_IMAGE_CONDITION: &str = "EnableDefaultFallbackImageCondition";
pub const API_CERTIFICATE_CONDITION: &str = "ApiCertificateCondition";
pub const DEMO_UI_CERTIFICATE_CONDITION: &str = "DemoUICertificateCondition";
pub const DEMO_UI_DOMAIN_CONDITION: &str = "DemoUIDomainCondition";

pub const IMAGE_HANDLER_FUNCTION_ROLE: &str = "ImageHandlerFunctionRole";
pub const IMAGE_HANDLER_FUNCTION: &str = "ImageHandlerFunction";
pub const IMAGE_HANDLER_LOG_GROUP: &str = "ImageHandlerLogGroup";
pub const IMAGE_HANDLER_API: &str = "ImageHandlerApi";
pub const IMAGE_HANDLER_PERMISSION: &str = "ImageHandlerPermission";
pub const IMAGE_HANDLER_DISTRIBUTION: &str = "ImageHandlerDistribution";
pub const DEMO_BUCKET: &str = "DemoBucket";
pub const DEMO_DISTRIBUTION: &str = "DemoDistribution";
pub const CHECK_SECRETS_MANAGER: &str = "CheckSecretsManager";
pub const CHECK_FALLBACK_IMAGE: &str = "CheckFallbackImage";

/// Mapping that carries solution metadata
pub const SOLUTION_MAPPING: &str = "Solution";
pub const SOLUTION_MAPPING_KEY: &str = "Config";

/// Parameter bag forwarded by the stack
#[derive(Debug, Clone)]
pub struct ImageHandlerProps {
    pub cors_enabled: ParameterHandle,
    pub cors_origin: ParameterHandle,
    pub source_buckets: ParameterHandle,
    pub deploy_demo_ui: ParameterHandle,
    pub log_retention_period: ParameterHandle,
    pub auto_webp: ParameterHandle,
    pub enable_signature: ParameterHandle,
    pub secrets_manager_secret: ParameterHandle,
    pub secrets_manager_key: ParameterHandle,
    pub enable_default_fallback_image: ParameterHandle,
    pub fallback_image_s3_bucket: ParameterHandle,
    pub fallback_image_s3_key: ParameterHandle,
    pub api_domain: Option<ParameterHandle>,
    pub api_certificate_iam_id: Option<ParameterHandle>,
    pub demo_ui_domain: Option<ParameterHandle>,
    pub demo_ui_certificate_iam_id: Option<ParameterHandle>,
}

impl ImageHandlerProps {
    /// Every present handle
    pub fn handles(&self) -> impl Iterator<Item = &ParameterHandle> {
        [
            Some(&self.cors_enabled),
            Some(&self.cors_origin),
            Some(&self.source_buckets),
            Some(&self.deploy_demo_ui),
            Some(&self.log_retention_period),
            Some(&self.auto_webp),
            Some(&self.enable_signature),
            Some(&self.secrets_manager_secret),
            Some(&self.secrets_manager_key),
            Some(&self.enable_default_fallback_image),
            Some(&self.fallback_image_s3_bucket),
            Some(&self.fallback_image_s3_key),
            self.api_domain.as_ref(),
            self.api_certificate_iam_id.as_ref(),
            self.demo_ui_domain.as_ref(),
            self.demo_ui_certificate_iam_id.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Handle to a provisioned image handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandler {
    conditions: BTreeMap<String, ConditionExpr>,
    attributes: BTreeSet<String>,
}

impl ImageHandler {
    pub(crate) fn provision(assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<Self> {
        for handle in props.handles() {
            assembler.check_handle(handle)?;
        }

        let mut handler = ImageHandler {
            conditions: BTreeMap::new(),
            attributes: BTreeSet::new(),
        };

        handler.declare_conditions(assembler, props)?;
        handler.declare_backend(assembler, props)?;
        handler.declare_distribution(assembler, props)?;
        handler.declare_demo_ui(assembler, props)?;
        handler.declare_feature_checks(assembler, props)?;

        info!(
            conditions = handler.conditions.len(),
            attributes = handler.attributes.len(),
            region_mode = props.api_domain.is_some(),
            "Image handler provisioned"
        );
        Ok(handler)
    }

    /// Deploy-time expression of a condition this component declared
    pub fn condition(&self, name: &str) -> Option<&ConditionExpr> {
        self.conditions.get(name)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// `GetAtt` for an exposed `Resource.Attribute`
    pub fn attribute(&self, name: &str) -> Result<Expr> {
        match name.split_once('.') {
            Some((resource, attribute)) if self.attributes.contains(name) => {
                Ok(Expr::get_att(resource, attribute))
            }
            _ => Err(SynthError::UnknownAttribute(name.to_string())),
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    fn add_condition(
        &mut self,
        assembler: &mut Assembler,
        name: &str,
        condition: ConditionExpr,
    ) -> Result<()> {
        assembler.declare_condition(name, condition.clone())?;
        self.conditions.insert(name.to_string(), condition);
        Ok(())
    }

    fn add_resource(&mut self, assembler: &mut Assembler, id: &str, resource: Resource) -> Result<()> {
        let exposed: Vec<String> = resource
            .exposes
            .iter()
            .map(|attribute| format!("{}.{}", id, attribute))
            .collect();
        assembler.declare_resource(id, resource)?;
        self.attributes.extend(exposed);
        Ok(())
    }

    fn declare_conditions(&mut self, assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<()> {
        let yes_conditions = [
            (ENABLE_CORS_CONDITION, &props.cors_enabled),
            (DEPLOY_DEMO_UI_CONDITION, &props.deploy_demo_ui),
            (AUTO_WEBP_CONDITION, &props.auto_webp),
            (ENABLE_SIGNATURE_CONDITION, &props.enable_signature),
            (
                ENABLE_DEFAULT_FALLBACK_IMAGE_CONDITION,
                &props.enable_default_fallback_image,
            ),
        ];
        for (name, handle) in yes_conditions {
            self.add_condition(assembler, name, ConditionExpr::parameter_equals(handle.id(), YES))?;
        }

        if let Some(certificate) = &props.api_certificate_iam_id {
            self.add_condition(
                assembler,
                API_CERTIFICATE_CONDITION,
                ConditionExpr::parameter_not_empty(certificate.id()),
            )?;
        }
        if let Some(certificate) = &props.demo_ui_certificate_iam_id {
            self.add_condition(
                assembler,
                DEMO_UI_CERTIFICATE_CONDITION,
                ConditionExpr::parameter_not_empty(certificate.id()),
            )?;
        }
        if let Some(domain) = &props.demo_ui_domain {
            self.add_condition(
                assembler,
                DEMO_UI_DOMAIN_CONDITION,
                ConditionExpr::And(vec![
                    ConditionExpr::Condition(DEPLOY_DEMO_UI_CONDITION.to_string()),
                    ConditionExpr::parameter_not_empty(domain.id()),
                ]),
            )?;
        }
        Ok(())
    }

    fn declare_backend(&mut self, assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<()> {
        let role = Resource::new("AWS::IAM::Role")
            .with_property(
                "AssumeRolePolicyDocument",
                Property::object().with("Version", "2012-10-17").with(
                    "Statement",
                    Property::list([Property::object()
                        .with("Effect", "Allow")
                        .with("Action", "sts:AssumeRole")
                        .with(
                            "Principal",
                            Property::object().with("Service", "lambda.amazonaws.com"),
                        )]),
                ),
            )
            .exposing("Arn");
        self.add_resource(assembler, IMAGE_HANDLER_FUNCTION_ROLE, role)?;

        let solution = |key: &str| Expr::find_in_map(SOLUTION_MAPPING, SOLUTION_MAPPING_KEY, key);
        let variables = Property::object()
            .with("AUTO_WEBP", props.auto_webp.reference())
            .with("CORS_ENABLED", props.cors_enabled.reference())
            .with("CORS_ORIGIN", props.cors_origin.reference())
            .with("SOURCE_BUCKETS", props.source_buckets.reference())
            .with("REWRITE_MATCH_PATTERN", "")
            .with("REWRITE_SUBSTITUTION", "")
            .with("ENABLE_SIGNATURE", props.enable_signature.reference())
            .with("SECRETS_MANAGER", props.secrets_manager_secret.reference())
            .with("SECRET_KEY", props.secrets_manager_key.reference())
            .with(
                "ENABLE_DEFAULT_FALLBACK_IMAGE",
                props.enable_default_fallback_image.reference(),
            )
            .with(
                "DEFAULT_FALLBACK_IMAGE_BUCKET",
                props.fallback_image_s3_bucket.reference(),
            )
            .with(
                "DEFAULT_FALLBACK_IMAGE_KEY",
                props.fallback_image_s3_key.reference(),
            )
            .with("SOLUTION_ID", solution("SolutionId"))
            .with("SOLUTION_VERSION", solution("Version"));

        let function = Resource::new("AWS::Lambda::Function")
            .depending_on(IMAGE_HANDLER_FUNCTION_ROLE)
            .with_property("Description", "Performs image edits and manipulations")
            .with_property("Handler", "image-handler/index.handler")
            .with_property("Runtime", IMAGE_HANDLER_RUNTIME)
            .with_property("MemorySize", IMAGE_HANDLER_MEMORY_MB)
            .with_property("Timeout", IMAGE_HANDLER_TIMEOUT_SECS)
            .with_property("Role", Expr::get_att(IMAGE_HANDLER_FUNCTION_ROLE, "Arn"))
            .with_property("Environment", Property::object().with("Variables", variables))
            .exposing("Arn");
        self.add_resource(assembler, IMAGE_HANDLER_FUNCTION, function)?;

        let log_group = Resource::new("AWS::Logs::LogGroup")
            .with_property(
                "LogGroupName",
                Expr::sub(format!("/aws/lambda/${{{}}}", IMAGE_HANDLER_FUNCTION)),
            )
            .with_property("RetentionInDays", props.log_retention_period.reference());
        self.add_resource(assembler, IMAGE_HANDLER_LOG_GROUP, log_group)?;

        let api = Resource::new("AWS::ApiGateway::RestApi")
            .with_property("Name", Expr::sub("ServerlessImageHandler-${AWS::StackName}"))
            .with_property("BinaryMediaTypes", Property::list(["*/*"]))
            .with_property(
                "EndpointConfiguration",
                Property::object().with("Types", Property::list(["REGIONAL"])),
            );
        self.add_resource(assembler, IMAGE_HANDLER_API, api)?;

        let permission = Resource::new("AWS::Lambda::Permission")
            .with_property("Action", "lambda:InvokeFunction")
            .with_property("FunctionName", Expr::get_att(IMAGE_HANDLER_FUNCTION, "Arn"))
            .with_property("Principal", "apigateway.amazonaws.com")
            .with_property(
                "SourceArn",
                Expr::sub(format!(
                    "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*",
                    IMAGE_HANDLER_API
                )),
            );
        self.add_resource(assembler, IMAGE_HANDLER_PERMISSION, permission)
    }

    fn declare_distribution(&mut self, assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<()> {
        let origin = Property::object()
            .with("Id", "ApiGatewayOrigin")
            .with(
                "DomainName",
                Expr::sub(format!(
                    "${{{}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}",
                    IMAGE_HANDLER_API
                )),
            )
            .with("OriginPath", "/image");

        let mut config = Property::object()
            .with("Enabled", "true")
            .with("Comment", "Image Handler Distribution for Serverless Image Handler")
            .with("Origins", Property::list([origin]))
            .with(
                "DefaultCacheBehavior",
                Property::object()
                    .with("TargetOriginId", "ApiGatewayOrigin")
                    .with("ViewerProtocolPolicy", viewer_protocol(props.api_certificate_iam_id.is_some())),
            );

        if let Some(domain) = &props.api_domain {
            config = config.with("Aliases", Property::list([domain.reference()]));
        }
        if let Some(certificate) = &props.api_certificate_iam_id {
            config = config.with(
                "ViewerCertificate",
                iam_certificate(API_CERTIFICATE_CONDITION, certificate),
            );
        }

        let distribution = Resource::new("AWS::CloudFront::Distribution")
            .depending_on(IMAGE_HANDLER_API)
            .with_property("DistributionConfig", config)
            .exposing(DOMAIN_NAME_ATTRIBUTE);
        self.add_resource(assembler, IMAGE_HANDLER_DISTRIBUTION, distribution)
    }

    fn declare_demo_ui(&mut self, assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<()> {
        let bucket = Resource::new("AWS::S3::Bucket")
            .with_condition(DEPLOY_DEMO_UI_CONDITION)
            .with_property(
                "WebsiteConfiguration",
                Property::object().with("IndexDocument", DEMO_UI_INDEX_PATH.trim_start_matches('/')),
            )
            .exposing("RegionalDomainName");
        self.add_resource(assembler, DEMO_BUCKET, bucket)?;

        let origin = Property::object()
            .with("Id", "DemoBucketOrigin")
            .with("DomainName", Expr::get_att(DEMO_BUCKET, "RegionalDomainName"));

        let mut config = Property::object()
            .with("Enabled", "true")
            .with("Comment", "Website distribution for the Serverless Image Handler demo UI")
            .with("DefaultRootObject", DEMO_UI_INDEX_PATH.trim_start_matches('/'))
            .with("Origins", Property::list([origin]))
            .with(
                "DefaultCacheBehavior",
                Property::object()
                    .with("TargetOriginId", "DemoBucketOrigin")
                    .with(
                        "ViewerProtocolPolicy",
                        viewer_protocol(props.demo_ui_certificate_iam_id.is_some()),
                    ),
            );

        if let Some(domain) = &props.demo_ui_domain {
            config = config.with(
                "Aliases",
                Property::branch(
                    DEMO_UI_DOMAIN_CONDITION,
                    Property::list([domain.reference()]),
                    Property::Value(Expr::no_value()),
                ),
            );
        }
        if let Some(certificate) = &props.demo_ui_certificate_iam_id {
            config = config.with(
                "ViewerCertificate",
                iam_certificate(DEMO_UI_CERTIFICATE_CONDITION, certificate),
            );
        }

        let distribution = Resource::new("AWS::CloudFront::Distribution")
            .with_condition(DEPLOY_DEMO_UI_CONDITION)
            .depending_on(DEMO_BUCKET)
            .with_property("DistributionConfig", config)
            .exposing(DOMAIN_NAME_ATTRIBUTE);
        self.add_resource(assembler, DEMO_DISTRIBUTION, distribution)
    }

    fn declare_feature_checks(&mut self, assembler: &mut Assembler, props: &ImageHandlerProps) -> Result<()> {
        let secrets = Resource::new("Custom::CheckSecretsManager")
            .with_condition(ENABLE_SIGNATURE_CONDITION)
            .with_property("SecretsManagerName", props.secrets_manager_secret.reference())
            .with_property("SecretsManagerKey", props.secrets_manager_key.reference());
        self.add_resource(assembler, CHECK_SECRETS_MANAGER, secrets)?;

        let fallback = Resource::new("Custom::CheckFallbackImage")
            .with_condition(ENABLE_DEFAULT_FALLBACK_IMAGE_CONDITION)
            .with_property("FallbackImageS3Bucket", props.fallback_image_s3_bucket.reference())
            .with_property("FallbackImageS3Key", props.fallback_image_s3_key.reference());
        self.add_resource(assembler, CHECK_FALLBACK_IMAGE, fallback)
    }
}

/// Region-mode distributions also answer plain HTTP, since a custom domain
/// may be served without a certificate
fn viewer_protocol(custom_domain: bool) -> &'static str {
    if custom_domain {
        "allow-all"
    } else {
        "redirect-to-https"
    }
}

fn iam_certificate(condition: &str, certificate: &ParameterHandle) -> Property {
    Property::branch(
        condition,
        Property::object()
            .with("IamCertificateId", certificate.reference())
            .with("SslSupportMethod", "sni-only")
            .with("MinimumProtocolVersion", "TLSv1.2_2021"),
        Property::object().with("CloudFrontDefaultCertificate", "true"),
    )
}
