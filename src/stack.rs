//! Image handler stack wiring.
//!
//! Declares the user-facing parameters, groups them for the deployment
//! console, instantiates the image handler and republishes its values as
//! outputs. Region mode adds custom API and demo UI domains (with optional
//! IAM certificates) and the matching CNAME outputs.

use tracing::info;

use crate::assembler::{Assembler, ParameterHandle, ParameterValues};
use crate::config::SynthesisOptions;
use crate::constants::{
    DEFAULT_CORS_ORIGIN, DEFAULT_LOG_RETENTION_DAYS, DEMO_UI_INDEX_PATH, DOMAIN_NAME_ATTRIBUTE,
    DOMAIN_PATTERN, LOG_RETENTION_PERIODS, NO, NON_EMPTY_PATTERN, OPTIONAL_DOMAIN_PATTERN,
    SOLUTION_ID, SOLUTION_NAME, YES,
};
use crate::error::{Result, SynthError};
use crate::image_handler::{
    ImageHandler, ImageHandlerProps, API_CERTIFICATE_CONDITION, DEMO_DISTRIBUTION,
    DEMO_UI_CERTIFICATE_CONDITION, DEPLOY_DEMO_UI_CONDITION, ENABLE_CORS_CONDITION,
    IMAGE_HANDLER_DISTRIBUTION, SOLUTION_MAPPING, SOLUTION_MAPPING_KEY,
};
use crate::template::{Expr, ParameterSpec, Template};

pub const API_DOMAIN_GROUP: &str = "API Domain";
pub const CORS_GROUP: &str = "CORS Options";
pub const IMAGE_SOURCES_GROUP: &str = "Image Sources";
pub const DEMO_UI_GROUP: &str = "Demo UI";
pub const EVENT_LOGGING_GROUP: &str = "Event Logging";
pub const SIGNATURE_GROUP: &str = "Image URL Signature (Note: Enabling signature is not compatible with previous image URLs, which could result in broken image links. Please refer to the implementation guide for details: https://docs.aws.amazon.com/solutions/latest/serverless-image-handler/considerations.html)";
pub const FALLBACK_IMAGE_GROUP: &str = "Default Fallback Image (Note: Enabling default fallback image returns the default fallback image instead of JSON object when error happens. Please refer to the implementation guide for details: https://docs.aws.amazon.com/solutions/latest/serverless-image-handler/considerations.html)";
pub const AUTO_WEBP_GROUP: &str = "Auto WebP";

/// Template description; the version is embedded verbatim
pub fn description(version: &str) -> String {
    format!(
        "({}) - {}: This template deploys and configures a serverless architecture that is optimized for dynamic image manipulation and delivery at low latency and cost. Leverages SharpJS for image processing. Template version {}",
        SOLUTION_ID, SOLUTION_NAME, version
    )
}

/// Runs one synthesis pass for the given target
pub fn synthesize(options: &SynthesisOptions, values: &ParameterValues) -> Result<Template> {
    let mut assembler = Assembler::with_values(options.clone(), values.clone());
    let region_mode = assembler.region_mode();

    info!(
        version = %options.version,
        region_mode = ?options.region_mode,
        "Synthesizing image handler stack"
    );

    assembler.set_description(description(&options.version));
    assembler.add_mapping(SOLUTION_MAPPING, SOLUTION_MAPPING_KEY, "AnonymousUsage", YES);
    assembler.add_mapping(SOLUTION_MAPPING, SOLUTION_MAPPING_KEY, "SolutionId", SOLUTION_ID);
    assembler.add_mapping(SOLUTION_MAPPING, SOLUTION_MAPPING_KEY, "Version", &options.version);

    // Parameters
    let api_domain = assembler.declare_parameter_if(
        region_mode,
        "ApiDomain",
        ParameterSpec::string("The custom domain name for the image handler API, e.g. img.example.com. The domain must be registered for use in the target region.")
            .with_pattern(DOMAIN_PATTERN)
            .with_constraint_description("Must be a valid domain name, e.g. img.example.com")
            .with_label("API Domain"),
    )?;
    let api_certificate_iam_id = assembler.declare_parameter_if(
        region_mode,
        "ApiCertificateIamId",
        ParameterSpec::string("The IAM server certificate ID for the API domain. Leave it empty to serve the API over HTTP.")
            .with_default("")
            .with_label("API Certificate IAM ID"),
    )?;
    let deploy_demo_ui = assembler.declare_parameter(
        "DeployDemoUI",
        ParameterSpec::yes_no(
            "Would you like to deploy a demo UI to explore the features and capabilities of this solution? This will create an additional Amazon S3 bucket and Amazon CloudFront distribution in your account.",
            YES,
        )
        .with_label("Deploy Demo UI"),
    )?;
    let demo_ui_domain = assembler.declare_parameter_if(
        region_mode,
        "DemoUIDomain",
        ParameterSpec::string("The custom domain name for the demo UI, e.g. demo.example.com. Leave it empty if the demo UI is not deployed.")
            .with_default("")
            .with_pattern(OPTIONAL_DOMAIN_PATTERN)
            .with_constraint_description("Must be empty or a valid domain name, e.g. demo.example.com")
            .with_label("Demo UI Domain"),
    )?;
    let demo_ui_certificate_iam_id = assembler.declare_parameter_if(
        region_mode,
        "DemoUICertificateIamId",
        ParameterSpec::string("The IAM server certificate ID for the demo UI domain. Leave it empty to serve the demo UI over HTTP.")
            .with_default("")
            .with_label("Demo UI Certificate IAM ID"),
    )?;
    let cors_enabled = assembler.declare_parameter(
        "CorsEnabled",
        ParameterSpec::yes_no(
            "Would you like to enable Cross-Origin Resource Sharing (CORS) for the image handler API? Select 'Yes' if so.",
            NO,
        )
        .with_label("CORS Enabled"),
    )?;
    let cors_origin = assembler.declare_parameter(
        "CorsOrigin",
        ParameterSpec::string("If you selected 'Yes' above, please specify an origin value here. A wildcard (*) value will support any origin. We recommend specifying an origin (i.e. https://example.domain) to restrict cross-site access to your API.")
            .with_default(DEFAULT_CORS_ORIGIN)
            .with_label("CORS Origin"),
    )?;
    let source_buckets = assembler.declare_parameter(
        "SourceBuckets",
        ParameterSpec::string("(Required) List the buckets (comma-separated) within your account that contain original image files. If you plan to use Thumbor or Custom image requests with this solution, the source bucket for those requests will be the first bucket listed in this field.")
            .with_pattern(NON_EMPTY_PATTERN)
            .with_constraint_description("At least one source bucket is required")
            .with_label("Source Buckets"),
    )?;
    let log_retention_period = assembler.declare_parameter(
        "LogRetentionPeriod",
        ParameterSpec::number("This solution automatically logs events to Amazon CloudWatch. Select the amount of time for CloudWatch logs from this solution to be retained (in days).")
            .with_allowed_values(LOG_RETENTION_PERIODS.iter().copied())
            .with_default(DEFAULT_LOG_RETENTION_DAYS)
            .with_label("Log Retention Period"),
    )?;
    let auto_webp = assembler.declare_parameter(
        "AutoWebP",
        ParameterSpec::yes_no(
            "Would you like to enable automatic WebP based on accept headers? Select 'Yes' if so.",
            NO,
        )
        .with_label("AutoWebP"),
    )?;
    let enable_signature = assembler.declare_parameter(
        "EnableSignature",
        ParameterSpec::yes_no(
            "Would you like to enable the signature? If so, select 'Yes' and provide SecretsManagerSecret and SecretsManagerKey values.",
            NO,
        )
        .with_label("Enable Signature"),
    )?;
    let secrets_manager_secret = assembler.declare_parameter(
        "SecretsManagerSecret",
        ParameterSpec::string("The name of AWS Secrets Manager secret. You need to create your secret under this name.")
            .with_default("")
            .with_label("SecretsManager Secret"),
    )?;
    let secrets_manager_key = assembler.declare_parameter(
        "SecretsManagerKey",
        ParameterSpec::string("The name of AWS Secrets Manager secret key. You need to create secret key with this key name. The secret value would be used to check signature.")
            .with_default("")
            .with_label("SecretsManager Key"),
    )?;
    let enable_default_fallback_image = assembler.declare_parameter(
        "EnableDefaultFallbackImage",
        ParameterSpec::yes_no(
            "Would you like to enable the default fallback image? If so, select 'Yes' and provide FallbackImageS3Bucket and FallbackImageS3Key values.",
            NO,
        )
        .with_label("Enable Default Fallback Image"),
    )?;
    let fallback_image_s3_bucket = assembler.declare_parameter(
        "FallbackImageS3Bucket",
        ParameterSpec::string("The name of the Amazon S3 bucket which contains the default fallback image. e.g. my-fallback-image-bucket")
            .with_default("")
            .with_label("Fallback Image S3 Bucket"),
    )?;
    let fallback_image_s3_key = assembler.declare_parameter(
        "FallbackImageS3Key",
        ParameterSpec::string("The name of the default fallback image object key including prefix. e.g. prefix/image.jpg")
            .with_default("")
            .with_label("Fallback Image S3 Key"),
    )?;

    // Console groups
    if let Some(group) = assembler.build_group_if(
        region_mode,
        API_DOMAIN_GROUP,
        &[api_domain.as_ref(), api_certificate_iam_id.as_ref()],
    )? {
        assembler.add_group(group);
    }
    let groups = [
        assembler.build_group(CORS_GROUP, &[Some(&cors_enabled), Some(&cors_origin)])?,
        assembler.build_group(IMAGE_SOURCES_GROUP, &[Some(&source_buckets)])?,
        assembler.build_group(
            DEMO_UI_GROUP,
            &[
                Some(&deploy_demo_ui),
                demo_ui_domain.as_ref(),
                demo_ui_certificate_iam_id.as_ref(),
            ],
        )?,
        assembler.build_group(EVENT_LOGGING_GROUP, &[Some(&log_retention_period)])?,
        assembler.build_group(
            SIGNATURE_GROUP,
            &[
                Some(&enable_signature),
                Some(&secrets_manager_secret),
                Some(&secrets_manager_key),
            ],
        )?,
        assembler.build_group(
            FALLBACK_IMAGE_GROUP,
            &[
                Some(&enable_default_fallback_image),
                Some(&fallback_image_s3_bucket),
                Some(&fallback_image_s3_key),
            ],
        )?,
        assembler.build_group(AUTO_WEBP_GROUP, &[Some(&auto_webp)])?,
    ];
    for group in groups {
        assembler.add_group(group);
    }

    // Child component
    let props = ImageHandlerProps {
        cors_enabled,
        cors_origin,
        source_buckets,
        deploy_demo_ui,
        log_retention_period,
        auto_webp,
        enable_signature,
        secrets_manager_secret,
        secrets_manager_key,
        enable_default_fallback_image,
        fallback_image_s3_bucket,
        fallback_image_s3_key,
        api_domain,
        api_certificate_iam_id,
        demo_ui_domain,
        demo_ui_certificate_iam_id,
    };
    let handler = assembler.instantiate_image_handler(&props)?;

    // Outputs
    let distribution_domain = format!("{}.{}", IMAGE_HANDLER_DISTRIBUTION, DOMAIN_NAME_ATTRIBUTE);
    let demo_domain = format!("{}.{}", DEMO_DISTRIBUTION, DOMAIN_NAME_ATTRIBUTE);

    assembler.declare_output(
        "ApiEndpoint",
        "Link to API endpoint for sending image requests to.",
        endpoint_url(
            &handler,
            API_CERTIFICATE_CONDITION,
            props.api_domain.as_ref(),
            &distribution_domain,
            "",
        )?,
        None,
    )?;
    if region_mode {
        assembler.declare_output(
            "ApiEndpointCNAME",
            "CNAME target for the API domain; point the API domain's DNS record here.",
            handler.attribute(&distribution_domain)?,
            None,
        )?;
    }

    assembler.declare_output(
        "DemoUrl",
        "Link to the demo user interface for the solution.",
        endpoint_url(
            &handler,
            DEMO_UI_CERTIFICATE_CONDITION,
            props.demo_ui_domain.as_ref(),
            &demo_domain,
            DEMO_UI_INDEX_PATH,
        )?,
        Some(DEPLOY_DEMO_UI_CONDITION),
    )?;
    if region_mode {
        assembler.declare_output(
            "DemoUrlCNAME",
            "CNAME target for the demo UI domain; point the demo UI domain's DNS record here.",
            handler.attribute(&demo_domain)?,
            Some(DEPLOY_DEMO_UI_CONDITION),
        )?;
    }

    assembler.declare_output(
        "SourceBuckets",
        "Amazon S3 bucket location containing original image files.",
        props.source_buckets.reference(),
        None,
    )?;
    assembler.declare_output(
        "CorsEnabled",
        "Indicates whether Cross-Origin Resource Sharing (CORS) has been enabled for the image handler API.",
        props.cors_enabled.reference(),
        None,
    )?;
    assembler.declare_output(
        "CorsOrigin",
        "Origin value returned in the Access-Control-Allow-Origin header of image handler API responses.",
        props.cors_origin.reference(),
        Some(ENABLE_CORS_CONDITION),
    )?;
    assembler.declare_output(
        "LogRetentionPeriod",
        "Number of days for event logs from Lambda to be retained in CloudWatch.",
        props.log_retention_period.reference(),
        None,
    )?;

    assembler.finish()
}

/// Chooses between the custom-domain URL and the distribution URL.
///
/// When the handler declared `certificate_condition`, the URL is a
/// deploy-time branch between HTTPS and HTTP on the custom domain;
/// otherwise it is HTTPS on the distribution's assigned domain.
fn endpoint_url(
    handler: &ImageHandler,
    certificate_condition: &str,
    domain: Option<&ParameterHandle>,
    distribution_domain: &str,
    path: &str,
) -> Result<Expr> {
    if handler.has_condition(certificate_condition) {
        let domain = domain.ok_or_else(|| {
            SynthError::UndeclaredParameter(format!(
                "custom domain for {}",
                certificate_condition
            ))
        })?;
        return Ok(Expr::branch(
            certificate_condition,
            Expr::sub(format!("https://{}{}", domain.placeholder(), path)),
            Expr::sub(format!("http://{}{}", domain.placeholder(), path)),
        ));
    }

    handler.attribute(distribution_domain)?;
    Ok(Expr::sub(format!("https://${{{}}}{}", distribution_domain, path)))
}
