// Constants module - centralized default values for stack synthesis
//
// Parameter defaults, allowed-value sets and validation patterns live here
// so the stack wiring reads as a list of declarations.

// =============================================================================
// Solution identity
// =============================================================================

/// Solution identifier embedded in the template description and mappings
pub const SOLUTION_ID: &str = "SO0023";

/// Human-readable solution name
pub const SOLUTION_NAME: &str = "Serverless Image Handler";

/// Template format version understood by the deployment engine
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Version used when neither the CLI nor the environment supplies one
pub const DEFAULT_VERSION: &str = "v6.2.0";

// =============================================================================
// Environment inputs
// =============================================================================

/// Environment variable carrying the template version string
pub const VERSION_ENV_VAR: &str = "VERSION";

/// Environment variable whose non-empty presence enables region mode
pub const REGION_MODE_ENV_VAR: &str = "REGION_MODE";

// =============================================================================
// Parameter defaults
// =============================================================================

/// Value of an enabled Yes/No parameter
pub const YES: &str = "Yes";

/// Value of a disabled Yes/No parameter
pub const NO: &str = "No";

/// Allowed values of every Yes/No parameter
pub const YES_NO: &[&str] = &[YES, NO];

/// Default CORS origin (any origin)
pub const DEFAULT_CORS_ORIGIN: &str = "*";

/// Default CloudWatch log retention in days
pub const DEFAULT_LOG_RETENTION_DAYS: &str = "1";

/// Retention periods (days) accepted by the log service
pub const LOG_RETENTION_PERIODS: &[&str] = &[
    "1", "3", "5", "7", "14", "30", "60", "90", "120", "150", "180", "365", "400", "545", "731",
    "1827", "3653",
];

// =============================================================================
// Validation patterns
// =============================================================================

/// Any non-empty string
pub const NON_EMPTY_PATTERN: &str = ".+";

/// Fully qualified domain name (labels of 1-63 chars, alphabetic TLD)
pub const DOMAIN_PATTERN: &str =
    r"([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}";

/// Empty string or a fully qualified domain name
pub const OPTIONAL_DOMAIN_PATTERN: &str =
    r"|([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}";

// =============================================================================
// Child component defaults
// =============================================================================

/// Memory (MB) assigned to the image handler function
pub const IMAGE_HANDLER_MEMORY_MB: &str = "1024";

/// Timeout (seconds) of the image handler function, bounded by the API gateway
pub const IMAGE_HANDLER_TIMEOUT_SECS: &str = "29";

/// Runtime of the image handler function
pub const IMAGE_HANDLER_RUNTIME: &str = "nodejs20.x";

/// Attribute exposed by every distribution
pub const DOMAIN_NAME_ATTRIBUTE: &str = "DomainName";

/// Path of the demo UI entry page
pub const DEMO_UI_INDEX_PATH: &str = "/index.html";
