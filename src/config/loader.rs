//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{LookupBackend, ShelfportConfig, StorageBackend};
use super::secret::secret_string;
use crate::core::transform::OutputFormat;
use crate::domain::errors::ShelfportError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ShelfportConfig
/// 4. Applies environment variable overrides (SHELFPORT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced variable is unset, an override is malformed, or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use shelfport::config::loader::load_config;
///
/// let config = load_config("shelfport.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ShelfportConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ShelfportError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ShelfportError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<ShelfportConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ShelfportConfig = toml::from_str(&contents)
        .map_err(|e| ShelfportError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ShelfportError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ShelfportError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ShelfportError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Read and parse an override variable; a value that does not parse is an error
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            ShelfportError::Configuration(format!("Invalid value '{val}' for {name}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Applies environment variable overrides using SHELFPORT_* prefix
///
/// Environment variables follow the pattern: SHELFPORT_<SECTION>_<KEY>
/// For example: SHELFPORT_LOOKUP_BASE_URL, SHELFPORT_JOB_CHUNK_SIZE
fn apply_env_overrides(config: &mut ShelfportConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_string("SHELFPORT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Job overrides
    if let Some(val) = env_string("SHELFPORT_JOB_ENTITY_KIND") {
        config.job.entity_kind = val.parse().map_err(ShelfportError::Configuration)?;
    }
    if let Some(val) = env_string("SHELFPORT_JOB_IDENTIFIER_TYPE") {
        config.job.identifier_type = val.parse().map_err(ShelfportError::Configuration)?;
    }
    if let Some(val) = env_parse("SHELFPORT_JOB_CHUNK_SIZE")? {
        config.job.chunk_size = val;
    }
    if let Some(val) = env_parse("SHELFPORT_JOB_SKIP_LIMIT")? {
        config.job.skip_limit = val;
    }
    if let Some(val) = env_parse("SHELFPORT_JOB_PREFETCH")? {
        config.job.prefetch = val;
    }
    if let Some(val) = env_parse("SHELFPORT_JOB_SEGMENTS")? {
        config.job.segments = val;
    }
    if let Some(val) = env_string("SHELFPORT_JOB_FORMATS") {
        config.job.formats = parse_formats(&val)?;
    }

    // Lookup overrides
    if let Some(val) = env_string("SHELFPORT_LOOKUP_BACKEND") {
        config.lookup.backend = match val.to_lowercase().as_str() {
            "http" => LookupBackend::Http,
            "memory" => LookupBackend::Memory,
            other => {
                return Err(ShelfportError::Configuration(format!(
                    "Invalid value '{other}' for SHELFPORT_LOOKUP_BACKEND"
                )))
            }
        };
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_BASE_URL") {
        config.lookup.base_url = val;
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_TENANT") {
        config.lookup.tenant = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_USERNAME") {
        config.lookup.username = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_PASSWORD") {
        config.lookup.password = Some(secret_string(val));
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_TOKEN") {
        config.lookup.token = Some(secret_string(val));
    }
    if let Some(val) = env_parse("SHELFPORT_LOOKUP_TIMEOUT_SECONDS")? {
        config.lookup.timeout_seconds = val;
    }
    if let Some(val) = env_string("SHELFPORT_LOOKUP_FIXTURES_PATH") {
        config.lookup.fixtures_path = Some(val);
    }

    // Storage overrides
    if let Some(val) = env_string("SHELFPORT_STORAGE_BACKEND") {
        config.storage.backend = match val.to_lowercase().as_str() {
            "local" => StorageBackend::Local,
            "s3" => StorageBackend::S3,
            other => {
                return Err(ShelfportError::Configuration(format!(
                    "Invalid value '{other}' for SHELFPORT_STORAGE_BACKEND"
                )))
            }
        };
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_ROOT") {
        config.storage.root = val;
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_PREFIX") {
        config.storage.prefix = val;
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_STAGING_DIR") {
        config.storage.staging_dir = val;
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_BUCKET") {
        config.storage.bucket = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_REGION") {
        config.storage.region = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_ENDPOINT") {
        config.storage.endpoint = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_ACCESS_KEY") {
        config.storage.access_key = Some(val);
    }
    if let Some(val) = env_string("SHELFPORT_STORAGE_SECRET_KEY") {
        config.storage.secret_key = Some(secret_string(val));
    }

    // Notification overrides
    if let Some(val) = env_string("SHELFPORT_NOTIFICATION_WEBHOOK_URL") {
        config.notification.webhook_url = Some(val);
    }

    // Logging overrides
    if let Some(val) = env_parse("SHELFPORT_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env_string("SHELFPORT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_string("SHELFPORT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

/// Parse a comma-separated format list such as `csv,json`
pub fn parse_formats(value: &str) -> Result<Vec<OutputFormat>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OutputFormat>().map_err(ShelfportError::Configuration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, IdentifierType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[job]
entity_kind = "item"
identifier_type = "barcode"

[lookup]
base_url = "https://okapi.example.org"
tenant = "diku"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("SHELFPORT_TEST_SUBST", "test_value");
        let input = "password = \"${SHELFPORT_TEST_SUBST}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("SHELFPORT_TEST_SUBST");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("SHELFPORT_TEST_MISSING");
        let input = "password = \"${SHELFPORT_TEST_MISSING}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("SHELFPORT_TEST_MISSING"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("SHELFPORT_TEST_COMMENTED");
        let input = "# password = \"${SHELFPORT_TEST_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.job.entity_kind, EntityKind::Item);
        assert_eq!(config.job.identifier_type, IdentifierType::Barcode);
        assert_eq!(config.job.chunk_size, 100);
        assert_eq!(config.job.formats, vec![OutputFormat::Csv]);
        assert_eq!(config.lookup.base_url, "https://okapi.example.org");
        assert_eq!(config.storage.prefix, "exports");
    }

    #[test]
    fn test_validation_failure_is_configuration_error() {
        let contents = MINIMAL.replace("\"barcode\"", "\"po_number\"");
        let err = parse_config(&contents).unwrap_err();
        assert!(matches!(err, ShelfportError::Configuration(_)));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            parse_formats("csv, json").unwrap(),
            vec![OutputFormat::Csv, OutputFormat::Json]
        );
        assert!(parse_formats("csv,xml").is_err());
    }
}
