use crate::config::types::{
    ComplianceConfig, EngineConfig, QualityConfig, RateLimitConfig, RunConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_compliance_config(&config.compliance)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_run_config(&config.run)?;
    validate_quality_config(&config.quality)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The name doubles as the robots.txt product token
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_compliance_config(config: &ComplianceConfig) -> Result<(), ConfigError> {
    if config.robots_fetch_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "robots_fetch_retries must be <= 10, got {}",
            config.robots_fetch_retries
        )));
    }
    Ok(())
}

/// Validates the adaptive pacing policy
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.initial_delay_ms || config.initial_delay_ms > config.max_delay_ms
    {
        return Err(ConfigError::Validation(format!(
            "rate limit delays must satisfy min <= initial <= max, got {} / {} / {}",
            config.min_delay_ms, config.initial_delay_ms, config.max_delay_ms
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be >= 1.0, got {}",
            config.backoff_factor
        )));
    }

    if !config.decay_factor.is_finite() || config.decay_factor <= 0.0 || config.decay_factor > 1.0
    {
        return Err(ConfigError::Validation(format!(
            "decay_factor must be in (0, 1], got {}",
            config.decay_factor
        )));
    }

    if config.decay_after_successes < 1 {
        return Err(ConfigError::Validation(
            "decay_after_successes must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_per_origin < 1 || config.max_concurrent_per_origin > 16 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_per_origin must be between 1 and 16, got {}",
            config.max_concurrent_per_origin
        )));
    }

    Ok(())
}

fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_quality_config(config: &QualityConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.min_quality_score) {
        return Err(ConfigError::Validation(format!(
            "min_quality_score must be between 0.0 and 1.0, got {}",
            config.min_quality_score
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
