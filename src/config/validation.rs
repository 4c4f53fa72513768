use crate::config::types::{Config, FieldEntry, ParserEntry, SpiderConfig};
use crate::url::parse_http_url;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_spider_config(&config.spider)?;
    validate_output_config(&config.output)?;
    for entry in &config.parsers {
        validate_parser_entry(entry)?;
    }
    Ok(())
}

/// Validates session configuration
pub fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    if config.roots.is_empty() {
        return Err(ConfigError::Validation(
            "at least one root URL is required".to_string(),
        ));
    }

    for root in &config.roots {
        parse_http_url(root)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", root, e)))?;
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_tries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_tries must be >= 1, got {}",
            config.max_tries
        )));
    }

    if !config.timeout.is_finite() || config.timeout <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout must be a positive number of seconds, got {}",
            config.timeout
        )));
    }

    for host in &config.url_limit {
        validate_host(host)?;
    }

    for name in config.headers.keys().chain(config.cookies.keys()) {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(ConfigError::Validation(format!(
                "header or cookie name '{}' is not valid",
                name
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.items_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "items_path cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_parser_entry(entry: &ParserEntry) -> Result<(), ConfigError> {
    if let Some(item) = &entry.item {
        if item.name.is_empty() {
            return Err(ConfigError::Validation(
                "item name cannot be empty".to_string(),
            ));
        }

        if item.binary && entry.json {
            return Err(ConfigError::Validation(format!(
                "item '{}' cannot be both binary and json",
                item.name
            )));
        }

        for (name, field) in &item.fields {
            validate_field_entry(name, field)?;
        }
    }

    Ok(())
}

fn validate_field_entry(name: &str, field: &FieldEntry) -> Result<(), ConfigError> {
    match (&field.css, &field.regex) {
        (Some(_), None) => Ok(()),
        (None, Some(_)) if field.attr.is_none() => Ok(()),
        (None, Some(_)) => Err(ConfigError::Validation(format!(
            "field '{}': attr only applies to css selectors",
            name
        ))),
        _ => Err(ConfigError::Validation(format!(
            "field '{}' must set exactly one of css or regex",
            name
        ))),
    }
}

/// Validates a host in the allow-list (`name` or `name:port`)
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation(
            "url_limit entries cannot be empty".to_string(),
        ));
    }

    let (name, port) = match host.rsplit_once(':') {
        Some((name, port)) => (name, Some(port)),
        None => (host, None),
    };

    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::Validation(format!(
                "url_limit entry '{}' has an invalid port",
                host
            )));
        }
    }

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
        || name.starts_with('.')
        || name.ends_with('.')
    {
        return Err(ConfigError::Validation(format!(
            "url_limit entry '{}' is not a valid host",
            host
        )));
    }

    Ok(())
}
