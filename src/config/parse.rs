use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate config text, expanding `$env{VAR}` references first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    config.input.path = expand_tilde(&config.input.path);

    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let mut unexpanded: Vec<&str> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();

    Err(ConfigError::Validation(format!(
        "environment variable(s) not set: {}\n\
         Set them (e.g. export {}=/path/to/events.csv) or replace the reference with a literal value",
        unexpanded.join(", "),
        unexpanded[0]
    )))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let fields = &config.schema.fields;
    if fields.is_empty() {
        errors.push("schema.fields must not be empty".to_string());
    }

    let mut names = HashSet::new();
    for field in fields {
        if !names.insert(field.as_str()) {
            errors.push(format!("schema.fields: duplicate field '{}'", field));
        }
    }

    for date_field in &config.schema.date_fields {
        if !names.contains(date_field.as_str()) {
            errors.push(format!(
                "schema.date_fields: '{}' is not a schema field",
                date_field
            ));
        }
    }

    for (i, predicate) in config.prefilter.iter().enumerate() {
        if !names.contains(predicate.field.as_str()) {
            errors.push(format!(
                "prefilter[{}]: unknown field '{}'",
                i, predicate.field
            ));
        }
    }

    for (i, rule) in config.rules.iter().enumerate() {
        let prefix = format!("rules[{}] ({})", i, rule.label());

        if !config.schema.date_fields.contains(&rule.date_field) {
            errors.push(format!(
                "{}: date_field '{}' is not listed in schema.date_fields",
                prefix, rule.date_field
            ));
        }

        if rule.threshold == 0 {
            errors.push(format!("{}: threshold must be at least 1", prefix));
        }

        if let Some(field) = rule.filter.as_ref().and_then(|f| f.field.as_ref()) {
            if !names.contains(field.as_str()) {
                errors.push(format!("{}: filter references unknown field '{}'", prefix, field));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
