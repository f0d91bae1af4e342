//! Environment variable expansion for configuration strings.
//!
//! Supports two forms:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` occurrences in `value`.
///
/// `field` names the config field for error messages.
///
/// # Errors
///
/// Returns [`ConfigError::EnvVar`] if a `${VAR}` without default is unset
/// or a `${` is never closed.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::EnvVar {
                field: field.to_owned(),
                message: "unclosed ${".to_owned(),
            });
        };
        let expr = &after[..end];

        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        match std::env::var(name) {
            Ok(found) => result.push_str(&found),
            Err(_) => match default {
                Some(default) => result.push_str(default),
                None => {
                    return Err(ConfigError::EnvVar {
                        field: field.to_owned(),
                        message: format!("${{{name}}} not set"),
                    });
                }
            },
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
