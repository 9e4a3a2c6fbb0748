//! Variable interpolation for compose documents

use crate::error::{Result, RunebookError};
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_a-zA-Z][_a-zA-Z0-9]*)|\{(?P<braced>[^}]*)\}|(?P<invalid>))",
    )
    .expect("interpolation pattern is valid")
});

static BRACED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[_a-zA-Z][_a-zA-Z0-9]*)(?:(?P<op>:-|-|:\?|\?)(?P<arg>.*))?$")
        .expect("braced pattern is valid")
});

/// Interpolate every string scalar in a YAML tree, in place.
///
/// Mapping keys are left alone. `path` is only used to name the failing
/// field in errors.
pub fn interpolate_value(value: &mut Value, env: &HashMap<String, String>, path: &str) -> Result<()> {
    match value {
        Value::String(s) => {
            *s = interpolate_string(s, env).map_err(|e| {
                RunebookError::service_load(format!("invalid interpolation in '{}': {}", path, e))
            })?;
        }
        Value::Sequence(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                interpolate_value(item, env, &format!("{}[{}]", path, i))?;
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map.iter_mut() {
                let key = key.as_str().unwrap_or("?");
                interpolate_value(item, env, &format!("{}.{}", path, key))?;
            }
        }
        Value::Tagged(tagged) => interpolate_value(&mut tagged.value, env, path)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Interpolate environment variables in a string.
///
/// Supports `$$`, `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}`,
/// `${VAR:?message}` and `${VAR?message}`. Unset variables expand to the
/// empty string.
pub fn interpolate_string(s: &str, env: &HashMap<String, String>) -> std::result::Result<String, String> {
    let mut failure: Option<String> = None;

    let result = PATTERN.replace_all(s, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        if caps.name("escaped").is_some() {
            return "$".to_string();
        }
        if let Some(name) = caps.name("named") {
            return lookup(env, name.as_str());
        }
        if let Some(braced) = caps.name("braced") {
            return match substitute_braced(braced.as_str(), env) {
                Ok(v) => v,
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            };
        }
        failure = Some(format!("invalid template: \"{}\"", s));
        String::new()
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(result.into_owned()),
    }
}

fn substitute_braced(expr: &str, env: &HashMap<String, String>) -> std::result::Result<String, String> {
    let caps = BRACED
        .captures(expr)
        .ok_or_else(|| format!("invalid template: \"${{{}}}\"", expr))?;
    let name = &caps["name"];
    let arg = caps.name("arg").map(|m| m.as_str()).unwrap_or("");
    let value = env.get(name);

    match caps.name("op").map(|m| m.as_str()) {
        None => Ok(lookup(env, name)),
        Some(":-") => Ok(match value {
            Some(v) if !v.is_empty() => v.clone(),
            _ => arg.to_string(),
        }),
        Some("-") => Ok(value.cloned().unwrap_or_else(|| arg.to_string())),
        Some(":?") => match value {
            Some(v) if !v.is_empty() => Ok(v.clone()),
            _ => Err(required_message(name, arg)),
        },
        Some("?") => value.cloned().ok_or_else(|| required_message(name, arg)),
        Some(op) => Err(format!("unsupported operator '{}'", op)),
    }
}

fn required_message(name: &str, arg: &str) -> String {
    if arg.is_empty() {
        format!("required variable {} is missing a value", name)
    } else {
        format!("required variable {} is missing a value: {}", name, arg)
    }
}

fn lookup(env: &HashMap<String, String>, name: &str) -> String {
    match env.get(name) {
        Some(v) => v.clone(),
        None => {
            tracing::debug!("The {} variable is not set. Defaulting to a blank string.", name);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("TAG".to_string(), "1.0.0".to_string());
        env.insert("EMPTY".to_string(), String::new());
        env
    }

    #[test]
    fn test_interpolate() {
        let env = env();
        assert_eq!(interpolate_string("nginx:${TAG}", &env).unwrap(), "nginx:1.0.0");
        assert_eq!(interpolate_string("nginx:$TAG", &env).unwrap(), "nginx:1.0.0");
        assert_eq!(interpolate_string("cost: $$5", &env).unwrap(), "cost: $5");
        assert_eq!(interpolate_string("x${UNSET}y", &env).unwrap(), "xy");
    }

    #[test]
    fn test_interpolate_defaults() {
        let env = env();
        assert_eq!(interpolate_string("${UNSET:-alpine}", &env).unwrap(), "alpine");
        assert_eq!(interpolate_string("${EMPTY:-alpine}", &env).unwrap(), "alpine");
        assert_eq!(interpolate_string("${EMPTY-alpine}", &env).unwrap(), "");
        assert_eq!(interpolate_string("${TAG:-latest}", &env).unwrap(), "1.0.0");
    }

    #[test]
    fn test_interpolate_required() {
        let env = env();
        assert!(interpolate_string("${UNSET:?need it}", &env).is_err());
        assert!(interpolate_string("${EMPTY:?need it}", &env).is_err());
        assert_eq!(interpolate_string("${EMPTY?need it}", &env).unwrap(), "");
    }

    #[test]
    fn test_interpolate_invalid_template() {
        let env = env();
        assert!(interpolate_string("${}", &env).is_err());
        assert!(interpolate_string("trailing $", &env).is_err());
        assert!(interpolate_string("${not valid}", &env).is_err());
    }

    #[test]
    fn test_interpolate_value_tree() {
        let mut value: Value = serde_yaml::from_str(
            r#"
image: "alpine:${TAG}"
command: ["echo", "$TAG"]
tty: true
"#,
        )
        .unwrap();
        interpolate_value(&mut value, &env(), "services.x").unwrap();
        assert_eq!(value["image"].as_str(), Some("alpine:1.0.0"));
        assert_eq!(value["command"][1].as_str(), Some("1.0.0"));
        assert_eq!(value["tty"].as_bool(), Some(true));
    }
}
