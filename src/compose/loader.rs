//! Compose document loader
//!
//! Takes one or more already-parsed compose documents and produces
//! normalized [`ServiceDefinition`]s: interpolation against a caller
//! supplied environment, schema checks, relative path resolution and
//! collapsing of every list/mapping union to a single shape.

use super::config::{
    CommandConfig, ComposeFile, HealthcheckConfig, MappingOrList, NetworksConfig, PortConfig,
    Scalar, ServiceConfig, StringOrList,
};
use super::interpolate::interpolate_value;
use super::service::{HealthCheck, ServiceDefinition, ServicePort};
use crate::error::{Result, RunebookError};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// A parsed compose document and the name it was read from
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub filename: String,
    pub config: Value,
}

/// Everything the loader needs to resolve a project
#[derive(Debug, Clone, Default)]
pub struct ConfigDetails {
    /// Base for relative paths (env files, `.`-prefixed volume sources)
    pub working_dir: PathBuf,
    pub config_files: Vec<ConfigFile>,
    /// Variables available to interpolation and bare environment keys
    pub environment: HashMap<String, String>,
}

/// Loaded project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Services in document order
    pub services: Vec<ServiceDefinition>,
}

/// Parse raw bytes into a generic YAML tree whose top level is a mapping
pub fn parse_yaml(bytes: &[u8]) -> Result<Value> {
    let value: Value = serde_yaml::from_slice(bytes)
        .map_err(|e| RunebookError::service_load(format!("failed to parse YAML: {}", e)))?;

    if !value.is_mapping() {
        return Err(RunebookError::service_load("top-level object must be a mapping"));
    }
    Ok(value)
}

/// Load and normalize every service in the given documents.
///
/// Later documents override earlier services with the same name.
pub fn load(details: &ConfigDetails) -> Result<Config> {
    if details.config_files.is_empty() {
        return Err(RunebookError::service_load("no compose documents were supplied"));
    }

    let mut services: IndexMap<String, ServiceDefinition> = IndexMap::new();

    for file in &details.config_files {
        let mapping = file.config.as_mapping().ok_or_else(|| {
            RunebookError::service_load(format!("{}: top-level object must be a mapping", file.filename))
        })?;

        check_version(&file.filename, mapping.get("version"))?;

        let mut section = match mapping.get("services") {
            Some(Value::Null) | None => continue,
            Some(section) => section.clone(),
        };
        interpolate_value(&mut section, &details.environment, "services")?;

        let document = ComposeFile {
            version: None,
            services: serde_yaml::from_value(section).map_err(|e| {
                RunebookError::service_load(format!("{}: {}", file.filename, e))
            })?,
        };

        for (name, raw) in document.services {
            let service = normalize_service(&name, raw, details)?;
            tracing::debug!("Loaded service {} from {}", name, file.filename);
            services.insert(name, service);
        }
    }

    Ok(Config {
        services: services.into_values().collect(),
    })
}

fn check_version(filename: &str, version: Option<&Value>) -> Result<()> {
    let version = match version {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            return Err(RunebookError::service_load(format!("{}: version must be a string", filename)))
        }
        None => {
            return Err(RunebookError::service_load(format!(
                "{}: top-level object must have a version",
                filename
            )))
        }
    };

    if version == "3" || version.starts_with("3.") {
        Ok(())
    } else {
        Err(RunebookError::service_load(format!(
            "{}: unsupported compose file version \"{}\"",
            filename, version
        )))
    }
}

fn normalize_service(name: &str, raw: ServiceConfig, details: &ConfigDetails) -> Result<ServiceDefinition> {
    let field_error =
        |field: &str, e: String| RunebookError::service_load(format!("service '{}' {}: {}", name, field, e));

    let env_file = raw.env_file.map(StringOrList::into_vec).unwrap_or_default();
    let mut environment = IndexMap::new();
    for file in &env_file {
        for (key, value) in read_env_file(&details.working_dir.join(file), &details.environment)? {
            environment.insert(key, value);
        }
    }
    for (key, value) in mapping_entries(raw.environment, '=') {
        match value.or_else(|| details.environment.get(&key).cloned()) {
            Some(value) => {
                environment.insert(key, value);
            }
            None => {
                environment.shift_remove(&key);
            }
        }
    }

    let command = raw
        .command
        .map(|c| command_words(c).map_err(|e| field_error("command", e)))
        .transpose()?
        .unwrap_or_default();
    let entrypoint = raw
        .entrypoint
        .map(|c| command_words(c).map_err(|e| field_error("entrypoint", e)))
        .transpose()?
        .unwrap_or_default();

    let healthcheck = raw
        .healthcheck
        .map(|h| normalize_healthcheck(h).map_err(|e| field_error("healthcheck", e)))
        .transpose()?;

    let mut ports = Vec::new();
    for port in raw.ports.unwrap_or_default() {
        match port {
            PortConfig::Short(spec) => {
                ports.extend(parse_port_spec(&spec.to_string()).map_err(|e| field_error("ports", e))?)
            }
            PortConfig::Long(long) => ports.push(ServicePort {
                target: long.target,
                published: long.published,
                protocol: long.protocol.unwrap_or_else(|| "tcp".to_string()),
                mode: long.mode.unwrap_or_else(|| "ingress".to_string()),
                host_ip: None,
            }),
        }
    }

    let stop_grace_period = raw
        .stop_grace_period
        .map(|d| parse_duration(&d).map_err(|e| field_error("stop_grace_period", e)))
        .transpose()?;

    let networks = match raw.networks {
        Some(NetworksConfig::Array(names)) => names.into_iter().map(|n| (n, None)).collect(),
        Some(NetworksConfig::Map(map)) => map,
        None => IndexMap::new(),
    };

    let volumes = raw
        .volumes
        .unwrap_or_default()
        .iter()
        .map(|v| resolve_volume(v, &details.working_dir, &details.environment))
        .collect();

    Ok(ServiceDefinition {
        name: name.to_string(),
        image: raw.image.unwrap_or_default(),
        command,
        entrypoint,
        container_name: raw.container_name,
        cap_add: raw.cap_add.unwrap_or_default(),
        cap_drop: raw.cap_drop.unwrap_or_default(),
        cgroup_parent: raw.cgroup_parent,
        depends_on: raw.depends_on.unwrap_or_default(),
        deploy: raw.deploy,
        devices: raw.devices.unwrap_or_default(),
        dns: raw.dns.map(StringOrList::into_vec).unwrap_or_default(),
        dns_search: raw.dns_search.map(StringOrList::into_vec).unwrap_or_default(),
        domainname: raw.domainname,
        environment,
        expose: raw
            .expose
            .unwrap_or_default()
            .iter()
            .map(Scalar::to_string)
            .collect(),
        external_links: raw.external_links.unwrap_or_default(),
        extra_hosts: into_string_map(raw.extra_hosts, ':'),
        hostname: raw.hostname,
        healthcheck,
        init: raw.init,
        ipc: raw.ipc,
        labels: into_string_map(raw.labels, '='),
        links: raw.links.unwrap_or_default(),
        logging: raw.logging,
        mac_address: raw.mac_address,
        network_mode: raw.network_mode,
        networks,
        pid: raw.pid,
        ports,
        privileged: raw.privileged.unwrap_or(false),
        read_only: raw.read_only.unwrap_or(false),
        restart: raw.restart,
        security_opt: raw.security_opt.unwrap_or_default(),
        stdin_open: raw.stdin_open.unwrap_or(false),
        stop_grace_period,
        stop_signal: raw.stop_signal,
        sysctls: into_string_map(raw.sysctls, '='),
        tmpfs: raw.tmpfs.map(StringOrList::into_vec).unwrap_or_default(),
        tty: raw.tty.unwrap_or(false),
        ulimits: raw.ulimits.unwrap_or_default(),
        user: raw.user,
        volumes,
        working_dir: raw.working_dir,
    })
}

/// Flatten a mapping-or-list into ordered key/value pairs
fn mapping_entries(mapping: Option<MappingOrList>, separator: char) -> Vec<(String, Option<String>)> {
    match mapping {
        Some(MappingOrList::List(items)) => items
            .into_iter()
            .map(|item| match item.split_once(separator) {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => (item, None),
            })
            .collect(),
        Some(MappingOrList::Map(map)) => map
            .into_iter()
            .map(|(key, value)| (key, value.map(|v| v.to_string())))
            .collect(),
        None => Vec::new(),
    }
}

fn into_string_map(mapping: Option<MappingOrList>, separator: char) -> IndexMap<String, String> {
    mapping_entries(mapping, separator)
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect()
}

fn command_words(command: CommandConfig) -> std::result::Result<Vec<String>, String> {
    match command {
        CommandConfig::Shell(s) => split_shell_words(&s),
        CommandConfig::Exec(args) => Ok(args),
    }
}

fn normalize_healthcheck(raw: HealthcheckConfig) -> std::result::Result<HealthCheck, String> {
    let disable = raw.disable.unwrap_or(false);
    let test = if disable {
        vec!["NONE".to_string()]
    } else {
        match raw.test {
            Some(CommandConfig::Shell(s)) => vec!["CMD-SHELL".to_string(), s],
            Some(CommandConfig::Exec(args)) => args,
            None => Vec::new(),
        }
    };

    Ok(HealthCheck {
        test,
        interval: raw.interval.as_deref().map(parse_duration).transpose()?,
        timeout: raw.timeout.as_deref().map(parse_duration).transpose()?,
        retries: raw.retries,
        disable,
    })
}

/// Read a `KEY=VALUE` env file. Bare keys are taken from `env` when set.
fn read_env_file(path: &Path, env: &HashMap<String, String>) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RunebookError::service_load(format!("couldn't read env file {}: {}", path.display(), e))
    })?;

    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => entries.push((key.trim().to_string(), value.to_string())),
            None => {
                if let Some(value) = env.get(line) {
                    entries.push((line.to_string(), value.clone()));
                }
            }
        }
    }
    Ok(entries)
}

/// Resolve a volume source relative to the working directory.
///
/// Only sources of `source:target` specs are touched: a leading `.` is
/// joined onto `working_dir`, a leading `~` is expanded with `HOME` from
/// the loader environment when it is set there.
fn resolve_volume(spec: &str, working_dir: &Path, env: &HashMap<String, String>) -> String {
    let Some((source, rest)) = spec.split_once(':') else {
        return spec.to_string();
    };

    let mut source = source.to_string();
    if source.starts_with('.') {
        source = clean_join(working_dir, &source).to_string_lossy().into_owned();
    }
    if source.starts_with('~') {
        if let Some(home) = env.get("HOME") {
            source = source.replacen('~', home, 1);
        }
    }
    format!("{}:{}", source, rest)
}

/// Lexical join that folds `.` and `..` components
fn clean_join(base: &Path, relative: &str) -> PathBuf {
    let mut joined = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                joined.pop();
            }
            other => joined.push(other.as_os_str()),
        }
    }
    joined
}

/// Split a command string the way a POSIX shell would tokenize it
pub fn split_shell_words(s: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated single quote in \"{}\"", s)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(format!("unterminated double quote in \"{}\"", s)),
                        },
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated double quote in \"{}\"", s)),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(format!("trailing backslash in \"{}\"", s)),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parse a Go-style duration such as `1m30s` or `500ms`
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut seconds = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration \"{}\"", s))?;
        if number_end == 0 {
            return Err(format!("invalid duration \"{}\"", s));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| format!("invalid duration \"{}\"", s))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(format!("unknown unit \"{}\" in duration \"{}\"", unit, s)),
        };
        seconds += value * scale;
        rest = &rest[unit_end..];
    }

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration \"{}\": {}", s, e))
}

/// Parse a short port spec: `[ip:][published:]target[/protocol]`
pub fn parse_port_spec(spec: &str) -> std::result::Result<Vec<ServicePort>, String> {
    let (rest, protocol) = match spec.rsplit_once('/') {
        Some((rest, protocol)) => (rest, protocol.to_string()),
        None => (spec, "tcp".to_string()),
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (host_ip, published, target) = match parts.as_slice() {
        [target] => (None, None, *target),
        [published, target] => (None, Some(*published), *target),
        [ip, published, target] => (
            Some(ip.to_string()),
            Some(*published).filter(|p| !p.is_empty()),
            *target,
        ),
        _ => return Err(format!("invalid port spec \"{}\"", spec)),
    };

    let (target_start, target_end) = parse_port_range(target)?;
    let published = published.map(parse_port_range).transpose()?;
    let span = target_end - target_start;
    if let Some((start, end)) = published {
        if end - start != span {
            return Err(format!("port ranges don't match in \"{}\"", spec));
        }
    }

    Ok((0..=span)
        .map(|offset| ServicePort {
            target: target_start + offset,
            published: published.map(|(start, _)| start + offset),
            protocol: protocol.clone(),
            mode: "ingress".to_string(),
            host_ip: host_ip.clone(),
        })
        .collect())
}

fn parse_port_range(range: &str) -> std::result::Result<(u16, u16), String> {
    let parse = |p: &str| {
        p.trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid port \"{}\"", p))
    };
    match range.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(format!("invalid port range \"{}\"", range));
            }
            Ok((start, end))
        }
        None => {
            let port = parse(range)?;
            Ok((port, port))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn details(yaml: &str, working_dir: &Path, env: &[(&str, &str)]) -> ConfigDetails {
        ConfigDetails {
            working_dir: working_dir.to_path_buf(),
            config_files: vec![ConfigFile {
                filename: "compose.yml".to_string(),
                config: parse_yaml(yaml.as_bytes()).unwrap(),
            }],
            environment: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_load_normalizes_service() {
        let yaml = r#"
version: "3"
services:
  web:
    image: "nginx:${TAG:-latest}"
    command: sh -c 'echo "hello world"'
    environment:
      - PORT=8080
      - FROM_ENV
      - MISSING
    labels:
      team: core
    extra_hosts:
      - "db:10.0.0.2"
    dns: 1.1.1.1
    stop_grace_period: 1m30s
    healthcheck:
      test: curl -f http://localhost
      interval: 500ms
"#;
        let temp = tempdir().unwrap();
        let config = load(&details(yaml, temp.path(), &[("FROM_ENV", "yes")])).unwrap();
        assert_eq!(config.services.len(), 1);

        let web = &config.services[0];
        assert_eq!(web.name, "web");
        assert_eq!(web.image, "nginx:latest");
        assert_eq!(web.command, vec!["sh", "-c", "echo \"hello world\""]);
        assert_eq!(web.environment.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(web.environment.get("FROM_ENV").map(String::as_str), Some("yes"));
        assert!(!web.environment.contains_key("MISSING"));
        assert_eq!(web.labels.get("team").map(String::as_str), Some("core"));
        assert_eq!(web.extra_hosts.get("db").map(String::as_str), Some("10.0.0.2"));
        assert_eq!(web.dns, vec!["1.1.1.1"]);
        assert_eq!(web.stop_grace_period, Some(Duration::from_secs(90)));

        let health = web.healthcheck.as_ref().unwrap();
        assert_eq!(health.test, vec!["CMD-SHELL", "curl -f http://localhost"]);
        assert_eq!(health.interval, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_load_resolves_relative_volumes() {
        let yaml = r#"
version: "3.2"
services:
  app:
    image: alpine
    volumes:
      - ./data:/data
      - ../shared:/shared:ro
      - ~/cache:/cache
      - named:/named
      - /anonymous
"#;
        let config = load(&details(yaml, Path::new("/srv/project"), &[])).unwrap();
        assert_eq!(
            config.services[0].volumes,
            vec![
                "/srv/project/data:/data",
                "/srv/shared:/shared:ro",
                "~/cache:/cache",
                "named:/named",
                "/anonymous",
            ]
        );

        let config = load(&details(yaml, Path::new("/srv/project"), &[("HOME", "/home/u")])).unwrap();
        assert_eq!(config.services[0].volumes[2], "/home/u/cache:/cache");
    }

    #[test]
    fn test_load_env_file_precedence() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("app.env"), "# comment\nA=from-file\nB=from-file\n\n").unwrap();

        let yaml = r#"
version: "3"
services:
  app:
    image: alpine
    env_file: app.env
    environment:
      B: explicit
"#;
        let config = load(&details(yaml, temp.path(), &[])).unwrap();
        let env = &config.services[0].environment;
        assert_eq!(env.get("A").map(String::as_str), Some("from-file"));
        assert_eq!(env.get("B").map(String::as_str), Some("explicit"));
    }

    #[test]
    fn test_load_rejects_bad_documents() {
        let temp = tempdir().unwrap();

        let no_version = "services:\n  a:\n    image: alpine\n";
        assert!(load(&details(no_version, temp.path(), &[])).is_err());

        let old_version = "version: \"2\"\nservices:\n  a:\n    image: alpine\n";
        assert!(load(&details(old_version, temp.path(), &[])).is_err());

        let unknown_key = "version: \"3\"\nservices:\n  a:\n    image: alpine\n    bogus: 1\n";
        assert!(matches!(
            load(&details(unknown_key, temp.path(), &[])),
            Err(RunebookError::ServiceLoad(_))
        ));

        let missing_env_file = "version: \"3\"\nservices:\n  a:\n    env_file: nope.env\n";
        assert!(load(&details(missing_env_file, temp.path(), &[])).is_err());

        assert!(load(&ConfigDetails::default()).is_err());
    }

    #[test]
    fn test_parse_yaml_requires_mapping() {
        assert!(parse_yaml(b"- a\n- b\n").is_err());
        assert!(parse_yaml(b"key: [unclosed").is_err());
        assert!(parse_yaml(b"key: value\n").is_ok());
    }

    #[test]
    fn test_split_shell_words() {
        assert_eq!(split_shell_words("echo hello").unwrap(), vec!["echo", "hello"]);
        assert_eq!(split_shell_words("  a   'b c'  \"d\\\"e\" ''").unwrap(), vec!["a", "b c", "d\"e", ""]);
        assert_eq!(split_shell_words(r"one\ word").unwrap(), vec!["one word"]);
        assert!(split_shell_words("'open").is_err());
        assert!(split_shell_words("\"open").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("99999999999999999999999h").is_err());
    }

    #[test]
    fn test_parse_port_spec() {
        let ports = parse_port_spec("127.0.0.1:8080:80/udp").unwrap();
        assert_eq!(
            ports,
            vec![ServicePort {
                target: 80,
                published: Some(8080),
                protocol: "udp".to_string(),
                mode: "ingress".to_string(),
                host_ip: Some("127.0.0.1".to_string()),
            }]
        );

        let ports = parse_port_spec("9000-9002:8000-8002").unwrap();
        assert_eq!(ports.len(), 3);
        assert_eq!(ports[2].target, 8002);
        assert_eq!(ports[2].published, Some(9002));

        assert_eq!(parse_port_spec("80").unwrap()[0].published, None);
        assert!(parse_port_spec("9000-9001:80").is_err());
        assert!(parse_port_spec("notaport").is_err());
    }
}
