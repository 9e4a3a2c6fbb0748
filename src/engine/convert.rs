//! Compose service to container run spec translation
//!
//! Translation is pure and total: every service produces a spec. Fields
//! the engine run path does not support (published ports, resource
//! limits) are left at their empty defaults on purpose.

use super::types::{
    BindOptions, ContainerConfig, ContainerRunSpec, HealthConfig, HostConfig, Mount, MountType,
    NetworkingConfig, VolumeOptions,
};
use crate::compose::ServiceDefinition;
use indexmap::IndexMap;

const PROPAGATION_MODES: [&str; 6] = ["private", "rprivate", "shared", "rshared", "slave", "rslave"];

/// Translate a normalized service into container creation parameters
pub fn service_to_container(service: &ServiceDefinition) -> ContainerRunSpec {
    if !service.ports.is_empty() || !service.expose.is_empty() {
        tracing::debug!("Ports of service {} are not published for single-shot runs", service.name);
    }
    if !service.ulimits.is_empty() || service.deploy.as_ref().is_some_and(|d| d.resources.is_some()) {
        tracing::debug!("Resource limits of service {} are not applied", service.name);
    }

    let config = ContainerConfig {
        hostname: service.hostname.clone().unwrap_or_default(),
        domainname: service.domainname.clone().unwrap_or_default(),
        user: service.user.clone().unwrap_or_default(),
        tty: service.tty,
        // A single-shot command always reads from the caller
        open_stdin: true,
        stdin_once: true,
        env: join_pairs(&service.environment, '='),
        cmd: service.command.clone(),
        healthcheck: Some(HealthConfig::none()),
        image: service.image.clone(),
        working_dir: service.working_dir.clone().unwrap_or_default(),
        entrypoint: service.entrypoint.clone(),
        mac_address: service.mac_address.clone().unwrap_or_default(),
        labels: service.labels.clone(),
        stop_signal: service.stop_signal.clone().unwrap_or_default(),
        stop_timeout: service.stop_grace_period.map(|d| d.as_secs()),
        ..Default::default()
    };

    let mounts = convert_volumes_to_mounts(&service.volumes);

    let host_config = HostConfig {
        // Mounts carry the volumes, binds would duplicate the mount points
        binds: Vec::new(),
        network_mode: service.network_mode.clone().unwrap_or_default(),
        cap_add: service.cap_add.clone(),
        cap_drop: service.cap_drop.clone(),
        dns: service.dns.clone(),
        dns_search: service.dns_search.clone(),
        extra_hosts: join_pairs(&service.extra_hosts, ':'),
        ipc_mode: service.ipc.clone().unwrap_or_default(),
        // Parent cgroup path only; the cgroup namespace mode is left unset
        cgroup_parent: service.cgroup_parent.clone().unwrap_or_default(),
        links: service.links.clone(),
        pid_mode: service.pid.clone().unwrap_or_default(),
        privileged: service.privileged,
        readonly_rootfs: service.read_only,
        security_opt: service.security_opt.clone(),
        tmpfs: convert_tmpfs(&service.tmpfs),
        sysctls: service.sysctls.clone(),
        init: service.init,
        mounts,
        ..Default::default()
    };

    ContainerRunSpec {
        config,
        host_config,
        networking_config: NetworkingConfig::default(),
    }
}

fn join_pairs(mapping: &IndexMap<String, String>, separator: char) -> Vec<String> {
    mapping
        .iter()
        .map(|(key, value)| format!("{}{}{}", key, separator, value))
        .collect()
}

fn convert_tmpfs(tmpfs: &[String]) -> IndexMap<String, String> {
    tmpfs
        .iter()
        .map(|entry| match entry.split_once(':') {
            Some((path, options)) => (path.to_string(), options.to_string()),
            None => (entry.clone(), String::new()),
        })
        .collect()
}

/// Translate `source:target[:mode]` volume strings into structured mounts
pub fn convert_volumes_to_mounts(volumes: &[String]) -> Vec<Mount> {
    volumes.iter().map(|v| convert_volume(v)).collect()
}

fn convert_volume(spec: &str) -> Mount {
    let parts: Vec<&str> = spec.split(':').collect();

    let (source, target, mode) = match parts.as_slice() {
        [target] => ("", *target, ""),
        [source, target] => (*source, *target, ""),
        [source, target, mode, ..] => (*source, *target, *mode),
        [] => ("", "", ""),
    };

    let kind = if source.is_empty() || !is_host_path(source) {
        MountType::Volume
    } else {
        MountType::Bind
    };

    let mut mount = Mount {
        kind,
        source: source.to_string(),
        target: target.to_string(),
        read_only: false,
        bind_options: None,
        volume_options: None,
    };

    for option in mode.split(',').filter(|o| !o.is_empty()) {
        match option {
            "ro" => mount.read_only = true,
            "rw" => mount.read_only = false,
            "nocopy" if kind == MountType::Volume => {
                mount.volume_options = Some(VolumeOptions { no_copy: true })
            }
            p if PROPAGATION_MODES.contains(&p) && kind == MountType::Bind => {
                mount.bind_options = Some(BindOptions {
                    propagation: p.to_string(),
                })
            }
            other => tracing::debug!("Ignoring volume option {} in {}", other, spec),
        }
    }

    mount
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.') || source.starts_with('~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ServicePort;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_minimal_service() {
        let spec = service_to_container(&ServiceDefinition::new("hello", "alpine"));

        assert_eq!(spec.config.image, "alpine");
        assert!(spec.config.open_stdin);
        assert!(spec.config.stdin_once);
        assert_eq!(spec.config.healthcheck, Some(HealthConfig::none()));
        assert!(spec.host_config.mounts.is_empty());
        assert!(spec.host_config.binds.is_empty());
        assert!(spec.host_config.port_bindings.is_empty());
        assert_eq!(spec.networking_config, NetworkingConfig::default());
    }

    #[test]
    fn test_field_mapping() {
        let mut service = ServiceDefinition::new("tool", "busybox:1");
        service.command = vec!["ls".into(), "-la".into()];
        service.entrypoint = vec!["/bin/sh".into(), "-c".into()];
        service.environment.insert("A".into(), "1".into());
        service.environment.insert("B".into(), "two=2".into());
        service.extra_hosts.insert("db".into(), "10.0.0.2".into());
        service.cap_add = vec!["NET_ADMIN".into()];
        service.dns = vec!["1.1.1.1".into()];
        service.ipc = Some("host".into());
        service.pid = Some("host".into());
        service.cgroup_parent = Some("/runebook".into());
        service.privileged = true;
        service.read_only = true;
        service.tty = true;
        service.stop_grace_period = Some(Duration::from_secs(15));
        service.tmpfs = vec!["/run:size=64m".into(), "/tmp".into()];
        service.working_dir = Some("/src".into());
        service.ports.push(ServicePort {
            target: 80,
            published: Some(8080),
            protocol: "tcp".into(),
            mode: "ingress".into(),
            host_ip: None,
        });

        let spec = service_to_container(&service);
        assert_eq!(spec.config.cmd, vec!["ls", "-la"]);
        assert_eq!(spec.config.entrypoint, vec!["/bin/sh", "-c"]);
        assert_eq!(spec.config.env, vec!["A=1", "B=two=2"]);
        assert_eq!(spec.config.working_dir, "/src");
        assert_eq!(spec.config.stop_timeout, Some(15));
        assert!(spec.config.tty);
        assert_eq!(spec.host_config.extra_hosts, vec!["db:10.0.0.2"]);
        assert_eq!(spec.host_config.cap_add, vec!["NET_ADMIN"]);
        assert_eq!(spec.host_config.dns, vec!["1.1.1.1"]);
        assert_eq!(spec.host_config.ipc_mode, "host");
        assert_eq!(spec.host_config.pid_mode, "host");
        assert_eq!(spec.host_config.cgroup_parent, "/runebook");
        assert!(spec.host_config.privileged);
        assert!(spec.host_config.readonly_rootfs);
        assert_eq!(spec.host_config.tmpfs.get("/run").map(String::as_str), Some("size=64m"));
        assert_eq!(spec.host_config.tmpfs.get("/tmp").map(String::as_str), Some(""));
        // Ports stay unpublished
        assert!(spec.host_config.port_bindings.is_empty());
        assert!(spec.config.exposed_ports.is_empty());
    }

    #[test]
    fn test_volume_mounts() {
        let mut service = ServiceDefinition::new("tool", "alpine");
        service.volumes = vec![
            "/srv/data:/data".into(),
            "/srv/logs:/logs:ro,rshared".into(),
            "cache:/cache:nocopy".into(),
            "/anonymous".into(),
        ];

        let mounts = service_to_container(&service).host_config.mounts;
        assert_eq!(mounts.len(), 4);

        assert_eq!(mounts[0].kind, MountType::Bind);
        assert_eq!(mounts[0].source, "/srv/data");
        assert_eq!(mounts[0].target, "/data");
        assert!(!mounts[0].read_only);

        assert!(mounts[1].read_only);
        assert_eq!(
            mounts[1].bind_options,
            Some(BindOptions {
                propagation: "rshared".into()
            })
        );

        assert_eq!(mounts[2].kind, MountType::Volume);
        assert_eq!(mounts[2].source, "cache");
        assert_eq!(mounts[2].volume_options, Some(VolumeOptions { no_copy: true }));

        assert_eq!(mounts[3].kind, MountType::Volume);
        assert_eq!(mounts[3].source, "");
        assert_eq!(mounts[3].target, "/anonymous");
    }
}
