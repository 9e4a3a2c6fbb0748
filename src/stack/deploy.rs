//! Stack deployment

use super::options::DeployOptions;
use crate::compose::{load, parse_yaml, ConfigDetails, ConfigFile};
use crate::engine::ContainerEngine;
use crate::error::{Result, RunebookError};
use std::io::Write;
use std::path::Path;

/// Deploy a stack from a compose file
pub fn run_deploy(engine: &dyn ContainerEngine, opts: &DeployOptions, out: &mut dyn Write) -> Result<()> {
    match (&opts.bundlefile, &opts.composefile) {
        (None, None) => Err(RunebookError::Stack(
            "Please specify either a bundle file or a Compose file.".to_string(),
        )),
        (Some(_), Some(_)) => Err(RunebookError::Stack(
            "You cannot specify both a bundle file and a Compose file.".to_string(),
        )),
        (Some(bundle), None) => Err(RunebookError::Unsupported(format!(
            "deploying bundle file {}",
            bundle.display()
        ))),
        (None, Some(compose)) => deploy_compose(engine, &opts.namespace, compose, out),
    }
}

fn deploy_compose(engine: &dyn ContainerEngine, namespace: &str, path: &Path, out: &mut dyn Write) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| {
        RunebookError::Stack(format!("couldn't read compose file {}: {}", path.display(), e))
    })?;

    let details = ConfigDetails {
        working_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        config_files: vec![ConfigFile {
            filename: path.display().to_string(),
            config: parse_yaml(&bytes)?,
        }],
        environment: std::env::vars().collect(),
    };
    let config = load(&details)?;

    let network = format!("{}_default", namespace);
    writeln!(out, "Creating network {}", network)?;
    engine.create_network(namespace, &network)?;

    for service in &config.services {
        writeln!(out, "Creating service {}_{}", namespace, service.name)?;
        engine.deploy_service(namespace, service)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn options(bundle: Option<&str>, compose: Option<PathBuf>) -> DeployOptions {
        DeployOptions {
            bundlefile: bundle.map(PathBuf::from),
            composefile: compose,
            namespace: "shop".to_string(),
            send_registry_auth: false,
        }
    }

    #[test]
    fn test_deploy_compose() {
        let dir = tempdir().unwrap();
        let compose = dir.path().join("docker-compose.yml");
        std::fs::write(
            &compose,
            "version: \"3\"\nservices:\n  web:\n    image: nginx\n  db:\n    image: postgres\n",
        )
        .unwrap();

        let engine = LocalEngine::new();
        let mut out = Vec::new();
        run_deploy(&engine, &options(None, Some(compose)), &mut out).unwrap();

        let resources = engine.stack_resources("shop").unwrap();
        let names: Vec<_> = resources.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["shop_web", "shop_db"]);
        assert_eq!(resources.networks[0].name, "shop_default");

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Creating service shop_web"));
    }

    #[test]
    fn test_deploy_file_exclusivity() {
        let engine = LocalEngine::new();
        let mut out = Vec::new();

        assert!(matches!(
            run_deploy(&engine, &options(None, None), &mut out),
            Err(RunebookError::Stack(_))
        ));
        assert!(matches!(
            run_deploy(&engine, &options(Some("a.dab"), Some("b.yml".into())), &mut out),
            Err(RunebookError::Stack(_))
        ));
        assert!(matches!(
            run_deploy(&engine, &options(Some("a.dab"), None), &mut out),
            Err(RunebookError::Unsupported(_))
        ));
    }

    #[test]
    fn test_deploy_missing_compose_file() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new();
        let mut out = Vec::new();
        let result = run_deploy(&engine, &options(None, Some(dir.path().join("nope.yml"))), &mut out);
        assert!(matches!(result, Err(RunebookError::Stack(_))));
        assert!(engine.stack_resources("shop").unwrap().is_empty());
    }
}
