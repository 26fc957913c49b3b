use std::{collections::BTreeMap, path::Path};

use tracing::debug;

use skiff_model::{
    DESCRIPTOR_FORMAT, DESCRIPTOR_VERSION, ResolvedFile, RunnableName, RuntimeDescriptor,
    RuntimeRunnable,
    constants::{
        APPLICATION_CLASSPATH_FILE, ARGUMENTS_FILE, CLASSPATH_FILE, LOGBACK_TEMPLATE_FILE,
        RUNTIME_SPEC_FILE,
    },
};

use crate::error::LaunchError;
use crate::preparer::LaunchPlan;
use crate::settings::LaunchSettings;

/// Assemble the runtime descriptor for `plan`.
///
/// `resolved` holds the resolved local files per runnable; runnables without an entry ship
/// no local files. Only configuration keys starting with `config_prefix` are kept.
pub fn build_descriptor(
    plan: &LaunchPlan,
    mut resolved: BTreeMap<RunnableName, Vec<ResolvedFile>>,
    config_prefix: &str,
) -> RuntimeDescriptor {
    let runnables = plan
        .runnables()
        .map(|spec| {
            let runtime = RuntimeRunnable {
                name: spec.name.clone(),
                entry_point: spec.entry_point.clone(),
                resources: spec.resources.clone(),
                local_files: resolved.remove(&spec.name).unwrap_or_default(),
            };
            (spec.name.clone(), runtime)
        })
        .collect();

    RuntimeDescriptor {
        format: DESCRIPTOR_FORMAT.to_string(),
        version: DESCRIPTOR_VERSION,
        run_id: plan.run_id(),
        program_name: plan.program().name.clone(),
        runnables,
        event_handler: plan.event_handler(),
        arguments: plan.arguments().clone(),
        environments: plan.environments().clone(),
        log_levels: plan.log_levels().clone(),
        max_retries: plan.max_retries().clone(),
        jvm_options: plan.jvm_options(),
        config: plan.config().with_prefix(config_prefix),
        runnable_configs: plan.runnable_configs().clone(),
    }
}

/// Write the runtime-config directory contents into `dir`.
///
/// The logging template and auxiliary files are optional in the settings, but once
/// configured they must exist.
pub async fn write_runtime_config(
    dir: &Path,
    plan: &LaunchPlan,
    descriptor: &RuntimeDescriptor,
    settings: &LaunchSettings,
) -> Result<(), LaunchError> {
    let write = |name: &'static str, body: String| async move {
        let path = dir.join(name);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| LaunchError::io(format!("writing {name}"), e))
    };

    write(RUNTIME_SPEC_FILE, descriptor.encode()?).await?;

    let arguments = serde_json::to_string_pretty(plan.arguments())
        .map_err(|e| LaunchError::Descriptor(e.into()))?;
    write(ARGUMENTS_FILE, arguments).await?;

    write(CLASSPATH_FILE, plan.class_paths().join(":")).await?;
    write(APPLICATION_CLASSPATH_FILE, plan.application_class_paths().join(":")).await?;

    if let Some(template) = &settings.logback_template {
        match tokio::fs::copy(template, dir.join(LOGBACK_TEMPLATE_FILE)).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(template = %template.display(), "logging template not found, skipped");
            }
            Err(e) => {
                return Err(LaunchError::io(format!("copying {}", template.display()), e));
            }
        }
    }

    for aux in &settings.auxiliary_files {
        let Some(name) = aux.file_name() else {
            return Err(LaunchError::io(
                format!("auxiliary file {}", aux.display()),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            ));
        };
        tokio::fs::copy(aux, dir.join(name))
            .await
            .map_err(|e| LaunchError::io(format!("copying {}", aux.display()), e))?;
    }

    debug!(dir = %dir.display(), "runtime config written");
    Ok(())
}
