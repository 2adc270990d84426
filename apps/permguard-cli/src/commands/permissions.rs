// permissions.rs - List every permission tag declared in a catalog.

use std::path::Path;

use permguard::{GuardConfig, PermissionGuard, ServiceCatalog, ServiceMiddleware};

pub fn execute(catalog_path: &Path, config: GuardConfig) -> anyhow::Result<()> {
    let catalog = ServiceCatalog::load(catalog_path)?;
    tracing::debug!(
        catalog = %catalog_path.display(),
        services = catalog.services.len(),
        "loaded service catalog"
    );
    let known = collect(&catalog, config);

    if known.is_empty() {
        println!("No permissions declared in {}", catalog_path.display());
        return Ok(());
    }
    for tag in known {
        println!("{}", tag);
    }
    Ok(())
}

/// Announce every service to a fresh guard and return its registry.
pub fn collect(catalog: &ServiceCatalog, config: GuardConfig) -> Vec<String> {
    let guard = PermissionGuard::new(config);
    for service in &catalog.services {
        guard.service_created(service);
    }
    guard.permissions()
}
