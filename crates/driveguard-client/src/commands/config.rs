//! Registry and configuration commands.

use driveguard_core::{AppPaths, ResourceEntry, ResourceRegistry};

use crate::error::{ClientError, ClientResult};

/// Lists registered sheet aliases.
pub fn list_sheets(paths: &AppPaths) -> ClientResult<()> {
    let registry = ResourceRegistry::load(paths.registry_path());

    if registry.sheets.is_empty() {
        println!(
            "No sheets registered. Add entries to {}.",
            paths.registry_path().display()
        );
        return Ok(());
    }

    for (alias, entry) in &registry.sheets {
        print_entry(alias, entry);
    }
    Ok(())
}

/// Lists registered Drive folder aliases.
pub fn list_folders(paths: &AppPaths) -> ClientResult<()> {
    let registry = ResourceRegistry::load(paths.registry_path());

    if registry.drive_folders.is_empty() {
        println!(
            "No folders registered. Add entries to {}.",
            paths.registry_path().display()
        );
        return Ok(());
    }

    for (alias, entry) in &registry.drive_folders {
        print_entry(alias, entry);
    }
    Ok(())
}

fn print_entry(alias: &str, entry: &ResourceEntry) {
    match &entry.description {
        Some(description) => println!(
            "{:<20} {:<44} profile={} ({})",
            alias, entry.id, entry.profile, description
        ),
        None => println!("{:<20} {:<44} profile={}", alias, entry.id, entry.profile),
    }
}

/// Shows configuration file paths.
pub fn path(paths: &AppPaths) -> ClientResult<()> {
    println!("Config dir:    {}", paths.base().display());
    println!("Registry:      {}", paths.registry_path().display());
    println!("Client config: {}", paths.client_config_path().display());
    Ok(())
}

/// Validates the registry document and per-profile credential files.
///
/// Unlike normal loading, which treats a broken registry as empty, this
/// command surfaces parse errors so an operator can fix them.
pub fn validate(paths: &AppPaths) -> ClientResult<()> {
    let registry_path = paths.registry_path();

    let registry: ResourceRegistry = if registry_path.exists() {
        let content = std::fs::read_to_string(&registry_path)?;
        serde_json::from_str(&content).map_err(|e| {
            ClientError::Config(format!(
                "registry {} is malformed: {}",
                registry_path.display(),
                e
            ))
        })?
    } else {
        println!("Registry {} does not exist (empty).", registry_path.display());
        ResourceRegistry::default()
    };

    println!(
        "Registry OK: {} sheet(s), {} folder(s).",
        registry.sheets.len(),
        registry.drive_folders.len()
    );

    let mut missing = 0;
    for profile in registry.profiles() {
        let credentials = paths.credentials_path(&profile);
        if credentials.exists() {
            println!("Profile '{}': credentials present.", profile);
        } else {
            println!(
                "Profile '{}': missing credentials at {}.",
                profile,
                credentials.display()
            );
            missing += 1;
        }
    }

    if missing > 0 {
        return Err(ClientError::Config(format!(
            "{} profile(s) missing credentials",
            missing
        )));
    }

    Ok(())
}
