//! Sheets commands.

use driveguard_core::{AppPaths, ResourceKind, ResourceRegistry};
use driveguard_google::GoogleContext;

use crate::error::ClientResult;

/// Resolves a sheet alias to its spreadsheet ID and owning profile.
fn resolve_sheet(paths: &AppPaths, alias: &str) -> ClientResult<(String, String)> {
    let registry = ResourceRegistry::load(paths.registry_path());
    let entry = registry.resolve(ResourceKind::Sheet, alias)?;
    Ok((entry.id.clone(), entry.profile.clone()))
}

/// Lists the tabs of a registered spreadsheet.
pub async fn tabs(paths: &AppPaths, alias: &str) -> ClientResult<()> {
    let (id, profile) = resolve_sheet(paths, alias)?;
    let ctx = GoogleContext::open(paths, &profile).await?;
    let tabs = ctx.sheets().list_tabs(&id).await?;

    for tab in tabs {
        println!("{}", tab);
    }
    Ok(())
}

/// Reads a cell range from a registered spreadsheet.
pub async fn values(paths: &AppPaths, alias: &str, range: &str) -> ClientResult<()> {
    let (id, profile) = resolve_sheet(paths, alias)?;
    let ctx = GoogleContext::open(paths, &profile).await?;
    let rows = ctx.sheets().read_range(&id, range).await?;

    if rows.is_empty() {
        println!("Range '{}' is empty.", range);
        return Ok(());
    }
    for row in rows {
        println!("{}", row.join("\t"));
    }
    Ok(())
}

/// Lists prompt records from a tab.
pub async fn prompts(paths: &AppPaths, alias: &str, tab: &str) -> ClientResult<()> {
    let (id, profile) = resolve_sheet(paths, alias)?;
    let ctx = GoogleContext::open(paths, &profile).await?;
    let prompts = ctx.sheets().get_prompts(&id, tab).await?;

    if prompts.is_empty() {
        println!("Tab '{}' has no prompt records.", tab);
        return Ok(());
    }
    for prompt in prompts {
        println!("{}  [{} @ {}]", prompt.name, prompt.created_by, prompt.created_at);
        println!("  {}", prompt.content);
    }
    Ok(())
}

/// Inserts a prompt record at the top of a tab.
pub async fn insert_prompt(
    paths: &AppPaths,
    alias: &str,
    tab: &str,
    name: &str,
    content: &str,
    author: Option<&str>,
) -> ClientResult<()> {
    let (id, profile) = resolve_sheet(paths, alias)?;
    let ctx = GoogleContext::open(paths, &profile).await?;

    let author = author.unwrap_or("driveguard");
    let record = ctx
        .sheets()
        .insert_prompt(&id, tab, name, content, author)
        .await?;

    println!("Inserted prompt '{}' into '{}'.", record.name, tab);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_sheet_returns_id_and_profile() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());
        std::fs::write(
            paths.registry_path(),
            r#"{ "sheets": { "todo": { "id": "S1", "profile": "work" } } }"#,
        )
        .unwrap();

        let (id, profile) = resolve_sheet(&paths, "todo").unwrap();
        assert_eq!(id, "S1");
        assert_eq!(profile, "work");
    }

    #[test]
    fn resolve_sheet_unknown_alias_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_base(dir.path());
        assert!(resolve_sheet(&paths, "missing").is_err());
    }
}
