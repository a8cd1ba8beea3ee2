//! `yamltrail list` and `yamltrail show`.

use super::{print_json, Context};
use std::path::Path;
use yamltrail_core::{EntityIdentity, EntityKind};

/// List the entities of a document, live or at a commit.
pub async fn handle_list(
    ctx: &Context,
    file: &Path,
    kind: EntityKind,
    at: Option<&str>,
) -> anyhow::Result<()> {
    let (service, _) = ctx.service()?;
    let entries = service.list_entities(file, kind, at).await?;

    if ctx.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No {kind} entities in {}", file.display());
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:<24}  {}",
            entry.identifier.to_string(),
            entry.value.alias().unwrap_or("-")
        );
    }
    Ok(())
}

/// Print one entity's value as YAML, live or at a commit.
pub async fn handle_show(
    ctx: &Context,
    identity: EntityIdentity,
    at: Option<&str>,
) -> anyhow::Result<()> {
    let (service, _) = ctx.service()?;
    let value = match at {
        Some(commit) => service.entity_at(&identity, commit).await?,
        None => service.current_entity(&identity).await?,
    };

    if ctx.json {
        return print_json(&value);
    }
    print!("{}", value.normalized());
    Ok(())
}
