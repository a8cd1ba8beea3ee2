//! `yamltrail restore`: write a past value of an entity into the live file.

use super::{print_json, Context};
use yamltrail_core::EntityIdentity;

/// Restore `identity` to its value at `commit`, optionally committing the result.
pub async fn handle_restore(
    ctx: &Context,
    identity: EntityIdentity,
    commit: &str,
    record: bool,
    message: Option<String>,
) -> anyhow::Result<()> {
    let (service, store) = ctx.service()?;
    let outcome = service.restore_entity(&identity, commit).await?;

    let recorded = if record {
        let message = message.unwrap_or_else(|| {
            format!(
                "Restore {} {} to {}",
                outcome.identity.kind, outcome.identity.identifier, commit
            )
        });
        Some(
            store
                .record(&outcome.identity.document_path, &message)
                .await?,
        )
    } else {
        None
    };

    if ctx.json {
        return print_json(&serde_json::json!({
            "outcome": outcome,
            "recorded": recorded,
        }));
    }

    println!(
        "{} {} ({})",
        capitalize(outcome.action.as_str()),
        outcome.identity,
        outcome.shape
    );
    println!("  from {commit}");
    if let Some(entry) = recorded {
        println!("  recorded as {}", entry.short_hash());
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
