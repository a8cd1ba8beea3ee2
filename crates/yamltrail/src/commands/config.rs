//! `yamltrail config` and `yamltrail version`.

use super::{print_json, Context};

/// Show configuration sources and the merged configuration.
pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    if ctx.json {
        return print_json(&serde_json::json!({
            "sources": ctx.sources,
            "config": ctx.config,
        }));
    }

    println!("Repository: {}", ctx.root.display());
    println!();
    println!("Configuration sources:");
    if ctx.sources.is_empty() {
        println!("  (none)");
    } else {
        for source in &ctx.sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    Ok(())
}

/// Print version information.
pub fn print_version() {
    println!("yamltrail {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Version history and restore for automations and scripts.");
}
