//! `yamltrail history`: list the distinct versions of one entity.

use super::{print_json, Context};
use yamltrail_core::{EntityIdentity, LogicalVersion, ScanEvent};

/// Stream versions as they are found, newest first.
pub async fn handle_history(ctx: &Context, identity: EntityIdentity) -> anyhow::Result<()> {
    let (service, _) = ctx.service()?;
    let mut scan = service.scan(&identity)?;

    let mut collected = Vec::new();
    loop {
        match scan.recv().await {
            Some(ScanEvent::Version(version)) => {
                if ctx.json {
                    collected.push(version);
                } else {
                    println!("{}", format_version(&version));
                }
            }
            Some(ScanEvent::Complete(summary)) => {
                if ctx.json {
                    print_json(&collected)?;
                } else {
                    if summary.versions == 0 {
                        println!("No versions of {identity}");
                    }
                    if summary.truncated {
                        println!("(history truncated after {} commits)", summary.commits);
                    }
                }
                return Ok(());
            }
            Some(ScanEvent::Failed(e)) => return Err(e.into()),
            None => anyhow::bail!("history scan ended unexpectedly"),
        }
    }
}

/// One line per version: hash, date, origin, author, alias and message.
pub fn format_version(version: &LogicalVersion) -> String {
    let commit = &version.commit;
    format!(
        "{}  {}  {:<12}  {:<16}  {}  {}",
        commit.short_hash(),
        commit.date.format("%Y-%m-%d %H:%M"),
        version.origin.as_str(),
        commit.author,
        version.value.alias().unwrap_or("-"),
        commit.message.lines().next().unwrap_or_default()
    )
}
