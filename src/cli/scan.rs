//! `ytlink scan`: dry-run the scanner on one message.

use std::io;

use crate::model::ProjectRegistry;
use crate::scan::{PrefixAliases, scan};

pub(super) fn cmd_scan(
    projects: &[String],
    aliases: &PrefixAliases,
    message: Option<String>,
) -> Result<(), String> {
    let message = match message {
        Some(message) => message,
        None => io::read_to_string(io::stdin())
            .map_err(|e| format!("failed to read message from stdin: {e}"))?,
    };

    let registry = ProjectRegistry::from_short_names(projects);
    let annotations = scan(&registry, aliases, &message);
    let json = serde_json::to_string_pretty(&annotations)
        .map_err(|e| format!("failed to serialize annotations: {e}"))?;
    println!("{json}");
    eprintln!("{} annotation(s)", annotations.len());
    Ok(())
}

/// Parse `prefix=command` pairs.
pub(super) fn parse_aliases(aliases: &[String]) -> Result<PrefixAliases, String> {
    let pairs = aliases
        .iter()
        .map(|alias| {
            alias
                .split_once('=')
                .ok_or_else(|| format!("invalid alias '{alias}': expected prefix=command"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PrefixAliases::new(pairs))
}
