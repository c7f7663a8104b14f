//! Processed-revisions commands: check, list.

use crate::storage::Storage;

pub(super) fn cmd_check(storage: &Storage, revision: &str) -> Result<(), String> {
    if storage.processed_revisions().is_processed(revision) {
        println!("{revision} processed");
        Ok(())
    } else {
        Err(format!("{revision} not processed"))
    }
}

pub(super) fn cmd_list(storage: &Storage) -> Result<(), String> {
    let revisions = storage.processed_revisions().list();

    if revisions.is_empty() {
        println!("No processed revisions");
        return Ok(());
    }

    for revision in &revisions {
        println!("{revision}");
    }
    Ok(())
}
