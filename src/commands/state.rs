//! State subcommands handler

use anyhow::{bail, Context, Result};
use std::path::Path;

use tscan::scanner::ScanState;
use tscan::StateStore;

use super::{load_config, print_json};

fn open_store(config_path: Option<&Path>) -> Result<StateStore> {
    let config = load_config(config_path)?;
    Ok(StateStore::new(config.state_directory()))
}

/// List sessions with saved state, one per line.
#[cfg(not(tarpaulin_include))]
pub fn handle_list(config_path: Option<&Path>) -> Result<()> {
    let store = open_store(config_path)?;
    for session in list_sessions(&store)? {
        println!("{}", session);
    }
    Ok(())
}

pub(crate) fn list_sessions(store: &StateStore) -> Result<Vec<String>> {
    store
        .list_sessions()
        .with_context(|| format!("Failed to list {}", store.dir().display()))
}

/// Print a session's saved state. Legacy files are shown migrated but are
/// not rewritten.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(config_path: Option<&Path>, session_id: &str) -> Result<()> {
    let store = open_store(config_path)?;
    print_json(&show_session(&store, session_id)?, false)
}

pub(crate) fn show_session(store: &StateStore, session_id: &str) -> Result<ScanState> {
    match store.peek(session_id) {
        Some(state) => Ok(state),
        None => bail!("No saved state for session: {}", session_id),
    }
}

/// Delete a session's saved state.
#[cfg(not(tarpaulin_include))]
pub fn handle_delete(config_path: Option<&Path>, session_id: &str) -> Result<()> {
    let store = open_store(config_path)?;
    if delete_session(&store, session_id)? {
        println!("Deleted state for {}", session_id);
    } else {
        println!("No saved state for {}", session_id);
    }
    Ok(())
}

pub(crate) fn delete_session(store: &StateStore, session_id: &str) -> Result<bool> {
    store
        .delete(session_id)
        .with_context(|| format!("Failed to delete state for session: {}", session_id))
}
