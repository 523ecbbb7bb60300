use super::Table;
use crate::models::{Record, Settings, SETTINGS_ID};
use crate::notifier::Subscription;

/// The settings table, kept to a single logical row.
///
/// The engine stores every settings write under [`SETTINGS_ID`] whatever id
/// the caller passed, so repeated saves overwrite instead of accumulating.
#[derive(Clone)]
pub struct SettingsTable {
    table: Table<Settings>,
}

impl SettingsTable {
    pub(crate) fn new(table: Table<Settings>) -> Self {
        Self { table }
    }

    pub fn save(&self, settings: Settings) -> Settings {
        self.table.save(settings)
    }

    /// The settings row, if one was ever saved or synced.
    pub fn current(&self) -> Option<Settings> {
        pick_row(self.table.list())
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<Settings>) + Send + Sync + 'static,
    {
        self.table
            .subscribe(move |rows: Vec<Settings>| callback(pick_row(rows)))
    }
}

/// The row under the fixed id, else whatever row a remote sheet handed us.
fn pick_row(rows: Vec<Settings>) -> Option<Settings> {
    let index = rows
        .iter()
        .position(|s| s.id().as_deref() == Some(SETTINGS_ID))
        .unwrap_or(0);
    rows.into_iter().nth(index)
}
