use std::ops::Deref;
use std::sync::Arc;

use api::prefs::scanner_prefs::ScannerPrefs;

#[derive(Debug, PartialEq, Eq)]
pub struct AppStateData {
    pub scanner_prefs: ScannerPrefs,
}

/// Read-only state loaded from the server before the app renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppState(Arc<AppStateData>);

impl Deref for AppState {
    type Target = AppStateData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AppState {
    pub fn new(scanner_prefs: ScannerPrefs) -> Self {
        Self(Arc::new(AppStateData { scanner_prefs }))
    }
}
