use std::env;

/// Connection settings for the hosted store.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StoreConfig {
    /// Project base url, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Service or anon key sent as both `apikey` and bearer token.
    pub key: String,
}

impl StoreConfig {
    /// Reads `ACETRACK_STORE_URL` and `ACETRACK_STORE_KEY`.
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let url = env::var("ACETRACK_STORE_URL").ok()?;
        let key = env::var("ACETRACK_STORE_KEY").ok()?;
        let url = url.trim().trim_end_matches('/').to_string();
        let key = key.trim().to_string();
        if url.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self { url, key })
    }

    /// REST endpoint for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// Endpoint of the auth provider.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }
}
