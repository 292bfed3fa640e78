use keyring::Entry;

const SERVICE: &str = "mailguard";

/// Tokens are stored per backend, keyed by the API base URL.
fn key_id(api_url: &str) -> String {
    format!("token@{}", api_url.trim_end_matches('/'))
}

fn entry(api_url: &str) -> Result<(Entry, String), String> {
    let key = key_id(api_url);
    let entry = Entry::new(SERVICE, &key).map_err(|e| {
        log::error!("keyring unavailable for {key:?}: {e}");
        format!("keyring error: {e}")
    })?;
    Ok((entry, key))
}

/// `Ok(None)` means the keyring works but holds no token for this backend.
pub fn get_token(api_url: &str) -> Result<Option<String>, String> {
    let (entry, key) = entry(api_url)?;
    match entry.get_password() {
        Ok(token) => {
            log::debug!("keyring hit for {key:?}");
            Ok(Some(token))
        }
        Err(keyring::Error::NoEntry) => {
            log::debug!("keyring has no token for {key:?}");
            Ok(None)
        }
        Err(e) => {
            log::warn!("keyring read failed for {key:?}: {e}");
            Err(format!("keyring get: {e}"))
        }
    }
}

pub fn set_token(api_url: &str, token: &str) -> Result<(), String> {
    let (entry, key) = entry(api_url)?;
    entry.set_password(token).map_err(|e| {
        log::error!("keyring write failed for {key:?}: {e}");
        format!("keyring set: {e}")
    })
}
