use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use keyring::Entry;

/// Env var checked before any persistent store.
pub const API_KEY_ENV: &str = "BAREHUB_API_KEY";

const SERVICE: &str = "barehub";
const ACCOUNT: &str = "textgen_api_key";
const FALLBACK_FILE: &str = "api_key";

fn fallback_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("barehub").join(FALLBACK_FILE));
    }
    dirs::config_dir().map(|dir| dir.join("barehub").join(FALLBACK_FILE))
}

/// Looks the key up in order: environment, system keyring, config-dir
/// fallback file. Absence is `Ok(None)`; only a broken keyring is an
/// error.
pub fn get_api_key() -> Result<Option<String>> {
    if let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.trim().is_empty()
    {
        return Ok(Some(key.trim().to_string()));
    }

    let entry =
        Entry::new(SERVICE, ACCOUNT).context("failed to initialize system keyring entry")?;
    match entry.get_password() {
        Ok(password) if !password.trim().is_empty() => {
            return Ok(Some(password.trim().to_string()));
        }
        Ok(_) | Err(keyring::Error::NoEntry) => {}
        Err(e) => {
            return Err(anyhow::anyhow!(
                "system keyring error ({e}); ensure your keychain is unlocked"
            ));
        }
    }

    if let Some(path) = fallback_path()
        && path.exists()
    {
        let key = std::fs::read_to_string(path)?.trim().to_string();
        if !key.is_empty() {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

/// Stores the key in the keyring and mirrors it into the fallback file
/// with owner-only permissions.
pub fn set_api_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    if let Ok(entry) = Entry::new(SERVICE, ACCOUNT) {
        let _ = entry.set_password(key);
    }

    let path = fallback_path().context("could not determine configuration directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .context("failed to open API key file with owner-only permissions")?;
        file.write_all(key.as_bytes())?;
    }

    #[cfg(not(unix))]
    std::fs::write(&path, key).context("failed to write API key file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(set_api_key("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn fallback_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let config = std::env::temp_dir().join(format!("barehub_keys_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&config);
        // Redirect the fallback location for this test.
        unsafe { std::env::set_var("XDG_CONFIG_HOME", &config) };

        set_api_key("secret-token").unwrap();
        let path = fallback_path().unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "secret-token");

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
        std::fs::remove_dir_all(&config).unwrap();
    }
}
