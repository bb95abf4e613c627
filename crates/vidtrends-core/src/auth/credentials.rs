use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service name for stored refresh credentials
const SERVICE_NAME: &str = "vidtrends";

/// OS-keychain storage for the long-lived refresh credential.
///
/// The access token only ever lives in memory; what survives restarts is
/// the refresh credential, keyed by the account email.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the refresh credential for an account
    pub fn store(email: &str, refresh_token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(refresh_token)
            .context("Failed to store refresh credential in keychain")?;
        Ok(())
    }

    /// Retrieve the refresh credential for an account
    pub fn get(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve refresh credential from keychain")
    }

    /// Delete the stored refresh credential for an account
    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete refresh credential from keychain")?;
        Ok(())
    }
}
