//! Account credentials: the token handed over at login, and the signed-in
//! account as reported by the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login payload is missing {0}")]
    MissingField(&'static str),

    #[error("Login payload is not an object")]
    InvalidPayload,

    #[error("Could not locate the home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid auth file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Credentials stored after a successful login.
///
/// Every field defaults so that a missing token or username surfaces as
/// [`AuthError::MissingField`] from [`AuthPayload::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPayload {
    pub access_token: String,
    pub username: String,
    pub name: String,
    pub image_url: String,
    pub email: String,
    pub subscription_name: String,
}

impl AuthPayload {
    /// Decode the `data` object of a login channel message.
    ///
    /// The token and username are required; the profile fields default to
    /// empty strings.
    pub fn from_channel_data(data: &Value) -> Result<Self> {
        if !data.is_object() {
            return Err(AuthError::InvalidPayload);
        }

        let payload: Self = serde_json::from_value(data.clone())?;
        payload.validate()?;
        Ok(payload)
    }

    /// Check the fields a session cannot work without.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(AuthError::MissingField("access_token"));
        }
        if self.username.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        Ok(())
    }
}

/// The account behind a token, from `GET api/v1/auth/me`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    pub is_signed_in: bool,
    pub uuid: String,
    pub name: String,
    pub username: String,
    pub image_url: String,
    pub email: String,
    #[serde(alias = "subscriptionName")]
    pub subscription_name: String,
}

impl AccountInfo {
    pub fn is_free_plan(&self) -> bool {
        self.subscription_name.is_empty() || self.subscription_name == "free"
    }
}

/// The auth file, `~/.config/deck/auth.json`.
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    /// Store at the default location under the home directory.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or(AuthError::NoHomeDir)?;
        Ok(Self::at(home.join(".config").join("deck").join("auth.json")))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored credentials. `None` when nobody has logged in.
    pub fn load(&self) -> Result<Option<AuthPayload>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let payload: AuthPayload = serde_json::from_str(&contents)?;
        payload.validate()?;
        Ok(Some(payload))
    }

    /// Save credentials, readable by the current user only.
    pub fn save(&self, payload: &AuthPayload) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(payload)?;
        fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}
