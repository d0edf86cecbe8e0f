//! Account settings mutations.
//!
//! A settings form names one action in its `act` field. [`SettingsForm`] is
//! the wire shape; it converts into a [`SettingsAction`], which is applied to
//! a [`User`] record.

use crate::error::{ForumError, Result};
use crate::model::User;
use serde::Deserialize;
use sha3::{Digest, Sha3_256};

/// Hashes passwords for storage and verification.
pub trait PasswordDigest: Send + Sync {
    /// Returns the stored form of `password` for the account `name`.
    fn digest(&self, name: &str, password: &str) -> String;

    /// Checks `password` against a stored digest.
    fn verify(&self, name: &str, password: &str, stored: &str) -> bool {
        !stored.is_empty() && self.digest(name, password) == stored
    }
}

/// SHA3-256 over `name ‖ len(name) ‖ password ‖ len(password)`, hex encoded.
///
/// Lengths are byte lengths written in decimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameSaltedSha3;

impl PasswordDigest for NameSaltedSha3 {
    fn digest(&self, name: &str, password: &str) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(format!("{}{}{}{}", name, name.len(), password, password.len()).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A settings change requested by the account owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    /// Replace contact and profile fields.
    Info {
        email: String,
        telephone: String,
        url: String,
        about: String,
    },
    /// Replace the password after checking the current one.
    ChangePassword { current: String, new: String },
    /// Set a password on an account (no check of the old one).
    SetPassword { new: String },
    /// Point the avatar reference at the user's uploaded image.
    Avatar,
}

/// Settings form as posted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub act: String,
    pub email: String,
    pub telephone: String,
    pub url: String,
    pub about: String,
    /// Current password.
    pub password0: String,
    /// New password.
    pub password: String,
}

impl TryFrom<SettingsForm> for SettingsAction {
    type Error = ForumError;

    fn try_from(form: SettingsForm) -> Result<Self> {
        match form.act.as_str() {
            "" => Err(ForumError::invalid_input("Missing settings act")),
            "info" => Ok(SettingsAction::Info {
                email: form.email,
                telephone: form.telephone,
                url: form.url,
                about: form.about,
            }),
            "change_pw" => Ok(SettingsAction::ChangePassword {
                current: form.password0,
                new: form.password,
            }),
            "set_pw" => Ok(SettingsAction::SetPassword { new: form.password }),
            "avatar" => Ok(SettingsAction::Avatar),
            other => Err(ForumError::invalid_input(format!(
                "Unknown settings act: {}",
                other
            ))),
        }
    }
}

impl SettingsAction {
    /// Applies the action to `user`. Returns whether the record changed and
    /// needs to be written back.
    pub fn apply(&self, user: &mut User, digest: &dyn PasswordDigest) -> Result<bool> {
        match self {
            SettingsAction::Info {
                email,
                telephone,
                url,
                about,
            } => {
                if user.telephone != *telephone {
                    user.telephone = telephone.clone();
                    user.telephone_verified = false;
                }
                if user.email != *email {
                    user.email = email.clone();
                    user.email_verified = false;
                }
                user.url = url.clone();
                user.about = about.clone();
                Ok(true)
            }
            SettingsAction::ChangePassword { current, new } => {
                if current.is_empty() || new.is_empty() {
                    return Err(ForumError::invalid_input("Missing password arguments"));
                }
                if !digest.verify(&user.name, current, &user.password) {
                    return Err(ForumError::invalid_input("Current password is incorrect"));
                }
                user.password = digest.digest(&user.name, new);
                Ok(true)
            }
            SettingsAction::SetPassword { new } => {
                if new.is_empty() {
                    return Err(ForumError::invalid_input("Missing password argument"));
                }
                user.password = digest.digest(&user.name, new);
                Ok(true)
            }
            SettingsAction::Avatar => {
                if user.avatar.is_empty() || user.avatar == "0" {
                    user.avatar = user.id.to_string();
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}
