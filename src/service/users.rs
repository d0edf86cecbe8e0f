//! User accessors.

use super::Forum;
use crate::error::{ForumError, Result};
use crate::model::{User, UserListItem};
use crate::pagination::{self, Cursor, Direction, Listing, Page};
use crate::settings::{PasswordDigest, SettingsAction};
use crate::storage::{id_key, key_id};
use crate::tables;
use tracing::{debug, info};

/// User page for moderation listings.
pub type UserPageInfo = Page<UserListItem>;

impl Forum {
    /// Looks up a user by id.
    pub fn user_get_by_id(&self, uid: u64) -> Result<User> {
        self.get_record(tables::USER, uid)
    }

    /// Looks up the id registered for `name`.
    pub fn user_get_id_by_name(&self, name: &str) -> Result<Option<u64>> {
        if name.is_empty() {
            return Ok(None);
        }
        let Some(bytes) = self.store.get(tables::USER_NAME_INDEX, name.as_bytes())? else {
            return Ok(None);
        };
        key_id(&bytes)
            .map(Some)
            .ok_or_else(|| ForumError::decode(format!("Corrupt name index entry for {}", name)))
    }

    /// Looks up a user by name.
    pub fn user_get_by_name(&self, name: &str) -> Result<User> {
        let uid = self
            .user_get_id_by_name(name)?
            .ok_or_else(|| ForumError::not_found(format!("user {}", name)))?;
        self.user_get_by_id(uid)
    }

    /// Creates an account. `password` must already be a digest.
    pub fn user_register(&self, name: &str, password: &str, flag: i32, now: u64) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForumError::invalid_input("User name must not be empty"));
        }

        let _guard = self.lock_accounts();
        if self.user_get_id_by_name(name)?.is_some() {
            return Err(ForumError::invalid_input(format!(
                "User name {} is taken",
                name
            )));
        }

        let id = self.store.next_sequence(tables::USER)?;
        let user = User {
            id,
            name: name.to_string(),
            password: password.to_string(),
            flag,
            reg_time: now,
            ..Default::default()
        };
        self.put_record(tables::USER, id, &user)?;
        self.store
            .set(tables::USER_NAME_INDEX, name.as_bytes(), &id_key(id))?;
        self.store.set(&tables::user_flag(flag), &id_key(id), &[])?;

        info!(id, flag, "User registered");
        Ok(user)
    }

    /// Writes back a user record, keeping the flag index in step.
    ///
    /// The name is fixed at registration; a record whose name differs from
    /// the stored one is rejected.
    pub fn user_update(&self, user: &User) -> Result<()> {
        if user.id == 0 {
            return Err(ForumError::invalid_input("User id must not be 0"));
        }
        let old = self.user_get_by_id(user.id)?;
        if old.name != user.name {
            return Err(ForumError::invalid_input("User names cannot be changed"));
        }

        let key = id_key(user.id);
        if old.flag != user.flag {
            self.store.delete(&tables::user_flag(old.flag), &key)?;
            self.store.set(&tables::user_flag(user.flag), &key, &[])?;
            debug!(id = user.id, from = old.flag, to = user.flag, "User flag moved");
        }
        self.put_record(tables::USER, user.id, user)
    }

    /// Changes a user's moderation flag.
    pub fn user_set_flag(&self, uid: u64, flag: i32) -> Result<User> {
        let mut user = self.user_get_by_id(uid)?;
        user.flag = flag;
        self.user_update(&user)?;
        Ok(user)
    }

    /// One page of the users carrying `flag`, newest first.
    pub fn user_list_by_flag(
        &self,
        flag: i32,
        cursor: Cursor,
        direction: Direction,
        limit: usize,
    ) -> Result<UserPageInfo> {
        let table = tables::user_flag(flag);
        pagination::page(
            &self.store,
            Listing::newest_by_id(&table),
            cursor,
            direction,
            limit,
            |rows| self.load_rows::<User>(tables::USER, rows),
            |(cursor, _): &(Cursor, User)| *cursor,
        )?
        .try_map(|items| {
            Ok(items
                .into_iter()
                .map(|(_, user)| UserListItem::from(user))
                .collect())
        })
    }

    /// Applies a settings change to user `uid` and persists it.
    pub fn settings_apply(
        &self,
        uid: u64,
        action: &SettingsAction,
        digest: &dyn PasswordDigest,
    ) -> Result<User> {
        let mut user = self.user_get_by_id(uid)?;
        if action.apply(&mut user, digest)? {
            self.put_record(tables::USER, uid, &user)?;
            debug!(uid, "User settings saved");
        }
        Ok(user)
    }
}
