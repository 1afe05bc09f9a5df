use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// A single key to destination folder association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBind {
    pub key: char,
    pub folder: String,
}

/// Key binds in insertion order. Editing a key or folder keeps the entry's position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindMap {
    binds: Vec<KeyBind>,
}

impl KeyBindMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `folder`, replacing the folder in place if the key is already bound
    pub fn put(&mut self, key: char, folder: impl Into<String>) {
        let folder = folder.into();
        match self.position(key) {
            Some(idx) => self.binds[idx].folder = folder,
            None => self.binds.push(KeyBind { key, folder }),
        }
    }

    /// Changes the folder of an existing bind, returning the previous folder
    pub fn replace_folder(&mut self, key: char, folder: impl Into<String>) -> Option<String> {
        let idx = self.position(key)?;
        Some(std::mem::replace(&mut self.binds[idx].folder, folder.into()))
    }

    /// Rebinds the folder of `old` to `new`. Does nothing if `old` is unbound or `new` is taken.
    pub fn replace_key(&mut self, old: char, new: char) -> bool {
        if old != new && self.position(new).is_some() {
            return false;
        }
        match self.position(old) {
            Some(idx) => {
                self.binds[idx].key = new;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: char) -> Option<&str> {
        self.position(key).map(|idx| self.binds[idx].folder.as_str())
    }

    /// Destination folder for a key press, if any
    pub fn folder_for_key(&self, key: char) -> Option<&str> {
        self.get(key).filter(|folder| !folder.is_empty())
    }

    pub fn remove(&mut self, key: char) -> Option<String> {
        let idx = self.position(key)?;
        Some(self.binds.remove(idx).folder)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBind> {
        self.binds.iter()
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Parses a `KEY=FOLDER` pair as given on the command line
    pub fn parse_bind(text: &str) -> Result<KeyBind, ConfigError> {
        let invalid = || ConfigError::InvalidBind(text.to_string());

        let (key, folder) = text.split_once('=').ok_or_else(invalid)?;
        let key = single_char(key).ok_or_else(invalid)?;

        let folder = folder.trim();
        if folder.is_empty() || !is_relative_folder(folder) {
            return Err(invalid());
        }

        Ok(KeyBind {
            key,
            folder: folder.to_string(),
        })
    }

    /// Parses an `OLD=NEW` key pair for `--rebind`
    pub fn parse_rebind(text: &str) -> Result<(char, char), ConfigError> {
        let invalid = || ConfigError::InvalidRebind(text.to_string());

        let (old, new) = text.split_once('=').ok_or_else(invalid)?;
        Ok((single_char(old).ok_or_else(invalid)?, single_char(new).ok_or_else(invalid)?))
    }

    /// Rejects binds whose folder would leave the browsed folder. Empty folders are allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.binds.iter().find(|b| !is_relative_folder(&b.folder)) {
            Some(bind) => Err(ConfigError::InvalidBind(format!("{}={}", bind.key, bind.folder))),
            None => Ok(()),
        }
    }

    fn position(&self, key: char) -> Option<usize> {
        self.binds.iter().position(|b| b.key == key)
    }
}

/// Whether `folder` stays inside the set root once joined to it
pub fn is_relative_folder(folder: &str) -> bool {
    let path = Path::new(folder);
    !path.has_root()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
