/*
This file is part of the geoshp shapefile library.
Authors: geoshp contributors
Created: 18/10/2026
Last Modified: 18/10/2026
License: MIT
*/
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

/// Writer settings. Can be stored as, and loaded from, a JSON settings file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    /// Logs a summary at info level after every save.
    pub verbose_mode: bool,
    /// Pads the shorter of the shape and record lists with nulls on save.
    pub auto_balance: bool,
    pub dbf_version: u8,
    /// Width of Character fields added with `add_field_default`.
    pub default_field_width: u8,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            verbose_mode: false,
            auto_balance: true,
            dbf_version: 3,
            default_field_width: 50,
        }
    }

    pub fn from_json(contents: &str) -> Result<Configs> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Loads settings from `file_name`, or the defaults if it does not exist.
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Configs> {
        match fs::read_to_string(file_name) {
            Ok(contents) => Configs::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Configs::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, file_name: P) -> Result<()> {
        let configs_json = self.to_json()?;
        let mut file = File::create(file_name)?;
        file.write_all(configs_json.as_bytes())?;
        Ok(())
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}
