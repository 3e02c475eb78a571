//! libsoc configuration files
//!
//! Board configurations map pin names to GPIO numbers. The format is a minimal INI dialect:
//!
//! ```text
//! # BeagleBone Black
//! [board]
//! model = TI AM335x BeagleBone Black
//!
//! [GPIO]
//! P9_12 = 60
//! P8_7 = 66
//! ```
//!
//! Lines starting with `#` and blank lines are ignored. Whitespace around keys, values and section
//! names is trimmed. Every setting must belong to a section and have a value. A section that
//! appears again replaces the earlier one.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str;
use crate::error::*;

/// Section holding the pin name to GPIO number mapping.
pub const GPIO_SECTION: &str = "GPIO";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl ConfFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConfFile> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        ConfFile::parse(&text, &path.display().to_string())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|settings| settings.get(key))
            .map(|val| val.as_str())
    }

    pub fn get_int(&self, section: &str, key: &str) -> Option<i32> {
        self.get(section, key).and_then(|val| val.parse().ok())
    }

    /// Add or replace a setting.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|name| name.as_str())
    }

    fn parse(text: &str, origin: &str) -> Result<ConfFile> {
        let section_re = Regex::new(r"^\[\s*([^\]]*?)\s*\]$").unwrap();
        let setting_re = Regex::new(r"^([^=]*?)\s*=\s*(.*)$").unwrap();

        let mut conf = ConfFile::default();
        let mut current: Option<String> = None;
        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |what: &str| {
                Error::InvalidArgument(format!("{}:{}: {}: {}", origin, index + 1, what, raw_line))
            };

            if line.starts_with('[') {
                let cap = section_re
                    .captures(line)
                    .ok_or_else(|| invalid("invalid section line"))?;
                if cap[1].is_empty() {
                    return Err(invalid("empty section name"));
                }
                conf.sections.insert(cap[1].to_string(), HashMap::new());
                current = Some(cap[1].to_string());
            } else {
                let cap = setting_re
                    .captures(line)
                    .ok_or_else(|| invalid("invalid key = value"))?;
                if cap[1].is_empty() {
                    return Err(invalid("missing key"));
                }
                if cap[2].is_empty() {
                    return Err(invalid("missing value"));
                }
                let section = current
                    .as_ref()
                    .ok_or_else(|| invalid("setting outside of a section"))?;
                conf.set(section, &cap[1], &cap[2]);
            }
        }
        Ok(conf)
    }
}

impl str::FromStr for ConfFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<ConfFile> {
        ConfFile::parse(s, "<string>")
    }
}
