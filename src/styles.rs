//! Art style catalog
//!
//! The ordered style list is fixed at configuration time. A [`StyleSelector`]
//! can only be obtained through [`StyleCatalog::select`], so resolving a
//! selector to its name never fails.

use crate::{Error, Result};
use serde::Serialize;

pub const DEFAULT_STYLES: &str = include_str!("../data/styles.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCatalog {
    names: Vec<String>,
}

/// A bounds-checked index into a [`StyleCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSelector<'a> {
    index: usize,
    name: &'a str,
}

impl StyleSelector<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleEntry<'a> {
    pub index: usize,
    pub name: &'a str,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self {
            names: DEFAULT_STYLES
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl StyleCatalog {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Config("style list must not be empty".to_string()));
        }
        if let Some(pos) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(Error::Config(format!("style at index {} is blank", pos)));
        }
        Ok(Self { names })
    }

    /// Parse a comma separated override such as `油画,水彩,卡通`.
    pub fn parse_list(raw: &str) -> Result<Self> {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn select(&self, index: usize) -> Result<StyleSelector<'_>> {
        self.names
            .get(index)
            .map(|name| StyleSelector { index, name })
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "style index {} is out of range (0..{})",
                    index,
                    self.names.len()
                ))
            })
    }

    pub fn entries(&self) -> impl Iterator<Item = StyleEntry<'_>> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| StyleEntry { index, name })
    }
}
