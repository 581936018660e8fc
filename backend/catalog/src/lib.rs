//! # Catalog
//!
//! Course content and enrollment records shared by the server and the seed tool.
//!
//! ## Shape
//!
//! - Course: top level container
//! - Module: belongs to exactly one course
//! - Lesson: belongs to exactly one module, carries its drip policy
//! - Enrollment: one user in one course, only `active` counts for drip
//!
//! Relationships are stored as IDs. Readers resolve them into a [`models::PopulatedLesson`]
//! before any access decision is made.
use std::{fs, path::Path};

use anyhow::{Context, Error};

pub mod keys;
pub mod models;

use models::Catalog;

pub fn read_catalog(path: impl AsRef<Path>) -> Result<Catalog, Error> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    let catalog = serde_json::from_str(&data)
        .with_context(|| format!("Malformed catalog {}", path.display()))?;

    Ok(catalog)
}
