//! Seed reference data (categories, artists, instructors) from YAML.
//!
//! ```yaml
//! categories:
//!   - name: Woodcarving
//!     description: Spoons, bowls and kolrosing
//! artists:
//!   - name: Marit Haugen
//!     email: marit@example.org
//!     commission_rate: "0.30"
//! instructors:
//!   - name: Ole Brekke
//!     email: ole@example.org
//!     specialties: [woodcarving]
//! ```
//!
//! Categories whose name already exists are skipped, so the file can be
//! re-run after adding entries.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use maple_spruce_admin::db::{ArtistRepository, CategoryRepository, InstructorRepository};
use maple_spruce_admin::models::{CreateArtistInput, CreateCategoryInput, CreateInstructorInput};

use super::{CliError, connect};

/// Contents of a seed file. Every section is optional.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<CreateCategoryInput>,
    #[serde(default)]
    pub artists: Vec<CreateArtistInput>,
    #[serde(default)]
    pub instructors: Vec<CreateInstructorInput>,
}

impl SeedFile {
    /// Validate every entry up front so a bad file writes nothing.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry, named by section and position.
    pub fn validate(self) -> Result<Self, CliError> {
        fn all<T>(
            section: &str,
            items: Vec<T>,
            validate: impl Fn(T) -> Result<T, maple_spruce_admin::models::ValidationError>,
        ) -> Result<Vec<T>, CliError> {
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    validate(item).map_err(|source| CliError::InvalidSeed {
                        entry: format!("{section}[{i}]"),
                        source,
                    })
                })
                .collect()
        }

        Ok(Self {
            categories: all("categories", self.categories, CreateCategoryInput::validate)?,
            artists: all("artists", self.artists, CreateArtistInput::validate)?,
            instructors: all("instructors", self.instructors, CreateInstructorInput::validate)?,
        })
    }
}

/// Seed the database from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or a database write fails.
pub async fn run(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed data");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    let seed = seed.validate()?;

    let pool = connect().await?;

    let categories = CategoryRepository::new(&pool);
    let mut skipped = 0;
    for input in &seed.categories {
        if categories.get_by_name(&input.name).await?.is_some() {
            info!(name = %input.name, "Category exists, skipping");
            skipped += 1;
            continue;
        }
        categories.create(input).await?;
    }

    let artists = ArtistRepository::new(&pool);
    for input in &seed.artists {
        artists.create(input).await?;
    }

    let instructors = InstructorRepository::new(&pool);
    for input in &seed.instructors {
        instructors.create(input).await?;
    }

    info!("Seeding complete!");
    info!(
        "  Categories: {} created, {} skipped",
        seed.categories.len() - skipped,
        skipped
    );
    info!("  Artists: {}", seed.artists.len());
    info!("  Instructors: {}", seed.instructors.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
categories:
  - name: "  Woodcarving "
    description: Spoons and bowls
artists:
  - name: Marit Haugen
    email: Marit@Example.org
    commission_rate: "0.30"
instructors:
  - name: Ole Brekke
    email: ole@example.org
    specialties: [woodcarving, Woodcarving, kolrosing]
"#;

    #[test]
    fn test_parse_and_normalize() {
        let seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let seed = seed.validate().unwrap();

        assert_eq!(seed.categories[0].name, "Woodcarving");
        assert_eq!(seed.artists[0].email, "marit@example.org");
        assert_eq!(
            seed.instructors[0].specialties,
            vec!["woodcarving".to_string(), "kolrosing".to_string()]
        );
    }

    #[test]
    fn test_sections_are_optional() {
        let seed: SeedFile = serde_yaml::from_str("categories:\n  - name: Weaving\n").unwrap();
        assert_eq!(seed.categories.len(), 1);
        assert!(seed.artists.is_empty());
        assert!(seed.instructors.is_empty());
    }

    #[test]
    fn test_invalid_entry_is_named() {
        let seed: SeedFile =
            serde_yaml::from_str("artists:\n  - name: Nobody\n    email: not-an-email\n").unwrap();
        let err = seed.validate().unwrap_err();
        assert!(err.to_string().contains("artists[0]"), "{err}");
    }
}
