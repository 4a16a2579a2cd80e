use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The two independent recommendation domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    Books,
    Mangas,
}

/// Per-catalog behaviour of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub catalog: Catalog,
    /// Item attribute on which the popularity table is diversified, if any.
    pub diversity_key: Option<&'static str>,
}

impl Catalog {
    pub const ALL: [Catalog; 2] = [Catalog::Books, Catalog::Mangas];

    pub fn name(&self) -> &'static str {
        match self {
            Catalog::Books => "books",
            Catalog::Mangas => "mangas",
        }
    }

    pub fn settings(&self) -> CatalogSettings {
        let diversity_key = match self {
            Catalog::Books => Some("author"),
            Catalog::Mangas => None,
        };
        CatalogSettings {
            catalog: *self,
            diversity_key,
        }
    }

    pub fn items_table(&self) -> String {
        self.name().to_string()
    }

    pub fn ratings_table(&self) -> String {
        format!("{}_ratings", self.name())
    }

    pub fn popular_table(&self) -> String {
        format!("{}_popular", self.name())
    }

    pub fn item_based_table(&self) -> String {
        format!("{}_item_based", self.name())
    }

    pub fn user_based_table(&self) -> String {
        format!("{}_user_based", self.name())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Catalog {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "books" => Ok(Catalog::Books),
            "mangas" | "manga" => Ok(Catalog::Mangas),
            other => Err(Error::UnknownCatalog(other.to_string())),
        }
    }
}
