//! Respondent personas loaded from a semicolon-delimited table.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaAttribute {
    pub name: String,
    pub value: String,
}

/// One row of the persona table. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub index: usize,
    pub attributes: Vec<PersonaAttribute>,
}

impl Persona {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    /// `name: value` lines, used where a template does not reference attributes by name.
    pub fn describe(&self) -> String {
        self.attributes
            .iter()
            .map(|attribute| format!("{}: {}", attribute.name, attribute.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaTable {
    personas: Vec<Persona>,
}

impl PersonaTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersonaError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| PersonaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(path = %path.display(), personas = table.len(), "personas loaded");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PersonaError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.iter().all(|header| header.is_empty()) {
            return Err(PersonaError::MissingHeader);
        }

        let mut personas = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let attributes = headers
                .iter()
                .zip(record.iter())
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| PersonaAttribute {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect();
            personas.push(Persona {
                index: personas.len() + 1,
                attributes,
            });
        }

        if personas.is_empty() {
            return Err(PersonaError::Empty);
        }
        Ok(Self { personas })
    }

    /// Persona used for a zero-based repetition; the table is cycled.
    pub fn for_repetition(&self, repetition: usize) -> Option<&Persona> {
        if self.personas.is_empty() {
            return None;
        }
        self.personas.get(repetition % self.personas.len())
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("failed to read persona table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid persona table: {0}")]
    Csv(#[from] csv::Error),
    #[error("persona table has no header row")]
    MissingHeader,
    #[error("persona table has no rows")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "Gender;Age group;Region\nfemale;15-24;North\nmale ; 25-34 ;South\n";

    #[test]
    fn reads_rows_with_one_based_index() {
        let table = PersonaTable::from_reader(TABLE.as_bytes()).expect("table parses");
        assert_eq!(table.len(), 2);

        let second = &table.personas()[1];
        assert_eq!(second.index, 2);
        assert_eq!(second.get("Age group"), Some("25-34"));
        assert_eq!(second.get("Region"), Some("South"));
        assert_eq!(second.describe(), "Gender: male\nAge group: 25-34\nRegion: South");
    }

    #[test]
    fn repetitions_cycle_through_personas() {
        let table = PersonaTable::from_reader(TABLE.as_bytes()).expect("table parses");
        let indices: Vec<usize> = (0..5)
            .filter_map(|repetition| table.for_repetition(repetition))
            .map(|persona| persona.index)
            .collect();
        assert_eq!(indices, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn header_only_table_is_rejected() {
        let error = PersonaTable::from_reader("Gender;Age\n".as_bytes()).expect_err("no rows");
        assert!(matches!(error, PersonaError::Empty));
    }
}
