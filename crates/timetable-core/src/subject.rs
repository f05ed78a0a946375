use serde::{Deserialize, Serialize};

/// Closed set of subject names a schedule entry may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectCatalog {
    subjects: Vec<String>,
}

impl Default for SubjectCatalog {
    fn default() -> Self {
        Self::new([
            "Pendidikan Agama",
            "Pendidikan Pancasila",
            "Bahasa Indonesia",
            "Matematika",
            "IPAS",
            "Seni Budaya",
            "PJOK",
            "Bahasa Inggris",
            "Bahasa Jawa",
        ])
    }
}

impl SubjectCatalog {
    /// Blank names and case-insensitive duplicates are dropped; the first
    /// spelling wins.
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self {
            subjects: Vec::new(),
        };
        for subject in subjects {
            let subject = subject.into().trim().to_string();
            if subject.is_empty() || catalog.canonicalize(&subject).is_some() {
                continue;
            }
            catalog.subjects.push(subject);
        }
        catalog
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Canonical spelling of `raw`, matched case-insensitively after trimming.
    pub fn canonicalize(&self, raw: &str) -> Option<&str> {
        let needle = raw.trim();
        if needle.is_empty() {
            return None;
        }
        self.subjects
            .iter()
            .find(|subject| subject.eq_ignore_ascii_case(needle))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonicalize(name).is_some()
    }
}
