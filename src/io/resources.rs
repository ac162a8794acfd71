use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::models::{Dictionaries, Gender};
use crate::sieves::LinearScorer;

/// Locations of the word-list resources. A missing list keeps the built-in default.
#[derive(Debug, Clone, Default)]
pub struct ResourcePaths {
    pub report_verbs: Option<PathBuf>,
    pub first_person_pronouns: Option<PathBuf>,
    pub family_words: Option<PathBuf>,
    /// `word<TAB>MALE|FEMALE|NEUTRAL` per line
    pub gendered_nouns: Option<PathBuf>,
    pub animate_words: Option<PathBuf>,
}

impl ResourcePaths {
    /// Read paths from `DIALOGIST_RESOURCES` (a directory holding the standard file
    /// names) and the per-list overrides `DIALOGIST_REPORT_VERBS`,
    /// `DIALOGIST_FIRST_PERSON`, `DIALOGIST_FAMILY_WORDS`, `DIALOGIST_GENDER` and
    /// `DIALOGIST_ANIMATE`.
    pub fn from_env() -> Self {
        let dir = std::env::var_os("DIALOGIST_RESOURCES").map(PathBuf::from);
        let mut paths = dir.as_deref().map(Self::from_dir).unwrap_or_default();

        let overrides: [(&str, &mut Option<PathBuf>); 5] = [
            ("DIALOGIST_REPORT_VERBS", &mut paths.report_verbs),
            ("DIALOGIST_FIRST_PERSON", &mut paths.first_person_pronouns),
            ("DIALOGIST_FAMILY_WORDS", &mut paths.family_words),
            ("DIALOGIST_GENDER", &mut paths.gendered_nouns),
            ("DIALOGIST_ANIMATE", &mut paths.animate_words),
        ];
        for (var, slot) in overrides {
            if let Some(value) = std::env::var_os(var) {
                *slot = Some(PathBuf::from(value));
            }
        }
        paths
    }

    /// Standard file names inside `dir`, kept only when the file exists
    pub fn from_dir(dir: &Path) -> Self {
        let existing = |name: &str| {
            let path = dir.join(name);
            path.is_file().then_some(path)
        };
        Self {
            report_verbs: existing("report_verbs.txt"),
            first_person_pronouns: existing("first_person.txt"),
            family_words: existing("family_words.txt"),
            gendered_nouns: existing("gender.txt"),
            animate_words: existing("animate.txt"),
        }
    }

    /// Load the dictionaries, replacing each default list that has a file
    pub fn load(&self) -> Result<Dictionaries> {
        let mut dict = Dictionaries::default();
        if let Some(path) = &self.report_verbs {
            dict.report_verbs = read_word_list(path)?;
        }
        if let Some(path) = &self.first_person_pronouns {
            dict.first_person_pronouns = read_word_list(path)?;
        }
        if let Some(path) = &self.family_words {
            dict.family_words = read_word_list(path)?;
        }
        if let Some(path) = &self.gendered_nouns {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            dict.gendered_nouns = parse_gender_list(&content)
                .with_context(|| format!("Invalid gender list: {:?}", path))?;
        }
        if let Some(path) = &self.animate_words {
            dict.animate_words = read_word_list(path)?;
        }
        info!(
            "Loaded dictionaries: {} report verbs, {} gendered nouns, {} animate words",
            dict.report_verbs.len(),
            dict.gendered_nouns.len(),
            dict.animate_words.len()
        );
        Ok(dict)
    }
}

fn read_word_list(path: &Path) -> Result<HashSet<String>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let words = parse_word_list(&content);
    debug!("Read {} entries from {:?}", words.len(), path);
    Ok(words)
}

/// One lowercased entry per non-empty line; `#` starts a comment line
pub fn parse_word_list(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

pub fn parse_gender_list(content: &str) -> Result<HashMap<String, Gender>> {
    let mut genders = HashMap::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((word, gender)) = line.rsplit_once(char::is_whitespace) else {
            bail!("Missing gender at line {}", i + 1);
        };
        let gender = match gender.to_uppercase().as_str() {
            "MALE" => Gender::Male,
            "FEMALE" => Gender::Female,
            "NEUTRAL" => Gender::Neutral,
            other => bail!("Unknown gender {:?} at line {}", other, i + 1),
        };
        genders.insert(word.trim().to_lowercase(), gender);
    }
    Ok(genders)
}

/// Load a supervised scorer from `{ "bias": .., "weights": { .. } }` JSON
pub fn load_scorer(path: &Path) -> Result<LinearScorer> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid scorer model: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word_list() {
        let words = parse_word_list("# verbs\nSay\n\n  whisper \n");
        assert_eq!(words.len(), 2);
        assert!(words.contains("say"));
        assert!(words.contains("whisper"));
    }

    #[test]
    fn test_parse_gender_list() {
        let genders = parse_gender_list("Joe\tMALE\nann FEMALE\n").unwrap();
        assert_eq!(genders.get("joe"), Some(&Gender::Male));
        assert_eq!(genders.get("ann"), Some(&Gender::Female));
        assert!(parse_gender_list("joe\tSOMETIMES").is_err());
        assert!(parse_gender_list("joe").is_err());
    }

    #[test]
    fn test_load_from_dir_keeps_defaults_for_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report_verbs.txt"), "bellow\n").unwrap();
        std::fs::write(dir.path().join("gender.txt"), "Joe\tMALE\n").unwrap();

        let paths = ResourcePaths::from_dir(dir.path());
        assert!(paths.family_words.is_none());
        let dict = paths.load().unwrap();

        assert!(dict.is_report_verb("bellow"));
        assert!(!dict.is_report_verb("say"));
        assert_eq!(dict.gender_of("Joe"), Gender::Male);
        assert!(dict.is_family_word("mother"));
    }

    #[test]
    fn test_load_scorer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scorer.json");
        std::fs::write(&path, r#"{"bias": -1.0, "weights": {"before": 2.0}}"#).unwrap();
        let scorer = load_scorer(&path).unwrap();
        assert_eq!(scorer.bias, -1.0);
        assert_eq!(scorer.weights.get("before"), Some(&2.0));
    }
}
