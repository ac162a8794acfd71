use std::collections::{HashMap, HashSet};

use super::mention::{Animacy, Gender, Number};

const REPORT_VERBS: &[&str] = &[
    "accuse", "acknowledge", "add", "admit", "advise", "agree", "announce", "answer", "argue",
    "ask", "assert", "assure", "beg", "boast", "call", "caution", "claim", "comment", "complain",
    "confess", "confirm", "continue", "cry", "declare", "demand", "deny", "exclaim", "explain",
    "groan", "growl", "grumble", "inform", "inquire", "insist", "interrupt", "joke", "laugh",
    "mention", "moan", "murmur", "mutter", "note", "observe", "order", "plead", "promise",
    "propose", "protest", "reassure", "recall", "reckon", "remark", "remind", "repeat", "reply",
    "report", "respond", "retort", "say", "scream", "shout", "shriek", "sigh", "snap", "sneer",
    "sob", "speak", "state", "stammer", "stutter", "suggest", "tell", "testify", "think", "urge",
    "wail", "warn", "whimper", "whisper", "wonder", "write", "yell",
];

const FIRST_PERSON_PRONOUNS: &[&str] = &[
    "i", "me", "my", "mine", "myself", "we", "us", "our", "ours", "ourselves",
];

const SINGULAR_FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "myself"];

const PLURAL_PRONOUNS: &[&str] = &[
    "we", "us", "our", "ours", "ourselves", "they", "them", "their", "theirs", "themselves",
];

const SECOND_PERSON_PRONOUNS: &[&str] = &["you", "your", "yours", "yourself", "yourselves"];

const MALE_PRONOUNS: &[&str] = &["he", "him", "his", "himself"];
const FEMALE_PRONOUNS: &[&str] = &["she", "her", "hers", "herself"];
const NEUTRAL_PRONOUNS: &[&str] = &["it", "its", "itself"];

const FAMILY_WORDS: &[&str] = &[
    "aunt", "brother", "cousin", "dad", "daddy", "daughter", "father", "grandfather",
    "grandmother", "grandma", "grandpa", "husband", "ma", "mama", "mom", "mother", "mum",
    "nephew", "niece", "pa", "papa", "sister", "son", "uncle", "wife",
];

const MALE_NOUNS: &[&str] = &[
    "boy", "brother", "dad", "daddy", "father", "gentleman", "grandfather", "grandpa", "husband",
    "king", "lord", "man", "mr.", "mr", "nephew", "pa", "papa", "prince", "sir", "son", "uncle",
];

const FEMALE_NOUNS: &[&str] = &[
    "aunt", "daughter", "girl", "grandma", "grandmother", "lady", "ma", "madam", "mama",
    "miss", "mom", "mother", "mrs.", "mrs", "ms.", "mum", "niece", "princess", "queen",
    "sister", "wife", "woman",
];

const ANIMATE_NOUNS: &[&str] = &[
    "captain", "child", "doctor", "driver", "friend", "guard", "judge", "maid", "nurse",
    "officer", "person", "people", "priest", "servant", "soldier", "stranger", "student",
    "tailor", "waiter", "worker",
];

fn word_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Word lists consulted by the preprocessor and the attribution sieves.
///
/// All lookups are case-insensitive; entries are stored lowercased.
#[derive(Debug, Clone)]
pub struct Dictionaries {
    pub report_verbs: HashSet<String>,
    pub first_person_pronouns: HashSet<String>,
    pub family_words: HashSet<String>,
    /// Names and nouns with a known gender
    pub gendered_nouns: HashMap<String, Gender>,
    pub animate_words: HashSet<String>,
}

impl Default for Dictionaries {
    fn default() -> Self {
        let mut gendered_nouns = HashMap::new();
        for noun in MALE_NOUNS {
            gendered_nouns.insert(noun.to_string(), Gender::Male);
        }
        for noun in FEMALE_NOUNS {
            gendered_nouns.insert(noun.to_string(), Gender::Female);
        }

        let mut animate_words = word_set(ANIMATE_NOUNS);
        animate_words.extend(gendered_nouns.keys().cloned());

        Self {
            report_verbs: word_set(REPORT_VERBS),
            first_person_pronouns: word_set(FIRST_PERSON_PRONOUNS),
            family_words: word_set(FAMILY_WORDS),
            gendered_nouns,
            animate_words,
        }
    }
}

impl Dictionaries {
    pub fn is_report_verb(&self, lemma: &str) -> bool {
        self.report_verbs.contains(&lemma.to_lowercase())
    }

    pub fn is_first_person(&self, word: &str) -> bool {
        self.first_person_pronouns.contains(&word.to_lowercase())
    }

    /// "I", "me" and friends, excluding "we"
    pub fn is_first_person_singular(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.first_person_pronouns.contains(&word) && SINGULAR_FIRST_PERSON.contains(&word.as_str())
    }

    pub fn is_pronoun(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        let word = word.as_str();
        self.first_person_pronouns.contains(word)
            || PLURAL_PRONOUNS.contains(&word)
            || SECOND_PERSON_PRONOUNS.contains(&word)
            || MALE_PRONOUNS.contains(&word)
            || FEMALE_PRONOUNS.contains(&word)
            || NEUTRAL_PRONOUNS.contains(&word)
    }

    /// Third-person personal pronouns that can refer to a character
    pub fn is_character_pronoun(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        MALE_PRONOUNS.contains(&word.as_str()) || FEMALE_PRONOUNS.contains(&word.as_str())
    }

    pub fn is_family_word(&self, word: &str) -> bool {
        self.family_words.contains(&word.to_lowercase())
    }

    pub fn gender_of(&self, word: &str) -> Gender {
        let word = word.to_lowercase();
        if MALE_PRONOUNS.contains(&word.as_str()) {
            return Gender::Male;
        }
        if FEMALE_PRONOUNS.contains(&word.as_str()) {
            return Gender::Female;
        }
        if NEUTRAL_PRONOUNS.contains(&word.as_str()) {
            return Gender::Neutral;
        }
        self.gendered_nouns
            .get(&word)
            .copied()
            .unwrap_or(Gender::Unknown)
    }

    pub fn number_of(&self, word: &str, pos: &str) -> Number {
        let lower = word.to_lowercase();
        if PLURAL_PRONOUNS.contains(&lower.as_str()) || pos == "NNS" || pos == "NNPS" {
            Number::Plural
        } else if pos.starts_with("NN") || self.is_pronoun(word) {
            Number::Singular
        } else {
            Number::Unknown
        }
    }

    pub fn animacy_of(&self, word: &str, ner: &str) -> Animacy {
        let lower = word.to_lowercase();
        if ner.starts_with("PER")
            || self.animate_words.contains(&lower)
            || self.is_first_person(&lower)
            || self.is_character_pronoun(&lower)
        {
            Animacy::Animate
        } else if NEUTRAL_PRONOUNS.contains(&lower.as_str()) || (ner != "O" && !ner.is_empty()) {
            Animacy::Inanimate
        } else {
            Animacy::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lists() {
        let dict = Dictionaries::default();
        assert!(dict.is_report_verb("say"));
        assert!(dict.is_report_verb("Whisper"));
        assert!(!dict.is_report_verb("eat"));
        assert!(dict.is_first_person_singular("I"));
        assert!(!dict.is_first_person_singular("we"));
        assert!(dict.is_first_person("we"));
        assert!(dict.is_family_word("Mother"));
    }

    #[test]
    fn test_gender_number_animacy() {
        let dict = Dictionaries::default();
        assert_eq!(dict.gender_of("she"), Gender::Female);
        assert_eq!(dict.gender_of("King"), Gender::Male);
        assert_eq!(dict.gender_of("table"), Gender::Unknown);
        assert_eq!(dict.number_of("they", "PRP"), Number::Plural);
        assert_eq!(dict.number_of("I", "PRP"), Number::Singular);
        assert_eq!(dict.number_of("dogs", "NNS"), Number::Plural);
        assert_eq!(dict.animacy_of("Joe", "PERSON"), Animacy::Animate);
        assert_eq!(dict.animacy_of("tailor", "O"), Animacy::Animate);
        assert_eq!(dict.animacy_of("it", "O"), Animacy::Inanimate);
    }
}
