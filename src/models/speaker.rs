use std::collections::BTreeSet;

use serde::Serialize;

use super::mention::{Gender, MentionId};

/// Metadata for one speaker identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerInfo {
    /// Identifier as used in the speaker maps
    pub speaker_id: String,
    /// Name part of the identifier, before any comma ("Larry King, CNN")
    pub speaker_name: String,
    pub speaker_name_tokens: Vec<String>,
    /// Text after the comma, if any
    pub speaker_desc: Option<String>,
    pub mentions: BTreeSet<MentionId>,
    pub gender: Gender,
}

impl SpeakerInfo {
    pub fn new(speaker: &str) -> Self {
        let (name, desc) = match speaker.split_once(',') {
            Some((name, desc)) => (name.trim(), Some(desc.trim().to_string())),
            None => (speaker.trim(), None),
        };
        let speaker_name_tokens = name
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            speaker_id: speaker.to_string(),
            speaker_name: name.to_string(),
            speaker_name_tokens,
            speaker_desc: desc,
            mentions: BTreeSet::new(),
            gender: Gender::Unknown,
        }
    }

    /// A real name rather than a mention id or a generated placeholder
    pub fn has_real_speaker_name(&self) -> bool {
        !self.speaker_name.is_empty()
            && !is_decimal_id(&self.speaker_name)
            && !is_placeholder_speaker(&self.speaker_name)
    }

    pub fn add_mention(&mut self, mention: MentionId) {
        self.mentions.insert(mention);
    }
}

/// Speaker identifiers made only of ASCII digits encode a mention id
pub fn is_decimal_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `PER<n>` labels are synthesized for utterances with no known speaker
pub fn is_placeholder_speaker(value: &str) -> bool {
    value.strip_prefix("PER").is_some_and(is_decimal_id)
}

pub fn placeholder_speaker(utterance: usize) -> String {
    format!("PER{}", utterance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_description() {
        let info = SpeakerInfo::new("Larry King, CNN");
        assert_eq!(info.speaker_name, "Larry King");
        assert_eq!(info.speaker_desc.as_deref(), Some("CNN"));
        assert_eq!(info.speaker_name_tokens, vec!["Larry", "King"]);
        assert!(info.has_real_speaker_name());
    }

    #[test]
    fn test_ids_and_placeholders_are_not_names() {
        assert!(!SpeakerInfo::new("12").has_real_speaker_name());
        assert!(!SpeakerInfo::new("PER3").has_real_speaker_name());
        assert!(SpeakerInfo::new("Perry").has_real_speaker_name());
        assert!(SpeakerInfo::new("PERSON").has_real_speaker_name());
        assert_eq!(placeholder_speaker(4), "PER4");
        assert!(is_placeholder_speaker("PER0"));
        assert!(!is_placeholder_speaker("PER"));
    }
}
