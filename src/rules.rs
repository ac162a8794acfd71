use crate::models::{Dictionaries, Document, Mention, MentionType, Number, SpeakerInfo};

pub fn is_opening_quote(word: &str) -> bool {
    matches!(word, "``" | "\u{201C}" | "\u{2018}\u{2018}")
}

pub fn is_closing_quote(word: &str) -> bool {
    matches!(word, "''" | "\u{201D}" | "\u{2019}\u{2019}")
}

/// A neutral glyph opens or closes depending on the current state
pub fn is_neutral_quote(word: &str) -> bool {
    word == "\""
}

pub fn is_quote_glyph(word: &str) -> bool {
    is_opening_quote(word) || is_closing_quote(word) || is_neutral_quote(word)
}

fn acronym_of(short: &[&str], long: &[&str]) -> bool {
    if short.len() != 1 || long.len() < 2 {
        return false;
    }
    let letters: String = short[0].chars().filter(|c| *c != '.').collect();
    if letters.chars().count() < 2 || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    let initials: String = long
        .iter()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_uppercase())
        .collect();
    initials == letters
}

/// One side is a single all-capitals token spelling the initials of the other side
pub fn is_acronym(a: &[&str], b: &[&str]) -> bool {
    acronym_of(a, b) || acronym_of(b, a)
}

fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether a mention names the given speaker.
///
/// Strict matching compares the whole span with the speaker name, ignoring
/// whitespace and case. Loose matching accepts a proper-noun mention sharing any
/// word with the name.
pub fn mention_matches_speaker(mention: &Mention, speaker: &SpeakerInfo, strict: bool) -> bool {
    if strict {
        let name = without_whitespace(&speaker.speaker_name);
        return !name.is_empty() && name.eq_ignore_ascii_case(&without_whitespace(&mention.span_text));
    }
    if mention.mention_type != MentionType::Proper {
        return false;
    }
    mention.span_text.split_whitespace().any(|word| {
        speaker
            .speaker_name_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(word))
    })
}

/// `m` is the reported speaker of the first-person pronoun `ant` in the same sentence:
/// exactly one quotation glyph separates their heads and `m` is the subject of a
/// reporting verb.
pub fn is_speaker(doc: &Document, m: &Mention, ant: &Mention, dict: &Dictionaries) -> bool {
    if !dict.is_first_person(&ant.span_text)
        || ant.number == Number::Plural
        || ant.sent_num != m.sent_num
    {
        return false;
    }
    let Some(sentence) = doc.sentences.get(m.sent_num) else {
        return false;
    };

    let low = m.head_index.min(ant.head_index);
    let high = m.head_index.max(ant.head_index);
    let quote_marks = sentence
        .tokens
        .iter()
        .take(high)
        .skip(low + 1)
        .filter(|t| is_quote_glyph(&t.word))
        .count();
    if quote_marks != 1 {
        return false;
    }

    let Some(dependencies) = sentence.dependencies() else {
        return false;
    };
    dependencies.parents(m.head_index).any(|(governor, relation)| {
        relation == "nsubj"
            && sentence
                .tokens
                .get(governor)
                .is_some_and(|t| dict.is_report_verb(&t.lemma))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyEdge, DependencyGraph, Sentence, Token};

    #[test]
    fn test_acronyms() {
        assert!(is_acronym(&["IBM"], &["International", "Business", "Machines"]));
        assert!(is_acronym(&["Federal", "Bureau", "Investigation"], &["F.B.I."]));
        assert!(!is_acronym(&["Ibm"], &["International", "Business", "Machines"]));
        assert!(!is_acronym(&["IBM"], &["IBM"]));
        assert!(!is_acronym(&["US"], &["United", "Kingdom"]));
    }

    fn proper(text: &str) -> Mention {
        let mut mention = Mention::new(0, 0, 1, 0);
        mention.span_text = text.to_string();
        mention.mention_type = MentionType::Proper;
        mention
    }

    #[test]
    fn test_speaker_matching() {
        let info = SpeakerInfo::new("Larry King, CNN");
        assert!(mention_matches_speaker(&proper("larry king"), &info, true));
        assert!(mention_matches_speaker(&proper("LarryKing"), &info, true));
        assert!(!mention_matches_speaker(&proper("King"), &info, true));
        assert!(mention_matches_speaker(&proper("King"), &info, false));

        let mut nominal = proper("king");
        nominal.mention_type = MentionType::Nominal;
        assert!(!mention_matches_speaker(&nominal, &info, false));
    }

    #[test]
    fn test_is_speaker() {
        let words = [
            ("Joe", "NNP", "joe"),
            ("said", "VBD", "say"),
            (",", ",", ","),
            ("``", "``", "``"),
            ("I", "PRP", "i"),
            ("am", "VBP", "be"),
            ("happy", "JJ", "happy"),
        ];
        let tokens = words
            .iter()
            .map(|(w, p, l)| {
                let mut t = Token::new(w, p);
                t.lemma = l.to_string();
                t
            })
            .collect();
        let mut sentence = Sentence::new(tokens);
        sentence.basic_dependencies = Some(DependencyGraph::new(vec![
            DependencyEdge::new(None, 1, "root"),
            DependencyEdge::new(Some(1), 0, "nsubj"),
            DependencyEdge::new(Some(1), 6, "ccomp"),
            DependencyEdge::new(Some(6), 4, "nsubj"),
        ]));
        let doc = Document::new("t", vec![sentence]);
        let dict = Dictionaries::default();

        let joe = proper("Joe");
        let mut i = Mention::new(0, 4, 5, 4);
        i.span_text = "I".to_string();
        i.mention_type = MentionType::Pronominal;

        assert!(is_speaker(&doc, &joe, &i, &dict));
        assert!(!is_speaker(&doc, &i, &joe, &dict));

        let mut we = i.clone();
        we.span_text = "we".to_string();
        we.number = Number::Plural;
        assert!(!is_speaker(&doc, &joe, &we, &dict));
    }
}
