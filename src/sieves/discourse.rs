use super::candidates::{CharacterMention, is_punctuation};
use super::SieveInput;
use crate::models::{MentionResolution, Quotation};

/// The direct mention a quote already carries
pub fn resolution_of(quote: &Quotation) -> Option<MentionResolution> {
    let (token_begin, token_end) = quote.mention_span()?;
    Some(MentionResolution {
        text: quote.mention_text()?.to_string(),
        token_begin,
        token_end,
        kind: quote.mention_kind()?,
    })
}

/// Whether three quotes sit in three successive turns.
///
/// Strict turns are consecutive paragraphs; loose turns only need increasing ones.
pub fn alternates(input: &SieveInput<'_>, quotes: [usize; 3], strict: bool) -> bool {
    let ctx = input.ctx;
    let paragraphs: Option<Vec<usize>> = quotes
        .iter()
        .map(|&q| input.doc.quotes.get(q).and_then(|quote| ctx.quote_paragraph(quote)))
        .collect();
    let Some(p) = paragraphs else {
        return false;
    };
    if strict {
        p[1] == p[0] + 1 && p[2] == p[1] + 1
    } else {
        p[0] < p[1] && p[1] < p[2]
    }
}

/// A quote ending its paragraph is spoken by the closest narration mention before
/// it in that paragraph: `Joe turned to her. "Let's go."`
pub fn paragraph_end(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let doc = input.doc;
    let ctx = input.ctx;
    let quote = &doc.quotes[quote];
    let paragraph = ctx.quote_paragraph(quote)?;

    let ends_paragraph = (quote.token_end..doc.token_count())
        .take_while(|&t| ctx.paragraph(t) == Some(paragraph))
        .all(|t| doc.token(t).is_some_and(is_punctuation));
    if !ends_paragraph {
        return None;
    }
    ctx.narration_mentions()
        .filter(|m| m.token_end <= quote.token_begin && ctx.paragraph(m.token_begin) == Some(paragraph))
        .last()
        .map(CharacterMention::resolution)
}

/// In an exchange between two people, a quote has the speaker of the quote two
/// turns before it (or after it).
pub fn conversational(input: &SieveInput<'_>, quote: usize, strict: bool) -> Option<MentionResolution> {
    let quotes = &input.doc.quotes;
    if quote >= 2 && alternates(input, [quote - 2, quote - 1, quote], strict) {
        if let Some(found) = resolution_of(&quotes[quote - 2]) {
            return Some(found);
        }
    }
    if quote + 2 < quotes.len() && alternates(input, [quote, quote + 1, quote + 2], strict) {
        if let Some(found) = resolution_of(&quotes[quote + 2]) {
            return Some(found);
        }
    }
    None
}

/// Nearest narration mention within the candidate window; earlier wins a tie
pub fn closest(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let quote = &input.doc.quotes[quote];
    let window = input.config.candidate_window;
    input
        .ctx
        .narration_mentions()
        .filter_map(|m| {
            let gap = m.distance_to(quote)?;
            (gap <= window).then_some((gap, m))
        })
        .min_by_key(|(gap, m)| (*gap, !m.precedes(quote)))
        .map(|(_, m)| m.resolution())
}
