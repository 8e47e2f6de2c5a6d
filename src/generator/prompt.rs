//! Prompt construction for the answer generator.

use crate::profile::UserProfile;

/// System preamble for every generator call.
pub const NUTRITION_PREAMBLE: &str = "You are a friendly nutrition assistant. \
Answer questions about food, diet and healthy habits in a few short sentences. \
You are not a doctor; suggest professional advice for medical concerns.";

/// Common words stripped before the utterance is handed to the generator.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "i", "is", "are", "am", "to", "of", "and", "or", "my", "me", "do", "does",
    "you", "it", "for", "in", "on", "at", "with", "be", "was", "were", "this", "that", "please",
];

/// Tokenize and stop-word-filter an utterance. Keeps token order.
pub fn normalize_utterance(utterance: &str) -> String {
    utterance
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|tok| !tok.is_empty() && !STOP_WORDS.contains(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the generator prompt: the normalized utterance, plus a profile
/// summary as context when the profile is complete.
pub fn build_prompt(utterance: &str, profile: &UserProfile) -> String {
    let normalized = normalize_utterance(utterance);
    match profile.summary() {
        Some(summary) => format!("User ({summary}) asks: {normalized}"),
        None => format!("User asks: {normalized}"),
    }
}
