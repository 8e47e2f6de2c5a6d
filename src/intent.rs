//! Rule-based intent classifier.
//!
//! Runs before the answer generator to short-circuit the cases with fixed
//! replies or structured sub-dialogues. Deliberately phrase-based, not
//! statistical: the myth corrections in particular must fire
//! deterministically regardless of what the generator would say.
//!
//! Precedence, first match wins:
//! 1. Greeting (exact short-form match)
//! 2. Farewell (exact short-form match)
//! 3. Myth trigger (substring against a fixed phrase table)
//! 4. Weight question / weight-loss intent / weight-gain intent
//! 5. Unclassified (defer to the answer generator)

/// Classification of a single utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Farewell,
    /// A diet-myth phrase matched; carries the canonical correction reply.
    MythTrigger(&'static str),
    WeightLossIntent,
    WeightGainIntent,
    /// Weight-related but framed as a question — route to open-ended advice.
    WeightQuestion,
    Unclassified,
}

/// Exact short-form greetings. Exact match, not substring, so longer
/// sentences that merely contain "hi" don't false-positive.
const GREETINGS: &[&str] = &["hello", "hi", "hey"];

const FAREWELLS: &[&str] = &["bye", "goodbye", "quit"];

/// One myth phrase and its canonical correction.
struct MythRule {
    phrase: &'static str,
    correction: &'static str,
}

/// Ordered myth table. Matched as case-insensitive substrings; the first
/// hit wins.
static MYTH_RULES: &[MythRule] = &[
    MythRule {
        phrase: "starve myself",
        correction: "Starving yourself slows your metabolism and causes muscle loss. \
                     A moderate calorie deficit with regular meals is the sustainable way \
                     to lose weight.",
    },
    MythRule {
        phrase: "detox juice cleanse",
        correction: "Juice cleanses don't detox anything — your liver and kidneys already \
                     do that. They mostly cause water loss and leave you short on protein \
                     and fiber.",
    },
    MythRule {
        phrase: "all carbs should be avoided",
        correction: "Carbs aren't the enemy. Whole grains, fruit and vegetables are \
                     carbohydrate sources your body needs; it's refined sugar in excess \
                     that's worth limiting.",
    },
    MythRule {
        phrase: "drinking coffee dehydrates",
        correction: "Moderate coffee intake counts toward your daily fluids. The mild \
                     diuretic effect doesn't outweigh the water in the cup.",
    },
    MythRule {
        phrase: "skipping meals helps",
        correction: "Skipping meals usually backfires — it drives overeating later in the \
                     day. Consistent, balanced meals keep hunger predictable.",
    },
];

const LOSS_PHRASES: &[&str] = &["lose weight", "weight loss", "slim down", "get thinner"];

const GAIN_PHRASES: &[&str] = &[
    "gain weight",
    "weight gain",
    "bulk up",
    "get bigger",
    "put on weight",
];

/// Interrogative lead words, checked as whole tokens ("can" must not match
/// inside "candy").
const QUESTION_WORDS: &[&str] = &[
    "should", "could", "would", "what", "how", "when", "where", "why", "can", "which",
];

/// First-person intent phrases, checked as substrings.
const INTENT_PHRASES: &[&str] = &[
    "i want to",
    "i need to",
    "i would like to",
    "i'm trying to",
    "help me",
    "i want",
    "i need",
    "i'd like to",
];

/// Whole-token membership test: "can" must not match inside "candy",
/// "no" must not match inside "know".
pub(crate) fn has_token(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|tok| tok == word)
}

/// Classify a raw utterance. Pure; safe to share across users.
pub fn classify(utterance: &str) -> Intent {
    let lower = utterance.trim().to_lowercase();

    if GREETINGS.contains(&lower.as_str()) {
        return Intent::Greeting;
    }
    if FAREWELLS.contains(&lower.as_str()) {
        return Intent::Farewell;
    }
    for rule in MYTH_RULES {
        if lower.contains(rule.phrase) {
            return Intent::MythTrigger(rule.correction);
        }
    }

    let has_loss = LOSS_PHRASES.iter().any(|p| lower.contains(p));
    let has_gain = GAIN_PHRASES.iter().any(|p| lower.contains(p));
    let is_question = QUESTION_WORDS.iter().any(|w| has_token(&lower, w));
    let has_intent = INTENT_PHRASES.iter().any(|p| lower.contains(p));

    // "what should I eat to lose weight" asks for advice; "I want to lose
    // weight" declares a goal. Same keywords, disambiguated by framing.
    if is_question && (has_loss || has_gain) {
        return Intent::WeightQuestion;
    }
    if (has_intent || !is_question) && has_loss {
        return Intent::WeightLossIntent;
    }
    if (has_intent || !is_question) && has_gain {
        return Intent::WeightGainIntent;
    }

    Intent::Unclassified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_exact_only() {
        assert_eq!(classify("hello"), Intent::Greeting);
        assert_eq!(classify("  Hi "), Intent::Greeting);
        // Substrings of longer sentences must not match
        assert_eq!(classify("hi there, what should I eat"), Intent::Unclassified);
    }

    #[test]
    fn farewell_resets() {
        assert_eq!(classify("bye"), Intent::Farewell);
        assert_eq!(classify("QUIT"), Intent::Farewell);
    }

    #[test]
    fn myth_beats_question_framing() {
        // Contains "should" but the myth table has precedence
        let intent = classify("I think I should try a detox juice cleanse");
        assert!(matches!(intent, Intent::MythTrigger(_)));
    }

    #[test]
    fn myth_case_insensitive() {
        assert!(matches!(
            classify("Is it ok to STARVE MYSELF for a week?"),
            Intent::MythTrigger(_)
        ));
    }

    #[test]
    fn declared_loss_intent() {
        assert_eq!(classify("I want to lose weight"), Intent::WeightLossIntent);
        assert_eq!(classify("help me slim down"), Intent::WeightLossIntent);
        assert_eq!(classify("time to get thinner"), Intent::WeightLossIntent);
    }

    #[test]
    fn declared_gain_intent() {
        assert_eq!(classify("I need to bulk up"), Intent::WeightGainIntent);
        assert_eq!(classify("i want to put on weight"), Intent::WeightGainIntent);
    }

    #[test]
    fn question_framing_defers_to_generator() {
        assert_eq!(
            classify("what should I eat to lose weight"),
            Intent::WeightQuestion
        );
        assert_eq!(classify("how can I bulk up fast?"), Intent::WeightQuestion);
    }

    #[test]
    fn question_words_are_whole_tokens() {
        // "candy" contains "can" but is not a question
        assert_eq!(
            classify("i want to lose weight but love candy"),
            Intent::WeightLossIntent
        );
    }

    #[test]
    fn token_match_respects_word_boundaries() {
        assert!(has_token("i don't know yet", "don't"));
        assert!(!has_token("i don't know yet", "no"));
        assert!(!has_token("not sure", "no"));
        assert!(has_token("well, no thanks", "no"));
    }

    #[test]
    fn free_text_unclassified() {
        assert_eq!(classify("tell me about protein"), Intent::Unclassified);
        assert_eq!(classify(""), Intent::Unclassified);
    }
}
