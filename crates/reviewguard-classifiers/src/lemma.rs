//! Rule-based lemmatizer
//!
//! Reduces inflected nouns (and `-ied` verb forms) to a canonical lemma using
//! an irregular-forms dictionary followed by suffix rules. Like a dictionary
//! lemmatizer in its default noun mode, it leaves anything it does not
//! recognize untouched.

use std::collections::{HashMap, HashSet};

const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "person"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("knives", "knife"),
    ("lives", "life"),
    ("wives", "wife"),
    ("leaves", "leaf"),
    ("shelves", "shelf"),
    ("halves", "half"),
    ("wolves", "wolf"),
    ("data", "datum"),
    ("criteria", "criterion"),
    // -ie nouns the `ies` rule would turn into -y
    ("movies", "movie"),
    ("cookies", "cookie"),
    ("calories", "calorie"),
    ("hoodies", "hoodie"),
    ("selfies", "selfie"),
    ("smoothies", "smoothie"),
    ("veggies", "veggie"),
    ("freebies", "freebie"),
    ("rookies", "rookie"),
    ("brownies", "brownie"),
    ("zombies", "zombie"),
    ("ties", "tie"),
    ("pies", "pie"),
    ("lies", "lie"),
    ("dies", "die"),
    // -oes forms
    ("goes", "go"),
    ("does", "do"),
    ("heroes", "hero"),
    ("echoes", "echo"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
];

/// Words ending in `s` that are already lemmas
const INVARIANT: &[&str] = &[
    "always", "perhaps", "series", "species", "news", "lens", "yes", "whereas", "across",
    "less", "unless", "plus", "bus", "gas", "kudos", "thanks", "headphones", "pants",
    "scissors", "glasses", "jeans", "earbuds", "sometimes", "various", "previous", "serious",
    "obvious", "famous", "gorgeous", "nervous", "delicious", "ridiculous", "generous",
];

pub struct Lemmatizer {
    irregular: HashMap<&'static str, &'static str>,
    invariant: HashSet<&'static str>,
}

impl Lemmatizer {
    pub fn new() -> Self {
        Self {
            irregular: IRREGULAR.iter().copied().collect(),
            invariant: INVARIANT.iter().copied().collect(),
        }
    }

    /// Lemmatize a single lower-case word
    pub fn lemmatize(&self, word: &str) -> String {
        if let Some(lemma) = self.irregular.get(word) {
            return (*lemma).to_string();
        }

        if word.len() <= 3
            || self.invariant.contains(word)
            || !word.chars().all(|c| c.is_ascii_alphabetic())
        {
            return word.to_string();
        }

        if let Some(stem) = word.strip_suffix("ies").or_else(|| word.strip_suffix("ied")) {
            if stem.len() >= 2 {
                return format!("{stem}y");
            }
            return word.to_string();
        }

        for suffix in ["sses", "xes", "ches", "shes", "zzes"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }

        if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
            return word.to_string();
        }

        match word.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => word.to_string(),
        }
    }
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}
