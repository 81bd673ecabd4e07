//! Case-insensitive token index for TEXT fields
//!
//! Postings record, per document, the value element and token offset of
//! every occurrence so phrases can be matched in order within one element.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use super::field::{DocId, DocSet};

/// Splits text into lowercase word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| Regex::new(r"[\p{L}\p{N}_]+").expect("token pattern is valid"));
    re.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Position of one token occurrence: (element index, token offset)
type Position = (u32, u32);

/// Inverted index from token to documents and positions
#[derive(Debug, Default)]
pub struct TextIndex {
    terms: BTreeMap<String, HashMap<DocId, Vec<Position>>>,
}

impl TextIndex {
    /// Creates an empty text index
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every element of `values` for a document
    pub fn insert(&mut self, id: DocId, values: &[String]) {
        for (element, value) in values.iter().enumerate() {
            for (offset, token) in tokenize(value).into_iter().enumerate() {
                self.terms
                    .entry(token)
                    .or_default()
                    .entry(id)
                    .or_default()
                    .push((element as u32, offset as u32));
            }
        }
    }

    /// Removes every posting of a document for the given source values
    pub fn remove(&mut self, id: DocId, values: &[String]) {
        for value in values {
            for token in tokenize(value) {
                if let Some(postings) = self.terms.get_mut(&token) {
                    postings.remove(&id);
                    if postings.is_empty() {
                        self.terms.remove(&token);
                    }
                }
            }
        }
    }

    /// Documents containing the exact token
    pub fn term(&self, word: &str) -> DocSet {
        self.terms
            .get(&word.to_lowercase())
            .map(|postings| postings.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Documents containing a token that starts with `prefix`
    pub fn prefix(&self, prefix: &str) -> DocSet {
        let prefix = prefix.to_lowercase();
        let mut result = DocSet::new();
        for (_, postings) in self
            .terms
            .range(prefix.clone()..)
            .take_while(|(token, _)| token.starts_with(&prefix))
        {
            result.extend(postings.keys().copied());
        }
        result
    }

    /// Documents containing a token that contains `fragment`
    pub fn contains(&self, fragment: &str) -> DocSet {
        let fragment = fragment.to_lowercase();
        let mut result = DocSet::new();
        for (_, postings) in self.terms.iter().filter(|(token, _)| token.contains(&fragment)) {
            result.extend(postings.keys().copied());
        }
        result
    }

    /// Documents where all `words` occur in order within one element.
    ///
    /// Words need not be adjacent.
    pub fn phrase(&self, words: &[String]) -> DocSet {
        let tokens: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        if tokens.is_empty() {
            return DocSet::new();
        }

        let mut postings = Vec::with_capacity(tokens.len());
        for token in &tokens {
            match self.terms.get(token) {
                Some(p) => postings.push(p),
                None => return DocSet::new(),
            }
        }

        let mut result = DocSet::new();

        'doc: for (&id, first_positions) in postings[0] {
            let mut lists = Vec::with_capacity(postings.len());
            for p in &postings {
                match p.get(&id) {
                    Some(positions) => lists.push(positions),
                    None => continue 'doc,
                }
            }

            let elements = first_positions.iter().map(|&(element, _)| element);
            for element in elements {
                if Self::ordered_in_element(&lists, element) {
                    result.insert(id);
                    continue 'doc;
                }
            }
        }

        result
    }

    /// Greedy subsequence check of the token lists inside one element
    fn ordered_in_element(lists: &[&Vec<Position>], element: u32) -> bool {
        let mut last: Option<u32> = None;
        for positions in lists {
            let next = positions
                .iter()
                .filter(|&&(e, offset)| e == element && last.map_or(true, |l| offset > l))
                .map(|&(_, offset)| offset)
                .min();
            match next {
                Some(offset) => last = Some(offset),
                None => return false,
            }
        }
        true
    }

    /// Returns the number of distinct tokens
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}
