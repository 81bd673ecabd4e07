//! Query string parser
//!
//! ```text
//! query     := union
//! union     := intersect ('|' intersect)*
//! intersect := unary+
//! unary     := '-' unary | '*' | '(' union ')' | field | text
//! field     := '@' name ':' ( '{' tag ('|' tag)* '}'
//!                           | '[' bound (','|' ') bound ']'
//!                           | '(' text ('|' text)* ')'
//!                           | text ('|' text)* )
//! bound     := '('? number | ('+'|'-')? 'inf'
//! text      := '"' words '"' | '%' word '%' | word '*' | word
//! ```
//!
//! A `|` directly after an unparenthesised field term continues that
//! field's alternatives; with surrounding whitespace it separates groups.

use crate::index::{tokenize, NumericBound};

use super::ast::{Matcher, Predicate, TextMatch};
use super::errors::{QueryError, QueryResult};

/// Deepest accepted nesting of groups and negations
const MAX_DEPTH: usize = 128;

/// Parses a query string into a predicate tree
pub fn parse_query(input: &str) -> QueryResult<Predicate> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };

    parser.skip_ws();
    if parser.at_end() {
        return Err(QueryError::syntax(0, "empty query"));
    }

    let predicate = parser.parse_union()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(predicate),
        Some(')') => Err(parser.error("unbalanced ')'")),
        Some(c) => Err(parser.error(format!("unexpected '{}'", c))),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn collapse(mut items: Vec<Predicate>, make: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if items.len() == 1 {
        items.remove(0)
    } else {
        make(items)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> QueryResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(match self.peek() {
                Some(found) => format!("expected '{}', found '{}'", c, found),
                None => format!("expected '{}' before end of query", c),
            }))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::syntax(self.pos, message)
    }

    fn parse_union(&mut self) -> QueryResult<Predicate> {
        let mut branches = vec![self.parse_intersection()?];
        loop {
            self.skip_ws();
            if !self.eat('|') {
                break;
            }
            branches.push(self.parse_intersection()?);
        }
        Ok(collapse(branches, Predicate::Or))
    }

    fn parse_intersection(&mut self) -> QueryResult<Predicate> {
        let mut terms = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(')') | Some('|') => break,
                _ => terms.push(self.parse_unary()?),
            }
        }
        if terms.is_empty() {
            return Err(self.error("expected a query term"));
        }
        Ok(collapse(terms, Predicate::And))
    }

    fn parse_unary(&mut self) -> QueryResult<Predicate> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("query nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_term();
        self.depth -= 1;
        result
    }

    fn parse_term(&mut self) -> QueryResult<Predicate> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Predicate::Not(Box::new(self.parse_unary()?)))
            }
            Some('*') => {
                self.pos += 1;
                Ok(Predicate::All)
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_union()?;
                self.skip_ws();
                self.expect(')')?;
                Ok(inner)
            }
            Some('@') => self.parse_field(),
            _ => Ok(Predicate::AnyText(self.parse_text()?)),
        }
    }

    fn parse_field(&mut self) -> QueryResult<Predicate> {
        self.expect('@')?;
        let alias = self.read_while(is_word_char);
        if alias.is_empty() {
            return Err(self.error("expected field name after '@'"));
        }
        self.skip_ws();
        self.expect(':')?;
        self.skip_ws();

        let matcher = match self.peek() {
            Some('{') => Matcher::Tags(self.parse_tags()?),
            Some('[') => self.parse_range()?,
            Some('(') => {
                self.pos += 1;
                let alternatives = self.parse_alternatives(true)?;
                self.skip_ws();
                self.expect(')')?;
                Matcher::Text(alternatives)
            }
            _ => Matcher::Text(self.parse_alternatives(false)?),
        };

        Ok(Predicate::Field { alias, matcher })
    }

    /// `{a|b c|d}`. Values are trimmed; `\` escapes the next character.
    fn parse_tags(&mut self) -> QueryResult<Vec<String>> {
        self.expect('{')?;
        let mut tags = Vec::new();
        let mut current = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated tag list")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => current.push(c),
                        None => return Err(self.error("dangling escape in tag list")),
                    }
                }
                Some(c @ ('|' | '}')) => {
                    let tag = current.trim();
                    if tag.is_empty() {
                        return Err(self.error("empty tag value"));
                    }
                    tags.push(tag.to_string());
                    current.clear();
                    if c == '}' {
                        self.pos += 1;
                        return Ok(tags);
                    }
                }
                Some(c) => current.push(c),
            }
            self.pos += 1;
        }
    }

    /// `[min max]` or `[min,max]`; `(` marks an exclusive bound
    fn parse_range(&mut self) -> QueryResult<Matcher> {
        self.expect('[')?;
        self.skip_ws();
        let min = self.parse_bound()?;

        self.skip_ws();
        self.eat(',');
        self.skip_ws();

        let max = self.parse_bound()?;
        self.skip_ws();
        self.expect(']')?;
        Ok(Matcher::Range { min, max })
    }

    fn parse_bound(&mut self) -> QueryResult<NumericBound> {
        let exclusive = self.eat('(');
        let start = self.pos;
        let text = self.read_while(|c| !c.is_whitespace() && c != ',' && c != ']');
        let value = text
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| QueryError::syntax(start, format!("invalid numeric bound '{}'", text)))?;

        Ok(if exclusive {
            NumericBound::exclusive(value)
        } else {
            NumericBound::inclusive(value)
        })
    }

    fn parse_alternatives(&mut self, grouped: bool) -> QueryResult<Vec<TextMatch>> {
        let mut alternatives = vec![self.parse_text()?];
        loop {
            if grouped {
                self.skip_ws();
            }
            if !self.eat('|') {
                break;
            }
            if grouped {
                self.skip_ws();
            }
            alternatives.push(self.parse_text()?);
        }
        Ok(alternatives)
    }

    fn parse_text(&mut self) -> QueryResult<TextMatch> {
        match self.peek() {
            Some('"') => {
                self.pos += 1;
                let start = self.pos;
                let content = self.read_while(|c| c != '"');
                if !self.eat('"') {
                    return Err(QueryError::syntax(start - 1, "unterminated phrase"));
                }
                let words = tokenize(&content);
                if words.is_empty() {
                    return Err(QueryError::syntax(start - 1, "empty phrase"));
                }
                Ok(TextMatch::Phrase(words))
            }
            Some('%') => {
                let depth = self.read_while(|c| c == '%').len();
                let word = self.read_while(is_word_char);
                if word.is_empty() {
                    return Err(self.error("expected a word after '%'"));
                }
                for _ in 0..depth {
                    self.expect('%')?;
                }
                Ok(TextMatch::Contains(word.to_lowercase()))
            }
            Some(c) if is_word_char(c) => {
                let word = self.read_while(is_word_char).to_lowercase();
                if self.eat('*') {
                    Ok(TextMatch::Prefix(word))
                } else {
                    Ok(TextMatch::Term(word))
                }
            }
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("unexpected end of query")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(alias: &str, matcher: Matcher) -> Predicate {
        Predicate::Field {
            alias: alias.into(),
            matcher,
        }
    }

    fn tags(values: &[&str]) -> Matcher {
        Matcher::Tags(values.iter().map(|v| v.to_string()).collect())
    }

    fn term(word: &str) -> TextMatch {
        TextMatch::Term(word.into())
    }

    #[test]
    fn test_grouped_tags() {
        assert_eq!(
            parse_query("(@status:{active} @state:{AK})").unwrap(),
            Predicate::And(vec![
                field("status", tags(&["active"])),
                field("state", tags(&["AK"])),
            ])
        );
    }

    #[test]
    fn test_tag_alternatives_and_escapes() {
        assert_eq!(
            parse_query("@city:{ New York | Anchorage\\|AK }").unwrap(),
            field("city", tags(&["New York", "Anchorage|AK"]))
        );
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(
            parse_query("@specialty:\"General Practice\" @location:hospital").unwrap(),
            Predicate::And(vec![
                field(
                    "specialty",
                    Matcher::Text(vec![TextMatch::Phrase(vec!["general".into(), "practice".into()])])
                ),
                field("location", Matcher::Text(vec![term("hospital")])),
            ])
        );
        assert_eq!(
            parse_query("@reason:%bronchitis%").unwrap(),
            field("reason", Matcher::Text(vec![TextMatch::Contains("bronchitis".into())]))
        );
        assert_eq!(
            parse_query("@date:2015*").unwrap(),
            field("date", Matcher::Text(vec![TextMatch::Prefix("2015".into())]))
        );
    }

    #[test]
    fn test_field_alternation() {
        let expected = field("drug", Matcher::Text(vec![term("hydrocodone"), term("oxycodone")]));
        assert_eq!(parse_query("@drug:Hydrocodone|Oxycodone").unwrap(), expected);
        assert_eq!(
            parse_query("@problem:(rhinitis | asthma)").unwrap(),
            field("problem", Matcher::Text(vec![term("rhinitis"), term("asthma")]))
        );
    }

    #[test]
    fn test_spaced_pipe_separates_groups() {
        assert_eq!(
            parse_query("@a:x | @b:y").unwrap(),
            Predicate::Or(vec![
                field("a", Matcher::Text(vec![term("x")])),
                field("b", Matcher::Text(vec![term("y")])),
            ])
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(
            parse_query("@value:[1000,+inf]").unwrap(),
            field(
                "value",
                Matcher::Range {
                    min: NumericBound::inclusive(1000.0),
                    max: NumericBound::inclusive(f64::INFINITY),
                }
            )
        );
        assert_eq!(
            parse_query("@value:[-inf (0]").unwrap(),
            field(
                "value",
                Matcher::Range {
                    min: NumericBound::inclusive(f64::NEG_INFINITY),
                    max: NumericBound::exclusive(0.0),
                }
            )
        );
    }

    #[test]
    fn test_all_negation_and_bare_terms() {
        assert_eq!(parse_query(" * ").unwrap(), Predicate::All);
        assert_eq!(
            parse_query("-@status:{inactive} aetna").unwrap(),
            Predicate::And(vec![
                Predicate::Not(Box::new(field("status", tags(&["inactive"])))),
                Predicate::AnyText(term("aetna")),
            ])
        );
    }

    #[test]
    fn test_syntax_errors() {
        for bad in [
            "",
            "(@status:{active}",
            "@status:{active})",
            "@status:{active",
            "@status:{}",
            "@:x",
            "@value:[1000]",
            "@value:[abc,5]",
            "@x:\"open",
            "@x:%%word%",
            "@x:?",
        ] {
            assert!(
                matches!(parse_query(bad), Err(QueryError::Syntax { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = format!("{}@status:{{active}}{}", "(".repeat(64), ")".repeat(64));
        assert_eq!(parse_query(&nested).unwrap(), field("status", tags(&["active"])));

        let deep = format!("{}*{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse_query(&deep), Err(QueryError::Syntax { .. })));
        let negations = format!("{}*", "-".repeat(100_000));
        assert!(matches!(parse_query(&negations), Err(QueryError::Syntax { .. })));
    }
}
