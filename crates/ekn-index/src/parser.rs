//! The index query language.
//!
//! ```text
//! or      := and (OR and)*
//! and     := unary ([AND] unary)*
//! unary   := NOT unary | primary
//! primary := "(" or ")" | term
//! term    := PREFIX"value"[*] | field:value[*] | word[*] | "phrase"
//! ```
//!
//! `PREFIX` is a run of upper-case ASCII letters directly followed by a
//! quote; `""` inside quotes is a literal quote. Prefixed values become
//! terms of the `terms` field, everything else is matched against `body`.

use tantivy::query::{AllQuery, BooleanQuery, Occur, PhraseQuery, Query, RegexQuery, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::Term;

use ekn_query::FieldPrefixes;

use crate::error::{IndexError, Result};
use crate::stemmer::LanguageStemmer;
use crate::tantivy_utils::{text_words, IndexFields, STEM_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Leaf {
	Prefixed { prefix: String, value: String, wildcard: bool },
	Field { field: String, value: String, wildcard: bool },
	Word { text: String, wildcard: bool },
	Phrase(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Open,
	Close,
	And,
	Or,
	Not,
	Leaf(Leaf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
	And(Vec<Node>),
	Or(Vec<Node>),
	Not(Box<Node>),
	Leaf(Leaf),
}

fn parse_error(input: &str, reason: impl Into<String>) -> IndexError {
	IndexError::Parse { query: input.to_string(), reason: reason.into() }
}

/// Reads a quoted value starting at the opening quote. Returns the value and
/// the position after the closing quote.
fn quoted(input: &str, chars: &[char], open: usize) -> Result<(String, usize)> {
	let mut value = String::new();
	let mut pos = open + 1;
	loop {
		match chars.get(pos) {
			None => return Err(parse_error(input, "unterminated quote")),
			Some('"') if chars.get(pos + 1) == Some(&'"') => { value.push('"'); pos += 2; }
			Some('"') => return Ok((value, pos + 1)),
			Some(c) => { value.push(*c); pos += 1; }
		}
	}
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
	let chars: Vec<char> = input.chars().collect();
	let mut tokens = Vec::new();
	let mut pos = 0;
	while pos < chars.len() {
		match chars[pos] {
			c if c.is_whitespace() => pos += 1,
			'(' => { tokens.push(Token::Open); pos += 1; }
			')' => { tokens.push(Token::Close); pos += 1; }
			'"' => {
				let (value, next) = quoted(input, &chars, pos)?;
				pos = next;
				// a trailing star on a phrase means nothing
				if chars.get(pos) == Some(&'*') { pos += 1; }
				tokens.push(Token::Leaf(Leaf::Phrase(value)));
			}
			_ => {
				let start = pos;
				while pos < chars.len() && !chars[pos].is_whitespace() && !matches!(chars[pos], '(' | ')' | '"') { pos += 1; }
				let run: String = chars[start..pos].iter().collect();
				let before_quote = chars.get(pos) == Some(&'"');

				if before_quote && run.chars().all(|c| c.is_ascii_uppercase()) {
					let (value, next) = quoted(input, &chars, pos)?;
					pos = next;
					let wildcard = chars.get(pos) == Some(&'*');
					if wildcard { pos += 1; }
					tokens.push(Token::Leaf(Leaf::Prefixed { prefix: run, value, wildcard }));
					continue;
				}
				if before_quote && run.len() > 1 && run.ends_with(':') {
					let (value, next) = quoted(input, &chars, pos)?;
					pos = next;
					let wildcard = chars.get(pos) == Some(&'*');
					if wildcard { pos += 1; }
					let field = run.trim_end_matches(':').to_string();
					tokens.push(Token::Leaf(Leaf::Field { field, value, wildcard }));
					continue;
				}
				tokens.push(classify(run));
			}
		}
	}
	Ok(tokens)
}

fn classify(run: String) -> Token {
	match run.as_str() {
		"AND" => return Token::And,
		"OR" => return Token::Or,
		"NOT" => return Token::Not,
		_ => {}
	}
	let (text, wildcard) = match run.strip_suffix('*') {
		Some(text) => (text, true),
		None => (run.as_str(), false),
	};
	if let Some((field, value)) = text.split_once(':') {
		if !field.is_empty() && !value.is_empty() {
			return Token::Leaf(Leaf::Field { field: field.to_string(), value: value.to_string(), wildcard });
		}
	}
	Token::Leaf(Leaf::Word { text: text.to_string(), wildcard })
}

struct Grammar<'a> {
	input: &'a str,
	tokens: &'a [Token],
	pos: usize,
}

impl<'a> Grammar<'a> {
	fn peek(&self) -> Option<&'a Token> {
		self.tokens.get(self.pos)
	}

	fn next(&mut self) -> Option<&'a Token> {
		let token = self.tokens.get(self.pos);
		self.pos += 1;
		token
	}

	fn or(&mut self) -> Result<Node> {
		let mut nodes = vec![self.and()?];
		while self.peek() == Some(&Token::Or) {
			self.pos += 1;
			nodes.push(self.and()?);
		}
		Ok(if nodes.len() == 1 { nodes.remove(0) } else { Node::Or(nodes) })
	}

	fn and(&mut self) -> Result<Node> {
		let mut nodes = vec![self.unary()?];
		loop {
			match self.peek() {
				Some(Token::And) => { self.pos += 1; nodes.push(self.unary()?); }
				Some(Token::Open | Token::Not | Token::Leaf(_)) => nodes.push(self.unary()?),
				_ => break,
			}
		}
		Ok(if nodes.len() == 1 { nodes.remove(0) } else { Node::And(nodes) })
	}

	fn unary(&mut self) -> Result<Node> {
		if self.peek() == Some(&Token::Not) {
			self.pos += 1;
			return Ok(Node::Not(Box::new(self.unary()?)));
		}
		self.primary()
	}

	fn primary(&mut self) -> Result<Node> {
		match self.next() {
			Some(Token::Open) => {
				let node = self.or()?;
				match self.next() {
					Some(Token::Close) => Ok(node),
					_ => Err(parse_error(self.input, "unbalanced parenthesis")),
				}
			}
			Some(Token::Leaf(leaf)) => Ok(Node::Leaf(leaf.clone())),
			Some(token) => Err(parse_error(self.input, format!("unexpected {token:?}"))),
			None => Err(parse_error(self.input, "unexpected end of query")),
		}
	}
}

fn parse_tree(input: &str) -> Result<Option<Node>> {
	let tokens = tokenize(input)?;
	if tokens.is_empty() {
		return Ok(None);
	}
	let mut grammar = Grammar { input, tokens: &tokens, pos: 0 };
	let node = grammar.or()?;
	if grammar.pos < tokens.len() {
		return Err(parse_error(input, "unbalanced parenthesis"));
	}
	Ok(Some(node))
}

fn combine(mut clauses: Vec<(Occur, Box<dyn Query>)>) -> Option<Box<dyn Query>> {
	match clauses.len() {
		0 => None,
		1 if clauses[0].0 != Occur::MustNot => clauses.pop().map(|(_, query)| query),
		_ => Some(Box::new(BooleanQuery::new(clauses))),
	}
}

/// Turns query strings into tantivy queries for one index layout.
pub struct QueryParser<'a> {
	fields: IndexFields,
	prefixes: &'a FieldPrefixes,
	stemmer: &'a LanguageStemmer,
}

impl<'a> QueryParser<'a> {
	pub fn new(fields: IndexFields, prefixes: &'a FieldPrefixes, stemmer: &'a LanguageStemmer) -> Self {
		Self { fields, prefixes, stemmer }
	}

	/// `Ok(None)` when the string holds nothing to match on.
	pub fn parse(&self, input: &str) -> Result<Option<Box<dyn Query>>> {
		match parse_tree(input)? {
			Some(node) => self.convert(&node),
			None => Ok(None),
		}
	}

	fn convert(&self, node: &Node) -> Result<Option<Box<dyn Query>>> {
		match node {
			Node::Leaf(leaf) => self.leaf(leaf),
			Node::Or(children) => {
				let mut clauses = Vec::new();
				for child in children {
					if let Some(query) = self.convert(child)? { clauses.push((Occur::Should, query)); }
				}
				Ok(combine(clauses))
			}
			Node::And(children) => {
				let mut clauses = Vec::new();
				for child in children {
					let (occur, query) = match child {
						Node::Not(inner) => (Occur::MustNot, self.convert(inner)?),
						other => (Occur::Must, self.convert(other)?),
					};
					if let Some(query) = query { clauses.push((occur, query)); }
				}
				if !clauses.is_empty() && clauses.iter().all(|(occur, _)| *occur == Occur::MustNot) {
					clauses.push((Occur::Must, Box::new(AllQuery) as Box<dyn Query>));
				}
				Ok(combine(clauses))
			}
			Node::Not(inner) => Ok(self.convert(inner)?.map(|query| {
				Box::new(BooleanQuery::new(vec![(Occur::Must, Box::new(AllQuery) as Box<dyn Query>), (Occur::MustNot, query)])) as Box<dyn Query>
			})),
		}
	}

	fn leaf(&self, leaf: &Leaf) -> Result<Option<Box<dyn Query>>> {
		match leaf {
			Leaf::Prefixed { prefix, value, wildcard } => self.prefixed(prefix, value, *wildcard).map(Some),
			Leaf::Field { field, value, wildcard } => match self.prefixes.prefix_for(field) {
				Some(prefix) => self.prefixed(prefix, value, *wildcard).map(Some),
				None => self.words(value, *wildcard),
			},
			Leaf::Word { text, wildcard } => self.words(text, *wildcard),
			Leaf::Phrase(text) => Ok(self.phrase(text)),
		}
	}

	fn prefixed(&self, prefix: &str, value: &str, wildcard: bool) -> Result<Box<dyn Query>> {
		let value = if self.prefixes.is_boolean_prefix(prefix) { value.to_string() } else { value.to_lowercase() };
		let text = format!("{prefix}{value}");
		if wildcard {
			let pattern = format!("{}.*", regex::escape(&text));
			return Ok(Box::new(RegexQuery::from_pattern(&pattern, self.fields.terms)?));
		}
		Ok(Box::new(TermQuery::new(Term::from_field_text(self.fields.terms, &text), IndexRecordOption::Basic)))
	}

	fn words(&self, text: &str, wildcard: bool) -> Result<Option<Box<dyn Query>>> {
		let words: Vec<String> = text_words(text).collect();
		let last = words.len().saturating_sub(1);
		let mut clauses = Vec::new();
		for (i, word) in words.iter().enumerate() {
			let query = if wildcard && i == last {
				let pattern = format!("{}.*", regex::escape(word));
				Box::new(RegexQuery::from_pattern(&pattern, self.fields.body)?) as Box<dyn Query>
			} else {
				self.word(word)
			};
			clauses.push((Occur::Must, query));
		}
		Ok(combine(clauses))
	}

	/// A body word, or any word sharing its stem.
	fn word(&self, word: &str) -> Box<dyn Query> {
		let exact: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(self.fields.body, word), IndexRecordOption::WithFreqs));
		if !self.stemmer.is_stemming() {
			return exact;
		}
		let stem = self.stemmer.stem(word);
		let stemmed = TermQuery::new(Term::from_field_text(self.fields.terms, &format!("{STEM_PREFIX}{stem}")), IndexRecordOption::Basic);
		Box::new(BooleanQuery::new(vec![(Occur::Should, exact), (Occur::Should, Box::new(stemmed) as Box<dyn Query>)]))
	}

	fn phrase(&self, text: &str) -> Option<Box<dyn Query>> {
		let mut words: Vec<String> = text_words(text).collect();
		match words.len() {
			0 => None,
			1 => words.pop().map(|word| self.word(&word)),
			_ => {
				let terms = words.iter().map(|word| Term::from_field_text(self.fields.body, word)).collect();
				Some(Box::new(PhraseQuery::new(terms)))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn prefixed(prefix: &str, value: &str, wildcard: bool) -> Node {
		Node::Leaf(Leaf::Prefixed { prefix: prefix.into(), value: value.into(), wildcard })
	}

	#[test]
	fn builder_output_parses() {
		let tree = parse_tree(r#"(XEXACTS"dragon_ba" OR XEXACTS"dragon_ba"*) OR (S"dragon" (S"ba" OR S"ba"*))"#).expect("parses").expect("non-empty");
		assert_eq!(
			tree,
			Node::Or(vec![
				Node::Or(vec![prefixed("XEXACTS", "dragon_ba", false), prefixed("XEXACTS", "dragon_ba", true)]),
				Node::And(vec![
					prefixed("S", "dragon", false),
					Node::Or(vec![prefixed("S", "ba", false), prefixed("S", "ba", true)]),
				]),
			])
		);
	}

	#[test]
	fn doubled_quotes_are_literal() {
		assert_eq!(parse_tree(r#"K"say ""hi""""#).expect("parses"), Some(prefixed("K", r#"say "hi""#, false)));
	}

	#[test]
	fn words_fields_and_not() {
		let tree = parse_tree("title:moon NOT sun* \"full moon\"").expect("parses").expect("non-empty");
		assert_eq!(
			tree,
			Node::And(vec![
				Node::Leaf(Leaf::Field { field: "title".into(), value: "moon".into(), wildcard: false }),
				Node::Not(Box::new(Node::Leaf(Leaf::Word { text: "sun".into(), wildcard: true }))),
				Node::Leaf(Leaf::Phrase("full moon".into())),
			])
		);
	}

	#[test]
	fn malformed_strings_are_rejected() {
		for input in ["(moon", "moon)", "moon OR", "AND", r#"S"moon"#, "NOT"] {
			assert!(matches!(parse_tree(input), Err(IndexError::Parse { .. })), "{input}");
		}
		assert_eq!(parse_tree("   ").expect("parses"), None);
	}
}
