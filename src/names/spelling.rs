//! Structured form of a C++ type spelling.
//!
//! Only the subset of declarator syntax that shows up in persisted member and
//! class names is understood: cv-qualifiers, qualified names with template
//! arguments, pointers, references and array extents. Function types and
//! pointers to members are rejected as unresolvable.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GenError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpelling {
    pub is_const: bool,
    pub is_volatile: bool,
    pub name: QualifiedName,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// Written with a leading `::`.
    pub global: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub ident: String,
    /// `None` for a plain name, `Some(vec![])` for `X<>`.
    pub args: Option<Vec<TemplateArg>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    Type(TypeSpelling),
    /// Non-type argument, kept verbatim.
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declarator {
    Pointer,
    ConstPointer,
    LRef,
    RRef,
    /// Extent text between the brackets, possibly empty.
    Array(String),
}

const BUILTIN_WORDS: &[&str] = &[
    "signed", "unsigned", "short", "long", "int", "char", "double", "float", "bool", "void",
    "wchar_t", "char8_t", "char16_t", "char32_t",
];

const ELABORATED: &[&str] = &["class", "struct", "union", "enum", "typename"];

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::|&&|[A-Za-z_$][A-Za-z0-9_$]*|[0-9][0-9A-Za-z_.']*|\S")
        .expect("type token pattern must compile")
});

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

impl TypeSpelling {
    pub fn parse(raw: &str) -> Result<Self, GenError> {
        let tokens: Vec<&str> = TOKEN.find_iter(raw).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            return Err(GenError::unresolvable(raw, "empty type name"));
        }
        let mut parser = Parser { raw, tokens, pos: 0 };
        let ty = parser.parse_type()?;
        if let Some(extra) = parser.peek() {
            return Err(GenError::unresolvable(raw, format!("unexpected `{extra}`")));
        }
        Ok(ty)
    }
}

impl QualifiedName {
    /// Scope path without template arguments, e.g. `ns::Outer::Inner`.
    pub fn plain_path(&self, upto: usize) -> String {
        self.segments[..=upto.min(self.segments.len().saturating_sub(1))]
            .iter()
            .map(|s| s.ident.as_str())
            .collect::<Vec<_>>()
            .join("::")
    }
}

struct Parser<'a> {
    raw: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<&'a str> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<&'a str> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn fail(&self, reason: impl Into<String>) -> GenError {
        GenError::unresolvable(self.raw, reason)
    }

    fn parse_type(&mut self) -> Result<TypeSpelling, GenError> {
        let mut is_const = false;
        let mut is_volatile = false;
        loop {
            match self.peek() {
                Some("const") => is_const = true,
                Some("volatile") => is_volatile = true,
                Some(word) if ELABORATED.contains(&word) => {}
                _ => break,
            }
            self.pos += 1;
        }

        let name = match self.peek() {
            Some(word) if BUILTIN_WORDS.contains(&word) => self.parse_builtin(&mut is_const, &mut is_volatile),
            Some(_) => self.parse_qualified_name()?,
            None => return Err(self.fail("missing type name")),
        };

        loop {
            match self.peek() {
                Some("const") => is_const = true,
                Some("volatile") => is_volatile = true,
                _ => break,
            }
            self.pos += 1;
        }

        let mut declarators = Vec::new();
        loop {
            match self.peek() {
                Some("*") => {
                    self.pos += 1;
                    let mut constant = false;
                    while let Some(cv @ ("const" | "volatile")) = self.peek() {
                        constant |= cv == "const";
                        self.pos += 1;
                    }
                    declarators.push(if constant { Declarator::ConstPointer } else { Declarator::Pointer });
                }
                Some("&") => {
                    self.pos += 1;
                    declarators.push(Declarator::LRef);
                }
                Some("&&") => {
                    self.pos += 1;
                    declarators.push(Declarator::RRef);
                }
                Some("[") => {
                    self.pos += 1;
                    let mut extent = String::new();
                    loop {
                        match self.bump() {
                            Some("]") => break,
                            Some(tok) => extent.push_str(tok),
                            None => return Err(self.fail("unterminated array extent")),
                        }
                    }
                    declarators.push(Declarator::Array(extent));
                }
                Some("(") => return Err(self.fail("function types are not supported")),
                _ => break,
            }
        }

        Ok(TypeSpelling { is_const, is_volatile, name, declarators })
    }

    fn parse_builtin(&mut self, is_const: &mut bool, is_volatile: &mut bool) -> QualifiedName {
        let mut words = Vec::new();
        while let Some(word) = self.peek() {
            match word {
                "const" => *is_const = true,
                "volatile" => *is_volatile = true,
                w if BUILTIN_WORDS.contains(&w) => words.push(w),
                _ => break,
            }
            self.pos += 1;
        }
        QualifiedName {
            global: false,
            segments: vec![Segment { ident: canonical_builtin(&words), args: None }],
        }
    }

    fn parse_qualified_name(&mut self) -> Result<QualifiedName, GenError> {
        let global = self.eat("::");
        let mut segments = Vec::new();
        loop {
            self.eat("template");
            let ident = match self.bump() {
                Some(tok) if is_word(tok) => tok.to_owned(),
                Some(tok) => return Err(self.fail(format!("unexpected `{tok}`"))),
                None => return Err(self.fail("truncated qualified name")),
            };
            let args = if self.eat("<") { Some(self.parse_args()?) } else { None };
            segments.push(Segment { ident, args });
            if !self.eat("::") {
                break;
            }
        }
        Ok(QualifiedName { global, segments })
    }

    fn parse_args(&mut self) -> Result<Vec<TemplateArg>, GenError> {
        let mut args = Vec::new();
        if self.eat(">") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_arg()?);
            match self.bump() {
                Some(",") => continue,
                Some(">") => break,
                Some(tok) => return Err(self.fail(format!("unexpected `{tok}` in template arguments"))),
                None => return Err(self.fail("unterminated template argument list")),
            }
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<TemplateArg, GenError> {
        let first = self.peek().ok_or_else(|| self.fail("missing template argument"))?;
        let is_value = first.starts_with(|c: char| c.is_ascii_digit())
            || matches!(first, "-" | "+" | "(" | "!" | "~" | "true" | "false" | "nullptr" | "sizeof")
            || (is_word(first) && self.peek_at(1) == Some("("));
        if !is_value {
            return Ok(TemplateArg::Type(self.parse_type()?));
        }
        let mut text = String::new();
        let mut parens = 0usize;
        while let Some(tok) = self.peek() {
            match tok {
                "," | ">" if parens == 0 => break,
                "(" => parens += 1,
                ")" => parens = parens.saturating_sub(1),
                _ => {}
            }
            if is_word(tok) && text.ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
                text.push(' ');
            }
            text.push_str(tok);
            self.pos += 1;
        }
        Ok(TemplateArg::Value(text))
    }
}

fn is_word(tok: &str) -> bool {
    tok.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn canonical_builtin(words: &[&str]) -> String {
    let unsigned = words.contains(&"unsigned");
    let signed = words.contains(&"signed");
    let short = words.contains(&"short");
    let longs = words.iter().filter(|w| **w == "long").count();
    let base = words
        .iter()
        .rev()
        .find(|w| !matches!(**w, "signed" | "unsigned" | "short" | "long"))
        .copied();
    let sign = if unsigned { "unsigned " } else { "" };
    match base {
        Some("char") if unsigned => "unsigned char".into(),
        Some("char") if signed => "signed char".into(),
        Some("double") if longs > 0 => "long double".into(),
        Some(other) if other != "int" => other.into(),
        _ if short => format!("{sign}short"),
        _ if longs == 1 => format!("{sign}long"),
        _ if longs >= 2 => format!("{sign}long long"),
        _ => format!("{sign}int"),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PRINTING
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for TypeSpelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        if self.is_volatile {
            f.write_str("volatile ")?;
        }
        write!(f, "{}", self.name)?;
        for decl in &self.declarators {
            match decl {
                Declarator::Pointer => f.write_str("*")?,
                Declarator::ConstPointer => f.write_str("*const")?,
                Declarator::LRef => f.write_str("&")?,
                Declarator::RRef => f.write_str("&&")?,
                Declarator::Array(extent) => write!(f, "[{extent}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            f.write_str("::")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident)?;
        if let Some(args) = &self.args {
            let inner = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(",");
            // `> >` keeps pre-C++11 parsers happy
            let close = if inner.ends_with('>') { " >" } else { ">" };
            write!(f, "<{inner}{close}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Type(ty) => write!(f, "{ty}"),
            TemplateArg::Value(text) => f.write_str(text),
        }
    }
}
