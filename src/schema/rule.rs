//! Parser for the textual rule form:
//!
//! ```text
//! sourceClass="Track" version="[1-2]" source="int fOld" target="fNew" code="{ fNew = onfile.fOld; }"
//! ```
use super::SchemaRule;
use crate::error::GenError;

impl SchemaRule {
    pub fn parse(text: &str) -> Result<SchemaRule, GenError> {
        let mut rule = SchemaRule::default();
        let mut rest = text.trim();
        while !rest.is_empty() {
            let eq = rest
                .find('=')
                .ok_or_else(|| GenError::malformed(text, "expected key=\"value\""))?;
            let key = rest[..eq].trim();
            let after_eq = rest[eq + 1..].trim_start();
            let quoted = after_eq
                .strip_prefix('"')
                .ok_or_else(|| GenError::malformed(text, format!("value of '{key}' must be quoted")))?;
            let (value, remaining) = if key == "code" { read_code(quoted) } else { read_quoted(quoted) }
                .ok_or_else(|| GenError::malformed(text, format!("unterminated value for '{key}'")))?;
            rule.set(key, value, text)?;
            rest = remaining.trim_start();
        }
        rule.checked()
    }

    /// Apply defaults and reject rules without a source class.
    pub fn checked(mut self) -> Result<SchemaRule, GenError> {
        self.source_class = self.source_class.trim().trim_start_matches("::").to_owned();
        self.target_class = self.target_class.trim().trim_start_matches("::").to_owned();
        if self.source_class.is_empty() {
            return Err(GenError::malformed(self.target_class, "missing sourceClass"));
        }
        if self.target_class.is_empty() {
            self.target_class = self.source_class.clone();
        }
        Ok(self)
    }

    fn set(&mut self, key: &str, value: &str, text: &str) -> Result<(), GenError> {
        let owned = Some(value.trim().to_owned());
        match key {
            "sourceClass" => self.source_class = value.trim().to_owned(),
            "targetClass" => self.target_class = value.trim().to_owned(),
            "version" => self.version = owned,
            "checksum" => self.checksum = owned,
            "source" => self.source = owned,
            "target" => {
                self.target = value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            }
            "include" => self.include = owned,
            "attributes" => self.attributes = owned,
            "code" => self.code = owned,
            "embed" => {
                self.embed = match value.trim() {
                    "true" => Some(true),
                    "false" => Some(false),
                    other => return Err(GenError::malformed(text, format!("embed must be true or false, got '{other}'"))),
                }
            }
            other => return Err(GenError::malformed(text, format!("unknown key '{other}'"))),
        }
        Ok(())
    }
}

/// Value up to the closing quote, and the text after it.
fn read_quoted(s: &str) -> Option<(&str, &str)> {
    let end = s.find('"')?;
    Some((&s[..end], &s[end + 1..]))
}

/// `{ ... }` with balanced braces, string and char literals skipped, followed
/// by the closing quote.
fn read_code(s: &str) -> Option<(&str, &str)> {
    let body = s.trim_start();
    if !body.starts_with('{') {
        return read_quoted(s);
    }
    let mut depth = 0usize;
    let mut literal: Option<char> = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if let Some(delim) = literal {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == delim => literal = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => literal = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let code = &body[..=i];
                    let tail = body[i + 1..].trim_start().strip_prefix('"')?;
                    return Some((code, tail));
                }
            }
            _ => {}
        }
    }
    None
}
