//! Array length expressions in member comments.
//!
//! A pointer member documented as `//[fN] hits` is persisted as an array of
//! `fN` elements. The expression may combine integer literals and integral
//! members with `*`, `+` and `-`; every member it names must be readable
//! before the array itself.
use crate::error::GenError;
use crate::facts::{Access, CapabilityQuery, RecordId};

/// Parse and check the dimension in `text` for member `array_member` of
/// `owner`. Returns `Ok(None)` when the text is not a dimension comment and
/// the bracket contents on success.
pub fn parse_array_dimension(
    text: &str,
    owner: RecordId,
    array_member: &str,
    facts: &dyn CapabilityQuery,
) -> Result<Option<String>, GenError> {
    let text = text.trim_start();
    let Some(open) = text.strip_prefix('[') else {
        return Ok(None);
    };
    let Some(close) = open.find(']') else {
        return Ok(None);
    };
    let inner = &open[..close];
    let squeezed: String = inner.chars().filter(|c| !c.is_whitespace()).collect();

    for token in squeezed.split(['*', '+', '-']).filter(|t| !t.is_empty()) {
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            if token.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            return Err(GenError::NotIntegral { symbol: token.to_owned() });
        }
        check_member(token, owner, array_member, facts).map_err(|err| match err {
            GenError::NotFound { .. } => GenError::NotFound { symbol: inner.to_owned() },
            other => other,
        })?;
    }
    Ok(Some(inner.to_owned()))
}

fn check_member(token: &str, owner: RecordId, array_member: &str, facts: &dyn CapabilityQuery) -> Result<(), GenError> {
    let fields = facts.fields(owner);
    if let Some(field) = fields.iter().find(|f| f.name == token) {
        if !field.integral {
            return Err(GenError::NotIntegral { symbol: token.to_owned() });
        }
        let index_pos = facts.declaration_order(owner, token);
        let array_pos = facts.declaration_order(owner, array_member);
        if let (Some(index_pos), Some(array_pos)) = (index_pos, array_pos) {
            if index_pos >= array_pos {
                return Err(GenError::NotYetDeclared { symbol: token.to_owned() });
            }
        }
        return Ok(());
    }

    let mut seen = Vec::new();
    match find_in_bases(token, owner, facts, &mut seen, true) {
        Some((integral, accessible)) => {
            if !integral {
                Err(GenError::NotIntegral { symbol: token.to_owned() })
            } else if !accessible {
                Err(GenError::PrivateAccess { symbol: token.to_owned() })
            } else {
                Ok(())
            }
        }
        None => Err(GenError::NotFound { symbol: token.to_owned() }),
    }
}

/// Depth-first search through the bases; first declaration wins. Returns
/// whether the member is integral and whether `ty`'s most derived class can
/// reach it: private members never, and nothing behind a private base of an
/// intermediate class.
fn find_in_bases(
    token: &str,
    ty: RecordId,
    facts: &dyn CapabilityQuery,
    seen: &mut Vec<RecordId>,
    direct: bool,
) -> Option<(bool, bool)> {
    for base in facts.bases(ty) {
        let Some(id) = base.record else { continue };
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        let reachable = direct || base.access != Access::Private;
        if let Some(field) = facts.fields(id).into_iter().find(|f| f.name == token) {
            return Some((field.integral, reachable && field.access != Access::Private));
        }
        if let Some((integral, accessible)) = find_in_bases(token, id, facts, seen, false) {
            return Some((integral, reachable && accessible));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSheet;
    use serde_json::json;

    fn facts() -> FactSheet {
        FactSheet::from_value(json!({
            "records": [
                {
                    "name": "Base",
                    "fields": [
                        {"name": "fShared", "type": "int", "integral": true, "access": "protected"},
                        {"name": "fSecret", "type": "int", "integral": true, "access": "private"},
                        {"name": "fScale", "type": "double", "access": "public"}
                    ]
                },
                {
                    "name": "Mid",
                    "bases": [{"name": "Base", "access": "private"}],
                    "fields": [{"name": "fMidN", "type": "int", "integral": true}]
                },
                {
                    "name": "Event",
                    "bases": [{"name": "Base"}],
                    "fields": [
                        {"name": "fN", "type": "int", "integral": true},
                        {"name": "fW", "type": "float"},
                        {"name": "fHits", "type": "Hit*", "comment": "//[fN]"},
                        {"name": "fLate", "type": "int", "integral": true}
                    ]
                },
                {
                    "name": "Shower",
                    "bases": [{"name": "Mid"}],
                    "fields": [{"name": "fCells", "type": "float*", "comment": "//[fShared]"}]
                },
                {
                    "name": "Cluster",
                    "bases": [{"name": "Base", "access": "private"}],
                    "fields": [{"name": "fCells", "type": "float*", "comment": "//[fShared]"}]
                }
            ]
        }))
        .unwrap()
    }

    fn parse(text: &str) -> Result<Option<String>, GenError> {
        parse_array_dimension(text, 2, "fHits", &facts())
    }

    #[test]
    fn resolves_prior_integral_member() {
        assert_eq!(parse("[fN] hits").unwrap().as_deref(), Some("fN"));
        assert_eq!(parse("[ fN * 2 + fShared ]").unwrap().as_deref(), Some(" fN * 2 + fShared "));
        assert_eq!(parse("no dimension here").unwrap(), None);
        assert_eq!(parse("[unterminated").unwrap(), None);
    }

    #[test]
    fn member_errors() {
        assert_eq!(parse("[fLate]").unwrap_err(), GenError::NotYetDeclared { symbol: "fLate".into() });
        assert_eq!(parse("[fW]").unwrap_err(), GenError::NotIntegral { symbol: "fW".into() });
        assert_eq!(parse("[fScale]").unwrap_err(), GenError::NotIntegral { symbol: "fScale".into() });
        assert_eq!(parse("[fSecret]").unwrap_err(), GenError::PrivateAccess { symbol: "fSecret".into() });
        assert_eq!(parse("[fN*fMissing]").unwrap_err(), GenError::NotFound { symbol: "fN*fMissing".into() });
        assert_eq!(parse("[ fN * fMissing ]").unwrap_err(), GenError::NotFound { symbol: " fN * fMissing ".into() });
    }

    #[test]
    fn private_inheritance_hides_members_further_down() {
        let facts = facts();
        // a private base is still reachable from the class that inherits it
        assert_eq!(parse_array_dimension("[fShared]", 4, "fCells", &facts).unwrap().as_deref(), Some("fShared"));
        // but not from classes deriving from that class
        assert_eq!(
            parse_array_dimension("[fShared]", 3, "fCells", &facts).unwrap_err(),
            GenError::PrivateAccess { symbol: "fShared".into() }
        );
        assert_eq!(parse_array_dimension("[fMidN]", 3, "fCells", &facts).unwrap().as_deref(), Some("fMidN"));
    }

    #[test]
    fn literal_tokens() {
        assert_eq!(parse("[16]").unwrap().as_deref(), Some("16"));
        assert_eq!(parse("[3x]").unwrap_err(), GenError::NotIntegral { symbol: "3x".into() });
    }
}
