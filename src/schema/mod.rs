//! Schema-evolution rules: model, table, per-type validation and the code
//! written for them.
pub mod rule;
pub mod validate;
pub mod write;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::facts::{CapabilityQuery, RecordId};

pub use validate::{validate, Pruned};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Read,
    ReadRaw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaRule {
    pub source_class: String,
    /// Defaults to the source class.
    pub target_class: String,
    /// Version range, e.g. `[1-3]`.
    pub version: Option<String>,
    pub checksum: Option<String>,
    /// Old-layout member declarations, `;`-separated: `int fX; float fY`.
    pub source: Option<String>,
    /// Members of the target class the rule writes.
    pub target: Vec<String>,
    pub code: Option<String>,
    pub include: Option<String>,
    pub embed: Option<bool>,
    pub attributes: Option<String>,
}

/// A rule as written in the configuration: either the textual pragma form
/// or a structured object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Text(String),
    Structured(SchemaRule),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSources {
    pub read: Vec<RuleEntry>,
    #[serde(rename = "readraw")]
    pub read_raw: Vec<RuleEntry>,
}

/// Process-wide rules, keyed by fully-qualified target class. Read-only
/// during generation.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    read: IndexMap<String, Vec<SchemaRule>>,
    read_raw: IndexMap<String, Vec<SchemaRule>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberType {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Array suffix such as `[3][4]`, empty for scalars.
    pub dims: String,
}

/// Member (and unqualified base class) name → declared type.
pub type MemberTypeMap = IndexMap<String, MemberType>;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaRule {
    pub fn has_code(&self) -> bool {
        self.code.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Names declared in `source`, paired with their types.
    pub fn source_members(&self) -> Vec<(String, String)> {
        let Some(source) = self.source.as_deref() else {
            return Vec::new();
        };
        source
            .split(';')
            .filter_map(|decl| {
                let decl = decl.trim();
                let split = decl.rfind(|c: char| c.is_whitespace() || c == '*' || c == '&')?;
                let (ty, name) = decl.split_at(split + 1);
                let name = name.split('[').next().unwrap_or(name).trim();
                let ty = ty.trim();
                (!name.is_empty() && !ty.is_empty()).then(|| (ty.to_owned(), name.to_owned()))
            })
            .collect()
    }
}

impl RuleTable {
    /// Build the table, rejecting rules that cannot be parsed.
    pub fn load(sources: &RuleSources) -> (Self, Vec<GenError>) {
        let mut table = RuleTable::default();
        let mut rejected = Vec::new();
        for (kind, entries) in [(RuleKind::Read, &sources.read), (RuleKind::ReadRaw, &sources.read_raw)] {
            for entry in entries {
                let parsed = match entry {
                    RuleEntry::Text(text) => SchemaRule::parse(text),
                    RuleEntry::Structured(rule) => rule.clone().checked(),
                };
                match parsed {
                    Ok(rule) => table.insert(kind, rule),
                    Err(error) => {
                        tracing::warn!("dropping schema rule: {error}");
                        rejected.push(error);
                    }
                }
            }
        }
        (table, rejected)
    }

    pub fn insert(&mut self, kind: RuleKind, rule: SchemaRule) {
        let key = rule.target_class.trim_start_matches("::").to_owned();
        let channel = match kind {
            RuleKind::Read => &mut self.read,
            RuleKind::ReadRaw => &mut self.read_raw,
        };
        channel.entry(key).or_default().push(rule);
    }

    pub fn rules_for(&self, kind: RuleKind, class_name: &str) -> &[SchemaRule] {
        let channel = match kind {
            RuleKind::Read => &self.read,
            RuleKind::ReadRaw => &self.read_raw,
        };
        channel
            .get(class_name.trim_start_matches("::"))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read.values().chain(self.read_raw.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collect the member map of a record: every data member, then every direct
/// base under its unqualified name.
pub fn build_member_map(ty: RecordId, facts: &dyn CapabilityQuery) -> MemberTypeMap {
    let mut map = MemberTypeMap::new();
    for field in facts.fields(ty) {
        let dims = field.dims_suffix();
        map.entry(field.name).or_insert(MemberType { type_name: field.type_name, dims });
    }
    for base in facts.bases(ty) {
        let unqualified = crate::names::scope_segments(&base.name).pop().unwrap_or_default();
        let qualified = base.name.trim_start_matches("::").to_owned();
        map.entry(unqualified)
            .or_insert(MemberType { type_name: qualified, dims: String::new() });
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSheet;
    use serde_json::json;

    #[test]
    fn member_map_includes_bases() {
        let facts = FactSheet::from_value(json!({
            "records": [{
                "name": "ns::Track",
                "bases": [{"name": "ns::TObject"}],
                "fields": [
                    {"name": "fPos", "type": "float", "dims": [3, 2]},
                    {"name": "fId", "type": "int", "integral": true}
                ]
            }]
        }))
        .unwrap();
        let map = build_member_map(0, &facts);
        assert_eq!(map["fPos"].dims, "[3][2]");
        assert_eq!(map["TObject"].type_name, "ns::TObject");
        assert_eq!(map.keys().collect::<Vec<_>>(), ["fPos", "fId", "TObject"]);
    }

    #[test]
    fn table_keys_by_target_class() {
        let sources: RuleSources = serde_json::from_value(json!({
            "read": [
                r#"sourceClass="Track" targetClass="Track" version="[1-]" target="fId" code="{ fId = 0; }""#,
                {"sourceClass": "ns::Old", "targetClass": "::ns::New", "target": ["fA"]},
                "sourceClass=\"Broken"
            ],
            "readraw": [
                {"sourceClass": "Track", "target": ["fPos"]}
            ]
        }))
        .unwrap();
        let (table, rejected) = RuleTable::load(&sources);
        assert_eq!(rejected.len(), 1);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rules_for(RuleKind::Read, "Track").len(), 1);
        assert_eq!(table.rules_for(RuleKind::Read, "ns::New")[0].source_class, "ns::Old");
        assert_eq!(table.rules_for(RuleKind::ReadRaw, "Track")[0].target, ["fPos"]);
    }

    #[test]
    fn source_declarations_split() {
        let rule = SchemaRule { source: Some("int fX; float *fY; double fZ[3]".into()), ..Default::default() };
        assert_eq!(
            rule.source_members(),
            vec![
                ("int".to_string(), "fX".to_string()),
                ("float *".to_string(), "fY".to_string()),
                ("double".to_string(), "fZ".to_string())
            ]
        );
    }
}
