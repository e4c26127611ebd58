//! JSON-backed [`CapabilityQuery`].
//!
//! A fact sheet is what a front-end dumps after analysing a translation unit:
//! records with their members and methods, namespace-level functions, type
//! aliases, template parameter lists and the list of types to generate.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use super::{
    proto_key, Access, BaseFact, CapabilityQuery, CtorFact, DeclScope, DestructorFact, FieldFact,
    FreeFunctionFact, LookupScope, MethodHit, RecordId, SourceLocation, TemplateParam,
};
use crate::names::scope_segments;
use crate::request::RequestFlags;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FactSheet {
    pub records: Vec<RecordSpec>,
    /// Namespace name (`""` for global) → functions declared in it.
    pub namespaces: IndexMap<String, Vec<FunctionSpec>>,
    pub aliases: IndexMap<String, String>,
    pub templates: IndexMap<String, Vec<TemplateParam>>,
    pub requests: Vec<RequestSpec>,
    #[serde(skip)]
    by_name: HashMap<String, RecordId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSpec {
    pub name: String,
    #[serde(default = "yes")]
    pub complete: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub template_instance: bool,
    /// Defaults to "declared directly in `std`".
    #[serde(default)]
    pub std_scope: Option<bool>,
    #[serde(default)]
    pub file: String,
    #[serde(default = "unknown_line")]
    pub line: i64,
    #[serde(default)]
    pub bases: Vec<BaseSpec>,
    #[serde(default)]
    pub fields: Vec<FieldFact>,
    #[serde(default)]
    pub constructors: Vec<CtorFact>,
    #[serde(default)]
    pub destructor: Option<DestructorSpec>,
    #[serde(default)]
    pub methods: Vec<FunctionSpec>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseSpec {
    pub name: String,
    #[serde(default)]
    pub access: Access,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestructorSpec {
    #[serde(default)]
    pub access: Access,
}

/// A method (in `records[].methods`) or a namespace-level function.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub proto: String,
    #[serde(default)]
    pub access: Access,
    /// Only meaningful for free functions.
    #[serde(default = "yes")]
    pub user_defined: bool,
}

/// One type to generate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestSpec {
    /// Record to generate for, by qualified name.
    pub record: String,
    /// Spelling the user asked for, if different from the record name.
    pub name: Option<String>,
    #[serde(flatten)]
    pub flags: RequestFlags,
    pub version: Option<i32>,
}

fn yes() -> bool {
    true
}

fn unknown_line() -> i64 {
    -1
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FactSheet {
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let sheet: FactSheet = crate::path_de::from_value_with_path(value)?;
        Ok(sheet.indexed())
    }

    fn indexed(mut self) -> Self {
        self.by_name = self
            .records
            .iter()
            .enumerate()
            .map(|(id, r)| (r.name.trim_start_matches("::").to_owned(), id))
            .collect();
        self
    }

    fn record(&self, ty: RecordId) -> Option<&RecordSpec> {
        self.records.get(ty)
    }

    fn base_ids(&self, ty: RecordId) -> Vec<RecordId> {
        self.bases(ty).into_iter().filter_map(|b| b.record).collect()
    }

    /// Namespaces enclosing `ty`, innermost first, ending with the global one.
    fn enclosing_namespaces(&self, ty: RecordId) -> Vec<String> {
        let Some(record) = self.record(ty) else {
            return Vec::new();
        };
        let mut segments = scope_segments(&record.name);
        segments.pop();
        let mut out = Vec::new();
        while !segments.is_empty() {
            let scope = segments.join("::");
            // Enclosing classes are not namespaces.
            if !self.by_name.contains_key(&scope) {
                out.push(scope);
            }
            segments.pop();
        }
        out.push(String::new());
        out
    }

    fn find_in_namespaces(&self, ty: RecordId, name: &str, proto: &str) -> Option<(String, &FunctionSpec)> {
        let key = proto_key(proto);
        self.enclosing_namespaces(ty).into_iter().find_map(|ns| {
            let hit = self
                .namespaces
                .get(&ns)?
                .iter()
                .find(|f| f.name == name && proto_key(&f.proto) == key)?;
            Some((ns, hit))
        })
    }

    fn find_in_class_and_bases(&self, ty: RecordId, name: &str, key: &str, depth: usize) -> Option<MethodHit> {
        if depth > 64 {
            return None;
        }
        let record = self.record(ty)?;
        if let Some(m) = record.methods.iter().find(|m| m.name == name && proto_key(&m.proto) == key) {
            return Some(MethodHit { access: m.access, declared_in: DeclScope::Record(ty) });
        }
        self.base_ids(ty)
            .into_iter()
            .find_map(|base| self.find_in_class_and_bases(base, name, key, depth + 1))
    }
}

impl CapabilityQuery for FactSheet {
    fn find_record(&self, qualified_name: &str) -> Option<RecordId> {
        self.by_name.get(qualified_name.trim_start_matches("::")).copied()
    }

    fn qualified_name(&self, ty: RecordId) -> Option<String> {
        self.record(ty).map(|r| r.name.trim_start_matches("::").to_owned())
    }

    fn is_complete(&self, ty: RecordId) -> bool {
        self.record(ty).is_some_and(|r| r.complete)
    }

    fn is_abstract(&self, ty: RecordId) -> bool {
        self.record(ty).is_some_and(|r| r.is_abstract)
    }

    fn is_template_instance(&self, ty: RecordId) -> bool {
        self.record(ty).is_some_and(|r| r.template_instance)
    }

    fn is_in_std_scope(&self, ty: RecordId) -> bool {
        let Some(record) = self.record(ty) else {
            return false;
        };
        record.std_scope.unwrap_or_else(|| {
            let segments = scope_segments(&record.name);
            segments.len() == 2 && segments[0] == "std"
        })
    }

    fn constructors(&self, ty: RecordId) -> Vec<CtorFact> {
        self.record(ty).map(|r| r.constructors.clone()).unwrap_or_default()
    }

    fn destructor(&self, ty: RecordId) -> DestructorFact {
        match self.record(ty).and_then(|r| r.destructor.as_ref()) {
            Some(d) => DestructorFact::Declared(d.access),
            None => DestructorFact::NotDeclared,
        }
    }

    fn find_method(&self, scope: LookupScope, name: &str, proto: &str) -> Option<MethodHit> {
        match scope {
            LookupScope::ClassAndBases(ty) => self.find_in_class_and_bases(ty, name, &proto_key(proto), 0),
            LookupScope::EnclosingNamespaces(ty) => {
                let (ns, f) = self.find_in_namespaces(ty, name, proto)?;
                Some(MethodHit { access: f.access, declared_in: DeclScope::Namespace(ns) })
            }
        }
    }

    fn declares_method(&self, ty: RecordId, name: &str) -> bool {
        self.record(ty).is_some_and(|r| r.methods.iter().any(|m| m.name == name))
    }

    fn bases(&self, ty: RecordId) -> Vec<BaseFact> {
        let Some(record) = self.record(ty) else {
            return Vec::new();
        };
        record
            .bases
            .iter()
            .map(|b| BaseFact {
                name: b.name.clone(),
                record: self.find_record(&b.name),
                access: b.access,
            })
            .collect()
    }

    fn fields(&self, ty: RecordId) -> Vec<FieldFact> {
        self.record(ty).map(|r| r.fields.clone()).unwrap_or_default()
    }

    fn declaration_order(&self, ty: RecordId, member: &str) -> Option<usize> {
        self.record(ty)?.fields.iter().position(|f| f.name == member)
    }

    fn is_derived_from(&self, derived: RecordId, base: RecordId) -> bool {
        let mut stack = self.base_ids(derived);
        let mut seen = Vec::new();
        while let Some(next) = stack.pop() {
            if next == base {
                return true;
            }
            if !seen.contains(&next) {
                seen.push(next);
                stack.extend(self.base_ids(next));
            }
        }
        false
    }

    fn find_free_function(&self, ty: RecordId, name: &str, proto: &str) -> Option<FreeFunctionFact> {
        let (_, f) = self.find_in_namespaces(ty, name, proto)?;
        Some(FreeFunctionFact { user_defined: f.user_defined })
    }

    fn source_location(&self, ty: RecordId) -> SourceLocation {
        match self.record(ty) {
            Some(r) => SourceLocation { file: r.file.clone(), line: r.line },
            None => SourceLocation { file: String::new(), line: -1 },
        }
    }

    fn annotations(&self, ty: RecordId) -> Vec<String> {
        self.record(ty).map(|r| r.annotations.clone()).unwrap_or_default()
    }

    fn resolve_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name.trim_start_matches("::")).cloned()
    }

    fn template_parameters(&self, template: &str) -> Option<Vec<TemplateParam>> {
        self.templates.get(template.trim_start_matches("::")).cloned()
    }
}
