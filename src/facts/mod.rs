//! Capability query interface.
//!
//! Everything the generator knows about a compiled type comes through
//! [`CapabilityQuery`]. Any front-end able to answer "does member X with
//! signature Y exist and is it accessible" can drive the pipeline; the crate
//! ships a JSON-backed implementation in [`sheet`].
pub mod sheet;

use serde::{Deserialize, Serialize};

pub use sheet::FactSheet;

/// Opaque handle to a record known to the front-end.
pub type RecordId = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Where a function was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclScope {
    /// Namespace-level function; `""` is the global namespace.
    Namespace(String),
    Record(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHit {
    pub access: Access,
    pub declared_in: DeclScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupScope {
    /// The record itself, then its bases in declaration order.
    ClassAndBases(RecordId),
    /// The namespaces enclosing the record, innermost first.
    EnclosingNamespaces(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamFact {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtorFact {
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub params: Vec<ParamFact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructorFact {
    NotDeclared,
    Declared(Access),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFact {
    /// Name as written in the base-specifier list.
    pub name: String,
    /// `None` when the front-end has no record for the base.
    pub record: Option<RecordId>,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFact {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Constant array extents, outermost first.
    #[serde(default)]
    pub dims: Vec<u64>,
    #[serde(default)]
    pub integral: bool,
    #[serde(default)]
    pub access: Access,
    /// Trailing declaration comment, `//` included.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl FieldFact {
    /// Comment text with the leading `//` removed.
    pub fn comment_body(&self) -> Option<&str> {
        let raw = self.comment.as_deref()?.trim_start();
        Some(raw.strip_prefix("//").unwrap_or(raw).trim_start())
    }

    /// `[3][4]` style suffix for constant arrays.
    pub fn dims_suffix(&self) -> String {
        self.dims.iter().map(|d| format!("[{d}]")).collect()
    }

    /// `//!` marks a member as not persisted.
    pub fn is_transient(&self) -> bool {
        let marked = |text: &str| {
            let squeezed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            squeezed.starts_with("//!")
        };
        self.annotations.iter().any(|a| marked(a))
            || self.comment.as_deref().is_some_and(marked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeFunctionFact {
    /// False for library-provided defaults the user never overrode.
    pub user_defined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: String,
    /// `-1` when unknown.
    pub line: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
}

/// Synchronous, read-only queries against the front-end.
///
/// Implementations must be shareable across worker threads.
pub trait CapabilityQuery: Sync {
    fn find_record(&self, qualified_name: &str) -> Option<RecordId>;
    fn qualified_name(&self, ty: RecordId) -> Option<String>;
    /// False for forward-declared or otherwise malformed records.
    fn is_complete(&self, ty: RecordId) -> bool;
    fn is_abstract(&self, ty: RecordId) -> bool;
    fn is_template_instance(&self, ty: RecordId) -> bool;
    fn is_in_std_scope(&self, ty: RecordId) -> bool;
    fn constructors(&self, ty: RecordId) -> Vec<CtorFact>;
    fn has_user_declared_constructor(&self, ty: RecordId) -> bool {
        !self.constructors(ty).is_empty()
    }
    fn destructor(&self, ty: RecordId) -> DestructorFact;
    /// Lookup of `name` with parameter list `proto` (e.g. `"TCollection*,TFileMergeInfo*"`).
    fn find_method(&self, scope: LookupScope, name: &str, proto: &str) -> Option<MethodHit>;
    /// Any member function called `name` declared in the record's own scope.
    fn declares_method(&self, ty: RecordId, name: &str) -> bool;
    fn bases(&self, ty: RecordId) -> Vec<BaseFact>;
    fn fields(&self, ty: RecordId) -> Vec<FieldFact>;
    /// Position of a data member in layout order.
    fn declaration_order(&self, ty: RecordId, member: &str) -> Option<usize>;
    fn is_derived_from(&self, derived: RecordId, base: RecordId) -> bool;
    /// Namespace-level function visible from the record's enclosing scope.
    fn find_free_function(&self, ty: RecordId, name: &str, proto: &str) -> Option<FreeFunctionFact>;
    fn source_location(&self, ty: RecordId) -> SourceLocation;
    /// Raw `name@@@value` annotation strings on the record.
    fn annotations(&self, ty: RecordId) -> Vec<String>;
    fn resolve_alias(&self, name: &str) -> Option<String>;
    fn template_parameters(&self, template: &str) -> Option<Vec<TemplateParam>>;
}

/// Prototype spelling used for comparisons: whitespace-free.
pub fn proto_key(proto: &str) -> String {
    proto.chars().filter(|c| !c.is_whitespace()).collect()
}
