//! Capability detection.
//!
//! Each capability is one read-only question asked through
//! [`CapabilityQuery`]; the answers are gathered into a [`CapabilityProfile`]
//! that is computed once per request.
use serde::Serialize;

use crate::container::{self, ContainerKind};
use crate::facts::{Access, CapabilityQuery, DeclScope, DestructorFact, LookupScope, RecordId};
use crate::names::spelling::{Declarator, TypeSpelling};
use crate::request::{RequestFlags, TypeRequest};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Visibility of `operator new(size_t, void*)` from inside a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Absent,
    Visible,
    /// Declared somewhere, but hidden by a plain `operator new(size_t)`.
    Hidden,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityProfile {
    pub has_io_constructor: bool,
    /// Argument passed to the I/O constructor, e.g. `( (TRootIOCtor *)0 )`.
    pub io_constructor_arg: String,
    pub needs_destructor: bool,
    pub has_directory_auto_add: bool,
    pub has_custom_streamer: bool,
    pub has_new_merge: bool,
    pub has_old_merge: bool,
    pub has_reset_after_merge: bool,
    pub is_abstract: bool,
    pub container: ContainerKind,
    pub is_std_string: bool,
    pub is_template_instance: bool,
    pub operator_new: Placement,
    pub operator_new_array: Placement,
    pub has_dictionary_method: bool,
    pub has_isa_method: bool,
    pub has_class_version_method: bool,
    /// The record was not complete; everything above is absent.
    pub incomplete: bool,
}

impl CapabilityProfile {
    pub fn has_operator_new_placement(&self) -> bool {
        self.operator_new == Placement::Visible
    }

    pub fn has_operator_new_array_placement(&self) -> bool {
        self.operator_new_array == Placement::Visible
    }

    /// Both a default-constructible and destructible type: arrays can be managed.
    pub fn supports_arrays(&self) -> bool {
        self.has_io_constructor && self.io_constructor_arg.is_empty() && self.needs_destructor
    }
}

pub struct CapabilityResolver<'a> {
    facts: &'a dyn CapabilityQuery,
    io_ctor_types: &'a [String],
}

const SIZE_T: &str = "size_t";
const PLACEMENT: &str = "size_t,void*";

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> CapabilityResolver<'a> {
    pub fn new(facts: &'a dyn CapabilityQuery, io_ctor_types: &'a [String]) -> Self {
        Self { facts, io_ctor_types }
    }

    pub fn resolve(&self, request: &TypeRequest) -> CapabilityProfile {
        let ty = request.record();
        let name = request.normalized_name();
        let container = container::classify_record(ty, name, self.facts).kind;
        if !self.facts.is_complete(ty) {
            tracing::debug!(%name, "incomplete record, no capabilities");
            return CapabilityProfile { container, incomplete: true, ..Default::default() };
        }

        let io_ctor = self.io_constructor(ty);
        let has_new_merge = self.has_public_method(ty, "Merge", "TCollection*,TFileMergeInfo*");
        CapabilityProfile {
            has_io_constructor: io_ctor.is_some(),
            io_constructor_arg: io_ctor.unwrap_or_default(),
            needs_destructor: self.needs_destructor(ty),
            has_directory_auto_add: self.has_public_method(ty, "DirectoryAutoAdd", "TDirectory*"),
            has_custom_streamer: self.has_custom_streamer(ty, request.flags()),
            has_new_merge,
            has_old_merge: !has_new_merge && self.has_public_method(ty, "Merge", "TCollection*"),
            has_reset_after_merge: self.has_public_method(ty, "ResetAfterMerge", "TFileMergeInfo*"),
            is_abstract: self.facts.is_abstract(ty),
            container,
            is_std_string: name == "string",
            is_template_instance: self.facts.is_template_instance(ty),
            operator_new: self.placement_visibility(ty, "operator new"),
            operator_new_array: self.placement_visibility(ty, "operator new[]"),
            has_dictionary_method: self.facts.declares_method(ty, "Dictionary"),
            has_isa_method: self.facts.declares_method(ty, "IsA"),
            has_class_version_method: self.facts.declares_method(ty, "Class_Version"),
            incomplete: false,
        }
    }

    /// Argument snippet of the first usable I/O constructor (`""` for the
    /// default constructor), or `None` when the type cannot be built for I/O.
    pub fn io_constructor(&self, ty: RecordId) -> Option<String> {
        if self.facts.is_abstract(ty) {
            return None;
        }
        let marker = self.io_ctor_types.iter().find(|m| self.check_constructor(ty, m))?;
        if let Some(hit) = self.facts.find_method(LookupScope::ClassAndBases(ty), "operator new", SIZE_T) {
            if hit.access != Access::Public {
                return None;
            }
        }
        let marker = marker.trim();
        if marker.is_empty() {
            Some(String::new())
        } else {
            Some(format!("( ({marker} *)0 )"))
        }
    }

    /// Does `ty` have a public constructor usable with the given marker type?
    pub fn check_constructor(&self, ty: RecordId, marker: &str) -> bool {
        let marker = marker.trim().trim_start_matches("::");
        if marker.is_empty() {
            if !self.facts.has_user_declared_constructor(ty) {
                return true;
            }
            return self.facts.constructors(ty).iter().any(|c| {
                c.access == Access::Public && c.params.first().is_none_or(|p| p.has_default)
            });
        }
        self.facts.constructors(ty).iter().any(|c| {
            c.access == Access::Public && c.params.len() == 1 && self.points_to(&c.params[0].type_name, marker)
        })
    }

    fn points_to(&self, param: &str, marker: &str) -> bool {
        let Ok(mut ty) = TypeSpelling::parse(param) else {
            return false;
        };
        if ty.declarators != [Declarator::Pointer] {
            return false;
        }
        ty.declarators.clear();
        ty.is_const = false;
        ty.name.global = false;
        let pointee = ty.to_string();
        pointee == marker || self.facts.resolve_alias(&pointee).is_some_and(|t| t.trim_start_matches("::") == marker)
    }

    pub fn needs_destructor(&self, ty: RecordId) -> bool {
        match self.facts.destructor(ty) {
            DestructorFact::NotDeclared => true,
            DestructorFact::Declared(access) => access == Access::Public,
        }
    }

    /// `Streamer(TBuffer&)` in the type's own scope, used unless full
    /// streamer info was asked for without `no_streamer`.
    pub fn has_custom_streamer(&self, ty: RecordId, flags: RequestFlags) -> bool {
        let declared_here = self
            .facts
            .find_method(LookupScope::ClassAndBases(ty), "Streamer", "TBuffer&")
            .is_some_and(|hit| hit.declared_in == DeclScope::Record(ty));
        declared_here && (flags.no_streamer || !flags.wants_streamer_info)
    }

    pub fn has_public_method(&self, ty: RecordId, name: &str, proto: &str) -> bool {
        self.facts
            .find_method(LookupScope::ClassAndBases(ty), name, proto)
            .is_some_and(|hit| hit.access == Access::Public)
    }

    /// Whether the placement form of `op` can be called from inside `ty`.
    /// A class-scope plain form hides every namespace-scope overload, and a
    /// derived class's plain form hides its bases' placement form.
    pub fn placement_visibility(&self, ty: RecordId, op: &str) -> Placement {
        let lookup = |proto: &str| {
            self.facts
                .find_method(LookupScope::ClassAndBases(ty), op, proto)
                .or_else(|| self.facts.find_method(LookupScope::EnclosingNamespaces(ty), op, proto))
        };
        let Some(placement) = lookup(PLACEMENT) else {
            return Placement::Absent;
        };
        let Some(plain) = lookup(SIZE_T) else {
            return Placement::Visible;
        };
        let hidden = match (&plain.declared_in, &placement.declared_in) {
            (a, b) if a == b => false,
            (DeclScope::Namespace(_), _) => false,
            (DeclScope::Record(_), DeclScope::Namespace(_)) => true,
            (DeclScope::Record(plain_cl), DeclScope::Record(place_cl)) => {
                self.facts.is_derived_from(*plain_cl, *place_cl)
            }
        };
        if hidden { Placement::Hidden } else { Placement::Visible }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSheet;
    use crate::names::Normalizer;
    use serde_json::json;

    fn facts() -> FactSheet {
        FactSheet::from_value(json!({
            "records": [
                {
                    "name": "Base",
                    "methods": [{"name": "operator new", "proto": "size_t, void*"}]
                },
                {
                    "name": "Derived",
                    "bases": [{"name": "Base"}],
                    "destructor": {"access": "private"},
                    "methods": [{"name": "operator new", "proto": "size_t", "access": "private"}]
                },
                {
                    "name": "Hit",
                    "constructors": [
                        {"access": "public", "params": [{"type": "TRootIOCtor*"}]},
                        {"access": "public", "params": [{"type": "int"}]}
                    ],
                    "methods": [
                        {"name": "Streamer", "proto": "TBuffer&"},
                        {"name": "Merge", "proto": "TCollection*"},
                        {"name": "ResetAfterMerge", "proto": "TFileMergeInfo*", "access": "protected"}
                    ]
                },
                {
                    "name": "Plain",
                    "constructors": [{"access": "public", "params": [{"type": "int", "has_default": true}]}]
                },
                {"name": "Shape", "abstract": true},
                {"name": "Forward", "complete": false},
                {
                    "name": "Sub",
                    "bases": [{"name": "Hit"}]
                }
            ],
            "namespaces": {
                "": [{"name": "operator new", "proto": "size_t,void*"}]
            }
        }))
        .unwrap()
    }

    fn markers() -> Vec<String> {
        vec!["TRootIOCtor".into(), String::new()]
    }

    #[test]
    fn io_constructor_markers_in_order() {
        let facts = facts();
        let markers = markers();
        let r = CapabilityResolver::new(&facts, &markers);
        assert_eq!(r.io_constructor(2).as_deref(), Some("( (TRootIOCtor *)0 )"));
        assert_eq!(r.io_constructor(3).as_deref(), Some(""));
        assert_eq!(r.io_constructor(0).as_deref(), Some(""));
        assert_eq!(r.io_constructor(4), None);
    }

    #[test]
    fn private_operator_new_revokes_io_constructor() {
        let facts = facts();
        let markers = markers();
        let r = CapabilityResolver::new(&facts, &markers);
        assert!(r.check_constructor(1, ""));
        assert_eq!(r.io_constructor(1), None);
    }

    #[test]
    fn destructor_access() {
        let facts = facts();
        let r = CapabilityResolver::new(&facts, &[]);
        assert!(!r.needs_destructor(1));
        assert!(r.needs_destructor(0));
    }

    #[test]
    fn derived_private_plain_new_hides_base_placement() {
        let facts = facts();
        let r = CapabilityResolver::new(&facts, &[]);
        assert_eq!(r.placement_visibility(1, "operator new"), Placement::Hidden);
        assert_eq!(r.placement_visibility(0, "operator new"), Placement::Visible);
        // only the global placement form exists
        assert_eq!(r.placement_visibility(2, "operator new"), Placement::Visible);
        assert_eq!(r.placement_visibility(2, "operator new[]"), Placement::Absent);
    }

    #[test]
    fn streamer_must_be_declared_in_own_scope() {
        let facts = facts();
        let r = CapabilityResolver::new(&facts, &[]);
        assert!(r.has_custom_streamer(2, RequestFlags::default()));
        assert!(!r.has_custom_streamer(6, RequestFlags::default()));
        let info = RequestFlags { wants_streamer_info: true, ..Default::default() };
        assert!(!r.has_custom_streamer(2, info));
        assert!(r.has_custom_streamer(2, RequestFlags { no_streamer: true, ..info }));
    }

    #[test]
    fn profile_for_request() {
        let facts = facts();
        let markers = markers();
        let opaque = Vec::new();
        let normalizer = Normalizer::new(&facts, &opaque);
        let r = CapabilityResolver::new(&facts, &markers);

        let hit = TypeRequest::new(0, 2, None, RequestFlags::default(), None, &facts, &normalizer).unwrap();
        let profile = hit.profile(&r);
        assert!(profile.has_old_merge);
        assert!(!profile.has_new_merge);
        assert!(!profile.has_reset_after_merge);
        assert!(profile.has_custom_streamer);
        assert!(!profile.supports_arrays());

        let fwd = TypeRequest::new(1, 5, None, RequestFlags::default(), None, &facts, &normalizer).unwrap();
        let profile = fwd.profile(&r);
        assert!(profile.incomplete);
        assert!(!profile.needs_destructor);
    }
}
