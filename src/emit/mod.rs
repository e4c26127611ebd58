//! Descriptor emission.
//!
//! For every type two blocks of C++ are produced inside `namespace ROOT`:
//! the wrapper functions ([`aux`]) and the registration block ([`init`]),
//! which ends with the dictionary and class-manipulation functions
//! ([`manip`]) for types that do not provide their own `Dictionary`.
pub mod aux;
pub mod init;
pub mod manip;

use serde::Serialize;

use crate::capability::CapabilityProfile;
use crate::container::Classification;
use crate::error::Diagnostic;
use crate::facts::CapabilityQuery;
use crate::names::{is_std_class, mangle, Normalizer};
use crate::request::TypeRequest;
use crate::schema::{MemberTypeMap, SchemaRule};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Everything emitted for one type.
#[derive(Debug, Clone, Serialize)]
pub struct EmissionDescriptor {
    pub type_name: String,
    pub wrappers: String,
    pub registration: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rules that survived validation, per channel.
#[derive(Debug, Clone, Default)]
pub struct PrunedRules {
    pub read: Vec<SchemaRule>,
    pub read_raw: Vec<SchemaRule>,
}

/// Spellings of the class used throughout the emitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbols {
    /// Normalized name, as registered.
    pub class_name: String,
    /// Identifier-safe form used as a function suffix.
    pub mapped: String,
    /// `::`-prefixed unless a standard-library class.
    pub csymbol: String,
}

pub struct Emitter<'a> {
    facts: &'a dyn CapabilityQuery,
    normalizer: &'a Normalizer<'a>,
}

/// Inputs shared by the block writers.
pub struct EmitContext<'a> {
    pub facts: &'a dyn CapabilityQuery,
    pub normalizer: &'a Normalizer<'a>,
    pub request: &'a TypeRequest,
    pub profile: &'a CapabilityProfile,
    pub proxy: Classification,
    pub rules: &'a PrunedRules,
    pub members: &'a MemberTypeMap,
    pub symbols: Symbols,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl EmissionDescriptor {
    /// Wrapper text followed by registration text.
    pub fn render(&self) -> String {
        format!("{}{}", self.wrappers, self.registration)
    }
}

impl Symbols {
    pub fn new(class_name: &str) -> Self {
        let csymbol = if is_std_class(class_name) {
            class_name.to_owned()
        } else {
            format!("::{class_name}")
        };
        Self { class_name: class_name.to_owned(), mapped: mangle(class_name), csymbol }
    }
}

impl EmitContext<'_> {
    /// The custom member streamer is hooked up.
    pub fn streamer_wired(&self) -> bool {
        self.profile.has_custom_streamer && !self.request.flags().only_register_class
    }

    pub fn has_merge(&self) -> bool {
        self.profile.has_new_merge || self.profile.has_old_merge
    }

    /// Emit our own `_Dictionary` / `_TClassManip` pair.
    pub fn needs_dictionary_function(&self) -> bool {
        !self.profile.has_dictionary_method || self.profile.is_template_instance
    }
}

impl<'a> Emitter<'a> {
    pub fn new(facts: &'a dyn CapabilityQuery, normalizer: &'a Normalizer<'a>) -> Self {
        Self { facts, normalizer }
    }

    pub fn emit(
        &self,
        request: &TypeRequest,
        profile: &CapabilityProfile,
        proxy: Classification,
        rules: &PrunedRules,
        members: &MemberTypeMap,
    ) -> EmissionDescriptor {
        let ctx = EmitContext {
            facts: self.facts,
            normalizer: self.normalizer,
            request,
            profile,
            proxy,
            rules,
            members,
            symbols: Symbols::new(request.normalized_name()),
        };
        let mut wrappers = String::new();
        aux::write_aux_functions(&mut wrappers, &ctx);
        let mut registration = String::new();
        init::write_class_init(&mut registration, &ctx);
        tracing::debug!(name = %ctx.symbols.class_name, "emitted");
        EmissionDescriptor {
            type_name: ctx.symbols.class_name,
            wrappers,
            registration,
            diagnostics: Vec::new(),
        }
    }
}
