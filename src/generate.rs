//! Generation run: one request per type, fanned out over the rayon pool.
//!
//! Each worker owns its request and caches; the facts, configuration and
//! rule table are shared read-only. Results come back in request order.
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::array_index::parse_array_dimension;
use crate::capability::{CapabilityProfile, CapabilityResolver, Placement};
use crate::config::GenConfig;
use crate::container::{self, Classification};
use crate::emit::{EmissionDescriptor, Emitter, PrunedRules};
use crate::error::{Diagnostic, Diagnostics, GenError, TypeFailure};
use crate::facts::sheet::RequestSpec;
use crate::facts::CapabilityQuery;
use crate::names::Normalizer;
use crate::request::TypeRequest;
use crate::schema::{self, MemberTypeMap, RuleKind, RuleTable};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct Generator<'a> {
    facts: &'a dyn CapabilityQuery,
    config: &'a GenConfig,
    rules: &'a RuleTable,
}

/// What the generator decided about a type, without the emitted text.
#[derive(Debug, Clone, Serialize)]
pub struct TypeReport {
    pub index: usize,
    pub name: String,
    pub requested_name: Option<String>,
    pub profile: CapabilityProfile,
    pub container: Classification,
    pub members: MemberTypeMap,
    /// Member → length expression, for members with a valid `[...]` comment.
    pub array_dims: IndexMap<String, String>,
    pub read_rules: usize,
    pub read_raw_rules: usize,
    pub diagnostics: Vec<Diagnostic>,
}

struct Analysis {
    proxy: Classification,
    members: MemberTypeMap,
    rules: PrunedRules,
    array_dims: IndexMap<String, String>,
    diagnostics: Diagnostics,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Generator<'a> {
    pub fn new(facts: &'a dyn CapabilityQuery, config: &'a GenConfig, rules: &'a RuleTable) -> Self {
        Self { facts, config, rules }
    }

    fn normalizer(&self) -> Normalizer<'a> {
        Normalizer::new(self.facts, &self.config.opaque_aliases)
    }

    fn resolver(&self) -> CapabilityResolver<'a> {
        CapabilityResolver::new(self.facts, &self.config.io_constructor_types)
    }

    /// Look up and normalize one request.
    pub fn request(&self, index: usize, spec: &RequestSpec) -> Result<TypeRequest, TypeFailure> {
        let shown = spec.name.clone().unwrap_or_else(|| spec.record.clone());
        let failure = |error: GenError| TypeFailure { index, name: shown.clone(), error };
        let record = self
            .facts
            .find_record(&spec.record)
            .ok_or_else(|| failure(GenError::MissingTypeInfo { name: spec.record.clone() }))?;
        let normalizer = self.normalizer();
        TypeRequest::new(index, record, spec.name.as_deref(), spec.flags, spec.version, self.facts, &normalizer)
            .map_err(failure)
    }

    /// Emit wrappers and registration for one request. Facet-level problems
    /// become diagnostics on the descriptor.
    pub fn generate(&self, request: &TypeRequest) -> EmissionDescriptor {
        let resolver = self.resolver();
        let profile = request.profile(&resolver);
        let analysis = self.analyse(request, profile);
        let normalizer = self.normalizer();
        let emitter = Emitter::new(self.facts, &normalizer);
        let mut descriptor = emitter.emit(request, profile, analysis.proxy, &analysis.rules, &analysis.members);
        descriptor.diagnostics = analysis.diagnostics.into_vec();
        descriptor
    }

    pub fn inspect(&self, request: &TypeRequest) -> TypeReport {
        let resolver = self.resolver();
        let profile = request.profile(&resolver);
        let analysis = self.analyse(request, profile);
        TypeReport {
            index: request.index(),
            name: request.normalized_name().to_owned(),
            requested_name: request.requested_name().map(str::to_owned),
            profile: profile.clone(),
            container: analysis.proxy,
            members: analysis.members,
            array_dims: analysis.array_dims,
            read_rules: analysis.rules.read.len(),
            read_raw_rules: analysis.rules.read_raw.len(),
            diagnostics: analysis.diagnostics.into_vec(),
        }
    }

    pub fn generate_all(&self, specs: &[RequestSpec]) -> Vec<Result<EmissionDescriptor, TypeFailure>> {
        tracing::info!(types = specs.len(), "generating");
        specs
            .par_iter()
            .enumerate()
            .map(|(index, spec)| {
                let request = self.request(index, spec)?;
                Ok(self.generate(&request))
            })
            .collect()
    }

    pub fn inspect_all(&self, specs: &[RequestSpec]) -> Vec<Result<TypeReport, TypeFailure>> {
        specs
            .par_iter()
            .enumerate()
            .map(|(index, spec)| {
                let request = self.request(index, spec)?;
                Ok(self.inspect(&request))
            })
            .collect()
    }

    fn analyse(&self, request: &TypeRequest, profile: &CapabilityProfile) -> Analysis {
        let name = request.normalized_name();
        let record = request.record();
        let mut diagnostics = Diagnostics::for_type(name);

        if profile.incomplete {
            diagnostics.warn(None, GenError::unresolvable(name, "incomplete type, no capabilities detected"));
        }
        for (placement, op) in [(profile.operator_new, "operator new"), (profile.operator_new_array, "operator new[]")] {
            if placement == Placement::Hidden {
                diagnostics.warn(
                    None,
                    GenError::Hidden { symbol: format!("{op}(size_t, void*)"), by: format!("{op}(size_t)") },
                );
            }
        }

        let mut array_dims = IndexMap::new();
        for field in self.facts.fields(record) {
            let Some(comment) = field.comment_body() else { continue };
            match parse_array_dimension(comment, record, &field.name, self.facts) {
                Ok(Some(dim)) => {
                    array_dims.insert(field.name.clone(), dim);
                }
                Ok(None) => {}
                Err(error) => diagnostics.warn(Some(&field.name), error),
            }
        }

        let members = schema::build_member_map(record, self.facts);
        let rule_key = self.facts.qualified_name(record).unwrap_or_else(|| name.to_owned());
        let mut prune = |kind: RuleKind| {
            let pruned = schema::validate(self.rules.rules_for(kind, &rule_key), &members);
            for (rule, missing) in &pruned.dropped {
                tracing::info!(class = %rule_key, from = %rule.source_class, "dropping {kind:?} rule");
                diagnostics.warn(Some(missing), GenError::NotFound { symbol: missing.clone() });
            }
            pruned.kept
        };
        let rules = PrunedRules { read: prune(RuleKind::Read), read_raw: prune(RuleKind::ReadRaw) };

        Analysis {
            proxy: container::classify_record(record, name, self.facts),
            members,
            rules,
            array_dims,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerKind;
    use crate::facts::FactSheet;
    use serde_json::json;

    fn sheet() -> FactSheet {
        FactSheet::from_value(json!({
            "records": [
                {
                    "name": "Event",
                    "fields": [
                        {"name": "fN", "type": "int", "integral": true},
                        {"name": "fHits", "type": "Hit*", "comment": "//[fN]"},
                        {"name": "fBad", "type": "float*", "comment": "//[fMissing]"}
                    ]
                },
                {"name": "Forward", "complete": false}
            ],
            "requests": [
                {"record": "Event"},
                {"record": "Nowhere"},
                {"record": "Forward"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn results_keep_request_order() {
        let sheet = sheet();
        let config = GenConfig::default();
        let rules = RuleTable::default();
        let generator = Generator::new(&sheet, &config, &rules);
        let results = generator.generate_all(&sheet.requests);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().type_name, "Event");
        let failure = results[1].as_ref().unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error.kind(), "missing-type-info");
        let forward = results[2].as_ref().unwrap();
        assert_eq!(forward.diagnostics.len(), 1);
        assert!(!forward.registration.contains("SetDelete"));
    }

    #[test]
    fn bad_array_comment_is_a_warning() {
        let sheet = sheet();
        let config = GenConfig::default();
        let rules = RuleTable::default();
        let generator = Generator::new(&sheet, &config, &rules);
        let request = generator.request(0, &sheet.requests[0]).unwrap();
        let report = generator.inspect(&request);
        assert_eq!(report.array_dims.get("fHits").map(String::as_str), Some("fN"));
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].member.as_deref(), Some("fBad"));
        assert_eq!(report.diagnostics[0].kind, "not-found");
    }

    #[test]
    fn container_classification_follows_std_scope() {
        let sheet = FactSheet::from_value(json!({
            "records": [
                {"name": "list<int>", "template_instance": true},
                {"name": "std::vector<std::list<int> >", "template_instance": true},
                {"name": "std::vector<std::set<int> >", "template_instance": true}
            ],
            "requests": [
                {"record": "list<int>"},
                {"record": "std::vector<std::list<int> >"},
                {"record": "std::vector<std::set<int> >"}
            ]
        }))
        .unwrap();
        let config = GenConfig::default();
        let rules = RuleTable::default();
        let generator = Generator::new(&sheet, &config, &rules);
        let reports: Vec<TypeReport> = generator.inspect_all(&sheet.requests).into_iter().map(Result::unwrap).collect();

        assert_eq!(reports[0].container.kind, ContainerKind::NotContainer);
        assert_eq!(reports[1].container.kind, ContainerKind::Vector);
        assert!(reports[1].container.all_nested_default);
        assert_eq!(reports[2].container.kind, ContainerKind::Vector);
        assert!(!reports[2].container.all_nested_default);
    }
}
