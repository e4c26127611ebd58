//! Canonical type names.
//!
//! The normalized name is the key everything else is emitted under, so it has
//! to be deterministic and idempotent: `normalize(normalize(x)) == normalize(x)`.
use regex::Regex;

use super::spelling::{Declarator, Segment, TemplateArg, TypeSpelling};
use crate::error::GenError;
use crate::facts::{CapabilityQuery, TemplateParam};

/// Longest alias chain followed before giving up.
pub const MAX_ALIAS_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultsPolicy {
    /// Re-add omitted template arguments from their declared defaults.
    ResolveDefaults,
    /// Drop trailing arguments equal to their default.
    DropDefaults,
}

pub struct Normalizer<'a> {
    facts: &'a dyn CapabilityQuery,
    opaque: &'a [String],
}

impl<'a> Normalizer<'a> {
    pub fn new(facts: &'a dyn CapabilityQuery, opaque_aliases: &'a [String]) -> Self {
        Self { facts, opaque: opaque_aliases }
    }

    pub fn normalize(&self, raw: &str, policy: DefaultsPolicy) -> Result<String, GenError> {
        let parsed = TypeSpelling::parse(raw)?;
        Ok(self.normalize_spelling(parsed, policy, 0)?.to_string())
    }

    /// Canonical name, all defaults spelled out.
    pub fn canonical(&self, raw: &str) -> Result<String, GenError> {
        self.normalize(raw, DefaultsPolicy::ResolveDefaults)
    }

    /// Name as the user would write it, defaults stripped.
    pub fn requested_spelling(&self, raw: &str) -> Result<String, GenError> {
        self.normalize(raw, DefaultsPolicy::DropDefaults)
    }

    /// True when the name, or any template argument at any depth, is an
    /// opaque alias such as `Double32_t`.
    pub fn has_opaque_alias(&self, name: &str) -> bool {
        fn walk(ty: &TypeSpelling, opaque: &[String]) -> bool {
            ty.name.segments.iter().any(|seg| {
                (seg.args.is_none() && opaque.iter().any(|o| *o == seg.ident))
                    || seg.args.iter().flatten().any(|arg| match arg {
                        TemplateArg::Type(inner) => walk(inner, opaque),
                        TemplateArg::Value(_) => false,
                    })
            })
        }
        TypeSpelling::parse(name).is_ok_and(|ty| walk(&ty, self.opaque))
    }

    fn normalize_spelling(
        &self,
        mut ty: TypeSpelling,
        policy: DefaultsPolicy,
        depth: usize,
    ) -> Result<TypeSpelling, GenError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(GenError::unresolvable(ty.to_string(), "alias chain too long"));
        }
        ty.name.global = false;

        if let Some(target) = self.alias_target(&ty) {
            let mut resolved = TypeSpelling::parse(&target)?;
            resolved.is_const |= ty.is_const;
            resolved.is_volatile |= ty.is_volatile;
            resolved.declarators.extend(ty.declarators);
            return self.normalize_spelling(resolved, policy, depth + 1);
        }

        let segments = &mut ty.name.segments;
        let was_std = segments.len() > 1 && segments[0].ident == "std" && segments[0].args.is_none();
        if was_std {
            segments.remove(0);
        }
        if let [seg] = segments.as_mut_slice() {
            match seg.ident.as_str() {
                "long long" => seg.ident = "Long64_t".into(),
                "unsigned long long" => seg.ident = "ULong64_t".into(),
                _ => {}
            }
        }

        for i in 0..ty.name.segments.len() {
            let Some(args) = ty.name.segments[i].args.take() else {
                continue;
            };
            let mut args = args
                .into_iter()
                .map(|arg| match arg {
                    TemplateArg::Type(inner) => Ok(TemplateArg::Type(self.normalize_spelling(inner, policy, depth)?)),
                    value => Ok(value),
                })
                .collect::<Result<Vec<_>, GenError>>()?;

            let ident = ty.name.segments[i].ident.clone();
            let template = ty.name.plain_path(i);
            let std_container = i == 0
                && std_default_spellings(&ident, &args).is_some()
                && (was_std || self.facts.template_parameters(&template).is_none());

            if std_container {
                let defaults = std_default_spellings(&ident, &args).unwrap_or_default();
                self.drop_trailing(&mut args, &defaults, policy, depth)?;
                if ident == "basic_string" && args.len() == 1 && args[0].to_string() == "char" {
                    ty.name.segments[i] = Segment { ident: "string".into(), args: None };
                    continue;
                }
            } else if !(i == 0 && was_std) {
                let params = self.facts.template_parameters(&template);
                match (policy, params) {
                    (DefaultsPolicy::ResolveDefaults, Some(params)) => {
                        self.resolve_defaults(&template, &params, &mut args, policy, depth)?
                    }
                    (DefaultsPolicy::DropDefaults, Some(params)) => {
                        let defaults = (0..args.len())
                            .map(|idx| {
                                params
                                    .get(idx)
                                    .and_then(|p| p.default.as_deref())
                                    .map(|d| substitute(d, &params[..idx], &args))
                                    .transpose()
                            })
                            .collect::<Result<Vec<_>, GenError>>()?;
                        self.drop_trailing(&mut args, &defaults, policy, depth)?;
                    }
                    (_, None) => {}
                }
            }
            ty.name.segments[i].args = Some(args);
        }

        Ok(ty)
    }

    fn alias_target(&self, ty: &TypeSpelling) -> Option<String> {
        if ty.name.segments.iter().any(|s| s.args.is_some()) {
            return None;
        }
        let full = ty.name.plain_path(usize::MAX);
        let leaf = ty.name.segments.last()?.ident.as_str();
        if matches!(leaf, "Long64_t" | "ULong64_t") || self.opaque.iter().any(|o| *o == leaf || *o == full) {
            return None;
        }
        self.facts.resolve_alias(&full).or_else(|| {
            let stripped = full.strip_prefix("std::")?;
            self.facts.resolve_alias(stripped)
        })
    }

    fn resolve_defaults(
        &self,
        template: &str,
        params: &[TemplateParam],
        args: &mut Vec<TemplateArg>,
        policy: DefaultsPolicy,
        depth: usize,
    ) -> Result<(), GenError> {
        for idx in args.len()..params.len() {
            let param = &params[idx];
            let Some(default) = param.default.as_deref() else {
                return Err(GenError::unresolvable(
                    template,
                    format!("no argument for template parameter '{}'", param.name),
                ));
            };
            let text = substitute(default, &params[..idx], args)?;
            let arg = self.default_arg(&text, policy, depth)?;
            args.push(arg);
        }
        Ok(())
    }

    fn default_arg(&self, text: &str, policy: DefaultsPolicy, depth: usize) -> Result<TemplateArg, GenError> {
        let text = text.trim();
        if looks_like_value(text) {
            return Ok(TemplateArg::Value(text.to_owned()));
        }
        let parsed = TypeSpelling::parse(text)?;
        Ok(TemplateArg::Type(self.normalize_spelling(parsed, policy, depth + 1)?))
    }

    fn drop_trailing(
        &self,
        args: &mut Vec<TemplateArg>,
        defaults: &[Option<String>],
        policy: DefaultsPolicy,
        depth: usize,
    ) -> Result<(), GenError> {
        while let Some(last) = args.last() {
            let Some(Some(default)) = defaults.get(args.len() - 1) else {
                break;
            };
            if self.default_arg(default, policy, depth)? != *last {
                break;
            }
            args.pop();
        }
        Ok(())
    }
}

/// Default arguments of the standard containers, given the leading ones.
fn std_default_spellings(ident: &str, args: &[TemplateArg]) -> Option<Vec<Option<String>>> {
    let k = args.first().map(|a| a.to_string()).unwrap_or_default();
    let v = args.get(1).map(|a| a.to_string()).unwrap_or_default();
    let pair = format!("allocator<pair<{},{v} > >", const_key(args.first()));
    let spellings = match ident {
        "vector" | "list" | "deque" | "forward_list" => vec![None, Some(format!("allocator<{k} >"))],
        "set" | "multiset" => vec![None, Some(format!("less<{k} >")), Some(format!("allocator<{k} >"))],
        "unordered_set" | "unordered_multiset" => vec![
            None,
            Some(format!("hash<{k} >")),
            Some(format!("equal_to<{k} >")),
            Some(format!("allocator<{k} >")),
        ],
        "map" | "multimap" => vec![None, None, Some(format!("less<{k} >")), Some(pair)],
        "unordered_map" | "unordered_multimap" => vec![
            None,
            None,
            Some(format!("hash<{k} >")),
            Some(format!("equal_to<{k} >")),
            Some(pair),
        ],
        "basic_string" => vec![None, Some(format!("char_traits<{k} >")), Some(format!("allocator<{k} >"))],
        _ => return None,
    };
    Some(spellings)
}

/// The key type of a map's value pair. The `const` applies to the key
/// itself, so a pointer key `K*` becomes `K*const`, not `const K*`.
fn const_key(key: Option<&TemplateArg>) -> String {
    match key {
        Some(TemplateArg::Type(ty)) => {
            let mut ty = ty.clone();
            match ty.declarators.last_mut() {
                None => ty.is_const = true,
                Some(outer @ Declarator::Pointer) => *outer = Declarator::ConstPointer,
                Some(_) => {}
            }
            ty.to_string()
        }
        Some(value) => format!("const {value}"),
        None => String::new(),
    }
}

fn looks_like_value(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '(' | '!' | '~'))
        || matches!(text, "true" | "false" | "nullptr")
}

/// Replace earlier template parameter names in a default argument.
fn substitute(default: &str, params: &[TemplateParam], args: &[TemplateArg]) -> Result<String, GenError> {
    let mut text = default.to_owned();
    for (param, arg) in params.iter().zip(args) {
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(&param.name)))
            .map_err(|e| GenError::malformed(&param.name, e.to_string()))?;
        let replacement = arg.to_string();
        text = word.replace_all(&text, regex::NoExpand(&replacement)).into_owned();
    }
    Ok(text)
}
