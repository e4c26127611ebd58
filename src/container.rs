//! Standard-library container classification.
use serde::Serialize;

use crate::facts::{CapabilityQuery, RecordId};
use crate::names::spelling::{TemplateArg, TypeSpelling};

/// How deep nested container arguments are inspected.
const MAX_NESTING: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ContainerKind {
    #[default]
    NotContainer,
    Vector,
    List,
    Deque,
    Map,
    Multimap,
    Set,
    Multiset,
    Bitset,
}

/// Ordered: first match wins.
const CONTAINERS: [(&str, ContainerKind); 8] = [
    ("vector", ContainerKind::Vector),
    ("list", ContainerKind::List),
    ("deque", ContainerKind::Deque),
    ("map", ContainerKind::Map),
    ("multimap", ContainerKind::Multimap),
    ("set", ContainerKind::Set),
    ("multiset", ContainerKind::Multiset),
    ("bitset", ContainerKind::Bitset),
];

/// Collection proxy the runtime builds for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProxyStrategy {
    PushBack,
    MapInsert,
    Insert,
    Bitset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: ContainerKind,
    /// Every nested container argument is a vector or a list.
    pub all_nested_default: bool,
}

impl ContainerKind {
    pub fn from_unqualified(name: &str) -> Self {
        CONTAINERS
            .iter()
            .find(|(ident, _)| *ident == name)
            .map(|(_, kind)| *kind)
            .unwrap_or_default()
    }

    pub fn is_container(self) -> bool {
        self != ContainerKind::NotContainer
    }

    pub fn proxy_strategy(self) -> Option<ProxyStrategy> {
        match self {
            ContainerKind::Vector | ContainerKind::List | ContainerKind::Deque => Some(ProxyStrategy::PushBack),
            ContainerKind::Map | ContainerKind::Multimap => Some(ProxyStrategy::MapInsert),
            ContainerKind::Set | ContainerKind::Multiset => Some(ProxyStrategy::Insert),
            ContainerKind::Bitset => Some(ProxyStrategy::Bitset),
            ContainerKind::NotContainer => None,
        }
    }
}

impl ProxyStrategy {
    /// Name of the `TCollectionProxyInfo` helper template.
    pub fn helper(self) -> &'static str {
        match self {
            ProxyStrategy::PushBack => "Pushback",
            ProxyStrategy::MapInsert => "MapInsert",
            ProxyStrategy::Insert => "Insert",
            ProxyStrategy::Bitset => "Pushback",
        }
    }
}

/// Classify a type by its spelling. Only names directly in `std` (or
/// unqualified canonical names, which have had `std::` dropped) qualify.
pub fn classify(type_name: &str) -> Classification {
    match TypeSpelling::parse(type_name) {
        Ok(ty) => classify_spelling(&ty, 0),
        Err(_) => Classification::default(),
    }
}

fn classify_spelling(ty: &TypeSpelling, depth: usize) -> Classification {
    if !ty.declarators.is_empty() {
        return Classification::default();
    }
    let leaf = match ty.name.segments.as_slice() {
        [leaf] => leaf,
        [std, leaf] if std.ident == "std" && std.args.is_none() => leaf,
        _ => return Classification::default(),
    };
    let kind = ContainerKind::from_unqualified(&leaf.ident);
    if !kind.is_container() {
        return Classification::default();
    }
    let all_nested_default = depth < MAX_NESTING
        && leaf.args.iter().flatten().all(|arg| match arg {
            TemplateArg::Type(inner) => {
                let nested = classify_spelling(inner, depth + 1);
                !nested.kind.is_container()
                    || (matches!(nested.kind, ContainerKind::Vector | ContainerKind::List)
                        && nested.all_nested_default)
            }
            TemplateArg::Value(_) => true,
        });
    Classification { kind, all_nested_default }
}

/// Classify a requested record. A record outside the standard library is
/// never a container, whatever it is called.
pub fn classify_record(ty: RecordId, type_name: &str, facts: &dyn CapabilityQuery) -> Classification {
    if !facts.is_in_std_scope(ty) {
        return Classification::default();
    }
    classify(type_name)
}
