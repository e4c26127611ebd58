use super::{MemberTypeMap, SchemaRule};

/// Outcome of checking one channel's rules against a type's members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pruned {
    /// Rules to emit, in their original order.
    pub kept: Vec<SchemaRule>,
    /// Rejected rules with the first target member that does not exist.
    pub dropped: Vec<(SchemaRule, String)>,
}

/// Keep the rules whose every target member exists in `members`.
///
/// Works on a copy; the process-wide rule table is never touched.
pub fn validate(rules: &[SchemaRule], members: &MemberTypeMap) -> Pruned {
    let mut pruned = Pruned::default();
    for rule in rules {
        match rule.target.iter().find(|t| !members.contains_key(t.as_str())) {
            None => pruned.kept.push(rule.clone()),
            Some(missing) => pruned.dropped.push((rule.clone(), missing.clone())),
        }
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemberType;

    fn members() -> MemberTypeMap {
        let mut map = MemberTypeMap::new();
        map.insert("a".into(), MemberType { type_name: "int".into(), dims: String::new() });
        map.insert("b".into(), MemberType { type_name: "float".into(), dims: String::new() });
        map
    }

    fn rule(targets: &[&str]) -> SchemaRule {
        SchemaRule {
            source_class: "X".into(),
            target_class: "X".into(),
            target: targets.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn drops_rules_with_unknown_targets() {
        let rules = [rule(&["a", "missing"]), rule(&["a"]), rule(&[])];
        let pruned = validate(&rules, &members());
        assert_eq!(pruned.kept, vec![rule(&["a"]), rule(&[])]);
        assert_eq!(pruned.dropped.len(), 1);
        assert_eq!(pruned.dropped[0].1, "missing");
    }
}
