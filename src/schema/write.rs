//! C++ text for schema-evolution rules: conversion functions and the
//! `TSchemaHelper` lists handed to the registry.
use super::{MemberTypeMap, RuleKind, SchemaRule};

impl RuleKind {
    /// Prefix of the generated function names.
    pub fn function_prefix(self) -> &'static str {
        match self {
            RuleKind::Read => "read",
            RuleKind::ReadRaw => "readraw",
        }
    }

    fn list_name(self) -> &'static str {
        match self {
            RuleKind::Read => "readrules",
            RuleKind::ReadRaw => "readrawrules",
        }
    }

    fn setter(self) -> &'static str {
        match self {
            RuleKind::Read => "SetReadRules",
            RuleKind::ReadRaw => "SetReadRawRules",
        }
    }
}

pub fn function_name(kind: RuleKind, mapped: &str, index: usize) -> String {
    format!("{}_{mapped}_{index}", kind.function_prefix())
}

/// Conversion function for one rule. Rules without code get nothing.
pub fn write_rule_function(
    out: &mut String,
    kind: RuleKind,
    rule: &SchemaRule,
    index: usize,
    class_name: &str,
    mapped: &str,
    members: &MemberTypeMap,
) {
    let Some(code) = rule.code.as_deref().filter(|_| rule.has_code()) else {
        return;
    };
    let name = function_name(kind, mapped, index);
    match kind {
        RuleKind::Read => out.push_str(&format!("   static void {name}( char* target, TVirtualObject *oldObj )\n")),
        RuleKind::ReadRaw => out.push_str(&format!("   static void {name}( char* target, TBuffer &b )\n")),
    }
    out.push_str("   {\n");
    out.push_str("      //--- Automatically generated variables ---\n");

    let onfile = rule.source_members();
    if kind == RuleKind::Read && !onfile.is_empty() {
        let onfile_struct = format!("{mapped}_Onfile");
        out.push_str(&format!("      struct {onfile_struct} {{\n"));
        for (ty, member) in &onfile {
            out.push_str(&format!("         {ty} &{member};\n"));
        }
        let params = onfile
            .iter()
            .map(|(ty, member)| format!("{ty} &onfile_{member}"))
            .collect::<Vec<_>>()
            .join(", ");
        let inits = onfile
            .iter()
            .map(|(_, member)| format!("{member}(onfile_{member})"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("         {onfile_struct}( {params} ): {inits} {{}}\n"));
        out.push_str("      };\n");
        for (_, member) in &onfile {
            out.push_str(&format!(
                "      static Long_t offset_Onfile_{mapped}_{member} = oldObj->GetClass()->GetDataMemberOffset(\"{member}\");\n"
            ));
        }
        out.push_str("      char *onfile_add = (char*)oldObj->GetObject();\n");
        let args = onfile
            .iter()
            .map(|(ty, member)| format!("*({ty}*)(onfile_add+offset_Onfile_{mapped}_{member})"))
            .collect::<Vec<_>>()
            .join(",\n         ");
        out.push_str(&format!("      {onfile_struct} onfile(\n         {args} );\n\n"));
    }

    out.push_str(&format!("      static TClassRef cls(\"{class_name}\");\n"));
    for target in &rule.target {
        let Some(member) = members.get(target) else {
            continue;
        };
        out.push_str(&format!(
            "      static Long_t offset_{target} = cls->GetDataMemberOffset(\"{target}\");\n"
        ));
        if member.dims.is_empty() {
            out.push_str(&format!(
                "      {ty}& {target} = *({ty}*)(target+offset_{target});\n",
                ty = member.type_name
            ));
        } else {
            out.push_str(&format!("      typedef {} {target}_t{};\n", member.type_name, member.dims));
            out.push_str(&format!("      {target}_t& {target} = *({target}_t *)(target+offset_{target});\n"));
        }
    }
    out.push_str(&format!("      {class_name}* newObj = ({class_name}*)target;\n"));
    out.push_str("      // Supress warning message.\n");
    if kind == RuleKind::Read {
        out.push_str("      if (oldObj) {}\n\n");
    }
    out.push_str("      if (newObj) {}\n\n");
    out.push_str("      //--- User's code ---\n");
    for line in code.trim().lines() {
        out.push_str(&format!("     {line}\n"));
    }
    out.push_str("   }\n");
}

/// The `std::vector<ROOT::TSchemaHelper>` block for one channel, ending with
/// the `instance.Set*Rules` call.
pub fn write_schema_list(out: &mut String, kind: RuleKind, rules: &[SchemaRule], mapped: &str) {
    if rules.is_empty() {
        return;
    }
    let list = kind.list_name();
    match kind {
        RuleKind::Read => out.push_str("\n      // the io read rules\n"),
        RuleKind::ReadRaw => out.push_str("\n      // the io read raw rules\n"),
    }
    out.push_str(&format!("      std::vector<ROOT::TSchemaHelper> {list}({});\n", rules.len()));
    for (i, rule) in rules.iter().enumerate() {
        out.push_str(&format!("      rule = &{list}[{i}];\n"));
        out.push_str(&format!("      rule->fSourceClass = \"{}\";\n", escape(&rule.source_class)));
        if !rule.target.is_empty() {
            out.push_str(&format!("      rule->fTarget      = \"{}\";\n", escape(&rule.target.join(" "))));
        }
        if let Some(source) = &rule.source {
            out.push_str(&format!("      rule->fSource      = \"{}\";\n", escape(source)));
        }
        if rule.has_code() {
            out.push_str(&format!(
                "      rule->fFunctionPtr = (void *)TFunc2void( {});\n",
                function_name(kind, mapped, i)
            ));
            out.push_str(&format!("      rule->fCode        = \"{}\";\n", escape(rule.code.as_deref().unwrap_or_default())));
        }
        if let Some(version) = &rule.version {
            out.push_str(&format!("      rule->fVersion     = \"{}\";\n", escape(version)));
        }
        if let Some(checksum) = &rule.checksum {
            out.push_str(&format!("      rule->fChecksum    = \"{}\";\n", escape(checksum)));
        }
        if let Some(include) = &rule.include {
            out.push_str(&format!("      rule->fInclude     = \"{}\";\n", escape(include)));
        }
        if let Some(embed) = rule.embed {
            out.push_str(&format!("      rule->fEmbed       = {embed};\n"));
        }
        if let Some(attributes) = &rule.attributes {
            out.push_str(&format!("      rule->fAttributes  = \"{}\";\n", escape(attributes)));
        }
        out.push('\n');
    }
    out.push_str(&format!("      instance.{}( {list} );\n", kind.setter()));
}

/// Escape text for a C string literal.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
