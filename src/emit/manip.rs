//! `_Dictionary` and `_TClassManip` for types without their own
//! `Dictionary()`: class annotations become attribute-map properties and
//! `//!` members are flagged transient.
use super::EmitContext;

/// Separator between an annotation's property name and value.
pub const PROPERTY_SEPARATOR: &str = "@@@";

/// Properties consumed by the generator itself, never forwarded.
const RESERVED_PROPERTIES: &[&str] = &["name", "pattern", "rootmap"];

pub fn write_dictionary(out: &mut String, ctx: &EmitContext<'_>) {
    let mapped = &ctx.symbols.mapped;
    let csym = &ctx.symbols.csymbol;

    out.push_str("\n   // Dictionary for non-ClassDef classes\n");
    out.push_str(&format!("   static void {mapped}_Dictionary() {{\n"));
    out.push_str(&format!(
        "      TClass* theClass =::ROOT::GenerateInitInstanceLocal((const {csym}*)0x0)->GetClass();\n"
    ));
    out.push_str(&format!("      {mapped}_TClassManip(theClass);\n"));
    out.push_str("   }\n\n");

    let body = manip_body(ctx);
    let param = if body.is_empty() { "" } else { "theClass" };
    out.push_str(&format!("   static void {mapped}_TClassManip(TClass* {param}){{\n"));
    out.push_str(&body);
    out.push_str("   }\n\n");
}

fn manip_body(ctx: &EmitContext<'_>) -> String {
    let record = ctx.request.record();
    let mut body = String::new();

    let properties: Vec<(String, String)> = ctx
        .facts
        .annotations(record)
        .iter()
        .filter_map(|a| split_property(a))
        .filter(|(name, _)| !RESERVED_PROPERTIES.contains(&name.as_str()))
        .collect();
    if !properties.is_empty() {
        body.push_str("      theClass->CreateAttributeMap();\n");
        body.push_str("      TDictAttributeMap* attrMap( theClass->GetAttributeMap() );\n");
        for (name, value) in &properties {
            body.push_str(&format!("      attrMap->AddProperty(\"{name}\",\"{value}\");\n"));
        }
    }

    let mut declared = false;
    for field in ctx.facts.fields(record).iter().filter(|f| f.is_transient()) {
        let lead = if declared { "" } else { "TDataMember* " };
        declared = true;
        body.push_str(&format!("      {lead}theMember = theClass->GetDataMember(\"{}\");\n", field.name));
        body.push_str("      theMember->ResetBit(BIT(2));\n");
    }
    body
}

/// `name@@@value` → `(name, value)`.
pub fn split_property(annotation: &str) -> Option<(String, String)> {
    let (name, value) = annotation.split_once(PROPERTY_SEPARATOR)?;
    let name = name.trim();
    (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
}
