//! Registration block: forward declarations, rule functions, the
//! `GenerateInitInstanceLocal` singleton and the static initializer.
use super::{manip, EmitContext};
use crate::container::{ContainerKind, ProxyStrategy};
use crate::request::root_flag;
use crate::schema::write::{write_rule_function, write_schema_list};
use crate::schema::RuleKind;

pub fn write_class_init(out: &mut String, ctx: &EmitContext<'_>) {
    let profile = ctx.profile;
    let mapped = &ctx.symbols.mapped;
    let csym = &ctx.symbols.csymbol;
    let class_name = &ctx.symbols.class_name;

    out.push_str("namespace ROOT {\n");

    // ---- Forward declarations ----
    if ctx.needs_dictionary_function() {
        out.push_str(&format!("   static void {mapped}_Dictionary();\n"));
        out.push_str(&format!("   static void {mapped}_TClassManip(TClass*);\n"));
    }
    if profile.has_io_constructor {
        out.push_str(&format!("   static void *new_{mapped}(void *p = 0);\n"));
        if profile.supports_arrays() {
            out.push_str(&format!("   static void *newArray_{mapped}(Long_t size, void *p);\n"));
        }
    }
    if profile.needs_destructor {
        out.push_str(&format!("   static void delete_{mapped}(void *p);\n"));
        out.push_str(&format!("   static void deleteArray_{mapped}(void *p);\n"));
        out.push_str(&format!("   static void destruct_{mapped}(void *p);\n"));
    }
    if profile.has_directory_auto_add {
        out.push_str(&format!("   static void directoryAutoAdd_{mapped}(void *obj, TDirectory *dir);\n"));
    }
    if ctx.streamer_wired() {
        out.push_str(&format!("   static void streamer_{mapped}(TBuffer &buf, void *obj);\n"));
    }
    if ctx.has_merge() {
        out.push_str(&format!(
            "   static Long64_t merge_{mapped}(void *obj, TCollection *coll,TFileMergeInfo *info);\n"
        ));
    }
    if profile.has_reset_after_merge {
        out.push_str(&format!("   static void reset_{mapped}(void *obj, TFileMergeInfo *info);\n"));
    }

    // ---- Schema evolution functions ----
    for (kind, rules, heading) in [
        (RuleKind::Read, &ctx.rules.read, "   // Schema evolution read functions\n"),
        (RuleKind::ReadRaw, &ctx.rules.read_raw, "   // Schema evolution read raw functions\n"),
    ] {
        if rules.iter().any(|r| r.has_code()) {
            out.push('\n');
            out.push_str(heading);
            for (i, rule) in rules.iter().enumerate() {
                write_rule_function(out, kind, rule, i, class_name, mapped, ctx.members);
            }
        }
    }

    // ---- Singleton initializer ----
    let location = ctx.facts.source_location(ctx.request.record());
    let file = location.file.replace('\\', "/");
    let dictionary = if ctx.needs_dictionary_function() {
        format!("&{mapped}_Dictionary")
    } else {
        format!("&{csym}::Dictionary")
    };
    let mut flags = ctx.request.root_flag();
    if ctx.streamer_wired() {
        flags |= root_flag::CUSTOM_STREAMER;
    }

    out.push_str("\n   // Function generating the singleton type initializer\n");
    out.push_str(&format!("   static TGenericClassInfo *GenerateInitInstanceLocal(const {csym}*)\n"));
    out.push_str("   {\n");
    out.push_str(&format!("      {csym} *ptr = 0;\n"));
    if profile.has_isa_method {
        out.push_str(&format!(
            "      static ::TVirtualIsAProxy* isa_proxy = new ::TInstrumentedIsAProxy< {csym} >(0);\n"
        ));
    } else {
        out.push_str(&format!(
            "      static ::TVirtualIsAProxy* isa_proxy = new ::TIsAProxy(typeid({csym}),0);\n"
        ));
    }
    out.push_str("      static ::ROOT::TGenericClassInfo \n");
    out.push_str(&format!(
        "         instance(\"{class_name}\", {}, \"{file}\", {},\n",
        version_expression(ctx),
        location.line
    ));
    out.push_str(&format!("                  typeid({csym}), DefineBehavior(ptr, ptr),\n"));
    out.push_str(&format!("                  {dictionary}, isa_proxy, {flags},\n"));
    out.push_str(&format!("                  sizeof({csym}) );\n"));

    if profile.has_io_constructor {
        out.push_str(&format!("      instance.SetNew(&new_{mapped});\n"));
        if profile.supports_arrays() {
            out.push_str(&format!("      instance.SetNewArray(&newArray_{mapped});\n"));
        }
    }
    if profile.needs_destructor {
        out.push_str(&format!("      instance.SetDelete(&delete_{mapped});\n"));
        out.push_str(&format!("      instance.SetDeleteArray(&deleteArray_{mapped});\n"));
        out.push_str(&format!("      instance.SetDestructor(&destruct_{mapped});\n"));
    }
    if profile.has_directory_auto_add {
        out.push_str(&format!("      instance.SetDirectoryAutoAdd(&directoryAutoAdd_{mapped});\n"));
    }
    if ctx.streamer_wired() {
        out.push_str(&format!("      instance.SetStreamerFunc(&streamer_{mapped});\n"));
    }
    if ctx.has_merge() {
        out.push_str(&format!("      instance.SetMerge(&merge_{mapped});\n"));
    }
    if profile.has_reset_after_merge {
        out.push_str(&format!("      instance.SetResetAfterMerge(&reset_{mapped});\n"));
    }

    match ctx.proxy.kind.proxy_strategy() {
        Some(ProxyStrategy::Bitset) => out.push_str(&format!(
            "      instance.AdoptCollectionProxyInfo(TCollectionProxyInfo::Generate(TCollectionProxyInfo::Pushback<TStdBitsetHelper< {class_name} > >()));\n"
        )),
        Some(strategy) => out.push_str(&format!(
            "      instance.AdoptCollectionProxyInfo(TCollectionProxyInfo::Generate(TCollectionProxyInfo::{}< {class_name} >()));\n",
            strategy.helper()
        )),
        None => {}
    }

    if !ctx.rules.read.is_empty() || !ctx.rules.read_raw.is_empty() {
        out.push_str("\n      ROOT::TSchemaHelper* rule;\n");
    }
    write_schema_list(out, RuleKind::Read, &ctx.rules.read, mapped);
    write_schema_list(out, RuleKind::ReadRaw, &ctx.rules.read_raw, mapped);

    out.push_str("      return &instance;\n");
    out.push_str("   }\n");

    // Standard-library instantiations are not unique across libraries.
    let std_not_string = ctx.facts.is_in_std_scope(ctx.request.record()) && !profile.is_std_string;
    if !std_not_string && !ctx.normalizer.has_opaque_alias(class_name) {
        out.push_str(&format!("   TGenericClassInfo *GenerateInitInstance(const {csym}*)\n"));
        out.push_str("   {\n");
        out.push_str(&format!("      return GenerateInitInstanceLocal(({csym}*)0);\n"));
        out.push_str("   }\n");
    }

    out.push_str("   // Static variable to force the class initialization\n");
    // one line, R__UseDummy relies on it
    out.push_str(&format!(
        "   static ::ROOT::TGenericClassInfo *_R__UNIQUE_(Init) = GenerateInitInstanceLocal((const {csym}*)0x0); R__UseDummy(_R__UNIQUE_(Init));\n"
    ));

    if ctx.needs_dictionary_function() {
        manip::write_dictionary(out, ctx);
    }

    out.push_str("} // end of namespace ROOT\n\n");
}

/// Version argument of the class info, first match wins.
pub fn version_expression(ctx: &EmitContext<'_>) -> String {
    let profile = ctx.profile;
    match ctx.proxy.kind {
        ContainerKind::Bitset => return "2".into(),
        kind if kind.is_container() => return "-2".into(),
        _ => {}
    }
    if profile.has_class_version_method {
        return format!("{}::Class_Version()", ctx.symbols.csymbol);
    }
    if let Some(version) = ctx.request.requested_version() {
        return version.to_string();
    }
    let class_name = &ctx.symbols.class_name;
    let user_accessor = ctx
        .facts
        .find_free_function(ctx.request.record(), "GetClassVersion", &format!("{class_name}*"))
        .is_some_and(|f| f.user_defined);
    if user_accessor {
        return format!("GetClassVersion< {class_name} >()");
    }
    "0".into()
}
