//! Wrapper functions the registry calls instead of the type's own
//! operators: construction, destruction, streaming and merging.
use super::EmitContext;

pub fn write_aux_functions(out: &mut String, ctx: &EmitContext<'_>) {
    let profile = ctx.profile;
    let mapped = &ctx.symbols.mapped;
    let csym = &ctx.symbols.csymbol;

    out.push_str("namespace ROOT {\n");

    if profile.has_io_constructor {
        let args = &profile.io_constructor_arg;
        let placement = if profile.has_operator_new_placement() {
            "new(p) "
        } else {
            "::new((::ROOT::TOperatorNewHelper*)p) "
        };
        out.push_str("   // Wrappers around operator new\n");
        out.push_str(&format!("   static void *new_{mapped}(void *p) {{\n"));
        out.push_str(&format!("      return  p ? {placement}{csym}{args} : new {csym}{args};\n"));
        out.push_str("   }\n");

        if profile.supports_arrays() {
            let placement = if profile.has_operator_new_array_placement() {
                "new(p) "
            } else {
                "::new((::ROOT::TOperatorNewHelper*)p) "
            };
            out.push_str(&format!("   static void *newArray_{mapped}(Long_t nElements, void *p) {{\n"));
            out.push_str(&format!("      return p ? {placement}{csym}[nElements] : new {csym}[nElements];\n"));
            out.push_str("   }\n");
        }
    }

    if profile.needs_destructor {
        out.push_str("   // Wrapper around operator delete\n");
        out.push_str(&format!("   static void delete_{mapped}(void *p) {{\n"));
        out.push_str(&format!("      delete (({csym}*)p);\n"));
        out.push_str("   }\n");
        out.push_str(&format!("   static void deleteArray_{mapped}(void *p) {{\n"));
        out.push_str(&format!("      delete [] (({csym}*)p);\n"));
        out.push_str("   }\n");
        out.push_str(&format!("   static void destruct_{mapped}(void *p) {{\n"));
        out.push_str(&format!("      typedef {csym} current_t;\n"));
        out.push_str("      ((current_t*)p)->~current_t();\n");
        out.push_str("   }\n");
    }

    if profile.has_directory_auto_add {
        out.push_str("   // Wrapper around the directory auto add.\n");
        out.push_str(&format!("   static void directoryAutoAdd_{mapped}(void *p, TDirectory *dir) {{\n"));
        out.push_str(&format!("      (({csym}*)p)->DirectoryAutoAdd(dir);\n"));
        out.push_str("   }\n");
    }

    if ctx.streamer_wired() {
        out.push_str("   // Wrapper around a custom streamer member function.\n");
        out.push_str(&format!("   static void streamer_{mapped}(TBuffer &buf, void *obj) {{\n"));
        out.push_str(&format!("      (({csym}*)obj)->{csym}::Streamer(buf);\n"));
        out.push_str("   }\n");
    }

    if profile.has_new_merge {
        out.push_str("   // Wrapper around the merge function.\n");
        out.push_str(&format!(
            "   static Long64_t merge_{mapped}(void *obj,TCollection *coll,TFileMergeInfo *info) {{\n"
        ));
        out.push_str(&format!("      return (({csym}*)obj)->Merge(coll,info);\n"));
        out.push_str("   }\n");
    } else if profile.has_old_merge {
        out.push_str("   // Wrapper around the merge function.\n");
        out.push_str(&format!("   static Long64_t  merge_{mapped}(void *obj,TCollection *coll,TFileMergeInfo *) {{\n"));
        out.push_str(&format!("      return (({csym}*)obj)->Merge(coll);\n"));
        out.push_str("   }\n");
    }

    if profile.has_reset_after_merge {
        out.push_str("   // Wrapper around the Reset function.\n");
        out.push_str(&format!("   static void reset_{mapped}(void *obj,TFileMergeInfo *info) {{\n"));
        out.push_str(&format!("      (({csym}*)obj)->ResetAfterMerge(info);\n"));
        out.push_str("   }\n");
    }

    out.push_str(&format!("}} // end of namespace ROOT for class {csym}\n\n"));
}
