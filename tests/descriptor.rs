//! End-to-end emission checks over small fact sheets.

use descgen::config::GenConfig;
use descgen::emit::EmissionDescriptor;
use descgen::facts::FactSheet;
use descgen::generate::Generator;
use descgen::schema::RuleTable;
use serde_json::{json, Value};

fn emit_with(config: &GenConfig, sheet: Value) -> Vec<EmissionDescriptor> {
    let sheet = FactSheet::from_value(sheet).expect("valid fact sheet");
    let (rules, rejected) = RuleTable::load(&config.rules);
    assert!(rejected.is_empty(), "{rejected:?}");
    let generator = Generator::new(&sheet, config, &rules);
    generator
        .generate_all(&sheet.requests)
        .into_iter()
        .map(|r| r.expect("request resolves"))
        .collect()
}

fn emit(sheet: Value) -> Vec<EmissionDescriptor> {
    emit_with(&GenConfig::default(), sheet)
}

fn emit_one(record: Value) -> EmissionDescriptor {
    let name = record["name"].as_str().unwrap().to_owned();
    emit(json!({ "records": [record], "requests": [{"record": name}] })).remove(0)
}

#[test]
fn plain_class_gets_every_wrapper() {
    let d = emit_one(json!({"name": "Event", "file": "inc\\Event.h", "line": 12}));
    assert!(d.wrappers.contains("static void *new_Event(void *p) {"));
    assert!(d.wrappers.contains("return  p ? ::new((::ROOT::TOperatorNewHelper*)p) ::Event : new ::Event;"));
    assert!(d.wrappers.contains("static void *newArray_Event(Long_t nElements, void *p) {"));
    assert!(d.wrappers.contains("delete ((::Event*)p);"));
    assert!(d.wrappers.contains("delete [] ((::Event*)p);"));
    assert!(d.wrappers.contains("((current_t*)p)->~current_t();"));
    assert!(d.wrappers.contains("} // end of namespace ROOT for class ::Event"));

    let r = &d.registration;
    assert!(r.contains("instance(\"Event\", 0, \"inc/Event.h\", 12,"));
    assert!(r.contains("new ::TIsAProxy(typeid(::Event),0)"));
    assert!(r.contains("&Event_Dictionary, isa_proxy, 0,"));
    assert!(r.contains("instance.SetNewArray(&newArray_Event);"));
    assert!(r.contains("instance.SetDestructor(&destruct_Event);"));
    assert!(r.contains("TGenericClassInfo *GenerateInitInstance(const ::Event*)"));
    assert!(r.contains("static void Event_TClassManip(TClass* ){"));
    assert!(d.diagnostics.is_empty());
}

#[test]
fn destructor_access_controls_delete_wrappers() {
    let private = emit_one(json!({"name": "Locked", "destructor": {"access": "private"}}));
    assert!(!private.wrappers.contains("delete_Locked"));
    assert!(!private.registration.contains("SetDelete"));
    // arrays need both halves
    assert!(!private.wrappers.contains("newArray_Locked"));
    assert!(private.wrappers.contains("new_Locked"));

    let public = emit_one(json!({"name": "Open", "destructor": {"access": "public"}}));
    assert!(public.registration.contains("instance.SetDelete(&delete_Open);"));
}

#[test]
fn io_constructor_marker_is_passed() {
    let d = emit_one(json!({
        "name": "Hit",
        "constructors": [
            {"access": "public", "params": [{"type": "int"}]},
            {"access": "public", "params": [{"type": "TRootIOCtor*"}]}
        ]
    }));
    assert!(d.wrappers.contains("new ::Hit( (TRootIOCtor *)0 );"));
    assert!(!d.wrappers.contains("newArray_Hit"));

    let custom = GenConfig::default().with_overrides(&["MyIOCtor".into()], &[]);
    let d = emit_with(
        &custom,
        json!({
            "records": [{
                "name": "Cluster",
                "constructors": [{"access": "public", "params": [{"type": "MyIOCtor *"}]}]
            }],
            "requests": [{"record": "Cluster"}]
        }),
    )
    .remove(0);
    assert!(d.wrappers.contains("new ::Cluster( (MyIOCtor *)0 );"));
}

#[test]
fn abstract_and_incomplete_types_cannot_be_built() {
    let shape = emit_one(json!({"name": "Shape", "abstract": true}));
    assert!(!shape.wrappers.contains("new_Shape"));
    assert!(shape.registration.contains("SetDelete(&delete_Shape)"));

    let forward = emit_one(json!({"name": "Forward", "complete": false}));
    assert!(!forward.registration.contains("SetNew"));
    assert!(!forward.registration.contains("SetDelete"));
    assert_eq!(forward.diagnostics.len(), 1);
    assert_eq!(forward.diagnostics[0].kind, "unresolvable");
}

#[test]
fn derived_plain_new_hides_base_placement_new() {
    let out = emit(json!({
        "records": [
            {"name": "Pool", "methods": [{"name": "operator new", "proto": "size_t, void*"}]},
            {
                "name": "Pooled",
                "bases": [{"name": "Pool"}],
                "methods": [{"name": "operator new", "proto": "size_t"}]
            }
        ],
        "requests": [{"record": "Pool"}, {"record": "Pooled"}]
    }));
    assert!(out[0].wrappers.contains("return  p ? new(p) ::Pool : new ::Pool;"));
    assert!(out[0].diagnostics.is_empty());

    assert!(out[1].wrappers.contains("return  p ? ::new((::ROOT::TOperatorNewHelper*)p) ::Pooled : new ::Pooled;"));
    assert_eq!(out[1].diagnostics.len(), 1);
    assert_eq!(out[1].diagnostics[0].kind, "hidden");
}

#[test]
fn private_operator_new_revokes_construction() {
    let d = emit_one(json!({
        "name": "Singleton",
        "methods": [{"name": "operator new", "proto": "size_t", "access": "private"}]
    }));
    assert!(!d.wrappers.contains("new_Singleton"));
    assert!(!d.registration.contains("SetNew"));
}

#[test]
fn class_def_types_use_their_own_dictionary() {
    let d = emit_one(json!({
        "name": "ns::Track",
        "file": "Track.h",
        "line": 40,
        "methods": [
            {"name": "Dictionary", "proto": ""},
            {"name": "IsA", "proto": ""},
            {"name": "Class_Version", "proto": ""},
            {"name": "Streamer", "proto": "TBuffer&"}
        ]
    }));
    let r = &d.registration;
    assert!(r.contains("instance(\"ns::Track\", ::ns::Track::Class_Version(), \"Track.h\", 40,"));
    assert!(r.contains("new ::TInstrumentedIsAProxy< ::ns::Track >(0)"));
    assert!(r.contains("&::ns::Track::Dictionary, isa_proxy, 16,"));
    assert!(r.contains("instance.SetStreamerFunc(&streamer_nscLcLTrack);"));
    assert!(!r.contains("_TClassManip"));
    assert!(d.wrappers.contains("((::ns::Track*)obj)->::ns::Track::Streamer(buf);"));
}

#[test]
fn only_register_class_leaves_streamer_unhooked() {
    let out = emit(json!({
        "records": [{"name": "Raw", "methods": [{"name": "Streamer", "proto": "TBuffer &"}]}],
        "requests": [
            {"record": "Raw", "only_register_class": true},
            {"record": "Raw", "wants_streamer_info": true}
        ]
    }));
    for d in &out {
        assert!(!d.wrappers.contains("streamer_Raw"));
        assert!(!d.registration.contains("SetStreamerFunc"));
    }
    assert!(out[0].registration.contains("&Raw_Dictionary, isa_proxy, 0,"));
    assert!(out[1].registration.contains("&Raw_Dictionary, isa_proxy, 4,"));
}

#[test]
fn merge_and_reset_wrappers() {
    let new_style = emit_one(json!({
        "name": "Histo",
        "methods": [
            {"name": "Merge", "proto": "TCollection*, TFileMergeInfo*"},
            {"name": "Merge", "proto": "TCollection*"},
            {"name": "ResetAfterMerge", "proto": "TFileMergeInfo*"},
            {"name": "DirectoryAutoAdd", "proto": "TDirectory*"}
        ]
    }));
    assert!(new_style.wrappers.contains("return ((::Histo*)obj)->Merge(coll,info);"));
    assert!(!new_style.wrappers.contains("->Merge(coll);"));
    assert!(new_style.wrappers.contains("((::Histo*)obj)->ResetAfterMerge(info);"));
    assert!(new_style.registration.contains("instance.SetMerge(&merge_Histo);"));
    assert!(new_style.registration.contains("instance.SetResetAfterMerge(&reset_Histo);"));
    assert!(new_style.registration.contains("instance.SetDirectoryAutoAdd(&directoryAutoAdd_Histo);"));

    let old_style = emit_one(json!({
        "name": "Graph",
        "methods": [
            {"name": "Merge", "proto": "TCollection*"},
            {"name": "ResetAfterMerge", "proto": "TFileMergeInfo*", "access": "protected"}
        ]
    }));
    assert!(old_style.wrappers.contains("static Long64_t  merge_Graph(void *obj,TCollection *coll,TFileMergeInfo *) {"));
    assert!(old_style.wrappers.contains("return ((::Graph*)obj)->Merge(coll);"));
    assert!(!old_style.registration.contains("SetResetAfterMerge"));
}

#[test]
fn version_precedence() {
    let out = emit(json!({
        "records": [
            {"name": "std::bitset<8>", "methods": [{"name": "Class_Version", "proto": ""}]},
            {"name": "Legacy"},
            {"name": "Generated"},
            {"name": "Pinned", "methods": [{"name": "Class_Version", "proto": ""}]}
        ],
        "namespaces": {
            "": [
                {"name": "GetClassVersion", "proto": "Legacy *"},
                {"name": "GetClassVersion", "proto": "Generated*", "user_defined": false}
            ]
        },
        "requests": [
            {"record": "std::bitset<8>"},
            {"record": "Legacy"},
            {"record": "Generated"},
            {"record": "Generated", "version": 5},
            {"record": "Pinned", "version": 5}
        ]
    }));
    assert!(out[0].registration.contains("instance(\"bitset<8>\", 2,"));
    assert!(out[1].registration.contains("instance(\"Legacy\", GetClassVersion< Legacy >(),"));
    assert!(out[2].registration.contains("instance(\"Generated\", 0,"));
    assert!(out[3].registration.contains("instance(\"Generated\", 5,"));
    assert!(out[3].registration.contains("isa_proxy, 8,"));
    assert!(out[4].registration.contains("instance(\"Pinned\", ::Pinned::Class_Version(),"));
}

#[test]
fn containers_get_collection_proxies() {
    let out = emit(json!({
        "records": [
            {"name": "std::vector<int,std::allocator<int> >", "template_instance": true},
            {"name": "std::map<int,float>", "template_instance": true},
            {"name": "std::set<int>", "template_instance": true},
            {"name": "std::bitset<16>", "template_instance": true}
        ],
        "requests": [
            {"record": "std::vector<int,std::allocator<int> >"},
            {"record": "std::vector<int,std::allocator<int> >", "name": "vector<int>"},
            {"record": "std::map<int,float>"},
            {"record": "std::set<int>"},
            {"record": "std::bitset<16>"}
        ]
    }));
    assert_eq!(out[0].type_name, "vector<int>");
    assert_eq!(out[0].type_name, out[1].type_name);
    assert_eq!(out[0].render(), out[1].render());

    let vector = &out[0].registration;
    assert!(vector.contains("instance(\"vector<int>\", -2,"));
    assert!(vector.contains("typeid(vector<int>), DefineBehavior(ptr, ptr),"));
    assert!(vector.contains("TCollectionProxyInfo::Pushback< vector<int> >()"));
    assert!(!vector.contains("TGenericClassInfo *GenerateInitInstance(const"));

    assert!(out[2].registration.contains("TCollectionProxyInfo::MapInsert< map<int,float> >()"));
    assert!(out[3].registration.contains("TCollectionProxyInfo::Insert< set<int> >()"));
    assert!(out[4]
        .registration
        .contains("TCollectionProxyInfo::Pushback<TStdBitsetHelper< bitset<16> > >()"));
}

#[test]
fn user_class_named_like_a_container_is_a_plain_class() {
    let out = emit(json!({
        "records": [
            {"name": "list<int>", "template_instance": true},
            {"name": "std::list<int>", "template_instance": true}
        ],
        "requests": [
            {"record": "list<int>"},
            {"record": "std::list<int>"}
        ]
    }));
    let user = &out[0].registration;
    assert!(user.contains("instance(\"list<int>\", 0,"));
    assert!(!user.contains("AdoptCollectionProxyInfo"));
    assert!(!user.contains("TCollectionProxyInfo"));
    assert!(user.contains("TGenericClassInfo *GenerateInitInstance(const"));

    let std = &out[1].registration;
    assert!(std.contains("instance(\"list<int>\", -2,"));
    assert!(std.contains("TCollectionProxyInfo::Pushback< list<int> >()"));
    assert!(!std.contains("TGenericClassInfo *GenerateInitInstance(const"));
}

#[test]
fn class_manip_forwards_properties_and_transient_members() {
    let d = emit_one(json!({
        "name": "Calib",
        "annotations": ["owner@@@tracking", "name@@@Calibration", "plain comment"],
        "fields": [
            {"name": "fGain", "type": "float"},
            {"name": "fCache", "type": "int", "comment": "//! rebuilt on read"},
            {"name": "fScratch", "type": "double*", "comment": "//!"}
        ]
    }));
    let r = &d.registration;
    assert!(r.contains("static void Calib_TClassManip(TClass* theClass){"));
    assert!(r.contains("theClass->CreateAttributeMap();"));
    assert!(r.contains("attrMap->AddProperty(\"owner\",\"tracking\");"));
    assert!(!r.contains("Calibration"));
    assert!(r.contains("TDataMember* theMember = theClass->GetDataMember(\"fCache\");"));
    assert!(r.contains("      theMember = theClass->GetDataMember(\"fScratch\");"));
    assert!(!r.contains("GetDataMember(\"fGain\")"));
    assert_eq!(r.matches("theMember->ResetBit(BIT(2));").count(), 2);
}

#[test]
fn schema_rules_are_validated_per_type() {
    let config = GenConfig::from_json_str(
        r#"{
            "rules": {
                "read": [
                    "sourceClass=\"Event\" version=\"[1-2]\" source=\"int fOld\" target=\"fN\" code=\"{ fN = onfile.fOld; }\"",
                    {"sourceClass": "Event", "targetClass": "Event", "target": ["fGone"], "code": "{ fGone = 0; }"}
                ],
                "readraw": [
                    "sourceClass=\"Event\" target=\"fN\" code=\"{ b >> fN; }\""
                ]
            }
        }"#,
    )
    .unwrap();
    let d = emit_with(
        &config,
        json!({
            "records": [{"name": "Event", "fields": [{"name": "fN", "type": "int", "integral": true}]}],
            "requests": [{"record": "Event"}]
        }),
    )
    .remove(0);

    let r = &d.registration;
    assert!(r.contains("static void read_Event_0( char* target, TVirtualObject *oldObj )"));
    assert!(r.contains("int& fN = *(int*)(target+offset_fN);"));
    assert!(r.contains("std::vector<ROOT::TSchemaHelper> readrules(1);"));
    assert!(r.contains("rule->fVersion     = \"[1-2]\";"));
    assert!(r.contains("instance.SetReadRules( readrules );"));
    assert!(r.contains("static void readraw_Event_0( char* target, TBuffer &b )"));
    assert!(r.contains("instance.SetReadRawRules( readrawrules );"));
    assert!(!r.contains("fGone"));

    assert_eq!(d.diagnostics.len(), 1);
    assert_eq!(d.diagnostics[0].member.as_deref(), Some("fGone"));
    assert_eq!(d.diagnostics[0].kind, "not-found");
}

#[test]
fn opaque_alias_suppresses_public_init_instance() {
    let d = emit_one(json!({"name": "Holder<Double32_t>", "template_instance": true}));
    assert_eq!(d.type_name, "Holder<Double32_t>");
    assert!(!d.registration.contains("TGenericClassInfo *GenerateInitInstance(const"));
    // template instances always get the local dictionary
    assert!(d.registration.contains("static void HolderlEDouble32_tgR_Dictionary();"));
}
