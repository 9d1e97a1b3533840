use dexgraph_core::{NO_INDEX, ReadError};

use crate::test_utils::TableIdx;
use crate::{
    AccessFlags, AnnotationElement, AnnotationVisibility, ClassDef, DexAnnotation, DexAnnotationSet,
    DexClass, DexContext, DexEncodedAnnotation, EncodedValue, LoadError,
};

#[test]
fn class_def_read() {
    let words: [u32; 8] = [3, 0x11, NO_INDEX, 0x40, 7, 0, 0x80, 0x90];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

    let def = ClassDef::read(&bytes).unwrap();

    assert_eq!(
        def,
        ClassDef {
            class_idx: 3,
            access_flags: 0x11,
            superclass_idx: NO_INDEX,
            interfaces_off: 0x40,
            source_file_idx: 7,
            annotations_off: 0,
            class_data_off: 0x80,
            static_values_off: 0x90,
        }
    );
    assert!(matches!(
        ClassDef::read(&bytes[..ClassDef::SIZE - 1]),
        Err(ReadError::UnexpectedEof { .. })
    ));
}

/// `LFoo;` with one static field, one instance field and a constructor.
fn sample_idx(ctx: &DexContext) -> TableIdx {
    let data = vec![
        0x00, 0x00, 0x00, 0x00, // padding so class data sits at a nonzero offset
        0x01, 0x01, 0x01, 0x00, // class_data_item sizes
        0x00, 0x0a, // static field 0, private static
        0x01, 0x02, // instance field 1, private
        0x00, 0x81, 0x80, 0x04, 0x00, // method 0, public constructor, no code
        0x00, 0x00, 0x00, // pad
        0x01, 0x04, 0x2a, // static values: [int 42]
        0x00, // pad
        0x01, 0x00, 0x00, 0x00, 0x02, 0x00, // interfaces: [type 2]
    ];
    let foo = ctx.make_type_named("LFoo;");
    let int = ctx.make_type_named("I");
    let mut idx = TableIdx::new(data);
    idx.strings = vec![ctx.make_string("Foo.java")];
    idx.types = vec![
        foo,
        ctx.make_type_named("Ljava/lang/Object;"),
        ctx.make_type_named("LBar;"),
        int,
    ];
    idx.fields = vec![
        ctx.make_field(foo, ctx.make_string("count"), int),
        ctx.make_field(foo, ctx.make_string("value"), int),
    ];
    idx.methods = vec![ctx.make_method_from_descriptors("LFoo;", "<init>", "V", &[])];
    idx
}

fn sample_def() -> ClassDef {
    ClassDef {
        class_idx: 0,
        access_flags: 0x1,
        superclass_idx: 1,
        interfaces_off: 24,
        source_file_idx: 0,
        annotations_off: 0,
        class_data_off: 4,
        static_values_off: 20,
    }
}

#[test]
fn load_defines_members() {
    let ctx = DexContext::new();
    let idx = sample_idx(&ctx);

    let class = DexClass::load(&ctx, &idx, &sample_def()).unwrap();

    assert_eq!(class.self_type(), idx.types[0]);
    assert_eq!(class.super_class(), Some(idx.types[1]));
    assert_eq!(class.access(), AccessFlags::PUBLIC);
    assert_eq!(class.source_file(), Some(idx.strings[0]));
    let interfaces = ctx.type_list(class.interfaces().unwrap());
    assert_eq!(&*interfaces, &[idx.types[2]]);
    assert!(class.annotations().is_none());
    assert!(!class.is_external());
    assert!(class.has_class_data());

    assert_eq!(class.static_fields(), &[idx.fields[0]]);
    assert_eq!(class.instance_fields(), &[idx.fields[1]]);
    assert_eq!(class.direct_methods(), &[idx.methods[0]]);
    assert!(class.virtual_methods().is_empty());

    let count = ctx.field(idx.fields[0]);
    assert!(count.is_concrete());
    assert_eq!(count.access(), AccessFlags::PRIVATE | AccessFlags::STATIC);
    assert_eq!(count.static_value(), Some(&EncodedValue::Int(42)));
    drop(count);
    assert_eq!(ctx.field(idx.fields[1]).static_value(), None);

    let init = ctx.method(idx.methods[0]);
    assert!(init.is_concrete());
    assert!(!init.is_virtual());
    assert!(init.access().is_constructor());
    assert!(init.code().is_none());
}

#[test]
fn load_twice_is_a_duplicate() {
    let ctx = DexContext::new();
    let idx = sample_idx(&ctx);
    DexClass::load(&ctx, &idx, &sample_def()).unwrap();

    assert_eq!(
        DexClass::load(&ctx, &idx, &sample_def()).unwrap_err(),
        LoadError::DuplicateField(idx.fields[0])
    );
}

#[test]
fn member_listed_twice_is_a_duplicate() {
    let ctx = DexContext::new();
    let mut idx = sample_idx(&ctx);
    idx.data = vec![0, 0, 0, 0, 0x00, 0x00, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00];
    let def = ClassDef {
        class_data_off: 4,
        ..ClassDef::default()
    };

    assert_eq!(
        DexClass::load(&ctx, &idx, &def).unwrap_err(),
        LoadError::DuplicateMethod(idx.methods[0])
    );
    assert!(!ctx.method(idx.methods[0]).is_concrete());
}

#[test]
fn failed_load_leaves_members_untouched() {
    let ctx = DexContext::new();
    let mut idx = sample_idx(&ctx);
    // static field 0, then a direct method index past the method table
    idx.data = vec![0, 0, 0, 0, 0x01, 0x00, 0x01, 0x00, 0x00, 0x08, 0x05, 0x01, 0x00];
    let def = ClassDef {
        class_data_off: 4,
        ..ClassDef::default()
    };

    assert!(matches!(
        DexClass::load(&ctx, &idx, &def),
        Err(LoadError::Resolve(_))
    ));
    assert!(!ctx.field(idx.fields[0]).is_concrete());
}

#[test]
fn external_class_becomes_defined_once() {
    let ctx = DexContext::new();
    let ty = ctx.make_type_named("LFoo;");
    let object = ctx.make_type_named("Ljava/lang/Object;");
    let mut class = DexClass::new_external(ty);
    assert!(class.is_external());
    assert!(!class.has_class_data());

    class.make_defined(AccessFlags::PUBLIC | AccessFlags::FINAL, Some(object));

    assert!(!class.is_external());
    assert!(class.has_class_data());
    assert_eq!(class.super_class(), Some(object));
    class.set_source_file(Some(ctx.make_string("Foo.java")));
}

#[test]
#[should_panic(expected = "is external; its member lists are read-only")]
fn external_class_lists_are_read_only() {
    let ctx = DexContext::new();
    let mut class = DexClass::new_external(ctx.make_type_named("LFoo;"));

    class.static_fields_mut();
}

#[test]
#[should_panic(expected = "is already defined")]
fn defined_class_cannot_be_defined_again() {
    let ctx = DexContext::new();
    let mut class = DexClass::new(ctx.make_type_named("LFoo;"), AccessFlags::PUBLIC, None);

    class.make_defined(AccessFlags::PUBLIC, None);
}

#[test]
fn gather_visits_class_then_members() {
    let ctx = DexContext::new();
    let idx = sample_idx(&ctx);
    let class = DexClass::load(&ctx, &idx, &sample_def()).unwrap();

    let mut types = Vec::new();
    class.gather_types(&ctx, &mut types);
    let mut strings = Vec::new();
    class.gather_strings(&ctx, &mut strings);
    let mut fields = Vec::new();
    class.gather_fields(&ctx, &mut fields);
    let mut methods = Vec::new();
    class.gather_methods(&ctx, &mut methods);

    let [foo, object, bar, int] = idx.types[..] else {
        unreachable!()
    };
    assert_eq!(&types[..3], &[foo, object, bar]);
    assert!(types[3..].contains(&int));
    assert_eq!(strings[0], idx.strings[0]);
    assert_eq!(fields, idx.fields);
    assert_eq!(methods, idx.methods);
}

#[test]
fn empty_class_data_still_counts() {
    let ctx = DexContext::new();
    let mut idx = sample_idx(&ctx);
    idx.data = vec![0, 0, 0, 0, 0x00, 0x00, 0x00, 0x00];
    let with_data = ClassDef {
        class_data_off: 4,
        ..ClassDef::default()
    };

    let class = DexClass::load(&ctx, &idx, &with_data).unwrap();
    assert!(class.has_class_data());
    assert!(class.static_fields().is_empty());
    assert!(class.direct_methods().is_empty());

    let class = DexClass::load(&ctx, &idx, &ClassDef::default()).unwrap();
    assert!(!class.has_class_data());
}

/// Annotation item at 0, a set holding it at 8, directory at 16 listing
/// field 0 under `fields`.
fn annotated_idx(ctx: &DexContext, field_entries: &[u32]) -> TableIdx {
    let mut idx = sample_idx(ctx);
    let mut data = vec![
        0x01, 0x00, 0x01, 0x00, 0x04, 0x05, // runtime, type 0, value = 5
        0x00, 0x00, // pad
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // set -> 0
    ];
    let header = [0, (field_entries.len() / 2) as u32, 0, 0];
    data.extend(header.iter().chain(field_entries).flat_map(|w| w.to_le_bytes()));
    idx.data = data;
    idx
}

#[test]
fn field_annotated_twice_is_a_duplicate() {
    let ctx = DexContext::new();
    let idx = annotated_idx(&ctx, &[0, 8, 0, 8]);
    let def = ClassDef {
        annotations_off: 16,
        ..ClassDef::default()
    };

    assert_eq!(
        DexClass::load(&ctx, &idx, &def).unwrap_err(),
        LoadError::DuplicateField(idx.fields[0])
    );
    assert!(ctx.field(idx.fields[0]).annotations().is_none());
}

#[test]
fn loaded_annotations_come_back_as_directory() {
    let ctx = DexContext::new();
    let mut idx = annotated_idx(&ctx, &[0, 8]);
    let class_data_off = idx.data.len() as u32;
    idx.data.extend([0x01, 0x00, 0x00, 0x00, 0x00, 0x0a]); // static field 0
    let def = ClassDef {
        annotations_off: 16,
        class_data_off,
        ..ClassDef::default()
    };

    let class = DexClass::load(&ctx, &idx, &def).unwrap();
    let dir = class.annotation_directory(&ctx).unwrap();

    assert!(dir.class.is_none());
    assert_eq!(dir.fields.len(), 1);
    assert_eq!(dir.fields[0].0, idx.fields[0]);
    assert_eq!(dir.fields[0].1.len(), 1);
    assert!(dir.methods.is_empty());
    assert!(dir.params.is_empty());
}

#[test]
fn unannotated_class_has_no_directory() {
    let ctx = DexContext::new();
    let idx = sample_idx(&ctx);
    let class = DexClass::load(&ctx, &idx, &sample_def()).unwrap();

    assert_eq!(class.annotation_directory(&ctx), None);
}

#[test]
fn directory_lists_members_in_dex_order() {
    let ctx = DexContext::new();
    let foo = ctx.make_type_named("LFoo;");
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, None);
    class.set_annotations(Some(DexAnnotationSet::new()));
    let b = ctx.make_method_from_descriptors("LFoo;", "b", "V", &[]);
    let a = ctx.make_method_from_descriptors("LFoo;", "a", "V", &[]);
    for method in [b, a] {
        let mut m = ctx.method_mut(method);
        m.attach_annotation_set(DexAnnotationSet::new());
        m.make_concrete(AccessFlags::PUBLIC, None, true);
        class.virtual_methods_mut().push(method);
    }
    let c = ctx.make_method_from_descriptors("LFoo;", "c", "V", &["I"]);
    {
        let mut m = ctx.method_mut(c);
        m.attach_param_annotation_set(0, DexAnnotationSet::new());
        m.make_concrete(AccessFlags::PRIVATE, None, false);
    }
    class.direct_methods_mut().push(c);

    let dir = class.annotation_directory(&ctx).unwrap();

    assert!(dir.class.is_some());
    assert!(dir.fields.is_empty());
    let methods: Vec<_> = dir.methods.iter().map(|(m, _)| *m).collect();
    assert_eq!(methods, vec![a, b]);
    assert_eq!(dir.params.len(), 1);
    assert_eq!(dir.params[0].0, c);
}

#[test]
fn static_values_fill_gaps_and_drop_trailing_zeros() {
    let ctx = DexContext::new();
    let foo = ctx.make_type_named("LFoo;");
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, None);
    let statics = [
        ("a", "I", None),
        ("b", "Ljava/lang/String;", None),
        ("c", "J", Some(EncodedValue::Long(7))),
        ("d", "Z", None),
        ("e", "I", Some(EncodedValue::Int(0))),
    ];
    for (name, ty, value) in statics {
        let field = ctx.make_field(foo, ctx.make_string(name), ctx.make_type_named(ty));
        ctx.field_mut(field)
            .make_concrete(AccessFlags::STATIC, value);
        class.static_fields_mut().insert(0, field);
    }

    assert_eq!(
        class.static_values(&ctx),
        Some(vec![
            EncodedValue::Int(0),
            EncodedValue::Null,
            EncodedValue::Long(7),
        ])
    );
}

#[test]
fn all_zero_statics_have_no_values() {
    let ctx = DexContext::new();
    let foo = ctx.make_type_named("LFoo;");
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, None);
    let field = ctx.make_field(foo, ctx.make_string("x"), ctx.make_type_named("D"));
    ctx.field_mut(field)
        .make_concrete(AccessFlags::STATIC, Some(EncodedValue::Double(0.0)));
    class.static_fields_mut().push(field);

    assert_eq!(class.static_values(&ctx), None);
}

#[test]
fn loaded_static_values_come_back() {
    let ctx = DexContext::new();
    let idx = sample_idx(&ctx);
    let class = DexClass::load(&ctx, &idx, &sample_def()).unwrap();

    assert_eq!(class.static_values(&ctx), Some(vec![EncodedValue::Int(42)]));
}

#[test]
fn become_virtual_moves_method_in_order() {
    let ctx = DexContext::new();
    let foo = ctx.make_type_named("LFoo;");
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, None);
    let [a, b, c] = ["a", "b", "c"].map(|name| ctx.make_method_from_descriptors("LFoo;", name, "V", &[]));
    for (method, is_virtual) in [(a, true), (b, false), (c, true)] {
        ctx.method_mut(method)
            .make_concrete(AccessFlags::PUBLIC, None, is_virtual);
        if is_virtual {
            class.virtual_methods_mut().push(method);
        } else {
            class.direct_methods_mut().push(method);
        }
    }

    class.become_virtual(&ctx, b);

    assert!(class.direct_methods().is_empty());
    assert_eq!(class.virtual_methods(), &[a, b, c]);
    assert!(ctx.method(b).is_virtual());
}

#[test]
#[should_panic(expected = "is not a direct method of class")]
fn become_virtual_needs_a_direct_method() {
    let ctx = DexContext::new();
    let mut class = DexClass::new(ctx.make_type_named("LFoo;"), AccessFlags::PUBLIC, None);
    let run = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);

    class.become_virtual(&ctx, run);
}

#[test]
fn gather_protos_finds_method_type_constants() {
    let ctx = DexContext::new();
    let foo = ctx.make_type_named("LFoo;");
    let int = ctx.make_type_named("I");
    let long = ctx.make_type_named("J");
    let takes_int = ctx.make_proto(long, ctx.make_type_list(vec![int]));
    let takes_nothing = ctx.make_proto(int, ctx.make_type_list(vec![]));
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, None);

    let method_type = ctx.make_type_named("Ljava/lang/invoke/MethodType;");
    let handle = ctx.make_field(foo, ctx.make_string("TYPE"), method_type);
    ctx.field_mut(handle)
        .make_concrete(AccessFlags::STATIC, Some(EncodedValue::MethodType(takes_int)));
    class.static_fields_mut().push(handle);

    let mut set = DexAnnotationSet::new();
    set.push(DexAnnotation {
        visibility: AnnotationVisibility::Build,
        annotation: DexEncodedAnnotation {
            ty: ctx.make_type_named("LSig;"),
            elements: vec![AnnotationElement {
                name: ctx.make_string("value"),
                value: EncodedValue::Array(vec![EncodedValue::MethodType(takes_nothing)]),
            }],
        },
    });
    let run = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    {
        let mut m = ctx.method_mut(run);
        m.attach_annotation_set(set);
        m.make_concrete(AccessFlags::PUBLIC, None, true);
    }
    class.virtual_methods_mut().push(run);

    let mut protos = Vec::new();
    class.gather_protos(&ctx, &mut protos);

    assert_eq!(protos, vec![takes_int, takes_nothing]);
}
