use crate::{AccessFlags, DexClass, DexContext, EncodedValue, Gathered, OutputIdx, OutputIndex};

fn sample_class(ctx: &DexContext) -> DexClass {
    let foo = ctx.make_type_named("LFoo;");
    let object = ctx.make_type_named("Ljava/lang/Object;");
    let mut class = DexClass::new(foo, AccessFlags::PUBLIC, Some(object));

    let count = ctx.make_field(foo, ctx.make_string("count"), ctx.make_type_named("I"));
    ctx.field_mut(count).make_concrete(AccessFlags::PRIVATE, None);
    class.instance_fields_mut().push(count);

    let run = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    ctx.method_mut(run).make_concrete(AccessFlags::PUBLIC, None, true);
    class.virtual_methods_mut().push(run);
    class
}

#[test]
fn gather_closes_over_references() {
    let ctx = DexContext::new();
    let class = sample_class(&ctx);

    let g = Gathered::from_classes(&ctx, std::slice::from_ref(&class));

    for name in ["LFoo;", "Ljava/lang/Object;", "I", "V", "count", "run"] {
        let s = ctx.get_string(name).unwrap();
        assert!(g.strings.contains(&s), "{name} not gathered");
    }
    let shorty = ctx.proto(g.protos[0]).shorty();
    assert!(g.strings.contains(&shorty));
    assert_eq!(g.fields, class.instance_fields());
    assert_eq!(g.methods, class.virtual_methods());
}

#[test]
fn build_numbers_in_dex_order() {
    let ctx = DexContext::new();
    let class = sample_class(&ctx);
    let g = Gathered::from_classes(&ctx, &[class]);

    let idx = OutputIdx::build(&ctx, &g);

    let mut strings: Vec<_> = ctx
        .all_strings()
        .into_iter()
        .filter(|&s| idx.string_index(s).is_some())
        .collect();
    strings.sort_by_key(|&s| idx.string_index(s));
    let names: Vec<_> = strings.iter().map(|&s| ctx.string(s).to_string()).collect();
    assert_eq!(
        names,
        vec!["I", "LFoo;", "Ljava/lang/Object;", "V", "count", "run"]
    );
    assert_eq!(idx.string_count(), 6);
    assert_eq!(idx.type_count(), 4);
    assert_eq!(idx.type_index(ctx.get_type_named("I").unwrap()), Some(0));
    assert_eq!(idx.type_index(ctx.get_type_named("V").unwrap()), Some(3));
}

#[test]
fn build_dedupes() {
    let ctx = DexContext::new();
    let a = ctx.make_string("a");
    let b = ctx.make_string("b");
    let g = Gathered {
        strings: vec![b, a, b, a],
        ..Gathered::new()
    };

    let idx = OutputIdx::build(&ctx, &g);

    assert_eq!(idx.string_count(), 2);
    assert_eq!(idx.string_index(a), Some(0));
    assert_eq!(idx.string_index(b), Some(1));
}

#[test]
fn gather_includes_method_type_constants() {
    let ctx = DexContext::new();
    let mut class = sample_class(&ctx);
    let foo = class.self_type();
    let long = ctx.make_type_named("J");
    let proto = ctx.make_proto(long, ctx.make_type_list(vec![long]));
    let field = ctx.make_field(foo, ctx.make_string("TYPE"), ctx.make_type_named("Ljava/lang/Object;"));
    ctx.field_mut(field)
        .make_concrete(AccessFlags::STATIC, Some(EncodedValue::MethodType(proto)));
    class.static_fields_mut().push(field);

    let g = Gathered::from_classes(&ctx, std::slice::from_ref(&class));

    assert!(g.protos.contains(&proto));
    assert!(g.types.contains(&long));
    assert!(g.strings.contains(&ctx.proto(proto).shorty()));
    let idx = OutputIdx::build(&ctx, &g);
    assert!(idx.proto_index(proto).is_some());
}
