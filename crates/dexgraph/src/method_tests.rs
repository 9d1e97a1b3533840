use crate::{AccessFlags, DexAnnotationSet, DexCode, DexContext, DexInstruction, InsnRef};

#[test]
fn make_concrete_takes_code() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    let mut method = ctx.method_mut(id);

    method.make_concrete(AccessFlags::PUBLIC, Some(DexCode::new(1, 1, 0)), true);

    assert!(method.is_concrete());
    assert!(method.is_virtual());
    assert_eq!(method.code().map(|c| c.registers_size), Some(1));
    assert_eq!(method.take_code().map(|c| c.ins_size), Some(1));
    assert!(method.code().is_none());
}

#[test]
#[should_panic(expected = "bare reference")]
fn access_on_reference_panics() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);

    ctx.method(id).access();
}

#[test]
#[should_panic(expected = "already external")]
fn external_twice_panics() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    let mut method = ctx.method_mut(id);

    method.set_external();
    method.set_external();
}

#[test]
#[should_panic(expected = "cannot replace its code")]
fn set_code_on_external_panics() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    let mut method = ctx.method_mut(id);

    method.set_external();
    method.set_code(None);
}

#[test]
fn param_annotations_none_when_empty() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &["I", "I"]);
    let mut method = ctx.method_mut(id);

    assert!(method.param_annotations().is_none());

    method.attach_param_annotation_set(1, DexAnnotationSet::new());

    let params = method.param_annotations().unwrap();
    assert_eq!(params.keys().copied().collect::<Vec<_>>(), vec![1]);
}

#[test]
#[should_panic(expected = "already has annotations on parameter 0")]
fn param_annotations_twice_panics() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &["I"]);
    let mut method = ctx.method_mut(id);

    method.attach_param_annotation_set(0, DexAnnotationSet::new());
    method.attach_param_annotation_set(0, DexAnnotationSet::new());
}

#[test]
#[should_panic(expected = "cannot attach annotations")]
fn annotations_after_concrete_panic() {
    let ctx = DexContext::new();
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &[]);
    let mut method = ctx.method_mut(id);

    method.make_concrete(AccessFlags::PUBLIC, None, false);
    method.attach_annotation_set(DexAnnotationSet::new());
}

#[test]
fn gather_follows_code() {
    let ctx = DexContext::new();
    let callee = ctx.make_method_from_descriptors("LBar;", "helper", "V", &[]);
    let hello = ctx.make_string("hello");
    let id = ctx.make_method_from_descriptors("LFoo;", "run", "V", &["I"]);

    let mut code = DexCode::new(2, 1, 0);
    code.insns = vec![
        DexInstruction::new(vec![0x001a, 0x0000], Some(InsnRef::String(hello))),
        DexInstruction::new(vec![0x1071, 0x0000, 0x0000], Some(InsnRef::Method(callee))),
        DexInstruction::new(vec![0x000e], None),
    ];
    ctx.method_mut(id)
        .make_concrete(AccessFlags::PUBLIC, Some(code), false);

    let foo = ctx.get_type_named("LFoo;").unwrap();
    let void = ctx.get_type_named("V").unwrap();
    let int = ctx.get_type_named("I").unwrap();
    let method = ctx.method(id);

    let mut types = Vec::new();
    method.gather_types(&ctx, &mut types);
    let mut strings = Vec::new();
    method.gather_strings(&ctx, &mut strings);
    let mut methods = Vec::new();
    method.gather_methods(&mut methods);

    let shorty = ctx.proto(method.proto()).shorty();
    assert_eq!(types, vec![foo, void, int]);
    assert_eq!(strings, vec![method.name(), shorty, hello]);
    assert_eq!(methods, vec![callee]);
}
