use crate::test_utils::{TableIdx, hex};
use crate::{
    DexCode, DexContext, DexDebugItem, DexInstruction, DexTryItem, EncodeError, InsnRef,
    LoadError, OutputIdx, StringId, TypeId,
};

struct Sample {
    ctx: DexContext,
    s: StringId,
    exc: TypeId,
    index: OutputIdx,
}

fn sample() -> Sample {
    let ctx = DexContext::new();
    let s = ctx.make_string("s");
    let exc = ctx.make_type_named("Ljava/lang/Exception;");
    let mut index = OutputIdx::new();
    index.insert_string(s, 0);
    index.insert_type(exc, 5);
    Sample { ctx, s, exc, index }
}

fn sample_code(s: StringId, exc: TypeId) -> DexCode {
    let mut code = DexCode::new(2, 1, 0);
    code.insns = vec![
        DexInstruction::new(vec![0x001a, 0x0000], Some(InsnRef::String(s))),
        DexInstruction::new(vec![0x000e], None),
    ];
    let handler = vec![(exc, 2)];
    code.tries = vec![
        DexTryItem {
            catches: handler.clone(),
            ..DexTryItem::new(0, 2)
        },
        DexTryItem {
            catches: handler,
            ..DexTryItem::new(2, 1)
        },
    ];
    code
}

#[test]
fn write_pads_and_shares_handlers() {
    let Sample { s, exc, index, .. } = sample();
    let code = sample_code(s, exc);

    let mut out = Vec::new();
    code.write(&index, 0x40, &mut out).unwrap();

    insta::assert_snapshot!(hex(&out), @"02 00 01 00 00 00 02 00 40 00 00 00 03 00 00 00 1a 00 00 00 0e 00 00 00 00 00 00 00 02 00 01 00 02 00 00 00 01 00 01 00 01 01 05 02");
}

#[test]
fn catch_all_handlers() {
    let Sample { exc, index, .. } = sample();
    let mut code = DexCode::new(1, 0, 0);
    code.insns = vec![DexInstruction::new(vec![0x0000], None); 2];
    code.tries = vec![
        DexTryItem {
            catches: vec![(exc, 4)],
            catch_all: Some(6),
            ..DexTryItem::new(0, 1)
        },
        DexTryItem {
            catch_all: Some(6),
            ..DexTryItem::new(1, 1)
        },
    ];

    let mut out = Vec::new();
    code.write(&index, 0, &mut out).unwrap();

    insta::assert_snapshot!(hex(&out[20..]), @"00 00 00 00 01 00 01 00 01 00 00 00 01 00 05 00 02 7f 05 04 06 00 06");
}

#[test]
fn no_tries_means_no_padding() {
    let Sample { index, .. } = sample();
    let mut code = DexCode::new(0, 0, 0);
    code.insns = vec![DexInstruction::new(vec![0x000e], None)];

    let mut out = Vec::new();
    code.write(&index, 0, &mut out).unwrap();

    assert_eq!(out.len(), 18);
}

#[test]
fn load_reads_tries_and_debug() {
    let Sample {
        ctx,
        s,
        exc,
        index,
    } = sample();
    let code = sample_code(s, exc);
    let mut data = Vec::new();
    code.write(&index, 44, &mut data).unwrap();
    data.extend([0x01, 0x00, 0x00]);

    let mut idx = TableIdx::new(data);
    idx.strings = vec![s];
    idx.types = ["I", "J", "Z", "B", "C"]
        .map(|d| ctx.make_type_named(d))
        .into_iter()
        .chain([exc])
        .collect();

    let loaded = DexCode::load(&idx, 0).unwrap();

    assert_eq!(loaded.insns, code.insns);
    assert_eq!(loaded.tries, code.tries);
    assert_eq!(loaded.debug, Some(DexDebugItem::new(1)));
    assert_eq!(loaded.insns_size(), 3);
}

#[test]
fn load_fails_on_unresolved_catch_type() {
    let Sample { s, exc, index, .. } = sample();
    let mut data = Vec::new();
    sample_code(s, exc).write(&index, 0, &mut data).unwrap();
    let mut idx = TableIdx::new(data);
    idx.strings = vec![s];

    assert!(matches!(DexCode::load(&idx, 0), Err(LoadError::Resolve(_))));
}

#[test]
fn too_many_tries_fails() {
    let Sample { index, .. } = sample();
    let mut code = DexCode::new(0, 0, 0);
    code.insns = vec![DexInstruction::new(vec![0x000e], None)];
    code.tries = vec![DexTryItem::new(0, 1); 70_000];

    let mut out = Vec::new();
    assert!(matches!(
        code.write(&index, 0, &mut out),
        Err(EncodeError::TooMany { what: "try items", .. })
    ));
}

#[test]
fn gather_order() {
    let Sample { ctx, s, exc, .. } = sample();
    let local = ctx.make_type_named("LLocal;");
    let mut code = sample_code(s, exc);
    code.insns.push(DexInstruction::new(
        vec![0x0022, 0x0000],
        Some(InsnRef::Type(local)),
    ));

    let mut types = Vec::new();
    code.gather_types(&mut types);
    let mut catch_types = Vec::new();
    code.gather_catch_types(&mut catch_types);
    let mut strings = Vec::new();
    code.gather_strings(&mut strings);

    assert_eq!(types, vec![local, exc, exc]);
    assert_eq!(catch_types, vec![exc, exc]);
    assert_eq!(strings, vec![s]);
}
