use crate::test_utils::{TableIdx, hex};
use crate::{DexContext, DexDebugInstruction, DexDebugItem, LoadError, OutputIdx};

const SAMPLE: [u8; 15] = [
    0x0a, 0x02, 0x04, 0x00, // line 10, 2 params: string 3, none
    0x01, 0x02, // advance pc 2
    0x02, 0x7f, // advance line -1
    0x03, 0x01, 0x04, 0x01, // start local v1, string 3, type 0
    0x07, // prologue end
    0x0e, // special
    0x00, // end sequence
];

#[test]
fn load_decodes_program() {
    let ctx = DexContext::new();
    let mut idx = TableIdx::new(SAMPLE.to_vec());
    idx.strings = ["a", "b", "c", "this"].map(|s| ctx.make_string(s)).to_vec();
    idx.types = vec![ctx.make_type_named("LFoo;")];

    let item = DexDebugItem::load(&idx, 0).unwrap();

    let this = idx.strings[3];
    assert_eq!(item.line_start, 10);
    assert_eq!(item.param_names, vec![Some(this), None]);
    assert_eq!(
        item.insns,
        vec![
            DexDebugInstruction::AdvancePc(2),
            DexDebugInstruction::AdvanceLine(-1),
            DexDebugInstruction::StartLocal {
                register: 1,
                name: Some(this),
                ty: Some(idx.types[0]),
            },
            DexDebugInstruction::SetPrologueEnd,
            DexDebugInstruction::Special(0x0e),
        ]
    );
}

#[test]
fn write_appends_end_sequence() {
    let ctx = DexContext::new();
    let this = ctx.make_string("this");
    let ty = ctx.make_type_named("LFoo;");
    let mut index = OutputIdx::new();
    index.insert_string(this, 3);
    index.insert_type(ty, 0);
    let item = DexDebugItem {
        line_start: 10,
        param_names: vec![Some(this), None],
        insns: vec![
            DexDebugInstruction::AdvancePc(2),
            DexDebugInstruction::AdvanceLine(-1),
            DexDebugInstruction::StartLocal {
                register: 1,
                name: Some(this),
                ty: Some(ty),
            },
            DexDebugInstruction::SetPrologueEnd,
            DexDebugInstruction::Special(0x0e),
        ],
    };

    let mut out = Vec::new();
    item.write(&index, &mut out).unwrap();

    insta::assert_snapshot!(hex(&out), @"0a 02 04 00 01 02 02 7f 03 01 04 01 07 0e 00");
}

#[test]
fn missing_end_sequence_fails() {
    let idx = TableIdx::new(vec![0x01, 0x00, 0x07]);

    assert!(matches!(
        DexDebugItem::load(&idx, 0),
        Err(LoadError::Read(_))
    ));
}

#[test]
fn gather_collects_names_and_types() {
    let ctx = DexContext::new();
    let arg = ctx.make_string("arg");
    let local = ctx.make_string("local");
    let sig = ctx.make_string("TT;");
    let file = ctx.make_string("Foo.java");
    let ty = ctx.make_type_named("LFoo;");
    let item = DexDebugItem {
        line_start: 1,
        param_names: vec![None, Some(arg)],
        insns: vec![
            DexDebugInstruction::SetFile(Some(file)),
            DexDebugInstruction::StartLocalExtended {
                register: 0,
                name: Some(local),
                ty: Some(ty),
                signature: Some(sig),
            },
        ],
    };

    let mut strings = Vec::new();
    item.gather_strings(&mut strings);
    let mut types = Vec::new();
    item.gather_types(&mut types);

    assert_eq!(strings, vec![arg, file, local, sig]);
    assert_eq!(types, vec![ty]);
}
