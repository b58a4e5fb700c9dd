// Property tests for layout compilation and field codecs

use chirp_bitwise::bitwise::{compile_schema, LayoutTree, NodeKind, StructLayout, StructuredView};
use chirp_bitwise::memmap::ByteImage;
use proptest::prelude::*;
use std::sync::Arc;

const SCALARS: &[&str] = &[
    "u8", "u16", "ul16", "u24", "ul24", "u32", "ul32", "i8", "i16", "il16", "i32", "il32", "char",
    "lbcd", "bbcd",
];

const BITFIELD_GROUPS: &[&str] = &[
    "u8 {n}a:3, {n}b:5;",
    "u8 {n}a:1, {n}b:1, {n}c:6;",
    "u16 {n}a:4, {n}b:4, {n}c:8;",
    "ul16 {n}a:1, {n}b:15;",
    "u24 {n}a:12, {n}b:12;",
];

/// One schema line per generated item
fn render(items: &[(u8, usize, usize)]) -> String {
    let mut schema = String::new();
    for (i, &(kind, ty, n)) in items.iter().enumerate() {
        let name = format!("f{}", i);
        let ty = SCALARS[ty % SCALARS.len()];
        let line = match kind {
            0 => format!("{} {};", ty, name),
            1 => format!("{} {}[{}];", ty, name, n),
            2 => format!("bit {}[{}];", name, n * 8),
            3 => BITFIELD_GROUPS[n % BITFIELD_GROUPS.len()].replace("{n}", &name),
            4 => format!("struct {{ u8 x; {} y; u8 z:4, w:4; }} {}[{}];", ty, name, n),
            _ => format!("#seek {};", n),
        };
        schema.push_str(&line);
        schema.push('\n');
    }
    schema
}

fn assert_disjoint(layout: &StructLayout) {
    let fields = layout.fields();
    if !layout.is_union() {
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                let (sa, sb) = (a.bit_span(), b.bit_span());
                if sa.is_empty() || sb.is_empty() {
                    continue;
                }
                assert!(
                    sa.end <= sb.start || sb.end <= sa.start,
                    "{} {:?} overlaps {} {:?}",
                    a.name,
                    sa,
                    b.name,
                    sb
                );
            }
        }
    }
    for field in fields {
        let nested = match &field.kind {
            NodeKind::Struct(s) => Some(s),
            NodeKind::Array(array) => array.element.as_struct(),
            NodeKind::Scalar(_) => None,
        };
        if let Some(nested) = nested {
            assert_disjoint(nested);
        }
    }
}

fn view(schema: &str, len: usize) -> StructuredView {
    let layout: LayoutTree = compile_schema(schema).expect("schema compiles");
    StructuredView::new(ByteImage::zeroed(len), Arc::new(layout))
}

/// (type, bits, signed)
const INT_TYPES: &[(&str, u32, bool)] = &[
    ("u8", 8, false),
    ("u16", 16, false),
    ("ul16", 16, false),
    ("u24", 24, false),
    ("ul24", 24, false),
    ("u32", 32, false),
    ("ul32", 32, false),
    ("i8", 8, true),
    ("i16", 16, true),
    ("il16", 16, true),
    ("i24", 24, true),
    ("il24", 24, true),
    ("i32", 32, true),
    ("il32", 32, true),
];

/// Squeeze `seed` into the representable range of a `bits`-wide integer
fn fit(seed: u64, bits: u32, signed: bool) -> i64 {
    let masked = (seed & ((1u64 << bits) - 1)) as i64;
    if signed && masked >= 1 << (bits - 1) {
        masked - (1 << bits)
    } else {
        masked
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn sibling_fields_never_overlap(
        items in prop::collection::vec((0u8..6, 0usize..SCALARS.len(), 0usize..5), 1..16)
    ) {
        let schema = render(&items);
        let layout = compile_schema(&schema).expect("generated schema compiles");
        assert_disjoint(layout.root());
        prop_assert!(layout.root().fields().iter().all(|f| f.end_byte() <= layout.size_bytes()));
    }

    #[test]
    fn integers_roundtrip(index in 0usize..INT_TYPES.len(), seed in any::<u64>()) {
        let (ty, bits, signed) = INT_TYPES[index];
        let value = fit(seed, bits, signed);
        let v = view(&format!("u8 lead; {} value; u8 trail;", ty), 8);

        v.set("value", value).unwrap();
        prop_assert_eq!(v.get("value").unwrap().as_int(), Some(value));
        prop_assert_eq!(v.get("lead").unwrap().as_int(), Some(0));
        prop_assert_eq!(v.get("trail").unwrap().as_int(), Some(0));
    }

    #[test]
    fn packed_bcd_roundtrip(digits in "[0-9]{8}", little in any::<bool>()) {
        let ty = if little { "lbcd" } else { "bbcd" };
        let v = view(&format!("{} freq[4];", ty), 4);
        let freq = v.field("freq").unwrap();

        freq.set_digits(&digits).unwrap();
        prop_assert_eq!(freq.get_digits().unwrap(), digits.clone());
        prop_assert_eq!(freq.get_bcd().unwrap(), Some(digits.parse::<u64>().unwrap()));

        freq.set_int(digits.parse::<i64>().unwrap()).unwrap();
        prop_assert_eq!(freq.get_digits().unwrap(), digits);
    }

    #[test]
    fn bitfield_writes_preserve_siblings(a in 0i64..8, b in 0i64..32, a2 in 0i64..8, b2 in 0i64..32) {
        let v = view("u8 a:3, b:5;", 1);
        v.set("a", a).unwrap();
        v.set("b", b).unwrap();

        v.set("a", a2).unwrap();
        prop_assert_eq!(v.get("b").unwrap().as_int(), Some(b));
        v.set("b", b2).unwrap();
        prop_assert_eq!(v.get("a").unwrap().as_int(), Some(a2));
        prop_assert_eq!(v.to_bytes()[0] as i64, a2 << 5 | b2);
    }

    #[test]
    fn char_arrays_keep_every_byte(bytes in prop::collection::vec(any::<u8>(), 6)) {
        let v = view("char name[6];", 6);
        let name = v.field("name").unwrap();
        name.set_raw(&bytes).unwrap();

        let text = name.get_str().unwrap();
        name.fill_raw(0).unwrap();
        name.set_str(&text).unwrap();
        prop_assert_eq!(name.get_raw().unwrap(), bytes);
    }
}
