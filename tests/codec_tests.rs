use cstruct_serde::ser::Serializer;
use cstruct_serde::{
    AtomicTag, ByteOrder, Error, FieldDecl, FieldType, RecordLayout, RecordOptions, Value,
    from_bytes_partial, from_reader, pack, to_writer, unpack,
};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::ffi::{c_int, c_long, c_schar, c_short};
use std::mem::offset_of;
use std::sync::Arc;

fn std_layout(name: &str, order: ByteOrder, fields: &[(&str, FieldType)]) -> Arc<RecordLayout> {
    fields
        .iter()
        .fold(
            RecordLayout::builder(name).options(RecordOptions::std(order)),
            |b, (n, ty)| b.field(*n, ty.clone()),
        )
        .build()
        .unwrap()
}

fn sample(order: ByteOrder) -> Arc<RecordLayout> {
    std_layout(
        "Sample",
        order,
        &[
            ("x", AtomicTag::I32.into()),
            ("y", AtomicTag::F64.into()),
            ("z", AtomicTag::U16.into()),
            ("s", FieldType::bytes(10)),
        ],
    )
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    x: i32,
    y: f64,
    z: u16,
    #[serde(with = "serde_bytes")]
    s: Vec<u8>,
}

// ══════════════════════════════════════════════════════════════════════════
// Dynamic values
// ══════════════════════════════════════════════════════════════════════════

#[test]
fn test_pack_scenario_little_endian() {
    let layout = sample(ByteOrder::Little);
    let value = Value::Record(vec![
        Value::Int(100),
        Value::Float(-0.25),
        Value::UInt(255),
        Value::Bytes(b"12345".to_vec()),
    ]);
    let bytes = pack(&layout, &value).unwrap();
    assert_eq!(bytes.len(), 24);
    assert_eq!(&bytes[..4], 100i32.to_le_bytes());
    assert_eq!(&bytes[4..12], (-0.25f64).to_le_bytes());
    assert_eq!(&bytes[12..14], [255, 0]);
    assert_eq!(&bytes[14..24], b"12345\0\0\0\0\0");

    let decoded = unpack(&layout, &bytes).unwrap();
    assert_eq!(
        decoded,
        Value::Record(vec![
            Value::Int(100),
            Value::Float(-0.25),
            Value::UInt(255),
            Value::Bytes(b"12345\0\0\0\0\0".to_vec()),
        ])
    );
}

#[test]
fn test_pack_scenario_big_endian() {
    let layout = sample(ByteOrder::Big);
    let value = Value::Record(vec![
        Value::Int(100),
        Value::Float(-0.25),
        Value::UInt(255),
        Value::Bytes(vec![]),
    ]);
    let bytes = layout.pack(&value).unwrap();
    assert_eq!(&bytes[..4], [0, 0, 0, 100]);
    assert_eq!(&bytes[4..12], (-0.25f64).to_be_bytes());
    assert_eq!(&bytes[12..14], [0, 255]);
    assert_eq!(&bytes[14..], [0; 10]);
}

#[test]
fn test_nested_round_trip() {
    let inner = sample(ByteOrder::Little);
    let outer = std_layout(
        "Pair",
        ByteOrder::Little,
        &[("a", FieldType::nested(&inner)), ("b", FieldType::nested(&inner))],
    );
    let rec = |x: i64| {
        Value::Record(vec![
            Value::Int(x),
            Value::Float(1.5),
            Value::UInt(7),
            Value::Bytes(b"abcdefghij".to_vec()),
        ])
    };
    let value = Value::Record(vec![rec(-1), rec(2)]);
    let bytes = outer.pack(&value).unwrap();
    assert_eq!(bytes.len(), 48);
    assert_eq!(&bytes[24..28], 2i32.to_le_bytes());
    assert_eq!(outer.unpack(&bytes).unwrap(), value);
}

#[test]
fn test_unpack_truncation_boundary() {
    let layout = sample(ByteOrder::Little);
    let bytes = vec![0u8; 30];
    assert_eq!(
        unpack(&layout, &bytes[..23]),
        Err(Error::TruncatedBuffer { need: 24, have: 23 })
    );
    unpack(&layout, &bytes[..24]).unwrap();
    unpack(&layout, &bytes).unwrap();
}

#[test]
fn test_byte_fields_truncate() {
    let layout = sample(ByteOrder::Little);
    let value = Value::Record(vec![
        Value::Int(0),
        Value::Float(0.0),
        Value::UInt(0),
        Value::Bytes(b"0123456789ABCDEF".to_vec()),
    ]);
    let bytes = layout.pack(&value).unwrap();
    assert_eq!(bytes.len(), 24);
    assert_eq!(&bytes[14..], b"0123456789");
}

#[test]
fn test_default_record_packs() {
    let layout = RecordLayout::builder("Defaults")
        .options(RecordOptions::std(ByteOrder::Big))
        .field_decl(FieldDecl::new("id", AtomicTag::U16).default_value(0x0102u16))
        .field_decl(FieldDecl::new("ok", AtomicTag::Bool).default_value(true))
        .build()
        .unwrap();
    let bytes = layout.pack(&layout.default_value().unwrap()).unwrap();
    assert_eq!(bytes, [1, 2, 1]);
}

#[test]
fn test_pack_rejects_out_of_range_integers() {
    let layout = std_layout(
        "Small",
        ByteOrder::Little,
        &[("a", AtomicTag::U8.into()), ("b", AtomicTag::I16.into())],
    );
    let err = layout
        .pack(&Value::Record(vec![Value::UInt(256), Value::Int(0)]))
        .unwrap_err();
    assert!(matches!(err, Error::Range { ref field, ref value, .. } if field == "a" && value == "256"));

    let err = layout
        .pack(&Value::Record(vec![Value::UInt(0), Value::Int(-32769)]))
        .unwrap_err();
    assert!(matches!(err, Error::Range { ref field, .. } if field == "b"));

    let bytes = layout
        .pack(&Value::Record(vec![Value::Int(255), Value::UInt(32767)]))
        .unwrap();
    assert_eq!(bytes, [255, 0xFF, 0x7F]);
}

#[test]
fn test_pack_rejects_wrong_shapes() {
    let layout = std_layout(
        "Arr",
        ByteOrder::Little,
        &[("a", FieldType::array(AtomicTag::U8, 3))],
    );
    let err = layout
        .pack(&Value::Record(vec![Value::Array(vec![Value::UInt(1), Value::UInt(2)])]))
        .unwrap_err();
    assert_eq!(err, Error::Shape { field: "a".into(), expected: 3, got: 2 });

    let err = layout.pack(&Value::Record(vec![])).unwrap_err();
    assert!(matches!(err, Error::Shape { expected: 1, got: 0, .. }));

    let err = layout.pack(&Value::Record(vec![Value::Bool(true)])).unwrap_err();
    assert!(matches!(err, Error::InvalidType { ref field, got: "bool", .. } if field == "a"));
}

#[test]
fn test_bool_any_nonzero_is_true() {
    let layout = std_layout("Flag", ByteOrder::Little, &[("f", AtomicTag::Bool.into())]);
    assert_eq!(layout.pack(&Value::Record(vec![Value::Bool(true)])).unwrap(), [1]);
    assert_eq!(layout.unpack(&[2]).unwrap(), Value::Record(vec![Value::Bool(true)]));
    assert_eq!(layout.unpack(&[0]).unwrap(), Value::Record(vec![Value::Bool(false)]));
}

#[test]
fn test_char_field() {
    let layout = std_layout("C", ByteOrder::Little, &[("c", AtomicTag::Char.into())]);
    for v in [Value::Char(b'A'), Value::UInt(65), Value::Bytes(b"A".to_vec())] {
        assert_eq!(layout.pack(&Value::Record(vec![v])).unwrap(), [b'A']);
    }
    assert_eq!(layout.unpack(b"A").unwrap(), Value::Record(vec![Value::Char(b'A')]));

    let err = layout
        .pack(&Value::Record(vec![Value::Bytes(b"AB".to_vec())]))
        .unwrap_err();
    assert_eq!(err, Error::Shape { field: "c".into(), expected: 1, got: 2 });

    assert_eq!(layout.to_bytes(&('\u{e9}',)).unwrap(), [0xE9]);
    assert!(matches!(layout.to_bytes(&('€',)), Err(Error::Range { .. })));
}

#[test]
fn test_float_widths() {
    let layout = std_layout(
        "Floats",
        ByteOrder::Little,
        &[
            ("h", AtomicTag::F16.into()),
            ("s", AtomicTag::F32.into()),
            ("d", AtomicTag::F64.into()),
        ],
    );
    let bytes = layout.to_bytes(&(1.5f32, 2.25f32, 3)).unwrap();
    assert_eq!(&bytes[..2], [0x00, 0x3E]);
    assert_eq!(&bytes[2..6], 2.25f32.to_le_bytes());
    assert_eq!(&bytes[6..], 3.0f64.to_le_bytes());

    let (h, s, d): (f32, f32, f64) = layout.from_bytes(&bytes).unwrap();
    assert_eq!((h, s, d), (1.5, 2.25, 3.0));

    assert!(layout.to_bytes(&(65504.0, 0.0, 0.0)).is_ok());
    assert!(matches!(layout.to_bytes(&(1e5, 0.0, 0.0)), Err(Error::Range { ref field, .. }) if field == "h"));
    assert!(matches!(layout.to_bytes(&(0.0, 1e40, 0.0)), Err(Error::Range { ref field, .. }) if field == "s"));
    assert!(layout.to_bytes(&(f64::INFINITY, f64::NAN, 1e300)).is_ok());
}

#[test]
fn test_multi_dimensional_arrays_are_row_major() {
    let layout = std_layout(
        "Grid",
        ByteOrder::Big,
        &[("g", FieldType::array(FieldType::array(AtomicTag::U16, 3), 2))],
    );
    let grid = [[1u16, 2, 3], [4, 5, 6]];
    let bytes = layout.to_bytes(&(grid,)).unwrap();
    assert_eq!(bytes, [0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6]);

    let (decoded,): ([[u16; 3]; 2],) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(decoded, grid);

    let value = layout.unpack(&bytes).unwrap();
    assert_eq!(
        value,
        Value::Record(vec![Value::Array(vec![
            Value::Array(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)]),
            Value::Array(vec![Value::UInt(4), Value::UInt(5), Value::UInt(6)]),
        ])])
    );
}

#[test]
fn test_value_round_trip_all_kinds() {
    let inner = std_layout(
        "Inner",
        ByteOrder::Network,
        &[("i", AtomicTag::I8.into()), ("c", AtomicTag::Char.into())],
    );
    let layout = std_layout(
        "All",
        ByteOrder::Network,
        &[
            ("b", AtomicTag::Bool.into()),
            ("i", AtomicTag::I64.into()),
            ("u", AtomicTag::U64.into()),
            ("f", AtomicTag::F32.into()),
            ("s", FieldType::bytes(3)),
            ("n", FieldType::array(&inner, 2)),
        ],
    );
    let value = Value::Record(vec![
        Value::Bool(true),
        Value::Int(i64::MIN),
        Value::UInt(u64::MAX),
        Value::Float(0.5),
        Value::Bytes(b"xyz".to_vec()),
        Value::Array(vec![
            Value::Record(vec![Value::Int(-5), Value::Char(b'p')]),
            Value::Record(vec![Value::Int(5), Value::Char(b'q')]),
        ]),
    ]);
    let bytes = layout.pack(&value).unwrap();
    assert_eq!(bytes.len(), 1 + 8 + 8 + 4 + 3 + 4);
    assert_eq!(layout.unpack(&bytes).unwrap(), value);
}

// ══════════════════════════════════════════════════════════════════════════
// Explicit padding
// ══════════════════════════════════════════════════════════════════════════

fn padded(options: RecordOptions, tag: AtomicTag) -> Arc<RecordLayout> {
    RecordLayout::builder("Padded")
        .options(options)
        .field_decl(FieldDecl::new("v", tag).pad_before(3).pad_after(2))
        .build()
        .unwrap()
}

#[test]
fn test_std_padding_bytes_are_zero() {
    let layout = padded(RecordOptions::std(ByteOrder::Little), AtomicTag::I32);
    let bytes = layout.pack(&Value::Record(vec![Value::Int(0x0102_0304)])).unwrap();
    assert_eq!(bytes, [0, 0, 0, 4, 3, 2, 1, 0, 0]);
}

#[test]
fn test_native_padding_bytes_are_zero() {
    let layout = padded(RecordOptions::native(), AtomicTag::Int);
    let align = std::mem::align_of::<c_int>();
    let width = std::mem::size_of::<c_int>();
    let offset = 3usize.div_ceil(align) * align;
    let size = (offset + width + 2).div_ceil(align) * align;

    let mut buf = vec![0xFFu8; size + 2];
    (0x0102_0304i32,)
        .serialize(Serializer::new(&layout, &mut buf).unwrap())
        .unwrap();

    let mut expected = vec![0u8; size];
    expected[offset..offset + width].copy_from_slice(&(0x0102_0304 as c_int).to_ne_bytes());
    assert_eq!(&buf[..size], expected);
    assert_eq!(&buf[size..], [0xFF, 0xFF]);
}

#[test]
fn test_unpack_skips_padding() {
    let layout = padded(RecordOptions::std(ByteOrder::Big), AtomicTag::I32);
    let bytes = [0xAA, 0xAA, 0xAA, 1, 2, 3, 4, 0xBB, 0xBB];
    assert_eq!(
        layout.unpack(&bytes).unwrap(),
        Value::Record(vec![Value::Int(0x0102_0304)])
    );
    let (v,): (i32,) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(v, 0x0102_0304);
}

#[test]
fn test_padded_byte_field() {
    let layout = RecordLayout::builder("Tagged")
        .options(RecordOptions::std(ByteOrder::Little))
        .field_decl(FieldDecl::new("s", FieldType::bytes(4)).pad_before(2).pad_after(1))
        .field("n", AtomicTag::U8)
        .build()
        .unwrap();
    assert_eq!(layout.size(), 8);

    let bytes = layout.to_bytes(&("ab", 9u8)).unwrap();
    assert_eq!(bytes, [0, 0, b'a', b'b', 0, 0, 0, 9]);

    let noisy = [0xEE, 0xEE, b'w', b'x', b'y', b'z', 0xEE, 7];
    assert_eq!(
        layout.unpack(&noisy).unwrap(),
        Value::Record(vec![Value::Bytes(b"wxyz".to_vec()), Value::UInt(7)])
    );
}

// ══════════════════════════════════════════════════════════════════════════
// Typed serde values
// ══════════════════════════════════════════════════════════════════════════

#[test]
fn test_struct_round_trip() {
    let layout = sample(ByteOrder::Big);
    let s = Sample { x: -7, y: 0.125, z: 40000, s: b"0123456789".to_vec() };
    let bytes = layout.to_bytes(&s).unwrap();
    assert_eq!(&bytes[..4], (-7i32).to_be_bytes());
    assert_eq!(s, layout.from_bytes(&bytes).unwrap());
}

#[test]
fn test_nested_structs() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pair {
        a: Sample,
        b: Sample,
    }

    let inner = sample(ByteOrder::Little);
    let outer = std_layout(
        "Pair",
        ByteOrder::Little,
        &[("a", FieldType::nested(&inner)), ("b", FieldType::nested(&inner))],
    );
    let pair = Pair {
        a: Sample { x: 1, y: 2.0, z: 3, s: b"a".to_vec() },
        b: Sample { x: 4, y: 5.0, z: 6, s: b"b".to_vec() },
    };
    let bytes = outer.to_bytes(&pair).unwrap();
    assert_eq!(bytes.len(), 48);
    let decoded: Pair = outer.from_bytes(&bytes).unwrap();
    assert_eq!(decoded.b.x, 4);
    assert_eq!(decoded.b.s, b"b\0\0\0\0\0\0\0\0\0");
}

#[test]
fn test_struct_field_count_must_match() {
    #[derive(Serialize, Deserialize)]
    struct Short {
        x: i32,
    }
    #[derive(Serialize)]
    struct Long {
        x: i32,
        y: f64,
        z: u16,
        s: ByteBuf,
        extra: u8,
    }

    let layout = sample(ByteOrder::Little);
    assert!(matches!(
        layout.to_bytes(&Short { x: 1 }),
        Err(Error::Shape { expected: 4, got: 1, .. })
    ));
    let long = Long { x: 1, y: 0.0, z: 0, s: ByteBuf::new(), extra: 9 };
    assert!(matches!(layout.to_bytes(&long), Err(Error::Shape { expected: 4, got: 5, .. })));

    let bytes = vec![0u8; 24];
    assert!(matches!(
        layout.from_bytes::<Short>(&bytes),
        Err(Error::Shape { expected: 4, got: 1, .. })
    ));
}

#[test]
fn test_byte_field_as_c_string() {
    let layout = std_layout(
        "Name",
        ByteOrder::Little,
        &[("id", AtomicTag::U8.into()), ("name", FieldType::bytes(8))],
    );
    let bytes = layout.to_bytes(&(3u8, "hi")).unwrap();
    assert_eq!(bytes, [3, b'h', b'i', 0, 0, 0, 0, 0, 0]);

    let (id, name): (u8, String) = layout.from_bytes(&bytes).unwrap();
    assert_eq!((id, name.as_str()), (3, "hi"));

    let (_, borrowed): (u8, &str) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(borrowed, "hi");

    let (_, raw): (u8, ByteBuf) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(raw.len(), 8);

    let (_, seq): (u8, Vec<u8>) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(seq, b"hi\0\0\0\0\0\0");
}

#[test]
fn test_fixed_bytes_any_length() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Block {
        #[serde(with = "cstruct_serde::fixed_bytes")]
        data: [u8; 64],
        #[serde(with = "cstruct_serde::fixed_bytes")]
        short: [u8; 2],
    }

    let layout = std_layout(
        "Block",
        ByteOrder::Little,
        &[("data", FieldType::bytes(64)), ("short", FieldType::bytes(4))],
    );
    let block = Block { data: [0xAB; 64], short: [1, 2] };
    let bytes = layout.to_bytes(&block).unwrap();
    assert_eq!(bytes.len(), 68);
    assert_eq!(&bytes[64..], [1, 2, 0, 0]);
    assert_eq!(block, layout.from_bytes(&bytes).unwrap());
}

#[test]
fn test_newtype_is_transparent() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Port(u16);

    let layout = std_layout("Port", ByteOrder::Network, &[("p", AtomicTag::U16.into())]);
    let bytes = layout.to_bytes(&(Port(8080),)).unwrap();
    assert_eq!(bytes, 8080u16.to_be_bytes());
    let (p,): (Port,) = layout.from_bytes(&bytes).unwrap();
    assert_eq!(p, Port(8080));
}

#[test]
fn test_unsupported_items() {
    let layout = std_layout("One", ByteOrder::Little, &[("a", AtomicTag::U8.into())]);
    assert_eq!(
        layout.to_bytes(&(Some(1u8),)),
        Err(Error::Unsupported("optional values"))
    );
    assert!(matches!(layout.from_bytes::<(Option<u8>,)>(&[1]), Err(Error::Unsupported(_))));

    let mut map = std::collections::BTreeMap::new();
    map.insert("a", 1u8);
    assert_eq!(layout.to_bytes(&map), Err(Error::Unsupported("maps")));
}

// ══════════════════════════════════════════════════════════════════════════
// Native mode
// ══════════════════════════════════════════════════════════════════════════

#[repr(C)]
struct CHeader {
    kind: c_schar,
    len: c_int,
    flags: c_short,
    offset: c_long,
}

#[test]
fn test_native_pack_places_fields_like_c() {
    let layout = RecordLayout::builder("CHeader")
        .field("kind", AtomicTag::SignedChar)
        .field("len", AtomicTag::Int)
        .field("flags", AtomicTag::Short)
        .field("offset", AtomicTag::Long)
        .build()
        .unwrap();
    assert_eq!(layout.size(), std::mem::size_of::<CHeader>());

    let mut buf = vec![0xFFu8; layout.size()];
    (-1i8, 1000, -2i16, 123456789i64)
        .serialize(Serializer::new(&layout, &mut buf).unwrap())
        .unwrap();

    let len = offset_of!(CHeader, len);
    let flags = offset_of!(CHeader, flags);
    let offset = offset_of!(CHeader, offset);
    assert_eq!(buf[0], 0xFF);
    assert!(buf[1..len].iter().all(|&b| b == 0), "alignment padding must be zero");
    assert_eq!(&buf[len..len + 4], (1000 as c_int).to_ne_bytes());
    assert_eq!(&buf[flags..flags + 2], (-2 as c_short).to_ne_bytes());
    assert_eq!(&buf[offset..], (123456789 as c_long).to_ne_bytes());

    let (kind, l, f, o): (i8, i32, i16, i64) = layout.from_bytes(&buf).unwrap();
    assert_eq!((kind, l, f, o), (-1, 1000, -2, 123456789));
}

#[test]
fn test_serializer_into_caller_buffer() {
    let layout = std_layout("Id", ByteOrder::Little, &[("id", AtomicTag::U16.into())]);
    let mut buf = [0xEE; 4];
    (0x1234u16,).serialize(Serializer::new(&layout, &mut buf).unwrap()).unwrap();
    assert_eq!(buf, [0x34, 0x12, 0xEE, 0xEE]);

    let mut short = [0u8; 1];
    assert!(matches!(
        Serializer::new(&layout, &mut short),
        Err(Error::TruncatedBuffer { need: 2, have: 1 })
    ));
}

// ══════════════════════════════════════════════════════════════════════════
// Streams
// ══════════════════════════════════════════════════════════════════════════

#[test]
fn test_from_bytes_partial_back_to_back() {
    let layout = std_layout("N", ByteOrder::Big, &[("n", AtomicTag::U32.into())]);
    let mut buf = layout.to_bytes(&(42u32,)).unwrap();
    buf.extend(layout.to_bytes(&(99u32,)).unwrap());
    buf.extend([0xFF, 0xFF]);

    let ((first,), rest): ((u32,), _) = from_bytes_partial(&layout, &buf).unwrap();
    assert_eq!(first, 42);
    let ((second,), remaining): ((u32,), _) = from_bytes_partial(&layout, rest).unwrap();
    assert_eq!(second, 99);
    assert_eq!(remaining, [0xFF, 0xFF]);
}

#[test]
fn test_to_writer_from_reader_round_trip() {
    let layout = sample(ByteOrder::Little);
    let s = Sample { x: 5, y: 6.5, z: 7, s: b"0123456789".to_vec() };
    let mut written = Vec::new();
    to_writer(&mut written, &layout, &s).unwrap();
    assert_eq!(written, layout.to_bytes(&s).unwrap());

    let decoded: Sample = from_reader(std::io::Cursor::new(written), &layout).unwrap();
    assert_eq!(decoded, s);
}

#[test]
fn test_failed_pack_returns_no_buffer() {
    let layout = std_layout(
        "Two",
        ByteOrder::Little,
        &[("a", AtomicTag::U16.into()), ("b", AtomicTag::U8.into())],
    );
    assert!(matches!(
        layout.to_bytes(&(0x1234u16, 300u16)),
        Err(Error::Range { ref field, .. }) if field == "b"
    ));

    // Packing in place only ever touches the record's own bytes.
    let mut buf = [0xEEu8; 5];
    let result = (0x1234u16, 300u16).serialize(Serializer::new(&layout, &mut buf).unwrap());
    assert!(result.is_err());
    assert_eq!(&buf[3..], [0xEE, 0xEE]);
}

#[test]
fn test_to_writer_writes_nothing_on_error() {
    let layout = std_layout("B", ByteOrder::Little, &[("b", AtomicTag::U8.into())]);
    let mut written = Vec::new();
    assert!(to_writer(&mut written, &layout, &(300u16,)).is_err());
    assert!(written.is_empty());
}

#[test]
fn test_reader_eof_error() {
    let layout = sample(ByteOrder::Little);
    let result = from_reader::<_, Sample>(std::io::Cursor::new([0u8; 10]), &layout);
    assert_eq!(result.unwrap_err(), Error::TruncatedBuffer { need: 24, have: 10 });
}
