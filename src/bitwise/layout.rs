// Layout tree: resolved offsets and widths for every declared field
// Reference: chirp/bitwise.py (Processor)

use super::error::SchemaError;
use super::grammar::{self, Item, ItemBody, StructBody};
use super::options::CompileOptions;
use super::types::{BitField, IntType, ScalarKind};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

/// Shape of a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(ScalarKind),
    Array(ArrayLayout),
    Struct(Arc<StructLayout>),
}

impl NodeKind {
    /// Bytes covered by the field's raw span
    pub fn span_bytes(&self) -> usize {
        match self {
            NodeKind::Scalar(kind) => kind.span_bytes(),
            NodeKind::Array(array) => array.size_bytes(),
            NodeKind::Struct(layout) => layout.size_bytes(),
        }
    }

    /// Width of the semantic value in bits
    pub fn bit_width(&self) -> u64 {
        match self {
            NodeKind::Scalar(kind) => kind.bit_width(),
            NodeKind::Array(array) => array.len as u64 * array.stride_bits(),
            NodeKind::Struct(layout) => layout.size_bytes() as u64 * 8,
        }
    }

    pub fn as_struct(&self) -> Option<&Arc<StructLayout>> {
        match self {
            NodeKind::Struct(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayLayout> {
        match self {
            NodeKind::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            NodeKind::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Schema-style type description, e.g. `lbcd[4]` or `struct[128]`
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Scalar(kind) => kind.name(),
            NodeKind::Array(array) => format!("{}[{}]", array.element.describe(), array.len),
            NodeKind::Struct(layout) if layout.is_union() => "union".to_string(),
            NodeKind::Struct(layout) => match layout.name() {
                Some(name) => format!("struct {}", name),
                None => "struct".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLayout {
    pub len: usize,
    pub element: Box<NodeKind>,
}

impl ArrayLayout {
    /// Distance between consecutive elements; bit arrays pack one per bit
    pub fn stride_bits(&self) -> u64 {
        match *self.element {
            NodeKind::Scalar(ScalarKind::Bit(_)) => 1,
            ref other => other.span_bytes() as u64 * 8,
        }
    }

    pub fn size_bytes(&self) -> usize {
        ((self.len as u64 * self.stride_bits()).div_ceil(8)) as usize
    }
}

/// A named field at a byte offset relative to its parent
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub name: String,
    pub offset: usize,
    pub kind: NodeKind,
    /// Schema line the field was declared on
    pub line: usize,
}

impl LayoutNode {
    /// Bits the field's value occupies, relative to the parent start.
    /// Bit-field positions count from the storage word's first bit.
    pub fn bit_span(&self) -> Range<u64> {
        let base = self.offset as u64 * 8;
        let start = match &self.kind {
            NodeKind::Scalar(ScalarKind::BitField(bf)) => base + bf.msb_offset(),
            _ => base,
        };
        start..start + self.kind.bit_width()
    }

    pub fn end_byte(&self) -> usize {
        self.offset + self.kind.span_bytes()
    }
}

/// Members of a struct or union, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    name: Option<String>,
    union: bool,
    fields: Vec<LayoutNode>,
    index: HashMap<String, usize>,
    size: usize,
    /// Holds a `#seekto`, so offsets depend on where the struct is placed
    pinned: bool,
}

impl StructLayout {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_union(&self) -> bool {
        self.union
    }

    pub fn fields(&self) -> &[LayoutNode] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&LayoutNode> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn size_bytes(&self) -> usize {
        self.size
    }
}

/// A compiled schema. Immutable and cheap to share between views.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    root: Arc<StructLayout>,
    root_kind: NodeKind,
    types: BTreeMap<String, Arc<StructLayout>>,
}

impl LayoutTree {
    pub fn root(&self) -> &StructLayout {
        &self.root
    }

    pub(crate) fn root_kind(&self) -> &NodeKind {
        &self.root_kind
    }

    /// Look up a named struct type declared with `struct name { ... };`
    pub fn struct_type(&self, name: &str) -> Option<&Arc<StructLayout>> {
        self.types.get(name)
    }

    pub fn struct_types(&self) -> impl Iterator<Item = (&str, &Arc<StructLayout>)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Highest byte address any top-level field reaches
    pub fn size_bytes(&self) -> usize {
        self.root.size_bytes()
    }
}

/// Compile schema text with default options
pub fn compile_schema(text: &str) -> Result<LayoutTree, SchemaError> {
    compile_schema_with(text, &CompileOptions::default())
}

pub fn compile_schema_with(
    text: &str,
    options: &CompileOptions,
) -> Result<LayoutTree, SchemaError> {
    let items = grammar::parse_schema(text)?;
    let mut compiler = Compiler {
        options,
        types: BTreeMap::new(),
    };
    let root = Arc::new(compiler.block(&items, None, false, 0, 0)?);
    tracing::debug!(
        "compiled schema: {} top-level fields, {} bytes",
        root.fields.len(),
        root.size
    );
    Ok(LayoutTree {
        root_kind: NodeKind::Struct(Arc::clone(&root)),
        root,
        types: compiler
            .types
            .into_iter()
            .map(|(name, named)| (name, named.layout))
            .collect(),
    })
}

struct Compiler<'o, 'a> {
    options: &'o CompileOptions,
    types: BTreeMap<String, NamedType<'a>>,
}

/// A `struct name { ... };` definition. The body is kept so pinned
/// types can be laid out again at each place they are used.
struct NamedType<'a> {
    items: &'a [Item],
    line: usize,
    layout: Arc<StructLayout>,
}

/// Fields collected so far for one struct body
struct Block {
    union: bool,
    /// Absolute image offset of the struct start
    base: usize,
    pinned: bool,
    fields: Vec<LayoutNode>,
    index: HashMap<String, usize>,
    cursor: usize,
    high_water: usize,
}

impl Block {
    fn push(&mut self, mut node: LayoutNode) {
        if self.index.contains_key(&node.name) {
            let renamed = format!("{}_{:06x}", node.name, node.offset);
            tracing::error!(
                "line {}: duplicate field `{}` renamed to `{}`",
                node.line,
                node.name,
                renamed
            );
            node.name = renamed;
        }
        self.high_water = self.high_water.max(node.end_byte());
        self.index.insert(node.name.clone(), self.fields.len());
        self.fields.push(node);
    }
}

fn checked_size(count: u64, each: usize, line: usize) -> Result<usize, SchemaError> {
    usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(each))
        .ok_or(SchemaError::SizeOverflow { line })
}

fn advance(cursor: usize, by: usize, line: usize) -> Result<usize, SchemaError> {
    cursor
        .checked_add(by)
        .ok_or(SchemaError::SizeOverflow { line })
}

impl<'a> Compiler<'_, 'a> {
    /// Compile one struct or union body placed at absolute offset `base`.
    /// `line` is where the body starts.
    fn block(
        &mut self,
        items: &'a [Item],
        name: Option<&str>,
        union: bool,
        base: usize,
        line: usize,
    ) -> Result<StructLayout, SchemaError> {
        let mut block = Block {
            union,
            base,
            pinned: false,
            fields: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            high_water: 0,
        };

        if union {
            if items.is_empty() {
                return Err(SchemaError::EmptyUnion { line });
            }
            let mut expected = None;
            for item in items {
                block.cursor = 0;
                self.item(&mut block, item)?;
                match expected {
                    None => expected = Some(block.cursor),
                    Some(size) if size != block.cursor => {
                        return Err(SchemaError::UnionSizeMismatch {
                            line: item.line,
                            expected: size,
                            found: block.cursor,
                        })
                    }
                    Some(_) => {}
                }
            }
        } else {
            for item in items {
                self.item(&mut block, item)?;
            }
        }

        Ok(StructLayout {
            name: name.map(str::to_string),
            union,
            size: block.cursor.max(block.high_water),
            fields: block.fields,
            index: block.index,
            pinned: block.pinned,
        })
    }

    /// Layout of a named struct type placed at `base`
    fn instantiate(
        &mut self,
        type_name: &str,
        base: usize,
        line: usize,
    ) -> Result<Arc<StructLayout>, SchemaError> {
        let named = self
            .types
            .get(type_name)
            .ok_or_else(|| SchemaError::UndefinedStruct {
                line,
                name: type_name.to_string(),
            })?;
        if !named.layout.pinned || base == 0 {
            return Ok(Arc::clone(&named.layout));
        }
        let (items, def_line) = (named.items, named.line);
        Ok(Arc::new(self.block(items, Some(type_name), false, base, def_line)?))
    }

    /// Place a struct or union instance, refusing arrays whose elements
    /// would each seek to the same absolute address
    fn place_struct(
        &mut self,
        block: &mut Block,
        name: &str,
        layout: Arc<StructLayout>,
        count: Option<u64>,
        line: usize,
    ) -> Result<(), SchemaError> {
        if layout.pinned && count.is_some_and(|n| n > 1) && layout.size_bytes() > 0 {
            return Err(SchemaError::SeekInStructArray {
                line,
                name: name.to_string(),
            });
        }
        block.pinned |= layout.pinned;
        self.place(block, name, NodeKind::Struct(layout), count, line)
    }

    fn item(&mut self, block: &mut Block, item: &'a Item) -> Result<(), SchemaError> {
        let line = item.line;
        let is_directive = matches!(
            item.body,
            ItemBody::SeekTo(_) | ItemBody::Seek(_) | ItemBody::PrintOffset(_)
        );
        if is_directive && block.union {
            return Err(SchemaError::DirectiveInUnion { line });
        }

        match &item.body {
            ItemBody::SeekTo(target) => {
                let target =
                    usize::try_from(*target).map_err(|_| SchemaError::SizeOverflow { line })?;
                let local = target
                    .checked_sub(block.base)
                    .ok_or(SchemaError::SeekBeforeStruct {
                        line,
                        target,
                        base: block.base,
                    })?;
                let here = block.base + block.cursor;
                if local < block.cursor && self.options.flag_overlapping_seeks {
                    tracing::warn!(
                        "line {}: #seekto {:#06x} moves back from {:#06x}; fields may overlap",
                        line,
                        target,
                        here
                    );
                } else if local == block.cursor {
                    tracing::debug!("line {}: unnecessary #seekto {:#06x}", line, target);
                }
                block.cursor = local;
                block.pinned = true;
            }
            ItemBody::Seek(by) => {
                let by = usize::try_from(*by).map_err(|_| SchemaError::SizeOverflow { line })?;
                block.cursor = advance(block.cursor, by, line)?;
            }
            ItemBody::PrintOffset(label) => {
                let here = block.base + block.cursor;
                tracing::debug!("{}: {} (0x{:08X})", label, here, here);
            }
            ItemBody::Field {
                ty, name, count, ..
            } => self.field(block, *ty, name, *count, line)?,
            ItemBody::Bitfields {
                ty,
                ty_name,
                fields,
            } => self.bitfields(block, *ty, ty_name, fields, line)?,
            ItemBody::StructDef { name, items } => {
                let layout = Arc::new(self.block(items, Some(name), false, 0, line)?);
                let named = NamedType {
                    items,
                    line,
                    layout,
                };
                if self.types.insert(name.clone(), named).is_some() {
                    tracing::warn!("line {}: struct type `{}` redefined", line, name);
                }
            }
            ItemBody::Struct { body, name, count } => {
                let base = advance(block.base, block.cursor, line)?;
                let layout = match body {
                    StructBody::Inline(items) => {
                        Arc::new(self.block(items, None, false, base, line)?)
                    }
                    StructBody::Named(type_name) => self.instantiate(type_name, base, line)?,
                };
                self.place_struct(block, name, layout, *count, line)?;
            }
            ItemBody::Union { items, name, count } => {
                let base = advance(block.base, block.cursor, line)?;
                let layout = Arc::new(self.block(items, None, true, base, line)?);
                self.place_struct(block, name, layout, *count, line)?;
            }
        }
        Ok(())
    }

    fn field(
        &mut self,
        block: &mut Block,
        ty: ScalarKind,
        name: &str,
        count: Option<u64>,
        line: usize,
    ) -> Result<(), SchemaError> {
        if let ScalarKind::Bit(_) = ty {
            // Bits only exist packed eight to a byte
            let count = count.unwrap_or(1);
            if count % 8 != 0 {
                return Err(SchemaError::BitArrayLength { line, count });
            }
            let len = usize::try_from(count).map_err(|_| SchemaError::SizeOverflow { line })?;
            let kind = NodeKind::Array(ArrayLayout {
                len,
                element: Box::new(NodeKind::Scalar(ty)),
            });
            let size = kind.span_bytes();
            block.push(LayoutNode {
                name: name.to_string(),
                offset: block.cursor,
                kind,
                line,
            });
            block.cursor = advance(block.cursor, size, line)?;
            return Ok(());
        }
        self.place(block, name, NodeKind::Scalar(ty), count, line)
    }

    /// Place a field (or an array of it) at the cursor and advance past it
    fn place(
        &mut self,
        block: &mut Block,
        name: &str,
        element: NodeKind,
        count: Option<u64>,
        line: usize,
    ) -> Result<(), SchemaError> {
        let kind = match count {
            Some(count) => {
                checked_size(count, element.span_bytes(), line)?;
                NodeKind::Array(ArrayLayout {
                    len: count as usize,
                    element: Box::new(element),
                })
            }
            None => element,
        };
        let size = kind.span_bytes();
        block.push(LayoutNode {
            name: name.to_string(),
            offset: block.cursor,
            kind,
            line,
        });
        block.cursor = advance(block.cursor, size, line)?;
        Ok(())
    }

    fn bitfields(
        &mut self,
        block: &mut Block,
        ty: ScalarKind,
        ty_name: &str,
        fields: &[(String, u64)],
        line: usize,
    ) -> Result<(), SchemaError> {
        let storage: IntType = match ty {
            ScalarKind::Int(int) if !int.signed => int,
            _ => {
                return Err(SchemaError::InvalidBitfieldType {
                    line,
                    ty: ty_name.to_string(),
                })
            }
        };
        let storage_bits = u64::from(storage.bits());

        let mut total = 0u64;
        for (name, width) in fields {
            if *width == 0 || *width > storage_bits {
                return Err(SchemaError::InvalidBitWidth {
                    line,
                    name: name.clone(),
                    width: *width,
                });
            }
            total += width;
        }
        if total > storage_bits {
            return Err(SchemaError::BitfieldOverflow {
                line,
                bits: total,
                storage_bits,
            });
        }
        if total % 8 != 0 {
            return Err(SchemaError::BitfieldAlignment { line, bits: total });
        }
        if total < storage_bits {
            tracing::warn!(
                "line {}: bit-fields use {} of {} bits in `{}`",
                line,
                total,
                storage_bits,
                ty_name
            );
        }

        // First declared field takes the most significant bits
        let mut bits_left = storage_bits;
        for (name, width) in fields {
            bits_left -= width;
            block.push(LayoutNode {
                name: name.clone(),
                offset: block.cursor,
                kind: NodeKind::Scalar(ScalarKind::BitField(BitField {
                    storage,
                    shift: bits_left as u8,
                    width: *width as u8,
                })),
                line,
            });
        }
        block.cursor = advance(block.cursor, usize::from(storage.bytes), line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwise::types::{BitOrder, Endianness};

    fn offsets(tree: &LayoutTree) -> Vec<(&str, usize)> {
        tree.root()
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect()
    }

    #[test]
    fn test_sequential_offsets() {
        let tree = compile_schema("u8 a; ul16 b; u24 c; lbcd d[4]; char e[3];").unwrap();
        assert_eq!(
            offsets(&tree),
            vec![("a", 0), ("b", 1), ("c", 3), ("d", 6), ("e", 10)]
        );
        assert_eq!(tree.size_bytes(), 13);
    }

    #[test]
    fn test_seek_directives() {
        let tree = compile_schema("#seekto 0x10; u8 a; #seek 3; u8 b; #printoffset \"end\";").unwrap();
        assert_eq!(offsets(&tree), vec![("a", 0x10), ("b", 0x14)]);
    }

    #[test]
    fn test_zero_length_array() {
        let tree = compile_schema("u8 foo[0x0];\nu8 bar;").unwrap();
        assert_eq!(offsets(&tree), vec![("foo", 0), ("bar", 0)]);
        assert_eq!(tree.root().field("foo").unwrap().kind.span_bytes(), 0);
    }

    #[test]
    fn test_backward_seekto_aliases() {
        let options = CompileOptions {
            flag_overlapping_seeks: true,
        };
        let tree = compile_schema_with("u8 a[4];\n#seekto 0x1;\nu8 b;", &options).unwrap();
        assert_eq!(offsets(&tree), vec![("a", 0), ("b", 1)]);
        assert_eq!(tree.size_bytes(), 4);
    }

    #[test]
    fn test_seekto_inside_struct_is_absolute() {
        let tree = compile_schema("u8 pad[0x10];\nstruct {\n #seekto 0x20;\n u8 x;\n} s;").unwrap();
        let s = tree.root().field("s").unwrap();
        assert_eq!(s.offset, 0x10);
        let inner = s.kind.as_struct().unwrap();
        let x = inner.field("x").unwrap();
        assert_eq!(s.offset + x.offset, 0x20);
        assert_eq!(tree.size_bytes(), 0x21);

        // nested two deep
        let tree = compile_schema(
            "u8 pad[4];\nstruct {\n u8 a;\n struct {\n  #seekto 0x40;\n  ul16 b;\n } inner;\n} outer;",
        )
        .unwrap();
        let outer = tree.root().field("outer").unwrap();
        let inner = outer.kind.as_struct().unwrap().field("inner").unwrap();
        let b = inner.kind.as_struct().unwrap().field("b").unwrap();
        assert_eq!(outer.offset + inner.offset + b.offset, 0x40);
    }

    #[test]
    fn test_named_struct_with_seekto_is_placed_per_use() {
        let tree = compile_schema(
            "struct block { #seekto 0x30; u8 v; };\nu8 pad[8];\nstruct block here;",
        )
        .unwrap();
        let here = tree.root().field("here").unwrap();
        let v = here.kind.as_struct().unwrap().field("v").unwrap();
        assert_eq!(here.offset + v.offset, 0x30);
    }

    #[test]
    fn test_seekto_errors_inside_structs() {
        assert!(matches!(
            compile_schema("u8 pad[0x10];\nstruct {\n #seekto 0x8;\n u8 x;\n} s;"),
            Err(SchemaError::SeekBeforeStruct {
                line: 3,
                target: 0x8,
                base: 0x10
            })
        ));
        assert!(matches!(
            compile_schema("struct {\n u8 a;\n #seekto 0x20;\n u8 b;\n} s[2];"),
            Err(SchemaError::SeekInStructArray { line: 1, .. })
        ));
        // a single element has one placement
        assert!(compile_schema("struct { #seekto 0x20; u8 b; } s[1];").is_ok());
    }

    #[test]
    fn test_bitfield_shifts() {
        let tree = compile_schema("u16 foo:4, bar:8, baz:4;").unwrap();
        let shifts: Vec<(u8, u8)> = tree
            .root()
            .fields()
            .iter()
            .map(|f| match f.kind {
                NodeKind::Scalar(ScalarKind::BitField(bf)) => (bf.shift, bf.width),
                _ => panic!("not a bit-field"),
            })
            .collect();
        assert_eq!(shifts, vec![(12, 4), (4, 8), (0, 4)]);
        assert_eq!(tree.size_bytes(), 2);
    }

    #[test]
    fn test_bitfield_errors() {
        assert!(matches!(
            compile_schema("u8 a:4, b:5;"),
            Err(SchemaError::BitfieldOverflow { bits: 9, storage_bits: 8, .. })
        ));
        assert!(matches!(
            compile_schema("u16 a:4, b:5;"),
            Err(SchemaError::BitfieldAlignment { bits: 9, .. })
        ));
        assert!(matches!(
            compile_schema("i8 a:4, b:4;"),
            Err(SchemaError::InvalidBitfieldType { .. })
        ));
        assert!(matches!(
            compile_schema("u8 a:0, b:8;"),
            Err(SchemaError::InvalidBitWidth { .. })
        ));
    }

    #[test]
    fn test_bit_arrays() {
        let tree = compile_schema("bit flags[24]; lbit more[8]; u8 after;").unwrap();
        assert_eq!(offsets(&tree), vec![("flags", 0), ("more", 3), ("after", 4)]);
        let flags = tree.root().field("flags").unwrap().kind.as_array().unwrap();
        assert_eq!(flags.stride_bits(), 1);
        assert_eq!(
            *flags.element,
            NodeKind::Scalar(ScalarKind::Bit(BitOrder::MsbFirst))
        );

        assert!(matches!(
            compile_schema("bit foo[12];"),
            Err(SchemaError::BitArrayLength { count: 12, .. })
        ));
    }

    #[test]
    fn test_unions() {
        let tree = compile_schema("union { u16 word; ul16 lword; u8 bytes[2]; } u; u8 next;")
            .unwrap();
        assert_eq!(offsets(&tree), vec![("u", 0), ("next", 2)]);
        let union = tree.root().field("u").unwrap().kind.as_struct().unwrap();
        assert!(union.is_union());
        assert!(union.fields().iter().all(|f| f.offset == 0));

        assert!(matches!(
            compile_schema("union { u8 a; u16 b; } u;"),
            Err(SchemaError::UnionSizeMismatch { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            compile_schema("union { } u;"),
            Err(SchemaError::EmptyUnion { .. })
        ));
        assert!(matches!(
            compile_schema("union { u8 a; #seek 1; } u;"),
            Err(SchemaError::DirectiveInUnion { .. })
        ));
    }

    #[test]
    fn test_named_struct_types() {
        let tree =
            compile_schema("struct limit { ul16 lo; ul16 hi; };\nstruct limit vhf;\nstruct limit uhf;")
                .unwrap();
        assert_eq!(offsets(&tree), vec![("vhf", 0), ("uhf", 4)]);
        let limit = tree.struct_type("limit").unwrap();
        assert_eq!(limit.name(), Some("limit"));
        assert_eq!(
            limit.field("hi").unwrap().kind,
            NodeKind::Scalar(ScalarKind::Int(IntType::unsigned(2, Endianness::Little)))
        );

        assert_eq!(
            compile_schema("u8 a;\nstruct missing m;"),
            Err(SchemaError::UndefinedStruct {
                line: 2,
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_names_renamed() {
        let tree = compile_schema("u8 foo; u8 foo;").unwrap();
        let names: Vec<&str> = tree.root().field_names().collect();
        assert_eq!(names, vec!["foo", "foo_000001"]);
    }

    #[test]
    fn test_bit_spans() {
        let tree = compile_schema("u8 a:2, b:3, c:3; u8 d;").unwrap();
        let spans: Vec<Range<u64>> = tree.root().fields().iter().map(|f| f.bit_span()).collect();
        assert_eq!(spans, vec![0..2, 2..5, 5..8, 8..16]);
    }

    #[test]
    fn test_describe() {
        let tree = compile_schema("struct { lbcd freq[4]; } memory[128];").unwrap();
        let memory = tree.root().field("memory").unwrap();
        assert_eq!(memory.kind.describe(), "struct[128]");
        let element = memory.kind.as_array().unwrap().element.as_struct().unwrap();
        assert_eq!(element.field("freq").unwrap().kind.describe(), "lbcd[4]");
    }
}
