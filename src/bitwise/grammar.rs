// Schema and path grammar (nom front end)
// Reference: chirp/bitwise_grammar.py

use super::error::SchemaError;
use super::types::ScalarKind;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, preceded},
    IResult, Parser,
};

/// One statement of a schema, tagged with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub line: usize,
    pub body: ItemBody,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemBody {
    /// `u8 foo;` or `u8 foo[4];`
    Field {
        ty: ScalarKind,
        ty_name: String,
        name: String,
        count: Option<u64>,
    },
    /// `u8 a:2, b:3, c:3;`
    Bitfields {
        ty: ScalarKind,
        ty_name: String,
        fields: Vec<(String, u64)>,
    },
    /// A struct instance, inline or by type name
    Struct {
        body: StructBody,
        name: String,
        count: Option<u64>,
    },
    /// `struct name { ... };`
    StructDef { name: String, items: Vec<Item> },
    Union {
        items: Vec<Item>,
        name: String,
        count: Option<u64>,
    },
    SeekTo(u64),
    Seek(u64),
    PrintOffset(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StructBody {
    Inline(Vec<Item>),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Reason {
    Syntax,
    UnknownType(String),
    UnknownDirective(String),
    InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GrammarError<'a> {
    input: &'a str,
    reason: Reason,
}

impl<'a> GrammarError<'a> {
    fn failure(input: &'a str, reason: Reason) -> nom::Err<Self> {
        nom::Err::Failure(Self { input, reason })
    }
}

impl<'a> ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            reason: Reason::Syntax,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type Res<'a, T> = IResult<&'a str, T, GrammarError<'a>>;

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ws(i: &str) -> Res<'_, &str> {
    multispace0(i)
}

fn ident(i: &str) -> Res<'_, &str> {
    preceded(multispace0, take_while1(is_word)).parse(i)
}

fn punct<'a>(c: char) -> impl FnMut(&'a str) -> Res<'a, char> {
    move |i| preceded(multispace0, char(c)).parse(i)
}

fn string_lit(i: &str) -> Res<'_, &str> {
    preceded(
        multispace0,
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
    )
    .parse(i)
}

/// Decimal or `0x`-prefixed hexadecimal
fn number(i: &str) -> Res<'_, u64> {
    let (rest, text) = ident(i)?;
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    match parsed {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(GrammarError::failure(
            i.trim_start(),
            Reason::InvalidNumber(text.to_string()),
        )),
    }
}

/// Optional `[count]` suffix
fn count_suffix(i: &str) -> Res<'_, Option<u64>> {
    let (rest, _) = ws(i)?;
    if !rest.starts_with('[') {
        return Ok((rest, None));
    }
    let (rest, count) = delimited(punct('['), number, punct(']')).parse(rest)?;
    Ok((rest, Some(count)))
}

/// `name` or `name[count]`
fn declarator(i: &str) -> Res<'_, (String, Option<u64>)> {
    let (rest, name) = ident(i)?;
    let (rest, count) = count_suffix(rest)?;
    Ok((rest, (name.to_string(), count)))
}

struct SchemaGrammar<'a> {
    src: &'a str,
}

impl<'a> SchemaGrammar<'a> {
    fn line_at(&self, rest: &str) -> usize {
        let consumed = self.src.len() - rest.len();
        self.src[..consumed].matches('\n').count() + 1
    }

    fn items(&self, mut i: &'a str, in_block: bool) -> Res<'a, Vec<Item>> {
        let mut items = Vec::new();
        loop {
            let (rest, _) = ws(i)?;
            if rest.is_empty() || (in_block && rest.starts_with('}')) {
                return Ok((rest, items));
            }
            let (rest, item) = self.item(rest)?;
            items.push(item);
            i = rest;
        }
    }

    fn item(&self, i: &'a str) -> Res<'a, Item> {
        let line = self.line_at(i);
        if let Some(rest) = i.strip_prefix('#') {
            let (rest, body) = self.directive(rest)?;
            return Ok((rest, Item { line, body }));
        }

        let (rest, word) = ident(i)?;
        let (rest, body) = match word {
            "struct" => self.struct_item(rest)?,
            "union" => self.union_item(rest)?,
            _ => match ScalarKind::from_name(word) {
                Some(ty) => self.definition(rest, ty, word)?,
                None => {
                    return Err(GrammarError::failure(
                        i,
                        Reason::UnknownType(word.to_string()),
                    ))
                }
            },
        };
        Ok((rest, Item { line, body }))
    }

    fn directive(&self, i: &'a str) -> Res<'a, ItemBody> {
        let (rest, word) = ident(i)?;
        let (rest, body) = match word {
            "seekto" => map(number, ItemBody::SeekTo).parse(rest)?,
            "seek" => map(number, ItemBody::Seek).parse(rest)?,
            "printoffset" => map(string_lit, |s: &str| ItemBody::PrintOffset(s.to_string()))
                .parse(rest)?,
            _ => {
                return Err(GrammarError::failure(
                    i,
                    Reason::UnknownDirective(word.to_string()),
                ))
            }
        };
        let (rest, _) = punct(';')(rest)?;
        Ok((rest, body))
    }

    fn definition(&self, i: &'a str, ty: ScalarKind, ty_name: &str) -> Res<'a, ItemBody> {
        let (rest, name) = ident(i)?;
        let (rest, _) = ws(rest)?;

        if rest.starts_with(':') {
            let (mut rest, width) = preceded(punct(':'), number).parse(rest)?;
            let mut fields = vec![(name.to_string(), width)];
            loop {
                let (next, _) = ws(rest)?;
                if !next.starts_with(',') {
                    break;
                }
                let (next, _) = punct(',')(next)?;
                let (next, field) = ident(next)?;
                let (next, width) = preceded(punct(':'), number).parse(next)?;
                fields.push((field.to_string(), width));
                rest = next;
            }
            let (rest, _) = punct(';')(rest)?;
            return Ok((
                rest,
                ItemBody::Bitfields {
                    ty,
                    ty_name: ty_name.to_string(),
                    fields,
                },
            ));
        }

        let (rest, count) = count_suffix(rest)?;
        let (rest, _) = punct(';')(rest)?;
        Ok((
            rest,
            ItemBody::Field {
                ty,
                ty_name: ty_name.to_string(),
                name: name.to_string(),
                count,
            },
        ))
    }

    fn block(&self, i: &'a str) -> Res<'a, Vec<Item>> {
        let (rest, _) = punct('{')(i)?;
        let (rest, items) = self.items(rest, true)?;
        let (rest, _) = punct('}')(rest)?;
        Ok((rest, items))
    }

    fn struct_item(&self, i: &'a str) -> Res<'a, ItemBody> {
        let (rest, _) = ws(i)?;
        if rest.starts_with('{') {
            let (rest, items) = self.block(rest)?;
            let (rest, (name, count)) = declarator(rest)?;
            let (rest, _) = punct(';')(rest)?;
            return Ok((
                rest,
                ItemBody::Struct {
                    body: StructBody::Inline(items),
                    name,
                    count,
                },
            ));
        }

        let (rest, type_name) = ident(rest)?;
        let (after, _) = ws(rest)?;
        if after.starts_with('{') {
            let (rest, items) = self.block(after)?;
            let (rest, _) = punct(';')(rest)?;
            return Ok((
                rest,
                ItemBody::StructDef {
                    name: type_name.to_string(),
                    items,
                },
            ));
        }

        let (rest, (name, count)) = declarator(rest)?;
        let (rest, _) = punct(';')(rest)?;
        Ok((
            rest,
            ItemBody::Struct {
                body: StructBody::Named(type_name.to_string()),
                name,
                count,
            },
        ))
    }

    fn union_item(&self, i: &'a str) -> Res<'a, ItemBody> {
        let (rest, items) = self.block(i)?;
        let (rest, (name, count)) = declarator(rest)?;
        let (rest, _) = punct(';')(rest)?;
        Ok((rest, ItemBody::Union { items, name, count }))
    }

    fn to_schema_error(&self, err: GrammarError<'a>) -> SchemaError {
        let at = err.input.trim_start();
        let line = self.line_at(at);
        match err.reason {
            Reason::UnknownType(name) => SchemaError::UnknownType { line, name },
            Reason::UnknownDirective(name) => SchemaError::UnknownDirective { line, name },
            Reason::InvalidNumber(text) => SchemaError::InvalidNumber { line, text },
            Reason::Syntax => {
                let near: String = at.lines().next().unwrap_or("").chars().take(24).collect();
                SchemaError::Syntax {
                    line,
                    near: if near.is_empty() {
                        "end of input".to_string()
                    } else {
                        near
                    },
                }
            }
        }
    }
}

/// Replace `//` and `/* */` comments with spaces, keeping newlines so
/// line numbers survive
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn check_braces(text: &str) -> Result<(), SchemaError> {
    let mut open = Vec::new();
    let mut line = 1;
    for c in text.chars() {
        match c {
            '\n' => line += 1,
            '{' => open.push(line),
            '}' => {
                if open.pop().is_none() {
                    return Err(SchemaError::UnbalancedBraces { line });
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(line) => Err(SchemaError::UnbalancedBraces { line }),
        None => Ok(()),
    }
}

/// Parse schema text into its statement list
pub(crate) fn parse_schema(text: &str) -> Result<Vec<Item>, SchemaError> {
    let src = strip_comments(text);
    check_braces(&src)?;

    let grammar = SchemaGrammar { src: &src };
    match grammar.items(&src, false) {
        Ok((_, items)) => Ok(items),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(grammar.to_schema_error(e)),
        Err(nom::Err::Incomplete(_)) => Err(SchemaError::Syntax {
            line: grammar.line_at(""),
            near: "end of input".to_string(),
        }),
    }
}

/// One step of a field path: `.name` or `[index]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathSegment<'p> {
    Field(&'p str),
    Index(usize),
}

fn path_segment(i: &str) -> Res<'_, PathSegment<'_>> {
    alt((
        map(delimited(char('['), number, char(']')), |n: u64| {
            PathSegment::Index(usize::try_from(n).unwrap_or(usize::MAX))
        }),
        map(preceded(char('.'), take_while1(is_word)), PathSegment::Field),
    ))
    .parse(i)
}

/// Split `memory[2].freq` (or `.memory[2].freq`) into segments
pub(crate) fn parse_path(path: &str) -> Option<Vec<PathSegment<'_>>> {
    let (rest, first) = match take_while1::<_, _, GrammarError>(is_word).parse(path) {
        Ok((rest, name)) => (rest, Some(PathSegment::Field(name))),
        Err(_) => (path, None),
    };
    let (_, tail) = all_consuming(many0(path_segment)).parse(rest).ok()?;
    let segments: Vec<_> = first.into_iter().chain(tail).collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
