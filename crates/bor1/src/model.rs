//! §3 — the value taxonomy (`Kind`/`Cell`) and buffer taxonomy
//! (`BufferKind`), host-agnostic: cells reference buffers and atoms purely
//! through the opaque [`crate::host::BufferId`] / [`crate::host::AtomId`]
//! handles the host hands back, never through a pointer.

use crate::host::{AtomId, BufferId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wire values for a word cell's binding tag byte (§4.5).
pub(crate) const BINDING_UNBOUND: u8 = 0;
pub(crate) const BINDING_THREAD: u8 = 1;

/// Wire values for a series cell's range-mode byte (§4.5, §8 negative test
/// uses the out-of-range value 3).
pub(crate) const RANGE_ALL: u8 = 0;
pub(crate) const RANGE_ITER: u8 = 1;
pub(crate) const RANGE_SLICE: u8 = 2;

/// The closed tag enumeration cells are drawn from (§3). Discriminants are
/// exactly the wire tag values used in the low 7 bits of a cell's tag byte
/// (§4.5) and, for the series/context kinds, the `BKIND` byte (§4.6) — the
/// same numbering the reference source reuses across cells and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Kind {
    /// No value.
    Unset = 0,
    /// The `none` value.
    None = 1,
    /// Boolean.
    Logic = 2,
    /// Unicode codepoint.
    Char = 3,
    /// Signed 32-bit integer.
    Int = 4,
    /// 64-bit float.
    Decimal = 5,
    /// 64-bit integer.
    Bignum = 6,
    /// 64-bit float, time-of-day semantics.
    Time = 7,
    /// 64-bit float, calendar-date semantics.
    Date = 8,
    /// 1..6 signed 16-bit components.
    Coord = 9,
    /// Three 32-bit floats.
    Vec3 = 10,
    /// Four signed 16-bit components plus a drop-frame flag.
    TimeCode = 11,
    /// A single kind index, or a multi-type bitmask.
    Datatype = 12,
    /// `word`
    Word = 13,
    /// `'word` (lit-word)
    LitWord = 14,
    /// `word:` (set-word)
    SetWord = 15,
    /// `:word` (get-word)
    GetWord = 16,
    /// `/word` (refinement/option)
    Option = 17,
    /// Byte series.
    Binary = 18,
    /// Bit series.
    Bitset = 19,
    /// Text series.
    String = 20,
    /// File-path series (text-like).
    File = 21,
    /// Homogeneous numeric series.
    Vector = 22,
    /// Evaluable block series.
    Block = 23,
    /// Parenthesized (always-evaluate) block series.
    Paren = 24,
    /// `a/b/c`
    Path = 25,
    /// `'a/b/c`
    LitPath = 26,
    /// `a/b/c:`
    SetPath = 27,
    /// Named context (word → slot map).
    Context = 28,
    /// Stub error value (payload not preserved, §9).
    Error = 29,
}

impl Kind {
    /// The highest valid discriminant; decoding rejects any tag byte whose
    /// low 7 bits decode to a value greater than this (§4.8).
    pub const MAX: u8 = Kind::Error as u8;

    /// Inverts the discriminant, rejecting out-of-range bytes.
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        use Kind::*;
        Some(match v {
            0 => Unset,
            1 => None,
            2 => Logic,
            3 => Char,
            4 => Int,
            5 => Decimal,
            6 => Bignum,
            7 => Time,
            8 => Date,
            9 => Coord,
            10 => Vec3,
            11 => TimeCode,
            12 => Datatype,
            13 => Word,
            14 => LitWord,
            15 => SetWord,
            16 => GetWord,
            17 => Option,
            18 => Binary,
            19 => Bitset,
            20 => String,
            21 => File,
            22 => Vector,
            23 => Block,
            24 => Paren,
            25 => Path,
            26 => LitPath,
            27 => SetPath,
            28 => Context,
            29 => Error,
            _ => return core::option::Option::None,
        })
    }
}

/// Buffer-kind tag (`BKIND`, §3/§4.6). Shares its wire representation with
/// the corresponding [`Kind`] variant, as the reference source uses one tag
/// space for both a cell's type and the buffer it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BufferKind {
    /// Byte array.
    Bin,
    /// Bit array.
    Bitset,
    /// Text elements.
    Str,
    /// File-path elements.
    File,
    /// Homogeneous numeric elements.
    Vector,
    /// Cell array, evaluable.
    Block,
    /// Cell array, always-evaluate.
    Paren,
    /// Cell array, path semantics.
    Path,
    /// Cell array, lit-path semantics.
    LitPath,
    /// Cell array, set-path semantics.
    SetPath,
    /// Atom→slot map plus parallel cell array.
    Context,
}

impl BufferKind {
    /// The on-wire `BKIND` byte, equal to the matching [`Kind`]'s
    /// discriminant.
    #[must_use]
    pub fn tag(self) -> u8 {
        use BufferKind::*;
        (match self {
            Bin => Kind::Binary,
            Bitset => Kind::Bitset,
            Str => Kind::String,
            File => Kind::File,
            Vector => Kind::Vector,
            Block => Kind::Block,
            Paren => Kind::Paren,
            Path => Kind::Path,
            LitPath => Kind::LitPath,
            SetPath => Kind::SetPath,
            Context => Kind::Context,
        }) as u8
    }

    /// Inverts [`BufferKind::tag`].
    #[must_use]
    pub fn from_tag(tag: u8) -> core::option::Option<Self> {
        use BufferKind::*;
        Some(match Kind::from_u8(tag)? {
            Kind::Binary => Bin,
            Kind::Bitset => Bitset,
            Kind::String => Str,
            Kind::File => File,
            Kind::Vector => Vector,
            Kind::Block => Block,
            Kind::Paren => Paren,
            Kind::Path => Path,
            Kind::LitPath => LitPath,
            Kind::SetPath => SetPath,
            Kind::Context => Context,
            _ => return core::option::Option::None,
        })
    }

    /// Whether this buffer kind stores raw elements (`BIN`/`BITSET`) rather
    /// than cells.
    #[must_use]
    pub fn is_byte_like(self) -> bool {
        matches!(self, BufferKind::Bin | BufferKind::Bitset)
    }

    /// Whether this buffer kind stores fixed-width elements with a `form`
    /// byte (`STR`/`FILE`/`VECTOR`).
    #[must_use]
    pub fn is_elem_series(self) -> bool {
        matches!(self, BufferKind::Str | BufferKind::File | BufferKind::Vector)
    }
}

/// `COORD`: 1..6 signed 16-bit components with an explicit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coord {
    /// Active component count, 1..=6.
    pub len: u8,
    /// Component storage; only `[0..len)` is meaningful.
    pub n: [i16; 6],
}

impl Coord {
    /// Builds a coord from a slice of 1..=6 components.
    ///
    /// # Panics
    /// Panics if `components` is empty or has more than 6 entries.
    #[must_use]
    pub fn new(components: &[i16]) -> Self {
        assert!(
            !components.is_empty() && components.len() <= 6,
            "COORD must have 1..=6 components"
        );
        let mut n = [0i16; 6];
        n[..components.len()].copy_from_slice(components);
        Self { len: components.len() as u8, n }
    }

    /// The active components.
    #[must_use]
    pub fn components(&self) -> &[i16] {
        &self.n[..self.len as usize]
    }
}

/// `TIMECODE`: four signed 16-bit components plus a drop-frame flag (§9:
/// implemented unconditionally rather than gated behind a build feature, per
/// the resolved open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeCode {
    /// Drop-frame flag.
    pub drop_frame: bool,
    /// Hours/minutes/seconds/frames (or equivalent four-component layout).
    pub n: [i16; 4],
}

/// `DATATYPE` payload: either a single kind, or a multi-type bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataTypeValue {
    /// Names exactly one kind.
    Single(Kind),
    /// Names a set of kinds via two 32-bit masks (bit `i` of `mask0`/`mask1`
    /// together addressing kinds 0..=63).
    TypeMask {
        /// High-order mask half (kinds 0..=31); transmitted big-endian fixed
        /// width since it is "often set" per the reference source.
        mask0: u32,
        /// Low-order mask half (kinds 32..=63); transmitted as a varint
        /// since its high bits are "seldom set".
        mask1: u32,
    },
}

/// Which of the five word-like kinds a [`CellValue::Word`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WordSub {
    /// `word`
    Word,
    /// `'word`
    LitWord,
    /// `word:`
    SetWord,
    /// `:word`
    GetWord,
    /// `/word`
    Option,
}

impl WordSub {
    #[must_use]
    pub(crate) fn kind(self) -> Kind {
        match self {
            WordSub::Word => Kind::Word,
            WordSub::LitWord => Kind::LitWord,
            WordSub::SetWord => Kind::SetWord,
            WordSub::GetWord => Kind::GetWord,
            WordSub::Option => Kind::Option,
        }
    }

    pub(crate) fn from_kind(kind: Kind) -> core::option::Option<Self> {
        Some(match kind {
            Kind::Word => WordSub::Word,
            Kind::LitWord => WordSub::LitWord,
            Kind::SetWord => WordSub::SetWord,
            Kind::GetWord => WordSub::GetWord,
            Kind::Option => WordSub::Option,
            _ => return core::option::Option::None,
        })
    }
}

/// A word's binding (§3 "Binding", §4.5 binding policy). The wire format
/// only ever distinguishes `Unbound` from `Thread` (see §4.5: `ENV`
/// bindings that survive the global-context check are written with the same
/// `Thread` tag); there is no `Env` variant to round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Binding {
    /// No context binding.
    Unbound,
    /// Bound into `ctx` at slot `index`.
    Thread {
        /// The context buffer this word resolves against.
        ctx: BufferId,
        /// Slot index within that context.
        index: u32,
    },
}

/// Which of the ten series-reference kinds a [`CellValue::Series`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeriesSub {
    /// `binary!`
    Binary,
    /// `bitset!`
    Bitset,
    /// `string!`
    String,
    /// `file!`
    File,
    /// `vector!`
    Vector,
    /// `block!`
    Block,
    /// `paren!`
    Paren,
    /// `path!`
    Path,
    /// `lit-path!`
    LitPath,
    /// `set-path!`
    SetPath,
}

impl SeriesSub {
    #[must_use]
    pub(crate) fn kind(self) -> Kind {
        match self {
            SeriesSub::Binary => Kind::Binary,
            SeriesSub::Bitset => Kind::Bitset,
            SeriesSub::String => Kind::String,
            SeriesSub::File => Kind::File,
            SeriesSub::Vector => Kind::Vector,
            SeriesSub::Block => Kind::Block,
            SeriesSub::Paren => Kind::Paren,
            SeriesSub::Path => Kind::Path,
            SeriesSub::LitPath => Kind::LitPath,
            SeriesSub::SetPath => Kind::SetPath,
        }
    }

    pub(crate) fn from_kind(kind: Kind) -> core::option::Option<Self> {
        Some(match kind {
            Kind::Binary => SeriesSub::Binary,
            Kind::Bitset => SeriesSub::Bitset,
            Kind::String => SeriesSub::String,
            Kind::File => SeriesSub::File,
            Kind::Vector => SeriesSub::Vector,
            Kind::Block => SeriesSub::Block,
            Kind::Paren => SeriesSub::Paren,
            Kind::Path => SeriesSub::Path,
            Kind::LitPath => SeriesSub::LitPath,
            Kind::SetPath => SeriesSub::SetPath,
            _ => return core::option::Option::None,
        })
    }

    /// The buffer kind a series of this sub-kind points at; identical
    /// numbering to the cell kind (§3).
    #[must_use]
    pub fn buffer_kind(self) -> BufferKind {
        match self {
            SeriesSub::Binary => BufferKind::Bin,
            SeriesSub::Bitset => BufferKind::Bitset,
            SeriesSub::String => BufferKind::Str,
            SeriesSub::File => BufferKind::File,
            SeriesSub::Vector => BufferKind::Vector,
            SeriesSub::Block => BufferKind::Block,
            SeriesSub::Paren => BufferKind::Paren,
            SeriesSub::Path => BufferKind::Path,
            SeriesSub::LitPath => BufferKind::LitPath,
            SeriesSub::SetPath => BufferKind::SetPath,
        }
    }
}

/// A series cell's cursor (§3 invariant 2, §4.5 range-mode, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeriesRange {
    /// Unsliced: `it = 0`, "through the live end".
    All,
    /// Unsliced but positioned: `it > 0`, still "through the live end".
    Iter {
        /// Start cursor.
        it: u32,
    },
    /// Sliced: bounded to `[it, end)`.
    Slice {
        /// Start cursor.
        it: u32,
        /// End cursor (inclusive of nothing past it — a half-open bound).
        end: u32,
    },
}

impl SeriesRange {
    /// The start cursor, regardless of variant.
    #[must_use]
    pub fn it(self) -> u32 {
        match self {
            SeriesRange::All => 0,
            SeriesRange::Iter { it } | SeriesRange::Slice { it, .. } => it,
        }
    }

    /// The end cursor, or `None` if unsliced (the spec's `end = -1`).
    #[must_use]
    pub fn end(self) -> core::option::Option<u32> {
        match self {
            SeriesRange::Slice { end, .. } => Some(end),
            SeriesRange::All | SeriesRange::Iter { .. } => core::option::Option::None,
        }
    }
}

/// A fixed-size tagged value (§3 "cell"). Shared buffers and bound contexts
/// are referenced through the opaque [`BufferId`]/[`AtomId`] the host
/// assigned them — never through a pointer — so the same `Cell` value is
/// meaningful whether it just came out of the decoder or is about to be fed
/// to the encoder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellValue {
    /// No value.
    Unset,
    /// The `none` value.
    None,
    /// Boolean.
    Logic(bool),
    /// Unicode codepoint.
    Char(u32),
    /// Signed 32-bit integer.
    Int(i32),
    /// 64-bit float.
    Decimal(f64),
    /// 64-bit integer.
    Bignum(i64),
    /// 64-bit float, time-of-day semantics.
    Time(f64),
    /// 64-bit float, calendar-date semantics.
    Date(f64),
    /// 1..6 signed 16-bit components.
    Coord(Coord),
    /// Three 32-bit floats.
    Vec3([f32; 3]),
    /// Four signed 16-bit components plus a drop-frame flag.
    TimeCode(TimeCode),
    /// A single kind index, or a multi-type bitmask.
    Datatype(DataTypeValue),
    /// A word-like cell: `word`/`'word`/`word:`/`:word`/`/word`.
    Word {
        /// Which word-like kind this is.
        sub: WordSub,
        /// The word's interned name.
        atom: AtomId,
        /// Its context binding, if any.
        binding: Binding,
    },
    /// A series-reference cell pointing into a heap buffer at a cursor.
    Series {
        /// Which series kind this is.
        sub: SeriesSub,
        /// The buffer this cell points into.
        buf: BufferId,
        /// Its positional cursor / slice bounds.
        range: SeriesRange,
    },
    /// A reference to a named context buffer.
    Context {
        /// The context buffer.
        buf: BufferId,
    },
    /// Stub error value; no payload is preserved across a round trip (§9).
    Error,
}

impl CellValue {
    /// The [`Kind`] this value's tag byte carries.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            CellValue::Unset => Kind::Unset,
            CellValue::None => Kind::None,
            CellValue::Logic(_) => Kind::Logic,
            CellValue::Char(_) => Kind::Char,
            CellValue::Int(_) => Kind::Int,
            CellValue::Decimal(_) => Kind::Decimal,
            CellValue::Bignum(_) => Kind::Bignum,
            CellValue::Time(_) => Kind::Time,
            CellValue::Date(_) => Kind::Date,
            CellValue::Coord(_) => Kind::Coord,
            CellValue::Vec3(_) => Kind::Vec3,
            CellValue::TimeCode(_) => Kind::TimeCode,
            CellValue::Datatype(_) => Kind::Datatype,
            CellValue::Word { sub, .. } => sub.kind(),
            CellValue::Series { sub, .. } => sub.kind(),
            CellValue::Context { .. } => Kind::Context,
            CellValue::Error => Kind::Error,
        }
    }
}

/// A cell plus its start-of-line flag (§3).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    /// Significant for block-typed cells: marks that this cell starts a new
    /// source line.
    pub sol: bool,
    /// The tagged value itself.
    pub value: CellValue,
}

impl Cell {
    /// Wraps a value with `sol = false`.
    #[must_use]
    pub fn new(value: CellValue) -> Self {
        Self { sol: false, value }
    }

    /// Wraps a value with `sol = true`.
    #[must_use]
    pub fn with_sol(value: CellValue) -> Self {
        Self { sol: true, value }
    }
}
