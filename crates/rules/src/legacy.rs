//! Decoder for compact legacy opcode streams.
//!
//! A legacy rule is `(id, value, logic)`. Ids below `0x0200` are match
//! rules, ids in `[0x0200, 0x0300)` are set rules and `0x0300` is the patch
//! extension, whose value `N` is followed by `N` payload entries encoding
//! one [`PatchBlock`] each (`id` = destination byte, `value` =
//! `size << 8 | source`). `0xFFFF` starts a rule set (value = group) and
//! `0xFFFE` ends the stream.
//!
//! On disk each entry is [`ENTRY_BYTES`] little-endian bytes: `u16` id,
//! `i16` value, `u32` logic (0 none, 1 or, 2 not).
//!
//! Value encodings:
//!
//! | kind        | encoding |
//! |-------------|----------|
//! | format      | -2 none/clear, -1 source, 0 any, 1..=21 exact ([`PixelFormat`] order), 100 RGB, 101 PA, 102 PL2, 103 PL3, 104 PL3_RGB |
//! | colorspace  | -2 clear, -1 source, 0 any, 1..=12 exact ([`ColorSpace`] order) |
//! | sampling    | -2 none/clear, -1 source, 0 any, 2 scaling, 3 0.34x, 4 iscaling, 5 iscaling 0.34x, 6 iscaling AVS, 7 AVS |
//! | processing  | -2 none/clear, -1 source, 0 any, 1..=11 exact ([`Processing`] order) |
//! | coefficient | -3 source, -2 any, -1 none/clear, 0..=5 slot |
//! | procamp     | match: -1 none, -2 any, >= 0 id; set: -1 source, -2 clear, >= 0 id |
//! | rotation    | match: 0..=7; set: 0 source, 1..=7 exact |
//! | flags       | 0 / 1; set: -1 source |

use byteorder::{ByteOrder, LittleEndian};
use kdll_common::{
    CoeffId, ColorSpace, CscCoeffMode, FormatPattern, LayerRole, Operand, PatchBlock, PatchKind,
    Pattern, PixelFormat, Processing, RenderMethod, Rotation, RuleError, RuleGroup, Sampling,
    ScalingRatio, Shuffling, TileType, KernelId,
};

use crate::rule::{Action, ExtendedAction, LayerStep, Logic, Predicate, Rule};
use crate::state::ParserState;

pub const OP_EOF: u16 = 0xFFFE;
pub const OP_NEW_ENTRY: u16 = 0xFFFF;
pub const OP_SET_BASE: u16 = 0x0200;
pub const OP_SET_PATCH: u16 = 0x0300;

/// Size of one serialized entry.
pub const ENTRY_BYTES: usize = 8;

/// One legacy rule entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LegacyEntry {
    pub id: u16,
    pub value: i32,
    pub logic: Logic,
}

impl LegacyEntry {
    pub const fn new(id: u16, value: i32) -> Self {
        Self {
            id,
            value,
            logic: Logic::None,
        }
    }

    pub const fn or(id: u16, value: i32) -> Self {
        Self {
            id,
            value,
            logic: Logic::Or,
        }
    }

    pub const fn not(id: u16, value: i32) -> Self {
        Self {
            id,
            value,
            logic: Logic::Not,
        }
    }
}

const FORMATS: [PixelFormat; 21] = [
    PixelFormat::Argb8,
    PixelFormat::Xrgb8,
    PixelFormat::Abgr8,
    PixelFormat::Xbgr8,
    PixelFormat::Rgb565,
    PixelFormat::R10G10B10A2,
    PixelFormat::B10G10R10A2,
    PixelFormat::Ayuv,
    PixelFormat::Yuy2,
    PixelFormat::Yuyv,
    PixelFormat::Yvyu,
    PixelFormat::Uyvy,
    PixelFormat::Vyuy,
    PixelFormat::Nv12,
    PixelFormat::Nv21,
    PixelFormat::P010,
    PixelFormat::Yv12,
    PixelFormat::I420,
    PixelFormat::Y400,
    PixelFormat::Rgbp,
    PixelFormat::Bgrp,
];

const COLOR_SPACES: [ColorSpace; 12] = [
    ColorSpace::Bt601,
    ColorSpace::Bt709,
    ColorSpace::Bt601FullRange,
    ColorSpace::Bt709FullRange,
    ColorSpace::XvYcc601,
    ColorSpace::XvYcc709,
    ColorSpace::Bt2020,
    ColorSpace::Bt2020FullRange,
    ColorSpace::Srgb,
    ColorSpace::StRgb,
    ColorSpace::Bt2020Rgb,
    ColorSpace::Bt2020StRgb,
];

const PROCESSING: [Processing; 11] = [
    Processing::Composite,
    Processing::XorComposite,
    Processing::PartialBlend,
    Processing::ConstBlend,
    Processing::SourceBlend,
    Processing::SourceBlend4Bits,
    Processing::ConstSourceBlend,
    Processing::ConstPartialBlend,
    Processing::Deinterlace,
    Processing::Denoise,
    Processing::DenoiseDeinterlace,
];

const ROTATIONS: [Rotation; 8] = [
    Rotation::Identity,
    Rotation::Rotate90,
    Rotation::Rotate180,
    Rotation::Rotate270,
    Rotation::MirrorHorizontal,
    Rotation::MirrorVertical,
    Rotation::Rotate90MirrorVertical,
    Rotation::Rotate90MirrorHorizontal,
];

/// Decode a legacy stream. Decoding stops after the first EOF.
pub fn decode(entries: &[LegacyEntry]) -> Result<Vec<Rule>, RuleError> {
    let mut rules = Vec::with_capacity(entries.len());
    let mut i = 0;
    while i < entries.len() {
        let e = entries[i];
        i += 1;
        match e.id {
            OP_EOF => {
                rules.push(Rule::Eof);
                return Ok(rules);
            }
            OP_NEW_ENTRY => rules.push(Rule::NewEntry(group(e)?)),
            OP_SET_PATCH => {
                let n = usize::try_from(e.value).map_err(|_| invalid(e))?;
                let payload = entries
                    .get(i..i + n)
                    .ok_or(RuleError::TruncatedPayload { id: e.id })?;
                let blocks = payload
                    .iter()
                    .map(|p| {
                        let v = u16::try_from(p.value).map_err(|_| invalid(*p))?;
                        Ok(PatchBlock::new(p.id, (v & 0xFF) as u8, (v >> 8) as u8))
                    })
                    .collect::<Result<Vec<_>, RuleError>>()?;
                i += n;
                rules.push(Rule::Extended(ExtendedAction::Patch(blocks)));
            }
            id if id < OP_SET_BASE => rules.push(Rule::Match(predicate(e)?, e.logic)),
            id if id < OP_SET_PATCH => rules.push(Rule::Set(action(e)?)),
            _ => return Err(unknown(e)),
        }
    }
    Ok(rules)
}

/// Split a serialized stream into entries.
pub fn parse(bytes: &[u8]) -> Result<Vec<LegacyEntry>, RuleError> {
    if bytes.len() % ENTRY_BYTES != 0 {
        return Err(RuleError::MalformedLegacyStream { len: bytes.len() });
    }
    bytes
        .chunks_exact(ENTRY_BYTES)
        .map(|chunk| {
            let id = LittleEndian::read_u16(&chunk[0..2]);
            let value = i32::from(LittleEndian::read_i16(&chunk[2..4]));
            let logic = match LittleEndian::read_u32(&chunk[4..8]) {
                0 => Logic::None,
                1 => Logic::Or,
                2 => Logic::Not,
                _ => return Err(RuleError::InvalidValue { id, value }),
            };
            Ok(LegacyEntry { id, value, logic })
        })
        .collect()
}

/// Serialize entries; values must fit the 16-bit field.
pub fn encode(entries: &[LegacyEntry]) -> Result<Vec<u8>, RuleError> {
    let mut out = Vec::with_capacity(entries.len() * ENTRY_BYTES);
    for e in entries {
        let value = i16::try_from(e.value).map_err(|_| invalid(*e))?;
        let logic = match e.logic {
            Logic::None => 0,
            Logic::Or => 1,
            Logic::Not => 2,
        };
        let mut buf = [0u8; ENTRY_BYTES];
        LittleEndian::write_u16(&mut buf[0..2], e.id);
        LittleEndian::write_i16(&mut buf[2..4], value);
        LittleEndian::write_u32(&mut buf[4..8], logic);
        out.extend_from_slice(&buf);
    }
    Ok(out)
}

fn group(e: LegacyEntry) -> Result<RuleGroup, RuleError> {
    Ok(match e.value {
        0 => RuleGroup::Default,
        1 => RuleGroup::Custom,
        255 => RuleGroup::NoOverride,
        _ => return Err(invalid(e)),
    })
}

fn predicate(e: LegacyEntry) -> Result<Predicate, RuleError> {
    let v = e.value;
    let p = match e.id {
        0 => Predicate::TargetColorSpace(cspace_pattern(e)?),
        1 => Predicate::LayerId(match v {
            -1 => Pattern::None,
            _ => Pattern::Is(LayerRole::from_legacy_id(v).ok_or_else(|| invalid(e))?),
        }),
        2 => Predicate::LayerFormat(format_pattern(e)?),
        3 => Predicate::ParserState(ParserState::from_legacy(v).ok_or_else(|| invalid(e))?),
        4 => Predicate::RenderMethod(render_method(e)?),
        5 => Predicate::Shuffling(match v {
            -1 => Shuffling::None,
            1 => Shuffling::All8x8Layer,
            2 => Shuffling::RenderTarget,
            _ => return Err(invalid(e)),
        }),
        6 => Predicate::DualOutput(flag(e)?),
        7 => Predicate::LayerRotation(rotation(e)?),
        8 => Predicate::RtRotate(flag(e)?),
        9 => Predicate::Src0Format(format_pattern(e)?),
        10 => Predicate::Src0Sampling(sampling_pattern(e)?),
        11 => Predicate::Src0Rotation(rotation(e)?),
        12 => Predicate::Src0ColorFill(flag(e)?),
        13 => Predicate::Src0LumaKey(flag(e)?),
        14 => Predicate::Src0Procamp(procamp_pattern(e)?),
        15 => Predicate::Src0Coeff(coeff_pattern(e)?),
        16 => Predicate::Src0Processing(processing_pattern(e)?),
        17 => Predicate::Src0ChromaSiting(byte_pattern(e)?),
        18 => Predicate::Src1Format(format_pattern(e)?),
        19 => Predicate::Src1Sampling(sampling_pattern(e)?),
        20 => Predicate::Src1LumaKey(flag(e)?),
        21 => Predicate::Src1SamplerLumaKey(flag(e)?),
        22 => Predicate::Src1Procamp(procamp_pattern(e)?),
        23 => Predicate::Src1Coeff(coeff_pattern(e)?),
        24 => Predicate::Src1Processing(processing_pattern(e)?),
        25 => Predicate::Src1ChromaSiting(byte_pattern(e)?),
        26 => Predicate::LayerNumber(usize::try_from(v).map_err(|_| invalid(e))?),
        27 => Predicate::Quadrant(quadrant(e)?),
        28 => Predicate::CscBeforeMix(flag(e)?),
        29 => Predicate::TargetFormat(format_pattern(e)?),
        30 => Predicate::WideSaveEnabled(flag(e)?),
        31 => Predicate::TargetTileType(tile_type(e)?),
        32 => Predicate::ProcampEnabled(flag(e)?),
        33 => Predicate::CoeffMode(coeff_mode(e)?),
        34 => Predicate::ConstOutAlpha(flag(e)?),
        35 => Predicate::DitherNeeded(flag(e)?),
        36 => Predicate::ScalingRatio(scaling_ratio(e)?),
        _ => return Err(unknown(e)),
    };
    Ok(p)
}

fn action(e: LegacyEntry) -> Result<Action, RuleError> {
    let v = e.value;
    let a = match e.id - OP_SET_BASE {
        0x00 => Action::TargetColorSpace(cspace_operand(e)?),
        0x01 => Action::ParserState(ParserState::from_legacy(v).ok_or_else(|| invalid(e))?),
        0x02 => Action::Src0Format(format_operand(e)?),
        0x03 => Action::Src0Sampling(sampling_operand(e)?),
        0x04 => Action::Src0Rotation(rotation_operand(e)?),
        0x05 => Action::Src0ColorFill(flag_operand(e)?),
        0x06 => Action::Src0LumaKey(flag_operand(e)?),
        0x07 => Action::Src0Procamp(procamp_operand(e)?),
        0x08 => Action::Src0Coeff(coeff_operand(e)?),
        0x09 => Action::Src0Processing(processing_operand(e)?),
        0x0A => Action::Src1Format(format_operand(e)?),
        0x0B => Action::Src1Sampling(sampling_operand(e)?),
        0x0C => Action::Src1Rotation(rotation_operand(e)?),
        0x0D => Action::Src1LumaKey(flag_operand(e)?),
        0x0E => Action::Src1SamplerLumaKey(flag_operand(e)?),
        0x0F => Action::Src1Procamp(procamp_operand(e)?),
        0x10 => Action::Src1Coeff(coeff_operand(e)?),
        0x11 => Action::Src1Processing(processing_operand(e)?),
        0x12 => Action::Kernel(KernelId(u16::try_from(v).map_err(|_| invalid(e))?)),
        0x13 => Action::NextLayer(LayerStep::from_legacy(v).ok_or_else(|| invalid(e))?),
        0x14 => Action::PatchData(match v {
            1 => PatchKind::CscCoeffSrc0,
            2 => PatchKind::CscCoeffSrc1,
            _ => return Err(invalid(e)),
        }),
        0x15 => Action::Quadrant(quadrant(e)?),
        0x16 => Action::CscBeforeMix(flag(e)?),
        _ => return Err(unknown(e)),
    };
    Ok(a)
}

fn invalid(e: LegacyEntry) -> RuleError {
    RuleError::InvalidValue {
        id: e.id,
        value: e.value,
    }
}

fn unknown(e: LegacyEntry) -> RuleError {
    RuleError::UnknownOpcode {
        id: e.id,
        value: e.value,
    }
}

fn indexed<T: Copy>(table: &[T], e: LegacyEntry) -> Result<T, RuleError> {
    e.value
        .checked_sub(1)
        .and_then(|v| usize::try_from(v).ok())
        .and_then(|i| table.get(i).copied())
        .ok_or_else(|| invalid(e))
}

fn format_pattern(e: LegacyEntry) -> Result<FormatPattern, RuleError> {
    Ok(match e.value {
        -2 => FormatPattern::None,
        0 => FormatPattern::Any,
        100 => FormatPattern::Rgb,
        101 => FormatPattern::Packed,
        102 => FormatPattern::Planar2,
        103 => FormatPattern::Planar3,
        104 => FormatPattern::Planar3Rgb,
        _ => FormatPattern::Exact(indexed(&FORMATS, e)?),
    })
}

fn format_operand(e: LegacyEntry) -> Result<Operand<PixelFormat>, RuleError> {
    Ok(match e.value {
        -2 => Operand::Clear,
        -1 => Operand::Source,
        _ => Operand::Value(indexed(&FORMATS, e)?),
    })
}

fn cspace_pattern(e: LegacyEntry) -> Result<Pattern<ColorSpace>, RuleError> {
    Ok(match e.value {
        0 => Pattern::Any,
        _ => Pattern::Is(indexed(&COLOR_SPACES, e)?),
    })
}

fn cspace_operand(e: LegacyEntry) -> Result<Operand<ColorSpace>, RuleError> {
    Ok(match e.value {
        -2 => Operand::Clear,
        -1 => Operand::Source,
        _ => Operand::Value(indexed(&COLOR_SPACES, e)?),
    })
}

fn sampling_value(e: LegacyEntry) -> Result<Sampling, RuleError> {
    Ok(match e.value {
        2 => Sampling::Scaling,
        3 => Sampling::Scaling034x,
        4 => Sampling::IScaling,
        5 => Sampling::IScaling034x,
        6 => Sampling::IScalingAvs,
        7 => Sampling::ScalingAvs,
        _ => return Err(invalid(e)),
    })
}

fn sampling_pattern(e: LegacyEntry) -> Result<Pattern<Sampling>, RuleError> {
    Ok(match e.value {
        -2 => Pattern::None,
        0 => Pattern::Any,
        _ => Pattern::Is(sampling_value(e)?),
    })
}

fn sampling_operand(e: LegacyEntry) -> Result<Operand<Sampling>, RuleError> {
    Ok(match e.value {
        -2 => Operand::Clear,
        -1 => Operand::Source,
        _ => Operand::Value(sampling_value(e)?),
    })
}

fn processing_pattern(e: LegacyEntry) -> Result<Pattern<Processing>, RuleError> {
    Ok(match e.value {
        -2 => Pattern::None,
        0 => Pattern::Any,
        _ => Pattern::Is(indexed(&PROCESSING, e)?),
    })
}

fn processing_operand(e: LegacyEntry) -> Result<Operand<Processing>, RuleError> {
    Ok(match e.value {
        -2 => Operand::Clear,
        -1 => Operand::Source,
        _ => Operand::Value(indexed(&PROCESSING, e)?),
    })
}

fn coeff_value(e: LegacyEntry) -> Result<CoeffId, RuleError> {
    match u8::try_from(e.value) {
        Ok(slot) if (slot as usize) < CoeffId::SLOTS => Ok(CoeffId(slot)),
        _ => Err(invalid(e)),
    }
}

fn coeff_pattern(e: LegacyEntry) -> Result<Pattern<CoeffId>, RuleError> {
    Ok(match e.value {
        -2 => Pattern::Any,
        -1 => Pattern::None,
        _ => Pattern::Is(coeff_value(e)?),
    })
}

fn coeff_operand(e: LegacyEntry) -> Result<Operand<CoeffId>, RuleError> {
    Ok(match e.value {
        -3 => Operand::Source,
        -1 => Operand::Clear,
        _ => Operand::Value(coeff_value(e)?),
    })
}

fn procamp_pattern(e: LegacyEntry) -> Result<Pattern<u8>, RuleError> {
    Ok(match e.value {
        -2 => Pattern::Any,
        -1 => Pattern::None,
        v => Pattern::Is(u8::try_from(v).map_err(|_| invalid(e))?),
    })
}

fn procamp_operand(e: LegacyEntry) -> Result<Operand<u8>, RuleError> {
    Ok(match e.value {
        -2 => Operand::Clear,
        -1 => Operand::Source,
        v => Operand::Value(u8::try_from(v).map_err(|_| invalid(e))?),
    })
}

fn byte_pattern(e: LegacyEntry) -> Result<Pattern<u8>, RuleError> {
    procamp_pattern(e)
}

fn rotation(e: LegacyEntry) -> Result<Rotation, RuleError> {
    usize::try_from(e.value)
        .ok()
        .and_then(|i| ROTATIONS.get(i).copied())
        .ok_or_else(|| invalid(e))
}

fn rotation_operand(e: LegacyEntry) -> Result<Operand<Rotation>, RuleError> {
    Ok(match e.value {
        0 => Operand::Source,
        _ => Operand::Value(rotation(e)?),
    })
}

fn flag(e: LegacyEntry) -> Result<bool, RuleError> {
    match e.value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(invalid(e)),
    }
}

fn flag_operand(e: LegacyEntry) -> Result<Operand<bool>, RuleError> {
    Ok(match e.value {
        -1 => Operand::Source,
        _ => Operand::Value(flag(e)?),
    })
}

fn quadrant(e: LegacyEntry) -> Result<u8, RuleError> {
    match e.value {
        0 => Ok(0),
        2 => Ok(2),
        _ => Err(invalid(e)),
    }
}

fn render_method(e: LegacyEntry) -> Result<RenderMethod, RuleError> {
    match e.value {
        0 => Ok(RenderMethod::MediaObject),
        1 => Ok(RenderMethod::MediaWalker),
        _ => Err(invalid(e)),
    }
}

fn coeff_mode(e: LegacyEntry) -> Result<CscCoeffMode, RuleError> {
    match e.value {
        0 => Ok(CscCoeffMode::Curbe),
        1 => Ok(CscCoeffMode::Patch),
        _ => Err(invalid(e)),
    }
}

fn tile_type(e: LegacyEntry) -> Result<TileType, RuleError> {
    Ok(match e.value {
        0 => TileType::Linear,
        1 => TileType::TileX,
        2 => TileType::TileY,
        3 => TileType::TileYs,
        _ => return Err(invalid(e)),
    })
}

fn scaling_ratio(e: LegacyEntry) -> Result<ScalingRatio, RuleError> {
    Ok(match e.value {
        0 => ScalingRatio::Any,
        1 => ScalingRatio::Over1,
        2 => ScalingRatio::B1p2To1,
        3 => ScalingRatio::B1p4To1p2,
        4 => ScalingRatio::B1p8To1p4,
        _ => return Err(invalid(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IS_PARSER_STATE: u16 = 3;
    const IS_LAYER_FORMAT: u16 = 2;
    const IS_SRC0_SAMPLING: u16 = 10;
    const SET_PARSER_STATE: u16 = 0x201;
    const SET_KERNEL: u16 = 0x212;
    const SET_SRC0_COEFF: u16 = 0x208;

    #[test]
    fn decodes_rule_set() {
        let stream = [
            LegacyEntry::new(OP_NEW_ENTRY, 0),
            LegacyEntry::new(IS_PARSER_STATE, ParserState::SampleLayer0.index() as i32),
            LegacyEntry::or(IS_LAYER_FORMAT, 100),
            LegacyEntry::new(IS_LAYER_FORMAT, 14),
            LegacyEntry::not(IS_SRC0_SAMPLING, -2),
            LegacyEntry::new(SET_KERNEL, 7),
            LegacyEntry::new(SET_SRC0_COEFF, -3),
            LegacyEntry::new(SET_PARSER_STATE, ParserState::End.index() as i32),
            LegacyEntry::new(OP_EOF, 0),
        ];
        let rules = decode(&stream).unwrap();
        assert_eq!(
            rules,
            vec![
                Rule::NewEntry(RuleGroup::Default),
                Rule::Match(Predicate::ParserState(ParserState::SampleLayer0), Logic::None),
                Rule::Match(Predicate::LayerFormat(FormatPattern::Rgb), Logic::Or),
                Rule::Match(
                    Predicate::LayerFormat(FormatPattern::Exact(PixelFormat::Nv12)),
                    Logic::None
                ),
                Rule::Match(Predicate::Src0Sampling(Pattern::None), Logic::Not),
                Rule::Set(Action::Kernel(KernelId(7))),
                Rule::Set(Action::Src0Coeff(Operand::Source)),
                Rule::Set(Action::ParserState(ParserState::End)),
                Rule::Eof,
            ]
        );
    }

    #[test]
    fn decodes_patch_payload() {
        let stream = [
            LegacyEntry::new(OP_SET_PATCH, 2),
            LegacyEntry::new(0x000c, 0x0400),
            LegacyEntry::new(0x001c, 0x0404),
            LegacyEntry::new(OP_EOF, 0),
        ];
        let rules = decode(&stream).unwrap();
        assert_eq!(
            rules[0],
            Rule::Extended(ExtendedAction::Patch(vec![
                PatchBlock::new(0x0c, 0, 4),
                PatchBlock::new(0x1c, 4, 4),
            ]))
        );
        assert_eq!(rules[1], Rule::Eof);
    }

    #[test]
    fn truncated_patch() {
        let stream = [LegacyEntry::new(OP_SET_PATCH, 3), LegacyEntry::new(0x0c, 0x0400)];
        assert_eq!(
            decode(&stream),
            Err(RuleError::TruncatedPayload { id: OP_SET_PATCH })
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            decode(&[LegacyEntry::new(IS_PARSER_STATE, 99)]),
            Err(RuleError::InvalidValue {
                id: IS_PARSER_STATE,
                value: 99
            })
        );
        assert_eq!(
            decode(&[LegacyEntry::new(0x0150, 0)]),
            Err(RuleError::UnknownOpcode { id: 0x0150, value: 0 })
        );
        assert!(matches!(
            decode(&[LegacyEntry::new(OP_NEW_ENTRY, 3)]),
            Err(RuleError::InvalidValue { .. })
        ));
    }

    #[test]
    fn format_families_and_exact() {
        let f = |v| format_pattern(LegacyEntry::new(IS_LAYER_FORMAT, v)).unwrap();
        assert_eq!(f(0), FormatPattern::Any);
        assert_eq!(f(1), FormatPattern::Exact(PixelFormat::Argb8));
        assert_eq!(f(21), FormatPattern::Exact(PixelFormat::Bgrp));
        assert_eq!(f(104), FormatPattern::Planar3Rgb);
        assert!(format_pattern(LegacyEntry::new(IS_LAYER_FORMAT, 22)).is_err());
        assert!(format_pattern(LegacyEntry::new(IS_LAYER_FORMAT, -1)).is_err());
    }

    #[test]
    fn serialized_stream_decodes() {
        let stream = [
            LegacyEntry::new(OP_NEW_ENTRY, 1),
            LegacyEntry::not(IS_SRC0_SAMPLING, -2),
            LegacyEntry::or(IS_LAYER_FORMAT, 100),
            LegacyEntry::new(SET_KERNEL, 300),
            LegacyEntry::new(OP_EOF, 0),
        ];
        let bytes = encode(&stream).unwrap();
        assert_eq!(bytes.len(), stream.len() * ENTRY_BYTES);
        assert_eq!(&bytes[8..16], &[10, 0, 0xFE, 0xFF, 2, 0, 0, 0]);
        let entries = parse(&bytes).unwrap();
        assert_eq!(entries, stream);
        assert_eq!(decode(&entries).unwrap()[0], Rule::NewEntry(RuleGroup::Custom));
    }

    #[test]
    fn malformed_serialized_stream() {
        assert_eq!(
            parse(&[0; 12]),
            Err(RuleError::MalformedLegacyStream { len: 12 })
        );
        assert_eq!(
            parse(&[3, 0, 1, 0, 7, 0, 0, 0]),
            Err(RuleError::InvalidValue { id: 3, value: 1 })
        );
        assert!(encode(&[LegacyEntry::new(SET_KERNEL, 0x1_0000)]).is_err());
        assert_eq!(parse(&[]).unwrap(), Vec::new());
    }
}
