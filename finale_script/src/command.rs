use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{Result, ScriptError};

/// Execution context a command is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Normal,
    OnLoad,
}

impl Directive {
    fn bit(self) -> u8 {
        match self {
            Directive::Normal => 0,
            Directive::OnLoad => 0b01,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Normal => f.write_str("normal"),
            Directive::OnLoad => f.write_str("OnLoad"),
        }
    }
}

/// Set of directives a command may not appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectiveSet(u8);

impl DirectiveSet {
    pub const NONE: DirectiveSet = DirectiveSet(0);
    pub const ONLOAD: DirectiveSet = DirectiveSet(0b01);

    pub fn contains(self, directive: Directive) -> bool {
        let bit = directive.bit();
        bit != 0 && self.0 & bit == bit
    }
}

/// Handler tag for every command in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Do,
    End,
    If,
    IfNot,
    Else,
    GoTo,
    Marker,
    InTime,
    Pause,
    Tic,
    Wait,
    WaitText,
    WaitAnim,
    CanSkip,
    NoSkip,
    SkipHere,
    Events,
    NoEvents,
    OnKey,
    UnsetKey,
    Color,
    ColorAlpha,
    BgMaterial,
    NoBgMaterial,
    OffsetX,
    OffsetY,
    Filter,
    Sound,
    SoundAt,
    SeeSound,
    DieSound,
    Music,
    MusicOnce,
    NoMusic,
    Delete,
    ObjectOffX,
    ObjectOffY,
    ObjectOffZ,
    ObjectScaleX,
    ObjectScaleY,
    ObjectScaleZ,
    ObjectScale,
    ObjectScaleXY,
    ObjectScaleXYZ,
    ObjectRgb,
    ObjectAlpha,
    ObjectAngle,
    Rect,
    FillColor,
    EdgeColor,
    Image,
    ImageAt,
    XImage,
    Patch,
    SetPatch,
    ClearAnim,
    Anim,
    AnimImage,
    PicSound,
    Repeat,
    StateAnim,
    Text,
    TextFromDef,
    TextFromLump,
    SetText,
    SetTextDef,
    PredefinedColor,
    PredefinedFont,
    TextCenter,
    TextNoCenter,
    TextScroll,
    TextPos,
    TextRate,
    TextFont,
    TextFontA,
    TextFontB,
    TextLineHeight,
    PlayDemo,
    Command,
    Trigger,
    NoTrigger,
}

/// One entry of the closed command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub operands: &'static str,
    pub id: CommandId,
    /// Runs even while free-skipping or searching for a goto marker.
    pub when_skipping: bool,
    /// Runs even while the condition skip is pending.
    pub when_condition_skipping: bool,
    pub exclude: DirectiveSet,
}

const fn cmd(name: &'static str, operands: &'static str, id: CommandId) -> CommandDescriptor {
    CommandDescriptor {
        name,
        operands,
        id,
        when_skipping: false,
        when_condition_skipping: false,
        exclude: DirectiveSet::NONE,
    }
}

const fn flow(
    name: &'static str,
    operands: &'static str,
    id: CommandId,
    when_skipping: bool,
    when_condition_skipping: bool,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        operands,
        id,
        when_skipping,
        when_condition_skipping,
        exclude: DirectiveSet::NONE,
    }
}

const fn not_onload(
    name: &'static str,
    operands: &'static str,
    id: CommandId,
) -> CommandDescriptor {
    CommandDescriptor {
        name,
        operands,
        id,
        when_skipping: false,
        when_condition_skipping: false,
        exclude: DirectiveSet::ONLOAD,
    }
}

pub static COMMANDS: &[CommandDescriptor] = &[
    // Run control
    flow("DO", "", CommandId::Do, true, true),
    cmd("END", "", CommandId::End),
    cmd("IF", "s", CommandId::If),
    cmd("IFNOT", "s", CommandId::IfNot),
    cmd("ELSE", "", CommandId::Else),
    cmd("GOTO", "s", CommandId::GoTo),
    flow("MARKER", "s", CommandId::Marker, true, false),
    not_onload("IN", "f", CommandId::InTime),
    not_onload("PAUSE", "", CommandId::Pause),
    not_onload("TIC", "", CommandId::Tic),
    not_onload("WAIT", "f", CommandId::Wait),
    not_onload("WAITTEXT", "s", CommandId::WaitText),
    not_onload("WAITANIM", "s", CommandId::WaitAnim),
    cmd("CANSKIP", "", CommandId::CanSkip),
    cmd("NOSKIP", "", CommandId::NoSkip),
    flow("SKIPHERE", "", CommandId::SkipHere, true, false),
    cmd("EVENTS", "", CommandId::Events),
    cmd("NOEVENTS", "", CommandId::NoEvents),
    cmd("ONKEY", "ss", CommandId::OnKey),
    cmd("UNSETKEY", "s", CommandId::UnsetKey),
    // Screen
    cmd("COLOR", "fff", CommandId::Color),
    cmd("COLORALPHA", "ffff", CommandId::ColorAlpha),
    cmd("FLAT", "u(Flats:)", CommandId::BgMaterial),
    cmd("TEXTURE", "u(Textures:)", CommandId::BgMaterial),
    cmd("NOFLAT", "", CommandId::NoBgMaterial),
    cmd("NOTEXTURE", "", CommandId::NoBgMaterial),
    cmd("OFFX", "f", CommandId::OffsetX),
    cmd("OFFY", "f", CommandId::OffsetY),
    cmd("FILTER", "ffff", CommandId::Filter),
    // Audio
    cmd("SOUND", "s", CommandId::Sound),
    cmd("SOUNDAT", "sf(1)", CommandId::SoundAt),
    cmd("SEESOUND", "s", CommandId::SeeSound),
    cmd("DIESOUND", "s", CommandId::DieSound),
    cmd("MUSIC", "s", CommandId::Music),
    cmd("MUSICONCE", "s", CommandId::MusicOnce),
    cmd("NOMUSIC", "", CommandId::NoMusic),
    // Objects
    cmd("DEL", "s", CommandId::Delete),
    cmd("X", "sf", CommandId::ObjectOffX),
    cmd("Y", "sf", CommandId::ObjectOffY),
    cmd("Z", "sf", CommandId::ObjectOffZ),
    cmd("SX", "sf", CommandId::ObjectScaleX),
    cmd("SY", "sf", CommandId::ObjectScaleY),
    cmd("SZ", "sf", CommandId::ObjectScaleZ),
    cmd("SCALE", "sf", CommandId::ObjectScale),
    cmd("SCALEXY", "sff", CommandId::ObjectScaleXY),
    cmd("SCALEXYZ", "sfff", CommandId::ObjectScaleXYZ),
    cmd("RGB", "sfff", CommandId::ObjectRgb),
    cmd("ALPHA", "sf", CommandId::ObjectAlpha),
    cmd("ANGLE", "sf", CommandId::ObjectAngle),
    // Rects
    cmd("RECT", "sffff", CommandId::Rect),
    cmd("FILLCOLOR", "ssffff(1)", CommandId::FillColor),
    cmd("EDGECOLOR", "ssffff(1)", CommandId::EdgeColor),
    // Pictures
    cmd("IMAGE", "ss", CommandId::Image),
    cmd("IMAGEAT", "sffs", CommandId::ImageAt),
    cmd("XIMAGE", "ss", CommandId::XImage),
    cmd("PATCH", "sffs", CommandId::Patch),
    cmd("SET", "ss", CommandId::SetPatch),
    cmd("CLRANIM", "s", CommandId::ClearAnim),
    cmd("ANIM", "ssf", CommandId::Anim),
    cmd("IMAGEANIM", "ssf", CommandId::AnimImage),
    cmd("PICSOUND", "ss", CommandId::PicSound),
    cmd("REPEAT", "s", CommandId::Repeat),
    cmd("STATES", "ssi(1)", CommandId::StateAnim),
    // Text
    cmd("TEXT", "sffs", CommandId::Text),
    cmd("TEXTDEF", "sffs", CommandId::TextFromDef),
    cmd("TEXTLUMP", "sffs", CommandId::TextFromLump),
    cmd("SETTEXT", "ss", CommandId::SetText),
    cmd("SETTEXTDEF", "ss", CommandId::SetTextDef),
    cmd("PRECOLOR", "ifff", CommandId::PredefinedColor),
    cmd("PREFONT", "iu(Game:)", CommandId::PredefinedFont),
    cmd("CENTER", "s", CommandId::TextCenter),
    cmd("NOCENTER", "s", CommandId::TextNoCenter),
    cmd("SCROLL", "sf", CommandId::TextScroll),
    cmd("POS", "si", CommandId::TextPos),
    cmd("RATE", "si", CommandId::TextRate),
    cmd("FONT", "su(Game:)", CommandId::TextFont),
    cmd("FONTA", "s", CommandId::TextFontA),
    cmd("FONTB", "s", CommandId::TextFontB),
    cmd("LINEHGT", "sf", CommandId::TextLineHeight),
    // Misc
    cmd("PLAYDEMO", "s", CommandId::PlayDemo),
    cmd("CMD", "s", CommandId::Command),
    cmd("TRIGGER", "", CommandId::Trigger),
    cmd("NOTRIGGER", "", CommandId::NoTrigger),
    // Deprecated spellings still found in older scripts
    cmd("DELPIC", "s", CommandId::Delete),
    cmd("DELTEXT", "s", CommandId::Delete),
    cmd("TEXTRGB", "sfff", CommandId::ObjectRgb),
    cmd("TEXTALPHA", "sf", CommandId::ObjectAlpha),
    cmd("TX", "sf", CommandId::ObjectOffX),
    cmd("TY", "sf", CommandId::ObjectOffY),
    cmd("TEXTSCALE", "sf", CommandId::ObjectScale),
];

static REGISTRY: Lazy<HashMap<String, &'static CommandDescriptor>> = Lazy::new(|| {
    COMMANDS
        .iter()
        .map(|descriptor| (descriptor.name.to_ascii_uppercase(), descriptor))
        .collect()
});

/// Case-insensitive lookup in the command table.
pub fn find_command(name: &str) -> Option<&'static CommandDescriptor> {
    REGISTRY.get(&name.to_ascii_uppercase()).copied()
}

/// Operand value type as written in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Int,
    Float,
    String,
    Uri,
}

impl OperandType {
    fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(OperandType::Int),
            'f' => Some(OperandType::Float),
            's' => Some(OperandType::String),
            'u' => Some(OperandType::Uri),
            _ => None,
        }
    }
}

/// A single operand slot decoded from a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandSpec<'a> {
    pub kind: OperandType,
    pub default: Option<&'a str>,
}

/// Returns the byte offset of the operand following the one at `pos`,
/// stepping over a parenthesized default if present.
pub fn next_operand(signature: &str, pos: usize) -> usize {
    let bytes = signature.as_bytes();
    if pos >= bytes.len() {
        return bytes.len();
    }
    let mut next = pos + 1;
    if bytes.get(next) == Some(&b'(') {
        match signature[next..].find(')') {
            Some(close) => next += close + 1,
            None => next = bytes.len(),
        }
    }
    next
}

pub fn count_command_operands(signature: &str) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while pos < signature.len() {
        count += 1;
        pos = next_operand(signature, pos);
    }
    count
}

/// Decodes the operand at `pos` of a command's signature.
pub fn operand_spec(descriptor: &CommandDescriptor, pos: usize) -> Result<OperandSpec<'static>> {
    let signature = descriptor.operands;
    let code = signature[pos..].chars().next().unwrap_or('\0');
    let kind = OperandType::from_code(code).ok_or(ScriptError::BadSignature {
        command: descriptor.name,
        code,
    })?;
    let end = next_operand(signature, pos);
    let default = if end > pos + 1 {
        signature[pos + 1..end]
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
    } else {
        None
    };
    Ok(OperandSpec { kind, default })
}
