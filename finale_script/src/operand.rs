use std::fmt;

use log::warn;
use serde::Serialize;

use crate::command::{next_operand, operand_spec, CommandDescriptor, OperandType};
use crate::error::{Result, ScriptError};
use crate::tokenizer::Tokenizer;

/// Scheme-qualified resource name such as `Flats:FLOOR7_2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceUri {
    pub scheme: Option<String>,
    pub path: String,
}

impl ResourceUri {
    /// Splits `scheme:path`, falling back to `default_scheme` (given with or
    /// without its trailing colon) when the text names no scheme.
    pub fn parse(text: &str, default_scheme: Option<&str>) -> Self {
        // A single character before the colon is a drive letter, not a scheme.
        if let Some((scheme, path)) = text.split_once(':') {
            if scheme.len() > 1 {
                return ResourceUri {
                    scheme: Some(scheme.to_string()),
                    path: path.to_string(),
                };
            }
        }
        ResourceUri {
            scheme: default_scheme
                .map(|scheme| scheme.trim_end_matches(':'))
                .filter(|scheme| !scheme.is_empty())
                .map(str::to_string),
            path: text.to_string(),
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{scheme}:{}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// Typed command argument. Owned, and dropped with the command's operand list.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Float(f32),
    Str(String),
    Uri(ResourceUri),
}

impl Operand {
    pub fn as_int(&self) -> i32 {
        match self {
            Operand::Int(value) => *value,
            Operand::Float(value) => *value as i32,
            Operand::Str(text) => parse_int(text),
            Operand::Uri(_) => 0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            Operand::Int(value) => *value as f32,
            Operand::Float(value) => *value,
            Operand::Str(text) => parse_float(text),
            Operand::Uri(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operand::Str(text) => text,
            Operand::Uri(uri) => &uri.path,
            Operand::Int(_) | Operand::Float(_) => "",
        }
    }

    pub fn as_uri(&self) -> Option<&ResourceUri> {
        match self {
            Operand::Uri(uri) => Some(uri),
            _ => None,
        }
    }
}

/// Reads exactly the operands `descriptor` declares from `tokenizer`.
///
/// A missing token falls back to the operand's declared default; with no
/// default the command is malformed.
pub fn prepare_command_operands(
    descriptor: &CommandDescriptor,
    tokenizer: &mut Tokenizer,
) -> Result<Vec<Operand>> {
    let signature = descriptor.operands;
    let mut operands = Vec::new();
    let mut pos = 0;
    while pos < signature.len() {
        let spec = operand_spec(descriptor, pos)?;
        let index = operands.len();
        let token = tokenizer.next_token()?.map(str::to_string);

        let operand = match (spec.kind, token) {
            (OperandType::Uri, Some(text)) => {
                let scheme = spec.default.filter(|default| default.ends_with(':'));
                Operand::Uri(ResourceUri::parse(&text, scheme))
            }
            (OperandType::Uri, None) => match spec.default {
                Some(default) if !default.ends_with(':') => {
                    Operand::Uri(ResourceUri::parse(default, None))
                }
                _ => {
                    return Err(ScriptError::MissingOperand {
                        command: descriptor.name,
                        index,
                    })
                }
            },
            (kind, Some(text)) => parse_operand(descriptor.name, kind, &text),
            (kind, None) => match spec.default {
                Some(default) => parse_operand(descriptor.name, kind, default),
                None => {
                    return Err(ScriptError::MissingOperand {
                        command: descriptor.name,
                        index,
                    })
                }
            },
        };
        operands.push(operand);
        pos = next_operand(signature, pos);
    }
    Ok(operands)
}

fn parse_operand(command: &str, kind: OperandType, text: &str) -> Operand {
    match kind {
        OperandType::Int => {
            if !has_numeric_prefix(text) {
                warn!("{command}: \"{text}\" is not an integer, using 0");
            }
            Operand::Int(parse_int(text))
        }
        OperandType::Float => {
            if !has_numeric_prefix(text) {
                warn!("{command}: \"{text}\" is not a number, using 0");
            }
            Operand::Float(parse_float(text))
        }
        OperandType::String => Operand::Str(text.to_string()),
        OperandType::Uri => Operand::Uri(ResourceUri::parse(text, None)),
    }
}

fn has_numeric_prefix(text: &str) -> bool {
    let body = text.trim_start().trim_start_matches(['+', '-']);
    body.starts_with(|c: char| c.is_ascii_digit())
        || (body.starts_with('.') && body[1..].starts_with(|c: char| c.is_ascii_digit()))
}

/// Integer parse with C `strtol(text, 0)` rules: `0x` prefix is hex, a
/// leading `0` is octal, trailing garbage is ignored.
pub fn parse_int(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (radix, digits) = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_hexdigit()))
    {
        (16, hex)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };

    let mut value: i64 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = (value * i64::from(radix) + i64::from(digit)).min(i64::from(u32::MAX));
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Float parse with C `strtod` leniency: the longest numeric prefix wins.
pub fn parse_float(text: &str) -> f32 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        if bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            end = exp_end;
        }
    }
    trimmed[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{count_command_operands, find_command};

    fn prepare(name: &str, script: &str) -> (Result<Vec<Operand>>, Tokenizer) {
        let descriptor = find_command(name).expect("known command");
        let mut tokenizer = Tokenizer::new(script);
        let operands = prepare_command_operands(descriptor, &mut tokenizer);
        (operands, tokenizer)
    }

    #[test]
    fn consumes_exactly_the_declared_operands() {
        let (operands, mut rest) = prepare("text", "title 10 20.5 \"Hi there\" wait 1");
        let operands = operands.expect("operands");
        assert_eq!(operands.len(), count_command_operands("sffs"));
        assert_eq!(operands[0], Operand::Str("title".into()));
        assert_eq!(operands[1], Operand::Float(10.0));
        assert_eq!(operands[2], Operand::Float(20.5));
        assert_eq!(operands[3].as_str(), "Hi there");
        assert_eq!(rest.next_token().expect("token"), Some("wait"));
    }

    #[test]
    fn absent_operand_uses_default_without_consuming() {
        let (operands, mut rest) = prepare("soundat", "dsbarexp");
        let operands = operands.expect("operands");
        assert_eq!(operands, vec![Operand::Str("dsbarexp".into()), Operand::Float(1.0)]);
        assert!(rest.next_token().expect("token").is_none());
    }

    #[test]
    fn missing_required_operand_is_fatal() {
        let (operands, _) = prepare("rgb", "title 1 0.5");
        assert_eq!(
            operands,
            Err(ScriptError::MissingOperand {
                command: "RGB",
                index: 3
            })
        );
    }

    #[test]
    fn uri_takes_default_scheme() {
        let (operands, _) = prepare("flat", "FLOOR7_2");
        let operands = operands.expect("operands");
        let uri = operands[0].as_uri().expect("uri operand");
        assert_eq!(uri.scheme.as_deref(), Some("Flats"));
        assert_eq!(uri.path, "FLOOR7_2");

        let (operands, _) = prepare("texture", "Flats:CEIL1");
        let operands = operands.expect("operands");
        assert_eq!(operands[0].as_uri().map(ToString::to_string).as_deref(), Some("Flats:CEIL1"));
    }

    #[test]
    fn missing_uri_with_scheme_only_default_is_fatal() {
        let (operands, _) = prepare("flat", "");
        assert!(matches!(operands, Err(ScriptError::MissingOperand { .. })));
    }

    #[test]
    fn integers_parse_like_strtol() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("-7"), -7);
        assert_eq!(parse_int("0x1F"), 31);
        assert_eq!(parse_int("010"), 8);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int("0"), 0);
    }

    #[test]
    fn floats_parse_like_strtod() {
        assert_eq!(parse_float("1.5"), 1.5);
        assert_eq!(parse_float("-.25"), -0.25);
        assert_eq!(parse_float("2e2"), 200.0);
        assert_eq!(parse_float("3.0s"), 3.0);
        assert_eq!(parse_float("e5"), 0.0);
        assert_eq!(parse_float("7e"), 7.0);
    }
}
