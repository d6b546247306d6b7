//! Line layouts built from `${...}` placeholder templates.
//!
//! Supported placeholders: `${date}` (with an optional `:format=` using
//! .NET-style date specifiers), `${longdate}`, `${shortdate}`, `${time}`,
//! `${level}` (with `:uppercase=true`), `${logger}`, `${message}`,
//! `${exception}` and `${newline}`. Anything else is written out verbatim.

use super::target::LogRecord;
use chrono::{DateTime, Local, Timelike};

/// Layout used when a target is configured with an empty template
pub const FALLBACK_LAYOUT: &str = "${longdate}|${level:uppercase=true}|${logger}|${message}";

const DEFAULT_DATE_FORMAT: &str = "yyyy/MM/dd HH:mm:ss.fff";
const LONGDATE_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.ffff";
const SHORTDATE_FORMAT: &str = "yyyy-MM-dd";
const TIME_FORMAT: &str = "HH:mm:ss.ffff";

/// A compiled line layout
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    template: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Date(Vec<DatePart>),
    Level { uppercase: bool },
    Logger,
    Message,
    Exception,
    NewLine,
}

#[derive(Debug, Clone, PartialEq)]
enum DatePart {
    Literal(String),
    /// A chrono format specifier such as `%Y`
    Field(&'static str),
    /// Fractional seconds truncated to this many digits
    Fraction(usize),
    /// First letter of AM/PM
    AmPmShort,
}

impl Layout {
    /// Compile a template. An empty template uses [`FALLBACK_LAYOUT`].
    pub fn parse(template: &str) -> Self {
        let template = if template.trim().is_empty() {
            FALLBACK_LAYOUT
        } else {
            template
        };

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                // Unterminated placeholder, keep the remainder as text
                literal.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let raw = &rest[start..start + 2 + end + 1];
            match parse_placeholder(&after[..end]) {
                Some(token) => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                None => literal.push_str(raw),
            }

            rest = &after[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self {
            template: template.to_string(),
            tokens,
        }
    }

    /// The template this layout was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a record as a single line, without the trailing newline
    pub fn render(&self, record: &LogRecord) -> String {
        let mut line = String::new();

        for token in &self.tokens {
            match token {
                Token::Literal(text) => line.push_str(text),
                Token::Date(parts) => render_date(&mut line, parts, &record.timestamp),
                Token::Level { uppercase: true } => {
                    line.push_str(&record.severity.as_str().to_uppercase())
                }
                Token::Level { uppercase: false } => line.push_str(record.severity.as_str()),
                Token::Logger => line.push_str(&record.logger),
                Token::Message => line.push_str(&record.message),
                Token::Exception => {
                    if let Some(exception) = &record.exception {
                        line.push_str(exception);
                    }
                }
                Token::NewLine => line.push('\n'),
            }
        }

        line.truncate(line.trim_end().len());
        line
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::parse(FALLBACK_LAYOUT)
    }
}

fn parse_placeholder(inner: &str) -> Option<Token> {
    let mut parts = split_unescaped(inner).into_iter();
    let name = parts.next()?.trim().to_ascii_lowercase();

    let options: Vec<(String, String)> = parts
        .filter_map(|opt| {
            opt.split_once('=')
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    let option = |key: &str| {
        options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let token = match name.as_str() {
        "date" => Token::Date(compile_date_format(
            option("format").unwrap_or(DEFAULT_DATE_FORMAT),
        )),
        "longdate" => Token::Date(compile_date_format(LONGDATE_FORMAT)),
        "shortdate" => Token::Date(compile_date_format(SHORTDATE_FORMAT)),
        "time" => Token::Date(compile_date_format(TIME_FORMAT)),
        "level" => Token::Level {
            uppercase: option("uppercase").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        },
        "logger" => Token::Logger,
        "message" => Token::Message,
        "exception" => Token::Exception,
        "newline" => Token::NewLine,
        _ => return None,
    };

    Some(token)
}

/// Split on `:` that is not preceded by a backslash, unescaping `\:`
fn split_unescaped(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&':') => {
                current.push(':');
                chars.next();
            }
            ':' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
}

/// Translate a .NET-style custom date format into renderable parts
fn compile_date_format(format: &str) -> Vec<DatePart> {
    let chars: Vec<char> = format.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                literal.push(next);
            }
            i += 2;
            continue;
        }

        if c == '\'' || c == '"' {
            let close = chars[i + 1..].iter().position(|&q| q == c);
            let end = close.map(|p| i + 1 + p).unwrap_or(chars.len());
            literal.extend(&chars[i + 1..end]);
            i = end + 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&r| r == c).count();
        let part = match (c, run) {
            ('y', 1..=2) => Some(DatePart::Field("%y")),
            ('y', _) => Some(DatePart::Field("%Y")),
            ('M', 1) => Some(DatePart::Field("%-m")),
            ('M', 2) => Some(DatePart::Field("%m")),
            ('M', 3) => Some(DatePart::Field("%b")),
            ('M', _) => Some(DatePart::Field("%B")),
            ('d', 1) => Some(DatePart::Field("%-d")),
            ('d', 2) => Some(DatePart::Field("%d")),
            ('d', 3) => Some(DatePart::Field("%a")),
            ('d', _) => Some(DatePart::Field("%A")),
            ('H', 1) => Some(DatePart::Field("%-H")),
            ('H', _) => Some(DatePart::Field("%H")),
            ('h', 1) => Some(DatePart::Field("%-I")),
            ('h', _) => Some(DatePart::Field("%I")),
            ('m', 1) => Some(DatePart::Field("%-M")),
            ('m', _) => Some(DatePart::Field("%M")),
            ('s', 1) => Some(DatePart::Field("%-S")),
            ('s', _) => Some(DatePart::Field("%S")),
            ('f', n) => Some(DatePart::Fraction(n.min(9))),
            ('t', 1) => Some(DatePart::AmPmShort),
            ('t', _) => Some(DatePart::Field("%p")),
            _ => None,
        };

        match part {
            Some(part) => {
                if !literal.is_empty() {
                    parts.push(DatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(part);
            }
            None => literal.extend(&chars[i..i + run]),
        }
        i += run;
    }

    if !literal.is_empty() {
        parts.push(DatePart::Literal(literal));
    }

    parts
}

fn render_date(line: &mut String, parts: &[DatePart], at: &DateTime<Local>) {
    for part in parts {
        match part {
            DatePart::Literal(text) => line.push_str(text),
            DatePart::Field(spec) => line.push_str(&at.format(spec).to_string()),
            DatePart::Fraction(digits) => {
                let nanos = format!("{:09}", at.nanosecond() % 1_000_000_000);
                line.push_str(&nanos[..*digits]);
            }
            DatePart::AmPmShort => {
                line.push_str(if at.hour() < 12 { "A" } else { "P" });
            }
        }
    }
}
