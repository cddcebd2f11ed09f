//! Format-string rendering.
//!
//! A template is a string with `{N}` placeholders selecting the N-th
//! (1-indexed) argument of a typed argument list. Placeholders that point
//! past the end of the list render as nothing, so templates written for a
//! newer module version keep working against an older one.
//!
//! An empty template is not "render nothing": it tells the caller to use the
//! module's built-in rendering instead. [`render`] reports that case as
//! [`Rendered::UseDefault`].

use crate::error::FormatError;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Separator used when a list argument is stringified.
pub const LIST_SEPARATOR: &str = ", ";

/// Number of blocks in a percentage bar.
const BAR_BLOCKS: u32 = 10;

/// A single typed value handed to the renderer.
///
/// The set of kinds is closed; the renderer matches it exhaustively, so a new
/// kind cannot be added without teaching [`FormatArg::stringify`] about it.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg<'a> {
    /// Signed integer, rendered in decimal.
    Int(i64),
    /// Unsigned integer, rendered in decimal.
    UInt(u64),
    /// Floating point, rendered with [`format_double`].
    Double(f64),
    /// Borrowed string, rendered verbatim.
    Str(&'a str),
    /// Owned string built for this render call, rendered verbatim.
    String(String),
    /// Boolean, rendered as `true` / `false`.
    Bool(bool),
    /// Nested list, rendered element-wise and joined with [`LIST_SEPARATOR`].
    List(Vec<FormatArg<'a>>),
}

impl<'a> FormatArg<'a> {
    /// Canonical string form of this argument.
    pub fn stringify(&self) -> Cow<'_, str> {
        match self {
            Self::Int(value) => Cow::Owned(value.to_string()),
            Self::UInt(value) => Cow::Owned(value.to_string()),
            Self::Double(value) => Cow::Owned(format_double(*value)),
            Self::Str(value) => Cow::Borrowed(value),
            Self::String(value) => Cow::Borrowed(value.as_str()),
            Self::Bool(value) => Cow::Borrowed(if *value { "true" } else { "false" }),
            Self::List(items) => Cow::Owned(
                items
                    .iter()
                    .map(|item| item.stringify())
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR),
            ),
        }
    }
}

impl From<i64> for FormatArg<'_> {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FormatArg<'_> {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for FormatArg<'_> {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<usize> for FormatArg<'_> {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<f64> for FormatArg<'_> {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for FormatArg<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(value: &'a str) -> Self {
        Self::Str(value)
    }
}

impl<'a> From<&'a String> for FormatArg<'a> {
    fn from(value: &'a String) -> Self {
        Self::Str(value.as_str())
    }
}

impl From<String> for FormatArg<'_> {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Outcome of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// The template was empty; the caller should use its default rendering.
    UseDefault,
    /// The rendered text. May itself be empty.
    Text(String),
}

impl Rendered {
    /// The rendered text, or `None` for [`Rendered::UseDefault`].
    pub fn text(self) -> Option<String> {
        match self {
            Self::UseDefault => None,
            Self::Text(text) => Some(text),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Constant pattern; compiling it cannot fail.
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("Invalid placeholder pattern"))
}

/// Render `template` against `args`.
///
/// `{N}` is replaced by the canonical string of `args[N - 1]`. `{0}` and any
/// index past the end render as nothing. Text that does not form a
/// placeholder, including unmatched braces, is copied verbatim.
///
/// # Example
///
/// ```rust
/// use hostfetch::format::{render, FormatArg, Rendered};
///
/// let out = render("{2} at {1}%", &[FormatArg::Double(75.0), FormatArg::Str("eDP-1")]);
/// assert_eq!(out, Rendered::Text("eDP-1 at 75.0%".to_string()));
///
/// assert_eq!(render("", &[]), Rendered::UseDefault);
/// ```
pub fn render(template: &str, args: &[FormatArg<'_>]) -> Rendered {
    if template.is_empty() {
        return Rendered::UseDefault;
    }

    let text = placeholder_regex().replace_all(template, |caps: &Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| args.get(index))
            .map(|arg| arg.stringify().into_owned())
            .unwrap_or_default()
    });

    Rendered::Text(text.into_owned())
}

/// Stringify a double: whole numbers keep one decimal (`75.0`), everything
/// else is shortened to at most two decimals with trailing zeros removed.
pub fn format_double(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 {
        return format!("{value:.1}");
    }

    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

/// Position of `current` within `[min, max]`, in percent.
///
/// # Errors
///
/// [`FormatError::DegenerateRange`] when `min == max`, and
/// [`FormatError::NotFinite`] when an input or the result is NaN or infinite.
pub fn percent(current: f64, min: f64, max: f64) -> Result<f64, FormatError> {
    if !(current.is_finite() && min.is_finite() && max.is_finite()) {
        return Err(FormatError::NotFinite);
    }
    if max == min {
        return Err(FormatError::DegenerateRange { min, max });
    }
    let value = (current - min) / (max - min) * 100.0;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormatError::NotFinite)
    }
}

/// Which percentage renderings are enabled.
///
/// Stored in configuration as a bit set: bit value 1 enables the number,
/// bit value 2 enables the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentType {
    /// Render `NN%`.
    pub num: bool,
    /// Render a block bar.
    pub bar: bool,
}

impl PercentType {
    /// Bit enabling the number.
    pub const NUM_BIT: u8 = 1;
    /// Bit enabling the bar.
    pub const BAR_BIT: u8 = 2;

    /// Decode from the configuration bit set.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            num: bits & Self::NUM_BIT != 0,
            bar: bits & Self::BAR_BIT != 0,
        }
    }
}

impl Default for PercentType {
    fn default() -> Self {
        Self::from_bits(Self::NUM_BIT | Self::BAR_BIT)
    }
}

/// A ten-block bar, e.g. `[■■■■■■■■--]` for 75%.
pub fn percent_bar(percent: f64) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = (((clamped + 5.0) / 10.0) as u32).min(BAR_BLOCKS);

    let mut bar = String::with_capacity(2 + BAR_BLOCKS as usize * 3);
    bar.push('[');
    for block in 0..BAR_BLOCKS {
        bar.push(if block < filled { '■' } else { '-' });
    }
    bar.push(']');
    bar
}

/// Rounded percentage number, e.g. `75%`.
pub fn percent_num(percent: f64) -> String {
    format!("{percent:.0}%")
}

/// The default rendering of a percentage: bar and/or number as enabled,
/// separated by one space when both are on. Empty when neither is.
pub fn percent_value(percent: f64, kind: PercentType) -> String {
    let mut out = String::new();
    if kind.bar {
        out.push_str(&percent_bar(percent));
    }
    if kind.num {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&percent_num(percent));
    }
    out
}
