//! Compiled regex patterns for parsing registry command lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// A double-quoted token with nothing but non-quote characters inside,
/// e.g. both tokens of `"C:\Apps\Foo.exe" "%1"`.
pub static RE_QUOTED_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());
