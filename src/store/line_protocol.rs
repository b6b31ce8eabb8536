//! Line protocol encoding for batch writes
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp`

use super::Point;
use std::fmt::Write;

fn escape_measurement(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, ',' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Tag keys, tag values and field keys share the same escaping rules.
fn escape_key(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Append one point as a single line (no trailing newline).
///
/// Tags with empty values are omitted; the store does not accept them.
pub fn encode_point(out: &mut String, point: &Point) {
    escape_measurement(out, point.measurement());

    for (key, value) in point.tags() {
        if value.is_empty() {
            continue;
        }
        out.push(',');
        escape_key(out, key);
        out.push('=');
        escape_key(out, value);
    }

    out.push(' ');
    for (i, (key, value)) in point.fields().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_key(out, key);
        out.push('=');
        // f64 Display writes whole numbers without a suffix, so they stay floats
        let _ = write!(out, "{}", value);
    }

    let _ = write!(out, " {}", point.timestamp());
}

/// Encode a batch, one line per point.
pub fn encode_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> String {
    let mut out = String::new();
    for point in points {
        encode_point(&mut out, point);
        out.push('\n');
    }
    out
}
