//! A small BibTeX reader.
//!
//! Handles `@type{key, field = {value}, field = "value", field = 123}`
//! entries with nested braces. Bare identifiers expand through `@string`
//! definitions and the standard month abbreviations (`jan` .. `dec`), and
//! `#` concatenates parts. `@comment` and `@preamble` blocks are skipped.
//! Field names are lower-cased.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Start of an entry: `@type{`.
static ENTRY_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\s*([A-Za-z]+)\s*[{(]").expect("ENTRY_HEAD must compile"));

/// Macros every BibTeX style predefines.
const MONTHS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// One parsed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub fields: HashMap<String, String>,
}

impl BibEntry {
    /// Field value with braces removed and whitespace collapsed.
    pub fn plain(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(|v| plain_text(v))
    }
}

/// Parse all entries, keyed by citation key. Later duplicates win.
///
/// `@string` definitions apply to the entries that follow them.
pub fn parse_bibtex(text: &str) -> HashMap<String, BibEntry> {
    let mut entries = HashMap::new();
    let mut macros: HashMap<String, String> = MONTHS
        .iter()
        .map(|(abbr, month)| (abbr.to_string(), month.to_string()))
        .collect();
    let mut pos = 0;

    while let Some(head) = ENTRY_HEAD.captures(&text[pos..]) {
        let whole = head.get(0).map_or(0..0, |m| m.range());
        let entry_type = head[1].to_lowercase();
        let body_start = pos + whole.end;

        if entry_type == "string" {
            pos = parse_string(text, body_start, &mut macros).max(body_start);
            continue;
        }
        if matches!(entry_type.as_str(), "comment" | "preamble") {
            pos = skip_balanced(text, body_start);
            continue;
        }

        let (entry, next) = parse_entry(text, body_start, entry_type, &macros);
        pos = next.max(body_start);
        if let Some(entry) = entry {
            entries.insert(entry.key.clone(), entry);
        }
    }
    entries
}

/// Record `@string{name = value}` and return the index past its close.
fn parse_string(text: &str, start: usize, macros: &mut HashMap<String, String>) -> usize {
    let bytes = text.as_bytes();
    let name_start = skip_ws(bytes, start);
    let mut i = name_start;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = text[name_start..i].to_lowercase();
    i = skip_ws(bytes, i);
    if name.is_empty() || bytes.get(i) != Some(&b'=') {
        return skip_balanced(text, start);
    }

    let (value, next) = read_value(text, skip_ws(bytes, i + 1), macros);
    macros.insert(name, value);
    text[next..]
        .find(['}', ')'])
        .map_or(text.len(), |o| next + o + 1)
}

fn parse_entry(
    text: &str,
    start: usize,
    entry_type: String,
    macros: &HashMap<String, String>,
) -> (Option<BibEntry>, usize) {
    let bytes = text.as_bytes();
    let mut i = start;

    let key_end = match text[i..].find([',', '}', ')']) {
        Some(offset) => i + offset,
        None => return (None, text.len()),
    };
    let key = text[i..key_end].trim().to_string();
    i = key_end;
    if key.is_empty() {
        return (None, skip_balanced(text, start));
    }

    let mut fields = HashMap::new();
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'}' || bytes[i] == b')' {
            i += 1;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = text[name_start..i].to_lowercase();
        i = skip_ws(bytes, i);
        if name.is_empty() || i >= bytes.len() || bytes[i] != b'=' {
            // Malformed field; resync on the next separator.
            i = text[i..].find([',', '}']).map_or(text.len(), |o| i + o);
            continue;
        }
        i = skip_ws(bytes, i + 1);

        let (value, next) = read_value(text, i, macros);
        i = next;
        fields.insert(homogenize(&name).to_string(), value);
    }

    let entry = BibEntry {
        entry_type,
        key,
        fields,
    };
    (Some(entry), i)
}

/// Read a value expression: parts joined by `#`.
fn read_value(text: &str, mut i: usize, macros: &HashMap<String, String>) -> (String, usize) {
    let bytes = text.as_bytes();
    let mut value = String::new();
    loop {
        let (part, next) = read_part(text, i, macros);
        value.push_str(&part);
        let after = skip_ws(bytes, next);
        if bytes.get(after) != Some(&b'#') {
            return (value, next);
        }
        i = skip_ws(bytes, after + 1);
    }
}

/// Read a braced, quoted or bare part starting at `i`.
///
/// Bare parts are numbers or macro names; unknown macros are kept verbatim.
fn read_part(text: &str, i: usize, macros: &HashMap<String, String>) -> (String, usize) {
    let bytes = text.as_bytes();
    match bytes.get(i) {
        Some(b'{') => match find_close(text, i + 1) {
            Some(end) => (text[i + 1..end - 1].to_string(), end),
            None => (text[i + 1..].to_string(), text.len()),
        },
        Some(b'"') => {
            let mut depth = 0usize;
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => depth = depth.saturating_sub(1),
                    b'"' if depth == 0 && bytes[j - 1] != b'\\' => break,
                    _ => {}
                }
                j += 1;
            }
            let value = text[i + 1..j.min(bytes.len())].to_string();
            (value, (j + 1).min(bytes.len()))
        }
        _ => {
            let end = text[i..]
                .find([',', '}', ')', '#', '\n'])
                .map_or(text.len(), |o| i + o);
            let token = text[i..end].trim();
            let value = macros
                .get(&token.to_lowercase())
                .cloned()
                .unwrap_or_else(|| token.to_string());
            (value, end)
        }
    }
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"_-:.".contains(&b)
}

/// Index just past the brace closing the group opened before `start`, or
/// `None` when the group is never closed.
fn find_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_balanced(text: &str, start: usize) -> usize {
    find_close(text, start).unwrap_or(text.len())
}

fn homogenize(name: &str) -> &str {
    match name {
        "link" | "urls" => "url",
        "keyw" | "keywords" => "keyword",
        "editors" => "editor",
        other => other,
    }
}

/// Remove grouping braces and collapse whitespace.
pub fn plain_text(value: &str) -> String {
    value
        .replace(['{', '}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
@comment{ generated by a reference manager }

@article{bare_traci_2011,
  author = {Bare, Jane},
  title = {{TRACI} 2.0: the tool for the reduction and assessment of chemical and other environmental impacts 2.0},
  journal = "Clean Technologies and Environmental Policy",
  year = 2011,
  volume = {13},
  URL = {https://doi.org/10.1007/s10098-010-0338-9}
}

@misc{epa_nei,
  title = {National Emissions Inventory},
  publisher = {U.S. Environmental Protection Agency},
  link = {https://www.epa.gov/air-emissions-inventories}
}
"#;

    #[test]
    fn parses_entries_and_fields() {
        let entries = parse_bibtex(SAMPLE);

        assert_eq!(entries.len(), 2);
        let traci = &entries["bare_traci_2011"];
        assert_eq!(traci.entry_type, "article");
        assert_eq!(traci.fields["year"], "2011");
        assert_eq!(traci.fields["author"], "Bare, Jane");
        assert_eq!(
            traci.fields["journal"],
            "Clean Technologies and Environmental Policy"
        );
    }

    #[test]
    fn nested_braces_are_kept_until_plain() {
        let entries = parse_bibtex(SAMPLE);
        let traci = &entries["bare_traci_2011"];

        assert!(traci.fields["title"].starts_with("{TRACI} 2.0"));
        assert!(traci.plain("title").unwrap().starts_with("TRACI 2.0: the tool"));
    }

    #[test]
    fn field_names_are_homogenized() {
        let entries = parse_bibtex(SAMPLE);
        assert_eq!(
            entries["bare_traci_2011"].fields["url"],
            "https://doi.org/10.1007/s10098-010-0338-9"
        );
        assert_eq!(
            entries["epa_nei"].fields["url"],
            "https://www.epa.gov/air-emissions-inventories"
        );
    }

    #[test]
    fn quoted_values_may_contain_braces() {
        let entries = parse_bibtex(r#"@book{k, title = "A {B} C", year = "2020"}"#);
        assert_eq!(entries["k"].fields["title"], "A {B} C");
        assert_eq!(entries["k"].plain("title").unwrap(), "A B C");
    }

    #[test]
    fn unterminated_entry_does_not_panic() {
        let entries = parse_bibtex("@article{k, title = {open");
        assert_eq!(entries["k"].fields["title"], "open");
    }

    #[test]
    fn month_macros_expand() {
        let entries = parse_bibtex("@misc{k, month = jan, year = 2020}\n@misc{j, month = Sep}");
        assert_eq!(entries["k"].fields["month"], "January");
        assert_eq!(entries["k"].fields["year"], "2020");
        assert_eq!(entries["j"].fields["month"], "September");
    }

    #[test]
    fn string_definitions_and_concatenation() {
        let text = r#"
@string{epa = "U.S. Environmental Protection Agency"}
@STRING(ord = {Office of Research} # " and Development")

@techreport{k,
  publisher = epa,
  institution = epa # ", " # ord,
  note = "Released " # jan # {~2021},
  series = undefined
}
"#;
        let entries = parse_bibtex(text);
        let k = &entries["k"];

        assert_eq!(entries.len(), 1);
        assert_eq!(k.fields["publisher"], "U.S. Environmental Protection Agency");
        assert_eq!(
            k.fields["institution"],
            "U.S. Environmental Protection Agency, Office of Research and Development"
        );
        assert_eq!(k.fields["note"], "Released January~2021");
        assert_eq!(k.fields["series"], "undefined");
    }

    #[test]
    fn plain_text_collapses_whitespace() {
        assert_eq!(plain_text("  {A}\n   {{B}}  "), "A B");
    }
}
