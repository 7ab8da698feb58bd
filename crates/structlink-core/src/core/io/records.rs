//! Parsers for the listing records the viewer prints in reply to model,
//! residue, color and preset queries, plus the atom/residue address syntax
//! shared by every reply.

use super::error::ParseError;
use crate::core::models::ids::ModelKey;
use crate::core::models::object::ResidueRef;
use crate::core::models::structure::Color;

/// One `model id #M[.S] type <Type> name <name>` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub key: ModelKey,
    pub type_label: String,
    pub name: String,
}

/// One `residue id [#M[.S]]:I.C type <TYPE>` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueRecord {
    pub spec: AtomSpec,
    pub residue_type: String,
}

impl ResidueRecord {
    /// Resolves the residue against `default_model` when the line carries no
    /// model prefix.
    pub fn reference(&self, default_model: ModelKey) -> ResidueRef {
        self.spec.residue_ref(default_model)
    }
}

/// A parsed atom or residue address: `[#M[.S]]:I[.C][@atom]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomSpec {
    pub model: Option<ModelKey>,
    pub index: String,
    pub chain: String,
    pub atom: Option<String>,
}

impl AtomSpec {
    pub fn residue_ref(&self, default_model: ModelKey) -> ResidueRef {
        ResidueRef::new(
            self.model.unwrap_or(default_model),
            self.chain.clone(),
            self.index.clone(),
        )
    }

    pub fn atom_name(&self) -> &str {
        self.atom.as_deref().unwrap_or("")
    }
}

pub fn parse_atom_spec(spec: &str) -> Result<AtomSpec, ParseError> {
    const KIND: &str = "atom spec";
    let trimmed = spec.trim();
    let (residue_part, atom) = match trimmed.rsplit_once('@') {
        Some((r, a)) if !a.is_empty() => (r, Some(a.to_string())),
        Some(_) => return Err(ParseError::malformed(KIND, spec)),
        None => (trimmed, None),
    };

    let (model, rest) = if let Some(body) = residue_part.strip_prefix('#') {
        let (model_part, rest) = body
            .split_once(':')
            .ok_or_else(|| ParseError::malformed(KIND, spec))?;
        let key = model_part
            .parse::<ModelKey>()
            .map_err(|_| ParseError::InvalidModelId(model_part.to_string()))?;
        (Some(key), rest)
    } else {
        (None, residue_part.strip_prefix(':').unwrap_or(residue_part))
    };

    let (index, chain) = match rest.split_once('.') {
        Some((i, c)) => (i, c),
        None => (rest, ""),
    };
    if index.is_empty() || index.contains(char::is_whitespace) {
        return Err(ParseError::malformed(KIND, spec));
    }

    Ok(AtomSpec {
        model,
        index: index.to_string(),
        chain: chain.to_string(),
        atom,
    })
}

pub fn parse_model_line(line: &str) -> Result<ModelRecord, ParseError> {
    const KIND: &str = "model";
    let body = line
        .trim()
        .strip_prefix("model id ")
        .ok_or_else(|| ParseError::malformed(KIND, line))?;
    let mut tokens = body.split_whitespace();
    let id = tokens
        .next()
        .ok_or_else(|| ParseError::malformed(KIND, line))?;
    let key = id
        .parse::<ModelKey>()
        .map_err(|_| ParseError::InvalidModelId(id.to_string()))?;
    let type_label = match (tokens.next(), tokens.next()) {
        (Some("type"), Some(t)) => t.to_string(),
        _ => String::new(),
    };
    let name = body
        .split_once(" name ")
        .map(|(_, n)| n.trim().to_string())
        .unwrap_or_default();
    Ok(ModelRecord {
        key,
        type_label,
        name,
    })
}

/// Parses the color attribute of a `listm ... attr color` reply line.
///
/// Returns `Ok(None)` when the viewer reports no color.
pub fn parse_model_color(line: &str) -> Result<Option<Color>, ParseError> {
    const KIND: &str = "color";
    let value = line
        .split_once(" color ")
        .map(|(_, v)| v.trim())
        .ok_or_else(|| ParseError::malformed(KIND, line))?;
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let channels = value
        .split(',')
        .map(|c| {
            c.trim().parse::<f32>().map_err(|_| ParseError::InvalidNumber {
                kind: KIND,
                value: c.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    match channels.as_slice() {
        [red, green, blue, ..] => Ok(Some(Color {
            red: *red,
            green: *green,
            blue: *blue,
        })),
        _ => Err(ParseError::malformed(KIND, line)),
    }
}

pub fn parse_residue_line(line: &str) -> Result<ResidueRecord, ParseError> {
    const KIND: &str = "residue";
    let body = line
        .trim()
        .strip_prefix("residue id ")
        .ok_or_else(|| ParseError::malformed(KIND, line))?;
    let mut tokens = body.split_whitespace();
    let spec = parse_atom_spec(tokens.next().ok_or_else(|| ParseError::malformed(KIND, line))?)?;
    let residue_type = match (tokens.next(), tokens.next()) {
        (Some("type"), Some(t)) => t.to_string(),
        _ => return Err(ParseError::malformed(KIND, line)),
    };
    Ok(ResidueRecord { spec, residue_type })
}

/// Extracts the model identifier from a reply line that begins with `#`,
/// e.g. `#0, chain A: hemoglobin` or `#1.2 opened`.
pub fn parse_model_prefix(line: &str) -> Option<ModelKey> {
    let body = line.trim_start().strip_prefix('#')?;
    let end = body
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(body.len());
    body[..end].trim_end_matches('.').parse().ok()
}

/// Reformats `Preset <type> <number> "<description>"` as
/// `<type> <number> (<description>)`.
pub fn parse_preset_line(line: &str) -> Option<String> {
    let body = line.trim().strip_prefix("Preset")?.trim_start();
    let formatted = body.replacen('"', "(", 1).replacen('"', ")", 1);
    Some(formatted)
}

/// Parses a functional-residue annotation such as `12.A`, `:12.A`, `#0:12.A`
/// or `1abc#12.A`. An annotation prefixed with another structure's name is
/// skipped.
pub fn parse_functional_residue(
    entry: &str,
    structure_name: &str,
    model: ModelKey,
) -> Option<ResidueRef> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    let spec = match entry.split_once('#') {
        Some((prefix, rest)) if !prefix.is_empty() => {
            if !prefix.eq_ignore_ascii_case(structure_name) {
                return None;
            }
            rest
        }
        _ => entry,
    };
    let parsed = parse_atom_spec(spec).ok()?;
    Some(parsed.residue_ref(model))
}
