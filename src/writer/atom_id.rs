//! Atom `<id>` validity check and the fallback normalization applied when an
//! entry's id doesn't qualify.

/// An Atom id must be either a URI (`scheme://...`) or a URN
/// (`urn:nid:nss...` with a 1-32 character namespace identifier).
pub fn is_valid_atom_id(id: &str) -> bool {
    is_uri_form(id) || is_urn_form(id)
}

fn is_uri_form(id: &str) -> bool {
    let Some(scheme_end) = id.find("://") else {
        return false;
    };
    let scheme = &id[..scheme_end];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-')
}

fn is_urn_form(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("urn:") else {
        return false;
    };
    let Some(colon) = rest.find(':') else {
        return false;
    };
    let nid = &rest[..colon];
    if nid.is_empty() || nid.len() > 32 {
        return false;
    }
    let mut chars = nid.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Render a candidate id as a valid Atom id: pass it through unchanged if it
/// already qualifies, otherwise wrap it as a tag-style URN.
pub fn normalize_atom_id(id: Option<&str>) -> String {
    match id {
        None => "hardcoded-id:0000".to_string(),
        Some(id) if is_valid_atom_id(id) => id.to_string(),
        Some(id) => format!("urn:tag:{id}"),
    }
}
