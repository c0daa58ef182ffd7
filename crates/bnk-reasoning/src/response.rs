//! Response text cleanup.

/// Remove markdown code fences wrapped around a JSON answer.
///
/// Handles "```json ... ```", bare "``` ... ```" and unfenced text.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    cleaned.trim()
}
