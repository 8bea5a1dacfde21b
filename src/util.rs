//! Small utility helpers used across modules.

/// Parse a typed answer into an integer.
/// Surrounding whitespace and a leading `+` are accepted; anything else that is
/// not a plain integer yields `None` (scored as wrong, never an error).
pub fn parse_answer(raw: &str) -> Option<i64> {
  let s = raw.trim();
  let s = s.strip_prefix('+').unwrap_or(s);
  if s.is_empty() { return None; }
  s.parse::<i64>().ok()
}

/// Trim a player name and check it is 1..=max characters long with no control chars.
pub fn clean_name(raw: &str, max: usize) -> Option<String> {
  let name = raw.trim();
  let len = name.chars().count();
  if len == 0 || len > max || name.chars().any(char::is_control) {
    return None;
  }
  Some(name.to_string())
}

/// Log-safe truncation for user-supplied strings.
/// Avoids spamming logs with huge request payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
