//! CLI Commands

pub mod check;
pub mod config;
pub mod validate;

/// Parse a finding count, accepting `no` for zero
pub fn count_arg(s: &str) -> Result<usize, String> {
    if s.trim() != "no" && !s.trim().starts_with(|c: char| c.is_ascii_digit()) {
        return Err(format!("expected a number or 'no', got '{s}'"));
    }
    Ok(stepguard::validation::parse_count(s))
}
