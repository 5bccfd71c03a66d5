//! Candidate name heuristic for uploaded resumes with no known owner.

/// Only the first few non-empty lines are considered; names sit at the top.
const NAME_SEARCH_LINES: usize = 5;

/// Guesses the candidate's name from the top of a resume, falling back to
/// `fallback` (usually the file name) when no line looks like a name.
pub fn extract_candidate_name(resume_text: &str, fallback: &str) -> String {
    resume_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(NAME_SEARCH_LINES)
        .find(|line| looks_like_name(line))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// 2–4 words of ASCII letters, 2–50 characters, not a heading or contact line.
fn looks_like_name(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.contains("resume") || lower.contains("curriculum") || line.contains('@') {
        return false;
    }

    let len = line.chars().count();
    if !(2..=50).contains(&len) {
        return false;
    }
    if !line
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        return false;
    }

    (2..=4).contains(&line.split_whitespace().count())
}
