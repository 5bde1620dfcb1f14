//! Recover plain source text from a free-form model response.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n`]*\r?\n(.*?)```").expect("valid fence regex"));

/// Extract candidate source from a model response.
///
/// - Fenced blocks present: the longest block body wins (language tags dropped).
///   Unfenced text is ignored then, so a program written outside the fences
///   after prose that quotes a short fenced snippet yields the snippet.
/// - Unterminated leading fence: the fence line is dropped.
/// - Otherwise the trimmed response is returned as-is.
pub fn extract_source(response: &str) -> String {
    let trimmed = response.trim();

    let longest = FENCED_BLOCK_RE
        .captures_iter(trimmed)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .max_by_key(|body| body.trim().len());
    if let Some(body) = longest
        && !body.trim().is_empty()
    {
        return tidy(body);
    }

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        let body = match rest.split_once('\n') {
            Some((_fence_tag, body)) => body,
            None => rest,
        };
        return tidy(body);
    }

    trimmed.to_string()
}

fn tidy(body: &str) -> String {
    body.trim_start_matches(['\r', '\n']).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_response_is_trimmed() {
        assert_eq!(extract_source("\n  print(1)\n\n"), "print(1)");
    }

    #[test]
    fn strips_fence_and_language_tag() {
        let raw = "```python\n\"\"\"Use a set.\"\"\"\nprint(1)\n```";
        assert_eq!(extract_source(raw), "\"\"\"Use a set.\"\"\"\nprint(1)");
    }

    #[test]
    fn picks_longest_block_when_prose_surrounds_code() {
        let raw = "Here you go:\n```sh\nls\n```\nand the program:\n```python\nimport sys\nprint(sys.argv)\n```\nDone.";
        assert_eq!(extract_source(raw), "import sys\nprint(sys.argv)");
    }

    #[test]
    fn unfenced_program_loses_to_a_fenced_snippet() {
        let raw = "Run it with:\n```sh\npython3 fast.py\n```\nimport sys\nprint(sys.argv)";
        assert_eq!(extract_source(raw), "python3 fast.py");
    }

    #[test]
    fn keeps_indentation_of_body() {
        let raw = "```\ndef f():\n    return 1\n```";
        assert_eq!(extract_source(raw), "def f():\n    return 1");
    }

    #[test]
    fn unterminated_fence_drops_fence_line() {
        let raw = "```python\nprint('hi')\n";
        assert_eq!(extract_source(raw), "print('hi')");
    }

    #[test]
    fn crlf_fences_are_handled() {
        let raw = "```python\r\nprint(2)\r\n```";
        assert_eq!(extract_source(raw), "print(2)");
    }

    #[test]
    fn empty_response_yields_empty_source() {
        assert_eq!(extract_source("   \n"), "");
        assert_eq!(extract_source("```\n```"), "");
    }
}
