//! Document fence stripping
//!
//! The Synthesis model is asked to answer inside a markdown code block. The
//! wrapping fence has to go before the text is shown as a document, while
//! code blocks inside the document must stay closed.

const FENCE: &str = "```";

/// Strip the code fence wrapping a whole document
///
/// Removes at most one wrapper: a leading ```` ``` ````/```` ```markdown ````
/// line, a trailing ```` ``` ```` line, or both. A marker is only removed when
/// it is not paired with a fence inside the document. Text whose unwrapped
/// form would itself look wrapped is left as is, so calling this on its own
/// output changes nothing.
pub fn strip_document_fence(text: &str) -> String {
    let text = text.trim();
    match unwrap(text) {
        Some(inner) if unwrap(&inner).is_none() => inner,
        _ => text.to_string(),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

fn is_wrapper_open(line: &str) -> bool {
    line.trim()
        .strip_prefix(FENCE)
        .is_some_and(|info| matches!(info.trim(), "" | "markdown" | "md"))
}

fn is_closer(line: &str) -> bool {
    line.trim() == FENCE
}

/// Text without its wrapper markers, or `None` when nothing is a wrapper
fn unwrap(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let (first, last) = (*lines.first()?, *lines.last()?);
    let unbalanced = lines.iter().filter(|l| is_fence(l)).count() % 2 == 1;

    let paired = lines.len() >= 2 && is_wrapper_open(first) && is_closer(last);

    let kept = if paired && !unbalanced {
        &lines[1..lines.len() - 1]
    } else if is_wrapper_open(first) && unbalanced {
        // Opener without closer, e.g. a reply cut off at the token limit.
        &lines[1..]
    } else if is_closer(last) && unbalanced {
        &lines[..lines.len() - 1]
    } else {
        return None;
    };
    Some(kept.join("\n").trim().to_string())
}
