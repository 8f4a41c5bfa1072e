//! Legacy wiki markup cleanup.
//!
//! The old tracker used `{{{ … }}}` for code. Multi-line blocks become
//! indented Markdown code blocks; `{{{x}}}` inside a line becomes `` `x` ``.

const OPEN: &str = "{{{";
const CLOSE: &str = "}}}";
const INDENT: &str = "    ";

/// Convert `{{{ … }}}` wiki code blocks in `body` to Markdown.
///
/// An opening line may carry an interpreter hint (`{{{#!python`), which is
/// dropped. A block left open at the end of the body is closed implicitly.
pub fn clean_body(body: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_block = false;
    let mut needs_gap = false;

    for line in body.lines() {
        if in_block {
            match line.find(CLOSE) {
                Some(pos) => {
                    let before = &line[..pos];
                    if !before.trim().is_empty() {
                        out.push(format!("{INDENT}{before}"));
                    }
                    in_block = false;
                    needs_gap = true;
                    let after = line[pos + CLOSE.len()..].trim_start();
                    if !after.is_empty() {
                        push_text(&mut out, &mut needs_gap, after);
                    }
                }
                None => out.push(format!("{INDENT}{line}")),
            }
            continue;
        }

        if let Some(rest) = line.trim_start().strip_prefix(OPEN)
            && !rest.contains(CLOSE)
        {
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
            needs_gap = false;
            in_block = true;
            let rest = rest.trim();
            if !rest.is_empty() && !rest.starts_with("#!") {
                out.push(format!("{INDENT}{rest}"));
            }
            continue;
        }

        push_text(&mut out, &mut needs_gap, line);
    }

    let mut cleaned = out.join("\n");
    if body.ends_with('\n') {
        cleaned.push('\n');
    }
    cleaned
}

/// Append a non-code line, separating it from a just-closed block.
fn push_text(out: &mut Vec<String>, needs_gap: &mut bool, line: &str) {
    if *needs_gap && !line.is_empty() {
        out.push(String::new());
    }
    *needs_gap = false;
    out.push(line.replace(OPEN, "`").replace(CLOSE, "`"));
}
