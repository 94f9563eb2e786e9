/// One line of the host's directive stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Change the background. Carries the raw, un-normalized key.
    Background(String),
    /// Run the frame loop for this many milliseconds.
    Wait(u64),
    Status,
    Quit,
}

/// Parse a directive line. Blank lines and `#` comments yield `None`.
///
/// `bg <key>`, `background <key>` and a bare `<key>` all request a
/// background; everything after the verb is passed through untouched so
/// quoted keys survive.
pub fn parse_line(line: &str) -> Option<Directive> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb.to_ascii_lowercase().as_str() {
        "bg" | "background" => Some(Directive::Background(rest.to_string())),
        "wait" => match rest.parse() {
            Ok(ms) => Some(Directive::Wait(ms)),
            Err(_) => {
                log::warn!("Ignoring directive with bad duration: {line}");
                None
            }
        },
        "status" if rest.is_empty() => Some(Directive::Status),
        "quit" | "exit" if rest.is_empty() => Some(Directive::Quit),
        _ => Some(Directive::Background(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_verbs() {
        assert_eq!(
            parse_line("bg office"),
            Some(Directive::Background("office".into()))
        );
        assert_eq!(
            parse_line("BACKGROUND   \"Office Night\" "),
            Some(Directive::Background("\"Office Night\"".into()))
        );
    }

    #[test]
    fn bare_key_is_a_background() {
        assert_eq!(
            parse_line("  rooftop "),
            Some(Directive::Background("rooftop".into()))
        );
    }

    #[test]
    fn bg_without_key_passes_empty() {
        assert_eq!(parse_line("bg"), Some(Directive::Background(String::new())));
    }

    #[test]
    fn control_directives() {
        assert_eq!(parse_line("wait 250"), Some(Directive::Wait(250)));
        assert_eq!(parse_line("status"), Some(Directive::Status));
        assert_eq!(parse_line("quit"), Some(Directive::Quit));
        assert_eq!(parse_line("exit"), Some(Directive::Quit));
    }

    #[test]
    fn bad_wait_is_dropped() {
        assert_eq!(parse_line("wait soon"), None);
    }

    #[test]
    fn blank_and_comments_skipped() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# chapter 2"), None);
    }
}
