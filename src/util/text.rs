use std::borrow::Cow;

/// Flattens feed-supplied text into one printable line.
///
/// Terminal escape sequences (CSI `ESC [ ... final`, OSC `ESC ] ... BEL/ST`)
/// and other control characters are dropped. Runs of whitespace, including
/// newlines, collapse to a single space, and the result is trimmed.
///
/// Returns `Cow::Borrowed` when the input is already clean.
///
/// # Examples
///
/// ```
/// use plaintextfeeds::util::single_line;
///
/// assert_eq!(single_line("Hello\n  world"), "Hello world");
/// assert_eq!(single_line("\x1b[31mred\x1b[0m"), "red");
/// ```
pub fn single_line(s: &str) -> Cow<'_, str> {
    if is_clean(s) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    // parameter/intermediate bytes up to and including the final byte
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else if c.is_control() {
            continue;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }

    Cow::Owned(out)
}

fn is_clean(s: &str) -> bool {
    let mut prev_space = true;
    for c in s.chars() {
        if c.is_control() {
            return false;
        }
        if c.is_whitespace() {
            if c != ' ' || prev_space {
                return false;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
    }
    !prev_space || s.is_empty()
}
