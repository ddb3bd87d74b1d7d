#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    LineComment,
    BlockComment,
    Interpreted,
    Raw,
    Rune,
}

impl Lexeme {
    fn is_literal(self) -> bool {
        matches!(self, Lexeme::Interpreted | Lexeme::Raw | Lexeme::Rune)
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Tags every character with the lexical context it sits in, plus the context at end of input.
/// Opening delimiters belong to the surrounding code, closing ones to the literal or comment.
fn classify(source: &str) -> (Vec<(char, Lexeme)>, Lexeme) {
    let mut out = Vec::with_capacity(source.len());
    let mut state = Lexeme::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        let current = state;
        let mut paired = None;
        match state {
            Lexeme::Code => match c {
                '/' if chars.peek() == Some(&'/') => state = Lexeme::LineComment,
                '/' if chars.peek() == Some(&'*') => state = Lexeme::BlockComment,
                '"' => state = Lexeme::Interpreted,
                '`' => state = Lexeme::Raw,
                '\'' => state = Lexeme::Rune,
                _ => {}
            },
            Lexeme::LineComment if c == '\n' => state = Lexeme::Code,
            Lexeme::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                paired = chars.next();
                state = Lexeme::Code;
            }
            Lexeme::Interpreted | Lexeme::Rune if c == '\\' => paired = chars.next(),
            Lexeme::Interpreted if c == '"' => state = Lexeme::Code,
            Lexeme::Rune if c == '\'' => state = Lexeme::Code,
            Lexeme::Raw if c == '`' => state = Lexeme::Code,
            _ => {}
        }
        out.push((c, current));
        if let Some(next) = paired {
            out.push((next, current));
        }
    }
    (out, state)
}

/// Strips trailing whitespace, collapses runs of blank lines and ends the file with one newline.
/// String and rune literals are copied unchanged.
pub fn tidy(source: &str) -> String {
    let (chars, _) = classify(source);
    let mut out = String::with_capacity(source.len());
    let mut indent = String::new();
    let mut newlines = 0;

    for (c, lexeme) in chars {
        if !lexeme.is_literal() {
            match c {
                ' ' | '\t' => {
                    indent.push(c);
                    continue;
                }
                '\n' => {
                    indent.clear();
                    newlines += 1;
                    continue;
                }
                _ => {}
            }
        }
        if !out.is_empty() {
            out.extend(std::iter::repeat_n('\n', newlines.min(2)));
        }
        out.push_str(&indent);
        out.push(c);
        indent.clear();
        newlines = 0;
    }
    out.push('\n');
    out
}

/// Checks that every bracket outside strings and comments is closed in order.
pub fn check_balance(source: &str) -> Result<(), String> {
    let (chars, end) = classify(source);
    let mut stack: Vec<(char, usize)> = vec![];
    let mut line = 1;

    for (c, lexeme) in chars {
        if c == '\n' {
            if lexeme == Lexeme::Interpreted {
                return Err(format!("line {line}: unterminated string"));
            }
            line += 1;
            continue;
        }
        if lexeme != Lexeme::Code {
            continue;
        }
        match c {
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => match stack.pop() {
                Some((open, _)) if closer(open) == c => {}
                Some((open, opened)) => {
                    return Err(format!(
                        "line {line}: found `{c}` but `{open}` from line {opened} is still open"
                    ));
                }
                None => return Err(format!("line {line}: unexpected `{c}`")),
            },
            _ => {}
        }
    }

    match (end, stack.pop()) {
        (Lexeme::Code | Lexeme::LineComment, None) => Ok(()),
        (Lexeme::Code | Lexeme::LineComment, Some((open, opened))) => {
            Err(format!("`{open}` opened on line {opened} is never closed"))
        }
        (Lexeme::Raw, _) => Err("unterminated raw string".to_owned()),
        (Lexeme::BlockComment, _) => Err("unterminated block comment".to_owned()),
        (Lexeme::Interpreted | Lexeme::Rune, _) => Err("unterminated literal".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_collapses_blank_lines() {
        let text = "\n\npackage db   \n\n\n\nimport \"context\"\t\n";
        assert_eq!(tidy(text), "package db\n\nimport \"context\"\n");
    }

    #[test]
    fn tidy_keeps_literals_verbatim() {
        let source = "const q = `SELECT a   \nFROM t\n\n\n\nWHERE b = 'x  '`   \n\n\n\nvar s = \"a  \"\t\n";
        assert_eq!(
            tidy(source),
            "const q = `SELECT a   \nFROM t\n\n\n\nWHERE b = 'x  '`\n\nvar s = \"a  \"\n"
        );
    }

    #[test]
    fn balanced_go_passes() {
        let source = "func f() {\n\tx := []string{\"}\", `(`}\n\t// )\n\t_ = '{'\n}\n";
        assert!(check_balance(source).is_ok());
    }

    #[test]
    fn mismatched_brackets_fail() {
        let err = check_balance("func f() {\n\tg(]\n}\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
        assert!(check_balance("type T struct {\n").is_err());
        assert!(check_balance("const q = `select\n").is_err());
    }
}
