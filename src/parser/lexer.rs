//! Line lexer for three-address code
//!
//! Each source line is classified independently into a [`SourceLine`]:
//! a blank/comment line, a label declaration (`name:` or `name(a, b):`), or
//! an instruction with its raw operand [`Token`]s. Operand *kinds* are not
//! decided here; the loader classifies tokens against the opcode's arity table.

use super::loader::LoadError;

/// A single raw operand token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Ident(String),
}

impl Token {
    /// Source-like rendering, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(n) => n.to_string(),
            Token::Float(x) => x.to_string(),
            Token::Boolean(b) => b.to_string(),
            Token::Text(s) => format!("{:?}", s),
            Token::Ident(name) => name.clone(),
        }
    }
}

/// One classified source line.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLine {
    Blank,
    Label {
        name: String,
        params: Option<Vec<String>>,
    },
    Instruction {
        mnemonic: String,
        operands: Vec<Token>,
    },
}

/// Lex a single line. `line` is 1-based and only used for error reporting.
pub fn lex_line(text: &str, line: usize) -> Result<SourceLine, LoadError> {
    let code = strip_comment(text).trim();
    if code.is_empty() {
        return Ok(SourceLine::Blank);
    }

    if let Some(head) = code.strip_suffix(':') {
        return lex_label(head.trim(), line);
    }

    let (mnemonic, rest) = match code.find(char::is_whitespace) {
        Some(split) => (&code[..split], code[split..].trim()),
        None => (code, ""),
    };

    if !is_identifier(mnemonic) {
        return Err(syntax(line, format!("invalid opcode '{}'", mnemonic)));
    }

    let mut operands = Vec::new();
    if !rest.is_empty() {
        for piece in split_operands(rest, line)? {
            operands.push(lex_token(piece.trim(), line)?);
        }
    }

    Ok(SourceLine::Instruction {
        mnemonic: mnemonic.to_string(),
        operands,
    })
}

fn lex_label(head: &str, line: usize) -> Result<SourceLine, LoadError> {
    let Some(open) = head.find('(') else {
        if !is_identifier(head) {
            return Err(syntax(line, format!("invalid label name '{}'", head)));
        }
        return Ok(SourceLine::Label {
            name: head.to_string(),
            params: None,
        });
    };

    let name = head[..open].trim();
    let inner = head[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| syntax(line, "unterminated parameter list".to_string()))?;

    if !is_identifier(name) {
        return Err(syntax(line, format!("invalid label name '{}'", name)));
    }

    let mut params = Vec::new();
    if !inner.trim().is_empty() {
        for param in inner.split(',') {
            let param = param.trim();
            if !is_identifier(param) {
                return Err(syntax(line, format!("invalid parameter name '{}'", param)));
            }
            if params.iter().any(|p| p == param) {
                return Err(syntax(line, format!("duplicate parameter '{}'", param)));
            }
            params.push(param.to_string());
        }
    }

    Ok(SourceLine::Label {
        name: name.to_string(),
        params: Some(params),
    })
}

/// Cut a line at the first `#` that is not inside a string literal.
fn strip_comment(text: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &text[..i],
            _ => {}
        }
    }
    text
}

/// Split an operand list on commas outside string literals.
fn split_operands(rest: &str, line: usize) -> Result<Vec<&str>, LoadError> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                pieces.push(&rest[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_string {
        return Err(syntax(line, "unterminated string literal".to_string()));
    }
    pieces.push(&rest[start..]);

    if pieces.iter().any(|p| p.trim().is_empty()) {
        return Err(syntax(line, "empty operand".to_string()));
    }
    Ok(pieces)
}

fn lex_token(text: &str, line: usize) -> Result<Token, LoadError> {
    if text.eq_ignore_ascii_case("true") {
        return Ok(Token::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Token::Boolean(false));
    }
    if text.starts_with('"') {
        return unescape(text, line).map(Token::Text);
    }

    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return text
            .parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| syntax(line, format!("integer literal '{}' out of range", text)));
    }
    if let Some((whole, frac)) = digits.split_once('.') {
        if !whole.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && frac.chars().all(|c| c.is_ascii_digit())
        {
            return text
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| syntax(line, format!("invalid float literal '{}'", text)));
        }
    }

    if is_identifier(text) {
        Ok(Token::Ident(text.to_string()))
    } else {
        Err(syntax(line, format!("unrecognised operand '{}'", text)))
    }
}

fn unescape(text: &str, line: usize) -> Result<String, LoadError> {
    let body = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| syntax(line, format!("malformed string literal {}", text)))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                return Err(syntax(line, format!("unknown escape '\\{}'", other)));
            }
            None => return Err(syntax(line, "dangling escape".to_string())),
        }
    }
    Ok(out)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn syntax(line: usize, message: String) -> LoadError {
    LoadError::Syntax { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(text: &str) -> (String, Vec<Token>) {
        match lex_line(text, 1).expect("lex failed") {
            SourceLine::Instruction { mnemonic, operands } => (mnemonic, operands),
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(lex_line("", 1).unwrap(), SourceLine::Blank);
        assert_eq!(lex_line("   # just a note", 1).unwrap(), SourceLine::Blank);
    }

    #[test]
    fn plain_label() {
        assert_eq!(
            lex_line("loop_start:", 3).unwrap(),
            SourceLine::Label {
                name: "loop_start".to_string(),
                params: None
            }
        );
    }

    #[test]
    fn label_with_parameters() {
        assert_eq!(
            lex_line("swap(a, b):", 1).unwrap(),
            SourceLine::Label {
                name: "swap".to_string(),
                params: Some(vec!["a".to_string(), "b".to_string()])
            }
        );
        assert_eq!(
            lex_line("main():", 1).unwrap(),
            SourceLine::Label {
                name: "main".to_string(),
                params: Some(vec![])
            }
        );
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        assert!(matches!(
            lex_line("f(a, a):", 7),
            Err(LoadError::Syntax { line: 7, .. })
        ));
    }

    #[test]
    fn operand_literals() {
        let (mnemonic, operands) = instr("ADD res, -4, 2.5");
        assert_eq!(mnemonic, "ADD");
        assert_eq!(
            operands,
            vec![
                Token::Ident("res".to_string()),
                Token::Integer(-4),
                Token::Float(2.5)
            ]
        );

        let (_, operands) = instr("ASSIGN flag, TRUE");
        assert_eq!(operands[1], Token::Boolean(true));
    }

    #[test]
    fn strings_keep_commas_and_hashes() {
        let (_, operands) = instr(r#"PRINT "a, b # c\n"  # trailing comment"#);
        assert_eq!(operands, vec![Token::Text("a, b # c\n".to_string())]);
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        assert!(matches!(
            lex_line(r#"PRINT "oops"#, 2),
            Err(LoadError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn empty_operand_is_a_syntax_error() {
        assert!(lex_line("ADD a,,b", 1).is_err());
    }

    #[test]
    fn garbage_operand_is_a_syntax_error() {
        assert!(lex_line("ASSIGN x, 3abc", 1).is_err());
    }

    #[test]
    fn no_operands() {
        let (mnemonic, operands) = instr("halt");
        assert_eq!(mnemonic, "halt");
        assert!(operands.is_empty());
    }
}
