//! Tokenizer for post-response scripts.

use super::ScriptError;

/// Multi-character punctuators, longest first so greedy matching works.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=",
    "-=", "*=", "/=", "%=", "+", "-", "*", "/", "%", "=", "<", ">", "!", "?", ":", ".", ",", ";",
    "(", ")", "[", "]", "{", "}",
];

/// A piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    /// Source of a `${...}` substitution and the line it starts on.
    Expr(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Template(Vec<TemplateChunk>),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

/// Splits `source` into tokens, starting line numbers at `first_line`.
pub fn tokenize(source: &str, first_line: usize) -> Result<Vec<Token>, ScriptError> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: first_line,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            message: message.into(),
            line: self.line,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let line = self.line;
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    line,
                    newline_before,
                });
                return Ok(tokens);
            };

            let tok = if c.is_ascii_digit() || (c == '.' && self.peek_at(1).map_or(false, |d| d.is_ascii_digit())) {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.bump();
                Tok::Str(self.string(c)?)
            } else if c == '`' {
                self.bump();
                self.template()?
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let start = self.pos;
                while self
                    .peek()
                    .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '$')
                {
                    self.pos += 1;
                }
                Tok::Ident(self.chars[start..self.pos].iter().collect())
            } else {
                self.punctuator()?
            };

            tokens.push(Token {
                tok,
                line,
                newline_before,
            });
        }
    }

    /// Skips whitespace and comments. Returns whether a newline was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ScriptError> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('\n'), _) => {
                    newline = true;
                    self.bump();
                }
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().map_or(false, |c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(c), _) => {
                                newline |= c == '\n';
                                self.bump();
                            }
                            (None, _) => return Err(self.error("Unterminated comment")),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn number(&mut self) -> Result<Tok, ScriptError> {
        let start = self.pos;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            return u64::from_str_radix(&digits, 16)
                .map(|n| Tok::Num(n as f64))
                .map_err(|_| self.error("Invalid hexadecimal literal"));
        }

        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).map_or(true, |c| !c.is_alphabetic() && c != '_') {
            self.pos += 1;
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            if self.peek().map_or(false, |c| c.is_ascii_digit()) {
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| self.error(format!("Invalid number '{}'", text)))
    }

    /// Reads an escape sequence after the backslash.
    fn escape(&mut self) -> Result<Option<char>, ScriptError> {
        let Some(c) = self.bump() else {
            return Err(self.error("Unterminated string"));
        };
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            // line continuation
            '\n' => return Ok(None),
            'x' => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                let code =
                    u32::from_str_radix(&hex, 16).map_err(|_| self.error("Invalid \\x escape"))?;
                char::from_u32(code).ok_or_else(|| self.error("Invalid \\x escape"))?
            }
            'u' => {
                let hex: String = if self.peek() == Some('{') {
                    self.bump();
                    let mut hex = String::new();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                    hex
                } else {
                    (0..4).filter_map(|_| self.bump()).collect()
                };
                let code =
                    u32::from_str_radix(&hex, 16).map_err(|_| self.error("Invalid \\u escape"))?;
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            other => other,
        };
        Ok(Some(decoded))
    }

    fn string(&mut self, quote: char) -> Result<String, ScriptError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    if let Some(c) = self.escape()? {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<Tok, ScriptError> {
        let mut chunks = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => break,
                Some('\\') => {
                    if let Some(c) = self.escape()? {
                        text.push(c);
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                    }
                    let line = self.line;
                    chunks.push(TemplateChunk::Expr(self.template_expr()?, line));
                }
                Some(c) => text.push(c),
            }
        }
        if !text.is_empty() {
            chunks.push(TemplateChunk::Text(text));
        }
        Ok(Tok::Template(chunks))
    }

    /// Captures the source of a `${...}` substitution up to its closing brace.
    fn template_expr(&mut self) -> Result<String, ScriptError> {
        let mut source = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("Unterminated template substitution"));
            };
            match quote {
                Some(q) => {
                    if c == '\\' {
                        source.push(c);
                        if let Some(next) = self.bump() {
                            source.push(next);
                        }
                        continue;
                    }
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' | '`' => quote = Some(c),
                    '{' => depth += 1,
                    '}' if depth == 0 => return Ok(source),
                    '}' => depth -= 1,
                    _ => {}
                },
            }
            source.push(c);
        }
    }

    fn punctuator(&mut self) -> Result<Tok, ScriptError> {
        for punct in PUNCTUATORS {
            let len = punct.chars().count();
            let matches = punct
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(c));
            if !matches {
                continue;
            }
            // `a ?.5 : b` is a conditional, not optional chaining
            if *punct == "?." && self.peek_at(2).map_or(false, |c| c.is_ascii_digit()) {
                continue;
            }
            self.pos += len;
            return Ok(Tok::Punct(punct));
        }
        let c = self.peek().unwrap_or_default();
        Err(self.error(format!("Unexpected character '{}'", c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Tok> {
        tokenize(source, 1)
            .unwrap()
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("const x = a?.b ?? 1.5;"),
            vec![
                Tok::Ident("const".to_string()),
                Tok::Ident("x".to_string()),
                Tok::Punct("="),
                Tok::Ident("a".to_string()),
                Tok::Punct("?."),
                Tok::Ident("b".to_string()),
                Tok::Punct("??"),
                Tok::Num(1.5),
                Tok::Punct(";"),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb" "A\u{1F600}""#),
            vec![
                Tok::Str("it's".to_string()),
                Tok::Str("a\tb".to_string()),
                Tok::Str("A\u{1F600}".to_string()),
                Tok::Eof,
            ]
        );
        assert!(tokenize("'open", 1).is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 0x1F 1e3 .5 3.toFixed"),
            vec![
                Tok::Num(42.0),
                Tok::Num(31.0),
                Tok::Num(1000.0),
                Tok::Num(0.5),
                Tok::Num(3.0),
                Tok::Punct("."),
                Tok::Ident("toFixed".to_string()),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_template_literal() {
        assert_eq!(
            kinds("`id: ${user.id} {${ {a:1}.a }}`"),
            vec![
                Tok::Template(vec![
                    TemplateChunk::Text("id: ".to_string()),
                    TemplateChunk::Expr("user.id".to_string(), 1),
                    TemplateChunk::Text(" {".to_string()),
                    TemplateChunk::Expr(" {a:1}.a ".to_string(), 1),
                    TemplateChunk::Text("}".to_string()),
                ]),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = tokenize("a // note\n/* block\n */ b", 1).unwrap();
        assert_eq!(tokens[0].line, 1);
        assert!(!tokens[0].newline_before);
        assert_eq!(tokens[1].tok, Tok::Ident("b".to_string()));
        assert_eq!(tokens[1].line, 3);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn test_conditional_with_decimal() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                Tok::Ident("a".to_string()),
                Tok::Punct("?"),
                Tok::Num(0.5),
                Tok::Punct(":"),
                Tok::Num(1.0),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        match tokenize("a # b", 1) {
            Err(ScriptError::Syntax { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
