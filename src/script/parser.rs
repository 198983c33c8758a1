//! Recursive-descent parser producing the script syntax tree.

use super::ast::*;
use super::lexer::{tokenize, TemplateChunk, Tok, Token};
use super::ScriptError;
use std::rc::Rc;

/// Nesting limit for blocks and expressions.
const MAX_NESTING: usize = 200;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "finally", "for", "function", "if", "in", "let", "new", "return", "switch", "throw", "try",
    "typeof", "var", "void", "while",
];

/// Parses a complete script.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser::new(tokenize(source, 1)?);
    let mut program = Vec::new();
    while !parser.at_eof() {
        program.push(parser.statement()?);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

fn binary_precedence(punct: &str) -> Option<(u8, BinaryOrLogical)> {
    use BinaryOrLogical::*;
    let entry = match punct {
        "??" => (1, Logical(LogicalOp::Nullish)),
        "||" => (2, Logical(LogicalOp::Or)),
        "&&" => (3, Logical(LogicalOp::And)),
        "==" => (4, Binary(BinaryOp::Eq)),
        "!=" => (4, Binary(BinaryOp::NotEq)),
        "===" => (4, Binary(BinaryOp::StrictEq)),
        "!==" => (4, Binary(BinaryOp::StrictNotEq)),
        "<" => (5, Binary(BinaryOp::Lt)),
        ">" => (5, Binary(BinaryOp::Gt)),
        "<=" => (5, Binary(BinaryOp::LtEq)),
        ">=" => (5, Binary(BinaryOp::GtEq)),
        "+" => (6, Binary(BinaryOp::Add)),
        "-" => (6, Binary(BinaryOp::Sub)),
        "*" => (7, Binary(BinaryOp::Mul)),
        "/" => (7, Binary(BinaryOp::Div)),
        "%" => (7, Binary(BinaryOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

enum BinaryOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn compound_assignment(punct: &str) -> Option<Option<BinaryOp>> {
    match punct {
        "=" => Some(None),
        "+=" => Some(Some(BinaryOp::Add)),
        "-=" => Some(Some(BinaryOp::Sub)),
        "*=" => Some(Some(BinaryOp::Mul)),
        "/=" => Some(Some(BinaryOp::Div)),
        "%=" => Some(Some(BinaryOp::Rem)),
        _ => None,
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_)
            | Expr::Member {
                optional: false,
                ..
            }
    )
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn current(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_tok(&self, offset: usize) -> &Tok {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].tok
    }

    fn at_eof(&self) -> bool {
        self.current().tok == Tok::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(&self.current().tok, Tok::Punct(p) if *p == punct)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.current().tok, Tok::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> ScriptError {
        let token = self.current();
        let message = match &token.tok {
            Tok::Eof => "Unexpected end of input".to_string(),
            Tok::Num(n) => format!("Unexpected number {}", n),
            Tok::Str(_) | Tok::Template(_) => "Unexpected string".to_string(),
            Tok::Ident(name) => format!("Unexpected token '{}'", name),
            Tok::Punct(p) => format!("Unexpected token '{}'", p),
        };
        ScriptError::Syntax {
            message,
            line: token.line,
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> Result<String, ScriptError> {
        match &self.current().tok {
            Tok::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Property names may be reserved words.
    fn property_name(&mut self) -> Result<String, ScriptError> {
        match &self.current().tok {
            Tok::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ScriptError::Syntax {
                message: "Script is nested too deeply".to_string(),
                line: self.current().line,
            });
        }
        Ok(())
    }

    /// Automatic semicolon insertion, simplified: a statement may end at `;`,
    /// before `}`, at end of input, or at a line break.
    fn end_statement(&mut self) -> Result<(), ScriptError> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() || self.current().newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // Statements

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.depth -= 1;
        stmt
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.current().line;
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }

        let keyword = match &self.current().tok {
            Tok::Ident(word) => word.clone(),
            _ => String::new(),
        };
        match keyword.as_str() {
            "let" | "const" | "var" => {
                let kind = self.decl_kind()?;
                let stmt = self.declaration(kind, line)?;
                self.end_statement()?;
                Ok(stmt)
            }
            "function" if matches!(self.peek_tok(1), Tok::Ident(_)) => {
                self.advance();
                let name = self.identifier()?;
                Ok(Stmt::Function(Rc::new(self.function_rest(Some(name))?)))
            }
            "if" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let consequent = Box::new(self.statement()?);
                let alternate = if self.eat_word("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                })
            }
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { test, body })
            }
            "for" => {
                self.advance();
                self.for_statement(line)
            }
            "return" => {
                self.advance();
                let value = if self.is_punct(";")
                    || self.is_punct("}")
                    || self.at_eof()
                    || self.current().newline_before
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.end_statement()?;
                Ok(Stmt::Return(value))
            }
            "break" => {
                self.advance();
                self.end_statement()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.advance();
                self.end_statement()?;
                Ok(Stmt::Continue)
            }
            "throw" => {
                self.advance();
                if self.current().newline_before {
                    return Err(ScriptError::Syntax {
                        message: "Illegal newline after throw".to_string(),
                        line,
                    });
                }
                let value = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Throw(value, line))
            }
            "try" => {
                self.advance();
                self.try_statement()
            }
            _ => {
                let expr = self.expression()?;
                self.end_statement()?;
                Ok(Stmt::Expr(expr, line))
            }
        }
    }

    fn decl_kind(&mut self) -> Result<DeclKind, ScriptError> {
        let kind = match &self.current().tok {
            Tok::Ident(w) if w == "let" => DeclKind::Let,
            Tok::Ident(w) if w == "const" => DeclKind::Const,
            Tok::Ident(w) if w == "var" => DeclKind::Var,
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(kind)
    }

    fn declaration(&mut self, kind: DeclKind, line: usize) -> Result<Stmt, ScriptError> {
        let first = self.binding_pattern()?;
        self.declarators_from(kind, first, line)
    }

    /// Parses the initializer of `first` and any further declarators.
    fn declarators_from(
        &mut self,
        kind: DeclKind,
        first: Pattern,
        line: usize,
    ) -> Result<Stmt, ScriptError> {
        let mut declarations = Vec::new();
        let mut pattern = first;
        loop {
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            let needs_init = kind == DeclKind::Const || !matches!(pattern, Pattern::Name(_));
            if init.is_none() && needs_init {
                return Err(ScriptError::Syntax {
                    message: "Missing initializer in declaration".to_string(),
                    line,
                });
            }
            declarations.push((pattern, init));
            if !self.eat_punct(",") {
                break;
            }
            pattern = self.binding_pattern()?;
        }
        Ok(Stmt::Declare {
            kind,
            declarations,
            line,
        })
    }

    fn binding_pattern(&mut self) -> Result<Pattern, ScriptError> {
        if self.eat_punct("{") {
            let mut entries = Vec::new();
            while !self.eat_punct("}") {
                let key = match &self.current().tok {
                    Tok::Str(s) => {
                        let s = s.clone();
                        self.advance();
                        s
                    }
                    _ => self.property_name()?,
                };
                let binding = if self.eat_punct(":") {
                    self.identifier()?
                } else {
                    if RESERVED.contains(&key.as_str()) {
                        return Err(self.unexpected());
                    }
                    key.clone()
                };
                entries.push((key, binding));
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
            return Ok(Pattern::Object(entries));
        }
        if self.eat_punct("[") {
            let mut elements = Vec::new();
            while !self.eat_punct("]") {
                if self.eat_punct(",") {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.identifier()?));
                if !self.eat_punct(",") {
                    self.expect_punct("]")?;
                    break;
                }
            }
            return Ok(Pattern::Array(elements));
        }
        Ok(Pattern::Name(self.identifier()?))
    }

    fn for_statement(&mut self, line: usize) -> Result<Stmt, ScriptError> {
        self.expect_punct("(")?;

        let init = if self.eat_punct(";") {
            None
        } else if self.is_word("let") || self.is_word("const") || self.is_word("var") {
            let kind = self.decl_kind()?;
            let pattern = self.binding_pattern()?;

            if self.eat_word("of") {
                let iterable = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                });
            }
            if self.eat_word("in") {
                let Pattern::Name(name) = pattern else {
                    return Err(ScriptError::Syntax {
                        message: "for-in requires a plain variable".to_string(),
                        line,
                    });
                };
                let object = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForIn {
                    kind,
                    name,
                    object,
                    body,
                });
            }

            let declaration = self.declarators_from(kind, pattern, line)?;
            self.expect_punct(";")?;
            Some(Box::new(declaration))
        } else {
            let expr = self.expression()?;
            self.expect_punct(";")?;
            Some(Box::new(Stmt::Expr(expr, line)))
        };

        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.current().line;
        let block = self.block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_word("catch") {
            if self.eat_punct("(") {
                param = Some(self.binding_pattern()?);
                self.expect_punct(")")?;
            }
            handler = Some(self.block()?);
        }
        let finalizer = if self.eat_word("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(ScriptError::Syntax {
                message: "Missing catch or finally after try".to_string(),
                line,
            });
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    /// Parameter list and body, after `function` and the optional name.
    fn function_rest(&mut self, name: Option<String>) -> Result<Function, ScriptError> {
        let params = self.parameters()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(Function { name, params, body })
    }

    fn parameters(&mut self) -> Result<Vec<Pattern>, ScriptError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.binding_pattern()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    // Expressions

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.assignment_inner();
        self.depth -= 1;
        expr
    }

    fn assignment_inner(&mut self) -> Result<Expr, ScriptError> {
        if self.starts_arrow() {
            return self.arrow_function();
        }

        let target = self.conditional()?;
        let op = match &self.current().tok {
            Tok::Punct(p) => compound_assignment(p),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(target);
        };
        if !is_assignable(&target) {
            return Err(ScriptError::Syntax {
                message: "Invalid left-hand side in assignment".to_string(),
                line: self.current().line,
            });
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn starts_arrow(&self) -> bool {
        match &self.current().tok {
            Tok::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                matches!(self.peek_tok(1), Tok::Punct("=>"))
            }
            Tok::Punct("(") => {
                let mut depth = 0usize;
                let mut index = self.pos;
                while index < self.tokens.len() {
                    match &self.tokens[index].tok {
                        Tok::Punct("(") | Tok::Punct("[") | Tok::Punct("{") => depth += 1,
                        Tok::Punct(")") | Tok::Punct("]") | Tok::Punct("}") => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(
                                    self.tokens.get(index + 1).map(|t| &t.tok),
                                    Some(Tok::Punct("=>"))
                                );
                            }
                        }
                        Tok::Eof => return false,
                        _ => {}
                    }
                    index += 1;
                }
                false
            }
            _ => false,
        }
    }

    fn arrow_function(&mut self) -> Result<Expr, ScriptError> {
        let params = if self.is_punct("(") {
            self.parameters()?
        } else {
            vec![Pattern::Name(self.identifier()?)]
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };
        Ok(Expr::Function(Rc::new(Function {
            name: None,
            params,
            body,
        })))
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let Tok::Punct(punct) = self.current().tok else {
                return Ok(left);
            };
            let Some((precedence, op)) = binary_precedence(punct) else {
                return Ok(left);
            };
            if precedence < min_precedence {
                return Ok(left);
            }
            self.advance();
            let right = Box::new(self.binary(precedence + 1)?);
            left = match op {
                BinaryOrLogical::Binary(op) => Expr::Binary(op, Box::new(left), right),
                BinaryOrLogical::Logical(op) => Expr::Logical(op, Box::new(left), right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.unary_inner();
        self.depth -= 1;
        expr
    }

    fn unary_inner(&mut self) -> Result<Expr, ScriptError> {
        let op = match &self.current().tok {
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Ident(w) if w == "typeof" => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            return Ok(Expr::Unary(op, Box::new(self.unary()?)));
        }

        if self.is_punct("++") || self.is_punct("--") {
            let increment = self.is_punct("++");
            self.advance();
            let target = self.unary()?;
            if !is_assignable(&target) {
                return Err(ScriptError::Syntax {
                    message: "Invalid left-hand side in prefix operation".to_string(),
                    line: self.current().line,
                });
            }
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
            });
        }

        // `new X(...)` is evaluated as a plain call; no constructors are exposed
        self.eat_word("new");

        let expr = self.call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.current().newline_before {
            if !is_assignable(&expr) {
                return Err(ScriptError::Syntax {
                    message: "Invalid left-hand side in postfix operation".to_string(),
                    line: self.current().line,
                });
            }
            let increment = self.is_punct("++");
            self.advance();
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let name = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Named(name),
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                if self.is_punct("(") {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat_punct("[") {
                    let index = self.expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Computed(Box::new(index)),
                        optional: true,
                    };
                } else {
                    let name = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Property::Named(name),
                        optional: true,
                    };
                }
            } else if self.is_punct("[") && !self.current().newline_before {
                self.advance();
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Property::Computed(Box::new(index)),
                    optional: false,
                };
            } else if self.is_punct("(") && !self.current().newline_before {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.current().clone();
        match token.tok {
            Tok::Num(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Tok::Template(chunks) => {
                self.advance();
                let mut parts = Vec::with_capacity(chunks.len());
                for chunk in chunks {
                    parts.push(match chunk {
                        TemplateChunk::Text(text) => TemplatePart::Text(text),
                        TemplateChunk::Expr(source, line) => {
                            TemplatePart::Expr(self.template_expression(&source, line)?)
                        }
                    });
                }
                Ok(Expr::Template(parts))
            }
            Tok::Ident(name) => match name.as_str() {
                "true" | "false" => {
                    self.advance();
                    Ok(Expr::Bool(name == "true"))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                }
                "NaN" => {
                    self.advance();
                    Ok(Expr::Number(f64::NAN))
                }
                "Infinity" => {
                    self.advance();
                    Ok(Expr::Number(f64::INFINITY))
                }
                "function" => {
                    self.advance();
                    let name = match &self.current().tok {
                        Tok::Ident(_) => Some(self.identifier()?),
                        _ => None,
                    };
                    Ok(Expr::Function(Rc::new(self.function_rest(name)?)))
                }
                _ => Ok(Expr::Ident(self.identifier()?)),
            },
            Tok::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Tok::Punct("[") => {
                self.advance();
                let mut elements = Vec::new();
                while !self.eat_punct("]") {
                    if self.eat_punct(",") {
                        elements.push(Expr::Undefined);
                        continue;
                    }
                    elements.push(self.assignment()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(elements))
            }
            Tok::Punct("{") => {
                self.advance();
                self.object_literal()
            }
            _ => Err(self.unexpected()),
        }
    }

    fn object_literal(&mut self) -> Result<Expr, ScriptError> {
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            let token = self.current().clone();
            let key = match token.tok {
                Tok::Str(ref s) => {
                    self.advance();
                    PropertyKey::Named(s.clone())
                }
                Tok::Num(n) => {
                    self.advance();
                    PropertyKey::Named(super::value::format_number(n))
                }
                Tok::Punct("[") => {
                    self.advance();
                    let key = self.expression()?;
                    self.expect_punct("]")?;
                    PropertyKey::Computed(key)
                }
                _ => PropertyKey::Named(self.property_name()?),
            };

            let value = if self.eat_punct(":") {
                self.assignment()?
            } else if self.is_punct("(") {
                let name = match &key {
                    PropertyKey::Named(name) => Some(name.clone()),
                    PropertyKey::Computed(_) => None,
                };
                Expr::Function(Rc::new(self.function_rest(name)?))
            } else {
                match (&key, &token.tok) {
                    (PropertyKey::Named(name), Tok::Ident(_))
                        if !RESERVED.contains(&name.as_str()) =>
                    {
                        Expr::Ident(name.clone())
                    }
                    _ => return Err(self.unexpected()),
                }
            };
            properties.push((key, value));

            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(properties))
    }

    fn template_expression(&mut self, source: &str, line: usize) -> Result<Expr, ScriptError> {
        let mut inner = Parser::new(tokenize(source, line)?);
        inner.depth = self.depth;
        let expr = inner.expression()?;
        if !inner.at_eof() {
            return Err(inner.unexpected());
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        match parse_program(source).unwrap().remove(0) {
            Stmt::Expr(expr, _) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
        assert!(matches!(
            expr("a || b && c"),
            Expr::Logical(LogicalOp::Or, _, _)
        ));
        assert!(matches!(
            expr("a ?? b ? 1 : 2"),
            Expr::Conditional(..)
        ));
    }

    #[test]
    fn test_member_chain() {
        let parsed = expr("pm.response.json()?.data[0]");
        let Expr::Member {
            object, optional, ..
        } = parsed
        else {
            panic!("expected member");
        };
        assert!(!optional);
        assert!(matches!(*object, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn test_arrow_functions() {
        assert!(matches!(expr("x => x * 2"), Expr::Function(_)));
        assert!(matches!(expr("(a, b) => { return a + b; }"), Expr::Function(_)));
        assert!(matches!(expr("({ id }) => id"), Expr::Function(_)));
        // a parenthesized expression is not an arrow
        assert!(matches!(expr("(a + b) * 2"), Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_declarations() {
        let program = parse_program("const { token, user: u } = data; let a = 1, b;").unwrap();
        assert_eq!(program.len(), 2);
        match &program[0] {
            Stmt::Declare {
                kind, declarations, ..
            } => {
                assert_eq!(*kind, DeclKind::Const);
                assert_eq!(
                    declarations[0].0,
                    Pattern::Object(vec![
                        ("token".to_string(), "token".to_string()),
                        ("user".to_string(), "u".to_string())
                    ])
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_program("const x;").is_err());
    }

    #[test]
    fn test_statements_without_semicolons() {
        let program = parse_program(
            "let total = 0\nfor (const n of [1, 2]) total += n\nif (total > 2) console.log(total)",
        )
        .unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(program[1], Stmt::ForOf { .. }));
    }

    #[test]
    fn test_classic_for_and_try() {
        let program = parse_program(
            "for (let i = 0; i < 3; i++) {} try { x() } catch (e) { y(e) } finally { z() }",
        )
        .unwrap();
        assert!(matches!(program[0], Stmt::For { .. }));
        assert!(matches!(
            program[1],
            Stmt::Try {
                handler: Some(_),
                finalizer: Some(_),
                ..
            }
        ));
        assert!(parse_program("try {}").is_err());
    }

    #[test]
    fn test_template_expression() {
        match expr("`a ${b + 1} c`") {
            Expr::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[1], TemplatePart::Expr(Expr::Binary(..))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_forms() {
        match expr("({ a: 1, 'b-c': 2, [k]: 3, d, f(x) { return x } })") {
            Expr::Object(props) => assert_eq!(props.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_report_line() {
        match parse_program("let a = 1;\nlet = 2;") {
            Err(ScriptError::Syntax { line, message }) => {
                assert_eq!(line, 2);
                assert_eq!(message, "Unexpected token '='");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
        assert!(parse_program("a + ").is_err());
        assert!(parse_program("1 = 2").is_err());
        assert!(parse_program("a b").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(
            parse_program(&deep),
            Err(ScriptError::Syntax { .. })
        ));
    }
}
