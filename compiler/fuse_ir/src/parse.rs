//! Parser for the textual IR.
//!
//! ```text
//! fn @sum(%a: i32, %b: i32, %p: ptr) {
//! entry:
//!   %t1 = add i32 %a, %b      ; comments run to end of line
//!   store %t1, %p
//!   call void @flush()
//!   ret
//! }
//! ```
//!
//! Tokenization is a logos-derived lexer; parsing is recursive descent over
//! the token vector. Values must be defined before they are referenced.

use std::fmt;
use std::ops::Range;

use logos::Logos;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::builder::Builder;
use crate::ir::{BinOp, BlockId, Constant, Function, Inst, Type, Value};

// ── Tokens ──────────────────────────────────────────────────────────

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"([ \t\r\n]+|;[^\n]*)")]
enum Token<'s> {
    #[regex(r"%[A-Za-z0-9_.]+", |lex| &lex.slice()[1..])]
    Local(&'s str),

    #[regex(r"@[A-Za-z0-9_.]+", |lex| &lex.slice()[1..])]
    Global(&'s str),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Opcodes, type names, labels, `fn`, `splat`, the `x` of vector types.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice())]
    Ident(&'s str),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Local(name) => write!(f, "`%{name}`"),
            Token::Global(name) => write!(f, "`@{name}`"),
            Token::Int(n) => write!(f, "`{n}`"),
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::LBrace => f.write_str("`{`"),
            Token::RBrace => f.write_str("`}`"),
            Token::LAngle => f.write_str("`<`"),
            Token::RAngle => f.write_str("`>`"),
            Token::Comma => f.write_str("`,`"),
            Token::Colon => f.write_str("`:`"),
            Token::Eq => f.write_str("`=`"),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// A syntax or name-resolution error, located by byte range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub span: Range<usize>,
    pub message: String,
}

impl ParseError {
    fn new(span: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// 1-based line and column of the error start within `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let upto = &source[..self.span.start.min(source.len())];
        let line = upto.matches('\n').count() + 1;
        let col = upto.rfind('\n').map_or(upto.len(), |nl| upto.len() - nl - 1) + 1;
        (line, col)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at bytes {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

// ── Entry points ────────────────────────────────────────────────────

/// Parse every function in `source`.
pub fn parse_module(source: &str) -> Result<Vec<Function>, ParseError> {
    let mut parser = Parser::new(source)?;
    let mut functions = Vec::new();
    while parser.peek().is_some() {
        functions.push(parser.function()?);
    }
    Ok(functions)
}

/// Parse a source holding exactly one function.
pub fn parse_function(source: &str) -> Result<Function, ParseError> {
    let mut parser = Parser::new(source)?;
    let func = parser.function()?;
    if let Some(tok) = parser.peek() {
        return Err(parser.error(format!("expected end of input, found {tok}")));
    }
    Ok(func)
}

// ── Parser ──────────────────────────────────────────────────────────

type Scope<'s> = FxHashMap<&'s str, Value>;

struct Parser<'s> {
    tokens: Vec<(Token<'s>, Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(result) = lexer.next() {
            match result {
                Ok(tok) => tokens.push((tok, lexer.span())),
                Err(()) => {
                    return Err(ParseError::new(
                        lexer.span(),
                        format!("unrecognized token `{}`", lexer.slice()),
                    ))
                }
            }
        }
        Ok(Self {
            tokens,
            pos: 0,
            source_len: source.len(),
        })
    }

    // Cursor

    fn peek(&self) -> Option<Token<'s>> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'s>> {
        self.tokens.get(self.pos + offset).map(|(tok, _)| *tok)
    }

    fn span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len..self.source_len, |(_, span)| span.clone())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.span(), message)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(tok) => self.error(format!("expected {expected}, found {tok}")),
            None => self.error(format!("expected {expected}, found end of input")),
        }
    }

    fn eat(&mut self, want: Token<'s>) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: Token<'s>) -> Result<(), ParseError> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.unexpected(&want.to_string()))
        }
    }

    fn ident(&mut self) -> Result<&'s str, ParseError> {
        match self.peek() {
            Some(Token::Ident(s)) => {
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::Ident(s)) if s == kw => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("`{kw}`"))),
        }
    }

    fn int(&mut self) -> Result<i64, ParseError> {
        match self.peek() {
            Some(Token::Int(n)) => {
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.unexpected("an integer")),
        }
    }

    // Grammar

    fn function(&mut self) -> Result<Function, ParseError> {
        self.keyword("fn")?;
        let Some(Token::Global(name)) = self.peek() else {
            return Err(self.unexpected("a function name like `@f`"));
        };
        self.pos += 1;
        let mut func = Function::new(name);
        let mut scope = Scope::default();

        self.expect(Token::LParen)?;
        if !self.eat(Token::RParen) {
            loop {
                let span = self.span();
                let Some(Token::Local(param)) = self.peek() else {
                    return Err(self.unexpected("a parameter like `%x`"));
                };
                self.pos += 1;
                self.expect(Token::Colon)?;
                let ty = self.ty()?;
                let value = func.add_param(param, ty);
                define(&mut scope, param, value, span)?;
                if self.eat(Token::Comma) {
                    continue;
                }
                self.expect(Token::RParen)?;
                break;
            }
        }

        self.expect(Token::LBrace)?;
        let mut current: Option<BlockId> = None;
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Ident(label)) if self.peek_at(1) == Some(Token::Colon) => {
                    self.pos += 2;
                    current = Some(func.add_block(label));
                }
                Some(_) => {
                    let block = current
                        .ok_or_else(|| self.error("instruction before first block label"))?;
                    self.instruction(&mut func, block, &mut scope)?;
                }
                None => return Err(self.unexpected("`}`")),
            }
        }
        Ok(func)
    }

    fn instruction(
        &mut self,
        func: &mut Function,
        block: BlockId,
        scope: &mut Scope<'s>,
    ) -> Result<(), ParseError> {
        let result = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Local(name)), Some(Token::Eq)) => {
                let span = self.span();
                self.pos += 2;
                Some((name, span))
            }
            _ => None,
        };

        let opcode_span = self.span();
        let opcode = self.ident()?;
        let (inst, ty) = match opcode {
            "add" | "sub" | "mul" => {
                let op = match opcode {
                    "add" => BinOp::Add,
                    "sub" => BinOp::Sub,
                    _ => BinOp::Mul,
                };
                let ty = self.ty()?;
                let lhs = self.value(func, scope)?;
                self.expect(Token::Comma)?;
                let rhs = self.value(func, scope)?;
                (Inst::Binary { op, lhs, rhs }, ty)
            }
            "store" => {
                let value = self.value(func, scope)?;
                self.expect(Token::Comma)?;
                let dest = self.value(func, scope)?;
                (Inst::Store { value, dest }, Type::Void)
            }
            "load" => {
                let ty = self.ty()?;
                let src = self.value(func, scope)?;
                (Inst::Load { src }, ty)
            }
            "alloca" => {
                let ty = self.ty()?;
                (Inst::Alloca { ty }, Type::Ptr)
            }
            "call" => {
                let ty = self.ty()?;
                let callee = match self.peek() {
                    Some(Token::Global(name)) => {
                        self.pos += 1;
                        func.intern(name)
                    }
                    _ => return Err(self.unexpected("a callee like `@f`")),
                };
                self.expect(Token::LParen)?;
                let mut args = SmallVec::new();
                if !self.eat(Token::RParen) {
                    loop {
                        args.push(self.value(func, scope)?);
                        if self.eat(Token::Comma) {
                            continue;
                        }
                        self.expect(Token::RParen)?;
                        break;
                    }
                }
                (Inst::Call { callee, args }, ty)
            }
            "insertelement" => {
                let ty = self.ty()?;
                let vector = self.value(func, scope)?;
                self.expect(Token::Comma)?;
                let element = self.value(func, scope)?;
                self.expect(Token::Comma)?;
                let lane = self.lane()?;
                (
                    Inst::InsertElement {
                        vector,
                        element,
                        lane,
                    },
                    ty,
                )
            }
            "extractelement" => {
                let ty = self.ty()?;
                let vector = self.value(func, scope)?;
                self.expect(Token::Comma)?;
                let lane = self.lane()?;
                (Inst::ExtractElement { vector, lane }, ty.element())
            }
            "ret" => {
                let value = if self.at_value() {
                    Some(self.value(func, scope)?)
                } else {
                    None
                };
                (Inst::Ret { value }, Type::Void)
            }
            other => {
                return Err(ParseError::new(
                    opcode_span,
                    format!("unknown instruction `{other}`"),
                ))
            }
        };

        if result.is_some() && ty == Type::Void {
            return Err(ParseError::new(
                opcode_span,
                format!("`{opcode}` produces no value to name"),
            ));
        }

        let id = Builder::at_end(func, block).emit(inst, ty);
        if let Some((name, span)) = result {
            define(scope, name, Value::Inst(id), span)?;
            func.set_name(id, name);
        }
        Ok(())
    }

    fn at_value(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Local(_) | Token::Global(_) | Token::Int(_) | Token::Ident("splat"))
        )
    }

    fn value(&mut self, func: &mut Function, scope: &Scope<'s>) -> Result<Value, ParseError> {
        let span = self.span();
        match self.peek() {
            Some(Token::Local(name)) => {
                self.pos += 1;
                scope
                    .get(name)
                    .copied()
                    .ok_or_else(|| ParseError::new(span, format!("undefined value `%{name}`")))
            }
            Some(Token::Global(name)) => {
                self.pos += 1;
                Ok(func.global(name))
            }
            Some(Token::Int(n)) => {
                self.pos += 1;
                let n = i32::try_from(n).map_err(|_| {
                    ParseError::new(span, format!("integer literal {n} does not fit in i32"))
                })?;
                Ok(Value::i32(n))
            }
            Some(Token::Ident("splat")) => {
                self.pos += 1;
                let Type::Vector { lanes, bits } = self.ty()? else {
                    return Err(ParseError::new(span, "`splat` needs a vector type"));
                };
                let value = self.int()?;
                Ok(Value::Const(Constant::Splat { lanes, bits, value }))
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn lane(&mut self) -> Result<u32, ParseError> {
        let span = self.span();
        let n = self.int()?;
        u32::try_from(n).map_err(|_| ParseError::new(span, format!("invalid lane index {n}")))
    }

    fn ty(&mut self) -> Result<Type, ParseError> {
        if self.eat(Token::LAngle) {
            let span = self.span();
            let lanes = self.int()?;
            let lanes = u32::try_from(lanes)
                .ok()
                .filter(|&l| l > 0)
                .ok_or_else(|| ParseError::new(span, format!("invalid lane count {lanes}")))?;
            self.keyword("x")?;
            let Type::Int(bits) = self.scalar_ty()? else {
                return Err(self.error("vector lanes must be integers"));
            };
            self.expect(Token::RAngle)?;
            return Ok(Type::Vector { lanes, bits });
        }
        self.scalar_ty()
    }

    fn scalar_ty(&mut self) -> Result<Type, ParseError> {
        let span = self.span();
        let name = self.ident()?;
        match name {
            "void" => Ok(Type::Void),
            "ptr" => Ok(Type::Ptr),
            _ => name
                .strip_prefix('i')
                .and_then(|bits| bits.parse::<u16>().ok())
                .filter(|&bits| bits > 0)
                .map(Type::Int)
                .ok_or_else(|| ParseError::new(span, format!("unknown type `{name}`"))),
        }
    }
}

fn define<'s>(
    scope: &mut Scope<'s>,
    name: &'s str,
    value: Value,
    span: Range<usize>,
) -> Result<(), ParseError> {
    if scope.insert(name, value).is_some() {
        return Err(ParseError::new(span, format!("redefinition of `%{name}`")));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
