//! Pratt-style expression parser plus the rule/module grammar (spec.md §4.2).

use crate::{
    ast::*,
    error::{Error, ErrorKind},
    lexer::Lexer,
    location::Location,
    token::{Token, TokenKind},
    value::Number,
};

pub fn parse(source: &str) -> Result<Module, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_module()
}

/// Binding power of a binary operator token, low→high, per spec.md §4.2:
/// OR, AND, equality/unify, comparison, additive, multiplicative.
fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8, BinOp)> {
    Some(match kind {
        TokenKind::Pipe => (1, 2, BinOp::Or),
        TokenKind::Amp => (3, 4, BinOp::And),
        TokenKind::Eq => (5, 6, BinOp::Eq),
        TokenKind::Ne => (5, 6, BinOp::Ne),
        TokenKind::Unify => (5, 6, BinOp::Unify),
        TokenKind::Assign => (5, 6, BinOp::Assign),
        TokenKind::Lt => (7, 8, BinOp::Lt),
        TokenKind::Le => (7, 8, BinOp::Le),
        TokenKind::Gt => (7, 8, BinOp::Gt),
        TokenKind::Ge => (7, 8, BinOp::Ge),
        // `in` as a standalone membership test (`x in collection`), distinct
        // from the `some x in collection` / `every x in collection` grammar
        // forms, which consume their own `In` token directly and never reach
        // the Pratt loop.
        TokenKind::In => (7, 8, BinOp::In),
        TokenKind::Plus => (9, 10, BinOp::Add),
        TokenKind::Minus => (9, 10, BinOp::Sub),
        TokenKind::Star => (11, 12, BinOp::Mul),
        TokenKind::Slash => (11, 12, BinOp::Div),
        TokenKind::Percent => (11, 12, BinOp::Mod),
        _ => return None,
    })
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<Error>,
}

type PResult<T> = Result<T, Error>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, errors: Vec::new() }
    }

    // ---- token stream helpers -------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_loc(&self) -> Location {
        self.tokens[self.pos.min(self.tokens.len() - 1)].location
    }

    fn peek_at(&self, mut offset: usize) -> &TokenKind {
        // Skips newlines when looking ahead, since most lookahead decisions
        // (e.g. "is `:` next") don't care about intervening blank lines.
        let mut idx = self.pos;
        loop {
            if idx >= self.tokens.len() {
                return &TokenKind::Eof;
            }
            if matches!(self.tokens[idx].kind, TokenKind::Newline) {
                idx += 1;
                continue;
            }
            if offset == 0 {
                return &self.tokens[idx].kind;
            }
            offset -= 1;
            idx += 1;
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().describe();
            Err(Error::parser(format!("expected {context}, found `{found}`"), self.peek_loc()))
        }
    }

    fn err_here(&self, message: impl Into<String>) -> Error {
        Error::parser(message, self.peek_loc())
    }

    // ---- module / statements ---------------------------------------------------

    pub fn parse_module(mut self) -> PResult<Module> {
        self.skip_separators();
        let module_loc = self.peek_loc();
        self.expect(&TokenKind::Package, "`package`")?;
        let package_path = self.parse_dotted_path()?;
        self.end_statement()?;

        let mut imports = Vec::new();
        let mut rules = Vec::new();

        self.skip_separators();
        while !matches!(self.peek(), TokenKind::Eof) {
            let result = if matches!(self.peek(), TokenKind::Import) {
                self.parse_import().map(|i| imports.push(i))
            } else {
                self.parse_rule().map(|r| rules.push(r))
            };
            if let Err(e) = result {
                self.record_and_recover(e);
            }
            self.skip_separators();
        }

        if let Some(first) = self.errors.first() {
            return Err(first.clone());
        }

        Ok(Module { package_path, imports, rules, location: module_loc })
    }

    /// Error recovery (spec.md §4.2): record the error, advance to the next
    /// statement boundary, and keep parsing so later errors don't shift the
    /// reported position.
    fn record_and_recover(&mut self, error: Error) {
        self.errors.push(error);
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn end_statement(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => {
                self.advance();
                Ok(())
            }
            other => Err(self.err_here(format!("expected end of statement, found `{}`", other.describe()))),
        }
    }

    fn parse_dotted_path(&mut self) -> PResult<Vec<String>> {
        let mut segments = vec![self.parse_ident_name()?];
        while self.eat(&TokenKind::Dot) {
            segments.push(self.parse_ident_name()?);
        }
        Ok(segments)
    }

    fn parse_ident_name(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::Data => {
                self.advance();
                Ok("data".into())
            }
            TokenKind::Input => {
                self.advance();
                Ok("input".into())
            }
            other => Err(self.err_here(format!("expected identifier, found `{}`", other.describe()))),
        }
    }

    fn parse_import(&mut self) -> PResult<Import> {
        let loc = self.peek_loc();
        self.expect(&TokenKind::Import, "`import`")?;
        let path = self.parse_dotted_path()?.join(".");
        let alias = if self.eat(&TokenKind::As) { Some(self.parse_ident_name()?) } else { None };
        self.end_statement()?;
        Ok(Import { path, alias, location: loc })
    }

    // ---- rules ------------------------------------------------------------------

    fn parse_rule(&mut self) -> PResult<Rule> {
        let loc = self.peek_loc();
        let is_default = self.eat(&TokenKind::Default);
        let name = self.parse_ident_name()?;

        // Function head: name(args)
        if matches!(self.peek(), TokenKind::LParen) {
            return self.parse_function_rule(name, is_default, loc);
        }

        // Partial set/object head: name[key] or name[key] := value or name contains term
        if matches!(self.peek(), TokenKind::LBracket) {
            return self.parse_bracket_rule(name, loc);
        }
        if matches!(self.peek(), TokenKind::Contains) {
            self.advance();
            let term = self.parse_expr()?;
            let body = self.parse_optional_if_or_brace_body()?;
            let else_clauses = self.parse_else_clauses()?;
            self.end_statement_or_brace_close()?;
            return Ok(Rule {
                name,
                head: RuleHead::PartialSet { term },
                body,
                is_default: false,
                else_clauses,
                location: loc,
            });
        }

        // Complete rule: name := expr | name = expr | name if body | name { body }
        if matches!(self.peek(), TokenKind::Assign | TokenKind::Unify) {
            self.advance();
            let value = self.parse_expr()?;
            if is_default {
                if !value.is_ground() {
                    return Err(Error::compilation(format!(
                        "default value for `{name}` must be ground (no references, variables, or calls)"
                    ))
                    .with_location(value.location())
                    .with_rule(name));
                }
                self.end_statement()?;
                return Ok(Rule {
                    name,
                    head: RuleHead::Complete { value: Some(value) },
                    body: None,
                    is_default: true,
                    else_clauses: Vec::new(),
                    location: loc,
                });
            }
            let body = self.parse_optional_if_body()?;
            let else_clauses = self.parse_else_clauses()?;
            self.end_statement()?;
            return Ok(Rule {
                name,
                head: RuleHead::Complete { value: Some(value) },
                body,
                is_default: false,
                else_clauses,
                location: loc,
            });
        }

        if matches!(self.peek(), TokenKind::If) || matches!(self.peek(), TokenKind::LBrace) {
            let body = self.parse_optional_if_or_brace_body()?;
            let else_clauses = self.parse_else_clauses()?;
            self.end_statement_or_brace_close()?;
            return Ok(Rule {
                name,
                head: RuleHead::Complete { value: None },
                body,
                is_default: false,
                else_clauses,
                location: loc,
            });
        }

        // Bare `name` with no body: complete rule defaulting to `true`.
        self.end_statement()?;
        Ok(Rule {
            name,
            head: RuleHead::Complete { value: None },
            body: None,
            is_default: false,
            else_clauses: Vec::new(),
            location: loc,
        })
    }

    fn parse_function_rule(&mut self, name: String, is_default: bool, loc: Location) -> PResult<Rule> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "`)`")?;
        let value = if self.eat(&TokenKind::Assign) || self.eat(&TokenKind::Unify) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let body = self.parse_optional_if_or_brace_body()?;
        let else_clauses = self.parse_else_clauses()?;
        if body.is_some() {
            self.end_statement_or_brace_close()?;
        } else {
            self.end_statement()?;
        }
        Ok(Rule {
            name,
            head: RuleHead::Function { args, value },
            body,
            is_default,
            else_clauses,
            location: loc,
        })
    }

    fn parse_bracket_rule(&mut self, name: String, loc: Location) -> PResult<Rule> {
        self.expect(&TokenKind::LBracket, "`[`")?;
        let key = self.parse_expr()?;
        self.expect(&TokenKind::RBracket, "`]`")?;
        if self.eat(&TokenKind::Assign) || self.eat(&TokenKind::Unify) {
            let value = self.parse_expr()?;
            let nested = false;
            let body = self.parse_optional_if_or_brace_body()?;
            let else_clauses = self.parse_else_clauses()?;
            if body.is_some() {
                self.end_statement_or_brace_close()?;
            } else {
                self.end_statement()?;
            }
            return Ok(Rule {
                name,
                head: RuleHead::PartialObject { key, value, nested },
                body,
                is_default: false,
                else_clauses,
                location: loc,
            });
        }
        let body = self.parse_optional_if_or_brace_body()?;
        let else_clauses = self.parse_else_clauses()?;
        self.end_statement_or_brace_close()?;
        Ok(Rule { name, head: RuleHead::PartialSet { term: key }, body, is_default: false, else_clauses, location: loc })
    }

    /// `if { ... }` (braced body follows `if`) or no body at all.
    fn parse_optional_if_body(&mut self) -> PResult<Option<Vec<BodyLiteral>>> {
        if self.eat(&TokenKind::If) {
            Ok(Some(self.parse_brace_body()?))
        } else {
            Ok(None)
        }
    }

    /// `if { ... }`, or a bare `{ ... }` directly after the head.
    fn parse_optional_if_or_brace_body(&mut self) -> PResult<Option<Vec<BodyLiteral>>> {
        if self.eat(&TokenKind::If) {
            Ok(Some(self.parse_brace_body()?))
        } else if matches!(self.peek(), TokenKind::LBrace) {
            Ok(Some(self.parse_brace_body()?))
        } else {
            Ok(None)
        }
    }

    fn parse_brace_body(&mut self) -> PResult<Vec<BodyLiteral>> {
        self.expect(&TokenKind::LBrace, "`{`")?;
        self.skip_separators();
        let mut literals = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            literals.push(self.parse_body_literal()?);
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(literals)
    }

    fn parse_else_clauses(&mut self) -> PResult<Vec<ElseClause>> {
        let mut clauses = Vec::new();
        loop {
            self.skip_newlines();
            if !matches!(self.peek(), TokenKind::Else) {
                break;
            }
            let loc = self.peek_loc();
            self.advance();
            if self.eat(&TokenKind::Assign) || self.eat(&TokenKind::Unify) {
                let value = self.parse_expr()?;
                let body = self.parse_optional_if_body()?;
                clauses.push(ElseClause { value: Some(value), body, location: loc });
            } else {
                let body = self.parse_optional_if_or_brace_body()?;
                clauses.push(ElseClause { value: None, body, location: loc });
            }
        }
        Ok(clauses)
    }

    fn end_statement_or_brace_close(&mut self) -> PResult<()> {
        // After a `{ ... }` or trailing `else` chain, what remains is just a
        // normal statement separator (or EOF/next statement).
        match self.peek() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => {
                self.advance();
                Ok(())
            }
            _ => Ok(()), // tolerate `}` immediately followed by next rule on its own line
        }
    }

    // ---- body literals ------------------------------------------------------------

    fn parse_body_literal(&mut self) -> PResult<BodyLiteral> {
        if matches!(self.peek(), TokenKind::Some) {
            return self.parse_some_decl().map(BodyLiteral::Some);
        }
        let loc = self.peek_loc();
        let negated = self.eat(&TokenKind::Not);
        let expr = self.parse_expr()?;
        let with_mods = self.parse_with_modifiers()?;
        Ok(BodyLiteral::Expr { expr, negated, with_mods, location: loc })
    }

    fn parse_some_decl(&mut self) -> PResult<SomeDecl> {
        let loc = self.peek_loc();
        self.expect(&TokenKind::Some, "`some`")?;
        let mut variables = vec![self.parse_ident_name()?];
        while self.eat(&TokenKind::Comma) {
            variables.push(self.parse_ident_name()?);
        }
        let collection = if self.eat(&TokenKind::In) { Some(self.parse_expr()?) } else { None };
        Ok(SomeDecl { variables, collection, location: loc })
    }

    fn parse_with_modifiers(&mut self) -> PResult<Vec<WithModifier>> {
        let mut mods = Vec::new();
        while matches!(self.peek_at(0), TokenKind::With) {
            let loc = self.peek_loc();
            self.advance();
            let target = self.parse_postfix_ref_only()?;
            self.expect(&TokenKind::As, "`as`")?;
            let value = self.parse_expr()?;
            mods.push(WithModifier { target, value, location: loc });
        }
        Ok(mods)
    }

    /// The target of a `with` modifier is always a reference/name, never a
    /// general expression.
    fn parse_postfix_ref_only(&mut self) -> PResult<Expr> {
        self.parse_unary()
    }

    // ---- expressions (Pratt) -------------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_newlines_if_operator_follows();
            let Some((lbp, rbp, op)) = infix_binding_power(self.peek()) else { break };
            if lbp < min_bp {
                break;
            }
            let loc = self.peek_loc();
            self.advance();
            self.skip_newlines();
            let right = self.parse_expr_bp(rbp)?;
            left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right), location: loc };
        }
        Ok(left)
    }

    /// Looks past a newline to see if it's followed by an infix operator
    /// (policies routinely wrap long expressions across lines).
    fn skip_newlines_if_operator_follows(&mut self) {
        if !matches!(self.peek(), TokenKind::Newline) {
            return;
        }
        let mut idx = self.pos;
        while idx < self.tokens.len() && matches!(self.tokens[idx].kind, TokenKind::Newline) {
            idx += 1;
        }
        if idx < self.tokens.len() && infix_binding_power(&self.tokens[idx].kind).is_some() {
            self.pos = idx;
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let loc = self.peek_loc();
        if self.eat(&TokenKind::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp { op: UnOp::Not, operand: Box::new(operand), location: loc });
        }
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp { op: UnOp::Neg, operand: Box::new(operand), location: loc });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    let loc = self.peek_loc();
                    self.advance();
                    let name = self.parse_ident_name()?;
                    expr = extend_reference(expr, RefArg::Dot(name), loc);
                }
                TokenKind::LBracket => {
                    let loc = self.peek_loc();
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket, "`]`")?;
                    expr = extend_reference(expr, RefArg::Bracket(index), loc);
                }
                TokenKind::LParen => {
                    let loc = self.peek_loc();
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "`)`")?;
                    let name = expr_to_call_name(expr)?;
                    expr = Expr::Call { name, args, location: loc };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let loc = self.peek_loc();
        match self.peek().clone() {
            TokenKind::Number { value, is_int } => {
                self.advance();
                let number = if is_int { Number::Int(value as i64) } else { Number::Float(value) };
                Ok(Expr::Const(Const::Number(number), loc))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Const(Const::String(s), loc))
            }
            TokenKind::RawString(s) => {
                self.advance();
                Ok(Expr::Const(Const::String(s), loc))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Const(Const::Bool(true), loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Const(Const::Bool(false), loc))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Const(Const::Null, loc))
            }
            TokenKind::Underscore => {
                self.advance();
                Ok(Expr::Variable("_".into(), loc))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Variable(name, loc))
            }
            TokenKind::Input => {
                self.advance();
                Ok(Expr::Variable("input".into(), loc))
            }
            TokenKind::Data => {
                self.advance();
                Ok(Expr::Variable("data".into(), loc))
            }
            TokenKind::Every => self.parse_every(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_or_comprehension(loc),
            TokenKind::LBrace => self.parse_brace_literal(loc),
            other => Err(self.err_here(format!("unexpected token `{}` in expression", other.describe()))),
        }
    }

    fn parse_every(&mut self) -> PResult<Expr> {
        let loc = self.peek_loc();
        self.expect(&TokenKind::Every, "`every`")?;
        let first = self.parse_ident_name()?;
        let (key_var, value_var) = if self.eat(&TokenKind::Comma) {
            (Some(first), self.parse_ident_name()?)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::In, "`in`")?;
        let domain = self.parse_expr()?;
        let body = self.parse_brace_body()?;
        Ok(Expr::Every { key_var, value_var, domain: Box::new(domain), body, location: loc })
    }

    /// Array literal vs array comprehension: `[term | body]` vs `[e, e, ...]`.
    fn parse_array_or_comprehension(&mut self, loc: Location) -> PResult<Expr> {
        self.expect(&TokenKind::LBracket, "`[`")?;
        self.skip_newlines();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::ArrayLiteral(Vec::new(), loc));
        }
        let first = self.parse_expr()?;
        self.skip_newlines();
        if self.eat(&TokenKind::Pipe) {
            let body = self.parse_comprehension_body()?;
            self.expect(&TokenKind::RBracket, "`]`")?;
            return Ok(Expr::ArrayComprehension { term: Box::new(first), body, location: loc });
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expr()?);
            self.skip_newlines();
        }
        self.skip_newlines();
        self.expect(&TokenKind::RBracket, "`]`")?;
        Ok(Expr::ArrayLiteral(items, loc))
    }

    /// Braced literal disambiguation (spec.md §4.2): empty set, object /
    /// object-comprehension (`:` then optional `|`), set-comprehension
    /// (`|` after one term), or plain set literal.
    fn parse_brace_literal(&mut self, loc: Location) -> PResult<Expr> {
        self.expect(&TokenKind::LBrace, "`{`")?;
        self.skip_newlines();
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::SetLiteral(Vec::new(), loc));
        }
        let first = self.parse_expr()?;
        self.skip_newlines();

        if self.eat(&TokenKind::Colon) {
            self.skip_newlines();
            let value = self.parse_expr()?;
            self.skip_newlines();
            if self.eat(&TokenKind::Pipe) {
                let body = self.parse_comprehension_body()?;
                self.expect(&TokenKind::RBrace, "`}`")?;
                return Ok(Expr::ObjectComprehension {
                    key: Box::new(first),
                    value: Box::new(value),
                    body,
                    location: loc,
                });
            }
            let mut pairs = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                self.skip_newlines();
                if matches!(self.peek(), TokenKind::RBrace) {
                    break;
                }
                let k = self.parse_expr()?;
                self.expect(&TokenKind::Colon, "`:`")?;
                let v = self.parse_expr()?;
                pairs.push((k, v));
                self.skip_newlines();
            }
            self.skip_newlines();
            self.expect(&TokenKind::RBrace, "`}`")?;
            return Ok(Expr::ObjectLiteral(pairs, loc));
        }

        if self.eat(&TokenKind::Pipe) {
            let body = self.parse_comprehension_body()?;
            self.expect(&TokenKind::RBrace, "`}`")?;
            return Ok(Expr::SetComprehension { term: Box::new(first), body, location: loc });
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_expr()?);
            self.skip_newlines();
        }
        self.skip_newlines();
        self.expect(&TokenKind::RBrace, "`}`")?;
        Ok(Expr::SetLiteral(items, loc))
    }

    fn parse_comprehension_body(&mut self) -> PResult<Vec<BodyLiteral>> {
        self.skip_newlines();
        let mut literals = vec![self.parse_body_literal()?];
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::Semicolon) {
                self.advance();
                self.skip_newlines();
                literals.push(self.parse_body_literal()?);
                continue;
            }
            break;
        }
        Ok(literals)
    }
}

fn extend_reference(base: Expr, arg: RefArg, fallback_loc: Location) -> Expr {
    match base {
        Expr::Reference { base, mut path, location } => {
            path.push(arg);
            Expr::Reference { base, path, location }
        }
        other => {
            let loc = other.location();
            Expr::Reference { base: Box::new(other), path: vec![arg], location: if loc == Location::synthetic() { fallback_loc } else { loc } }
        }
    }
}

fn expr_to_call_name(expr: Expr) -> PResult<CallName> {
    match expr {
        Expr::Variable(name, _) => Ok(CallName::Bare(name)),
        Expr::Reference { .. } => Ok(CallName::Ref(Box::new(expr))),
        other => Err(Error::parser("call target must be a name or reference", other.location())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_allow_module() {
        let src = "package example\ndefault allow := false\nallow if { input.user == \"admin\" }";
        let module = parse(src).unwrap();
        assert_eq!(module.package_path, vec!["example".to_string()]);
        assert_eq!(module.rules.len(), 2);
        assert!(module.rules[0].is_default);
    }

    #[test]
    fn parses_array_comprehension() {
        let src = "package p\nxs := [x | x := data.items[_]; x > 1]";
        let module = parse(src).unwrap();
        assert_eq!(module.rules.len(), 1);
        match &module.rules[0].head {
            RuleHead::Complete { value: Some(Expr::ArrayComprehension { body, .. }) } => {
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected head: {other:?}"),
        }
    }

    #[test]
    fn parses_partial_object_rule() {
        let src = "package p\nusers[\"a\"] := 1";
        let module = parse(src).unwrap();
        assert!(matches!(module.rules[0].head, RuleHead::PartialObject { .. }));
    }

    #[test]
    fn parses_with_modifier_chain() {
        let src = "package p\nok { count([1, 2, 3]) == 6 with count as sum }";
        let module = parse(src).unwrap();
        let body = module.rules[0].body.as_ref().unwrap();
        match &body[0] {
            BodyLiteral::Expr { with_mods, .. } => assert_eq!(with_mods.len(), 1),
            other => panic!("unexpected literal: {other:?}"),
        }
    }

    #[test]
    fn parses_every_quantifier() {
        let src = "package p\nok { every x in [1, 2, 3] { x > 0 } }";
        let module = parse(src).unwrap();
        let body = module.rules[0].body.as_ref().unwrap();
        assert!(matches!(body[0], BodyLiteral::Expr { expr: Expr::Every { .. }, .. }));
    }

    #[test]
    fn parses_some_with_collection() {
        let src = "package p\nfound { some k; input[k] == \"target\" }";
        let module = parse(src).unwrap();
        let body = module.rules[0].body.as_ref().unwrap();
        assert!(matches!(body[0], BodyLiteral::Some(_)));
    }

    #[test]
    fn rejects_unterminated_rule_gracefully() {
        let src = "package p\nallow {";
        assert!(parse(src).is_err());
    }
}
