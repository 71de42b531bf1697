use crate::error::{Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Program, Vec<Error>> {
        let mut errors = Vec::new();
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            if self.matches(TokenKind::Semicolon) { continue; }
            let pos_before = self.pos;

            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => { errors.push(e); self.recover(); }
            }

            // guarantee progress — if nothing was consumed, force-advance
            // to prevent an infinite loop on unrecognised tokens
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() {
            Ok(Program { stmts })
        } else {
            Err(errors)
        }
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.matches(TokenKind::Semicolon) { continue; }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Let      => self.parse_var_decl(true),
            TokenKind::Var      => self.parse_var_decl(false),
            TokenKind::Func     => self.parse_func_stmt(),
            TokenKind::Struct   => self.parse_struct_decl(),
            TokenKind::Enum     => self.parse_enum_decl(),
            TokenKind::If       => self.parse_if(),
            TokenKind::While    => self.parse_while(),
            TokenKind::Repeat   => self.parse_repeat_while(),
            TokenKind::For      => self.parse_for_in(),
            TokenKind::Return   => self.parse_return(),
            TokenKind::Assert   => self.parse_assert(),
            TokenKind::Break    => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Break(span))
            }
            TokenKind::Continue => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Continue(span))
            }

            // ident followed by a target chain and `=`/`op=` → assignment;
            // anything else → expression statement
            TokenKind::Ident(_) => {
                if let Some(stmt) = self.try_parse_assign()? {
                    Ok(stmt)
                } else {
                    Ok(Stmt::Expr(self.parse_expr()?))
                }
            }

            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_var_decl(&mut self, is_const: bool) -> Result<Stmt, Error> {
        let span = self.span();
        self.advance(); // consume `let` or `var`
        let name = self.expect_ident()?;
        let ty = if self.matches(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let initializer = self.parse_expr()?;
        Ok(Stmt::VarDecl(VarDecl { name, ty, is_const, initializer, span }))
    }

    /// Statement-level `func`. A name makes it a declaration; a bare
    /// signature is an anonymous function in expression position.
    fn parse_func_stmt(&mut self) -> Result<Stmt, Error> {
        if matches!(self.peek_next_kind(), TokenKind::Ident(_)) {
            Ok(Stmt::FuncDecl(self.parse_func_decl()?))
        } else {
            Ok(Stmt::Expr(self.parse_expr()?))
        }
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, Error> {
        let span = self.span();
        self.expect(TokenKind::Func)?;
        let name = match self.peek_kind() {
            TokenKind::Ident(_) => Some(self.expect_ident()?),
            _ => None,
        };
        self.expect(TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(TokenKind::RParen)?;
        let return_ty = if self.matches(TokenKind::Arrow) { Some(self.parse_type()?) } else { None };
        let body = self.parse_block()?;
        Ok(FuncDecl { name, params, return_ty, body, span })
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, Error> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let span = self.span();
            let by_ref = self.matches(TokenKind::Ref);
            let name = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty, by_ref, span });
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(params)
    }

    fn parse_struct_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Struct)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Let => match self.parse_var_decl(true)? {
                    Stmt::VarDecl(f) => fields.push(f),
                    _ => unreachable!(),
                },
                TokenKind::Var => match self.parse_var_decl(false)? {
                    Stmt::VarDecl(f) => fields.push(f),
                    _ => unreachable!(),
                },
                TokenKind::Func => {
                    let m = self.parse_func_decl()?;
                    if m.name.is_none() {
                        return Err(self.err_here(ErrorCode::P001, "struct methods must be named"));
                    }
                    methods.push(m);
                }
                _ => {
                    return Err(self.err_here(ErrorCode::P001,
                        "expected field or method declaration in struct body"));
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::StructDecl(StructDecl { name, fields, methods, span }))
    }

    fn parse_enum_decl(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Enum)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while self.matches(TokenKind::Case) {
            loop {
                let case_name = self.expect_ident()?;
                let raw = if self.matches(TokenKind::Eq) {
                    let span = self.span();
                    match self.advance_kind() {
                        TokenKind::Int(n) => Some(n),
                        _ => {
                            return Err(Error::new(ErrorCode::P001, span.line, span.column,
                                "enum raw value must be an integer literal"));
                        }
                    }
                } else {
                    None
                };
                cases.push((case_name, raw));
                if !self.matches(TokenKind::Comma) { break; }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::EnumDecl(EnumDecl { name, cases, span }))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                // `else if` desugars to a one-statement else block
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If(IfStmt { condition, then_block, else_block, span }))
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While(WhileStmt { condition, body, span }))
    }

    fn parse_repeat_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Repeat)?;
        let body = self.parse_block()?;
        self.expect(TokenKind::While)?;
        let condition = self.parse_expr()?;
        Ok(Stmt::RepeatWhile(RepeatWhileStmt { body, condition, span }))
    }

    fn parse_for_in(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        let name = self.expect_ident()?;
        let pattern = if name == "_" { Pattern::Wildcard } else { Pattern::Name(name) };
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::ForIn(ForInStmt { pattern, iterable, body, span }))
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let value = match self.peek_kind() {
            TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof => None,
            _ => Some(self.parse_expr()?),
        };
        Ok(Stmt::Return(value, span))
    }

    fn parse_assert(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Assert)?;
        let expr = self.parse_expr()?;
        Ok(Stmt::Assert(expr, span))
    }

    // ─── Assignment ──────────────────────────────────────────────────────────

    /// Backtracking probe: parse a target chain and require `=`/`op=` right
    /// after it. On any mismatch the cursor is restored and the caller
    /// re-parses the tokens as an expression.
    fn try_parse_assign(&mut self) -> Result<Option<Stmt>, Error> {
        let start = self.pos;
        let span = self.span();

        let target = match self.parse_target() {
            Ok(t) => t,
            Err(_) => { self.pos = start; return Ok(None); }
        };
        if !self.check(TokenKind::Eq) && !self.peek_kind().is_compound_assign() {
            self.pos = start;
            return Ok(None);
        }
        let op = match self.advance_kind() {
            TokenKind::Eq       => AssignOp::Set,
            TokenKind::PlusEq   => AssignOp::Add,
            TokenKind::MinusEq  => AssignOp::Sub,
            TokenKind::StarEq   => AssignOp::Mul,
            TokenKind::SlashEq  => AssignOp::Div,
            _                   => AssignOp::Mod,
        };
        let value = self.parse_expr()?;
        Ok(Some(Stmt::Assign(AssignStmt { target, op, value, span })))
    }

    fn parse_target(&mut self) -> Result<Target, Error> {
        let span = self.span();
        let name = self.expect_ident()?;
        let mut target = Target::Name(name, span);
        loop {
            if self.matches(TokenKind::Dot) {
                let span = self.span();
                let field = self.expect_ident()?;
                target = Target::Member(Box::new(target), field, span);
            } else if self.matches(TokenKind::LBracket) {
                let span = self.span();
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                target = Target::Index(Box::new(target), Box::new(index), span);
            } else {
                break;
            }
        }
        Ok(target)
    }

    // ─── Expressions (precedence ladder, loosest first) ──────────────────────

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::OrOr) {
            let span = self.span();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::AndAnd) {
            let span = self.span();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_range()?;
        while self.peek_kind().is_comparison() {
            let span = self.span();
            let op = match self.advance_kind() {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                _               => BinOp::GtEq,
            };
            let right = self.parse_range()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_range(&mut self) -> Result<Expr, Error> {
        let lo = self.parse_term()?;
        if !self.peek_kind().is_range_op() {
            return Ok(lo);
        }
        let span = self.span();
        let kind = match self.advance_kind() {
            TokenKind::Until     => RangeKind::Until,
            TokenKind::Through   => RangeKind::Through,
            TokenKind::DownUntil => RangeKind::DownUntil,
            _                    => RangeKind::DownThrough,
        };
        let hi = self.parse_term()?;
        let step = if self.matches(TokenKind::Step) {
            Some(Box::new(self.parse_term()?))
        } else {
            None
        };
        Ok(Expr::Range { lo: Box::new(lo), hi: Box::new(hi), step, kind, span })
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_power()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, Error> {
        let left = self.parse_unary()?;
        if self.check(TokenKind::Caret) {
            let span = self.span();
            self.advance();
            // right-associative: 2 ^ 3 ^ 2 == 2 ^ (3 ^ 2)
            let right = self.parse_power()?;
            return Ok(Expr::Binary { left: Box::new(left), op: BinOp::Pow, right: Box::new(right), span });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        match self.peek_kind() {
            TokenKind::Minus => {
                let span = self.span();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary { op: UnOp::Neg, operand: Box::new(operand), span })
            }
            TokenKind::Bang => {
                let span = self.span();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary { op: UnOp::Not, operand: Box::new(operand), span })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(TokenKind::Dot) {
                let span = self.span();
                let name = self.expect_ident()?;
                if self.check(TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(TokenKind::RParen)?;
                    expr = Expr::MethodCall { recv: Box::new(expr), method: name, args, span };
                } else {
                    expr = Expr::Member { recv: Box::new(expr), name, span };
                }
            } else if self.matches(TokenKind::LBracket) {
                let span = self.span();
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index { recv: Box::new(expr), index: Box::new(index), span };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Int(n)       => { self.advance(); Ok(Expr::Int(n, span)) }
            TokenKind::Double(v)    => { self.advance(); Ok(Expr::Double(v, span)) }
            TokenKind::Bool(b)      => { self.advance(); Ok(Expr::Bool(b, span)) }
            TokenKind::CharLit(c)   => { self.advance(); Ok(Expr::Char(c, span)) }
            TokenKind::StringLit(_) => {
                match self.advance_kind() {
                    TokenKind::StringLit(s) => Ok(Expr::Str(s, span)),
                    _ => unreachable!(),
                }
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident()?;
                if self.check(TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Call { callee: name, args, span })
                } else {
                    Ok(Expr::Ident(name, span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenKind::RBracket) && !self.is_at_end() {
                    items.push(self.parse_expr()?);
                    if !self.matches(TokenKind::Comma) { break; }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::Array(items, span))
            }
            TokenKind::Func => {
                let func = self.parse_func_decl()?;
                Ok(Expr::Func(Box::new(func)))
            }
            other => Err(Error::new(ErrorCode::P001, span.line, span.column,
                format!("unexpected token {other:?} in expression"))),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, Error> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            // `name: expr` is a labeled argument (struct construction)
            let label = if matches!(self.peek_kind(), TokenKind::Ident(_))
                && self.peek_next_kind() == TokenKind::Colon
            {
                let l = self.expect_ident()?;
                self.advance(); // colon
                Some(l)
            } else {
                None
            };
            let value = self.parse_expr()?;
            args.push(Arg { label, value });
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(args)
    }

    // ─── Types ───────────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<Type, Error> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::LBracket => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                Ok(Type::Array(Some(Box::new(inner))))
            }
            TokenKind::Ident(_) => {
                let name = self.expect_ident()?;
                match name.as_str() {
                    "Int"       => Ok(Type::Int),
                    "Double"    => Ok(Type::Double),
                    "Character" => Ok(Type::Character),
                    "String"    => Ok(Type::Str),
                    "Bool"      => Ok(Type::Bool),
                    "Void"      => Ok(Type::Void),
                    "Function"  => Ok(Type::Function),
                    "Struct"    => Ok(Type::Struct),
                    "Enum"      => Ok(Type::Enum),
                    "Array"     => Ok(Type::Array(None)),
                    other => Err(Error::new(ErrorCode::P001, span.line, span.column,
                        format!("unsupported type `{other}`"))),
                }
            }
            other => Err(Error::new(ErrorCode::P002, span.line, span.column,
                format!("expected type annotation, got {other:?}"))),
        }
    }

    // ─── Cursor helpers ──────────────────────────────────────────────────────

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_kind(&self) -> TokenKind {
        if self.pos + 1 < self.tokens.len() {
            self.tokens[self.pos + 1].kind.clone()
        } else {
            TokenKind::Eof
        }
    }

    fn span(&self) -> Span {
        let t = &self.tokens[self.pos];
        Span::new(t.line, t.column)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        t
    }

    fn advance_kind(&mut self) -> TokenKind {
        let kind = self.peek_kind();
        self.advance();
        kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), Error> {
        if self.check(kind.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(self.err_here(ErrorCode::P002, format!("expected {kind:?}, got {:?}", self.peek_kind())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        match self.peek_kind() {
            TokenKind::Ident(name) => { self.advance(); Ok(name) }
            other => Err(self.err_here(ErrorCode::P002, format!("expected identifier, got {other:?}"))),
        }
    }

    fn err_here(&self, code: ErrorCode, message: impl Into<String>) -> Error {
        let t = &self.tokens[self.pos];
        Error::new(code, t.line, t.column, message)
    }

    /// Skip ahead to the next plausible statement start after a parse error.
    fn recover(&mut self) {
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Let | TokenKind::Var | TokenKind::Func | TokenKind::Struct
                | TokenKind::Enum | TokenKind::If | TokenKind::While | TokenKind::Repeat
                | TokenKind::For | TokenKind::Break | TokenKind::Continue
                | TokenKind::Return | TokenKind::Assert | TokenKind::RBrace => break,
                _ => { self.advance(); }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_or_else(|e| panic!("parse failed: {e:#?}"))
    }

    fn parse_err(src: &str) -> Vec<Error> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    #[test]
    fn let_declaration() {
        let p = parse("let x = 1");
        assert_eq!(p.stmts.len(), 1);
        match &p.stmts[0] {
            Stmt::VarDecl(d) => {
                assert_eq!(d.name, "x");
                assert!(d.is_const);
                assert!(d.ty.is_none());
            }
            other => panic!("expected VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn var_declaration_with_type() {
        let p = parse("var xs: [Int] = [1, 2]");
        match &p.stmts[0] {
            Stmt::VarDecl(d) => {
                assert!(!d.is_const);
                assert_eq!(d.ty, Some(Type::Array(Some(Box::new(Type::Int)))));
            }
            other => panic!("expected VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn precedence_mul_before_add() {
        let p = parse("let x = 1 + 2 * 3");
        match &p.stmts[0] {
            Stmt::VarDecl(d) => match &d.initializer {
                Expr::Binary { op: BinOp::Add, right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected Add at root, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let p = parse("let x = 2 ^ 3 ^ 2");
        match &p.stmts[0] {
            Stmt::VarDecl(d) => match &d.initializer {
                Expr::Binary { op: BinOp::Pow, right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: BinOp::Pow, .. }));
                }
                other => panic!("expected Pow at root, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn simple_assignment() {
        let p = parse("x = 3");
        match &p.stmts[0] {
            Stmt::Assign(a) => {
                assert!(matches!(a.target, Target::Name(ref n, _) if n == "x"));
                assert_eq!(a.op, AssignOp::Set);
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn compound_assignment() {
        let p = parse("x += 2");
        match &p.stmts[0] {
            Stmt::Assign(a) => assert_eq!(a.op, AssignOp::Add),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn member_and_index_assignment() {
        let p = parse("s.field = 1\n a[0] = 2\n T.prototype.m = 3");
        assert!(matches!(&p.stmts[0], Stmt::Assign(a) if matches!(a.target, Target::Member(..))));
        assert!(matches!(&p.stmts[1], Stmt::Assign(a) if matches!(a.target, Target::Index(..))));
        match &p.stmts[2] {
            Stmt::Assign(a) => match &a.target {
                Target::Member(inner, name, _) => {
                    assert_eq!(name, "m");
                    assert!(matches!(**inner, Target::Member(_, ref p, _) if p == "prototype"));
                }
                other => panic!("expected nested Member target, got {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn method_call_is_not_an_assignment() {
        let p = parse("p.size()");
        assert!(matches!(&p.stmts[0], Stmt::Expr(Expr::MethodCall { .. })));
    }

    #[test]
    fn function_declaration() {
        let p = parse("func add(a: Int, ref b: Int) -> Int { return a + b }");
        match &p.stmts[0] {
            Stmt::FuncDecl(f) => {
                assert_eq!(f.name.as_deref(), Some("add"));
                assert_eq!(f.params.len(), 2);
                assert!(!f.params[0].by_ref);
                assert!(f.params[1].by_ref);
                assert_eq!(f.return_ty, Some(Type::Int));
                assert_eq!(f.body.len(), 1);
            }
            other => panic!("expected FuncDecl, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_function_expression() {
        let p = parse("let f = func (a: Int) -> Int { return a }");
        match &p.stmts[0] {
            Stmt::VarDecl(d) => assert!(matches!(&d.initializer, Expr::Func(f) if f.name.is_none())),
            other => panic!("expected VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn struct_declaration() {
        let p = parse("struct Point { var x = 0 var y = 0 func sum() -> Int { return 0 } }");
        match &p.stmts[0] {
            Stmt::StructDecl(s) => {
                assert_eq!(s.name, "Point");
                assert_eq!(s.fields.len(), 2);
                assert_eq!(s.methods.len(), 1);
            }
            other => panic!("expected StructDecl, got {other:?}"),
        }
    }

    #[test]
    fn enum_declaration() {
        let p = parse("enum Color { case red, green = 4, blue }");
        match &p.stmts[0] {
            Stmt::EnumDecl(e) => {
                assert_eq!(e.name, "Color");
                assert_eq!(e.cases, vec![
                    ("red".into(), None),
                    ("green".into(), Some(4)),
                    ("blue".into(), None),
                ]);
            }
            other => panic!("expected EnumDecl, got {other:?}"),
        }
    }

    #[test]
    fn range_with_step() {
        let p = parse("for i in 0 until 10 step 2 { }");
        match &p.stmts[0] {
            Stmt::ForIn(f) => {
                assert_eq!(f.pattern, Pattern::Name("i".into()));
                assert!(matches!(&f.iterable,
                    Expr::Range { kind: RangeKind::Until, step: Some(_), .. }));
            }
            other => panic!("expected ForIn, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_for_pattern() {
        let p = parse("for _ in 0 through 3 { }");
        match &p.stmts[0] {
            Stmt::ForIn(f) => assert_eq!(f.pattern, Pattern::Wildcard),
            other => panic!("expected ForIn, got {other:?}"),
        }
    }

    #[test]
    fn repeat_while() {
        let p = parse("repeat { x = x + 1 } while x < 3");
        assert!(matches!(&p.stmts[0], Stmt::RepeatWhile(_)));
    }

    #[test]
    fn else_if_chain() {
        let p = parse("if a { } else if b { } else { }");
        match &p.stmts[0] {
            Stmt::If(i) => {
                let else_block = i.else_block.as_ref().unwrap();
                assert!(matches!(&else_block[0], Stmt::If(inner) if inner.else_block.is_some()));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn labeled_call_arguments() {
        let p = parse("Point(x: 1, y: 2)");
        match &p.stmts[0] {
            Stmt::Expr(Expr::Call { callee, args, .. }) => {
                assert_eq!(callee, "Point");
                assert_eq!(args[0].label.as_deref(), Some("x"));
                assert_eq!(args[1].label.as_deref(), Some("y"));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn bare_return() {
        let p = parse("func f() { return }");
        match &p.stmts[0] {
            Stmt::FuncDecl(f) => assert!(matches!(f.body[0], Stmt::Return(None, _))),
            other => panic!("expected FuncDecl, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let errs = parse_err("let x: Float = 1");
        assert_eq!(errs[0].code, ErrorCode::P001);
    }

    #[test]
    fn recovery_reports_multiple_errors() {
        let errs = parse_err("let = 1\nlet = 2");
        assert_eq!(errs.len(), 2);
    }
}
