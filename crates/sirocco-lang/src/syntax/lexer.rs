use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(Some(tok)) => tokens.push(tok),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => {
                if self.peek() == b'=' { self.advance(); TokenKind::PlusEq }
                else { TokenKind::Plus }
            }
            b'*' => {
                if self.peek() == b'=' { self.advance(); TokenKind::StarEq }
                else { TokenKind::Star }
            }
            b'%' => {
                if self.peek() == b'=' { self.advance(); TokenKind::PercentEq }
                else { TokenKind::Percent }
            }
            b'^' => TokenKind::Caret,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            b'-' => {
                if self.peek() == b'>' { self.advance(); TokenKind::Arrow }
                else if self.peek() == b'=' { self.advance(); TokenKind::MinusEq }
                else { TokenKind::Minus }
            }
            b'/' => {
                if self.peek() == b'/' { self.skip_line(); return Ok(None); }
                else if self.peek() == b'*' { self.skip_block_comment(); return Ok(None); }
                else if self.peek() == b'=' { self.advance(); TokenKind::SlashEq }
                else { TokenKind::Slash }
            }
            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Bang }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }
            b'&' => {
                if self.peek() == b'&' { self.advance(); TokenKind::AndAnd }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `&&`, bare `&` is not valid"));
                }
            }
            b'|' => {
                if self.peek() == b'|' { self.advance(); TokenKind::OrOr }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `||`, bare `|` is not valid"));
                }
            }

            b'"' => TokenKind::StringLit(self.read_string(line, col)?),
            b'\'' => TokenKind::CharLit(self.read_char(line, col)?),
            b'0'..=b'9' => self.read_number(ch),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_ident(self.read_ident(ch)),

            other => {
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other as char)));
            }
        };

        Ok(Some(Token::new(kind, line, col)))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // consume *
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance(); // *
                self.advance(); // /
                break;
            }
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_string(&mut self, start_line: usize, start_col: usize) -> Result<String, Error> {
        let mut s = String::new();
        let mut error: Option<Error> = None;
        loop {
            if self.is_at_end() || self.peek() == b'\n' {
                return Err(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
            }
            let ch = self.advance();
            if ch == b'"' { break; }
            if ch == b'\\' {
                let esc_line = self.line;
                let esc_col  = self.column;
                match self.advance() {
                    b'n'  => s.push('\n'),
                    b't'  => s.push('\t'),
                    b'"'  => s.push('"'),
                    b'\'' => s.push('\''),
                    b'\\' => s.push('\\'),
                    other => {
                        // Record the first escape error but keep consuming so we
                        // don't produce cascading errors from the remainder of the string.
                        if error.is_none() {
                            error = Some(Error::new(ErrorCode::L003, esc_line, esc_col,
                                format!("unknown escape sequence `\\{}`", other as char)));
                        }
                    }
                }
            } else {
                s.push(ch as char);
            }
        }
        if let Some(e) = error { return Err(e); }
        Ok(s)
    }

    fn read_char(&mut self, start_line: usize, start_col: usize) -> Result<char, Error> {
        if self.is_at_end() {
            return Err(Error::new(ErrorCode::L004, start_line, start_col,
                "unterminated character literal"));
        }
        let ch = match self.advance() {
            b'\\' => match self.advance() {
                b'n'  => '\n',
                b't'  => '\t',
                b'\'' => '\'',
                b'"'  => '"',
                b'\\' => '\\',
                other => {
                    return Err(Error::new(ErrorCode::L003, start_line, start_col,
                        format!("unknown escape sequence `\\{}`", other as char)));
                }
            },
            b'\'' => {
                return Err(Error::new(ErrorCode::L004, start_line, start_col,
                    "empty character literal"));
            }
            other => other as char,
        };
        if self.is_at_end() || self.advance() != b'\'' {
            return Err(Error::new(ErrorCode::L004, start_line, start_col,
                "character literal must contain exactly one character"));
        }
        Ok(ch)
    }

    fn read_number(&mut self, first: u8) -> TokenKind {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance() as char);
        }
        // consume decimal only if followed by at least one digit
        // (avoids treating `.` in `arr.size` as a decimal point)
        if !self.is_at_end() && self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            s.push(self.advance() as char);
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance() as char);
            }
            TokenKind::Double(s.parse().unwrap_or(0.0))
        } else {
            TokenKind::Int(s.parse().unwrap_or(0))
        }
    }

    fn read_ident(&mut self, first: u8) -> String {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            s.push(self.advance() as char);
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> Vec<Error> {
        Lexer::new(src).tokenize().unwrap_err()
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn int_literal() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn double_literal() {
        assert_eq!(lex("3.14"), vec![TokenKind::Double(3.14), TokenKind::Eof]);
    }

    #[test]
    fn dot_not_consumed_by_number() {
        assert_eq!(
            lex("s.x"),
            vec![TokenKind::Ident("s".into()), TokenKind::Dot, TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(lex("let"),      vec![TokenKind::Let,      TokenKind::Eof]);
        assert_eq!(lex("var"),      vec![TokenKind::Var,      TokenKind::Eof]);
        assert_eq!(lex("func"),     vec![TokenKind::Func,     TokenKind::Eof]);
        assert_eq!(lex("repeat"),   vec![TokenKind::Repeat,   TokenKind::Eof]);
        assert_eq!(lex("assert"),   vec![TokenKind::Assert,   TokenKind::Eof]);
        assert_eq!(lex("ref"),      vec![TokenKind::Ref,      TokenKind::Eof]);
        assert_eq!(lex("downUntil"), vec![TokenKind::DownUntil, TokenKind::Eof]);
    }

    #[test]
    fn bool_literals() {
        assert_eq!(lex("true"),  vec![TokenKind::Bool(true),  TokenKind::Eof]);
        assert_eq!(lex("false"), vec![TokenKind::Bool(false), TokenKind::Eof]);
    }

    #[test]
    fn type_names_are_plain_idents() {
        assert_eq!(lex("Int"),    vec![TokenKind::Ident("Int".into()),    TokenKind::Eof]);
        assert_eq!(lex("Double"), vec![TokenKind::Ident("Double".into()), TokenKind::Eof]);
        assert_eq!(lex("Bool"),   vec![TokenKind::Ident("Bool".into()),   TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(lex("=="), vec![TokenKind::EqEq,      TokenKind::Eof]);
        assert_eq!(lex("!="), vec![TokenKind::BangEq,    TokenKind::Eof]);
        assert_eq!(lex("<="), vec![TokenKind::LtEq,      TokenKind::Eof]);
        assert_eq!(lex(">="), vec![TokenKind::GtEq,      TokenKind::Eof]);
        assert_eq!(lex("&&"), vec![TokenKind::AndAnd,    TokenKind::Eof]);
        assert_eq!(lex("||"), vec![TokenKind::OrOr,      TokenKind::Eof]);
        assert_eq!(lex("->"), vec![TokenKind::Arrow,     TokenKind::Eof]);
        assert_eq!(lex("%="), vec![TokenKind::PercentEq, TokenKind::Eof]);
    }

    #[test]
    fn bang_is_a_token() {
        assert_eq!(lex("!x"), vec![TokenKind::Bang, TokenKind::Ident("x".into()), TokenKind::Eof]);
    }

    #[test]
    fn line_comment_skipped() {
        assert_eq!(lex("// comment\n42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn block_comment_skipped() {
        assert_eq!(lex("/* comment */42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(lex("/* a\nb */42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn string_literal() {
        assert_eq!(lex(r#""hello""#), vec![TokenKind::StringLit("hello".into()), TokenKind::Eof]);
    }

    #[test]
    fn string_escape_newline() {
        assert_eq!(lex(r#""a\nb""#), vec![TokenKind::StringLit("a\nb".into()), TokenKind::Eof]);
    }

    #[test]
    fn char_literal() {
        assert_eq!(lex("'c'"), vec![TokenKind::CharLit('c'), TokenKind::Eof]);
        assert_eq!(lex(r"'\n'"), vec![TokenKind::CharLit('\n'), TokenKind::Eof]);
    }

    #[test]
    fn malformed_char_literal_error() {
        let errs = lex_err("'ab'");
        assert_eq!(errs[0].code, ErrorCode::L004);
        let errs = lex_err("''");
        assert_eq!(errs[0].code, ErrorCode::L004);
    }

    #[test]
    fn unterminated_string_error() {
        let errs = lex_err(r#""oops"#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L002);
    }

    #[test]
    fn invalid_escape_error() {
        let errs = lex_err(r#""\q""#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L003);
    }

    #[test]
    fn bare_ampersand_error() {
        let errs = lex_err("&");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::new("a\nb").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 1));
    }

    #[test]
    fn variable_declaration() {
        assert_eq!(
            lex("var x: Double = 3.14"),
            vec![
                TokenKind::Var,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Ident("Double".into()),
                TokenKind::Eq,
                TokenKind::Double(3.14),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn function_signature() {
        assert_eq!(
            lex("func add(a: Int, ref b: Int) -> Int"),
            vec![
                TokenKind::Func,
                TokenKind::Ident("add".into()),
                TokenKind::LParen,
                TokenKind::Ident("a".into()), TokenKind::Colon, TokenKind::Ident("Int".into()),
                TokenKind::Comma,
                TokenKind::Ref,
                TokenKind::Ident("b".into()), TokenKind::Colon, TokenKind::Ident("Int".into()),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident("Int".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn range_expression() {
        assert_eq!(
            lex("0 until 5 step 2"),
            vec![
                TokenKind::Int(0),
                TokenKind::Until,
                TokenKind::Int(5),
                TokenKind::Step,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn token_kind_helpers() {
        assert!(TokenKind::Until.is_range_op());
        assert!(TokenKind::LtEq.is_comparison());
        assert!(TokenKind::PlusEq.is_compound_assign());
        assert!(!TokenKind::Eq.is_compound_assign());
    }
}
