#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Double(f64),
    Bool(bool),
    CharLit(char),
    StringLit(String),
    Ident(String),

    // Keywords
    Let,
    Var,
    Func,
    Struct,
    Enum,
    Case,
    If,
    Else,
    While,
    Repeat,
    For,
    In,
    Break,
    Continue,
    Return,
    Assert,
    Ref,

    // Range keywords
    Until,
    Through,
    DownUntil,
    DownThrough,
    Step,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Caret,      // ^
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    Eq,         // =
    EqEq,       // ==
    BangEq,     // !=
    Bang,       // !
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    Arrow,      // ->

    // Punctuation
    Colon,      // :
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]

    Eof,
}

impl TokenKind {
    pub fn is_range_op(&self) -> bool {
        matches!(self, Self::Until | Self::Through | Self::DownUntil | Self::DownThrough)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn is_compound_assign(&self) -> bool {
        matches!(
            self,
            Self::PlusEq | Self::MinusEq | Self::StarEq | Self::SlashEq | Self::PercentEq
        )
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
/// Type names (`Int`, `Double`, ...) stay plain identifiers; the parser
/// resolves them inside type annotations only.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "let"         => TokenKind::Let,
        "var"         => TokenKind::Var,
        "func"        => TokenKind::Func,
        "struct"      => TokenKind::Struct,
        "enum"        => TokenKind::Enum,
        "case"        => TokenKind::Case,
        "if"          => TokenKind::If,
        "else"        => TokenKind::Else,
        "while"       => TokenKind::While,
        "repeat"      => TokenKind::Repeat,
        "for"         => TokenKind::For,
        "in"          => TokenKind::In,
        "break"       => TokenKind::Break,
        "continue"    => TokenKind::Continue,
        "return"      => TokenKind::Return,
        "assert"      => TokenKind::Assert,
        "ref"         => TokenKind::Ref,
        "until"       => TokenKind::Until,
        "through"     => TokenKind::Through,
        "downUntil"   => TokenKind::DownUntil,
        "downThrough" => TokenKind::DownThrough,
        "step"        => TokenKind::Step,
        "true"        => TokenKind::Bool(true),
        "false"       => TokenKind::Bool(false),
        _             => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
