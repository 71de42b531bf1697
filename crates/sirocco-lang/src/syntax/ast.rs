/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

/// A whole program: a statement sequence. Declarations are statements, so a
/// script can interleave them freely with executable code.
#[derive(Debug, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let x = 1` (constant) or `var x: Int = 1` (variable)
    VarDecl(VarDecl),
    /// `func name(a: Int, ref b: Int) -> Int { ... }`
    FuncDecl(FuncDecl),
    /// `struct Name { var field = 0  func m() -> Int { ... } }`
    StructDecl(StructDecl),
    /// `enum Name { case a, b = 4, c }`
    EnumDecl(EnumDecl),
    /// `x = e`, `x += e`, `s.f = e`, `a[0] = e`, `T.prototype.m = e`
    Assign(AssignStmt),
    /// `if cond { } else { }`
    If(IfStmt),
    /// `while cond { }`
    While(WhileStmt),
    /// `repeat { } while cond`
    RepeatWhile(RepeatWhileStmt),
    /// `for pat in seq { }`
    ForIn(ForInStmt),
    Break(Span),
    Continue(Span),
    /// `return expr` or bare `return`
    Return(Option<Expr>, Span),
    /// `assert expr`
    Assert(Expr, Span),
    /// A standalone expression used as a statement (e.g. a call).
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<Type>,
    pub is_const: bool,
    pub initializer: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    /// None for anonymous function expressions.
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub return_ty: Option<Type>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    /// Case name plus optional explicit raw value.
    pub cases: Vec<(String, Option<i64>)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub target: Target,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

/// Left-hand side of an assignment, resolved to a storage place at runtime.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String, Span),
    Member(Box<Target>, String, Span),
    Index(Box<Target>, Box<Expr>, Span),
}

impl Target {
    /// The root variable name the target chain hangs off.
    pub fn root(&self) -> &str {
        match self {
            Target::Name(n, _) => n,
            Target::Member(base, _, _) => base.root(),
            Target::Index(base, _, _) => base.root(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Vec<Stmt>,
    pub else_block: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RepeatWhileStmt {
    pub body: Vec<Stmt>,
    pub condition: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForInStmt {
    pub pattern: Pattern,
    pub iterable: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Loop binding pattern. The wildcard `_` runs the body without binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Name(String),
    Wildcard,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, Span),
    Double(f64, Span),
    Bool(bool, Span),
    Char(char, Span),
    Str(String, Span),
    Ident(String, Span),

    /// `[1, 2, 3]`
    Array(Vec<Expr>, Span),

    /// `a + b`, `a == b`, `a ^ b`, ...
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `-x`, `!x`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `lo until hi`, `lo through hi step k`, descending forms
    Range {
        lo: Box<Expr>,
        hi: Box<Expr>,
        step: Option<Box<Expr>>,
        kind: RangeKind,
        span: Span,
    },

    /// `name(args)` — user function, intrinsic, or struct construction
    Call {
        callee: String,
        args: Vec<Arg>,
        span: Span,
    },

    /// `expr.method(args)`
    MethodCall {
        recv: Box<Expr>,
        method: String,
        args: Vec<Arg>,
        span: Span,
    },

    /// `expr.field`
    Member {
        recv: Box<Expr>,
        name: String,
        span: Span,
    },

    /// `expr[index]`
    Index {
        recv: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// Anonymous `func (a: Int) -> Int { ... }` in expression position.
    Func(Box<FuncDecl>),
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Int(_, s)    => s,
            Expr::Double(_, s) => s,
            Expr::Bool(_, s)   => s,
            Expr::Char(_, s)   => s,
            Expr::Str(_, s)    => s,
            Expr::Ident(_, s)  => s,
            Expr::Array(_, s)  => s,
            Expr::Binary { span, .. }     => span,
            Expr::Unary { span, .. }      => span,
            Expr::Range { span, .. }      => span,
            Expr::Call { span, .. }       => span,
            Expr::MethodCall { span, .. } => span,
            Expr::Member { span, .. }     => span,
            Expr::Index { span, .. }      => span,
            Expr::Func(f) => &f.span,
        }
    }
}

/// A call argument, optionally labeled (labels matter for struct construction).
#[derive(Debug, Clone)]
pub struct Arg {
    pub label: Option<String>,
    pub value: Expr,
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod, Pow,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",   BinOp::Sub => "-",
            BinOp::Mul => "*",   BinOp::Div => "/",  BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::Eq => "==",   BinOp::NotEq => "!=",
            BinOp::Lt => "<",    BinOp::LtEq => "<=",
            BinOp::Gt => ">",    BinOp::GtEq => ">=",
            BinOp::And => "&&",  BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// `lo until hi` — ascending, bound-exclusive
    Until,
    /// `lo through hi` — ascending, bound-inclusive
    Through,
    /// `lo downUntil hi` — descending, stops one short of the bound
    DownUntil,
    /// `lo downThrough hi` — descending, bound-inclusive
    DownThrough,
}

// ─── Type annotations ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Double,
    Character,
    Str,
    Bool,
    Void,
    Function,
    Struct,
    Enum,
    /// `[T]`, or bare `Array` with no element type given.
    Array(Option<Box<Type>>),
}
