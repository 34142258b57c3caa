// AST (Abstract Syntax Tree) definitions for the C frontend

/// Source location information for rewriting and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Byte offset into the original source
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Base (non-derived) types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    Struct(String), // Tag name (synthesized for anonymous structs)
    Union(String),
    Enum(String),
    Named(String), // Typedef name, resolved against the scope at use
}

/// Type representation: a base type wrapped in pointer, array and function
/// derivations
#[derive(Debug, Clone)]
pub enum Type {
    Base(BaseType),
    Pointer(Box<Type>),
    Array {
        element: Box<Type>,
        size: Option<Box<AstNode>>,
    },
    Function {
        return_type: Box<Type>,
        params: Vec<Param>,
        variadic: bool,
    },
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type::Base(base)
    }

    pub fn with_pointer(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    pub fn is_pointer_to_function(&self) -> bool {
        matches!(self, Type::Pointer(inner) if inner.is_function())
    }

    /// Array-to-pointer and function-to-pointer conversion of an rvalue.
    pub fn decay(self) -> Self {
        match self {
            Type::Array { element, .. } => Type::Pointer(element),
            Type::Function { .. } => self.with_pointer(),
            other => other,
        }
    }

    /// Parameter type adjustment: `T x[]` is `T *x` and `R f(A)` is `R (*f)(A)`.
    pub fn adjust_parameter(self) -> Self {
        self.decay()
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
    // Sequencing
    Comma,
    // Compound assignment
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Plus,    // +x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

/// Function parameter (the name is optional in prototypes)
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub param_type: Type,
}

/// Struct or union member; `name` is `None` for anonymous members
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Option<String>,
    pub field_type: Type,
}

/// Storage class of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageClass {
    #[default]
    None,
    Extern,
    Static,
    Auto,
    Register,
}

/// Aggregate flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Struct,
    Union,
}

/// Enumerator inside an enum definition
#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<AstNode>,
    pub location: SourceLocation,
}

/// Designator in a brace initializer: `.field =` or `[index] =`
#[derive(Debug, Clone)]
pub enum Designator {
    Field(String),
    Index(AstNode),
}

/// One element of a brace initializer list
#[derive(Debug, Clone)]
pub struct InitItem {
    pub designators: Vec<Designator>,
    pub value: AstNode,
}

/// AST nodes representing declarations, statements and expressions
#[derive(Debug, Clone)]
pub enum AstNode {
    // Declarations
    FunctionDef {
        name: String,
        func_type: Type,
        body: Vec<AstNode>,
        storage: StorageClass,
        location: SourceLocation,
    },
    FunctionDecl {
        name: String,
        func_type: Type,
        storage: StorageClass,
        location: SourceLocation,
    },
    VarDecl {
        name: String,
        var_type: Type,
        init: Option<Box<AstNode>>,
        storage: StorageClass,
        location: SourceLocation,
    },
    TypedefDecl {
        name: String,
        target: Type,
        location: SourceLocation,
    },
    StructDef {
        kind: AggregateKind,
        name: String,
        fields: Vec<Field>,
        location: SourceLocation,
    },
    EnumDef {
        name: String,
        enumerators: Vec<Enumerator>,
        location: SourceLocation,
    },

    // Statements
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    DoWhile {
        body: Vec<AstNode>,
        condition: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Vec<AstNode>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Switch {
        expr: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Case {
        value: Box<AstNode>,
        location: SourceLocation,
    },
    Default {
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Goto {
        label: String,
        location: SourceLocation,
    },
    Label {
        name: String,
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    Empty {
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(u64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    CharLiteral(i64, SourceLocation),
    StringLiteral(String, SourceLocation),
    Variable(String, SourceLocation),
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundAssignment {
        lhs: Box<AstNode>,
        op: BinOp,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    /// `condition ? true_expr : false_expr`; `true_expr` is `None` for the
    /// GNU `condition ?: false_expr` form, whose value is the condition's
    TernaryOp {
        condition: Box<AstNode>,
        true_expr: Option<Box<AstNode>>,
        false_expr: Box<AstNode>,
        location: SourceLocation,
    },
    /// `callee(args)`; `location` is where the call expression starts and
    /// `end` is the start of its closing `)` token.
    FunctionCall {
        callee: Box<AstNode>,
        args: Vec<AstNode>,
        location: SourceLocation,
        end: SourceLocation,
    },
    ArrayAccess {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    MemberAccess {
        object: Box<AstNode>,
        member: String,
        location: SourceLocation,
    },
    PointerMemberAccess {
        object: Box<AstNode>,
        member: String,
        location: SourceLocation,
    },
    Cast {
        target_type: Type,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundLiteral {
        target_type: Type,
        init: Box<AstNode>,
        location: SourceLocation,
    },
    InitList {
        items: Vec<InitItem>,
        location: SourceLocation,
    },
    SizeofType {
        target_type: Type,
        location: SourceLocation,
    },
    SizeofExpr {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. } => location,
            AstNode::FunctionDecl { location, .. } => location,
            AstNode::VarDecl { location, .. } => location,
            AstNode::TypedefDecl { location, .. } => location,
            AstNode::StructDef { location, .. } => location,
            AstNode::EnumDef { location, .. } => location,
            AstNode::Block { location, .. } => location,
            AstNode::Return { location, .. } => location,
            AstNode::If { location, .. } => location,
            AstNode::While { location, .. } => location,
            AstNode::DoWhile { location, .. } => location,
            AstNode::For { location, .. } => location,
            AstNode::Switch { location, .. } => location,
            AstNode::Case { location, .. } => location,
            AstNode::Default { location } => location,
            AstNode::Break { location } => location,
            AstNode::Continue { location } => location,
            AstNode::Goto { location, .. } => location,
            AstNode::Label { location, .. } => location,
            AstNode::ExpressionStatement { location, .. } => location,
            AstNode::Empty { location } => location,
            AstNode::IntLiteral(_, loc) => loc,
            AstNode::FloatLiteral(_, loc) => loc,
            AstNode::CharLiteral(_, loc) => loc,
            AstNode::StringLiteral(_, loc) => loc,
            AstNode::Variable(_, loc) => loc,
            AstNode::BinaryOp { location, .. } => location,
            AstNode::Assignment { location, .. } => location,
            AstNode::CompoundAssignment { location, .. } => location,
            AstNode::UnaryOp { location, .. } => location,
            AstNode::TernaryOp { location, .. } => location,
            AstNode::FunctionCall { location, .. } => location,
            AstNode::ArrayAccess { location, .. } => location,
            AstNode::MemberAccess { location, .. } => location,
            AstNode::PointerMemberAccess { location, .. } => location,
            AstNode::Cast { location, .. } => location,
            AstNode::CompoundLiteral { location, .. } => location,
            AstNode::InitList { location, .. } => location,
            AstNode::SizeofType { location, .. } => location,
            AstNode::SizeofExpr { location, .. } => location,
        }
    }
}

/// Top-level translation unit
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // All external declarations, in source order
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
