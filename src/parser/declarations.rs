//! Declaration parsing implementation
//!
//! This module handles parsing of C declarations:
//!
//! - Declaration specifiers: storage class, qualifiers, base types,
//!   struct/union/enum specifiers and typedef names
//! - Declarators, including the nested forms function pointers need:
//!   `int (*fp)(int)`, `void (*table[4])(void)`, `int (*get(void))(int)`
//! - Function definitions and prototypes, typedefs, variables
//! - Initializers, including designated brace lists
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= specifiers (init_declarator ("," init_declarator)*)? ";"
//!                | specifiers declarator "{" statements "}"
//! declarator   ::= "*"* direct_declarator
//! direct_decl  ::= identifier | "(" declarator ")" | direct_decl suffix
//! suffix       ::= "[" expr? "]" | "(" params ")"
//! ```
//!
//! A declarator is collected first and applied to the base type afterwards:
//! pointers bind to the base, suffixes apply right-to-left, and a
//! parenthesized inner declarator wraps the result.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

/// Result of parsing declaration specifiers
pub(crate) struct DeclSpec {
    pub(crate) storage: StorageClass,
    pub(crate) is_typedef: bool,
    pub(crate) base: Type,
    /// struct/union/enum definitions encountered inside the specifiers
    pub(crate) definitions: Vec<AstNode>,
}

/// Which arithmetic type keywords appeared in a specifier list
#[derive(Default)]
struct SpecifierCounts {
    void: bool,
    boolean: bool,
    character: bool,
    short: bool,
    int: bool,
    float: bool,
    double: bool,
    signedness: bool,
    longs: u8,
}

impl SpecifierCounts {
    fn any(&self) -> bool {
        self.void
            || self.boolean
            || self.character
            || self.short
            || self.int
            || self.float
            || self.double
            || self.signedness
            || self.longs > 0
    }
}

enum DeclSuffix {
    Array(Option<Box<AstNode>>),
    Function { params: Vec<Param>, variadic: bool },
}

/// A declarator before it has been applied to its base type
pub(crate) struct Declarator {
    name: Option<(String, SourceLocation)>,
    pointers: usize,
    suffixes: Vec<DeclSuffix>,
    nested: Option<Box<Declarator>>,
}

impl Declarator {
    fn empty() -> Self {
        Declarator {
            name: None,
            pointers: 0,
            suffixes: Vec::new(),
            nested: None,
        }
    }

    pub(crate) fn name(&self) -> Option<&(String, SourceLocation)> {
        self.name
            .as_ref()
            .or_else(|| self.nested.as_ref().and_then(|n| n.name()))
    }

    pub(crate) fn apply(self, base: Type) -> Type {
        let mut ty = base;
        for _ in 0..self.pointers {
            ty = ty.with_pointer();
        }
        for suffix in self.suffixes.into_iter().rev() {
            ty = match suffix {
                DeclSuffix::Array(size) => Type::Array {
                    element: Box::new(ty),
                    size,
                },
                DeclSuffix::Function { params, variadic } => Type::Function {
                    return_type: Box::new(ty),
                    params,
                    variadic,
                },
            };
        }
        match self.nested {
            Some(inner) => inner.apply(ty),
            None => ty,
        }
    }
}

impl Parser {
    /// Parse one external declaration; a single C declaration may declare
    /// several names and define tags along the way, hence the Vec.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<Vec<AstNode>, ParseError> {
        self.parse_declaration(true)
    }

    /// Parse a declaration (or, when `allow_definition` is set, a function
    /// definition).
    pub(crate) fn parse_declaration(
        &mut self,
        allow_definition: bool,
    ) -> Result<Vec<AstNode>, ParseError> {
        self.skip_gnu_annotations()?;

        if self.match_token(&TokenKind::Semicolon) {
            return Ok(Vec::new());
        }

        if self.match_token(&TokenKind::StaticAssert) {
            self.parse_static_assert()?;
            return Ok(Vec::new());
        }

        let spec = self.parse_declaration_specifiers()?;
        let mut nodes = spec.definitions;

        if self.match_token(&TokenKind::Semicolon) {
            return Ok(nodes);
        }

        loop {
            let declarator = self.parse_declarator()?;
            self.skip_gnu_annotations()?;

            let (name, location) = match declarator.name() {
                Some((name, location)) => (name.clone(), *location),
                None => return self.error("Expected declarator name"),
            };
            let ty = declarator.apply(spec.base.clone());

            if spec.is_typedef {
                self.declare_name(&name, true);
                nodes.push(AstNode::TypedefDecl {
                    name,
                    target: ty,
                    location,
                });
            } else if ty.is_function() {
                self.declare_name(&name, false);

                if allow_definition && self.check(&TokenKind::LBrace) {
                    let body = self.parse_function_body(&ty)?;
                    nodes.push(AstNode::FunctionDef {
                        name,
                        func_type: ty,
                        body,
                        storage: spec.storage,
                        location,
                    });
                    return Ok(nodes);
                }

                nodes.push(AstNode::FunctionDecl {
                    name,
                    func_type: ty,
                    storage: spec.storage,
                    location,
                });
            } else {
                self.declare_name(&name, false);

                let init = if self.match_token(&TokenKind::Eq) {
                    Some(Box::new(self.parse_initializer()?))
                } else {
                    None
                };

                nodes.push(AstNode::VarDecl {
                    name,
                    var_type: ty,
                    init,
                    storage: spec.storage,
                    location,
                });
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_semicolon("after declaration")?;
        Ok(nodes)
    }

    /// Parse `{ body }` of a function definition with its parameters in scope
    fn parse_function_body(&mut self, func_type: &Type) -> Result<Vec<AstNode>, ParseError> {
        self.push_scope();
        if let Type::Function { params, .. } = func_type {
            for param in params {
                if let Some(name) = &param.name {
                    self.declare_name(name, false);
                }
            }
        }

        let result = self.parse_compound_body("function body");
        self.pop_scope();
        result
    }

    /// Parse `_Static_assert(expr, "message");` after the keyword; nothing
    /// is produced for it.
    fn parse_static_assert(&mut self) -> Result<(), ParseError> {
        self.expect_lparen("after '_Static_assert'")?;
        self.parse_conditional()?;
        if self.match_token(&TokenKind::Comma) {
            while matches!(self.peek().kind, TokenKind::StringLiteral(_)) {
                self.advance();
            }
        }
        self.expect_rparen("after static assertion")?;
        self.expect_semicolon("after static assertion")?;
        Ok(())
    }

    /// Parse declaration specifiers: storage class, qualifiers and the base
    /// type, in any order
    pub(crate) fn parse_declaration_specifiers(&mut self) -> Result<DeclSpec, ParseError> {
        let start = self.current_location();
        let mut storage = StorageClass::None;
        let mut is_typedef = false;
        let mut definitions = Vec::new();
        let mut aggregate: Option<BaseType> = None;
        let mut seen_any = false;

        let mut saw = SpecifierCounts::default();

        loop {
            let kind = self.peek().kind.clone();
            let has_type_specifier = aggregate.is_some() || saw.any();

            match kind {
                TokenKind::Typedef => is_typedef = true,
                TokenKind::Extern => storage = StorageClass::Extern,
                TokenKind::Static => storage = StorageClass::Static,
                TokenKind::Auto => storage = StorageClass::Auto,
                TokenKind::Register => storage = StorageClass::Register,
                TokenKind::ThreadLocal
                | TokenKind::Inline
                | TokenKind::Noreturn
                | TokenKind::Const
                | TokenKind::Volatile
                | TokenKind::Restrict => {}
                TokenKind::Attribute | TokenKind::Extension => {
                    self.skip_gnu_annotations()?;
                    continue;
                }
                TokenKind::Void => saw.void = true,
                TokenKind::Bool => saw.boolean = true,
                TokenKind::Char => saw.character = true,
                TokenKind::Short => saw.short = true,
                TokenKind::Int => saw.int = true,
                TokenKind::Long => saw.longs += 1,
                TokenKind::Float => saw.float = true,
                TokenKind::Double => saw.double = true,
                TokenKind::Signed | TokenKind::Unsigned => saw.signedness = true,
                TokenKind::Struct | TokenKind::Union => {
                    self.advance();
                    let agg = if kind == TokenKind::Struct {
                        AggregateKind::Struct
                    } else {
                        AggregateKind::Union
                    };
                    aggregate = Some(self.parse_struct_or_union(agg, &mut definitions)?);
                    seen_any = true;
                    continue;
                }
                TokenKind::Enum => {
                    self.advance();
                    aggregate = Some(self.parse_enum(&mut definitions)?);
                    seen_any = true;
                    continue;
                }
                TokenKind::Ident(ref name)
                    if !has_type_specifier && self.is_type_name_in_specifiers(name) =>
                {
                    aggregate = Some(BaseType::Named(name.clone()));
                }
                _ => break,
            }

            seen_any = true;
            self.advance();
        }

        if !seen_any {
            return Err(ParseError {
                message: format!("Expected type, found {}", self.peek()),
                location: start,
            });
        }

        let base = if let Some(base) = aggregate {
            base
        } else if saw.void {
            BaseType::Void
        } else if saw.boolean {
            BaseType::Bool
        } else if saw.character {
            BaseType::Char
        } else if saw.short {
            BaseType::Short
        } else if saw.float {
            BaseType::Float
        } else if saw.double && saw.longs > 0 {
            BaseType::LongDouble
        } else if saw.double {
            BaseType::Double
        } else if saw.longs >= 2 {
            BaseType::LongLong
        } else if saw.longs == 1 {
            BaseType::Long
        } else {
            // `int`, `unsigned`, or implicit int after a storage class
            BaseType::Int
        };

        Ok(DeclSpec {
            storage,
            is_typedef,
            base: Type::new(base),
            definitions,
        })
    }

    /// An identifier in specifier position names a type if it is a known
    /// typedef, or if it is undeclared and directly followed by something
    /// that can only be a declarator.
    fn is_type_name_in_specifiers(&self, name: &str) -> bool {
        match self.lookup_name(name) {
            Some(is_typedef) => is_typedef,
            None => match self.peek_kind_ahead(1) {
                Some(TokenKind::Ident(_)) => true,
                // At file scope there are no expressions to confuse with
                Some(TokenKind::Star) => self.type_scopes.len() == 1,
                _ => false,
            },
        }
    }

    /// Parse `struct`/`union` specifier after the keyword
    fn parse_struct_or_union(
        &mut self,
        kind: AggregateKind,
        definitions: &mut Vec<AstNode>,
    ) -> Result<BaseType, ParseError> {
        let location = self.previous_location();
        self.skip_gnu_annotations()?;

        let tag = if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        let keyword = match kind {
            AggregateKind::Struct => "struct",
            AggregateKind::Union => "union",
        };

        if self.match_token(&TokenKind::LBrace) {
            let name = match tag {
                Some(name) => name,
                None => self.next_anonymous_tag(keyword),
            };
            let fields = self.nested(|parser| parser.parse_struct_fields(definitions))?;
            self.skip_gnu_annotations()?;

            definitions.push(AstNode::StructDef {
                kind,
                name: name.clone(),
                fields,
                location,
            });
            return Ok(match kind {
                AggregateKind::Struct => BaseType::Struct(name),
                AggregateKind::Union => BaseType::Union(name),
            });
        }

        match (tag, kind) {
            (Some(name), AggregateKind::Struct) => Ok(BaseType::Struct(name)),
            (Some(name), AggregateKind::Union) => Ok(BaseType::Union(name)),
            (None, _) => self.error(format!(
                "Expected {} name or '{{', found {}",
                keyword,
                self.peek()
            )),
        }
    }

    /// Parse member declarations up to and including the closing brace
    fn parse_struct_fields(
        &mut self,
        definitions: &mut Vec<AstNode>,
    ) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return self.error("Expected '}' after struct fields");
            }
            if self.match_token(&TokenKind::Semicolon) {
                continue;
            }
            if self.match_token(&TokenKind::StaticAssert) {
                self.parse_static_assert()?;
                continue;
            }

            let spec = self.parse_declaration_specifiers()?;
            definitions.extend(spec.definitions);

            // Anonymous member: `struct { ... };` inside the parent
            if self.match_token(&TokenKind::Semicolon) {
                fields.push(Field {
                    name: None,
                    field_type: spec.base,
                });
                continue;
            }

            loop {
                let declarator = if self.check(&TokenKind::Colon) {
                    Declarator::empty()
                } else {
                    self.parse_declarator()?
                };

                // Bit-field width
                if self.match_token(&TokenKind::Colon) {
                    self.parse_conditional()?;
                }
                self.skip_gnu_annotations()?;

                fields.push(Field {
                    name: declarator.name().map(|(name, _)| name.clone()),
                    field_type: declarator.apply(spec.base.clone()),
                });

                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }

            self.expect_semicolon("after struct field")?;
        }

        self.expect_rbrace("after struct fields")?;
        Ok(fields)
    }

    /// Parse `enum` specifier after the keyword
    fn parse_enum(&mut self, definitions: &mut Vec<AstNode>) -> Result<BaseType, ParseError> {
        let location = self.previous_location();
        self.skip_gnu_annotations()?;

        let tag = if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        if !self.match_token(&TokenKind::LBrace) {
            return match tag {
                Some(name) => Ok(BaseType::Enum(name)),
                None => self.error(format!("Expected enum name or '{{', found {}", self.peek())),
            };
        }

        let name = match tag {
            Some(name) => name,
            None => self.next_anonymous_tag("enum"),
        };

        let mut enumerators = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let enumerator_loc = self.current_location();
            let enumerator = self.expect_identifier()?;
            self.skip_gnu_annotations()?;
            let value = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_conditional()?)
            } else {
                None
            };
            self.declare_name(&enumerator, false);
            enumerators.push(Enumerator {
                name: enumerator,
                value,
                location: enumerator_loc,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rbrace("after enumerators")?;

        definitions.push(AstNode::EnumDef {
            name: name.clone(),
            enumerators,
            location,
        });
        Ok(BaseType::Enum(name))
    }

    /// Parse a (possibly abstract) declarator
    pub(crate) fn parse_declarator(&mut self) -> Result<Declarator, ParseError> {
        let mut declarator = Declarator::empty();

        while self.match_token(&TokenKind::Star) {
            declarator.pointers += 1;
            self.skip_type_qualifiers()?;
        }

        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            let location = self.current_location();
            self.advance();
            declarator.name = Some((name, location));
        } else if self.check(&TokenKind::LParen) && self.paren_starts_nested_declarator() {
            self.advance();
            self.skip_gnu_annotations()?;
            declarator.nested = Some(Box::new(self.nested(Self::parse_declarator)?));
            self.expect_rparen("after declarator")?;
        }

        loop {
            if self.match_token(&TokenKind::LBracket) {
                self.skip_type_qualifiers()?;
                self.match_token(&TokenKind::Static);
                let size = if self.check(&TokenKind::RBracket) {
                    None
                } else if self.check(&TokenKind::Star)
                    && self.peek_kind_ahead(1) == Some(&TokenKind::RBracket)
                {
                    // `[*]` variable length array of unspecified size
                    self.advance();
                    None
                } else {
                    Some(Box::new(self.nested(Self::parse_assignment)?))
                };
                self.expect_token(&TokenKind::RBracket, "Expected ']' after array size")?;
                declarator.suffixes.push(DeclSuffix::Array(size));
            } else if self.match_token(&TokenKind::LParen) {
                let (params, variadic) = self.nested(Self::parse_parameter_list)?;
                self.expect_rparen("after parameters")?;
                declarator
                    .suffixes
                    .push(DeclSuffix::Function { params, variadic });
            } else {
                break;
            }
        }

        Ok(declarator)
    }

    /// With the current token being '(', decide whether it opens a nested
    /// declarator `(*fp)` rather than a parameter list `(int)`.
    fn paren_starts_nested_declarator(&self) -> bool {
        match self.peek_kind_ahead(1) {
            Some(TokenKind::Star) | Some(TokenKind::LParen) | Some(TokenKind::LBracket) => true,
            Some(TokenKind::Attribute) => true,
            Some(TokenKind::Ident(name)) => !self.is_typedef_name(name),
            _ => false,
        }
    }

    fn skip_type_qualifiers(&mut self) -> Result<(), ParseError> {
        loop {
            if self.match_token(&TokenKind::Const)
                || self.match_token(&TokenKind::Volatile)
                || self.match_token(&TokenKind::Restrict)
            {
                continue;
            }
            if self.check(&TokenKind::Attribute) {
                self.skip_gnu_annotations()?;
                continue;
            }
            return Ok(());
        }
    }

    /// Parse parameter list after '(' up to (not including) ')'
    fn parse_parameter_list(&mut self) -> Result<(Vec<Param>, bool), ParseError> {
        let mut params = Vec::new();
        let mut variadic = false;

        if self.check(&TokenKind::RParen) {
            return Ok((params, variadic));
        }

        // Special case: (void) means no parameters in C
        if self.check(&TokenKind::Void) && self.peek_kind_ahead(1) == Some(&TokenKind::RParen) {
            self.advance();
            return Ok((params, variadic));
        }

        loop {
            if self.match_token(&TokenKind::Ellipsis) {
                variadic = true;
                break;
            }

            let spec = self.parse_declaration_specifiers()?;
            let declarator = self.parse_declarator()?;
            self.skip_gnu_annotations()?;

            params.push(Param {
                name: declarator.name().map(|(name, _)| name.clone()),
                param_type: declarator.apply(spec.base).adjust_parameter(),
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok((params, variadic))
    }

    /// Parse a type name as used in casts, `sizeof` and compound literals
    pub(crate) fn parse_type_name(&mut self) -> Result<Type, ParseError> {
        let spec = self.parse_declaration_specifiers()?;
        let declarator = self.parse_declarator()?;
        if let Some((name, location)) = declarator.name() {
            return Err(ParseError {
                message: format!("Unexpected identifier '{}' in type name", name),
                location: *location,
            });
        }
        Ok(declarator.apply(spec.base))
    }

    /// Parse an initializer: an assignment expression or a brace list
    pub(crate) fn parse_initializer(&mut self) -> Result<AstNode, ParseError> {
        if self.check(&TokenKind::LBrace) {
            self.parse_init_list()
        } else {
            self.parse_assignment()
        }
    }

    /// Parse `{ [designators =] initializer, ... }`
    pub(crate) fn parse_init_list(&mut self) -> Result<AstNode, ParseError> {
        let location = self.expect_token(&TokenKind::LBrace, "Expected '{' to open initializer")?;
        let items = self.nested(Self::parse_init_items)?;
        self.expect_rbrace("after initializer list")?;
        Ok(AstNode::InitList { items, location })
    }

    /// Parse the items of an initializer list up to (not including) '}'
    fn parse_init_items(&mut self) -> Result<Vec<InitItem>, ParseError> {
        let mut items = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let mut designators = Vec::new();
            loop {
                if self.match_token(&TokenKind::Dot) {
                    designators.push(Designator::Field(self.expect_identifier()?));
                } else if self.match_token(&TokenKind::LBracket) {
                    let index = self.parse_conditional()?;
                    // GNU range designator `[lo ... hi]`
                    if self.match_token(&TokenKind::Ellipsis) {
                        self.parse_conditional()?;
                    }
                    self.expect_token(&TokenKind::RBracket, "Expected ']' after designator")?;
                    designators.push(Designator::Index(index));
                } else {
                    break;
                }
            }
            if !designators.is_empty() {
                self.expect_token(&TokenKind::Eq, "Expected '=' after designator")?;
            }

            let value = self.parse_initializer()?;
            items.push(InitItem { designators, value });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    fn var_type(node: &AstNode) -> &Type {
        match node {
            AstNode::VarDecl { var_type, .. } => var_type,
            other => panic!("Expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_function_pointer_declarator() {
        let program = parse("int (*fp)(int, char *);");
        let ty = var_type(&program.nodes[0]);

        match ty {
            Type::Pointer(inner) => match &**inner {
                Type::Function {
                    return_type,
                    params,
                    variadic,
                } => {
                    assert!(matches!(**return_type, Type::Base(BaseType::Int)));
                    assert_eq!(params.len(), 2);
                    assert!(matches!(params[1].param_type, Type::Pointer(_)));
                    assert!(!variadic);
                }
                other => panic!("Expected function, got {:?}", other),
            },
            other => panic!("Expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_array_of_function_pointers() {
        let program = parse("void (*handlers[4])(void);");
        let ty = var_type(&program.nodes[0]);

        match ty {
            Type::Array { element, size } => {
                assert!(element.is_pointer_to_function());
                assert!(matches!(size.as_deref(), Some(AstNode::IntLiteral(4, _))));
            }
            other => panic!("Expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_function_returning_function_pointer() {
        let program = parse("int (*pick(int which))(int, int);");

        match &program.nodes[0] {
            AstNode::FunctionDecl { name, func_type, .. } => {
                assert_eq!(name, "pick");
                match func_type {
                    Type::Function {
                        return_type,
                        params,
                        ..
                    } => {
                        assert_eq!(params.len(), 1);
                        assert_eq!(params[0].name.as_deref(), Some("which"));
                        assert!(return_type.is_pointer_to_function());
                    }
                    other => panic!("Expected function type, got {:?}", other),
                }
            }
            other => panic!("Expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_function_parameter_is_adjusted_to_pointer() {
        let program = parse("void apply(int f(int), int values[]);");

        match &program.nodes[0] {
            AstNode::FunctionDecl {
                func_type: Type::Function { params, .. },
                ..
            } => {
                assert!(params[0].param_type.is_pointer_to_function());
                assert!(matches!(params[1].param_type, Type::Pointer(_)));
            }
            other => panic!("Expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_typedef_then_use() {
        let program = parse("typedef int (*binop)(int, int); binop table[2]; binop pick;");

        assert!(matches!(&program.nodes[0], AstNode::TypedefDecl { name, .. } if name == "binop"));
        assert!(matches!(
            var_type(&program.nodes[2]),
            Type::Base(BaseType::Named(n)) if n == "binop"
        ));
    }

    #[test]
    fn test_multiple_declarators() {
        let program = parse("int a = 1, *b, (*c)(void);");

        assert_eq!(program.nodes.len(), 3);
        assert!(matches!(var_type(&program.nodes[1]), Type::Pointer(_)));
        assert!(var_type(&program.nodes[2]).is_pointer_to_function());
    }

    #[test]
    fn test_struct_with_callback_member() {
        let program = parse(
            "struct ops { int (*open)(const char *path); void (*close)(int); unsigned flags : 3; } table;",
        );

        assert_eq!(program.nodes.len(), 2);
        match &program.nodes[0] {
            AstNode::StructDef { name, fields, .. } => {
                assert_eq!(name, "ops");
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[0].name.as_deref(), Some("open"));
                assert!(fields[0].field_type.is_pointer_to_function());
                assert_eq!(fields[2].name.as_deref(), Some("flags"));
            }
            other => panic!("Expected struct definition, got {:?}", other),
        }
        assert!(matches!(
            var_type(&program.nodes[1]),
            Type::Base(BaseType::Struct(n)) if n == "ops"
        ));
    }

    #[test]
    fn test_anonymous_struct_and_enum() {
        let program = parse("struct { enum { A, B = 4 } kind; } value;");

        assert!(matches!(&program.nodes[0], AstNode::EnumDef { enumerators, .. } if enumerators.len() == 2));
        assert!(matches!(&program.nodes[1], AstNode::StructDef { name, .. } if name.starts_with("<anonymous struct")));
        assert!(matches!(&program.nodes[2], AstNode::VarDecl { name, .. } if name == "value"));
    }

    #[test]
    fn test_designated_initializer() {
        let program = parse("struct ops o = { .open = 0, [1] = 2, { 3 } };");

        match &program.nodes[0] {
            AstNode::VarDecl { init: Some(init), .. } => match &**init {
                AstNode::InitList { items, .. } => {
                    assert_eq!(items.len(), 3);
                    assert!(matches!(&items[0].designators[0], Designator::Field(f) if f == "open"));
                    assert!(matches!(&items[1].designators[0], Designator::Index(_)));
                    assert!(matches!(items[2].value, AstNode::InitList { .. }));
                }
                other => panic!("Expected initializer list, got {:?}", other),
            },
            other => panic!("Expected initialized variable, got {:?}", other),
        }
    }

    #[test]
    fn test_gnu_annotations_are_skipped() {
        let program = parse(
            "__extension__ static inline int helper(void) __attribute__((unused));\nint x __asm__(\"x_sym\");",
        );

        assert!(matches!(&program.nodes[0], AstNode::FunctionDecl { storage: StorageClass::Static, .. }));
        assert!(matches!(&program.nodes[1], AstNode::VarDecl { name, .. } if name == "x"));
    }

    #[test]
    fn test_missing_declarator_name_is_an_error() {
        let result = Parser::new("int (*)(void);").unwrap().parse_program();
        assert!(result.is_err());
    }
}
