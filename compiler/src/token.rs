use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // primitive types
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    FileDescriptor,
    Unsigned,

    // containers
    List,
    Map,
    SharedMemQueue,

    // declarations
    Package,
    Import,
    Sequenceable,
    Interface,
    Struct,
    Enum,
    Union,

    // attributes
    In,
    Out,
    Oneway,
    Callback,
    Full,
    Lite,

    Identifier,
    Number,

    AngleOpen,
    AngleClose,
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    ParenOpen,
    ParenClose,
    Dot,
    Comma,
    Semicolon,
    Colon,
    Assign,
    Minus,

    LineComment,
    BlockComment,

    Unknown,
    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "boolean" => TokenKind::Boolean,
            "byte" => TokenKind::Byte,
            "char" => TokenKind::Char,
            "short" => TokenKind::Short,
            "int" => TokenKind::Int,
            "long" => TokenKind::Long,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "String" => TokenKind::String,
            "FileDescriptor" => TokenKind::FileDescriptor,
            "unsigned" => TokenKind::Unsigned,
            "List" => TokenKind::List,
            "Map" => TokenKind::Map,
            "SharedMemQueue" => TokenKind::SharedMemQueue,
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "sequenceable" => TokenKind::Sequenceable,
            "interface" => TokenKind::Interface,
            "struct" => TokenKind::Struct,
            "enum" => TokenKind::Enum,
            "union" => TokenKind::Union,
            "in" => TokenKind::In,
            "out" => TokenKind::Out,
            "oneway" => TokenKind::Oneway,
            "callback" => TokenKind::Callback,
            "full" => TokenKind::Full,
            "lite" => TokenKind::Lite,
            _ => return None,
        };
        Some(kind)
    }

    pub fn delimiter(c: char) -> Option<TokenKind> {
        let kind = match c {
            '<' => TokenKind::AngleOpen,
            '>' => TokenKind::AngleClose,
            '{' => TokenKind::BraceOpen,
            '}' => TokenKind::BraceClose,
            '[' => TokenKind::BracketOpen,
            ']' => TokenKind::BracketClose,
            '(' => TokenKind::ParenOpen,
            ')' => TokenKind::ParenClose,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Assign,
            '-' => TokenKind::Minus,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Keywords that may only start a top-level statement. Error recovery stops here.
    pub fn starts_declaration(self) -> bool {
        matches!(
            self,
            TokenKind::Package
                | TokenKind::Import
                | TokenKind::Sequenceable
                | TokenKind::Interface
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Union
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of file"),
            _ => f.write_str(&crate::utils::quote(&self.text)),
        }
    }
}
