use crate::location::Location;

/// A lexical token with its full source span (spec.md §4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// `is_int` is set when the literal had no `.` or exponent, so the
    /// parser can preserve `Number::Int` rather than round-tripping it
    /// through `f64`.
    Number { value: f64, is_int: bool },
    String(String),
    RawString(String),
    True,
    False,
    Null,

    Ident(String),
    Underscore,

    // Keywords
    Package,
    Import,
    As,
    Default,
    If,
    Contains,
    Some,
    In,
    Every,
    Not,
    With,
    Else,
    Data,
    Input,

    // Operators
    Assign,     // :=
    Eq,         // ==
    Ne,         // !=
    Le,         // <=
    Ge,         // >=
    Lt,         // <
    Gt,         // >
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Pipe,       // |
    Amp,        // &
    Unify,      // =

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,

    Newline,
    Eof,
}

impl TokenKind {
    pub fn keyword_from_ident(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "as" => TokenKind::As,
            "default" => TokenKind::Default,
            "if" => TokenKind::If,
            "contains" => TokenKind::Contains,
            "some" => TokenKind::Some,
            "in" => TokenKind::In,
            "every" => TokenKind::Every,
            "not" => TokenKind::Not,
            "with" => TokenKind::With,
            "else" => TokenKind::Else,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "data" => TokenKind::Data,
            "input" => TokenKind::Input,
            _ => return None,
        })
    }

    /// Printable form used in parser error context, matching how an editor
    /// would show the offending token back to a user.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number { value, .. } => value.to_string(),
            TokenKind::String(s) => format!("{s:?}"),
            TokenKind::RawString(s) => format!("`{s}`"),
            TokenKind::True => "true".into(),
            TokenKind::False => "false".into(),
            TokenKind::Null => "null".into(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Underscore => "_".into(),
            TokenKind::Package => "package".into(),
            TokenKind::Import => "import".into(),
            TokenKind::As => "as".into(),
            TokenKind::Default => "default".into(),
            TokenKind::If => "if".into(),
            TokenKind::Contains => "contains".into(),
            TokenKind::Some => "some".into(),
            TokenKind::In => "in".into(),
            TokenKind::Every => "every".into(),
            TokenKind::Not => "not".into(),
            TokenKind::With => "with".into(),
            TokenKind::Else => "else".into(),
            TokenKind::Data => "data".into(),
            TokenKind::Input => "input".into(),
            TokenKind::Assign => ":=".into(),
            TokenKind::Eq => "==".into(),
            TokenKind::Ne => "!=".into(),
            TokenKind::Le => "<=".into(),
            TokenKind::Ge => ">=".into(),
            TokenKind::Lt => "<".into(),
            TokenKind::Gt => ">".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Percent => "%".into(),
            TokenKind::Pipe => "|".into(),
            TokenKind::Amp => "&".into(),
            TokenKind::Unify => "=".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::LBracket => "[".into(),
            TokenKind::RBracket => "]".into(),
            TokenKind::LBrace => "{".into(),
            TokenKind::RBrace => "}".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Colon => ":".into(),
            TokenKind::Semicolon => ";".into(),
            TokenKind::Dot => ".".into(),
            TokenKind::Newline => "<newline>".into(),
            TokenKind::Eof => "<eof>".into(),
        }
    }
}
