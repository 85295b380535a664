use tracing::trace;

use crate::token::{Token, TokenKind};

/// Hand-written scanner over one source file with a single token of lookahead.
pub struct Lexer {
    chars:  Vec<char>,
    pos:    usize,
    line:   usize,
    column: usize,
    peeked: Option<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Lexer {
        Lexer {
            chars:  source.chars().collect(),
            pos:    0,
            line:   1,
            column: 1,
            peeked: None,
        }
    }

    /// Returns the next token, skipping comments when asked to.
    pub fn next(&mut self, skip_comments: bool) -> Token {
        loop {
            let token = match self.peeked.take() {
                Some(token) => token,
                None => self.scan(),
            };
            if skip_comments && token.kind.is_comment() {
                continue;
            }
            return token;
        }
    }

    /// Looks at the next token without consuming it. Peeking past a comment
    /// drops that comment.
    pub fn peek(&mut self, skip_comments: bool) -> &Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        };
        let token = if skip_comments && token.kind.is_comment() {
            self.next(true)
        } else {
            token
        };
        self.peeked.insert(token)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn lookahead(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn scan(&mut self) -> Token {
        while self.current().map_or(false, char::is_whitespace) {
            self.bump();
        }

        let (line, column) = (self.line, self.column);
        let make = |kind: TokenKind, text: String| Token { kind, text, line, column };

        let c = match self.current() {
            Some(c) => c,
            None => return make(TokenKind::Eof, String::new()),
        };

        let token = if c.is_ascii_alphabetic() || c == '_' {
            let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
            make(kind, text)
        } else if c.is_ascii_digit() {
            // hex literals such as 0x1f are one token
            let text = self.take_while(|c| c.is_ascii_alphanumeric());
            make(TokenKind::Number, text)
        } else if c == '/' && self.lookahead(1) == Some('/') {
            let text = self.take_while(|c| c != '\n');
            make(TokenKind::LineComment, text)
        } else if c == '/' && self.lookahead(1) == Some('*') {
            self.scan_block_comment(line, column)
        } else if let Some(kind) = TokenKind::delimiter(c) {
            self.bump();
            make(kind, c.to_string())
        } else {
            self.bump();
            make(TokenKind::Unknown, c.to_string())
        };

        trace!(kind = ?token.kind, text = %token.text, line, column, "token");
        token
    }

    fn scan_block_comment(&mut self, line: usize, column: usize) -> Token {
        let mut text = String::new();
        // opening "/*"
        text.extend(self.bump());
        text.extend(self.bump());
        loop {
            match self.current() {
                None => {
                    return Token { kind: TokenKind::Unknown, text, line, column };
                }
                Some('*') if self.lookahead(1) == Some('/') => {
                    text.extend(self.bump());
                    text.extend(self.bump());
                    return Token { kind: TokenKind::BlockComment, text, line, column };
                }
                Some(_) => text.extend(self.bump()),
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.current() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str, skip_comments: bool) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next(skip_comments);
            if token.is(TokenKind::Eof) {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn tokenize_method() {
        assert_eq!(
            kinds("ping([in] int request, [out] List<String> names);", true),
            vec![
                TokenKind::Identifier,
                TokenKind::ParenOpen,
                TokenKind::BracketOpen,
                TokenKind::In,
                TokenKind::BracketClose,
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::BracketOpen,
                TokenKind::Out,
                TokenKind::BracketClose,
                TokenKind::List,
                TokenKind::AngleOpen,
                TokenKind::String,
                TokenKind::AngleClose,
                TokenKind::Identifier,
                TokenKind::ParenClose,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn comments_are_optional() {
        let source = "/* license */\n// note\npackage a.v1_0;";
        assert_eq!(kinds(source, true)[0], TokenKind::Package);
        assert_eq!(
            kinds(source, false)[..3],
            [TokenKind::BlockComment, TokenKind::LineComment, TokenKind::Package]
        );
    }

    #[test]
    fn positions_reset_on_newline() {
        let mut lexer = Lexer::new("a\n  bc = 0x1f;");
        let a = lexer.next(true);
        assert_eq!((a.line, a.column), (1, 1));
        let bc = lexer.next(true);
        assert_eq!((bc.text.as_str(), bc.line, bc.column), ("bc", 2, 3));
        assert_eq!(lexer.next(true).kind, TokenKind::Assign);
        let number = lexer.next(true);
        assert_eq!((number.kind, number.text.as_str()), (TokenKind::Number, "0x1f"));
    }

    #[test]
    fn unknown_characters_are_tokens() {
        assert_eq!(
            kinds("int # x", true),
            vec![TokenKind::Int, TokenKind::Unknown, TokenKind::Identifier]
        );
        assert_eq!(kinds("/* open", false), vec![TokenKind::Unknown]);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("// c\nstruct Foo");
        assert_eq!(lexer.peek(false).kind, TokenKind::LineComment);
        assert_eq!(lexer.peek(true).kind, TokenKind::Struct);
        assert_eq!(lexer.next(true).kind, TokenKind::Struct);
        assert_eq!(lexer.next(false).text, "Foo");
        assert!(lexer.next(false).is(TokenKind::Eof));
    }
}
