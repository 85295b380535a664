use indexmap::IndexSet;

use crate::{
    ast::{
        Attributes, EnumMember, EnumType, Member, Position, PrimitiveKind, StructType, TypeId, TypeKey,
        TypeKind,
    },
    options::Language,
    parser::{position, FileParser, PResult, Recover},
    token::TokenKind,
    utils::quote,
};

/// Parses an integer literal: decimal, or hex with a `0x` prefix.
fn parse_number(text: &str) -> Option<i128> {
    let lower = text.to_ascii_lowercase();
    match lower.strip_prefix("0x") {
        Some(hex) => i128::from_str_radix(hex, 16).ok(),
        None => lower.parse::<i128>().ok(),
    }
}

impl<'p> FileParser<'p> {
    fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.module.types.primitive(kind)
    }

    /// `base ( '[' ']' )*` where base is a primitive, a container or a named type.
    pub(crate) fn parse_type(&mut self) -> PResult<TypeId> {
        let token = self.next();
        let pos = position(&token);
        let mut ty = match token.kind {
            TokenKind::Boolean => self.primitive(PrimitiveKind::Boolean),
            TokenKind::Byte | TokenKind::Char => self.primitive(PrimitiveKind::Byte),
            TokenKind::Short => self.primitive(PrimitiveKind::Short),
            TokenKind::Int => self.primitive(PrimitiveKind::Int),
            TokenKind::Long => self.primitive(PrimitiveKind::Long),
            TokenKind::Float => self.primitive(PrimitiveKind::Float),
            TokenKind::Double => self.primitive(PrimitiveKind::Double),
            TokenKind::String => self.primitive(PrimitiveKind::String),
            TokenKind::FileDescriptor => self.primitive(PrimitiveKind::FileDescriptor),
            TokenKind::Unsigned => {
                let next = self.next();
                let kind = match next.kind {
                    TokenKind::Char | TokenKind::Byte => PrimitiveKind::UChar,
                    TokenKind::Short => PrimitiveKind::UShort,
                    TokenKind::Int => PrimitiveKind::UInt,
                    TokenKind::Long => PrimitiveKind::ULong,
                    _ => return Err(self.unexpected(&next, "\"char\", \"short\", \"int\" or \"long\"")),
                };
                self.primitive(kind)
            }
            TokenKind::List => {
                self.expect(TokenKind::AngleOpen, "\"<\"")?;
                let element = self.parse_element_type()?;
                self.expect(TokenKind::AngleClose, "\">\"")?;
                let arena = &mut self.module.types;
                self.ast.intern(arena, TypeKey::List(element), || TypeKind::List(element))
            }
            TokenKind::Map => {
                self.expect(TokenKind::AngleOpen, "\"<\"")?;
                let key = self.parse_element_type()?;
                self.expect(TokenKind::Comma, "\",\"")?;
                let value = self.parse_element_type()?;
                self.expect(TokenKind::AngleClose, "\">\"")?;
                let arena = &mut self.module.types;
                self.ast.intern(arena, TypeKey::Map(key, value), || TypeKind::Map { key, value })
            }
            TokenKind::SharedMemQueue => {
                self.expect(TokenKind::AngleOpen, "\"<\"")?;
                let element = self.parse_element_type()?;
                self.expect(TokenKind::AngleClose, "\">\"")?;
                if self.module.types.fixed_size(element).is_none() {
                    let name = self.module.types.display_name(element);
                    self.semantic(
                        pos,
                        format!("SharedMemQueue elements must be plain data, {} is not", quote(&name)),
                    );
                    return Err(Recover);
                }
                let arena = &mut self.module.types;
                self.ast.intern(arena, TypeKey::SharedMemQueue(element), || {
                    TypeKind::SharedMemQueue(element)
                })
            }
            TokenKind::Identifier => {
                let mut name = token.text.clone();
                while self.eat(TokenKind::Dot) {
                    let segment = self.expect(TokenKind::Identifier, "an identifier after \".\"")?;
                    name.push('.');
                    name.push_str(&segment.text);
                }
                match self.ast.lookup(&self.module.namespaces, &name) {
                    Some(ty) => ty,
                    None => {
                        self.semantic(pos, format!("unknown type {}", quote(&name)));
                        return Err(Recover);
                    }
                }
            }
            _ => return Err(self.unexpected(&token, "a type")),
        };

        while self.peek_kind() == TokenKind::BracketOpen {
            self.next();
            self.expect(TokenKind::BracketClose, "\"]\"")?;
            self.check_element(ty, pos)?;
            let element = ty;
            let arena = &mut self.module.types;
            ty = self.ast.intern(arena, TypeKey::Array(element), || TypeKind::Array(element));
        }

        self.check_language_support(ty, pos)?;
        Ok(ty)
    }

    fn parse_element_type(&mut self) -> PResult<TypeId> {
        let pos = position(self.peek());
        let ty = self.parse_type()?;
        self.check_element(ty, pos)?;
        Ok(ty)
    }

    /// Interfaces cannot travel inside containers.
    fn check_element(&mut self, ty: TypeId, pos: Position) -> PResult<()> {
        if let TypeKind::Interface(interface) = self.module.types.get(ty) {
            let name = interface.name.clone();
            self.semantic(pos, format!("interface {} cannot be a container element", quote(&name)));
            return Err(Recover);
        }
        Ok(())
    }

    /// Rejects types the selected target language cannot express.
    pub(crate) fn check_language_support(&mut self, ty: TypeId, pos: Position) -> PResult<()> {
        let language = match self.options.language {
            Some(language) => language,
            None => return Ok(()),
        };
        let kernel = self.options.kernel;
        let types = &self.module.types;

        let problem = match (language, types.get(ty)) {
            (Language::C, TypeKind::Map { .. }) => Some("Map is not supported in C".to_owned()),
            (Language::C, TypeKind::SharedMemQueue(_)) => {
                Some("SharedMemQueue is not supported in C".to_owned())
            }
            (Language::C, TypeKind::Sequenceable(s)) => {
                Some(format!("sequenceable {} is not supported in C", quote(&s.name)))
            }
            (Language::C, TypeKind::Array(e)) | (Language::C, TypeKind::List(e))
                if types.get(*e).is_container() =>
            {
                Some(format!("nested container {} is not supported in C", quote(&types.display_name(ty))))
            }
            (Language::C, TypeKind::Primitive(PrimitiveKind::FileDescriptor)) if kernel => {
                Some("FileDescriptor is not supported in kernel mode".to_owned())
            }
            (Language::C, TypeKind::Interface(i)) if kernel => {
                Some(format!("interface {} cannot be passed in kernel mode", quote(&i.name)))
            }
            (Language::Java, TypeKind::Union(u)) => {
                Some(format!("union {} is not supported in Java", quote(&u.name)))
            }
            (Language::Java, TypeKind::SharedMemQueue(_)) => {
                Some("SharedMemQueue is not supported in Java".to_owned())
            }
            (Language::Java, TypeKind::Interface(i)) if i.is_callback() => {
                Some(format!("callback interface {} is not supported in Java", quote(&i.name)))
            }
            _ => None,
        };

        match problem {
            Some(message) => {
                self.semantic(pos, message);
                Err(Recover)
            }
            None => Ok(()),
        }
    }

    /// Checks a new type name against everything already visible in this unit.
    fn check_new_name(&mut self, name: &str, pos: Position) -> bool {
        let key = TypeKey::Named {
            namespace: self.ast.namespace,
            name:      name.to_owned(),
        };
        if self.ast.types.contains_key(&key) {
            self.semantic(pos, format!("type {} is declared twice", quote(name)));
            return false;
        }
        true
    }

    /// Custom types only take `full` and `lite`.
    fn check_type_attributes(&mut self, what: &str, attrs: Attributes, pos: Position) {
        if attrs.oneway || attrs.callback {
            self.semantic(
                pos,
                format!("only \"full\" and \"lite\" may be applied to {} declarations", what),
            );
        }
    }

    /// `enum Name [: base] { A [= value], ... };`
    pub(crate) fn parse_enum(&mut self, attrs: Attributes, attrs_pos: Position) -> PResult<()> {
        self.expect(TokenKind::Enum, "\"enum\"")?;
        self.check_type_attributes("enum", attrs, attrs_pos);
        let name_token = self.expect(TokenKind::Identifier, "an enum name")?;
        let pos = position(&name_token);
        let name = name_token.text;
        let fresh = self.check_new_name(&name, pos);

        let mut base = PrimitiveKind::Int;
        if self.eat(TokenKind::Colon) {
            let base_pos = position(self.peek());
            let ty = self.parse_type()?;
            match self.module.types.as_primitive(ty) {
                Some(kind) if kind.is_integral() => base = kind,
                _ => {
                    let spelled = self.module.types.display_name(ty);
                    self.semantic(
                        base_pos,
                        format!("enum base type must be an integer type, not {}", quote(&spelled)),
                    );
                }
            }
        }

        self.expect(TokenKind::BraceOpen, "\"{\"")?;
        let mut members: Vec<EnumMember> = Vec::new();
        let mut next_value: i128 = 0;
        while self.peek_kind() != TokenKind::BraceClose {
            let token = self.peek().clone();
            if token.is(TokenKind::Eof) || token.kind.starts_declaration() {
                return Err(self.unexpected(&token, "\"}\""));
            }
            let member_token = self.expect(TokenKind::Identifier, "an enum member")?;
            let member_pos = position(&member_token);

            let value = if self.eat(TokenKind::Assign) {
                self.parse_enum_value(&members)?
            } else {
                next_value
            };
            if let Some((min, max)) = base.range() {
                if value < min || value > max {
                    self.semantic(
                        member_pos,
                        format!(
                            "value {} of {} does not fit in {}",
                            value,
                            quote(&member_token.text),
                            base.idl_name()
                        ),
                    );
                }
            }
            if members.iter().any(|m| m.name == member_token.text) {
                self.semantic(member_pos, format!("enum member {} is declared twice", quote(&member_token.text)));
            } else {
                members.push(EnumMember {
                    name:  member_token.text.clone(),
                    value,
                    pos:   member_pos,
                });
            }
            // Out-of-range literals are already reported above.
            if let Some(next) = value.checked_add(1) {
                next_value = next;
            }

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::BraceClose, "\",\" or \"}\"")?;
        self.eat(TokenKind::Semicolon);

        if members.is_empty() {
            self.semantic(pos, format!("enum {} has no members", quote(&name)));
        }
        if fresh {
            self.declare(TypeKind::Enum(EnumType {
                name,
                namespace: self.ast.namespace,
                unit: self.ast.name.clone(),
                base,
                members,
                attrs,
                pos,
            }));
        }
        Ok(())
    }

    /// `[-]number` or the name of an earlier member.
    fn parse_enum_value(&mut self, members: &[EnumMember]) -> PResult<i128> {
        let negative = self.eat(TokenKind::Minus);
        let token = self.next();
        match token.kind {
            TokenKind::Number => match parse_number(&token.text) {
                Some(value) if negative => Ok(-value),
                Some(value) => Ok(value),
                None => {
                    self.semantic(position(&token), format!("invalid number {}", quote(&token.text)));
                    Err(Recover)
                }
            },
            TokenKind::Identifier if !negative => match members.iter().find(|m| m.name == token.text) {
                Some(member) => Ok(member.value),
                None => {
                    self.semantic(
                        position(&token),
                        format!("{} does not name an earlier enum member", quote(&token.text)),
                    );
                    Err(Recover)
                }
            },
            _ => Err(self.unexpected(&token, "an enum value")),
        }
    }

    /// `struct Name { Type name; ... };` and the same shape for unions.
    pub(crate) fn parse_struct(&mut self, attrs: Attributes, attrs_pos: Position, union: bool) -> PResult<()> {
        let what = if union { "union" } else { "struct" };
        self.expect(if union { TokenKind::Union } else { TokenKind::Struct }, what)?;
        self.check_type_attributes(what, attrs, attrs_pos);
        let name_token = self.expect(TokenKind::Identifier, "a type name")?;
        let pos = position(&name_token);
        let name = name_token.text;

        if union && self.options.language == Some(Language::Java) {
            self.semantic(pos, format!("union {} is not supported in Java", quote(&name)));
        }
        let fresh = self.check_new_name(&name, pos);

        // Registered before the body so members may refer to the type through containers.
        let body = StructType {
            name:      name.clone(),
            namespace: self.ast.namespace,
            unit:      self.ast.name.clone(),
            members:   Vec::new(),
            attrs,
            pos,
        };
        let id = if fresh {
            Some(self.declare(if union { TypeKind::Union(body) } else { TypeKind::Struct(body) }))
        } else {
            None
        };

        self.expect(TokenKind::BraceOpen, "\"{\"")?;
        let mut members: Vec<Member> = Vec::new();
        let mut seen = IndexSet::new();
        while !self.eat(TokenKind::BraceClose) {
            let token = self.peek().clone();
            if token.is(TokenKind::Eof) || token.kind.starts_declaration() {
                return Err(self.unexpected(&token, "\"}\""));
            }
            match self.parse_member(what) {
                Ok(member) => {
                    if !seen.insert(member.name.clone()) {
                        self.semantic(member.pos, format!("member {} is declared twice", quote(&member.name)));
                    } else {
                        members.push(member);
                    }
                }
                Err(Recover) => self.recover_statement(),
            }
        }
        self.eat(TokenKind::Semicolon);

        if members.is_empty() {
            self.semantic(pos, format!("{} {} has no members", what, quote(&name)));
        }
        if let Some(id) = id {
            match self.module.types.get_mut(id) {
                TypeKind::Struct(s) | TypeKind::Union(s) => s.members = members,
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_member(&mut self, what: &str) -> PResult<Member> {
        let type_pos = position(self.peek());
        let ty = self.parse_type()?;
        if let TypeKind::Interface(interface) = self.module.types.get(ty) {
            let message = format!("interface {} cannot be a {} member", quote(&interface.name), what);
            self.semantic(type_pos, message);
            return Err(Recover);
        }
        let name = self.expect(TokenKind::Identifier, "a member name")?;
        self.expect(TokenKind::Semicolon, "\";\"")?;
        Ok(Member {
            name: name.text.clone(),
            ty,
            pos: position(&name),
        })
    }

    /// Allocates a locally declared type and records it in declaration order.
    fn declare(&mut self, kind: TypeKind) -> TypeId {
        let key = TypeKey::Named {
            namespace: self.ast.namespace,
            name:      kind.name().unwrap_or_default().to_owned(),
        };
        let arena = &mut self.module.types;
        let id = self.ast.intern(arena, key, || kind);
        self.ast.type_definitions.push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::parse_number;

    #[test]
    fn number_literals() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0x1F"), Some(31));
        assert_eq!(parse_number("12abc"), None);
    }
}
