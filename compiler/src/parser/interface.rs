use indexmap::IndexSet;

use crate::{
    ast::{
        Attributes, Direction, InterfaceType, Method, Parameter, PrimitiveKind, TypeKey, TypeKind,
        VERSION_METHOD,
    },
    error::DiagnosticKind,
    options::Language,
    parser::{position, FileParser, PResult, Recover},
    token::TokenKind,
    utils::quote,
};

impl<'p> FileParser<'p> {
    /// `interface Name { [attrs] Method([in|out] Type name, ...); ... }`
    pub(crate) fn parse_interface(&mut self, attrs: Attributes) -> PResult<()> {
        let keyword = self.expect(TokenKind::Interface, "\"interface\"")?;
        let name_token = self.expect(TokenKind::Identifier, "an interface name")?;
        let pos = position(&name_token);
        let name = name_token.text;

        let mut accepted = true;
        if self.ast.interface.is_some() {
            self.error(
                DiagnosticKind::Structural,
                position(&keyword),
                "a file may declare only one interface".to_owned(),
            );
            accepted = false;
        }
        if name != self.ast.name {
            self.semantic(
                pos,
                format!("interface {} must be declared in a file named {}.idl", quote(&name), name),
            );
        }
        if attrs.callback && self.options.language == Some(Language::Java) {
            self.semantic(pos, format!("callback interface {} is not supported in Java", quote(&name)));
        }

        self.expect(TokenKind::BraceOpen, "\"{\"")?;
        let mut methods: Vec<Method> = Vec::new();
        while !self.eat(TokenKind::BraceClose) {
            let token = self.peek().clone();
            if token.is(TokenKind::Eof) || token.kind.starts_declaration() {
                return Err(self.unexpected(&token, "\"}\""));
            }
            match self.parse_method(attrs) {
                Ok(method) => {
                    if method.name == VERSION_METHOD {
                        self.semantic(method.pos, format!("{} is reserved", quote(VERSION_METHOD)));
                    } else if methods.iter().any(|m| m.name == method.name) {
                        self.semantic(method.pos, format!("method {} is declared twice", quote(&method.name)));
                    } else {
                        methods.push(method);
                    }
                }
                Err(Recover) => self.recover_statement(),
            }
        }
        self.eat(TokenKind::Semicolon);

        if methods.is_empty() {
            self.error(
                DiagnosticKind::Structural,
                pos,
                format!("interface {} declares no methods", quote(&name)),
            );
        }
        if !accepted {
            return Ok(());
        }

        let mut interface = InterfaceType {
            name: name.clone(),
            namespace: self.ast.namespace,
            unit: self.ast.name.clone(),
            attrs,
            methods,
            serializable: false,
            pos,
        };
        interface.add_version_method(self.module.types.primitive(PrimitiveKind::UInt), pos);

        let key = TypeKey::Named {
            namespace: self.ast.namespace,
            name,
        };
        let arena = &mut self.module.types;
        let id = self.ast.intern(arena, key, || TypeKind::Interface(interface));
        self.ast.interface = Some(id);
        Ok(())
    }

    fn parse_method(&mut self, interface_attrs: Attributes) -> PResult<Method> {
        let (attrs, attrs_pos) = if self.peek_kind() == TokenKind::BracketOpen {
            self.parse_attributes()?
        } else {
            (Attributes::default(), position(self.peek()))
        };
        if attrs.callback {
            self.semantic(attrs_pos, "\"callback\" cannot be applied to a method".to_owned());
        }

        let name = self.expect(TokenKind::Identifier, "a method name")?;
        let pos = position(&name);
        self.expect(TokenKind::ParenOpen, "\"(\"")?;

        let mut params: Vec<Parameter> = Vec::new();
        let mut seen = IndexSet::new();
        if !self.eat(TokenKind::ParenClose) {
            loop {
                let param = self.parse_parameter()?;
                if !seen.insert(param.name.clone()) {
                    self.semantic(param.pos, format!("parameter {} is declared twice", quote(&param.name)));
                } else {
                    params.push(param);
                }
                let token = self.next();
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::ParenClose => break,
                    _ => return Err(self.unexpected(&token, "\",\" or \")\"")),
                }
            }
        }
        self.expect(TokenKind::Semicolon, "\";\"")?;

        let oneway = interface_attrs.oneway || attrs.oneway;
        if oneway {
            if let Some(out) = params.iter().find(|p| p.is_out()) {
                self.semantic(
                    out.pos,
                    format!(
                        "oneway method {} cannot have out parameter {}",
                        quote(&name.text),
                        quote(&out.name)
                    ),
                );
            }
        }

        Ok(Method {
            name: name.text,
            attrs,
            params,
            pos,
            synthesized: false,
        })
    }

    /// `[in] Type name` or `[out] Type name`.
    fn parse_parameter(&mut self) -> PResult<Parameter> {
        self.expect(TokenKind::BracketOpen, "\"[\"")?;
        let token = self.next();
        let direction = match token.kind {
            TokenKind::In => Direction::In,
            TokenKind::Out => Direction::Out,
            _ => return Err(self.unexpected(&token, "\"in\" or \"out\"")),
        };
        self.expect(TokenKind::BracketClose, "\"]\"")?;

        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "a parameter name")?;
        let pos = position(&name);

        if let Some(target) = self.module.types.as_interface(ty) {
            let target_name = target.name.clone();
            let callback = target.is_callback();
            match (callback, direction) {
                (true, Direction::Out) => self.semantic(
                    pos,
                    format!("callback interface {} can only be an in parameter", quote(&target_name)),
                ),
                (false, Direction::In) => self.semantic(
                    pos,
                    format!("interface {} can only be an out parameter", quote(&target_name)),
                ),
                _ => {}
            }
        }

        Ok(Parameter {
            name: name.text,
            direction,
            ty,
            pos,
        })
    }
}
