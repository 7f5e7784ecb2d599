use std::iter::Peekable;
use std::str::Chars;

use log::debug;

use crate::usda::types::{Attribute, Layer, PrimSpec, Reference, SdfPath, Specifier, Value};
use crate::ParserError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Asset(String),
    PathRef(String),
    Number(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Equals,
    Comma,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                // The `#usda 1.0` header lexes as a comment as well; the
                // reader has validated its presence up front.
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_until(&mut self, terminator: char, description: &'static str) -> Result<String, ParserError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == terminator => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error(format!("unterminated {}", description))),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParserError> {
        self.skip_trivia();

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '=' => Token::Equals,
            ',' => Token::Comma,

            '"' => {
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('n') => text.push('\n'),
                            Some(escaped) => text.push(escaped),
                            None => return Err(self.error("unterminated string literal".to_string())),
                        },
                        Some(other) => text.push(other),
                        None => return Err(self.error("unterminated string literal".to_string())),
                    }
                }
                Token::Str(text)
            }

            '@' => Token::Asset(self.read_until('@', "asset path")?),
            '<' => Token::PathRef(self.read_until('>', "prim path")?),

            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut text = String::from(c);
                while matches!(self.chars.peek(), Some(p) if p.is_ascii_digit() || *p == '.' || *p == 'e' || *p == '-') {
                    text.push(self.bump().unwrap());
                }
                Token::Number(text)
            }

            c if c.is_alphabetic() || c == '_' => {
                let mut text = String::from(c);
                while matches!(self.chars.peek(), Some(p) if p.is_alphanumeric() || *p == '_' || *p == ':') {
                    text.push(self.bump().unwrap());
                }
                Token::Ident(text)
            }

            other => return Err(self.error(format!("unexpected character `{}`", other))),
        };

        Ok(token)
    }

    fn error(&self, reason: String) -> ParserError {
        ParserError::SyntaxError {
            line: self.line,
            reason,
        }
    }
}

pub struct UsdaReader<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> UsdaReader<'a> {
    /// Parses one layer file from its text form.
    pub fn parse_layer(src: &str) -> Result<Layer, ParserError> {
        if src.trim().is_empty() {
            return Err(ParserError::EmptySource);
        }

        let header = src.lines().find(|line| !line.trim().is_empty());
        if !header.is_some_and(|line| line.trim_start().starts_with("#usda")) {
            return Err(ParserError::FormatError {
                reason: "missing #usda header line",
            });
        }

        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        let mut reader = UsdaReader { lexer, current };
        reader.parse_layer_inner()
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, token: Token) -> Result<(), ParserError> {
        if self.current != token {
            return Err(self.error(format!("expected {:?}, found {:?}", token, self.current)));
        }
        self.advance()
    }

    fn expect_ident(&mut self) -> Result<String, ParserError> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Ident(text) => {
                self.advance()?;
                Ok(text)
            }
            other => Err(self.error(format!("expected identifier, found {:?}", other))),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParserError> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Str(text) => {
                self.advance()?;
                Ok(text)
            }
            other => Err(self.error(format!("expected string literal, found {:?}", other))),
        }
    }

    fn error(&self, reason: String) -> ParserError {
        ParserError::SyntaxError {
            line: self.lexer.line,
            reason,
        }
    }

    fn parse_layer_inner(&mut self) -> Result<Layer, ParserError> {
        let mut layer = Layer::default();

        if self.current == Token::LParen {
            self.parse_layer_metadata(&mut layer)?;
        }

        while self.current != Token::Eof {
            let prim = self.parse_prim()?;
            layer.roots.push(prim);
        }

        Ok(layer)
    }

    fn parse_layer_metadata(&mut self, layer: &mut Layer) -> Result<(), ParserError> {
        self.expect(Token::LParen)?;
        while self.current != Token::RParen {
            let key = self.expect_ident()?;
            match key.as_str() {
                "subLayers" => {
                    self.expect(Token::Equals)?;
                    layer.sub_layer_paths = self.parse_asset_list()?;
                }
                "defaultPrim" => {
                    self.expect(Token::Equals)?;
                    layer.default_prim = Some(self.expect_string()?);
                }
                other => {
                    debug!("Skipping unsupported layer metadata `{}`", other);
                    self.skip_metadata_value()?;
                }
            }
        }
        self.expect(Token::RParen)
    }

    fn parse_asset_list(&mut self) -> Result<Vec<String>, ParserError> {
        let mut assets = Vec::new();
        self.expect(Token::LBracket)?;
        loop {
            match std::mem::replace(&mut self.current, Token::Eof) {
                Token::Asset(path) => {
                    self.advance()?;
                    assets.push(path);
                    if self.current == Token::Comma {
                        self.advance()?;
                    }
                }
                Token::RBracket => {
                    self.advance()?;
                    return Ok(assets);
                }
                other => return Err(self.error(format!("expected asset path, found {:?}", other))),
            }
        }
    }

    fn parse_prim(&mut self) -> Result<PrimSpec, ParserError> {
        let specifier_word = self.expect_ident()?;
        let specifier = match specifier_word.as_str() {
            "def" => Specifier::Def,
            "class" => Specifier::Class,
            "over" => Specifier::Over,
            other => return Err(self.error(format!("expected prim specifier, found `{}`", other))),
        };

        let type_name = match &self.current {
            Token::Ident(_) => Some(self.expect_ident()?),
            _ => None,
        };
        let name = self.expect_string()?;

        let mut prim = PrimSpec {
            specifier,
            type_name,
            name,
            ..Default::default()
        };

        if self.current == Token::LParen {
            self.parse_prim_metadata(&mut prim)?;
        }

        self.expect(Token::LBrace)?;
        while self.current != Token::RBrace {
            self.parse_prim_member(&mut prim)?;
        }
        self.expect(Token::RBrace)?;

        Ok(prim)
    }

    fn parse_prim_metadata(&mut self, prim: &mut PrimSpec) -> Result<(), ParserError> {
        self.expect(Token::LParen)?;
        while self.current != Token::RParen {
            let mut key = self.expect_ident()?;
            // List-op qualifiers don't change how we store the entries: a
            // freshly parsed spec has exactly the authored items.
            if matches!(key.as_str(), "prepend" | "append" | "add" | "delete") {
                key = self.expect_ident()?;
            }

            match key.as_str() {
                "references" => {
                    self.expect(Token::Equals)?;
                    prim.references = self.parse_reference_items()?;
                }
                "apiSchemas" => {
                    self.expect(Token::Equals)?;
                    prim.api_schemas = self.parse_string_list()?;
                }
                other => {
                    debug!("Skipping unsupported prim metadata `{}`", other);
                    self.skip_metadata_value()?;
                }
            }
        }
        self.expect(Token::RParen)
    }

    fn parse_reference_items(&mut self) -> Result<Vec<Reference>, ParserError> {
        if self.current != Token::LBracket {
            return Ok(vec![self.parse_reference_item()?]);
        }

        let mut references = Vec::new();
        self.advance()?;
        while self.current != Token::RBracket {
            references.push(self.parse_reference_item()?);
            if self.current == Token::Comma {
                self.advance()?;
            }
        }
        self.advance()?;
        Ok(references)
    }

    fn parse_reference_item(&mut self) -> Result<Reference, ParserError> {
        let asset_path = match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Asset(path) => {
                self.advance()?;
                path
            }
            other => return Err(self.error(format!("expected asset path, found {:?}", other))),
        };

        let prim_path = match std::mem::replace(&mut self.current, Token::Eof) {
            Token::PathRef(path) => {
                self.advance()?;
                Some(SdfPath::new(path))
            }
            other => {
                self.current = other;
                None
            }
        };

        Ok(Reference {
            asset_path,
            prim_path,
        })
    }

    fn parse_string_list(&mut self) -> Result<Vec<String>, ParserError> {
        let mut strings = Vec::new();
        self.expect(Token::LBracket)?;
        while self.current != Token::RBracket {
            strings.push(self.expect_string()?);
            if self.current == Token::Comma {
                self.advance()?;
            }
        }
        self.advance()?;
        Ok(strings)
    }

    fn parse_path_list(&mut self) -> Result<Vec<SdfPath>, ParserError> {
        if let Token::PathRef(path) = &self.current {
            let target = SdfPath::new(path.clone());
            self.advance()?;
            return Ok(vec![target]);
        }

        let mut targets = Vec::new();
        self.expect(Token::LBracket)?;
        while self.current != Token::RBracket {
            match std::mem::replace(&mut self.current, Token::Eof) {
                Token::PathRef(path) => {
                    self.advance()?;
                    targets.push(SdfPath::new(path));
                    if self.current == Token::Comma {
                        self.advance()?;
                    }
                }
                other => return Err(self.error(format!("expected prim path, found {:?}", other))),
            }
        }
        self.advance()?;
        Ok(targets)
    }

    fn parse_prim_member(&mut self, prim: &mut PrimSpec) -> Result<(), ParserError> {
        let Token::Ident(word) = &self.current else {
            return Err(self.error(format!("expected prim member, found {:?}", self.current)));
        };

        if matches!(word.as_str(), "def" | "class" | "over") {
            let child = self.parse_prim()?;
            prim.children.push(child);
            return Ok(());
        }

        let mut first = self.expect_ident()?;
        let mut custom = false;
        if first == "custom" {
            custom = true;
            first = self.expect_ident()?;
        }
        if matches!(first.as_str(), "prepend" | "append" | "add" | "delete") {
            first = self.expect_ident()?;
        }

        if first == "rel" {
            let name = self.expect_ident()?;
            let mut targets = Vec::new();
            if self.current == Token::Equals {
                self.advance()?;
                targets = self.parse_path_list()?;
            }
            let entry = prim.relationships.entry(name).or_insert_with(Vec::new);
            for target in targets {
                if !entry.contains(&target) {
                    entry.push(target);
                }
            }
            return Ok(());
        }

        // Attribute: `[custom] <type> <name> [= value]`
        let mut type_name = first;
        if type_name == "uniform" {
            let base = self.expect_ident()?;
            type_name = format!("uniform {}", base);
        }
        let name = self.expect_ident()?;
        let mut value = None;
        if self.current == Token::Equals {
            self.advance()?;
            value = Some(self.parse_value()?);
        }
        prim.attributes.insert(
            name,
            Attribute {
                type_name,
                custom,
                value,
            },
        );
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value, ParserError> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Str(text) => {
                self.advance()?;
                Ok(Value::Str(text))
            }
            Token::Asset(path) => {
                self.advance()?;
                Ok(Value::Asset(path))
            }
            Token::Number(raw) => {
                self.advance()?;
                self.parse_number(&raw)
            }
            Token::Ident(word) => {
                self.advance()?;
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    other => Ok(Value::Token(other.to_string())),
                }
            }
            Token::LParen => {
                self.current = Token::LParen;
                self.advance()?;
                let mut elements = Vec::new();
                while self.current != Token::RParen {
                    elements.push(self.parse_value()?);
                    if self.current == Token::Comma {
                        self.advance()?;
                    }
                }
                self.advance()?;
                Ok(Value::Tuple(elements))
            }
            Token::LBracket => {
                self.current = Token::LBracket;
                self.advance()?;
                let mut elements = Vec::new();
                while self.current != Token::RBracket {
                    elements.push(self.parse_value()?);
                    if self.current == Token::Comma {
                        self.advance()?;
                    }
                }
                self.advance()?;
                Ok(Value::List(elements))
            }
            other => Err(self.error(format!("expected a value, found {:?}", other))),
        }
    }

    fn parse_number(&self, raw: &str) -> Result<Value, ParserError> {
        if raw.contains('.') || raw.contains('e') {
            raw.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error(format!("invalid number literal `{}`", raw)))
        } else {
            raw.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.error(format!("invalid number literal `{}`", raw)))
        }
    }

    /// Consumes the `= value` of a metadata entry we don't model, including
    /// dictionary values with nested braces.
    fn skip_metadata_value(&mut self) -> Result<(), ParserError> {
        if self.current != Token::Equals {
            return Ok(());
        }
        self.advance()?;

        if self.current == Token::LBrace {
            let mut depth = 0usize;
            loop {
                match &self.current {
                    Token::LBrace => depth += 1,
                    Token::RBrace => {
                        depth -= 1;
                        if depth == 0 {
                            return self.advance();
                        }
                    }
                    Token::Eof => return Err(self.error("unterminated dictionary".to_string())),
                    _ => {}
                }
                self.advance()?;
            }
        }

        self.parse_value().map(|_| ())
    }
}
