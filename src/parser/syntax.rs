//! Recursive-descent parser for the state-machine subset of SysMLv2.
//!
//! Only the constructs that carry state-machine behaviour are turned into
//! [`Member`]s. Any other statement is skipped structurally, up to its `;`
//! or the end of its `{ … }` body, so ordinary models parse without errors.

use super::lexer::{Token, TokenKind, tokenize};
use crate::error::ParseError;
use crate::model::*;

/// Keywords that cannot be used as plain names.
const RESERVED: &[&str] = &[
    "about", "abstract", "accept", "action", "actor", "after", "alias", "all", "allocate",
    "allocation", "analysis", "and", "as", "assert", "assign", "assume", "at", "attribute",
    "bind", "binding", "by", "calc", "case", "comment", "concern", "connect", "connection",
    "constraint", "decide", "def", "default", "defined", "dependency", "derived", "do", "doc",
    "else", "end", "entry", "enum", "event", "exhibit", "exit", "expose", "false", "filter",
    "first", "flow", "for", "fork", "frame", "from", "hastype", "if", "implies", "import", "in",
    "include", "individual", "inout", "interface", "istype", "item", "join", "language",
    "library", "locale", "loop", "merge", "message", "metadata", "nonunique", "not", "null",
    "objective", "occurrence", "of", "or", "ordered", "out", "package", "parallel", "part",
    "perform", "port", "private", "protected", "public", "redefines", "ref", "references",
    "render", "rendering", "rep", "require", "requirement", "return", "satisfy", "send",
    "snapshot", "specializes", "stakeholder", "standard", "state", "subject", "subsets",
    "succession", "terminate", "then", "timeslice", "to", "transition", "true", "until", "use",
    "variant", "variation", "verification", "verify", "via", "view", "viewpoint", "when",
    "while", "xor",
];

/// Kind keywords that introduce a `<kind> def Name` definition.
const DEFINITION_KINDS: &[&str] = &[
    "attribute", "item", "part", "port", "action", "occurrence", "enum", "connection",
    "interface", "allocation", "requirement", "constraint", "calc", "case", "analysis",
    "verification", "view", "viewpoint", "rendering", "metadata", "concern", "flow",
];

/// Member prefixes that carry no meaning for conversion.
const PREFIXES: &[&str] = &[
    "public", "private", "protected", "abstract", "variation", "individual", "derived",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parse SysMLv2 text into the members of one file.
pub fn parse_str(text: &str, path: &str) -> Result<ModelFile, ParseError> {
    let tokens = tokenize(text, path)?;
    let mut parser = Parser {
        text,
        path,
        tokens,
        pos: 0,
    };
    let members = parser.parse_members(false)?;
    Ok(ModelFile {
        path: path.to_string(),
        members,
    })
}

struct Parser<'a> {
    text: &'a str,
    path: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    // ── token access ────────────────────────────────────────────────────────

    fn skip_trivia(&mut self) {
        while matches!(self.tokens[self.pos].kind, TokenKind::BlockComment(_)) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> &Token {
        self.skip_trivia();
        &self.tokens[self.pos]
    }

    /// The `n`-th significant token after the current one.
    fn peek_nth(&mut self, n: usize) -> &Token {
        self.skip_trivia();
        let mut idx = self.pos;
        let mut seen = 0;
        while seen < n && idx + 1 < self.tokens.len() {
            idx += 1;
            if !matches!(self.tokens[idx].kind, TokenKind::BlockComment(_)) {
                seen += 1;
            }
        }
        &self.tokens[idx]
    }

    fn bump(&mut self) -> Token {
        self.skip_trivia();
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn at_keyword(&mut self, kw: &str) -> bool {
        self.peek().is_keyword(kw)
    }

    fn at_symbol(&mut self, sym: &str) -> bool {
        self.peek().is_symbol(sym)
    }

    fn at_eof(&mut self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        if self.at_symbol(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<Token, ParseError> {
        if self.at_symbol(sym) {
            Ok(self.bump())
        } else {
            let tok = self.peek().clone();
            Err(self.error_at(&tok, format!("expected '{}', found {}", sym, describe(&tok))))
        }
    }

    /// True if the next token can start a name (not a keyword).
    fn at_name(&mut self) -> bool {
        match &self.peek().kind {
            TokenKind::Name(_) => true,
            TokenKind::Ident(s) => !is_reserved(s),
            _ => false,
        }
    }

    fn span(&mut self) -> Span {
        let tok = self.peek();
        Span {
            line: tok.line,
            column: tok.column,
        }
    }

    fn error_at(&self, tok: &Token, message: String) -> ParseError {
        ParseError {
            path: self.path.to_string(),
            line: tok.line,
            column: tok.column,
            message,
        }
    }

    // ── names ───────────────────────────────────────────────────────────────

    /// `[<short>] [name]`. Returns the declared name, if any.
    fn identification(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat_symbol("<") {
            while !self.eat_symbol(">") {
                if self.at_eof() {
                    let tok = self.peek().clone();
                    return Err(self.error_at(&tok, "unterminated short name".to_string()));
                }
                self.bump();
            }
        }
        if self.at_name() {
            Ok(self.bump().name().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    fn qualified_name(&mut self) -> Result<QualifiedName, ParseError> {
        let mut parts = Vec::new();
        loop {
            let tok = self.bump();
            match tok.name() {
                Some(name) => parts.push(name.to_string()),
                None => {
                    return Err(self.error_at(&tok, format!("expected name, found {}", describe(&tok))));
                }
            }
            if !(self.eat_symbol("::") || self.eat_symbol(".")) {
                break;
            }
        }
        Ok(QualifiedName(parts))
    }

    /// Comma separated list of qualified names.
    fn qualified_names(&mut self) -> Result<Vec<QualifiedName>, ParseError> {
        let mut out = vec![self.qualified_name()?];
        while self.eat_symbol(",") {
            out.push(self.qualified_name()?);
        }
        Ok(out)
    }

    // ── structural skipping ─────────────────────────────────────────────────

    /// Consume a balanced `{ … }` block. The opening brace must be next.
    fn skip_block(&mut self) -> Result<(), ParseError> {
        let open = self.expect_symbol("{")?;
        let mut depth = 1usize;
        while depth > 0 {
            let tok = self.bump();
            match &tok.kind {
                TokenKind::Eof => {
                    return Err(self.error_at(&open, "unbalanced '{'".to_string()));
                }
                TokenKind::Symbol("{") => depth += 1,
                TokenKind::Symbol("}") => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Skip the rest of a statement: up to and including `;`, or through the
    /// end of its body block. Stops before a closing `}` of the enclosing body.
    fn skip_statement(&mut self) -> Result<(), ParseError> {
        loop {
            if self.at_eof() || self.at_symbol("}") {
                return Ok(());
            }
            if self.at_symbol("{") {
                return self.skip_block();
            }
            if self.bump().is_symbol(";") {
                return Ok(());
            }
        }
    }

    /// Skip declaration tokens until the body or end of a declaration.
    /// Returns true when a `{` body follows (not consumed).
    fn skip_to_body(&mut self) -> bool {
        loop {
            if self.at_symbol("{") {
                return true;
            }
            if self.at_eof() || self.at_symbol("}") {
                return false;
            }
            if self.bump().is_symbol(";") {
                return false;
            }
        }
    }

    /// `doc`, `comment`, `rep` and friends: everything up to and including the
    /// comment body.
    fn skip_annotation(&mut self) {
        self.bump();
        loop {
            let tok = &self.tokens[self.pos];
            match &tok.kind {
                TokenKind::BlockComment(_) => {
                    self.pos += 1;
                    break;
                }
                TokenKind::Eof | TokenKind::Symbol("}") => break,
                TokenKind::Symbol(";") => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.eat_symbol(";");
    }

    /// Source text of an expression, stopping before any of `stop_keywords`
    /// or a `;`, `{` or `}` at nesting depth zero.
    fn expression_text(&mut self, stop_keywords: &[&str]) -> Result<String, ParseError> {
        let first = self.peek().clone();
        let mut last_end = first.start;
        let mut depth = 0usize;
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::Eof => break,
                TokenKind::Symbol("(") | TokenKind::Symbol("[") => depth += 1,
                TokenKind::Symbol(")") | TokenKind::Symbol("]") => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Symbol(";") | TokenKind::Symbol("{") | TokenKind::Symbol("}")
                    if depth == 0 =>
                {
                    break;
                }
                TokenKind::Ident(kw) if depth == 0 && stop_keywords.contains(&kw.as_str()) => {
                    break;
                }
                _ => {}
            }
            last_end = tok.end;
            self.bump();
        }
        if last_end <= first.start {
            return Err(self.error_at(&first, "expected expression".to_string()));
        }
        Ok(self.text[first.start..last_end].trim().to_string())
    }

    fn skip_prefixes(&mut self) -> Result<(), ParseError> {
        loop {
            let is_prefix = self
                .peek()
                .ident()
                .is_some_and(|kw| PREFIXES.contains(&kw));
            if is_prefix {
                self.bump();
            } else if self.at_symbol("#") {
                // metadata prefix: `#logical part def …`
                self.bump();
                self.qualified_name()?;
            } else {
                return Ok(());
            }
        }
    }

    // ── namespaces ──────────────────────────────────────────────────────────

    /// Members of a namespace. With `braced`, the closing `}` is consumed.
    fn parse_members(&mut self, braced: bool) -> Result<Vec<Member>, ParseError> {
        let mut members = Vec::new();
        loop {
            if self.at_eof() {
                if braced {
                    let tok = self.peek().clone();
                    return Err(self.error_at(&tok, "expected '}' before end of file".to_string()));
                }
                return Ok(members);
            }
            if self.at_symbol("}") {
                let tok = self.bump();
                if braced {
                    return Ok(members);
                }
                return Err(self.error_at(&tok, "unexpected '}'".to_string()));
            }
            if let Some(member) = self.parse_member()? {
                members.push(member);
            }
        }
    }

    fn parse_member(&mut self) -> Result<Option<Member>, ParseError> {
        self.skip_prefixes()?;
        let kw = match self.peek().ident() {
            Some(kw) => kw.to_string(),
            None => {
                self.skip_statement()?;
                return Ok(None);
            }
        };
        match kw.as_str() {
            "doc" | "comment" | "rep" | "language" => {
                self.skip_annotation();
                Ok(None)
            }
            "standard" | "library" => {
                self.bump();
                self.eat_keyword("library");
                if self.at_keyword("package") {
                    self.parse_package().map(Some)
                } else {
                    self.skip_statement()?;
                    Ok(None)
                }
            }
            "package" => self.parse_package().map(Some),
            "import" => {
                self.bump();
                let text = self.expression_text(&[])?;
                self.eat_symbol(";");
                Ok(Some(Member::Import(text)))
            }
            "state" if self.peek_nth(1).is_keyword("def") => {
                self.parse_state_definition().map(|d| Some(Member::StateDefinition(d)))
            }
            "state" => self.parse_machine_usage(),
            "exhibit" if self.peek_nth(1).is_keyword("state") => {
                self.bump();
                self.parse_machine_usage()
            }
            kind if DEFINITION_KINDS.contains(&kind) && self.peek_nth(1).is_keyword("def") => {
                self.parse_definition().map(|d| Some(Member::Definition(d)))
            }
            kind if DEFINITION_KINDS.contains(&kind) => self.parse_usage(),
            _ => {
                self.skip_statement()?;
                Ok(None)
            }
        }
    }

    fn parse_package(&mut self) -> Result<Member, ParseError> {
        let span = self.span();
        let kw = self.bump();
        let name = self
            .identification()?
            .ok_or_else(|| self.error_at(&kw, "package requires a name".to_string()))?;
        let members = if self.skip_to_body() {
            self.bump();
            self.parse_members(true)?
        } else {
            Vec::new()
        };
        Ok(Member::Package(Package {
            name,
            members,
            span,
        }))
    }

    fn parse_definition(&mut self) -> Result<Definition, ParseError> {
        let span = self.span();
        let kind_tok = self.bump();
        self.bump(); // def
        let kind = DefinitionKind::from_keyword(kind_tok.ident().unwrap_or_default());
        let name = self
            .identification()?
            .ok_or_else(|| self.error_at(&kind_tok, format!("{} requires a name", kind)))?;
        let specializes = self.specializations()?;
        let members = if self.skip_to_body() {
            self.bump();
            self.parse_members(true)?
        } else {
            Vec::new()
        };
        Ok(Definition {
            kind,
            name,
            specializes,
            members,
            span,
        })
    }

    /// `<kind> [name] [: Type] … (; | { members })`. Usages without a body
    /// cannot own a state machine and are dropped.
    fn parse_usage(&mut self) -> Result<Option<Member>, ParseError> {
        let span = self.span();
        let kw = self.bump();
        let keyword = kw.ident().unwrap_or_default().to_string();
        let name = self.identification()?;
        let typed_by = if self.at_symbol(":") && self.peek_nth(1).name().is_some() {
            self.typing()?
        } else {
            None
        };
        if !self.skip_to_body() {
            return Ok(None);
        }
        self.bump();
        let members = self.parse_members(true)?;
        Ok(Some(Member::Usage(Usage {
            keyword,
            name,
            typed_by,
            members,
            span,
        })))
    }

    /// `:> A, B` or `specializes A, B`; other declaration parts are left for
    /// [`Parser::skip_to_body`].
    fn specializations(&mut self) -> Result<Vec<QualifiedName>, ParseError> {
        let mut out = Vec::new();
        while self.eat_symbol(":>") || self.eat_keyword("specializes") {
            out.extend(self.qualified_names()?);
        }
        Ok(out)
    }

    /// Feature typing after `:` or `defined by`.
    fn typing(&mut self) -> Result<Option<QualifiedName>, ParseError> {
        if self.eat_symbol(":") {
            return Ok(Some(self.qualified_name()?));
        }
        if self.at_keyword("defined") && self.peek_nth(1).is_keyword("by") {
            self.bump();
            self.bump();
            return Ok(Some(self.qualified_name()?));
        }
        Ok(None)
    }

    // ── state machines ──────────────────────────────────────────────────────

    fn parse_state_definition(&mut self) -> Result<StateDefinition, ParseError> {
        let span = self.span();
        let kw = self.bump(); // state
        self.bump(); // def
        let name = self
            .identification()?
            .ok_or_else(|| self.error_at(&kw, "state def requires a name".to_string()))?;
        let typed_by = self.specializations()?.into_iter().next();
        let body = if self.skip_to_body() {
            self.parse_state_body()?
        } else {
            StateBody::default()
        };
        Ok(StateDefinition {
            name,
            is_usage: false,
            typed_by,
            body,
            span,
        })
    }

    /// A state usage in a namespace. Only a named usage with a body is a
    /// machine of its own; `state s : Machine;` is skipped.
    fn parse_machine_usage(&mut self) -> Result<Option<Member>, ParseError> {
        let span = self.span();
        self.bump(); // state
        let name = self.identification()?;
        let typed_by = self.typing()?;
        if !self.skip_to_body() {
            return Ok(None);
        }
        let body = self.parse_state_body()?;
        Ok(name.map(|name| {
            Member::StateDefinition(StateDefinition {
                name,
                is_usage: true,
                typed_by,
                body,
                span,
            })
        }))
    }

    /// Body of a state definition or usage, starting at `{`.
    fn parse_state_body(&mut self) -> Result<StateBody, ParseError> {
        let open = self.expect_symbol("{")?;
        let mut body = StateBody::default();
        let mut last_state: Option<String> = None;
        loop {
            self.skip_prefixes()?;
            if self.at_eof() {
                return Err(self.error_at(&open, "unbalanced '{'".to_string()));
            }
            if self.eat_symbol("}") {
                return Ok(body);
            }
            let kw = self.peek().ident().unwrap_or_default().to_string();
            match kw.as_str() {
                "doc" | "comment" | "rep" | "language" => self.skip_annotation(),
                "entry" => body.entry = Some(self.parse_entry_action()?),
                "exit" => body.exit = Some(self.parse_action_statement()?),
                "do" => body.do_action = Some(self.parse_action_statement()?),
                "state" if !self.peek_nth(1).is_keyword("def") => {
                    let state = self.parse_state_usage()?;
                    last_state = state.name.clone();
                    body.states.push(state);
                }
                "transition" => body.transitions.push(self.parse_transition(None)?),
                "accept" => {
                    let source = last_state.clone().map(QualifiedName::simple);
                    body.transitions.push(self.parse_transition(source)?);
                }
                _ => self.skip_statement()?,
            }
        }
    }

    /// `entry [action] [name] (; | { … })` optionally followed by the
    /// `then initial;` succession.
    fn parse_entry_action(&mut self) -> Result<EntryAction, ParseError> {
        let span = self.span();
        self.bump(); // entry
        self.eat_keyword("action");
        let name = self.identification()?;
        if self.skip_to_body() {
            self.skip_block()?;
        }
        let mut initial = None;
        if self.eat_keyword("then") {
            initial = Some(self.qualified_name()?);
            self.eat_symbol(";");
        }
        Ok(EntryAction {
            name,
            initial,
            span,
        })
    }

    /// `do`/`exit` member of a state body.
    fn parse_action_statement(&mut self) -> Result<ActionRef, ParseError> {
        self.bump();
        let action = self.action_ref()?;
        if self.skip_to_body() {
            self.skip_block()?;
        }
        Ok(action)
    }

    /// `[action] name [: Type]` or a bare reference `name`.
    fn action_ref(&mut self) -> Result<ActionRef, ParseError> {
        if self.eat_keyword("action") {
            let declared_name = self.identification()?;
            let reference = self.typing()?;
            return Ok(ActionRef {
                declared_name,
                reference,
            });
        }
        let reference = if self.at_name() {
            Some(self.qualified_name()?)
        } else {
            None
        };
        Ok(ActionRef {
            declared_name: None,
            reference,
        })
    }

    fn parse_state_usage(&mut self) -> Result<StateUsage, ParseError> {
        let span = self.span();
        self.bump(); // state
        let name = self.identification()?;
        let typed_by = self.typing()?;
        let mut parallel = false;
        loop {
            if self.eat_keyword("parallel") {
                parallel = true;
                continue;
            }
            if self.at_symbol("{") || self.at_symbol(";") || self.at_symbol("}") || self.at_eof() {
                break;
            }
            self.bump();
        }
        let body = if self.at_symbol("{") {
            self.parse_state_body()?
        } else {
            self.eat_symbol(";");
            StateBody::default()
        };
        Ok(StateUsage {
            name,
            typed_by,
            parallel,
            body,
            span,
        })
    }

    /// `transition [name] [first src] [accept …] [if …] [do …] then tgt;`
    /// and the `accept … then tgt;` shorthand, whose source is passed in.
    fn parse_transition(
        &mut self,
        default_source: Option<QualifiedName>,
    ) -> Result<TransitionUsage, ParseError> {
        let span = self.span();
        let mut name = None;
        if self.eat_keyword("transition") {
            name = self.identification()?;
            self.typing()?;
        }
        let mut source = default_source;
        if self.eat_keyword("first") {
            source = Some(self.qualified_name()?);
        }
        let trigger = if self.eat_keyword("accept") {
            Some(self.trigger()?)
        } else {
            None
        };
        let guard = if self.eat_keyword("if") {
            Some(self.expression_text(&["do", "then"])?)
        } else {
            None
        };
        let effect = if self.eat_keyword("do") {
            let action = self.action_ref()?;
            while !(self.at_keyword("then") || self.at_symbol(";") || self.at_symbol("}") || self.at_eof()) {
                if self.at_symbol("{") {
                    self.skip_block()?;
                } else {
                    self.bump();
                }
            }
            Some(action)
        } else {
            None
        };
        let target = if self.eat_keyword("then") {
            Some(self.qualified_name()?)
        } else {
            None
        };
        if self.skip_to_body() {
            self.skip_block()?;
        }
        Ok(TransitionUsage {
            name,
            source,
            trigger,
            guard,
            effect,
            target,
            span,
        })
    }

    /// Everything after `accept`.
    fn trigger(&mut self) -> Result<Trigger, ParseError> {
        const STOP: &[&str] = &["via", "if", "do", "then"];
        if self.eat_keyword("when") {
            return Ok(Trigger::When(self.expression_text(STOP)?));
        }
        if self.eat_keyword("at") {
            return Ok(Trigger::At(self.expression_text(STOP)?));
        }
        if self.eat_keyword("after") {
            return Ok(Trigger::After(self.expression_text(STOP)?));
        }
        let mut payload_name = None;
        let mut payload_type = None;
        if self.at_name() {
            let first = self.qualified_name()?;
            if self.eat_symbol(":") {
                payload_name = Some(first.name().to_string());
                payload_type = Some(self.qualified_name()?);
            } else if first.is_simple() {
                payload_name = Some(first.name().to_string());
            } else {
                payload_type = Some(first);
            }
        } else if self.eat_symbol(":") {
            payload_type = Some(self.qualified_name()?);
        }
        let via = if self.eat_keyword("via") {
            Some(self.qualified_name()?)
        } else {
            None
        };
        Ok(Trigger::Accept {
            payload_name,
            payload_type,
            via,
        })
    }
}

fn describe(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::Ident(s) => format!("'{}'", s),
        TokenKind::Name(s) => format!("'{}'", s),
        TokenKind::Str(s) => format!("string \"{}\"", s),
        TokenKind::Number(s) => format!("number {}", s),
        TokenKind::Symbol(s) => format!("'{}'", s),
        TokenKind::BlockComment(_) => "comment".to_string(),
        TokenKind::Eof => "end of file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(text: &str) -> StateDefinition {
        let file = parse_str(text, "<test>").unwrap();
        file.members
            .into_iter()
            .find_map(|m| match m {
                Member::StateDefinition(d) => Some(d),
                _ => None,
            })
            .expect("state machine")
    }

    #[test]
    fn guard_text_is_taken_from_source() {
        let sm = machine(
            "state def M { state a; state b;
               transition t first a accept E if (level > 3) and ok then b; }",
        );
        assert_eq!(sm.body.transitions[0].guard.as_deref(), Some("(level > 3) and ok"));
    }

    #[test]
    fn accept_shorthand_uses_previous_state_as_source() {
        let sm = machine("state def M { entry; then a; state a; accept Go then b; state b; }");
        let t = &sm.body.transitions[0];
        assert_eq!(t.name, None);
        assert_eq!(t.source, Some(QualifiedName::simple("a")));
        assert_eq!(t.target, Some(QualifiedName::simple("b")));
    }

    #[test]
    fn skipped_statements_do_not_swallow_states() {
        let sm = machine(
            "state def M {
               attribute count : Integer = 0;
               ref part owner { attribute x; }
               state a;
             }",
        );
        assert_eq!(sm.body.states.len(), 1);
    }

    #[test]
    fn unbalanced_body_reports_opening_brace() {
        let err = parse_str("package P {\n  state def M {\n", "m.sysml").unwrap_err();
        assert_eq!(err.path, "m.sysml");
        assert!(err.message.contains("'}'") || err.message.contains("unbalanced"));
    }
}
