use serde::{Deserialize, Serialize};
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────
// Model – binary serialization wrapper
// ────────────────────────────────────────────────────────────────────────────

const BINARY_MAGIC: &[u8; 8] = b"SYSMLV2X";
const BINARY_VERSION: u32 = 1;

/// A parsed SysMLv2 model: one entry per source file, in the order the files
/// were given to the parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    pub files: Vec<ModelFile>,
}

impl Model {
    /// Save the model to a binary file with magic bytes and versioning.
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, BINARY_MAGIC)?;
        std::io::Write::write_all(&mut writer, &BINARY_VERSION.to_le_bytes())?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }

    /// Load a model from a binary file, checking magic bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 8];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if &magic != BINARY_MAGIC {
            anyhow::bail!("Invalid magic bytes: expected 'SYSMLV2X'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != BINARY_VERSION {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let model: Model =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(model)
    }

    /// All state machines in the model, depth first, with their qualified names.
    pub fn state_machines(&self) -> Vec<StateMachineRef<'_>> {
        let mut out = Vec::new();
        for file in &self.files {
            collect_machines(&file.members, &mut Vec::new(), &mut out);
        }
        out
    }
}

fn collect_machines<'a>(
    members: &'a [Member],
    scope: &mut Vec<String>,
    out: &mut Vec<StateMachineRef<'a>>,
) {
    for member in members {
        match member {
            Member::Package(pkg) => {
                scope.push(pkg.name.clone());
                collect_machines(&pkg.members, scope, out);
                scope.pop();
            }
            Member::Definition(def) => {
                scope.push(def.name.clone());
                collect_machines(&def.members, scope, out);
                scope.pop();
            }
            Member::Usage(usage) => match usage.name {
                Some(ref name) => {
                    scope.push(name.clone());
                    collect_machines(&usage.members, scope, out);
                    scope.pop();
                }
                None => collect_machines(&usage.members, scope, out),
            },
            Member::StateDefinition(machine) => out.push(StateMachineRef {
                scope: scope.clone(),
                machine,
            }),
            Member::Import(_) => {}
        }
    }
}

/// A state machine together with the namespace path that encloses it.
#[derive(Debug, Clone)]
pub struct StateMachineRef<'a> {
    /// Enclosing package and definition names, outermost first.
    pub scope: Vec<String>,
    pub machine: &'a StateDefinition,
}

impl<'a> StateMachineRef<'a> {
    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = self.scope.iter().map(|s| s.as_str()).collect();
        parts.push(&self.machine.name);
        parts.join("::")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Files, packages and definitions
// ────────────────────────────────────────────────────────────────────────────

/// Top-level members of a single `.sysml` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelFile {
    pub path: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Package(Package),
    Definition(Definition),
    StateDefinition(StateDefinition),
    /// A usage with a body, such as `part lamp : Lamp { … }`.
    Usage(Usage),
    /// `import A::B::*;` kept as written.
    Import(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub members: Vec<Member>,
    pub span: Span,
}

/// Kind keyword in front of `def`. State definitions are not listed here,
/// they have their own [`StateDefinition`] member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    Attribute,
    Item,
    Part,
    Port,
    Action,
    Occurrence,
    Enum,
    Other(String),
}

impl DefinitionKind {
    pub fn from_keyword(kw: &str) -> Self {
        match kw {
            "attribute" => DefinitionKind::Attribute,
            "item" => DefinitionKind::Item,
            "part" => DefinitionKind::Part,
            "port" => DefinitionKind::Port,
            "action" => DefinitionKind::Action,
            "occurrence" => DefinitionKind::Occurrence,
            "enum" => DefinitionKind::Enum,
            other => DefinitionKind::Other(other.to_string()),
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            DefinitionKind::Attribute => "attribute",
            DefinitionKind::Item => "item",
            DefinitionKind::Part => "part",
            DefinitionKind::Port => "port",
            DefinitionKind::Action => "action",
            DefinitionKind::Occurrence => "occurrence",
            DefinitionKind::Enum => "enum",
            DefinitionKind::Other(kw) => kw,
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} def", self.keyword())
    }
}

/// A non-state definition such as `attribute def TurnOn;` or `part def Lamp { … }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    /// Targets of `:>` / `specializes`.
    pub specializes: Vec<QualifiedName>,
    /// Nested members; only packages, definitions and state machines are kept.
    pub members: Vec<Member>,
    pub span: Span,
}

/// A feature usage whose body was walked for nested members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Kind keyword: `part`, `item`, `action`, ...
    pub keyword: String,
    pub name: Option<String>,
    pub typed_by: Option<QualifiedName>,
    pub members: Vec<Member>,
    pub span: Span,
}

// ────────────────────────────────────────────────────────────────────────────
// State machines
// ────────────────────────────────────────────────────────────────────────────

/// A state machine: either `state def Name { … }` or a state usage with a
/// body declared directly in a namespace (`exhibit state s { … }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub name: String,
    pub is_usage: bool,
    pub typed_by: Option<QualifiedName>,
    pub body: StateBody,
    pub span: Span,
}

/// Members of a state definition or state usage body that matter for
/// behaviour. Everything else in the body is skipped by the parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateBody {
    pub entry: Option<EntryAction>,
    pub exit: Option<ActionRef>,
    pub do_action: Option<ActionRef>,
    pub states: Vec<StateUsage>,
    pub transitions: Vec<TransitionUsage>,
}

/// `entry [action name] ; then initial;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryAction {
    pub name: Option<String>,
    /// Target of the succession that directly follows the entry action.
    pub initial: Option<QualifiedName>,
    pub span: Span,
}

/// Reference or declaration of an action in `do`, `exit` or a transition effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    /// Name given by `action name`.
    pub declared_name: Option<String>,
    /// Action the usage is typed by (`action a : Blink`) or refers to (`do blink`).
    pub reference: Option<QualifiedName>,
}

impl ActionRef {
    /// Declared name, falling back to the referenced action's name.
    pub fn display_name(&self) -> Option<&str> {
        self.declared_name
            .as_deref()
            .or_else(|| self.reference.as_ref().map(|r| r.name()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUsage {
    pub name: Option<String>,
    pub typed_by: Option<QualifiedName>,
    pub parallel: bool,
    /// `do`/`entry`/`exit` actions plus nested states and transitions of a
    /// compound state.
    pub body: StateBody,
    pub span: Span,
}

impl StateUsage {
    /// The `do` behaviour performed while the state is active.
    pub fn do_action(&self) -> Option<&ActionRef> {
        self.body.do_action.as_ref()
    }

    pub fn is_compound(&self) -> bool {
        !self.body.states.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionUsage {
    pub name: Option<String>,
    pub source: Option<QualifiedName>,
    pub trigger: Option<Trigger>,
    /// Guard expression source text after `if`.
    pub guard: Option<String>,
    pub effect: Option<ActionRef>,
    pub target: Option<QualifiedName>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// `accept [name] [: Type] [via port]`
    Accept {
        payload_name: Option<String>,
        payload_type: Option<QualifiedName>,
        via: Option<QualifiedName>,
    },
    /// `accept when <expr>`
    When(String),
    /// `accept at <expr>`
    At(String),
    /// `accept after <expr>`
    After(String),
}

impl Trigger {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Trigger::Accept { .. } => "accept",
            Trigger::When(_) => "when",
            Trigger::At(_) => "at",
            Trigger::After(_) => "after",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Names and positions
// ────────────────────────────────────────────────────────────────────────────

/// A `::` or `.` separated name such as `Signals::TurnOn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName(pub Vec<String>);

impl QualifiedName {
    pub fn simple(name: impl Into<String>) -> Self {
        QualifiedName(vec![name.into()])
    }

    /// Last segment.
    pub fn name(&self) -> &str {
        self.0.last().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn is_simple(&self) -> bool {
        self.0.len() == 1
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("::"))
    }
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
