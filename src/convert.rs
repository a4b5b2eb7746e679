//! SysMLv2 state machine to SCXML conversion.
//!
//! [`SysmlToScxml`] takes one state machine of a parsed [`Model`]:
//!
//! - every direct `state` of the machine becomes an SCXML `<state>`, in
//!   declaration order,
//! - a state's `do` action becomes an `<invoke>` with the action's name,
//! - every `transition` becomes a `<transition>` inside its source state; the
//!   event is the name of the attribute definition typing the `accept`
//!   payload,
//! - the target of the `entry; then …;` succession is the initial state.

use crate::error::ConversionError;
use crate::generator::scxml_xml::generate_scxml_xml;
use crate::model::*;
use crate::options::ConvertOptions;
use crate::resolve::NameIndex;
use crate::scxml::*;
use indexmap::IndexMap;
use std::collections::HashSet;

/// A transition whose endpoints and event have been resolved.
#[derive(Debug, Clone)]
pub struct ResolvedTransition<'a> {
    /// Declared name, or `source->target` for unnamed transitions.
    pub name: String,
    pub source: &'a str,
    pub target: &'a str,
    /// `None` for a transition without trigger.
    pub event: Option<String>,
    pub guard: Option<&'a str>,
    pub usage: &'a TransitionUsage,
}

/// Converts a SysMLv2 state machine into an [`ScxmlDocument`].
#[derive(Debug)]
pub struct SysmlToScxml<'a> {
    machine: &'a StateDefinition,
    qualified_name: String,
    /// Enclosing namespaces followed by the machine name.
    machine_path: Vec<String>,
    states: Vec<&'a StateUsage>,
    states_by_name: IndexMap<&'a str, &'a StateUsage>,
    transitions: Vec<ResolvedTransition<'a>>,
    transitions_by_name: IndexMap<String, usize>,
    transitions_from_source: IndexMap<&'a str, Vec<usize>>,
    transitions_to_target: IndexMap<&'a str, Vec<usize>>,
    initial_state: String,
    document: ScxmlDocument,
}

impl<'a> SysmlToScxml<'a> {
    /// Convert with [`ConvertOptions::default`].
    pub fn new(model: &'a Model, machine: &StateMachineRef<'a>) -> Result<Self, ConversionError> {
        Self::with_options(model, machine, &ConvertOptions::default())
    }

    pub fn with_options(
        model: &'a Model,
        machine: &StateMachineRef<'a>,
        options: &ConvertOptions,
    ) -> Result<Self, ConversionError> {
        let index = NameIndex::build(model);
        let mut conv = SysmlToScxml {
            machine: machine.machine,
            qualified_name: machine.qualified_name(),
            machine_path: machine
                .scope
                .iter()
                .cloned()
                .chain(std::iter::once(machine.machine.name.clone()))
                .collect(),
            states: Vec::new(),
            states_by_name: IndexMap::new(),
            transitions: Vec::new(),
            transitions_by_name: IndexMap::new(),
            transitions_from_source: IndexMap::new(),
            transitions_to_target: IndexMap::new(),
            initial_state: String::new(),
            document: ScxmlDocument::new(),
        };
        conv.extract_states()?;
        conv.extract_transitions(&index, &machine.scope, options)?;
        conv.initial_state = conv.find_initial_state()?;
        conv.document = conv.build_document(options);
        Ok(conv)
    }

    fn extract_states(&mut self) -> Result<(), ConversionError> {
        let machine = self.machine;
        for state in &machine.body.states {
            let name = state
                .name
                .as_deref()
                .ok_or(ConversionError::UnnamedState { span: state.span })?;
            if self.states_by_name.insert(name, state).is_some() {
                return Err(ConversionError::DuplicateState {
                    name: name.to_string(),
                });
            }
            if state.is_compound() {
                tracing::warn!(
                    state = name,
                    nested = state.body.states.len(),
                    "nested states are not converted"
                );
            }
            self.states.push(state);
        }
        Ok(())
    }

    fn extract_transitions(
        &mut self,
        index: &NameIndex<'a>,
        scope: &[String],
        options: &ConvertOptions,
    ) -> Result<(), ConversionError> {
        let machine = self.machine;
        for usage in &machine.body.transitions {
            let name = match usage.name.as_deref() {
                Some(name) => name.to_string(),
                None if options.require_transition_names => {
                    return Err(ConversionError::UnnamedTransition { span: usage.span });
                }
                None => format!(
                    "{}->{}",
                    usage.source.as_ref().map(|s| s.name()).unwrap_or("?"),
                    usage.target.as_ref().map(|t| t.name()).unwrap_or("?")
                ),
            };
            let source = usage
                .source
                .as_ref()
                .ok_or_else(|| ConversionError::MissingSource {
                    transition: name.clone(),
                })?;
            let target = usage
                .target
                .as_ref()
                .ok_or_else(|| ConversionError::MissingTarget {
                    transition: name.clone(),
                })?;
            let source = self.state_name(&name, source)?;
            let target = self.state_name(&name, target)?;
            let event = event_name(index, scope, &name, usage.trigger.as_ref())?;

            let idx = self.transitions.len();
            self.transitions_by_name.insert(name.clone(), idx);
            self.transitions_from_source.entry(source).or_default().push(idx);
            self.transitions_to_target.entry(target).or_default().push(idx);
            self.transitions.push(ResolvedTransition {
                name,
                source,
                target,
                event,
                guard: usage.guard.as_deref(),
                usage,
            });
        }
        Ok(())
    }

    /// Map a transition endpoint to the name of one of the machine's states.
    fn state_name(
        &self,
        transition: &str,
        reference: &QualifiedName,
    ) -> Result<&'a str, ConversionError> {
        self.local_state(reference)
            .ok_or_else(|| ConversionError::UnknownState {
                transition: transition.to_string(),
                state: reference.to_string(),
            })
    }

    /// A state of this machine. The qualifier of `M::s` or `P::M::s` must
    /// end the machine's own path.
    fn local_state(&self, reference: &QualifiedName) -> Option<&'a str> {
        let (last, prefix) = reference.0.split_last()?;
        if !self.machine_path.ends_with(prefix) {
            return None;
        }
        self.states_by_name
            .get_key_value(last.as_str())
            .map(|(name, _)| *name)
    }

    fn find_initial_state(&self) -> Result<String, ConversionError> {
        let initial = self
            .machine
            .body
            .entry
            .as_ref()
            .and_then(|entry| entry.initial.as_ref())
            .ok_or_else(|| ConversionError::InitialStateNotFound {
                machine: self.machine.name.clone(),
            })?;
        self.local_state(initial)
            .map(|state| state.to_string())
            .ok_or_else(|| ConversionError::UnknownInitialState {
                machine: self.machine.name.clone(),
                state: initial.to_string(),
            })
    }

    fn build_document(&self, options: &ConvertOptions) -> ScxmlDocument {
        let mut document = ScxmlDocument::new();
        document.initial = Some(self.initial_state.clone());
        if !options.datamodel.is_empty() {
            document.datamodel = Some(options.datamodel.clone());
        }
        if options.include_name {
            document.name = Some(self.machine.name.clone());
        }

        for (name, state) in &self.states_by_name {
            let mut element = ScxmlState::new(*name);
            if options.emit_invokes {
                if let Some(action) = state.do_action() {
                    match action.display_name() {
                        Some(behavior) => {
                            tracing::info!(state = *name, invoke = behavior, "do action mapped to invoke");
                            element.invokes.push(Invoke {
                                id: behavior.to_string(),
                            });
                        }
                        None => tracing::warn!(state = *name, "unnamed do action skipped"),
                    }
                }
            }
            for t in self.transitions_from(name) {
                element.transitions.push(ScxmlTransition {
                    event: t.event.clone(),
                    target: Some(t.target.to_string()),
                    cond: if options.emit_guards {
                        t.guard.map(|g| g.to_string())
                    } else {
                        None
                    },
                });
            }
            document.states.push(element);
        }
        document
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn machine_name(&self) -> &str {
        &self.machine.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn states(&self) -> &[&'a StateUsage] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&'a StateUsage> {
        self.states_by_name.get(name).copied()
    }

    pub fn transitions(&self) -> &[ResolvedTransition<'a>] {
        &self.transitions
    }

    pub fn transition(&self, name: &str) -> Option<&ResolvedTransition<'a>> {
        self.transitions_by_name
            .get(name)
            .map(|&idx| &self.transitions[idx])
    }

    /// Outgoing transitions of a state, in declaration order.
    pub fn transitions_from(&self, state: &str) -> Vec<&ResolvedTransition<'a>> {
        self.transitions_from_source
            .get(state)
            .map(|idxs| idxs.iter().map(|&i| &self.transitions[i]).collect())
            .unwrap_or_default()
    }

    /// Incoming transitions of a state, in declaration order.
    pub fn transitions_to(&self, state: &str) -> Vec<&ResolvedTransition<'a>> {
        self.transitions_to_target
            .get(state)
            .map(|idxs| idxs.iter().map(|&i| &self.transitions[i]).collect())
            .unwrap_or_default()
    }

    pub fn document(&self) -> &ScxmlDocument {
        &self.document
    }

    pub fn into_document(self) -> ScxmlDocument {
        self.document
    }

    /// The SCXML as a formatted XML string with line breaks and indentation.
    pub fn to_xml_string(&self) -> anyhow::Result<String> {
        generate_scxml_xml(&self.document)
    }
}

/// Event name of a transition trigger: the attribute definition typing the
/// accepted payload, or the first attribute definition it specializes.
fn event_name(
    index: &NameIndex<'_>,
    scope: &[String],
    transition: &str,
    trigger: Option<&Trigger>,
) -> Result<Option<String>, ConversionError> {
    let (payload_name, payload_type) = match trigger {
        None => return Ok(None),
        Some(Trigger::Accept {
            payload_name,
            payload_type,
            ..
        }) => (payload_name, payload_type),
        Some(other) => {
            return Err(ConversionError::UnsupportedTrigger {
                transition: transition.to_string(),
                kind: other.kind_name().to_string(),
            });
        }
    };
    let type_ref = match (payload_type, payload_name) {
        (Some(ty), _) => ty.clone(),
        // `accept TurnOn`: the payload name doubles as the type reference.
        (None, Some(name)) => QualifiedName::simple(name.clone()),
        (None, None) => {
            return Err(ConversionError::EmptyAccept {
                transition: transition.to_string(),
            });
        }
    };
    let entry = index
        .resolve(scope, &type_ref)
        .ok_or_else(|| ConversionError::UnresolvedEventType {
            transition: transition.to_string(),
            type_name: type_ref.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut queue = vec![entry];
    while let Some(current) = queue.pop() {
        if !seen.insert(current.qualified_name.clone()) {
            continue;
        }
        if current.definition.kind == DefinitionKind::Attribute {
            return Ok(Some(current.definition.name.clone()));
        }
        let def_scope: Vec<String> = current
            .qualified_name
            .split("::")
            .map(|s| s.to_string())
            .collect();
        let parent_scope = &def_scope[..def_scope.len().saturating_sub(1)];
        for general in current.definition.specializes.iter().rev() {
            if let Some(next) = index.resolve(parent_scope, general) {
                queue.push(next);
            }
        }
    }
    Err(ConversionError::EventTypeNotAttribute {
        transition: transition.to_string(),
        type_name: type_ref.to_string(),
        kind: entry.definition.kind.to_string(),
    })
}

/// Pick a state machine by simple or qualified name. Without a name the
/// model must contain exactly one machine.
pub fn find_state_machine<'a>(
    model: &'a Model,
    name: Option<&str>,
) -> Result<StateMachineRef<'a>, ConversionError> {
    let machines = model.state_machines();
    let mut matching: Vec<StateMachineRef<'a>> = match name {
        None => machines,
        Some(name) if name.contains("::") => machines
            .into_iter()
            .filter(|m| m.qualified_name() == name)
            .collect(),
        Some(name) => machines
            .into_iter()
            .filter(|m| m.machine.name == name)
            .collect(),
    };
    match matching.len() {
        0 => match name {
            None => Err(ConversionError::NoStateMachines),
            Some(name) => Err(ConversionError::StateMachineNotFound {
                name: name.to_string(),
            }),
        },
        1 => Ok(matching.remove(0)),
        _ => Err(ConversionError::AmbiguousStateMachine {
            name: name.unwrap_or("*").to_string(),
            candidates: matching.iter().map(|m| m.qualified_name()).collect(),
        }),
    }
}

/// Convert one state machine of `model` to SCXML text.
pub fn convert_model(
    model: &Model,
    machine: Option<&str>,
    options: &ConvertOptions,
) -> anyhow::Result<String> {
    let machine = find_state_machine(model, machine)?;
    SysmlToScxml::with_options(model, &machine, options)?.to_xml_string()
}

/// Parse SysMLv2 text and convert its state machine to SCXML text.
pub fn convert_str(text: &str, machine: Option<&str>) -> anyhow::Result<String> {
    let model = Model {
        files: vec![crate::parser::parse_str(text, "<input>")?],
    };
    convert_model(&model, machine, &ConvertOptions::default())
}
