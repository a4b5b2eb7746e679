use anyhow::Result;
use camino::Utf8PathBuf;
use std::collections::HashMap;
use sysmlv2x::model::*;
use sysmlv2x::parser::{ContentSource, SysmlParser};

struct MemSource {
    files: HashMap<String, String>,
}

impl ContentSource for MemSource {
    fn read_to_string(&mut self, path: &camino::Utf8Path) -> Result<String> {
        self.files
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not found: {}", path))
    }
    fn list_dir(&mut self, path: &camino::Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let prefix = path.as_str().trim_end_matches('/').to_string() + "/";
        let mut out: Vec<Utf8PathBuf> = self
            .files
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .map(|k| Utf8PathBuf::from(k.as_str()))
            .collect();
        out.sort();
        Ok(out)
    }
}

fn parse_one(text: &str) -> Model {
    let path = Utf8PathBuf::from("mem/model.sysml");
    let mut files = HashMap::new();
    files.insert(path.as_str().to_string(), text.to_string());
    let mut parser = SysmlParser::new(MemSource { files });
    parser.parse_file(&path).expect("parse model")
}

#[test]
fn parse_states_transitions_and_entry() {
    let model = parse_one(
        r#"
package Vehicle {
    attribute def Start;
    attribute def Stop;

    state def Engine {
        entry; then idle;

        state idle;
        state running {
            do action spin;
        }

        transition start_engine
            first idle
            accept s : Start
            then running;

        transition stop_engine
            first running
            accept Stop
            then idle;
    }
}
"#,
    );

    let machines = model.state_machines();
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0].qualified_name(), "Vehicle::Engine");

    let body = &machines[0].machine.body;
    let initial = body.entry.as_ref().and_then(|e| e.initial.as_ref());
    assert_eq!(initial, Some(&QualifiedName::simple("idle")));

    let names: Vec<_> = body.states.iter().filter_map(|s| s.name.as_deref()).collect();
    assert_eq!(names, vec!["idle", "running"]);
    let spin = body.states[1].do_action().expect("do action");
    assert_eq!(spin.declared_name.as_deref(), Some("spin"));

    assert_eq!(body.transitions.len(), 2);
    let start = &body.transitions[0];
    assert_eq!(start.name.as_deref(), Some("start_engine"));
    assert_eq!(start.source, Some(QualifiedName::simple("idle")));
    assert_eq!(start.target, Some(QualifiedName::simple("running")));
    assert_eq!(
        start.trigger,
        Some(Trigger::Accept {
            payload_name: Some("s".to_string()),
            payload_type: Some(QualifiedName::simple("Start")),
            via: None,
        })
    );
    // `accept Stop` keeps the bare name as payload name.
    assert_eq!(
        body.transitions[1].trigger,
        Some(Trigger::Accept {
            payload_name: Some("Stop".to_string()),
            payload_type: None,
            via: None,
        })
    );
}

#[test]
fn exhibit_state_inside_part_def_is_a_machine() {
    let model = parse_one(
        r#"
package Plant {
    part def Pump {
        attribute flow : Real;
        exhibit state pumpStates {
            entry; then stopped;
            state stopped;
            state pumping;
        }
    }
}
"#,
    );
    let machines = model.state_machines();
    assert_eq!(machines.len(), 1);
    assert!(machines[0].machine.is_usage);
    assert_eq!(machines[0].qualified_name(), "Plant::Pump::pumpStates");
    assert_eq!(machines[0].machine.body.states.len(), 2);
}

#[test]
fn triggers_guards_effects_and_via() {
    let model = parse_one(
        r#"
state def Door {
    entry action init; then closed;
    state closed;
    state open;
    transition opening
        first closed
        accept req : OpenRequest via panel.button
        if not locked
        do action unlockBolt
        then open;
    transition auto_close
        first open
        accept after 30 [s]
        then closed;
    transition alarm
        first open
        accept when pressure > limit
        then closed;
}
"#,
    );
    let machine = model.state_machines()[0].machine;
    assert_eq!(
        machine.body.entry.as_ref().and_then(|e| e.name.as_deref()),
        Some("init")
    );
    let t = &machine.body.transitions;
    match &t[0].trigger {
        Some(Trigger::Accept { via, .. }) => {
            assert_eq!(via.as_ref().map(|v| v.to_string()).as_deref(), Some("panel::button"));
        }
        other => panic!("unexpected trigger {:?}", other),
    }
    assert_eq!(t[0].guard.as_deref(), Some("not locked"));
    assert_eq!(
        t[0].effect.as_ref().and_then(|e| e.declared_name.as_deref()),
        Some("unlockBolt")
    );
    assert_eq!(t[1].trigger, Some(Trigger::After("30 [s]".to_string())));
    assert_eq!(t[2].trigger, Some(Trigger::When("pressure > limit".to_string())));
}

#[test]
fn comments_imports_and_unrelated_members_are_tolerated() {
    let model = parse_one(
        r#"
// Leading note
package 'Traffic Control' {
    private import ScalarValues::*;
    comment about Signal /* Signals used by the controller */
    #safety part def Controller;
    enum def Color { enum red; enum green; }
    state def Lights {
        doc /* Light cycle */
        entry; then 'red light';
        state 'red light';
        state green;
        state def Inner { state x; }
    }
}
"#,
    );
    let pkg = match &model.files[0].members[0] {
        Member::Package(pkg) => pkg,
        other => panic!("expected package, got {:?}", other),
    };
    assert_eq!(pkg.name, "Traffic Control");
    assert!(matches!(&pkg.members[0], Member::Import(text) if text == "ScalarValues::*"));
    let kinds: Vec<_> = pkg
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Definition(d) => Some(d.kind.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![DefinitionKind::Part, DefinitionKind::Enum]);

    let machine = model.state_machines()[0].machine;
    let names: Vec<_> = machine.body.states.iter().filter_map(|s| s.name.as_deref()).collect();
    assert_eq!(names, vec!["red light", "green"]);
}

#[test]
fn parse_dir_keeps_sorted_file_order() {
    let mut files = HashMap::new();
    files.insert("mem/b.sysml".to_string(), "package B { }".to_string());
    files.insert("mem/a.sysml".to_string(), "package A { }".to_string());
    let mut parser = SysmlParser::new(MemSource { files });
    let model = parser.parse_dir("mem").expect("parse dir");
    let paths: Vec<_> = model.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["mem/a.sysml", "mem/b.sysml"]);
}

#[test]
fn syntax_error_reports_position() {
    let mut files = HashMap::new();
    files.insert(
        "mem/bad.sysml".to_string(),
        "state def M {\n  transition t first ; then a;\n}".to_string(),
    );
    let mut parser = SysmlParser::new(MemSource { files });
    let err = parser.parse_file("mem/bad.sysml").unwrap_err();
    let parse_err = err
        .chain()
        .find_map(|e| e.downcast_ref::<sysmlv2x::ParseError>())
        .expect("ParseError in chain");
    assert_eq!((parse_err.line, parse_err.column), (2, 22));
}

#[test]
fn exhibit_state_inside_part_usage_is_a_machine() {
    let model = parse_one(
        r#"
package P {
    attribute def On;
    part lamp {
        attribute brightness : Real;
        exhibit state sw {
            entry; then off;
            state off;
            transition t first off accept On then off;
        }
    }
    part spare : Lamp;
}
"#,
    );
    let machines = model.state_machines();
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0].qualified_name(), "P::lamp::sw");
    assert_eq!(machines[0].machine.body.transitions.len(), 1);

    let pkg = match &model.files[0].members[0] {
        Member::Package(pkg) => pkg,
        other => panic!("expected package, got {:?}", other),
    };
    // Usages without a body are not kept.
    let usages: Vec<_> = pkg
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Usage(u) => Some((u.keyword.as_str(), u.name.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(usages, vec![("part", Some("lamp"))]);
}
