use camino::Utf8PathBuf;
use sysmlv2x::convert::{SysmlToScxml, find_state_machine};
use sysmlv2x::model::Model;
use sysmlv2x::parser::{FsSource, SysmlParser, parse_str};
use sysmlv2x::{ConversionError, ConvertOptions, convert_model, convert_str};

fn model(text: &str) -> Model {
    Model {
        files: vec![parse_str(text, "test.sysml").expect("parse")],
    }
}

fn convert_err(text: &str) -> ConversionError {
    let m = model(text);
    let machine = find_state_machine(&m, None).expect("machine");
    SysmlToScxml::new(&m, &machine).expect_err("conversion should fail")
}

#[test]
fn light_switch_demo_matches_expected_scxml() {
    let path = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/light_switch.sysml");
    let m = SysmlParser::new(FsSource).parse_file(&path).expect("parse demo");
    let xml = convert_model(&m, Some("LightSwitch"), &ConvertOptions::default()).unwrap();
    let expected = r#"<?xml version="1.0" ?>
<scxml xmlns="http://www.w3.org/2005/07/scxml" version="1.0" datamodel="ecmascript" initial="off">
  <state id="off">
    <transition event="TurnOn" target="on"/>
  </state>
  <state id="on">
    <invoke id="blink"/>
    <transition event="TurnOff" target="off"/>
  </state>
</scxml>
"#;
    assert_eq!(xml, expected);
}

#[test]
fn transitions_are_indexed_by_source_and_target() {
    let m = model(
        r#"
package P {
    attribute def Go;
    attribute def Back;
    state def M {
        entry; then a;
        state a;
        state b;
        state c;
        transition a_b first a accept Go then b;
        transition a_c first a accept Go then c;
        transition c_a first c accept Back then a;
    }
}
"#,
    );
    let machine = find_state_machine(&m, Some("P::M")).unwrap();
    let conv = SysmlToScxml::new(&m, &machine).unwrap();
    assert_eq!(conv.initial_state(), "a");
    assert_eq!(conv.qualified_name(), "P::M");

    let from_a: Vec<_> = conv.transitions_from("a").iter().map(|t| t.name.as_str()).collect();
    assert_eq!(from_a, vec!["a_b", "a_c"]);
    let to_a: Vec<_> = conv.transitions_to("a").iter().map(|t| t.name.as_str()).collect();
    assert_eq!(to_a, vec!["c_a"]);
    assert!(conv.transitions_from("b").is_empty());
    assert_eq!(conv.transition("c_a").and_then(|t| t.event.as_deref()), Some("Back"));

    // Outgoing transitions stay in declaration order inside their state.
    let doc = conv.document();
    let a = doc.state("a").unwrap();
    let targets: Vec<_> = a.transitions.iter().filter_map(|t| t.target.as_deref()).collect();
    assert_eq!(targets, vec!["b", "c"]);
}

#[test]
fn event_name_comes_from_attribute_definition() {
    let m = model(
        r#"
package Signals {
    attribute def Press;
    item def LongPress :> Press;
}
package Logic {
    state def Button {
        entry; then up;
        state up;
        state down;
        transition push first up accept p : Signals::Press then down;
        transition hold first down accept LongPress then up;
    }
}
"#,
    );
    let machine = find_state_machine(&m, None).unwrap();
    let conv = SysmlToScxml::new(&m, &machine).unwrap();
    let events: Vec<_> = conv
        .transitions()
        .iter()
        .map(|t| t.event.as_deref().unwrap_or(""))
        .collect();
    // `LongPress` is an item def; its attribute def supertype names the event.
    assert_eq!(events, vec!["Press", "Press"]);
}

#[test]
fn missing_initial_state_is_an_error() {
    let err = convert_err("state def M { state a; }");
    assert_eq!(
        err,
        ConversionError::InitialStateNotFound {
            machine: "M".to_string()
        }
    );
    let err = convert_err("state def M { entry; then z; state a; }");
    assert!(matches!(err, ConversionError::UnknownInitialState { ref state, .. } if state == "z"));
}

#[test]
fn unnamed_and_dangling_elements_are_rejected() {
    let err = convert_err("attribute def E; state def M { entry; then a; state a; accept E then a; }");
    assert!(matches!(err, ConversionError::UnnamedTransition { .. }));

    let err = convert_err("attribute def E; state def M { entry; then a; state a; transition t accept E then a; }");
    assert_eq!(
        err,
        ConversionError::MissingSource {
            transition: "t".to_string()
        }
    );

    let err = convert_err("attribute def E; state def M { entry; then a; state a; transition t first a accept E; }");
    assert_eq!(
        err,
        ConversionError::MissingTarget {
            transition: "t".to_string()
        }
    );

    let err = convert_err("attribute def E; state def M { entry; then a; state a; transition t first a accept E then nowhere; }");
    assert_eq!(
        err,
        ConversionError::UnknownState {
            transition: "t".to_string(),
            state: "nowhere".to_string()
        }
    );

    let err = convert_err("state def M { entry; then a; state a; state a; }");
    assert_eq!(err, ConversionError::DuplicateState { name: "a".to_string() });
}

#[test]
fn event_type_errors() {
    let err = convert_err("state def M { entry; then a; state a; transition t first a accept Ghost then a; }");
    assert_eq!(
        err,
        ConversionError::UnresolvedEventType {
            transition: "t".to_string(),
            type_name: "Ghost".to_string()
        }
    );

    let err = convert_err("part def Motor; state def M { entry; then a; state a; transition t first a accept m : Motor then a; }");
    assert!(matches!(err, ConversionError::EventTypeNotAttribute { ref kind, .. } if kind == "part def"));

    let err = convert_err("state def M { entry; then a; state a; transition t first a accept after 5 then a; }");
    assert_eq!(
        err,
        ConversionError::UnsupportedTrigger {
            transition: "t".to_string(),
            kind: "after".to_string()
        }
    );
}

#[test]
fn options_control_guards_names_and_unnamed_transitions() {
    let m = model(
        r#"
attribute def Tick;
state def Counter {
    entry; then counting;
    state counting;
    accept Tick if count >= 10 then done;
    state done;
    transition reset first done then counting;
}
"#,
    );
    let machine = find_state_machine(&m, None).unwrap();
    let options = ConvertOptions {
        datamodel: String::new(),
        include_name: true,
        require_transition_names: false,
        ..ConvertOptions::default()
    };
    let conv = SysmlToScxml::with_options(&m, &machine, &options).unwrap();
    let xml = conv.to_xml_string().unwrap();
    assert!(xml.contains(
        r#"<scxml xmlns="http://www.w3.org/2005/07/scxml" version="1.0" initial="counting" name="Counter">"#
    ));
    assert!(xml.contains(r#"<transition event="Tick" target="done" cond="count &gt;= 10"/>"#));
    // Transition without trigger becomes eventless.
    assert!(xml.contains(r#"<transition target="counting"/>"#));
    assert_eq!(conv.transitions()[0].name, "counting->done");

    let no_guards = ConvertOptions {
        emit_guards: false,
        require_transition_names: false,
        ..ConvertOptions::default()
    };
    let xml = convert_model(&m, None, &no_guards).unwrap();
    assert!(!xml.contains("cond="));
}

#[test]
fn machine_selection() {
    let m = model(
        "package A { state def M { entry; then s; state s; } }
         package B { state def M { entry; then s; state s; } }",
    );
    assert!(matches!(
        find_state_machine(&m, None),
        Err(ConversionError::AmbiguousStateMachine { .. })
    ));
    match find_state_machine(&m, Some("M")) {
        Err(ConversionError::AmbiguousStateMachine { candidates, .. }) => {
            assert_eq!(candidates, vec!["A::M".to_string(), "B::M".to_string()]);
        }
        other => panic!("unexpected {:?}", other.map(|r| r.qualified_name())),
    }
    assert_eq!(find_state_machine(&m, Some("B::M")).unwrap().qualified_name(), "B::M");
    assert!(matches!(
        find_state_machine(&m, Some("Nope")),
        Err(ConversionError::StateMachineNotFound { .. })
    ));
    assert_eq!(
        find_state_machine(&model("package Empty { }"), None).unwrap_err(),
        ConversionError::NoStateMachines
    );
}

#[test]
fn convert_str_handles_a_single_machine() {
    let xml = convert_str(
        "attribute def Ping; state def Echo { entry; then idle; state idle; transition ping first idle accept Ping then idle; }",
        None,
    )
    .unwrap();
    assert!(xml.contains(r#"<transition event="Ping" target="idle"/>"#));
}

#[test]
fn ambiguous_event_type_is_unresolved() {
    let text = |first: &str, second: &str| {
        format!(
            "package A {{ {first} def Go; }} package B {{ {second} def Go; }}
             package C {{ state def M {{ entry; then a; state a;
                 transition t first a accept Go then a; }} }}"
        )
    };
    let expected = ConversionError::UnresolvedEventType {
        transition: "t".to_string(),
        type_name: "Go".to_string(),
    };
    assert_eq!(convert_err(&text("item", "attribute")), expected);
    assert_eq!(convert_err(&text("attribute", "item")), expected);

    // Qualifying the reference picks one of them.
    let m = model(
        "package A { item def Go; } package B { attribute def Go; }
         package C { state def M { entry; then a; state a;
             transition t first a accept B::Go then a; } }",
    );
    let machine = find_state_machine(&m, None).unwrap();
    let conv = SysmlToScxml::new(&m, &machine).unwrap();
    assert_eq!(conv.transitions()[0].event.as_deref(), Some("Go"));
}

#[test]
fn qualified_endpoints_must_belong_to_the_machine() {
    let err = convert_err(
        "attribute def E; package P { state def M { entry; then a; state a; state b;
             transition t first Other::a accept E then b; } }",
    );
    assert_eq!(
        err,
        ConversionError::UnknownState {
            transition: "t".to_string(),
            state: "Other::a".to_string()
        }
    );

    let err = convert_err("package P { state def M { entry; then Q::M::a; state a; } }");
    assert!(matches!(err, ConversionError::UnknownInitialState { ref state, .. } if state == "Q::M::a"));

    let m = model(
        "attribute def E; package P { state def M { entry; then P::M::a; state a; state b;
             transition t first M::a accept E then P::M::b; } }",
    );
    let machine = find_state_machine(&m, None).unwrap();
    let conv = SysmlToScxml::new(&m, &machine).unwrap();
    assert_eq!(conv.initial_state(), "a");
    let t = conv.transition("t").unwrap();
    assert_eq!((t.source, t.target), ("a", "b"));
}

#[test]
fn machine_exhibited_by_part_usage_converts() {
    let xml = convert_str(
        "package P { attribute def On;
             part lamp : Lamp { exhibit state sw { entry; then off; state off;
                 transition t first off accept On then off; } } }",
        Some("P::lamp::sw"),
    )
    .unwrap();
    assert!(xml.contains(r#"<transition event="On" target="off"/>"#));
}
