use sysmlv2x::model::Model;
use sysmlv2x::parser::parse_str;
use tempfile::NamedTempFile;

fn sample() -> Model {
    let text = r#"
package Demo {
    attribute def Ping;
    part def Host { port p; }
    state def Echo {
        entry; then idle;
        state idle;
        state busy { do action reply; }
        transition ping first idle accept Ping if ready then busy;
        transition done first busy then idle;
    }
}
"#;
    Model {
        files: vec![parse_str(text, "demo.sysml").expect("parse")],
    }
}

#[test]
fn test_binary_roundtrip() {
    let model = sample();
    let tmp = NamedTempFile::new().unwrap();
    model.save_to_binary(tmp.path()).unwrap();

    let loaded = Model::load_from_binary(tmp.path()).unwrap();
    assert_eq!(loaded, model);
    let machines = loaded.state_machines();
    assert_eq!(machines[0].qualified_name(), "Demo::Echo");
    assert_eq!(machines[0].machine.body.transitions[0].guard.as_deref(), Some("ready"));
}

#[test]
fn test_binary_invalid_magic() {
    let tmp = NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), b"NOTVALID00000000").unwrap();
    let result = Model::load_from_binary(tmp.path());
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("magic"));
}

#[test]
fn test_binary_wrong_version() {
    let tmp = NamedTempFile::new().unwrap();
    let mut bytes = b"SYSMLV2X".to_vec();
    bytes.extend_from_slice(&99u32.to_le_bytes());
    std::fs::write(tmp.path(), bytes).unwrap();
    let err = Model::load_from_binary(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("Unsupported version: 99"));
}
