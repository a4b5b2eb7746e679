//! Generate SCXML text from a [`ScxmlDocument`].
//!
//! Output starts with a `<?xml version="1.0" ?>` declaration and uses two
//! space indentation. Elements without children are written self-closing.

use crate::scxml::*;
use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" ?>\n";

/// Generate the XML text for an SCXML document.
pub fn generate_scxml_xml(document: &ScxmlDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut root = BytesStart::new("scxml");
    root.push_attribute(("xmlns", SCXML_NAMESPACE));
    root.push_attribute(("version", document.version.as_str()));
    if let Some(ref datamodel) = document.datamodel {
        root.push_attribute(("datamodel", datamodel.as_str()));
    }
    if let Some(ref initial) = document.initial {
        root.push_attribute(("initial", initial.as_str()));
    }
    if let Some(ref name) = document.name {
        root.push_attribute(("name", name.as_str()));
    }

    if document.states.is_empty() {
        writer.write_event(Event::Empty(root))?;
    } else {
        writer.write_event(Event::Start(root))?;
        for state in &document.states {
            write_state(&mut writer, state)?;
        }
        writer.write_event(Event::End(BytesEnd::new("scxml")))?;
    }

    let body = String::from_utf8(writer.into_inner())?;
    let mut out = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    out.push_str(XML_DECLARATION);
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

fn write_state(writer: &mut Writer<Vec<u8>>, state: &ScxmlState) -> Result<()> {
    let tag = if state.is_final { "final" } else { "state" };
    let mut start = BytesStart::new(tag);
    start.push_attribute(("id", state.id.as_str()));

    if state.invokes.is_empty() && state.transitions.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for invoke in &state.invokes {
        let mut el = BytesStart::new("invoke");
        el.push_attribute(("id", invoke.id.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    for transition in &state.transitions {
        let mut el = BytesStart::new("transition");
        if let Some(ref event) = transition.event {
            el.push_attribute(("event", event.as_str()));
        }
        if let Some(ref target) = transition.target {
            el.push_attribute(("target", target.as_str()));
        }
        if let Some(ref cond) = transition.cond {
            el.push_attribute(("cond", cond.as_str()));
        }
        writer.write_event(Event::Empty(el))?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_states_are_self_closing() {
        let mut doc = ScxmlDocument::new();
        doc.initial = Some("idle".to_string());
        doc.states.push(ScxmlState::new("idle"));
        let xml = generate_scxml_xml(&doc).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" ?>\n\
             <scxml xmlns=\"http://www.w3.org/2005/07/scxml\" version=\"1.0\" initial=\"idle\">\n  \
             <state id=\"idle\"/>\n\
             </scxml>\n"
        );
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut doc = ScxmlDocument::new();
        let mut state = ScxmlState::new("a");
        state.transitions.push(ScxmlTransition {
            event: Some("go".to_string()),
            target: Some("a".to_string()),
            cond: Some("x < 3 && y".to_string()),
        });
        doc.states.push(state);
        let xml = generate_scxml_xml(&doc).unwrap();
        assert!(xml.contains("cond=\"x &lt; 3 &amp;&amp; y\""));
    }
}
