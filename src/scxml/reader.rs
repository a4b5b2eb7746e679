//! SCXML XML parsing.

use super::*;
use anyhow::{Context, Result, anyhow, bail};
use roxmltree::{Document, Node};

/// Parse SCXML text into a [`ScxmlDocument`].
///
/// Compound states (a `<state>` containing `<state>` children) and
/// `<parallel>` regions are rejected. Unknown children are ignored.
pub fn parse_scxml(text: &str, path_hint: Option<&str>) -> Result<ScxmlDocument> {
    let hint = path_hint.unwrap_or("<scxml>");
    let doc = Document::parse(text).with_context(|| format!("Failed to parse XML {}", hint))?;
    let root = doc.root_element();
    if !root.has_tag_name("scxml") {
        return Err(anyhow!("No <scxml> root in {}", hint));
    }
    if let Some(ns) = root.tag_name().namespace() {
        if ns != SCXML_NAMESPACE {
            tracing::warn!(namespace = ns, "unexpected SCXML namespace in {}", hint);
        }
    }

    let mut document = ScxmlDocument {
        name: root.attribute("name").map(|s| s.to_string()),
        initial: root.attribute("initial").map(|s| s.to_string()),
        datamodel: root.attribute("datamodel").map(|s| s.to_string()),
        version: root.attribute("version").unwrap_or("1.0").to_string(),
        states: Vec::new(),
    };

    for child in root.children().filter(|c| c.is_element()) {
        match child.tag_name().name() {
            "state" => document.states.push(parse_state(child, false, hint)?),
            "final" => document.states.push(parse_state(child, true, hint)?),
            "parallel" => bail!("<parallel> is not supported ({})", hint),
            _ => {}
        }
    }
    Ok(document)
}

fn parse_state(node: Node, is_final: bool, hint: &str) -> Result<ScxmlState> {
    let id = node
        .attribute("id")
        .ok_or_else(|| anyhow!("<{}> without id in {}", node.tag_name().name(), hint))?;
    let mut state = ScxmlState::new(id);
    state.is_final = is_final;
    for child in node.children().filter(|c| c.is_element()) {
        match child.tag_name().name() {
            "state" | "final" | "parallel" => {
                bail!("compound state '{}' is not supported ({})", id, hint)
            }
            "invoke" => {
                let invoke_id = child
                    .attribute("id")
                    .or_else(|| child.attribute("src"))
                    .ok_or_else(|| anyhow!("<invoke> without id in state '{}' ({})", id, hint))?;
                state.invokes.push(Invoke {
                    id: invoke_id.to_string(),
                });
            }
            "transition" => state.transitions.push(ScxmlTransition {
                event: child.attribute("event").map(|s| s.to_string()),
                target: child.attribute("target").map(|s| s.to_string()),
                cond: child.attribute("cond").map(|s| s.to_string()),
            }),
            _ => {}
        }
    }
    Ok(state)
}
