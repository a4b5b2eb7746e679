//! Output generators.
//!
//! - [`scxml_xml`] – Generate SCXML text from a [`ScxmlDocument`](crate::scxml::ScxmlDocument).

pub mod scxml_xml;
