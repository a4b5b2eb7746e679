//! Qualified-name index over the definitions of a [`Model`].

use crate::model::*;
use indexmap::IndexMap;

/// A definition together with its fully qualified name.
#[derive(Debug, Clone)]
pub struct DefinitionEntry<'a> {
    pub qualified_name: String,
    pub definition: &'a Definition,
}

/// Lookup table from `A::B::Name` to definitions, in declaration order.
#[derive(Debug, Default)]
pub struct NameIndex<'a> {
    by_qualified: IndexMap<String, DefinitionEntry<'a>>,
}

impl<'a> NameIndex<'a> {
    pub fn build(model: &'a Model) -> Self {
        let mut index = NameIndex::default();
        for file in &model.files {
            index.collect(&file.members, &mut Vec::new());
        }
        index
    }

    fn collect(&mut self, members: &'a [Member], scope: &mut Vec<String>) {
        for member in members {
            match member {
                Member::Package(pkg) => {
                    scope.push(pkg.name.clone());
                    self.collect(&pkg.members, scope);
                    scope.pop();
                }
                Member::Definition(def) => {
                    scope.push(def.name.clone());
                    let qualified_name = scope.join("::");
                    // First declaration wins; later duplicates are ignored.
                    self.by_qualified
                        .entry(qualified_name.clone())
                        .or_insert(DefinitionEntry {
                            qualified_name,
                            definition: def,
                        });
                    self.collect(&def.members, scope);
                    scope.pop();
                }
                Member::Usage(usage) => match usage.name {
                    Some(ref name) => {
                        scope.push(name.clone());
                        self.collect(&usage.members, scope);
                        scope.pop();
                    }
                    None => self.collect(&usage.members, scope),
                },
                Member::StateDefinition(_) | Member::Import(_) => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_qualified.is_empty()
    }

    pub fn get(&self, qualified_name: &str) -> Option<&DefinitionEntry<'a>> {
        self.by_qualified.get(qualified_name)
    }

    /// Resolve `name` as seen from `scope` (outermost namespace first).
    ///
    /// Enclosing namespaces are searched from the innermost outward, then the
    /// root. Failing that, a definition whose simple name is unique in the
    /// model is accepted, which stands in for `import` resolution. Several
    /// matches leave the reference unresolved.
    pub fn resolve(&self, scope: &[String], name: &QualifiedName) -> Option<&DefinitionEntry<'a>> {
        let wanted = name.to_string();
        for depth in (0..=scope.len()).rev() {
            let candidate = if depth == 0 {
                wanted.clone()
            } else {
                format!("{}::{}", scope[..depth].join("::"), wanted)
            };
            if let Some(entry) = self.by_qualified.get(&candidate) {
                return Some(entry);
            }
        }
        let suffix = format!("::{}", wanted);
        let mut matches = self
            .by_qualified
            .values()
            .filter(|e| e.qualified_name.ends_with(&suffix));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            (Some(first), Some(second)) => {
                tracing::warn!(
                    name = %wanted,
                    first = %first.qualified_name,
                    second = %second.qualified_name,
                    "ambiguous reference left unresolved"
                );
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn model(text: &str) -> Model {
        Model {
            files: vec![parse_str(text, "<test>").unwrap()],
        }
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let m = model(
            "package Outer {
                attribute def Go;
                package Inner { attribute def Go; }
             }",
        );
        let index = NameIndex::build(&m);
        let scope = vec!["Outer".to_string(), "Inner".to_string()];
        let hit = index.resolve(&scope, &QualifiedName::simple("Go")).unwrap();
        assert_eq!(hit.qualified_name, "Outer::Inner::Go");
        let hit = index.resolve(&scope[..1], &QualifiedName::simple("Go")).unwrap();
        assert_eq!(hit.qualified_name, "Outer::Go");
    }

    #[test]
    fn unique_simple_name_resolves_across_packages() {
        let m = model("package Signals { attribute def Stop; } package Logic { }");
        let index = NameIndex::build(&m);
        let hit = index
            .resolve(&["Logic".to_string()], &QualifiedName::simple("Stop"))
            .unwrap();
        assert_eq!(hit.definition.kind, DefinitionKind::Attribute);
        assert!(index.resolve(&[], &QualifiedName::simple("Missing")).is_none());
    }

    #[test]
    fn ambiguous_simple_name_is_not_resolved() {
        let m = model("package A { item def Go; } package B { attribute def Go; } package C { }");
        let index = NameIndex::build(&m);
        let scope = vec!["C".to_string()];
        assert!(index.resolve(&scope, &QualifiedName::simple("Go")).is_none());
        let hit = index
            .resolve(&scope, &QualifiedName(vec!["B".to_string(), "Go".to_string()]))
            .unwrap();
        assert_eq!(hit.qualified_name, "B::Go");
    }
}
