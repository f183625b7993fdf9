//! Tree-sitter based extraction.

use tree_sitter::{Node, Parser};

use super::{CodeElement, DEFAULT_PACKAGE, ElementKind, NOT_APPLICABLE, TRACING_TARGET, render_list};

/// Result of a structural parse.
pub(super) struct Parsed {
    pub elements: Vec<CodeElement>,
    pub has_errors: bool,
}

/// Parses a compilation unit, or returns `None` if the grammar could not be
/// loaded or the parser gave up.
pub(super) fn parse(source: &str) -> Option<Parsed> {
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
        tracing::error!(target: TRACING_TARGET, error = %err, "Failed to load Java grammar");
        return None;
    }
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();

    let package = package_declaration(root);
    let package_name = package
        .and_then(|node| package_name(node, source))
        .unwrap_or(DEFAULT_PACKAGE)
        .to_owned();

    let mut walker = Walker {
        source,
        package: package_name.clone(),
        types: Vec::new(),
        trailing: Vec::new(),
    };
    walker.walk(root);

    let mut elements = Vec::with_capacity(walker.types.len() + walker.trailing.len() + 2);
    if let Some(node) = package
        && package_name != DEFAULT_PACKAGE
    {
        elements.push(CodeElement {
            kind: ElementKind::Package,
            name: package_name.clone(),
            class_name: NOT_APPLICABLE.to_owned(),
            source: text(node, source).to_owned(),
            start_line: start_line(node),
            end_line: end_line(node),
            javadoc: String::new(),
            package: package_name.clone(),
            modifiers: String::new(),
        });
    }
    if let Some(imports) = imports_element(root, source) {
        elements.push(imports);
    }
    elements.append(&mut walker.types);
    elements.append(&mut walker.trailing);

    Some(Parsed {
        elements,
        has_errors: root.has_error(),
    })
}

struct Walker<'s> {
    source: &'s str,
    package: String,
    /// Classes and interfaces followed by their members.
    types: Vec<CodeElement>,
    /// Enums and annotation types, reported after every class.
    trailing: Vec<CodeElement>,
}

impl Walker<'_> {
    /// Visits declarations in pre-order so nested types follow their parent.
    fn walk(&mut self, node: Node) {
        match node.kind() {
            "class_declaration" | "interface_declaration" => self.type_declaration(node),
            "enum_declaration" => self.push_trailing(node, ElementKind::Enum),
            "annotation_type_declaration" => self.push_trailing(node, ElementKind::Annotation),
            _ => {}
        }

        for child in node.children(&mut node.walk()) {
            self.walk(child);
        }
    }

    fn type_declaration(&mut self, node: Node) {
        let Some(name) = field_text(node, "name", self.source) else {
            return;
        };
        let kind = if node.kind() == "interface_declaration" {
            ElementKind::Interface
        } else {
            ElementKind::Class
        };
        let element = self.element(node, kind, name.to_owned(), name, true);
        self.types.push(element);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let members: Vec<Node> = body.named_children(&mut body.walk()).collect();

        for member in members.iter().filter(|m| m.kind() == "method_declaration") {
            if let Some(method) = field_text(*member, "name", self.source) {
                let element = self.element(*member, ElementKind::Method, method.to_owned(), name, true);
                self.types.push(element);
            }
        }
        for member in members.iter().filter(|m| m.kind() == "constructor_declaration") {
            if let Some(constructor) = field_text(*member, "name", self.source) {
                let element =
                    self.element(*member, ElementKind::Constructor, constructor.to_owned(), name, true);
                self.types.push(element);
            }
        }
        for member in members
            .iter()
            .filter(|m| matches!(m.kind(), "field_declaration" | "constant_declaration"))
        {
            let variables: Vec<&str> = member
                .named_children(&mut member.walk())
                .filter(|child| child.kind() == "variable_declarator")
                .filter_map(|child| field_text(child, "name", self.source))
                .collect();
            let element = self.element(*member, ElementKind::Field, render_list(&variables), name, true);
            self.types.push(element);
        }
    }

    fn push_trailing(&mut self, node: Node, kind: ElementKind) {
        if let Some(name) = field_text(node, "name", self.source) {
            let element = self.element(node, kind, name.to_owned(), name, false);
            self.trailing.push(element);
        }
    }

    fn element(
        &self,
        node: Node,
        kind: ElementKind,
        name: String,
        class_name: &str,
        with_modifiers: bool,
    ) -> CodeElement {
        CodeElement {
            kind,
            name,
            class_name: class_name.to_owned(),
            source: text(node, self.source).to_owned(),
            start_line: start_line(node),
            end_line: end_line(node),
            javadoc: javadoc(node, self.source),
            package: self.package.clone(),
            modifiers: if with_modifiers {
                modifiers(node, self.source)
            } else {
                String::new()
            },
        }
    }
}

fn package_declaration(root: Node) -> Option<Node> {
    root.named_children(&mut root.walk())
        .find(|child| child.kind() == "package_declaration")
}

fn package_name<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    node.named_children(&mut node.walk())
        .find(|child| matches!(child.kind(), "scoped_identifier" | "identifier"))
        .map(|child| text(child, source))
}

fn imports_element(root: Node, source: &str) -> Option<CodeElement> {
    let imports: Vec<Node> = root
        .named_children(&mut root.walk())
        .filter(|child| child.kind() == "import_declaration")
        .collect();
    let (first, last) = (imports.first()?, imports.last()?);
    let texts: Vec<&str> = imports.iter().map(|node| text(*node, source)).collect();

    Some(CodeElement {
        kind: ElementKind::Imports,
        name: "imports".to_owned(),
        class_name: NOT_APPLICABLE.to_owned(),
        source: render_list(&texts),
        start_line: start_line(*first),
        end_line: end_line(*last),
        javadoc: String::new(),
        package: NOT_APPLICABLE.to_owned(),
        modifiers: String::new(),
    })
}

/// Renders the modifier keywords of a declaration, skipping annotations.
fn modifiers(node: Node, source: &str) -> String {
    let Some(list) = node
        .children(&mut node.walk())
        .find(|child| child.kind() == "modifiers")
    else {
        return "[]".to_owned();
    };

    let keywords: Vec<&str> = list
        .children(&mut list.walk())
        .filter(|child| !child.is_extra())
        .filter(|child| !matches!(child.kind(), "annotation" | "marker_annotation"))
        .map(|child| text(child, source))
        .collect();
    render_list(&keywords)
}

/// Returns the Javadoc directly preceding a declaration, without markers.
fn javadoc(node: Node, source: &str) -> String {
    let Some(comment) = node.prev_sibling() else {
        return String::new();
    };
    if comment.kind() != "block_comment" {
        return String::new();
    }
    let raw = text(comment, source);
    let Some(inner) = raw.strip_prefix("/**") else {
        return String::new();
    };
    let inner = inner.strip_suffix("*/").unwrap_or(inner);

    inner
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn field_text<'s>(node: Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|child| text(child, source))
}

fn text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

fn start_line(node: Node) -> usize {
    node.start_position().row + 1
}

fn end_line(node: Node) -> usize {
    node.end_position().row + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_types_follow_their_parent() {
        let source = "class Outer {\n  class Inner { void run() {} }\n  void outer() {}\n}\n";
        let parsed = parse(source).unwrap();
        assert!(!parsed.has_errors);

        let names: Vec<(&str, &str)> = parsed
            .elements
            .iter()
            .map(|e| (e.class_name.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(
            names,
            [("Outer", "Outer"), ("Outer", "outer"), ("Inner", "Inner"), ("Inner", "run")]
        );
    }

    #[test]
    fn annotations_are_not_modifiers() {
        let source = "class A {\n  @Override\n  public String toString() { return \"\"; }\n}\n";
        let parsed = parse(source).unwrap();
        let method = &parsed.elements[1];
        assert_eq!(method.modifiers, "[public]");
        assert!(method.source.starts_with("@Override"));
    }

    #[test]
    fn javadoc_markers_are_stripped() {
        let source = "/**\n * First line.\n *\n * Second line.\n */\nclass A {}\n";
        let parsed = parse(source).unwrap();
        assert_eq!(parsed.elements[0].javadoc, "First line.\nSecond line.");
        assert_eq!(parsed.elements[0].modifiers, "[]");
    }
}
