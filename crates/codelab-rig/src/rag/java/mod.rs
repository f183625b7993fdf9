//! Structural parsing of Java sources.
//!
//! [`parse_java`] reads a compilation unit with tree-sitter and returns one
//! [`CodeElement`] per package declaration, import block, type, method,
//! constructor and field. Sources that tree-sitter cannot make sense of fall
//! back to a line-based scan for classes and public methods.

mod fallback;
mod tree;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Tracing target for Java parsing.
const TRACING_TARGET: &str = "codelab_rig::rag::java";

/// Package name used when a file declares none.
pub const DEFAULT_PACKAGE: &str = "default";

/// Placeholder for elements outside a type.
pub const NOT_APPLICABLE: &str = "N/A";

/// Kind of a Java code element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// `package` declaration.
    Package,
    /// All `import` declarations of the file.
    Imports,
    /// Class declaration.
    Class,
    /// Interface declaration.
    Interface,
    /// Method declaration.
    Method,
    /// Constructor declaration.
    Constructor,
    /// Field declaration, possibly declaring several variables.
    Field,
    /// Enum declaration.
    Enum,
    /// Annotation type declaration.
    Annotation,
}

/// A declaration extracted from a Java source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeElement {
    /// Kind of declaration.
    pub kind: ElementKind,
    /// Declared name. Fields render their variables as `[a, b]`.
    pub name: String,
    /// Enclosing type, or `N/A`.
    pub class_name: String,
    /// Source text of the declaration.
    pub source: String,
    /// First line, 1-based.
    pub start_line: usize,
    /// Last line, 1-based and inclusive.
    pub end_line: usize,
    /// Javadoc text without comment markers.
    pub javadoc: String,
    /// Package of the file, `default` when undeclared.
    pub package: String,
    /// Modifiers rendered as `[public, static]`, empty where not tracked.
    pub modifiers: String,
}

impl CodeElement {
    /// Number of lines the element spans.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Extracts the declarations of a Java source file, in source order by kind.
///
/// Returns an empty list for sources without any recognisable declaration.
pub fn parse_java(source: &str) -> Vec<CodeElement> {
    match tree::parse(source) {
        Some(parsed) if !parsed.elements.is_empty() || !parsed.has_errors => {
            tracing::debug!(
                target: TRACING_TARGET,
                elements = %parsed.elements.len(),
                has_errors = %parsed.has_errors,
                "Parsed Java source"
            );
            parsed.elements
        }
        _ => {
            tracing::warn!(
                target: TRACING_TARGET,
                "Java source could not be parsed structurally, using line scan"
            );
            fallback::parse(source)
        }
    }
}

/// Renders a list the way `[a, b]` summaries are shown to the model.
fn render_list<S: AsRef<str>>(items: &[S]) -> String {
    let joined: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("[{}]", joined.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"package com.example.shop;

import java.util.List;
import java.util.ArrayList;

/**
 * A shopping cart.
 */
public class Cart {
    private final List<String> items = new ArrayList<>();
    private int count, total;

    public Cart() {
    }

    /** Adds an item. */
    public void add(String item) {
        items.add(item);
        count++;
    }

    public static int size(Cart cart) {
        return cart.count;
    }
}

enum Currency { EUR, USD }
"#;

    fn find<'a>(elements: &'a [CodeElement], kind: ElementKind, name: &str) -> &'a CodeElement {
        elements
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .unwrap()
    }

    #[test]
    fn extracts_elements_in_order() {
        let elements = parse_java(SOURCE);
        let kinds: Vec<ElementKind> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ElementKind::Package,
                ElementKind::Imports,
                ElementKind::Class,
                ElementKind::Method,
                ElementKind::Method,
                ElementKind::Constructor,
                ElementKind::Field,
                ElementKind::Field,
                ElementKind::Enum,
            ]
        );
    }

    #[test]
    fn package_and_imports() {
        let elements = parse_java(SOURCE);
        let package = &elements[0];
        assert_eq!(package.name, "com.example.shop");
        assert_eq!(package.class_name, NOT_APPLICABLE);
        assert_eq!(package.start_line, 1);

        let imports = &elements[1];
        assert_eq!(imports.name, "imports");
        assert_eq!(imports.package, NOT_APPLICABLE);
        assert_eq!(
            imports.source,
            "[import java.util.List;, import java.util.ArrayList;]"
        );
        assert_eq!((imports.start_line, imports.end_line), (3, 4));
    }

    #[test]
    fn class_members_carry_metadata() {
        let elements = parse_java(SOURCE);

        let class = find(&elements, ElementKind::Class, "Cart");
        assert_eq!(class.class_name, "Cart");
        assert_eq!(class.modifiers, "[public]");
        assert_eq!(class.javadoc, "A shopping cart.");
        assert_eq!(class.package, "com.example.shop");
        assert_eq!((class.start_line, class.end_line), (9, 25));

        let add = find(&elements, ElementKind::Method, "add");
        assert_eq!(add.class_name, "Cart");
        assert_eq!(add.javadoc, "Adds an item.");
        assert_eq!((add.start_line, add.end_line), (17, 20));
        assert!(add.source.starts_with("public void add(String item)"));

        let size = find(&elements, ElementKind::Method, "size");
        assert_eq!(size.modifiers, "[public, static]");

        let fields = find(&elements, ElementKind::Field, "[count, total]");
        assert_eq!(fields.modifiers, "[private]");
        assert_eq!(fields.line_count(), 1);
    }

    #[test]
    fn interfaces_are_typed() {
        let elements = parse_java("interface Shape { double area(); }");
        assert_eq!(elements[0].kind, ElementKind::Interface);
        assert_eq!(elements[0].package, DEFAULT_PACKAGE);
        assert_eq!(elements[1].kind, ElementKind::Method);
        assert_eq!(elements[1].name, "area");
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(parse_java("").is_empty());
        assert!(parse_java("// just a comment\n").is_empty());
    }

    #[test]
    fn garbage_falls_back_to_line_scan() {
        let source = "public class Broken {\n  public void run() { if ( }\n";
        let elements = parse_java(source);
        assert!(!elements.is_empty());
        assert!(
            elements
                .iter()
                .any(|e| e.kind == ElementKind::Class && e.name == "Broken")
        );
    }
}
