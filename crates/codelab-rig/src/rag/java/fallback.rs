//! Line-based scan for sources the structural parser rejects.

use std::sync::LazyLock;

use regex::Regex;

use super::{CodeElement, DEFAULT_PACKAGE, ElementKind};

/// Class assumed for methods that appear before any class line.
const UNKNOWN_CLASS: &str = "UnknownClass";

static CLASS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+([A-Za-z0-9_]+)").expect("valid class regex"));

static PUBLIC_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*public\s+.*\s+[a-zA-Z_][a-zA-Z0-9_]*\s*\(.*\).*\{?$")
        .expect("valid method regex")
});

static METHOD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+.*?\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").expect("valid method name regex")
});

/// Finds class lines and public method lines, one element per line.
pub(super) fn parse(source: &str) -> Vec<CodeElement> {
    let mut elements = Vec::new();
    let mut current_class = UNKNOWN_CLASS.to_owned();

    for (index, line) in source.lines().enumerate() {
        let line = line.trim();

        if line.starts_with("public class ") || line.starts_with("class ") {
            if let Some(name) = CLASS_NAME.captures(line).and_then(|c| c.get(1)) {
                current_class = name.as_str().to_owned();
            }
            elements.push(line_element(ElementKind::Class, &current_class, &current_class, line, index));
        } else if PUBLIC_METHOD.is_match(line)
            && let Some(name) = METHOD_NAME.captures(line).and_then(|c| c.get(1))
        {
            elements.push(line_element(ElementKind::Method, name.as_str(), &current_class, line, index));
        }
    }

    elements
}

fn line_element(
    kind: ElementKind,
    name: &str,
    class_name: &str,
    line: &str,
    index: usize,
) -> CodeElement {
    CodeElement {
        kind,
        name: name.to_owned(),
        class_name: class_name.to_owned(),
        source: line.to_owned(),
        start_line: index + 1,
        end_line: index + 1,
        javadoc: String::new(),
        package: DEFAULT_PACKAGE.to_owned(),
        modifiers: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_classes_and_public_methods() {
        let source = "public class Broken {\n  public void run() { if ( }\n  private void hidden() {}\n";
        let elements = parse(source);
        assert_eq!(elements.len(), 2);

        assert_eq!(elements[0].kind, ElementKind::Class);
        assert_eq!(elements[0].name, "Broken");
        assert_eq!(elements[0].start_line, 1);

        assert_eq!(elements[1].kind, ElementKind::Method);
        assert_eq!(elements[1].name, "run");
        assert_eq!(elements[1].class_name, "Broken");
        assert_eq!(elements[1].source, "public void run() { if ( }");
        assert_eq!(elements[1].line_count(), 1);
    }

    #[test]
    fn methods_before_a_class_use_placeholder() {
        let elements = parse("public static int size(Cart c) {\n");
        assert_eq!(elements[0].class_name, UNKNOWN_CLASS);
        assert_eq!(elements[0].name, "size");
        assert_eq!(elements[0].package, DEFAULT_PACKAGE);
    }
}
