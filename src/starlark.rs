//! Starlark Rendering
//!
//! A small model of Bazel rule instances and the code to render them as
//! `BUILD` file content. Only the value types needed by the schema targets
//! are supported.
//!
//! Rendering is deterministic. Attributes are sorted by name (with `name`
//! first), single-element lists are rendered inline, and longer lists are
//! rendered one element per line with trailing commas.

/// Bazel Label
///
/// A label as it appears in a `BUILD` file, either a file in the current
/// package (`foo.xsd`) or a target in the current package (`:foo`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    /// Create a label referring to a target of the current package.
    pub fn module(name: &str) -> Self {
        Self(format!(":{}", name))
    }

    /// Create a label referring to a file of the current package.
    pub fn file(path: &str) -> Self {
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attribute Value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    String(String),
    Label(Label),
    LabelList(Vec<Label>),
    StringList(Vec<String>),
    /// A label list extended by a configurable part, rendered as
    /// `base + select({condition: labels, ...})`.
    LabelListSelect {
        base: Vec<Label>,
        arms: Vec<(String, Vec<Label>)>,
    },
}

impl Value {
    // Values that are equivalent to an unset attribute.
    fn is_unset(&self) -> bool {
        match self {
            Value::Bool(v) => !*v,
            Value::String(v) => v.is_empty(),
            Value::Label(_) => false,
            Value::LabelList(v) => v.is_empty(),
            Value::StringList(v) => v.is_empty(),
            Value::LabelListSelect { base, arms } => {
                base.is_empty() && arms.iter().all(|(_, v)| v.is_empty())
            },
        }
    }
}

/// Rule Attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub value: Value,
}

/// Rule Instance
///
/// A single rule instance of a `BUILD` file. `load` is the `.bzl` file the
/// rule class has to be loaded from, or `None` for native rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub class: &'static str,
    pub load: Option<&'static str>,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl Rule {
    pub fn new(class: &'static str, load: Option<&'static str>, name: &str) -> Self {
        Self {
            class: class,
            load: load,
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute
    ///
    /// Add the attribute to the rule, unless the value is equivalent to not
    /// setting the attribute at all (`False`, empty strings, empty lists).
    pub fn attr(mut self, name: &'static str, value: Value) -> Self {
        if !value.is_unset() {
            self.attributes.push(Attribute { name: name, value: value });
        }
        self
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.iter()
            .find(|v| v.name == name)
            .map(|v| &v.value)
    }

    /// Render the rule
    ///
    /// Render the rule instance as Starlark code, without trailing newline.
    pub fn render(&self) -> String {
        let mut attributes: Vec<&Attribute> = self.attributes.iter().collect();
        attributes.sort_by_key(|v| v.name);

        let mut r = format!("{}(\n    name = {},\n", self.class, quote(&self.name));
        for attribute in attributes {
            r.push_str(&format!(
                "    {} = {},\n",
                attribute.name,
                render_value(&attribute.value, 4),
            ));
        }
        r.push(')');
        r
    }
}

// Quote a string as Starlark string literal.
fn quote(s: &str) -> String {
    let mut r = String::with_capacity(s.len() + 2);
    r.push('"');
    for c in s.chars() {
        match c {
            '\\' => r.push_str("\\\\"),
            '"' => r.push_str("\\\""),
            '\n' => r.push_str("\\n"),
            _ => r.push(c),
        }
    }
    r.push('"');
    r
}

// Render a list of already rendered items. `indent` is the indentation of
// the line the list starts on.
fn render_list(items: Vec<String>, indent: usize) -> String {
    match items.len() {
        0 => "[]".to_string(),
        1 => format!("[{}]", items[0]),
        _ => {
            let mut r = "[\n".to_string();
            for item in items {
                r.push_str(&" ".repeat(indent + 4));
                r.push_str(&item);
                r.push_str(",\n");
            }
            r.push_str(&" ".repeat(indent));
            r.push(']');
            r
        },
    }
}

fn render_labels(labels: &[Label], indent: usize) -> String {
    render_list(labels.iter().map(|v| quote(v.as_str())).collect(), indent)
}

fn render_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(v) => quote(v),
        Value::Label(v) => quote(v.as_str()),
        Value::LabelList(v) => render_labels(v, indent),
        Value::StringList(v) => {
            render_list(v.iter().map(|v| quote(v)).collect(), indent)
        },
        Value::LabelListSelect { base, arms } => {
            let mut r = String::new();
            if !base.is_empty() {
                r.push_str(&render_labels(base, indent));
                r.push_str(" + ");
            }
            r.push_str("select({\n");
            for (condition, labels) in arms.iter() {
                r.push_str(&format!(
                    "{}{}: {},\n",
                    " ".repeat(indent + 4),
                    quote(condition),
                    render_labels(labels, indent + 4),
                ));
            }
            r.push_str(&" ".repeat(indent));
            r.push_str("})");
            r
        },
    }
}

/// Render a `BUILD` file
///
/// Render all rules into a single file. The required `load()` statements are
/// collected from the rules, sorted, and put at the top of the file.
pub fn render_file(rules: &[Rule]) -> String {
    let mut loads: std::collections::BTreeMap<&str, std::collections::BTreeSet<&str>> =
        std::collections::BTreeMap::new();
    for rule in rules.iter() {
        if let Some(location) = rule.load {
            loads.entry(location).or_default().insert(rule.class);
        }
    }

    let mut r = "# Generated by xsd-config\n".to_string();

    if !loads.is_empty() {
        r.push('\n');
        for (location, classes) in loads.iter() {
            let symbols: Vec<String> = classes.iter().map(|v| quote(v)).collect();
            r.push_str(&format!("load({}, {})\n", quote(location), symbols.join(", ")));
        }
    }

    for rule in rules.iter() {
        r.push('\n');
        r.push_str(&rule.render());
        r.push('\n');
    }

    r
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify list rendering
    //
    // Single elements are rendered inline, multiple elements get one line
    // each, indented relative to the attribute.
    #[test]
    fn render_lists() {
        let rule = Rule::new("filegroup", None, "foo")
            .attr("srcs", Value::LabelList(vec![Label::file("foo.xsd")]));
        assert_eq!(
            rule.render(),
            "filegroup(\n    name = \"foo\",\n    srcs = [\"foo.xsd\"],\n)",
        );

        let rule = Rule::new("filegroup", None, "foo")
            .attr("srcs", Value::LabelList(vec![
                Label::file("foo.xsd"),
                Label::file("foo.include.xsd"),
            ]));
        assert_eq!(
            rule.render(),
            concat!(
                "filegroup(\n",
                "    name = \"foo\",\n",
                "    srcs = [\n",
                "        \"foo.xsd\",\n",
                "        \"foo.include.xsd\",\n",
                "    ],\n",
                ")",
            ),
        );
    }

    // Verify unset attributes
    //
    // False booleans, empty strings and empty lists are not rendered at all.
    // Remaining attributes are sorted by name.
    #[test]
    fn render_unset() {
        let rule = Rule::new("cc_library", None, "foo")
            .attr("tinyxml", Value::Bool(false))
            .attr("package_name", Value::String(String::new()))
            .attr("root_elements", Value::StringList(vec![]))
            .attr("src", Value::Label(Label::file("foo.xsd")))
            .attr("gen_writer", Value::Bool(true));

        assert_eq!(rule.attributes.len(), 2);
        assert_eq!(rule.get("tinyxml"), None);
        assert_eq!(
            rule.render(),
            "cc_library(\n    name = \"foo\",\n    gen_writer = True,\n    src = \"foo.xsd\",\n)",
        );
    }

    // Verify select rendering
    #[test]
    fn render_select() {
        let rule = Rule::new("java_library", None, "foo")
            .attr("deps", Value::LabelListSelect {
                base: vec![Label::module("a")],
                arms: vec![
                    ("//cond:x".to_string(), vec![]),
                    ("//conditions:default".to_string(), vec![Label::module("b"), Label::module("c")]),
                ],
            });

        assert_eq!(
            rule.render(),
            concat!(
                "java_library(\n",
                "    name = \"foo\",\n",
                "    deps = [\":a\"] + select({\n",
                "        \"//cond:x\": [],\n",
                "        \"//conditions:default\": [\n",
                "            \":b\",\n",
                "            \":c\",\n",
                "        ],\n",
                "    }),\n",
                ")",
            ),
        );
    }

    // Verify file rendering
    //
    // Loads are deduplicated and sorted, native rules need no load.
    #[test]
    fn render_file_loads() {
        let rules = vec![
            Rule::new("filegroup", None, "a"),
            Rule::new("z_rule", Some("//z:z.bzl"), "b"),
            Rule::new("a_rule", Some("//a:a.bzl"), "c"),
            Rule::new("z_rule", Some("//z:z.bzl"), "d"),
        ];

        let s = render_file(&rules);
        assert!(s.starts_with(concat!(
            "# Generated by xsd-config\n",
            "\n",
            "load(\"//a:a.bzl\", \"a_rule\")\n",
            "load(\"//z:z.bzl\", \"z_rule\")\n",
            "\n",
            "filegroup(\n",
        )));
        assert_eq!(s.matches("z_rule(").count(), 2);
    }

    // Verify string escaping
    #[test]
    fn render_escape() {
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }
}
