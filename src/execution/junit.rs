#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Just enough XML to read the JUnit reports pytest writes.

use std::{path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use super::TestResult;

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag name.
    pub name:     String,
    /// Attributes in document order, values unescaped.
    pub attrs:    Vec<(String, String)>,
    /// Child nodes; comments and processing instructions are dropped.
    pub children: Vec<Node>,
}

/// Element content.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, unescaped.
    Text(String),
}

impl Element {
    /// Value of the attribute `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated character data of the direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Numeric character references.
static CHAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("char ref regex"));

/// Replaces the predefined entities and numeric character references.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let numeric = CHAR_REF.replace_all(raw, |caps: &Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        value
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

peg::parser! {
    /// A small, non-validating XML grammar.
    grammar xml() for str {
        /// optional whitespace
        rule _ = quiet!{[' ' | '\n' | '\t' | '\r']*}

        /// tag and attribute names
        rule name() -> String
            = n:$(['a'..='z' | 'A'..='Z' | '_' | ':']
                  ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | ':' | '-' | '.']*)
            { n.to_string() }

        /// a single or double quoted attribute value
        rule value() -> String
            = "\"" v:$([^ '"']*) "\"" { unescape(v) }
            / "'" v:$([^ '\'']*) "'" { unescape(v) }

        /// `key="value"`
        rule attribute() -> (String, String)
            = k:name() _ "=" _ v:value() { (k, v) }

        /// zero or more attributes
        rule attributes() -> Vec<(String, String)>
            = a:(_ a:attribute() { a })* { a }

        /// `<!-- ... -->`
        rule comment()
            = "<!--" (!"-->" [_])* "-->"

        /// `<? ... ?>`
        rule instruction()
            = "<?" (!"?>" [_])* "?>"

        /// `<!DOCTYPE ...>`
        rule doctype()
            = "<!DOCTYPE" (!">" [_])* ">"

        /// whatever may surround the root element
        rule misc()
            = (_ (comment() / instruction() / doctype()))* _

        /// `<![CDATA[ ... ]]>`, kept verbatim
        rule cdata() -> Node
            = "<![CDATA[" t:$((!"]]>" [_])*) "]]>" { Node::Text(t.to_string()) }

        /// character data up to the next tag
        rule text() -> Node
            = t:$([^ '<']+) { Node::Text(unescape(t)) }

        /// one piece of element content
        rule content() -> Option<Node>
            = e:element() { Some(Node::Element(e)) }
            / c:cdata() { Some(c) }
            / comment() { None }
            / instruction() { None }
            / t:text() { Some(t) }

        /// `<name ... />`
        rule empty_element() -> Element
            = "<" n:name() a:attributes() _ "/>"
            { Element { name: n, attrs: a, children: Vec::new() } }

        /// `<name ...> content </name>`
        rule full_element() -> Element
            = "<" n:name() a:attributes() _ ">" c:content()* "</" close:name() _ ">"
            {?
                if close == n {
                    Ok(Element { name: n, attrs: a, children: c.into_iter().flatten().collect() })
                } else {
                    Err("matching close tag")
                }
            }

        /// any element
        rule element() -> Element
            = empty_element() / full_element()

        /// a whole document, returning its root element
        pub rule document() -> Element
            = misc() e:element() misc() ![_] { e }
    }
}

/// Parses an XML document into its root element.
pub fn parse_document(source: &str) -> Result<Element> {
    xml::document(source).context("Could not parse XML document")
}

/// Extracts test outcomes from JUnit XML text.
///
/// A `<testcase>` with a `<failure>` or `<error>` child failed, and that
/// child's text (or `message` attribute when the text is empty) is the
/// error. Everything else passed.
pub fn parse_junit_xml(source: &str) -> Result<Vec<TestResult>> {
    let root = parse_document(source)?;
    let mut results = Vec::new();
    collect_testcases(&root, &mut results);
    Ok(results)
}

/// Reads and parses a JUnit report, yielding no tests if it is missing or
/// unreadable.
pub fn read_junit_report(path: &Path) -> Vec<TestResult> {
    if !path.exists() {
        return Vec::new();
    }

    match std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))
        .and_then(|source| parse_junit_xml(&source))
    {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!("Ignoring JUnit report {}: {e:#}", path.display());
            Vec::new()
        }
    }
}

/// Depth-first walk collecting every `testcase` element.
fn collect_testcases(element: &Element, out: &mut Vec<TestResult>) {
    if element.name == "testcase" {
        out.push(to_test_result(element));
        return;
    }

    for child in element.elements() {
        collect_testcases(child, out);
    }
}

/// Converts one `testcase` element.
fn to_test_result(testcase: &Element) -> TestResult {
    let test_name = testcase.attr("name").unwrap_or("unknown").to_string();
    let duration_seconds = testcase
        .attr("time")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let problem = testcase
        .child("failure")
        .or_else(|| testcase.child("error"));

    let error_message = problem.map(|p| {
        let text = p.text();
        if text.trim().is_empty() {
            p.attr("message").unwrap_or_default().to_string()
        } else {
            text
        }
    });

    TestResult {
        test_name,
        passed: problem.is_none(),
        error_message,
        duration_seconds,
    }
}
