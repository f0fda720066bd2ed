use super::error::TreeError;
use super::node::NodeId;
use super::tree::FragTree;
use crate::libs::formula::Formula;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};
use std::collections::BTreeMap;

// ================================================================================================
// Error Handling Structures
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// A nom error that accumulates context and error kinds.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedError<'a> {
    pub errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

// ================================================================================================
// Intermediate Structure
// ================================================================================================

/// Recursive node produced by the grammar, converted into the arena afterwards.
#[derive(Debug)]
struct ParsedNode {
    label: Option<String>,
    length: Option<f64>,
    properties: BTreeMap<String, String>,
    children: Vec<ParsedNode>,
}

impl ParsedNode {
    fn new() -> Self {
        Self {
            label: None,
            length: None,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Moves this node and its descendants into `tree`.
    ///
    /// Label mapping:
    /// * non-root label -> loss formula, root label -> tree name
    /// * branch length or `W=` -> weight
    /// * `F=` -> fragment formula, `N=` -> node name
    fn into_tree(self, tree: &mut FragTree, is_root: bool) -> Result<NodeId, TreeError> {
        let id = tree.add_node();
        for child in self.children {
            let child_id = child.into_tree(tree, false)?;
            tree.add_child(id, child_id)?;
        }

        let loss = match (&self.label, is_root) {
            (Some(l), false) => Some(Formula::parse(l)?),
            _ => None,
        };
        let fragment = match self.properties.get("F") {
            Some(f) => Some(Formula::parse(f)?),
            None => None,
        };
        let weight = match self.properties.get("W") {
            Some(w) => w.parse::<f64>().map_err(|e| {
                TreeError::LogicError(format!("Invalid weight \"{}\": {}", w, e))
            })?,
            None => self.length.unwrap_or(0.0),
        };
        let name = match (self.properties.get("N"), is_root) {
            (Some(n), _) => Some(n.clone()),
            (None, true) => self.label.clone(),
            (None, false) => None,
        };

        if let Some(node) = tree.get_node_mut(id) {
            node.loss = loss;
            node.fragment = fragment;
            node.weight = weight;
            node.name = name;
        }
        Ok(id)
    }

    fn to_tree(self) -> Result<FragTree, TreeError> {
        let mut tree = FragTree::new();
        let root_id = self.into_tree(&mut tree, true)?;
        tree.set_root(root_id);
        Ok(tree)
    }
}

// ================================================================================================
// Parsers
// ================================================================================================

// Ignore surrounding whitespace
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Unquoted labels stop at "():;,[]"; quoted labels use '' or "" as escapes
fn parse_label(input: &str) -> IResult<&str, String, DetailedError<'_>> {
    let unquoted = map(
        take_while(|c: char| !"():;,[]".contains(c)),
        |s: &str| s.trim().to_string(),
    );

    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

// ":0.123", scientific notation allowed
fn parse_length(input: &str) -> IResult<&str, f64, DetailedError<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// [&&NHX:F=C6H12O6:N=peak1] or [F=C6H12O6 N=peak1]; other comments are dropped
fn parse_comment(input: &str) -> IResult<&str, BTreeMap<String, String>, DetailedError<'_>> {
    let comment_content = delimited(ws(char('[')), is_not("]"), char(']'));

    context(
        "comment",
        map(opt(comment_content), |content: Option<&str>| {
            let mut props = BTreeMap::new();
            if let Some(s) = content {
                if let Some(rest) = s.strip_prefix("&&NHX") {
                    for part in rest.split(':') {
                        if let Some((k, v)) = part.split_once('=') {
                            props.insert(k.to_string(), v.to_string());
                        }
                    }
                } else {
                    for part in s.split_whitespace() {
                        if let Some((k, v)) = part.split_once('=') {
                            props.insert(k.to_string(), v.to_string());
                        }
                    }
                }
            }
            props
        }),
    )
    .parse(input)
}

// (child1, child2, ...)Label:Length[Comment]
fn parse_subtree(input: &str) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), parse_subtree),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, label) = opt(parse_label).parse(input)?;

    // comments may come before or after the length
    let (input, comment1) = parse_comment(input)?;
    let (input, length) = opt(parse_length).parse(input)?;
    let (input, comment2) = parse_comment(input)?;

    let mut node = ParsedNode::new();
    if let Some(c) = children {
        node.children = c;
    }
    if let Some(l) = label {
        if !l.is_empty() {
            node.label = Some(l);
        }
    }
    node.length = length;
    node.properties.extend(comment1);
    node.properties.extend(comment2);

    Ok((input, node))
}

// ================================================================================================
// Entry Points
// ================================================================================================

/// Parses a single Newick fragmentation tree, terminated by ';'.
pub fn parse_newick(input: &str) -> Result<FragTree, TreeError> {
    let mut parser = (ws(parse_subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (root_node, _))) => root_node.to_tree(),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

/// Parses all trees of a string. Top-level `[...]` blocks are skipped.
pub fn parse_newick_multi(input: &str) -> Result<Vec<FragTree>, TreeError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let valid_tree = map((ws(parse_subtree), ws(char(';'))), |(root, _)| Some(root));
    let garbage = map(
        ws(delimited(char('['), take_while(|c| c != ']'), char(']'))),
        |_| None,
    );
    let mut parser = many1(alt((valid_tree, garbage)));

    match parser.parse(input) {
        Ok((rest, trees_data)) => {
            if !rest.trim().is_empty() {
                return Err(make_tree_error(
                    input,
                    DetailedError::from_error_kind(rest, ErrorKind::Eof),
                ));
            }
            trees_data
                .into_iter()
                .flatten()
                .map(|root_node| root_node.to_tree())
                .collect()
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(incomplete()),
    }
}

fn incomplete() -> TreeError {
    TreeError::ParseError {
        message: "Incomplete input".to_string(),
        line: 0,
        column: 0,
        snippet: "".to_string(),
    }
}

// Convert nom errors into a TreeError with line/column
fn make_tree_error(input: &str, e: DetailedError) -> TreeError {
    let remaining = e.errors.first().map(|(r, _)| *r).unwrap_or(input);
    let offset = input.offset(remaining);

    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - last_newline + 1;

    let mut msg = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => {
                msg.push_str(&format!("while parsing {}:\n", ctx));
            }
            DetailedErrorKind::Nom(k) => {
                msg.push_str(&format!("  error: {:?}\n", k));
            }
        }
    }

    TreeError::ParseError {
        message: msg,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl FragTree {
    /// Parse a Newick string into a FragTree.
    ///
    /// # Example
    /// ```
    /// use ftalign::libs::fragtree::FragTree;
    ///
    /// let tree = FragTree::from_newick("(H2O:1.5,CO[&&NHX:F=C5H8O])root;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// assert!(FragTree::from_newick("(H2O,Xy)root;").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }

    pub fn from_newick_multi(input: &str) -> Result<Vec<Self>, TreeError> {
        parse_newick_multi(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_losses() {
        let tree = FragTree::from_newick("((CO,H2O)CH4,C2H2)root;").unwrap();
        assert_eq!(tree.len(), 5);

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.name.as_deref(), Some("root"));
        assert!(root.loss.is_none());
        assert_eq!(root.children.len(), 2);

        let inner = tree.get_node(root.children[0]).unwrap();
        assert_eq!(inner.loss.as_ref().unwrap().to_string(), "CH4");
        let leaf = tree.get_node(inner.children[1]).unwrap();
        assert_eq!(leaf.loss.as_ref().unwrap().to_string(), "H2O");
    }

    #[test]
    fn test_parser_weights_and_nhx() {
        let input = "(H2O:2.5[&&NHX:F=C5H10O4:N=p1],CO[&&NHX:W=0.5])[&&NHX:F=C6H12O5];";
        let tree = FragTree::from_newick(input).unwrap();

        let root = tree.get_node(tree.get_root().unwrap()).unwrap();
        assert_eq!(root.fragment.as_ref().unwrap().to_string(), "C6H12O5");
        assert_eq!(root.name, None);

        let c0 = tree.get_node(root.children[0]).unwrap();
        assert_eq!(c0.weight, 2.5);
        assert_eq!(c0.name.as_deref(), Some("p1"));
        assert_eq!(c0.fragment.as_ref().unwrap().to_string(), "C5H10O4");

        let c1 = tree.get_node(root.children[1]).unwrap();
        assert_eq!(c1.weight, 0.5);
    }

    #[test]
    fn test_parser_multi() {
        let input = "[header]\n(CO,H2O)a;\n(CO)b;\n";
        let trees = FragTree::from_newick_multi(input).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].name(), Some("a"));
        assert_eq!(trees[1].name(), Some("b"));
        assert_eq!(trees[1].len(), 2);

        assert!(FragTree::from_newick_multi("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parser_invalid_label() {
        let res = FragTree::from_newick("(CO,Qz)root;");
        assert!(matches!(res, Err(TreeError::InvalidLabel(_))));
    }

    #[test]
    fn test_parser_error() {
        let res = FragTree::from_newick("(CO,H2O)root");
        match res {
            Err(TreeError::ParseError { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 13);
            }
            _ => panic!("Expected ParseError, got {:?}", res),
        }

        let res = FragTree::from_newick("(CO:x,H2O)root;");
        match res {
            Err(TreeError::ParseError { message, .. }) => {
                assert!(message.contains("length"));
            }
            _ => panic!("Expected ParseError, got {:?}", res),
        }
    }
}
