//! Struct declaration and field extraction from a single Go file.
//!
//! Only top-level `type X struct { ... }` declarations are considered. Fields
//! are filtered by Go's exported-name rule, and anonymous (embedded) members
//! are replaced by the exported fields of the struct they name when that
//! struct is declared in the same file. Expansion is one level deep.
//!
//! # Examples
//!
//! ```no_run
//! use structscan::extract_structs;
//! use std::path::Path;
//!
//! let parsed = extract_structs(Path::new("models/user.go")).unwrap();
//! for parsed_struct in parsed.structs.values() {
//!     println!("{}: {:?}", parsed_struct.decl.name, parsed_struct.field_names());
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::Config;
use crate::package::resolve_import_path;
use crate::parse::{find_child_by_kind, parse_go_file, GoSource};
use crate::{Location, Result};

/// Stable identity of a struct declaration: its name and where the name appears.
///
/// Ordering follows source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructId {
    pub line: u32,
    pub column: u32,
    pub name: String,
}

impl std::fmt::Display for StructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.line, self.column)
    }
}

/// A top-level struct type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDecl {
    pub id: StructId,
    /// Declared name: "User"
    pub name: String,
    /// Doc comment lines, verbatim: ["// User is a customer."]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Type parameter list for generic structs: "[T any]"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_params: Option<String>,
    /// Location of the declared name
    pub location: Location,
}

impl StructDecl {
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// A resolved struct field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Declared type, verbatim: "*time.Time"
    pub type_name: String,
    /// Struct tag literal, verbatim: "`gorm:\"column:id\"`"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Embedded struct this field was promoted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_from: Option<String>,
    pub location: Location,
}

/// A struct declaration with its resolved fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStruct {
    pub decl: StructDecl,
    pub fields: Vec<Field>,
}

impl ParsedStruct {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// The package a file belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Name from the `package` clause: "models"
    pub name: String,
    /// Fully qualified import path: "github.com/acme/shop/models"
    pub import_path: String,
}

/// Everything extracted from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub package: Package,
    #[serde(
        serialize_with = "serialize_structs",
        deserialize_with = "deserialize_structs"
    )]
    pub structs: BTreeMap<StructId, ParsedStruct>,
}

impl ParsedFile {
    /// Look up a struct by declared name.
    pub fn get(&self, name: &str) -> Option<&ParsedStruct> {
        self.structs.values().find(|s| s.decl.name == name)
    }
}

// Struct keys are not strings, so emit the structs as a list in source order
fn serialize_structs<S: Serializer>(
    structs: &BTreeMap<StructId, ParsedStruct>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(structs.values())
}

fn deserialize_structs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<StructId, ParsedStruct>, D::Error> {
    let structs = Vec::<ParsedStruct>::deserialize(deserializer)?;
    Ok(structs
        .into_iter()
        .map(|parsed| (parsed.decl.id.clone(), parsed))
        .collect())
}

/// A member of a struct body before embedding is resolved
#[derive(Debug, Clone)]
enum Member {
    Named(Field),
    Embedded { type_name: String, location: Location },
}

#[derive(Debug, Clone)]
struct RawStruct {
    decl: StructDecl,
    members: Vec<Member>,
}

/// Collect every top-level struct declaration in a file, keyed by name.
///
/// Non-struct declarations are skipped. Fails if the file cannot be read or
/// parsed, including when it is empty.
pub fn collect_struct_names(path: &Path) -> Result<HashMap<String, StructDecl>> {
    let source = parse_go_file(path)?;
    let mut by_name = HashMap::new();
    for raw in collect_raw_structs(&source) {
        let name = raw.decl.name.clone();
        if by_name.contains_key(&name) {
            tracing::warn!(
                "Duplicate struct {} at {}, keeping first",
                name,
                raw.decl.location
            );
            continue;
        }
        by_name.insert(name, raw.decl);
    }
    Ok(by_name)
}

/// Extract the package and all struct declarations with resolved fields.
///
/// Configuration is loaded from the nearest `.structscan.toml` at or above the
/// file's directory, then the environment (see [`Config::load`]).
pub fn extract_structs(path: &Path) -> Result<ParsedFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let config = Config::load(dir);
    extract_structs_with_config(path, &config)
}

/// Like [`extract_structs`] with an explicit configuration.
pub fn extract_structs_with_config(path: &Path, config: &Config) -> Result<ParsedFile> {
    let source = parse_go_file(path)?;
    let package = Package {
        name: source.package_name().to_string(),
        import_path: resolve_import_path(path, config),
    };

    let raw_structs = collect_raw_structs(&source);
    let structs = resolve_fields(&raw_structs);

    tracing::debug!(
        "Extracted {} structs from {:?} ({})",
        structs.len(),
        path,
        package.import_path
    );

    Ok(ParsedFile { package, structs })
}

/// Resolve each struct's members into its final field list.
///
/// Direct fields come first in source order, then fields promoted from
/// embedded structs in the order the embeddings appear.
fn resolve_fields(raw_structs: &[RawStruct]) -> BTreeMap<StructId, ParsedStruct> {
    let mut by_name: HashMap<&str, &RawStruct> = HashMap::new();
    for raw in raw_structs {
        by_name.entry(raw.decl.name.as_str()).or_insert(raw);
    }

    let mut structs = BTreeMap::new();
    for raw in raw_structs {
        let mut fields: Vec<Field> = exported_fields(&raw.members).cloned().collect();

        for member in &raw.members {
            let Member::Embedded {
                type_name,
                location,
            } = member
            else {
                continue;
            };
            match by_name.get(type_name.as_str()) {
                Some(target) => {
                    fields.extend(exported_fields(&target.members).map(|field| Field {
                        embedded_from: Some(type_name.clone()),
                        ..field.clone()
                    }));
                }
                None => {
                    tracing::debug!(
                        "Embedded type {} at {} is not declared in this file",
                        type_name,
                        location
                    );
                }
            }
        }

        tracing::trace!("Struct {} has fields {:?}", raw.decl.id, fields);
        structs.insert(
            raw.decl.id.clone(),
            ParsedStruct {
                decl: raw.decl.clone(),
                fields,
            },
        );
    }
    structs
}

fn exported_fields(members: &[Member]) -> impl Iterator<Item = &Field> {
    members.iter().filter_map(|member| match member {
        Member::Named(field) if is_exported(&field.name) => Some(field),
        _ => None,
    })
}

/// Walk top-level type declarations and collect the struct-shaped ones.
fn collect_raw_structs(source: &GoSource) -> Vec<RawStruct> {
    let root = source.root();
    let mut structs = Vec::new();

    let mut cursor = root.walk();
    for decl in root.children(&mut cursor) {
        if decl.kind() != "type_declaration" {
            continue;
        }
        let grouped = find_child_by_kind(&decl, "(").is_some();

        let mut spec_cursor = decl.walk();
        for spec in decl.children(&mut spec_cursor) {
            // type_alias (`type A = B`) never declares a new struct
            if spec.kind() != "type_spec" {
                continue;
            }
            if let Some(raw) = extract_struct_spec(source, &decl, &spec, grouped) {
                structs.push(raw);
            }
        }
    }

    structs
}

fn extract_struct_spec(
    source: &GoSource,
    declaration: &tree_sitter::Node,
    spec: &tree_sitter::Node,
    grouped: bool,
) -> Option<RawStruct> {
    let name_node = spec.child_by_field_name("name")?;
    let type_node = spec.child_by_field_name("type")?;
    if type_node.kind() != "struct_type" {
        return None;
    }

    let name = source.node_text(&name_node).to_string();
    let location = source.location(&name_node);

    let mut doc = extract_doc_comments(source, spec);
    if doc.is_empty() && !grouped {
        doc = extract_doc_comments(source, declaration);
    }

    let decl = StructDecl {
        id: StructId {
            line: location.line,
            column: location.column,
            name: name.clone(),
        },
        name,
        doc,
        type_params: spec
            .child_by_field_name("type_parameters")
            .map(|params| source.node_text(&params).to_string()),
        location,
    };

    let members = find_child_by_kind(&type_node, "field_declaration_list")
        .map(|list| extract_members(source, &list))
        .unwrap_or_default();

    Some(RawStruct { decl, members })
}

/// Extract all members of a struct body, exported or not.
fn extract_members(source: &GoSource, field_list: &tree_sitter::Node) -> Vec<Member> {
    let mut members = Vec::new();

    let mut cursor = field_list.walk();
    for field in field_list.children(&mut cursor) {
        if field.kind() != "field_declaration" {
            continue;
        }

        let type_node = field.child_by_field_name("type");
        let tag = field
            .child_by_field_name("tag")
            .map(|tag| source.node_text(&tag).to_string());

        // A field can have multiple names: X, Y int
        let mut name_cursor = field.walk();
        let names: Vec<_> = field
            .children_by_field_name("name", &mut name_cursor)
            .collect();

        if names.is_empty() {
            match type_node.and_then(|t| embedded_type_name(source, &t)) {
                Some(type_name) => members.push(Member::Embedded {
                    type_name,
                    location: source.location(&field),
                }),
                None => tracing::debug!(
                    "Skipping unsupported embedded member at {}",
                    source.location(&field)
                ),
            }
            continue;
        }

        let type_name = type_node
            .map(|t| source.node_text(&t).to_string())
            .unwrap_or_default();
        for name_node in names {
            members.push(Member::Named(Field {
                name: source.node_text(&name_node).to_string(),
                type_name: type_name.clone(),
                tag: tag.clone(),
                embedded_from: None,
                location: source.location(&name_node),
            }));
        }
    }

    members
}

/// Name of a struct declared in this file that an embedded member refers to.
///
/// Handles `T`, `*T` and `T[int]`. For `*T` the grammar emits a bare `*`
/// token before the `type` field, so only the type node needs inspecting.
/// Qualified types like `pkg.T` live in other packages and can't be resolved here.
fn embedded_type_name(source: &GoSource, type_node: &tree_sitter::Node) -> Option<String> {
    match type_node.kind() {
        "type_identifier" => Some(source.node_text(type_node).to_string()),
        "generic_type" => type_node
            .child_by_field_name("type")
            .and_then(|inner| embedded_type_name(source, &inner)),
        _ => None,
    }
}

/// Collect the block of comments directly above `node`.
///
/// Comments must be on consecutive lines ending on the line right before the
/// node. A comment that trails code on the same line ends the block.
fn extract_doc_comments(source: &GoSource, node: &tree_sitter::Node) -> Vec<String> {
    let mut docs = Vec::new();
    let mut next_row = node.start_position().row;
    let mut prev = node.prev_sibling();

    while let Some(sibling) = prev {
        if sibling.kind() != "comment" {
            // Statement terminators are anonymous tokens between specs
            if !sibling.is_named() && matches!(sibling.kind(), "\n" | ";") {
                prev = sibling.prev_sibling();
                continue;
            }
            break;
        }
        if sibling.end_position().row + 1 != next_row {
            break;
        }
        let trails_code = sibling
            .prev_sibling()
            .map(|p| p.is_named() && p.end_position().row == sibling.start_position().row)
            .unwrap_or(false);
        if trails_code {
            break;
        }

        docs.push(source.node_text(&sibling).trim_end().to_string());
        next_row = sibling.start_position().row;
        prev = sibling.prev_sibling();
    }

    docs.reverse();
    docs
}

/// Go's exported-name rule: the first character is an uppercase letter.
fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_go_source;

    fn raw_structs(code: &str) -> Vec<RawStruct> {
        let source = parse_go_source(Path::new("test.go"), code.to_string()).unwrap();
        collect_raw_structs(&source)
    }

    fn resolved(code: &str) -> BTreeMap<StructId, ParsedStruct> {
        resolve_fields(&raw_structs(code))
    }

    fn fields_of<'a>(structs: &'a BTreeMap<StructId, ParsedStruct>, name: &str) -> Vec<&'a str> {
        structs
            .values()
            .find(|s| s.decl.name == name)
            .unwrap_or_else(|| panic!("no struct {name}"))
            .field_names()
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("ID"));
        assert!(is_exported("Name"));
        assert!(!is_exported("name"));
        assert!(!is_exported("_Name"));
        assert!(!is_exported(""));
    }

    #[test]
    fn extracts_only_struct_declarations() {
        let structs = raw_structs(
            r#"
package p

type Count int
type Reader interface { Read() }
type Alias = Other
type User struct { Name string }
var v struct { F int }
const c = 1

func f() {
    type Local struct { X int }
}
"#,
        );
        let names: Vec<_> = structs.iter().map(|s| s.decl.name.as_str()).collect();
        assert_eq!(names, vec!["User"]);
    }

    #[test]
    fn extracts_grouped_type_declarations() {
        let structs = raw_structs(
            r#"
package p

type (
    // A is first.
    A struct { X int }
    B int
    // C is last.
    C struct { Y int }
)
"#,
        );
        let names: Vec<_> = structs.iter().map(|s| s.decl.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(structs[0].decl.doc, vec!["// A is first."]);
        assert_eq!(structs[1].decl.doc, vec!["// C is last."]);
    }

    #[test]
    fn extracts_multi_name_fields_and_tags() {
        let structs = resolved(
            r#"
package geo

type Point struct {
    X, Y float64 `json:"coord"`
    label string
    Next *Point
}
"#,
        );
        let point = structs.values().next().unwrap();
        assert_eq!(point.field_names(), vec!["X", "Y", "Next"]);
        assert_eq!(point.fields[0].type_name, "float64");
        assert_eq!(point.fields[1].tag.as_deref(), Some("`json:\"coord\"`"));
        assert_eq!(point.fields[2].type_name, "*Point");
        assert_eq!(point.fields[2].tag, None);
    }

    #[test]
    fn extracts_doc_comment_lines_verbatim() {
        let structs = raw_structs(
            "package p\n\n// User is a customer.\n//\n// It is stored in users.\ntype User struct {}\n",
        );
        assert_eq!(
            structs[0].decl.doc,
            vec!["// User is a customer.", "//", "// It is stored in users."]
        );
    }

    #[test]
    fn doc_comment_requires_no_blank_line() {
        let structs = raw_structs("package p\n\n// Detached comment.\n\ntype User struct {}\n");
        assert!(structs[0].decl.doc.is_empty());
    }

    #[test]
    fn doc_comment_stops_at_blank_line() {
        let structs = raw_structs(
            "package p\n\n// License header.\n\n// User doc.\ntype User struct {}\n",
        );
        assert_eq!(structs[0].decl.doc, vec!["// User doc."]);
    }

    #[test]
    fn trailing_comment_is_not_doc() {
        let structs = raw_structs(
            "package p\n\nvar x = 1 // about x\ntype User struct {}\n",
        );
        assert!(structs[0].decl.doc.is_empty());
    }

    #[test]
    fn embeds_declared_before() {
        let structs = resolved(
            r#"
package p

type m struct {
    ID int
}

type T struct {
    m
    F int
}
"#,
        );
        assert_eq!(structs.len(), 2);
        assert_eq!(fields_of(&structs, "T"), vec!["F", "ID"]);
        let t = structs.values().find(|s| s.decl.name == "T").unwrap();
        assert_eq!(t.fields[1].embedded_from.as_deref(), Some("m"));
        assert_eq!(t.fields[0].embedded_from, None);
    }

    #[test]
    fn embeds_declared_after() {
        let structs = resolved(
            r#"
package p

type T struct {
    m
    F int
}

type m struct {
    ID int
}
"#,
        );
        assert_eq!(fields_of(&structs, "T"), vec!["F", "ID"]);
    }

    #[test]
    fn embedding_expands_one_level() {
        let structs = resolved(
            r#"
package p

type Base struct {
    ID int
}

type Timestamps struct {
    Base
    CreatedAt int
}

type User struct {
    Timestamps
    Name string
}
"#,
        );
        assert_eq!(fields_of(&structs, "Timestamps"), vec!["CreatedAt", "ID"]);
        // Base is embedded in Timestamps, not in User: not expanded again
        assert_eq!(fields_of(&structs, "User"), vec!["Name", "CreatedAt"]);
    }

    #[test]
    fn embeds_pointer_types() {
        let structs = resolved(
            r#"
package p

type Model struct {
    ID int
}

type Page[T any] struct {
    Items []T
}

type Result struct {
    *Model
    Total int
}
"#,
        );
        assert_eq!(fields_of(&structs, "Result"), vec!["Total", "ID"]);
        let page = structs.values().find(|s| s.decl.name == "Page").unwrap();
        assert_eq!(page.decl.type_params.as_deref(), Some("[T any]"));
    }

    #[test]
    fn skips_embedded_types_from_other_packages() {
        let structs = resolved(
            r#"
package p

type User struct {
    time.Time
    Name string
}
"#,
        );
        assert_eq!(fields_of(&structs, "User"), vec!["Name"]);
    }

    #[test]
    fn embedded_unexported_fields_are_filtered() {
        let structs = resolved(
            r#"
package p

type base struct {
    ID int
    secret string
}

type T struct {
    base
}
"#,
        );
        assert_eq!(fields_of(&structs, "T"), vec!["ID"]);
    }

    #[test]
    fn duplicate_struct_names_keep_first_declaration() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("dup.go");
        std::fs::write(
            &path,
            r#"package p

type T struct {
    First int
}

type T struct {
    Second int
}

type U struct {
    T
}
"#,
        )
        .unwrap();

        let names = collect_struct_names(&path).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names["T"].location.line, 3);

        let parsed = extract_structs_with_config(&path, &Config::default()).unwrap();
        assert_eq!(parsed.structs.len(), 3);
        let lines: Vec<_> = parsed
            .structs
            .keys()
            .filter(|id| id.name == "T")
            .map(|id| id.line)
            .collect();
        assert_eq!(lines, vec![3, 7]);
        assert_eq!(parsed.get("T").unwrap().field_names(), vec!["First"]);
        // Embedding resolves against the first declaration too
        assert_eq!(parsed.get("U").unwrap().field_names(), vec!["First"]);
    }

    #[test]
    fn struct_ids_follow_source_order() {
        let structs = resolved("package p\n\ntype Z struct {}\ntype A struct {}\n");
        let names: Vec<_> = structs.keys().map(|id| id.name.as_str()).collect();
        assert_eq!(names, vec!["Z", "A"]);
        let first = structs.keys().next().unwrap();
        assert_eq!(first.to_string(), "Z@3:6");
    }
}
