//! End-to-end tree scenarios over JSON fixtures
//!
//! Each test loads the news definition and page payload, edits the tree
//! through the public API and checks the resulting identifiers and wire form.

use std::collections::HashSet;

use cascade_structured_data::identifier;
use cascade_structured_data::node::text::decode_selection;
use cascade_structured_data::{
    AssetKind, DataDefinition, Result, SchemaIndex, StructuredData, StructuredDataError,
    StructuredTree, TextKind,
};
use chrono::Datelike;
use rstest::rstest;

const DEFINITION: &str = include_str!("fixtures/news_definition.json");
const DEFINITION_V2: &str = include_str!("fixtures/news_definition_v2.json");
const PAGE: &str = include_str!("fixtures/news_page.json");
const PAGE_SOAP: &str = include_str!("fixtures/news_page_soap.json");
const PAGE_SPARSE: &str = include_str!("fixtures/news_page_sparse.json");

fn schema() -> SchemaIndex {
    DataDefinition::from_json(DEFINITION).unwrap().into_index()
}

fn schema_v2() -> SchemaIndex {
    DataDefinition::from_json(DEFINITION_V2).unwrap().into_index()
}

fn page() -> StructuredTree {
    StructuredTree::from_json(PAGE, schema()).unwrap()
}

/// Every run of every multiple field is indexed 0..n without gaps
fn assert_contiguous(tree: &StructuredTree) {
    for first in tree.multiple_first_instances() {
        let ids = tree.sibling_identifiers(&first).unwrap();
        let expected: Vec<String> = (0..ids.len() as u32)
            .map(|i| identifier::with_index(&first, i).unwrap())
            .collect();
        assert_eq!(ids, expected, "run starting at {first}");
    }
}

// =============================================================================
// Wire form
// =============================================================================

#[test]
fn test_round_trip_is_lossless() {
    let data = StructuredData::from_json(PAGE).unwrap();
    let tree = StructuredTree::from_wire(&data, schema()).unwrap();
    assert_eq!(tree.to_wire(), data);
    assert_eq!(tree.definition_path(), Some("/news"));
}

#[test]
fn test_round_trip_keeps_absent_members() {
    let data = StructuredData::from_json(PAGE_SPARSE).unwrap();
    let tree = StructuredTree::from_wire(&data, schema()).unwrap();
    assert_eq!(tree.to_wire(), data);

    let value = tree.to_value().unwrap();
    let nodes = &value["structuredDataNodes"];
    assert!(nodes[0].get("text").is_none());
    assert!(nodes[1].get("text").is_none());
    assert_eq!(nodes[2]["structuredDataNodes"][1]["assetType"], "page");
    assert!(nodes[3]["structuredDataNodes"][1].get("assetType").is_none());
    assert!(nodes[4].get("structuredDataNodes").is_none());

    // the same holds after a structural edit rebuilds the tree
    let mut resized = tree.clone();
    resized.resize_multiple("items", 3).unwrap();
    resized.resize_multiple("items", 2).unwrap();
    assert_eq!(resized.to_wire(), data);
}

#[test]
fn test_set_asset_names_the_new_category() {
    let mut tree = StructuredTree::from_json(PAGE_SPARSE, schema()).unwrap();
    tree.set_asset_ref("items;0;link", AssetKind::File, Some("f1"), None)
        .unwrap();
    tree.set_asset_ref("items;1;link", AssetKind::Page, Some("p2"), None)
        .unwrap();
    tree.set_text("title", "Filled").unwrap();

    let wire = tree.to_wire();
    let first = &wire.structured_data_nodes[2].children()[1];
    assert_eq!(first.asset_type.as_deref(), Some("file"));
    assert_eq!(first.file_id.as_deref(), Some("f1"));
    assert_eq!(first.page_id, None);
    let second = &wire.structured_data_nodes[3].children()[1];
    assert_eq!(second.asset_type.as_deref(), Some("page"));
    assert_eq!(wire.structured_data_nodes[0].text.as_deref(), Some("Filled"));
}

#[test]
fn test_soap_wrapper_is_emitted_as_arrays() {
    let tree = StructuredTree::from_json(PAGE_SOAP, schema()).unwrap();
    assert_eq!(tree.identifiers(), vec!["title", "sidebar", "sidebar;note"]);

    let value = tree.to_value().unwrap();
    assert!(value["structuredDataNodes"].is_array());
    assert!(value["structuredDataNodes"][1]["structuredDataNodes"].is_array());
}

#[test]
fn test_identifiers_of_fixture() {
    let tree = page();
    assert_eq!(
        tree.identifiers(),
        vec![
            "title",
            "published",
            "tags",
            "items;0",
            "items;0;entry;0",
            "items;0;entry;1",
            "items;0;link",
            "items;1",
            "items;1;entry;0",
            "items;1;link",
            "sidebar",
            "sidebar;note",
        ]
    );
    assert_contiguous(&tree);
}

#[test]
fn test_definition_lookup() {
    let data = StructuredData::from_json(PAGE).unwrap();
    let lookup = |id: &str| -> Result<SchemaIndex> {
        match id {
            "d-news" => Ok(schema()),
            other => Err(StructuredDataError::InvalidDefinition(other.to_string())),
        }
    };
    let tree = StructuredTree::from_wire_with(&data, &lookup).unwrap();
    assert_eq!(tree.text("sidebar;note").unwrap(), "see also");
}

// =============================================================================
// Structural edits
// =============================================================================

#[test]
fn test_resize_to_three_copies_last() {
    let mut tree = page();
    tree.resize_multiple("items;0;entry", 3).unwrap();

    assert_eq!(
        tree.sibling_identifiers("items;0;entry;0").unwrap(),
        vec!["items;0;entry;0", "items;0;entry;1", "items;0;entry;2"]
    );
    let values: Vec<&str> = ["items;0;entry;0", "items;0;entry;1", "items;0;entry;2"]
        .iter()
        .map(|id| tree.text(id).unwrap())
        .collect();
    assert_eq!(values, vec!["a", "b", "b"]);
    assert_eq!(tree.sibling_count("items;1;entry;0").unwrap(), 1);
    assert_contiguous(&tree);
}

#[rstest]
#[case("items", 5)]
#[case("items", 1)]
#[case("items;0;entry", 4)]
#[case("items;1;entry", 3)]
fn test_resize_then_back_restores_tree(#[case] target: &str, #[case] count: usize) {
    let mut tree = page();
    let before = tree.checksum().unwrap();
    let first = if identifier::has_index(target) {
        identifier::with_index(target, 0).unwrap()
    } else {
        format!("{target};0")
    };
    let original = tree.sibling_count(&first).unwrap();

    tree.resize_multiple(target, count).unwrap();
    assert_eq!(tree.sibling_count(&first).unwrap(), count);
    assert_contiguous(&tree);

    tree.resize_multiple(target, original).unwrap();
    // growing then shrinking is lossless; shrinking below the original
    // count discards the removed instances
    if count >= original {
        assert_eq!(tree.checksum().unwrap(), before);
    } else {
        assert_ne!(tree.checksum().unwrap(), before);
    }
}

#[rstest]
#[case("items", 5, 3)]
#[case("items", 4, 2)]
#[case("items", 2, 4)]
#[case("items", 1, 1)]
#[case("items;0;entry", 6, 1)]
#[case("items;0;entry", 3, 5)]
#[case("items;0;entry", 4, 4)]
#[case("items;1;entry", 3, 2)]
fn test_resize_twice_matches_direct_resize(
    #[case] target: &str,
    #[case] first: usize,
    #[case] second: usize,
) {
    let mut twice = page();
    twice.resize_multiple(target, first).unwrap();
    twice.resize_multiple(target, second).unwrap();

    let mut direct = page();
    direct.resize_multiple(target, second).unwrap();

    assert_eq!(twice.to_wire(), direct.to_wire());
    assert_contiguous(&twice);
}

#[test]
fn test_swap_groups() {
    let mut tree = page();
    tree.swap_siblings("items;0", "items;1").unwrap();

    assert_eq!(tree.text("items;0;entry;0").unwrap(), "c");
    assert!(!tree.contains("items;0;entry;1"));
    assert_eq!(tree.text("items;1;entry;1").unwrap(), "b");
    assert!(tree.asset("items;0;link").unwrap().target.is_none());
    let moved = tree.asset("items;1;link").unwrap().target.clone().unwrap();
    assert_eq!(moved.id.as_deref(), Some("p1"));
    assert_contiguous(&tree);

    tree.swap_siblings("items;0", "items;1").unwrap();
    assert_eq!(tree.to_wire(), page().to_wire());
}

#[test]
fn test_structural_errors() {
    let mut tree = page();
    assert!(matches!(
        tree.resize_multiple("items;entry", 2),
        Err(StructuredDataError::AmbiguousFieldPath(_))
    ));
    assert!(matches!(
        tree.append_sibling("sidebar;note"),
        Err(StructuredDataError::NotMultiple(_))
    ));
    assert!(matches!(
        tree.remove_last_sibling("items;1;entry;0"),
        Err(StructuredDataError::CannotRemoveOnlyInstance(_))
    ));
    assert!(matches!(
        tree.swap_siblings("items;0;entry;0", "items;1;entry;0"),
        Err(StructuredDataError::NotSiblings(_, _))
    ));
}

// =============================================================================
// Text values
// =============================================================================

#[test]
fn test_checkbox_round_trip_is_order_insensitive() {
    let mut tree = page();
    tree.set_text("tags", "world;local").unwrap();
    let selected: HashSet<String> = decode_selection(TextKind::Checkbox, tree.text("tags").unwrap())
        .into_iter()
        .collect();
    let expected: HashSet<String> = ["local", "world"].iter().map(|s| s.to_string()).collect();
    assert_eq!(selected, expected);

    let stored = tree.text("tags").unwrap().to_string();
    tree.set_text("tags", &stored).unwrap();
    assert_eq!(tree.text("tags").unwrap(), stored);

    assert!(matches!(
        tree.set_text("tags", "sports;bogus"),
        Err(StructuredDataError::UnknownEnumValue { .. })
    ));
    assert_eq!(tree.text("tags").unwrap(), stored);
}

#[rstest]
#[case(0, true)]
#[case(10, true)]
#[case(-10, true)]
#[case(11, false)]
#[case(-11, false)]
fn test_date_window(#[case] offset: i32, #[case] accepted: bool) {
    let mut tree = page();
    let year = chrono::Local::now().year() + offset;
    let result = tree.set_text("published", &format!("6-15-{year}"));
    if accepted {
        result.unwrap();
        assert_eq!(tree.text("published").unwrap(), format!("06-15-{year}"));
    } else {
        assert!(matches!(result, Err(StructuredDataError::InvalidDateValue { .. })));
        assert_eq!(tree.text("published").unwrap(), "");
    }
}

#[test]
fn test_link_kinds() {
    let mut tree = page();
    tree.set_asset_ref("items;1;link", AssetKind::Symlink, Some("s1"), None)
        .unwrap();
    assert!(matches!(
        tree.set_asset_ref("items;1;link", AssetKind::Block, Some("b1"), None),
        Err(StructuredDataError::WrongAssetKind { .. })
    ));
    let wire = tree.to_wire();
    let link = &wire.structured_data_nodes[4].children()[1];
    assert_eq!(link.symlink_id.as_deref(), Some("s1"));
    assert_eq!(link.asset_type.as_deref(), Some("symlink"));
}

// =============================================================================
// Migration
// =============================================================================

#[test]
fn test_reconcile_skips_fields_the_definition_dropped() {
    let stale = page();
    let current = StructuredTree::from_schema(schema_v2()).unwrap();
    let reconciled = current.reconcile_phantoms(&stale).unwrap();

    assert!(!reconciled.contains("sidebar"));
    assert!(!reconciled.contains("published"));
    assert_eq!(reconciled.text("title").unwrap(), "Headline");
    assert_eq!(reconciled.text("summary").unwrap(), "tbd");
    assert_eq!(reconciled.sibling_count("items;0").unwrap(), 2);
    assert_eq!(reconciled.text("items;0;entry;1").unwrap(), "b");
    assert_eq!(
        reconciled.asset("items;0;link").unwrap().target.as_ref().and_then(|t| t.id.as_deref()),
        Some("p1")
    );
    assert_eq!(reconciled.definition_id(), Some("d-news-2"));
    assert_contiguous(&reconciled);
}

#[test]
fn test_map_data_equals_reconcile_onto_default() {
    let tree = page();
    let mapped = tree.map_data(schema_v2()).unwrap();
    let reconciled = StructuredTree::from_schema(schema_v2())
        .unwrap()
        .reconcile_phantoms(&tree)
        .unwrap();
    assert_eq!(mapped.checksum().unwrap(), reconciled.checksum().unwrap());
    assert!(!mapped.has_phantom_fields());
}

#[test]
fn test_lenient_load_drops_unknown_fields() {
    let data = StructuredData::from_json(PAGE).unwrap();
    assert!(matches!(
        StructuredTree::from_wire(&data, schema_v2()),
        Err(StructuredDataError::UnknownField(_))
    ));

    let (tree, dropped) = StructuredTree::from_wire_lenient(&data, schema_v2()).unwrap();
    assert_eq!(dropped, vec!["published", "sidebar"]);
    assert_eq!(tree.phantom_fields(), vec!["summary"]);
}
