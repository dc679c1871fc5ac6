//! Scenario tests for the compressor: sibling merging, the non-monotonic
//! child-metadata case, and compression idempotence.

use qubed_rs::{
    construct::NodeSpec,
    types::metadata::{ArrayData, MetadataArray},
    Qube,
};

#[test]
fn sibling_branches_with_identical_subtrees_merge_into_one() {
    let a = Qube::from_nodes([NodeSpec::new("class", ["od"]), NodeSpec::new("stream", ["oper"])]).unwrap();
    let b = Qube::from_nodes([NodeSpec::new("class", ["rd"]), NodeSpec::new("stream", ["oper"])]).unwrap();
    let combined = (&a | &b).compress().unwrap();

    assert_eq!(combined.root().children().count(), 1);
    let class = &combined.root().children().as_slice()[0];
    assert_eq!(class.values().summary(), "od/rd");
    assert_eq!(class.children().count(), 1);
}

#[test]
fn branches_with_different_subtrees_stay_separate() {
    let a = Qube::from_nodes([NodeSpec::new("class", ["od"]), NodeSpec::new("stream", ["oper"])]).unwrap();
    let b = Qube::from_nodes([NodeSpec::new("class", ["rd"]), NodeSpec::new("stream", ["wave"])]).unwrap();
    let combined = (&a | &b).compress().unwrap();

    assert_eq!(combined.root().children().count(), 2);
}

#[test]
fn compression_is_idempotent() {
    let a = Qube::from_nodes([NodeSpec::new("class", ["od"]), NodeSpec::new("stream", ["oper"])]).unwrap();
    let b = Qube::from_nodes([NodeSpec::new("class", ["rd"]), NodeSpec::new("stream", ["oper"])]).unwrap();
    let once = (&a | &b).compress().unwrap();
    let twice = once.compress().unwrap();
    assert_eq!(once.root().hash(), twice.root().hash());
}

#[test]
fn merged_child_metadata_concatenates_along_the_parent_axis() {
    // Two "class" branches, each leading to a "stream" leaf that carries a
    // per-stream-value piece of metadata pre-shaped with a leading axis for
    // "this class value". After merging the class branches, the stream
    // metadata must stay distinguishable per class value (shape [2, 1])
    // rather than collapsing into one flat axis.
    let mut stream_a = NodeSpec::new("stream", ["oper"]);
    stream_a.metadata.insert(
        "weight".to_string(),
        MetadataArray::new(vec![1, 1], ArrayData::Int64(vec![10])).unwrap(),
    );
    let mut stream_b = NodeSpec::new("stream", ["oper"]);
    stream_b.metadata.insert(
        "weight".to_string(),
        MetadataArray::new(vec![1, 1], ArrayData::Int64(vec![20])).unwrap(),
    );

    let a = Qube::from_nodes([NodeSpec::new("class", ["od"]), stream_a]).unwrap();
    let b = Qube::from_nodes([NodeSpec::new("class", ["rd"]), stream_b]).unwrap();
    let combined = (&a | &b).compress().unwrap();

    let class = &combined.root().children().as_slice()[0];
    assert_eq!(class.values().summary(), "od/rd");
    let stream = &class.children().as_slice()[0];
    let weight = stream.metadata().get("weight").unwrap();
    assert_eq!(weight.shape, vec![2, 1]);
    assert_eq!(weight.data, ArrayData::Int64(vec![10, 20]));

    let classes: Vec<_> = combined.leaves_with_metadata();
    let rd_weight = classes
        .iter()
        .find(|(id, _)| id.get("class").map(String::as_str) == Some("rd"))
        .map(|(_, m)| m.get("weight").unwrap())
        .unwrap();
    assert_eq!(*rd_weight, qubed_rs::iter::Scalar::Int64(20));
}

#[test]
fn merge_child_position_auto_promotes_unshaped_rank_one_metadata() {
    // Same scenario as above, but the caller did not pre-shape the child
    // metadata with a leading class axis — plain rank-1 arrays. The
    // compressor must promote each member onto its own new leading axis
    // before concatenating rather than silently keeping only one side's
    // weight because the two rank-1 arrays disagree.
    let mut stream_a = NodeSpec::new("stream", ["oper"]);
    stream_a.metadata.insert("weight".to_string(), MetadataArray::new(vec![1], ArrayData::Int64(vec![10])).unwrap());
    let mut stream_b = NodeSpec::new("stream", ["oper"]);
    stream_b.metadata.insert("weight".to_string(), MetadataArray::new(vec![1], ArrayData::Int64(vec![20])).unwrap());

    let a = Qube::from_nodes([NodeSpec::new("class", ["od"]), stream_a]).unwrap();
    let b = Qube::from_nodes([NodeSpec::new("class", ["rd"]), stream_b]).unwrap();
    let combined = (&a | &b).compress().unwrap();

    let class = &combined.root().children().as_slice()[0];
    let stream = &class.children().as_slice()[0];
    let weight = stream.metadata().get("weight").unwrap();
    assert_eq!(weight.shape, vec![2, 1]);
    assert_eq!(weight.data, ArrayData::Int64(vec![10, 20]));
}
