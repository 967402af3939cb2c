use std::ptr;
use std::thread;

use osm_records::data::osm::Tag;
use osm_records::schema::{self, FieldType};
use osm_records::tags;

#[test]
fn encoded_tags_round_trip_through_decode() {
    let input = vec![
        Tag::new("name", "Main St"),
        Tag::new("highway", "residential"),
        Tag::new("oneway", "yes"),
    ];
    let encoded = tags::encode(&input).unwrap();
    assert_eq!(encoded, "highway:residential|name:Main St|oneway:yes");

    let mut decoded = tags::decode(Some(&encoded));
    let mut expected = input.clone();
    decoded.sort_by(|a, b| a.key.cmp(&b.key));
    expected.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(decoded, expected);
}

#[test]
fn process_wide_schemas_are_shared_between_threads() {
    let nodes: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| schema::node_schema().unwrap() as *const _ as usize))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(nodes.windows(2).all(|pair| pair[0] == pair[1]));

    let way = schema::way_schema().unwrap();
    assert!(ptr::eq(way, schema::way_schema().unwrap()));
    assert_eq!(way.field("way").unwrap().field_type, FieldType::LineString);
    assert_eq!(way.crs().unwrap().identifier(), "EPSG:4326");
}
