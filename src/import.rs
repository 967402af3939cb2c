use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use log::{error, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::config::ImportConfig;
use crate::data::osm::{EntityMeta, Node, OsmId, Tag, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, Result};
use crate::record::{self, RecordSet};

pub const OUTPUT_FILE_NAME: &str = "osm_records.rkyv";

/// Element whose child `tag`/`nd` elements are being collected.
enum ParserState {
    Top,
    Node(Node),
    Way(Way),
    Skip,
}

fn parse_meta(el: &BytesStart) -> Result<(EntityMeta, Option<f64>, Option<f64>)> {
    let mut id = None;
    let mut lat = None;
    let mut lon = None;
    let mut meta = EntityMeta::new(0);

    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"id" => id = Some(value.parse()?),
            b"lat" => lat = Some(value.parse()?),
            b"lon" => lon = Some(value.parse()?),
            b"version" => meta.version = value.parse()?,
            b"changeset" => meta.changeset = value.parse()?,
            b"user" => meta.user = value.into_owned(),
            b"visible" => meta.visible = value != "false",
            b"timestamp" => meta.timestamp = DateTime::parse_from_rfc3339(&value)?.timestamp_millis(),
            _ => (),
        }
    }

    meta.id = id.ok_or("Element without id")?;
    Ok((meta, lat, lon))
}

fn parse_node(el: &BytesStart) -> Result<Node> {
    let (meta, lat, lon) = parse_meta(el)?;
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Node { meta, lon, lat, tags: Vec::new() }),
        _ => Err(format!("node {} has no location", meta.id).into()),
    }
}

fn parse_way(el: &BytesStart) -> Result<Way> {
    let (meta, _, _) = parse_meta(el)?;
    Ok(Way { meta, nodes: Vec::new(), tags: Vec::new() })
}

fn parse_tag(el: &BytesStart) -> Result<Tag> {
    let mut tag = Tag::new("", "");
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        match attribute.key.as_ref() {
            b"k" => tag.key = attribute.unescape_value()?.into_owned(),
            b"v" => tag.value = attribute.unescape_value()?.into_owned(),
            _ => (),
        }
    }
    Ok(tag)
}

fn parse_node_ref(el: &BytesStart) -> Result<OsmId> {
    let attribute = el
        .try_get_attribute("ref")?
        .ok_or("nd element without ref")?;
    Ok(attribute.unescape_value()?.parse()?)
}

fn start_element(el: &BytesStart) -> Option<ParserState> {
    let parsed = match el.name().as_ref() {
        b"node" => parse_node(el).map(ParserState::Node),
        b"way" => parse_way(el).map(ParserState::Way),
        _ => return None,
    };
    Some(parsed.unwrap_or_else(|err| {
        warn!(err = err.message.as_str(); "Skipping malformed element");
        ParserState::Skip
    }))
}

fn add_child(state: &mut ParserState, el: &BytesStart) -> Result<()> {
    match (state, el.name().as_ref()) {
        (ParserState::Node(node), b"tag") => node.tags.push(parse_tag(el)?),
        (ParserState::Way(way), b"tag") => way.tags.push(parse_tag(el)?),
        (ParserState::Way(way), b"nd") => way.nodes.push(parse_node_ref(el)?),
        _ => (),
    }
    Ok(())
}

fn finish_element(state: ParserState, data: &mut OsmMapData) {
    match state {
        ParserState::Node(node) => data.add_node(node),
        ParserState::Way(way) => data.add_way(way),
        ParserState::Top | ParserState::Skip => (),
    }
}

/// Reads the nodes and ways of an OSM XML document.
pub fn parse_osm<R: BufRead>(mut reader: Reader<R>) -> Result<OsmMapData> {
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut data = OsmMapData::default();
    let mut state = ParserState::Top;

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(e.into()),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if let ParserState::Top = state {
                    if let Some(new_state) = start_element(&e) {
                        state = new_state;
                    }
                } else if let Err(err) = add_child(&mut state, &e) {
                    warn!(err = err.message.as_str(); "Skipping malformed child element");
                }
            },
            Ok(Event::Empty(e)) => {
                if let ParserState::Top = state {
                    if let Some(element) = start_element(&e) {
                        finish_element(element, &mut data);
                    }
                } else if let Err(err) = add_child(&mut state, &e) {
                    warn!(err = err.message.as_str(); "Skipping malformed child element");
                }
            },
            Ok(Event::End(e)) => {
                if matches!(e.name().as_ref(), b"node" | b"way") {
                    finish_element(std::mem::replace(&mut state, ParserState::Top), &mut data);
                }
            },
            // Declarations, comments and text carry nothing we store.
            Ok(_) => (),
        }
        // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
        buf.clear();
    }
    Ok(data)
}

/// Converts parsed elements into records, skipping ways that can't be built.
///
/// Returns the records and the number of skipped ways.
pub fn build_records(data: &OsmMapData) -> Result<(RecordSet, usize)> {
    let mut records = RecordSet::default();
    let mut skipped_ways = 0;
    for node in data.nodes_in_order() {
        records.nodes.push(record::node_record(node)?);
    }
    for way in data.ways_in_order() {
        match record::way_record(way, &data.nodes) {
            Ok(way_record) => records.ways.push(way_record),
            Err(err) => {
                warn!(way_id = way.meta.id, err = err.message.as_str(); "Skipping way");
                skipped_ways += 1;
            },
        }
    }
    Ok((records, skipped_ways))
}

/// What one import wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub parsed_nodes: usize,
    pub parsed_ways: usize,
    pub node_records: usize,
    pub way_records: usize,
    pub skipped_ways: usize,
}

fn stage_failed(stage: &'static str) -> impl FnOnce(Error) -> Error {
    move |err| {
        error!(stage = stage, err = err.message.as_str(); "Import stage failed");
        err
    }
}

/// Imports one `.osm` file into `<dir>/osm_records.rkyv`.
///
/// Elements whose attributes don't parse (ids, coordinates, timestamps) are
/// skipped with a warning.
pub struct OsmImport<'a> {
    config: &'a ImportConfig,
}

impl OsmImport<'_> {
    pub fn new(config: &ImportConfig) -> OsmImport<'_> {
        OsmImport {
            config
        }
    }

    pub fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    /// Runs the import unless `dir` already holds its output.
    ///
    /// Returns `None` when the cached archive was kept.
    pub fn run(&self, dir: &Path) -> Result<Option<ImportSummary>> {
        let data_path = self.config.data_path.as_str();
        if self.is_cached(dir)? {
            info!(data_path = data_path; "Using cached records");
            return Ok(None);
        }

        info!(data_path = data_path; "Parsing OSM file");
        let data = self.read_elements().map_err(stage_failed("parse"))?;
        info!(nodes = data.nodes.len(), ways = data.ways.len(); "Parsed OSM file");

        let (records, skipped_ways) = build_records(&data).map_err(stage_failed("convert"))?;
        info!(
            nodes = records.nodes.len(), ways = records.ways.len(), skipped_ways = skipped_ways;
            "Built records"
        );

        let summary = ImportSummary {
            parsed_nodes: data.nodes.len(),
            parsed_ways: data.ways.len(),
            node_records: records.nodes.len(),
            way_records: records.ways.len(),
            skipped_ways,
        };
        self.write_records(dir, &records).map_err(stage_failed("write"))?;
        let output_path = Self::output_path(dir).display().to_string();
        info!(path = output_path.as_str(); "Wrote records");
        Ok(Some(summary))
    }

    fn create_osm_reader(&self) -> Result<Reader<Box<dyn BufRead>>> {
        let path = Path::new(&self.config.data_path);
        let file_reader = BufReader::new(fs::File::open(path)?);
        let source: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "xz") {
            Box::new(BufReader::new(XzDecoder::new(file_reader)))
        } else {
            Box::new(file_reader)
        };
        Ok(Reader::from_reader(source))
    }

    fn read_elements(&self) -> Result<OsmMapData> {
        parse_osm(self.create_osm_reader()?)
    }

    fn write_records(&self, dir: &Path, records: &RecordSet) -> Result<()> {
        let bytes = rkyv::to_bytes::<_, 256>(records)
            .map_err(|err| Error::from(format!("Could not serialize records: {}", err)))?;
        let mut output_file = fs::File::create(Self::output_path(dir))?;
        output_file.write_all(&bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="1" lat="51.5226" lon="-0.1571" version="2" changeset="100" user="alice" timestamp="2013-01-01T00:00:00Z">
    <tag k="railway" v="station"/>
    <tag k="name" v="Baker Street"/>
  </node>
  <node id="2" lat="51.5230" lon="-0.1580" version="1"/>
  <node id="3" lat="51.5240" lon="-0.1590" visible="false"/>
  <node id="4" lon="-0.1590"/>
  <way id="10" version="1" user="bob">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="highway" v="residential"/>
    <tag k="name" v="Baker &amp; Son"/>
  </way>
  <way id="11">
    <nd ref="1"/>
    <nd ref="99"/>
  </way>
  <relation id="20">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>
"#;

    #[test]
    fn test_parse_osm() {
        let data = parse_osm(Reader::from_str(SAMPLE)).unwrap();
        assert_eq!(data.node_order, vec![1, 2, 3]);
        assert_eq!(data.way_order, vec![10, 11]);

        let station = &data.nodes[&1];
        assert_eq!(station.meta.version, 2);
        assert_eq!(station.meta.changeset, 100);
        assert_eq!(station.meta.user, "alice");
        assert_eq!(station.meta.timestamp, 1_356_998_400_000);
        assert_eq!(station.tags, vec![Tag::new("railway", "station"), Tag::new("name", "Baker Street")]);
        assert!(!data.nodes[&3].meta.visible);

        let way = &data.ways[&10];
        assert_eq!(way.nodes, vec![1, 2, 3]);
        assert_eq!(way.tags[1], Tag::new("name", "Baker & Son"));
    }

    #[test]
    fn test_parse_osm_negative_ids() {
        let doc = r#"<osm>
  <node id="-1" lat="1.0" lon="2.0"><tag k="name" v="draft"/></node>
  <node id="-2" lat="1.5" lon="2.5"/>
  <way id="-5"><nd ref="-1"/><nd ref="-2"/></way>
</osm>"#;
        let data = parse_osm(Reader::from_str(doc)).unwrap();
        assert_eq!(data.node_order, vec![-1, -2]);
        assert_eq!(data.ways[&-5].nodes, vec![-1, -2]);

        let (records, skipped_ways) = build_records(&data).unwrap();
        assert_eq!(skipped_ways, 0);
        assert_eq!(records.ways[0].nodes, "-1;-2");
        assert_eq!(records.nodes[0].tags.as_deref(), Some("name:draft"));
    }

    #[test]
    fn test_build_records_skips_broken_ways() {
        let data = parse_osm(Reader::from_str(SAMPLE)).unwrap();
        let (records, skipped_ways) = build_records(&data).unwrap();
        assert_eq!(records.nodes.len(), 3);
        assert_eq!(records.ways.len(), 1);
        assert_eq!(skipped_ways, 1);

        let way = &records.ways[0];
        assert_eq!(way.id, 10);
        assert_eq!(way.nodes, "1;2;3");
        assert_eq!(way.tags.as_deref(), Some("highway:residential|name:Baker & Son"));
        assert_eq!(records.nodes[1].tags, None);
        assert_eq!(
            tags::decode(records.nodes[0].tags.as_deref()),
            vec![Tag::new("name", "Baker Street"), Tag::new("railway", "station")]
        );
    }

    fn config_for(dir: &Path, data_file: &str) -> ImportConfig {
        ImportConfig {
            data_path: dir.join(data_file).to_string_lossy().into_owned(),
            dest_path: dir.to_string_lossy().into_owned(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_run_writes_archive_then_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.osm"), SAMPLE).unwrap();
        let config = config_for(dir.path(), "sample.osm");

        let import = OsmImport::new(&config);
        assert!(!import.is_cached(dir.path()).unwrap());
        let summary = import.run(dir.path()).unwrap();
        assert_eq!(
            summary,
            Some(ImportSummary {
                parsed_nodes: 3,
                parsed_ways: 2,
                node_records: 3,
                way_records: 1,
                skipped_ways: 1,
            })
        );
        assert!(import.is_cached(dir.path()).unwrap());
        assert!(fs::metadata(OsmImport::output_path(dir.path())).unwrap().len() > 0);

        assert_eq!(import.run(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), "missing.osm.xz");
        let import = OsmImport::new(&config);
        assert!(import.run(dir.path()).is_err());
        assert!(!import.is_cached(dir.path()).unwrap());
    }
}
