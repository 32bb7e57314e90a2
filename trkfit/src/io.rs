use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use trkcore::data::cluster::RawCluster;

use crate::error::Result;
use crate::finder::RunSummary;
use crate::segment::track::SegmentTrack;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_number: u64,
    pub clusters: Vec<RawCluster>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTracks {
    pub event_number: u64,
    pub tracks: Vec<SegmentTrack>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventFile {
    pub version: u32,
    pub events: Vec<EventRecord>,
}

/// Input files are either an [`EventFile`] or a bare array of events.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventInput {
    File(EventFile),
    Bare(Vec<EventRecord>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackFile {
    pub version: u32,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    pub events: Vec<EventTracks>,
}

impl TrackFile {
    pub fn new(algorithm: &str, events: Vec<EventTracks>) -> Self {
        Self { version: FORMAT_VERSION, algorithm: algorithm.to_string(), summary: None, events }
    }
}

pub fn read_events<R: Read>(reader: R) -> Result<Vec<EventRecord>> {
    Ok(match serde_json::from_reader(reader)? {
        EventInput::File(f) => f.events,
        EventInput::Bare(events) => events,
    })
}

pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
    read_events(BufReader::new(File::open(path)?))
}

pub fn save_events<P: AsRef<Path>>(path: P, events: &[EventRecord]) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    let file = EventFile { version: FORMAT_VERSION, events: events.to_vec() };
    serde_json::to_writer_pretty(f, &file)?;
    Ok(())
}

pub fn write_tracks<W: Write>(writer: W, tracks: &TrackFile) -> Result<()> {
    let mut w = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut w, tracks)?;
    w.flush()?;
    Ok(())
}

pub fn save_tracks<P: AsRef<Path>>(path: P, tracks: &TrackFile) -> Result<()> {
    write_tracks(File::create(path)?, tracks)
}
