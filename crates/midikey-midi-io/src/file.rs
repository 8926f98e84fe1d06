//! Standard MIDI File loading.
//!
//! Files are parsed with `midly` and reduced to note events per track, timestamped in
//! seconds from the start of the file. Tempo changes from every track form one tempo
//! map, so a format 1 conductor track applies to all the others.

use crate::error::{Error, Result};
use midikey_core::{NoteEvent, Recording, TimedEvent};
use midly::{MetaMessage, MidiMessage, Smf, Timing, Track, TrackEventKind};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 120 BPM.
const DEFAULT_TEMPO_US: u32 = 500_000;

/// A parsed recording ready for replay.
#[derive(Debug, Clone)]
pub struct MidiRecording {
    tracks: Vec<Vec<TimedEvent>>,
}

impl MidiRecording {
    /// Load and parse a MIDI file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    pub fn read(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    /// Parse MIDI file from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;
        let clock = TickClock::new(smf.header.timing, &smf.tracks)?;

        let tracks: Vec<_> = smf
            .tracks
            .iter()
            .map(|track| Self::parse_track(track, &clock))
            .collect();

        debug!(
            "Parsed MIDI file: {} tracks, {} note events",
            tracks.len(),
            tracks.iter().map(Vec::len).sum::<usize>()
        );
        Ok(Self { tracks })
    }

    fn parse_track(track: &Track, clock: &TickClock) -> Vec<TimedEvent> {
        let mut events = Vec::new();
        let mut tick = 0u64;

        for event in track.iter() {
            tick += u64::from(event.delta.as_int());
            let TrackEventKind::Midi { message, .. } = event.kind else {
                continue;
            };
            let note = match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => NoteEvent::on(key.as_int()),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    NoteEvent::off(key.as_int())
                }
                _ => continue,
            };
            events.push(TimedEvent::new(clock.at(tick), note));
        }

        events
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, index: usize) -> Result<&[TimedEvent]> {
        self.tracks
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::TrackOutOfRange {
                index,
                count: self.tracks.len(),
            })
    }

    /// Time of the last event in `track`.
    pub fn duration(&self, track: usize) -> Result<Duration> {
        let events = self.track(track)?;
        Ok(events.last().map_or(Duration::ZERO, |e| e.at))
    }
}

impl Recording for MidiRecording {
    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track(&self, index: usize) -> Option<&[TimedEvent]> {
        self.tracks.get(index).map(Vec::as_slice)
    }
}

/// Tick → elapsed time.
#[derive(Debug)]
enum TickClock {
    Metrical {
        ticks_per_beat: u64,
        /// `(tick, seconds at tick, microseconds per beat from tick on)`, sorted by tick.
        segments: Vec<(u64, f64, u32)>,
    },
    /// Fixed ticks per second.
    Timecode { ticks_per_second: f64 },
}

impl TickClock {
    fn new(timing: Timing, tracks: &[Track]) -> Result<Self> {
        match timing {
            Timing::Metrical(tpb) => {
                let ticks_per_beat = u64::from(tpb.as_int());
                if ticks_per_beat == 0 {
                    return Err(Error::MidiUnsupportedTiming);
                }
                Ok(Self::Metrical {
                    ticks_per_beat,
                    segments: tempo_segments(tracks, ticks_per_beat),
                })
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = f64::from(fps.as_f32()) * f64::from(subframes);
                if ticks_per_second <= 0.0 {
                    return Err(Error::MidiUnsupportedTiming);
                }
                Ok(Self::Timecode { ticks_per_second })
            }
        }
    }

    fn at(&self, tick: u64) -> Duration {
        let secs = match self {
            TickClock::Metrical {
                ticks_per_beat,
                segments,
            } => {
                let i = segments.partition_point(|(t, _, _)| *t <= tick);
                let (start, secs, tempo) = segments
                    .get(i.wrapping_sub(1))
                    .copied()
                    .unwrap_or((0, 0.0, DEFAULT_TEMPO_US));
                secs + ticks_to_secs(tick - start, tempo, *ticks_per_beat)
            }
            TickClock::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
        };
        Duration::from_secs_f64(secs)
    }
}

fn ticks_to_secs(ticks: u64, tempo_us: u32, ticks_per_beat: u64) -> f64 {
    ticks as f64 * f64::from(tempo_us) * 1e-6 / ticks_per_beat as f64
}

/// Tempo changes from all tracks, merged into a piecewise tick → seconds map.
fn tempo_segments(tracks: &[Track], ticks_per_beat: u64) -> Vec<(u64, f64, u32)> {
    let mut changes = Vec::new();
    for track in tracks {
        let mut tick = 0u64;
        for event in track.iter() {
            tick += u64::from(event.delta.as_int());
            if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                changes.push((tick, tempo.as_int()));
            }
        }
    }
    // Stable, so for equal ticks the later track wins below.
    changes.sort_by_key(|(tick, _)| *tick);

    let mut segments = vec![(0u64, 0.0f64, DEFAULT_TEMPO_US)];
    for (tick, tempo) in changes {
        if tempo == 0 {
            continue;
        }
        let Some(&(last_tick, last_secs, last_tempo)) = segments.last() else {
            continue;
        };
        if tick == last_tick {
            if let Some(last) = segments.last_mut() {
                last.2 = tempo;
            }
            continue;
        }
        let secs = last_secs + ticks_to_secs(tick - last_tick, last_tempo, ticks_per_beat);
        segments.push((tick, secs, tempo));
    }
    segments
}
