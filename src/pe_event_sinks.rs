//! Various event sinks for different use cases

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pe_interface::{DeviceId, Event, EventSink, Frame};

// ============================================================================
// Console Logging Sink
// ============================================================================

/// Routes events to the `log` facade at trace level
pub struct ConsoleEventSink {
    enabled: bool,
}

impl ConsoleEventSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl EventSink for ConsoleEventSink {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        if !self.enabled {
            return;
        }

        let device_fmt = device
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        match event {
            Event::Attempt { slot, attempts } => {
                log::trace!(
                    "{:>6} {:>4} Attempt    slot:{} attempts:{}",
                    frame,
                    device_fmt,
                    slot,
                    attempts
                );
            }
            Event::Delivered { slot, successes } => {
                log::trace!(
                    "{:>6} {:>4} Delivered  slot:{} successes:{}",
                    frame,
                    device_fmt,
                    slot,
                    successes
                );
            }
            Event::Collision { slot, claimants } => {
                log::trace!(
                    "{:>6} {:>4} Collision  slot:{} claimants:{}",
                    frame,
                    device_fmt,
                    slot,
                    claimants
                );
            }
            Event::Finished { reason } => {
                log::trace!("{:>6} {:>4} Finished   {}", frame, device_fmt, reason);
            }
        }
    }
}

// ============================================================================
// CSV Event Sink
// ============================================================================

/// CSV event sink for structured data export
pub struct CsvEventSink<W: Write = BufWriter<File>> {
    writer: W,
}

impl CsvEventSink<BufWriter<File>> {
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: Write> CsvEventSink<W> {
    pub fn from_writer(mut writer: W) -> std::io::Result<Self> {
        writeln!(writer, "frame,device,event_type,slot,value")?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for CsvEventSink<W> {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        let device = device.map(|d| d.to_string()).unwrap_or_default();
        let result = match event {
            Event::Attempt { slot, attempts } => {
                writeln!(self.writer, "{},{},Attempt,{},{}", frame, device, slot, attempts)
            }
            Event::Delivered { slot, successes } => {
                writeln!(self.writer, "{},{},Delivered,{},{}", frame, device, slot, successes)
            }
            Event::Collision { slot, claimants } => {
                writeln!(self.writer, "{},{},Collision,{},{}", frame, device, slot, claimants)
            }
            Event::Finished { reason } => {
                writeln!(self.writer, "{},{},Finished,,{}", frame, device, reason)
            }
        };

        if let Err(e) = result {
            log::error!("Error writing to CSV: {}", e);
        }
    }
}

// ============================================================================
// Collector Event Sink (In-Memory)
// ============================================================================

/// Collects events in memory for programmatic analysis
#[derive(Default)]
pub struct CollectorEventSink {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub frame: Frame,
    pub device: Option<DeviceId>,
    pub event: Event,
}

impl CollectorEventSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    // Query helpers
    pub fn collisions(&self) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(|e| matches!(e.event, Event::Collision { .. }))
    }

    pub fn deliveries(&self) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(|e| matches!(e.event, Event::Delivered { .. }))
    }

    pub fn for_device(&self, device: DeviceId) -> impl Iterator<Item = &EventRecord> {
        self.events.iter().filter(move |e| e.device == Some(device))
    }

    pub fn in_frame_range(&self, start: Frame, end: Frame) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(move |e| e.frame >= start && e.frame <= end)
    }

    pub fn count_by_type(&self) -> EventTypeCounts {
        let mut counts = EventTypeCounts::default();
        for record in &self.events {
            match record.event {
                Event::Attempt { .. } => counts.attempt += 1,
                Event::Delivered { .. } => counts.delivered += 1,
                Event::Collision { .. } => counts.collision += 1,
                Event::Finished { .. } => counts.finished += 1,
            }
        }
        counts
    }

    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut csv_sink = CsvEventSink::new(path)?;
        for record in &self.events {
            csv_sink.log(record.frame, record.device, record.event.clone());
        }
        csv_sink.flush()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventTypeCounts {
    pub attempt: usize,
    pub delivered: usize,
    pub collision: usize,
    pub finished: usize,
}

impl EventSink for CollectorEventSink {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        self.events.push(EventRecord { frame, device, event });
    }
}

// ============================================================================
// Multi Sink (Combine Multiple Sinks)
// ============================================================================

/// Combines multiple event sinks
#[derive(Default)]
pub struct MultiEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl MultiEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for MultiEventSink {
    fn log(&mut self, frame: Frame, device: Option<DeviceId>, event: Event) {
        for sink in &mut self.sinks {
            sink.log(frame, device, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe_interface::FinishReason;

    #[test]
    fn test_csv_rows() {
        let mut sink = CsvEventSink::from_writer(Vec::new()).unwrap();
        sink.log(0, Some(1), Event::Attempt { slot: 3, attempts: 1 });
        sink.log(0, None, Event::Collision { slot: 3, claimants: 2 });
        sink.log(4, Some(1), Event::Finished { reason: FinishReason::AttemptCap });

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "frame,device,event_type,slot,value",
                "0,1,Attempt,3,1",
                "0,,Collision,3,2",
                "4,1,Finished,,attempt-cap",
            ]
        );
    }

    #[test]
    fn test_collector_queries() {
        let mut sink = CollectorEventSink::new();
        sink.log(0, Some(0), Event::Attempt { slot: 0, attempts: 1 });
        sink.log(0, Some(0), Event::Delivered { slot: 0, successes: 1 });
        sink.log(1, Some(1), Event::Attempt { slot: 2, attempts: 1 });
        sink.log(1, None, Event::Collision { slot: 2, claimants: 2 });

        assert_eq!(sink.for_device(0).count(), 2);
        assert_eq!(sink.collisions().count(), 1);
        assert_eq!(sink.deliveries().count(), 1);
        assert_eq!(sink.in_frame_range(1, 1).count(), 2);
        assert_eq!(
            sink.count_by_type(),
            EventTypeCounts {
                attempt: 2,
                delivered: 1,
                collision: 1,
                finished: 0,
            }
        );
    }

    #[test]
    fn test_multi_sink_fans_out() {
        struct Counter(std::rc::Rc<std::cell::Cell<usize>>);

        impl EventSink for Counter {
            fn log(&mut self, _frame: Frame, _device: Option<DeviceId>, _event: Event) {
                self.0.set(self.0.get() + 1);
            }
        }

        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut multi = MultiEventSink::new();
        multi.add_sink(Box::new(Counter(count.clone())));
        multi.add_sink(Box::new(Counter(count.clone())));
        multi.add_sink(Box::new(ConsoleEventSink::new(false)));

        multi.log(0, None, Event::Collision { slot: 0, claimants: 3 });

        assert_eq!(count.get(), 2);
    }
}
