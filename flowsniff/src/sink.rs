use std::io::{self, Write};

use anyhow::Result;
use flowsniff_core::DecodedRecord;

use crate::{cmd::RecordFormat, network::RecordLine};

/// Receives every decoded record in processing order.
pub trait RecordSink: Send {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Newline-delimited JSON.
pub struct JsonLines<W> {
    writer: W,
}

impl<W: Write + Send> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLines<W> {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub struct Console;

impl RecordSink for Console {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()> {
        println!("{}", RecordLine(record).colored());
        Ok(())
    }
}

pub struct Discard;

impl RecordSink for Discard {
    fn emit(&mut self, _record: &DecodedRecord) -> Result<()> {
        Ok(())
    }
}

pub fn build(format: RecordFormat) -> Box<dyn RecordSink> {
    match format {
        RecordFormat::Json => Box::new(JsonLines::new(io::BufWriter::new(io::stdout()))),
        RecordFormat::Console => Box::new(Console),
        RecordFormat::None => Box::new(Discard),
    }
}
