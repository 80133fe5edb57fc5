//! File I/O utilities (gzip-aware, `-` = stdio).

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB

fn is_gz(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .eq_ignore_ascii_case("gz")
}

pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if p.to_string_lossy() == "-" {
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, io::stdin())));
    }
    let f = File::open(p)?;
    if is_gz(p) {
        let dec = flate2::read::GzDecoder::new(f);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, f)))
}

/// Writer wrapper to propagate finish/close errors for compressed outputs.
#[must_use = "call .close() to propagate compression/IO errors"]
pub enum Writer {
    Plain(BufWriter<File>),
    Stdout(std::io::Stdout),
    Gz(flate2::write::GzEncoder<File>),
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Plain(f) => f.write(buf),
            Writer::Stdout(s) => s.write(buf),
            Writer::Gz(e) => e.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Stdout(s) => s.flush(),
            Writer::Gz(e) => e.flush(),
        }
    }
}

impl Writer {
    /// Finalize the stream and flush underlying file/stdout.
    pub fn close(self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => {
                let mut file = f.into_inner().map_err(|e| e.into_error())?;
                file.flush()
            }
            Writer::Stdout(mut s) => s.flush(),
            Writer::Gz(e) => {
                let mut f = e.finish()?;
                f.flush()
            }
        }
    }
}

/// Open `path` for writing (`-` = stdout). With `append`, existing plain
/// files grow and gzip outputs gain a new member, which decoders read as one
/// concatenated stream.
pub fn open_writer<P: AsRef<Path>>(path: P, append: bool) -> io::Result<Writer> {
    let p = path.as_ref();
    if p.to_string_lossy() == "-" {
        return Ok(Writer::Stdout(std::io::stdout()));
    }
    let f = if append {
        OpenOptions::new().create(true).append(true).open(p)?
    } else {
        File::create(p)?
    };
    if is_gz(p) {
        let enc = flate2::write::GzEncoder::new(f, flate2::Compression::default());
        return Ok(Writer::Gz(enc));
    }
    Ok(Writer::Plain(BufWriter::new(f)))
}

/// Newline count of one input, decompressing if needed.
pub fn line_count<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    let mut reader = open_reader(path)?;
    let mut buf = [0u8; READER_BUF_CAP];
    let mut lines = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
    Ok(lines)
}

/// Combined line count for a progress total; `None` when any input is stdin
/// or unreadable (the bar then runs without a length).
pub fn total_lines(paths: &[String]) -> Option<u64> {
    let mut total = 0u64;
    for path in paths {
        if path == "-" {
            return None;
        }
        total += line_count(path).ok()?;
    }
    Some(total)
}

/// Number of games in a PGN file, by counting `[Event` tag lines.
pub fn game_count<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    let reader = open_reader(path)?;
    let mut games = 0u64;
    for line in reader.lines() {
        if line?.trim_start().starts_with("[Event") {
            games += 1;
        }
    }
    Ok(games)
}
