//! Reading and appending colon-separated identity database files
//! (`/etc/passwd`, `/etc/group`, `/etc/shadow`)

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::str::Split;

/// One line of an identity database.
pub trait Entry: Sized {
    /// Parse a line; `None` if it is not a valid entry.
    fn from_line(line: &str) -> Option<Self>;
    fn to_line(&self) -> String;
}

/// Field-by-field parser for a single line.
pub struct LineParser<'a> {
    fields: Split<'a, char>,
}

impl<'a> LineParser<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            fields: line.split(':'),
        }
    }

    pub fn next_str(&mut self) -> Option<&'a str> {
        self.fields.next()
    }

    pub fn next_string(&mut self) -> Option<String> {
        self.next_str().map(str::to_string)
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        self.next_str()?.parse().ok()
    }

    /// An optional numeric field; empty means `None`.
    pub fn next_u32_opt(&mut self) -> Option<Option<u32>> {
        match self.next_str()? {
            "" => Some(None),
            s => s.parse().ok().map(Some),
        }
    }
}

/// Iterates over the valid entries of a file, skipping comments and
/// lines that do not parse.
pub struct EntReader<R, T> {
    reader: R,
    line: String,
    marker: PhantomData<T>,
}

impl<R: BufRead, T: Entry> EntReader<R, T> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::with_capacity(128),
            marker: PhantomData,
        }
    }
}

impl<R: BufRead, T: Entry> Iterator for EntReader<R, T> {
    type Item = io::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            if self.line.starts_with('#') {
                continue;
            }
            if let Some(entry) = T::from_line(self.line.trim_end()) {
                return Some(Ok(entry));
            }
        }
    }
}

/// Write `entry` as one line.
pub fn append_entry<W: Write, T: Entry>(writer: &mut W, entry: &T) -> io::Result<()> {
    let line = entry.to_line() + "\n";
    writer.write_all(line.as_bytes())
}

/// Open a file for reading and appending, creating it if needed.
pub fn open_read_append(path: &Path) -> io::Result<File> {
    File::options().read(true).append(true).create(true).open(path)
}

/// Comma-separated list; empty input is an empty list.
pub fn split_csv(input: &str) -> Vec<String> {
    if input.is_empty() {
        Vec::new()
    } else {
        input.split(',').map(str::to_string).collect()
    }
}
