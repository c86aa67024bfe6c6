use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};

/// Line-oriented `v2.0 raw` listing: hex bytes separated by whitespace,
/// `count*byte` runs (count in decimal) and `#` comments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HexFileLine {
    Data(Vec<HexFileData>),
    Comment(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HexFileData {
    Byte(u8),
    Run(u32, u8),
}

#[derive(Debug)]
pub enum HexFileError {
    Io(io::Error),
    MissingHeader,
    BadToken { line: usize, token: String },
}

impl fmt::Display for HexFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HexFileError::Io(e) => write!(f, "{}", e),
            HexFileError::MissingHeader => write!(f, "missing '{}' header", HexFile::header()),
            HexFileError::BadToken { line, token } => write!(f, "line {}: bad token '{}'", line, token),
        }
    }
}

impl std::error::Error for HexFileError {}

impl From<io::Error> for HexFileError {
    fn from(e: io::Error) -> Self {
        HexFileError::Io(e)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexFile {
    pub lines: Vec<HexFileLine>,
}

impl HexFile {
    pub const fn header() -> &'static str {
        "v2.0 raw"
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.lines.push(HexFileLine::Comment(text.into()));
    }

    /// Appends `bytes` as one data line, folding repeats into runs.
    pub fn data(&mut self, bytes: &[u8]) {
        let mut data = Vec::new();
        let mut rest = bytes;
        while let Some(&b) = rest.first() {
            let count = rest.iter().take_while(|&&x| x == b).count();
            if count > 2 {
                data.push(HexFileData::Run(count as u32, b));
            } else {
                data.extend(std::iter::repeat(HexFileData::Byte(b)).take(count));
            }
            rest = &rest[count..];
        }
        if !data.is_empty() {
            self.lines.push(HexFileLine::Data(data));
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for line in &self.lines {
            if let HexFileLine::Data(data) = line {
                for data in data {
                    match data {
                        HexFileData::Byte(b) => bytes.push(*b),
                        HexFileData::Run(count, b) => {
                            bytes.extend(std::iter::repeat(*b).take(*count as usize))
                        }
                    }
                }
            }
        }

        bytes
    }

    pub fn read<R: Read>(r: R) -> Result<HexFile, HexFileError> {
        let file = BufReader::new(r);
        let mut lines = file.lines();

        let header = lines.next().transpose()?;
        if header.as_deref().map(str::trim) != Some(HexFile::header()) {
            return Err(HexFileError::MissingHeader);
        }

        let mut parsed = Vec::new();

        for (index, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim();

            if let Some(comment) = line.strip_prefix('#') {
                parsed.push(HexFileLine::Comment(comment.to_string()));
                continue;
            }

            let mut data = Vec::new();
            for block in line.split_whitespace() {
                let bad = || HexFileError::BadToken { line: index + 2, token: block.to_owned() };
                data.push(match block.split_once('*') {
                    Some((count, value)) => HexFileData::Run(
                        count.parse().map_err(|_| bad())?,
                        u8::from_str_radix(value, 16).map_err(|_| bad())?),
                    None => HexFileData::Byte(u8::from_str_radix(block, 16).map_err(|_| bad())?),
                });
            }

            if !data.is_empty() {
                parsed.push(HexFileLine::Data(data));
            }
        }

        Ok(HexFile {
            lines: parsed,
        })
    }

    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        write!(w, "{}", self)
    }
}

impl fmt::Display for HexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HexFile::header())?;
        for line in &self.lines {
            match line {
                HexFileLine::Comment(text) => writeln!(f, "#{}", text)?,
                HexFileLine::Data(data) => {
                    for (i, d) in data.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        match d {
                            HexFileData::Byte(b) => write!(f, "{:02x}", b)?,
                            HexFileData::Run(count, b) => write!(f, "{}*{:02x}", count, b)?,
                        }
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
