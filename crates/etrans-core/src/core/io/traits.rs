use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Defines the interface for reading and writing the plain-text files used by the
/// sampling workflow.
///
/// Implementors handle format-specific parsing and serialization of one `Content`
/// value; reading from a path and rendering to a string are shared.
pub trait TextFormat {
    /// The in-memory value a file of this format holds.
    type Content;

    /// The error type for I/O and parsing operations.
    type Error: Error + From<io::Error>;

    /// Parses the content from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Content, Self::Error>;

    /// Serializes the content to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads the content from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Content, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Serializes the content into a string.
    fn render(content: &Self::Content) -> Result<String, Self::Error> {
        let mut buffer = Vec::new();
        Self::write_to(content, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }
}
