use anyhow::Result;
use csv;
use flate2::read::MultiGzDecoder;
use grep_cli::stdout;
use gzp::{deflate::Gzip, Compression, ZBuilder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use termcolor::ColorChoice;

/// Build a buffered line reader over a file or stdin, transparently
/// decompressing gzip input. A path of `-` (or `None`) reads stdin.
pub fn get_line_reader<P: AsRef<Path>>(
    path: &Option<P>,
    gzipped: bool,
) -> Result<Box<dyn BufRead>> {
    let raw_reader: Box<dyn Read> = match path {
        Some(path) if path.as_ref() != Path::new("-") => {
            Box::new(File::open(path)?)
        }
        _ => Box::new(io::stdin()),
    };

    Ok(if gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(raw_reader)))
    } else {
        Box::new(BufReader::new(raw_reader))
    })
}

/// Build a tab-delimited CSV reader for header-keyed tables.
pub fn get_tsv_reader<P: AsRef<Path>>(
    path: &Option<P>,
    has_headers: bool,
    gzipped: bool,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let raw_reader: Box<dyn Read> = match path {
        Some(path) if path.as_ref() != Path::new("-") => {
            let reader = BufReader::new(File::open(path)?);
            if gzipped {
                Box::new(MultiGzDecoder::new(reader))
            } else {
                Box::new(reader)
            }
        }
        _ => {
            let reader = io::stdin();
            if gzipped {
                Box::new(MultiGzDecoder::new(reader))
            } else {
                Box::new(reader)
            }
        }
    };

    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(raw_reader))
}

/// Build a writer targeting a file or stdout with optional gzip compression.
pub fn get_writer<P: AsRef<Path>>(
    path: &Option<P>,
    gzipped: bool,
    threads: usize,
    compression_level: u32,
) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(path) if path.as_ref() != Path::new("-") => {
            let writer = BufWriter::new(File::create(path)?);
            if gzipped {
                Box::new(
                    ZBuilder::<Gzip, _>::new()
                        .num_threads(threads)
                        .compression_level(Compression::new(compression_level))
                        .from_writer(writer),
                )
            } else {
                Box::new(writer)
            }
        }
        _ => {
            let writer = stdout(ColorChoice::Never);
            if gzipped {
                Box::new(
                    ZBuilder::<Gzip, _>::new()
                        .num_threads(threads)
                        .compression_level(Compression::new(compression_level))
                        .from_writer(writer),
                )
            } else {
                Box::new(writer)
            }
        }
    };

    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        {
            let mut writer = get_writer(&Some(&path), false, 1, 6).unwrap();
            writeln!(writer, "ref1\t10\tvar0\tA\tC").unwrap();
            writer.flush().unwrap();
        }
        let mut text = String::new();
        get_line_reader(&Some(&path), false)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "ref1\t10\tvar0\tA\tC\n");
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt.gz");
        {
            let mut writer = get_writer(&Some(&path), true, 1, 6).unwrap();
            writeln!(writer, "compressed line").unwrap();
            writer.flush().unwrap();
        }
        let mut text = String::new();
        get_line_reader(&Some(&path), true)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "compressed line\n");
    }

    #[test]
    fn test_tsv_reader_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tsv");
        std::fs::write(&path, "CHROM\tPOS\nref1\t10\n").unwrap();
        let mut rdr = get_tsv_reader(&Some(&path), true, false).unwrap();
        assert_eq!(
            rdr.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["CHROM", "POS"]
        );
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "10");
    }
}
