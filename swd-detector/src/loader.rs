//! Reads one channel of a European Data Format (EDF) recording.

use crate::{error::LoaderError, signal::Signal};
use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
    str::FromStr,
};
use swd_common::{Channel, Real, SampleRate};
use tracing::{debug, info};

/// Allowed difference between the recording's and the expected sample rate, in Hz.
const SAMPLE_RATE_TOLERANCE: Real = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EdfSignalHeader {
    pub(crate) label: String,
    pub(crate) physical_min: Real,
    pub(crate) physical_max: Real,
    pub(crate) digital_min: Real,
    pub(crate) digital_max: Real,
    pub(crate) samples_per_record: usize,
}

impl EdfSignalHeader {
    fn to_physical(&self, digital: i16) -> Real {
        let gain = (self.physical_max - self.physical_min) / (self.digital_max - self.digital_min);
        self.physical_min + (Real::from(digital) - self.digital_min) * gain
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EdfHeader {
    pub(crate) num_records: usize,
    pub(crate) record_duration: Real,
    pub(crate) signals: Vec<EdfSignalHeader>,
}

impl EdfHeader {
    pub(crate) fn load<R: Read>(reader: &mut R) -> Result<Self, LoaderError> {
        let _version = load_ascii(reader, 8)?;
        let _patient = load_ascii(reader, 80)?;
        let _recording = load_ascii(reader, 80)?;
        let _start_date = load_ascii(reader, 8)?;
        let _start_time = load_ascii(reader, 8)?;
        let _header_bytes: usize = load_number(reader, 8, "header size")?;
        let _reserved = load_ascii(reader, 44)?;
        let num_records: i64 = load_number(reader, 8, "number of records")?;
        let record_duration: Real = load_number(reader, 8, "record duration")?;
        let num_signals: usize = load_number(reader, 4, "number of signals")?;

        let num_records = usize::try_from(num_records).map_err(|_| {
            LoaderError::Unreadable(format!("unsupported number of records {num_records}"))
        })?;
        if !(record_duration.is_finite() && record_duration > 0.0) {
            return Err(LoaderError::Unreadable(format!(
                "non-positive record duration {record_duration}"
            )));
        }

        let labels = load_ascii_vec(reader, 16, num_signals)?;
        let _transducers = load_ascii_vec(reader, 80, num_signals)?;
        let _physical_dimensions = load_ascii_vec(reader, 8, num_signals)?;
        let physical_min = load_number_vec(reader, 8, num_signals, "physical minimum")?;
        let physical_max = load_number_vec(reader, 8, num_signals, "physical maximum")?;
        let digital_min = load_number_vec(reader, 8, num_signals, "digital minimum")?;
        let digital_max = load_number_vec(reader, 8, num_signals, "digital maximum")?;
        let _prefiltering = load_ascii_vec(reader, 80, num_signals)?;
        let samples_per_record = load_number_vec(reader, 8, num_signals, "samples per record")?;
        let _reserved = load_ascii_vec(reader, 32, num_signals)?;

        let signals = itertools::izip!(
            labels,
            physical_min,
            physical_max,
            digital_min,
            digital_max,
            samples_per_record
        )
        .map(
            |(label, physical_min, physical_max, digital_min, digital_max, samples_per_record)| {
                EdfSignalHeader {
                    label,
                    physical_min,
                    physical_max,
                    digital_min,
                    digital_max,
                    samples_per_record,
                }
            },
        )
        .collect::<Vec<_>>();

        if let Some(signal) = signals.iter().find(|s| s.digital_max <= s.digital_min) {
            return Err(LoaderError::Unreadable(format!(
                "signal {} has an empty digital range",
                signal.label
            )));
        }

        Ok(EdfHeader {
            num_records,
            record_duration,
            signals,
        })
    }

    pub(crate) fn sample_rate(&self, channel: Channel) -> Option<Real> {
        self.signals
            .get(channel)
            .map(|s| s.samples_per_record as Real / self.record_duration)
    }
}

/// Reads `channel` of an EDF stream, confirming it is sampled at `expected_sample_rate`.
pub(crate) fn read_recording<R: Read>(
    reader: &mut R,
    channel: Channel,
    expected_sample_rate: SampleRate,
) -> Result<Signal, LoaderError> {
    let header = EdfHeader::load(reader)?;
    let selected = header
        .signals
        .get(channel)
        .ok_or(LoaderError::ChannelOutOfRange {
            channel,
            available: header.signals.len(),
        })?;
    let found = header.sample_rate(channel).unwrap_or_default();
    if (found - expected_sample_rate as Real).abs() > SAMPLE_RATE_TOLERANCE {
        return Err(LoaderError::SampleRateMismatch {
            expected: expected_sample_rate,
            found,
        });
    }
    debug!(label = selected.label, num_records = header.num_records, "Header read");

    header
        .num_records
        .checked_mul(selected.samples_per_record)
        .ok_or_else(|| LoaderError::Unreadable("recording length overflows".into()))?;

    // grown as records arrive, the header's record count is not trusted
    let mut samples = Vec::new();
    for _ in 0..header.num_records {
        for (index, signal) in header.signals.iter().enumerate() {
            let record = load_i16_vec(reader, signal.samples_per_record)?;
            if index == channel {
                samples.extend(record.into_iter().map(|d| signal.to_physical(d)));
            }
        }
    }
    Ok(Signal::new(samples, expected_sample_rate))
}

#[tracing::instrument(skip_all, fields(path = %path.display(), channel, num_samples))]
pub fn load_recording(
    path: &Path,
    channel: Channel,
    expected_sample_rate: SampleRate,
) -> Result<Signal, LoaderError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoaderError::NotFound(path.to_owned()),
        _ => LoaderError::IO(e),
    })?;
    let signal = read_recording(&mut BufReader::new(file), channel, expected_sample_rate)?;
    tracing::Span::current().record("num_samples", signal.len());
    info!(
        num_samples = signal.len(),
        num_blanks = signal.num_blanks(),
        "Recording loaded"
    );
    Ok(signal)
}

fn truncated(e: std::io::Error) -> LoaderError {
    match e.kind() {
        ErrorKind::UnexpectedEof => LoaderError::Unreadable("file is truncated".into()),
        _ => LoaderError::IO(e),
    }
}

fn load_ascii<R: Read>(reader: &mut R, len: usize) -> Result<String, LoaderError> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_owned())
}

fn load_ascii_vec<R: Read>(
    reader: &mut R,
    len: usize,
    count: usize,
) -> Result<Vec<String>, LoaderError> {
    (0..count).map(|_| load_ascii(reader, len)).collect()
}

fn load_number<R: Read, T: FromStr>(
    reader: &mut R,
    len: usize,
    field: &str,
) -> Result<T, LoaderError> {
    let text = load_ascii(reader, len)?;
    text.parse()
        .map_err(|_| LoaderError::Unreadable(format!("{field} is not a number: '{text}'")))
}

fn load_number_vec<R: Read, T: FromStr>(
    reader: &mut R,
    len: usize,
    count: usize,
    field: &str,
) -> Result<Vec<T>, LoaderError> {
    (0..count).map(|_| load_number(reader, len, field)).collect()
}

fn load_i16_vec<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i16>, LoaderError> {
    let len = count
        .checked_mul(2)
        .ok_or_else(|| LoaderError::Unreadable(format!("record of {count} samples")))?;
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() < len {
        return Err(LoaderError::Unreadable("file is truncated".into()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Cursor;

    pub(crate) struct TestChannel {
        pub label: &'static str,
        pub samples_per_record: usize,
        pub physical: (Real, Real),
        pub digital: (i16, i16),
    }

    fn field(text: &str, len: usize) -> Vec<u8> {
        let mut bytes = format!("{text:<len$}").into_bytes();
        bytes.truncate(len);
        bytes
    }

    /// Encodes an EDF file; `records[r][c]` holds the digital samples of channel `c` in record `r`.
    pub(crate) fn edf_bytes(
        channels: &[TestChannel],
        record_duration: Real,
        records: &[Vec<Vec<i16>>],
    ) -> Vec<u8> {
        let ns = channels.len();
        let mut bytes = Vec::new();
        bytes.extend(field("0", 8));
        bytes.extend(field("patient", 80));
        bytes.extend(field("recording", 80));
        bytes.extend(field("01.01.26", 8));
        bytes.extend(field("00.00.00", 8));
        bytes.extend(field(&(256 * (ns + 1)).to_string(), 8));
        bytes.extend(field("", 44));
        bytes.extend(field(&records.len().to_string(), 8));
        bytes.extend(field(&record_duration.to_string(), 8));
        bytes.extend(field(&ns.to_string(), 4));
        let per_channel = |len: usize, f: &dyn Fn(&TestChannel) -> String| -> Vec<u8> {
            channels.iter().flat_map(|c| field(&f(c), len)).collect()
        };
        bytes.extend(per_channel(16, &|c| c.label.to_owned()));
        bytes.extend(per_channel(80, &|_| String::new()));
        bytes.extend(per_channel(8, &|_| "uV".to_owned()));
        bytes.extend(per_channel(8, &|c| c.physical.0.to_string()));
        bytes.extend(per_channel(8, &|c| c.physical.1.to_string()));
        bytes.extend(per_channel(8, &|c| c.digital.0.to_string()));
        bytes.extend(per_channel(8, &|c| c.digital.1.to_string()));
        bytes.extend(per_channel(80, &|_| String::new()));
        bytes.extend(per_channel(8, &|c| c.samples_per_record.to_string()));
        bytes.extend(per_channel(32, &|_| String::new()));
        for record in records {
            for channel in record {
                bytes.extend(channel.iter().flat_map(|d| d.to_le_bytes()));
            }
        }
        bytes
    }

    fn two_channels() -> Vec<TestChannel> {
        vec![
            TestChannel {
                label: "EEG",
                samples_per_record: 4,
                physical: (-100.0, 100.0),
                digital: (-1000, 1000),
            },
            TestChannel {
                label: "EMG",
                samples_per_record: 2,
                physical: (0.0, 1.0),
                digital: (0, 10),
            },
        ]
    }

    fn two_records() -> Vec<Vec<Vec<i16>>> {
        vec![
            vec![vec![-1000, 0, 500, 1000], vec![0, 10]],
            vec![vec![10, -10, 0, 1], vec![5, 5]],
        ]
    }

    #[test]
    fn reads_and_scales_selected_channel() {
        let bytes = edf_bytes(&two_channels(), 1.0, &two_records());
        let signal = read_recording(&mut Cursor::new(bytes), 0, 4).unwrap();
        assert_eq!(signal.sample_rate(), 4);
        let expected = [-100.0, 0.0, 50.0, 100.0, 1.0, -1.0, 0.0, 0.1];
        assert_eq!(signal.len(), expected.len());
        for (&found, expected) in signal.samples().iter().zip(expected) {
            assert_approx_eq!(found, expected);
        }
        assert_eq!(signal.num_blanks(), 2);
    }

    #[test]
    fn reads_second_channel() {
        let bytes = edf_bytes(&two_channels(), 0.5, &two_records());
        let signal = read_recording(&mut Cursor::new(bytes), 1, 4).unwrap();
        assert_eq!(signal.samples(), &[0.0, 1.0, 0.5, 0.5]);
    }

    #[test]
    fn channel_out_of_range() {
        let bytes = edf_bytes(&two_channels(), 1.0, &two_records());
        let result = read_recording(&mut Cursor::new(bytes), 2, 4);
        assert!(matches!(
            result,
            Err(LoaderError::ChannelOutOfRange {
                channel: 2,
                available: 2
            })
        ));
    }

    #[test]
    fn sample_rate_mismatch() {
        let bytes = edf_bytes(&two_channels(), 1.0, &two_records());
        let result = read_recording(&mut Cursor::new(bytes), 0, 256);
        assert!(matches!(
            result,
            Err(LoaderError::SampleRateMismatch { expected: 256, .. })
        ));
    }

    #[test]
    fn truncated_data() {
        let mut bytes = edf_bytes(&two_channels(), 1.0, &two_records());
        bytes.truncate(bytes.len() - 3);
        let result = read_recording(&mut Cursor::new(bytes), 0, 4);
        assert!(matches!(result, Err(LoaderError::Unreadable(_))));
    }

    #[test]
    fn malformed_header_number() {
        let mut bytes = edf_bytes(&two_channels(), 1.0, &two_records());
        // number of records field
        bytes[236..244].copy_from_slice(b"two     ");
        let result = read_recording(&mut Cursor::new(bytes), 0, 4);
        assert!(matches!(result, Err(LoaderError::Unreadable(_))));
    }

    #[test]
    fn inflated_record_count_is_unreadable() {
        let mut bytes = edf_bytes(&two_channels(), 1.0, &two_records()[..1]);
        bytes[236..244].copy_from_slice(b"99999999");
        let result = read_recording(&mut Cursor::new(bytes), 0, 4);
        assert!(matches!(result, Err(LoaderError::Unreadable(_))));
    }

    #[test]
    fn inflated_samples_per_record_is_unreadable() {
        let channel = TestChannel {
            label: "EEG",
            samples_per_record: 99_999_999,
            physical: (-100.0, 100.0),
            digital: (-1000, 1000),
        };
        let bytes = edf_bytes(&[channel], 1.0, &[vec![vec![1, 2, 3]]]);
        let result = read_recording(&mut Cursor::new(bytes), 0, 99_999_999);
        assert!(matches!(result, Err(LoaderError::Unreadable(_))));
    }

    #[test]
    fn missing_file() {
        let result = load_recording(Path::new("/nonexistent/recording.edf"), 0, 256);
        assert!(matches!(result, Err(LoaderError::NotFound(_))));
    }
}
